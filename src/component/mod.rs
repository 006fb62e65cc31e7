//! 功能元件模組
//!
//! 每個子模組實現一個獨立的功能，包含主要邏輯和專用工具

pub mod asset_generator;
pub mod catalog_maintenance;
pub mod library_scanner;
pub mod proxy_queue;

pub use asset_generator::{AssetError, AssetGenerator, FfmpegAssetGenerator};
pub use catalog_maintenance::CatalogMaintenance;
pub use library_scanner::{LibraryScanner, ScanOrchestrator, ScanProgress, ScanSummary};
pub use proxy_queue::{ProxyManager, ProxyQueue};
