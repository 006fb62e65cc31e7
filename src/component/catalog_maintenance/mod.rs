//! 影片庫維護元件：目錄清除、快取清除、影片庫概覽

mod main;

pub use main::CatalogMaintenance;
