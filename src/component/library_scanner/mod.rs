//! 影片庫掃描元件
//!
//! 兩階段流程：
//! 1. 計數：走訪根目錄，統計影片數量
//! 2. 處理：固定寬度的執行緒池逐檔比對指紋、探測資訊、產生縮圖與 sprite

mod events;
mod limiter;
mod main;
mod orchestrator;

pub use events::{PROGRESS_CHANNEL_CAPACITY, ScanPhase, ScanProgress, ScanSummary, progress_channel};
pub use limiter::ConcurrencyLimiter;
pub use main::LibraryScanner;
pub use orchestrator::{ScanOrchestrator, UnitOutcome};
