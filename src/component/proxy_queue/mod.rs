//! Proxy 佇列元件
//!
//! 依序為影片重新產生縮圖、sprite 與 proxy 影片，佇列狀態保存在資料庫中。

mod main;
mod queue;

pub use main::ProxyManager;
pub use queue::ProxyQueue;
