//! 衍生素材產生元件
//!
//! 縮圖、sprite sheet 與 proxy 影片皆透過外部 ffmpeg 程序產生。

mod combined;
mod error;
mod ffmpeg;

pub use combined::{AssetTargets, WeightedProgress, generate_all};
pub use error::AssetError;
pub use ffmpeg::FfmpegAssetGenerator;

use std::path::Path;

/// 衍生素材產生介面
pub trait AssetGenerator: Send + Sync {
    /// 擷取單張縮圖，時間點為 `min(duration * 0.1, 5)` 秒
    fn thumbnail(&self, source: &Path, destination: &Path, duration: f64)
    -> Result<(), AssetError>;

    /// 依影片長度產生 sprite sheet
    fn sprite_sheet(
        &self,
        source: &Path,
        destination: &Path,
        duration: f64,
    ) -> Result<(), AssetError>;

    /// 產生 proxy 影片，`on_progress` 收到 0.0 ~ 1.0 的編碼進度
    fn proxy(
        &self,
        source: &Path,
        destination: &Path,
        duration: f64,
        on_progress: &dyn Fn(f64),
    ) -> Result<(), AssetError>;
}

/// 縮圖擷取時間點
#[must_use]
pub fn thumbnail_timestamp(duration: f64) -> f64 {
    if duration.is_finite() && duration > 0.0 {
        (duration * 0.1).min(5.0)
    } else {
        0.0
    }
}
