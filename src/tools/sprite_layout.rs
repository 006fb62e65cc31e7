/// 預設 sprite 單格尺寸
pub const DEFAULT_TILE_WIDTH: u32 = 160;
pub const DEFAULT_TILE_HEIGHT: u32 = 90;

/// Sprite sheet 版面配置
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpriteConfig {
    pub tile_width: u32,
    pub tile_height: u32,
    pub columns: u32,
    pub rows: u32,
    /// 實際每格間隔秒數（duration / total_frames）
    pub interval: f64,
    pub total_frames: u32,
}

impl SpriteConfig {
    /// 依影片長度計算 sprite 版面
    ///
    /// 分級：
    /// - ≤ 60 秒：每 1 秒一格，10 欄，列數 = ceil(duration / 10)
    /// - ≤ 300 秒：每 3 秒一格，10 x 10
    /// - ≤ 1800 秒：每 12 秒一格，15 x 10
    /// - 其餘：每 30 秒一格，20 x 10
    ///
    /// 總格數受限於欄 x 列，間隔再以總格數重新計算，使最後一格落在片尾附近。
    #[must_use]
    pub fn for_duration(duration: f64, tile_width: u32, tile_height: u32) -> Self {
        let duration = if duration.is_finite() { duration.max(0.0) } else { 0.0 };

        let (base_interval, columns, rows) = if duration <= 60.0 {
            let rows = (duration.min(60.0) / 10.0).ceil().max(1.0) as u32;
            (1.0, 10, rows)
        } else if duration <= 300.0 {
            (3.0, 10, 10)
        } else if duration <= 1800.0 {
            (12.0, 15, 10)
        } else {
            (30.0, 20, 10)
        };

        let wanted = (duration / base_interval).ceil() as u32;
        let total_frames = wanted.min(columns * rows).max(1);
        let interval = if duration > 0.0 {
            duration / f64::from(total_frames)
        } else {
            base_interval
        };

        Self {
            tile_width,
            tile_height,
            columns,
            rows,
            interval,
            total_frames,
        }
    }

    #[must_use]
    pub fn sheet_width(&self) -> u32 {
        self.tile_width * self.columns
    }

    #[must_use]
    pub fn sheet_height(&self) -> u32 {
        self.tile_height * self.rows
    }

    /// 給 ffmpeg fps 濾鏡使用的取樣率（每秒幾格）
    #[must_use]
    pub fn sample_rate(&self) -> f64 {
        1.0 / self.interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(duration: f64) -> SpriteConfig {
        SpriteConfig::for_duration(duration, DEFAULT_TILE_WIDTH, DEFAULT_TILE_HEIGHT)
    }

    #[test]
    fn test_short_video_layout() {
        let config = layout(30.0);
        assert_eq!(config.columns, 10);
        assert_eq!(config.rows, 3);
        assert_eq!(config.total_frames, 30);
        assert!((config.interval - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_medium_video_layout() {
        let config = layout(120.0);
        assert_eq!(config.columns, 10);
        assert_eq!(config.rows, 10);
        assert!(config.total_frames <= 100);
        assert_eq!(config.total_frames, 40);
        assert!((config.interval - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_long_video_layout() {
        let config = layout(3600.0);
        assert_eq!(config.columns, 20);
        assert_eq!(config.rows, 10);
        assert!(config.total_frames <= 200);
        assert_eq!(config.total_frames, 120);
        assert!((config.interval - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_total_frames_capped_by_grid() {
        // 1800 秒 / 12 = 150 格，格子上限 15 x 10 = 150
        let config = layout(1800.0);
        assert_eq!(config.columns, 15);
        assert_eq!(config.total_frames, 150);

        // 290 秒 / 3 = 97 格
        let config = layout(290.0);
        assert_eq!(config.total_frames, 97);
        assert!((config.interval - 290.0 / 97.0).abs() < 1e-9);
    }

    #[test]
    fn test_interval_recomputed_when_capped() {
        let config = layout(7200.0);
        assert_eq!(config.total_frames, 200);
        assert!((config.interval - 36.0).abs() < 1e-9);
    }

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(layout(60.0).rows, 6);
        assert_eq!(layout(60.5).rows, 10);
        assert_eq!(layout(300.0).columns, 10);
        assert_eq!(layout(300.5).columns, 15);
        assert_eq!(layout(1800.5).columns, 20);
    }

    #[test]
    fn test_degenerate_durations() {
        let config = layout(0.0);
        assert_eq!(config.rows, 1);
        assert_eq!(config.total_frames, 1);
        assert!(config.interval > 0.0);

        let config = layout(0.4);
        assert_eq!(config.total_frames, 1);
        assert!((config.interval - 0.4).abs() < 1e-9);

        assert_eq!(layout(f64::NAN).total_frames, 1);
    }

    #[test]
    fn test_sheet_dimensions() {
        let config = layout(3600.0);
        assert_eq!(config.sheet_width(), 3200);
        assert_eq!(config.sheet_height(), 900);
    }
}
