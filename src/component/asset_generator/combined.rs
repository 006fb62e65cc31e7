use super::AssetGenerator;
use crate::store::AssetPaths;
use crate::tools::{Task, run_concurrently};
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

const THUMBNAIL_WEIGHT: f64 = 0.05;
const SPRITE_WEIGHT: f64 = 0.15;
const PROXY_WEIGHT: f64 = 0.80;

/// 三種素材的輸出位置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetTargets {
    pub thumbnail: PathBuf,
    pub sprite: PathBuf,
    pub proxy: PathBuf,
}

/// 加權合併的整體進度（0 ~ 100，不遞減）
#[derive(Debug, Default)]
pub struct WeightedProgress {
    thumbnail: f64,
    sprite: f64,
    proxy: f64,
    reported: u8,
}

impl WeightedProgress {
    pub fn thumbnail_done(&mut self) -> Option<u8> {
        self.thumbnail = 1.0;
        self.recompute()
    }

    pub fn sprite_done(&mut self) -> Option<u8> {
        self.sprite = 1.0;
        self.recompute()
    }

    pub fn proxy_fraction(&mut self, fraction: f64) -> Option<u8> {
        self.proxy = self.proxy.max(fraction.clamp(0.0, 1.0));
        self.recompute()
    }

    #[must_use]
    pub const fn percent(&self) -> u8 {
        self.reported
    }

    /// 只有百分比上升時才回傳新值
    fn recompute(&mut self) -> Option<u8> {
        let score = self.proxy.mul_add(
            PROXY_WEIGHT,
            self.thumbnail.mul_add(THUMBNAIL_WEIGHT, self.sprite * SPRITE_WEIGHT),
        );
        let percent = (score * 100.0).round().clamp(0.0, 100.0) as u8;
        if percent > self.reported {
            self.reported = percent;
            Some(percent)
        } else {
            None
        }
    }
}

/// 同時產生縮圖、sprite sheet 與 proxy，回報加權進度
///
/// 任一項失敗即回傳該錯誤（其他項目仍會執行完畢）。
pub fn generate_all(
    generator: &dyn AssetGenerator,
    source: &Path,
    targets: &AssetTargets,
    duration: f64,
    on_progress: &(dyn Fn(u8) + Sync),
) -> Result<AssetPaths> {
    let progress = Mutex::new(WeightedProgress::default());
    let report = |update: &dyn Fn(&mut WeightedProgress) -> Option<u8>| {
        let mut guard = progress.lock().unwrap_or_else(PoisonError::into_inner);
        let changed = update(&mut *guard);
        drop(guard);
        if let Some(percent) = changed {
            on_progress(percent);
        }
    };
    let report = &report;

    let tasks: Vec<Task<'_>> = vec![
        Box::new(move || -> Result<()> {
            generator.thumbnail(source, &targets.thumbnail, duration)?;
            report(&WeightedProgress::thumbnail_done);
            Ok(())
        }),
        Box::new(move || -> Result<()> {
            generator.sprite_sheet(source, &targets.sprite, duration)?;
            report(&WeightedProgress::sprite_done);
            Ok(())
        }),
        Box::new(move || -> Result<()> {
            generator.proxy(source, &targets.proxy, duration, &|fraction: f64| {
                report(&|p: &mut WeightedProgress| p.proxy_fraction(fraction));
            })?;
            Ok(())
        }),
    ];
    run_concurrently(tasks)?;

    Ok(AssetPaths {
        thumbnail: Some(targets.thumbnail.clone()),
        sprite: Some(targets.sprite.clone()),
        proxy: Some(targets.proxy.clone()),
    })
}
