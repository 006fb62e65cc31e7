use anyhow::{Context, Result};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

/// 固定寬度的執行緒池，限制同時處理的單元數
pub struct ConcurrencyLimiter {
    pool: ThreadPool,
    width: usize,
}

impl ConcurrencyLimiter {
    pub fn new(width: usize) -> Result<Self> {
        let width = width.max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(width)
            .thread_name(|i| format!("scan-worker-{i}"))
            .build()
            .context("無法建立掃描執行緒池")?;
        Ok(Self { pool, width })
    }

    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// 對每個項目執行 `unit`，同時最多 `width` 個
    pub fn run_all<T, F>(&self, items: &[T], unit: F)
    where
        T: Sync,
        F: Fn(&T) + Send + Sync,
    {
        self.pool.install(|| items.par_iter().for_each(|item| unit(item)));
    }
}
