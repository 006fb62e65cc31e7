use crate::component::asset_generator::{AssetGenerator, AssetTargets, generate_all};
use crate::library::{FlagGuard, Library};
use crate::store::{ProxyJob, VideoRecord};
use anyhow::{Context, Result, bail};
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

/// Proxy 重新產生佇列
///
/// 佇列內容存在資料庫中，工作迴圈同一時間只會有一個（由 [`Library`] 的旗標控制）。
/// 每個工作同時產生縮圖、sprite 與 proxy。
#[derive(Clone)]
pub struct ProxyQueue {
    library: Arc<Library>,
    generator: Arc<dyn AssetGenerator>,
    shutdown_signal: Arc<AtomicBool>,
}

impl ProxyQueue {
    pub fn new(library: Arc<Library>, generator: Arc<dyn AssetGenerator>) -> Self {
        Self {
            library,
            generator,
            shutdown_signal: Arc::new(AtomicBool::new(false)),
        }
    }

    #[must_use]
    pub fn with_shutdown_signal(mut self, shutdown_signal: Arc<AtomicBool>) -> Self {
        self.shutdown_signal = shutdown_signal;
        self
    }

    fn is_shutdown(&self) -> bool {
        self.shutdown_signal.load(Ordering::SeqCst)
    }

    /// 加入佇列但不啟動工作迴圈
    pub fn push(&self, video_id: &str) -> Result<ProxyJob> {
        let job = self.library.store().enqueue_job(video_id)?;
        debug!("加入 proxy 佇列: {} (video {})", job.id, job.video_id);
        Ok(job)
    }

    /// 加入佇列，必要時在背景啟動工作迴圈
    ///
    /// 回傳新啟動的工作執行緒；迴圈已在執行時回傳 `None`。
    pub fn enqueue(&self, video_id: &str) -> Result<(ProxyJob, Option<JoinHandle<()>>)> {
        let job = self.push(video_id)?;
        let handle = self.ensure_worker()?;
        Ok((job, handle))
    }

    /// 工作迴圈沒有在執行時啟動一個
    pub fn ensure_worker(&self) -> Result<Option<JoinHandle<()>>> {
        let flag = self.library.queue_flag();
        if flag
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(None);
        }

        let worker = self.clone();
        let spawned = thread::Builder::new()
            .name("proxy-queue".to_string())
            .spawn(move || worker.worker_loop());
        match spawned {
            Ok(handle) => Ok(Some(handle)),
            Err(e) => {
                flag.store(false, Ordering::SeqCst);
                Err(e).context("無法啟動 proxy 佇列工作執行緒")
            }
        }
    }

    /// 在目前執行緒處理佇列直到清空（或收到中斷信號）
    pub fn run_until_empty(&self) -> Result<usize> {
        let Some(_running) = FlagGuard::acquire(self.library.queue_flag()) else {
            bail!("proxy 佇列已在處理中");
        };
        self.drain()
    }

    /// 背景執行緒的主迴圈，旗標已由呼叫端設為 `true`
    fn worker_loop(&self) {
        loop {
            {
                let _running = FlagGuard::adopt(self.library.queue_flag());
                if let Err(e) = self.drain() {
                    error!("proxy 佇列中止: {e:#}");
                    return;
                }
            }

            // 釋放旗標與再次加入工作之間可能有新的工作進來
            let pending = !self.is_shutdown()
                && matches!(self.library.store().next_queued_job(), Ok(Some(_)));
            let reacquired = pending
                && self
                    .library
                    .queue_flag()
                    .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                    .is_ok();
            if !reacquired {
                break;
            }
        }
    }

    fn drain(&self) -> Result<usize> {
        let store = self.library.store();
        let mut handled = 0;
        while !self.is_shutdown() {
            let Some(job) = store.claim_next_job()? else {
                break;
            };
            if let Err(e) = self.process_job(&job) {
                error!("proxy 工作 {} 處理失敗: {e:#}", job.id);
                if let Err(mark) = store.fail_job(&job.id, &format!("{e:#}")) {
                    warn!("無法將工作 {} 標記為失敗: {mark:#}", job.id);
                }
            }
            handled += 1;
        }
        if self.is_shutdown() {
            warn!("收到中斷信號，proxy 佇列停止取出新工作");
        }
        Ok(handled)
    }

    /// 處理單一工作；產生失敗只標記該工作為 error，不影響佇列
    fn process_job(&self, job: &ProxyJob) -> Result<()> {
        let store = self.library.store();
        let Some(video) = store.get_video(&job.video_id)? else {
            store.fail_job(&job.id, "影片紀錄不存在")?;
            warn!("proxy 工作 {} 的影片已不存在", job.id);
            return Ok(());
        };
        info!("開始產生 proxy: {}", video.path.display());

        let targets = self.targets_for(&video);
        let on_progress = |percent: u8| {
            if let Err(e) = store.update_job_progress(&job.id, percent) {
                warn!("無法更新工作進度 {}: {e:#}", job.id);
            }
        };
        let result = generate_all(
            self.generator.as_ref(),
            &video.path,
            &targets,
            video.duration,
            &on_progress,
        );

        match result {
            Ok(assets) => {
                store.update_video_assets(&video.id, &assets, None)?;
                store.complete_job(&job.id)?;
                info!("proxy 完成: {}", video.path.display());
            }
            Err(e) => {
                error!("proxy 產生失敗 {}: {e:#}", video.path.display());
                store.fail_job(&job.id, &format!("{e:#}"))?;
            }
        }
        Ok(())
    }

    fn targets_for(&self, video: &VideoRecord) -> AssetTargets {
        let layout = self.library.layout();
        AssetTargets {
            thumbnail: layout.thumbnail_path(&video.id),
            sprite: layout.sprite_path(&video.id),
            proxy: layout.proxy_path(&video.id),
        }
    }
}
