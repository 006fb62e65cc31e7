use super::events::{ScanPhase, ScanProgress, ScanSummary};
use super::limiter::ConcurrencyLimiter;
use crate::component::asset_generator::AssetGenerator;
use crate::config::{DEFAULT_WORKER_COUNT, FileTypeTable};
use crate::library::Library;
use crate::store::{AssetPaths, LAST_SCAN_AT, LAST_SCAN_ROOT, ScanSession, ScanStatus, VideoRecord};
use crate::tools::{
    MetadataProbe, Task, VideoWalker, calculate_fingerprint, format_mtime, run_concurrently,
    validate_directory_exists,
};
use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use crossbeam_channel::Sender;
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// 單一檔案的處理結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOutcome {
    Processed,
    Skipped,
}

/// 影片庫掃描流程
///
/// 本身不保存掃描狀態，狀態（同時只能一個掃描）由 [`Library`] 持有。
pub struct ScanOrchestrator {
    probe: Arc<dyn MetadataProbe>,
    generator: Arc<dyn AssetGenerator>,
    file_type_table: FileTypeTable,
    worker_count: usize,
    shutdown_signal: Arc<AtomicBool>,
}

impl ScanOrchestrator {
    pub fn new(
        probe: Arc<dyn MetadataProbe>,
        generator: Arc<dyn AssetGenerator>,
        file_type_table: FileTypeTable,
    ) -> Self {
        Self {
            probe,
            generator,
            file_type_table,
            worker_count: DEFAULT_WORKER_COUNT,
            shutdown_signal: Arc::new(AtomicBool::new(false)),
        }
    }

    #[must_use]
    pub const fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    #[must_use]
    pub fn with_shutdown_signal(mut self, shutdown_signal: Arc<AtomicBool>) -> Self {
        self.shutdown_signal = shutdown_signal;
        self
    }

    fn is_shutdown(&self) -> bool {
        self.shutdown_signal.load(Ordering::SeqCst)
    }

    /// 掃描整個影片庫
    ///
    /// 同一個影片庫已有掃描進行中時直接回傳錯誤。進度事件送往 `events`，
    /// 接收端已關閉時事件會被丟棄，不影響掃描。
    pub fn scan(&self, library: &Library, events: &Sender<ScanProgress>) -> Result<ScanSummary> {
        let Some(_guard) = library.try_begin_scan() else {
            bail!("此影片庫已有掃描正在進行: {}", library.root().display());
        };

        let root = library.root();
        let store = library.store();
        let session = ScanSession::start(root);
        store.insert_scan(&session)?;
        info!("開始掃描: {}", root.display());

        if let Err(e) = validate_directory_exists(root) {
            store.finish_scan(&session.id, ScanStatus::Error)?;
            let _ = events.send(ScanSummary::default().to_event(ScanPhase::Error, None));
            return Err(e.context("影片庫根目錄無效"));
        }

        let paths = self.count_phase(root, events);
        store.update_scan_found(&session.id, paths.len())?;
        info!("找到 {} 個影片檔案", paths.len());

        let summary = match self.process_phase(library, &paths, events) {
            Ok(summary) => summary,
            Err(e) => {
                store.finish_scan(&session.id, ScanStatus::Error)?;
                let _ = events.send(ScanSummary::default().to_event(ScanPhase::Error, None));
                return Err(e);
            }
        };

        let status = if summary.interrupted {
            ScanStatus::Error
        } else {
            ScanStatus::Complete
        };
        store.finish_scan(&session.id, status)?;
        store.set_setting(LAST_SCAN_AT, &Utc::now().to_rfc3339())?;
        store.set_setting(LAST_SCAN_ROOT, &root.to_string_lossy())?;

        let _ = events.send(summary.to_event(ScanPhase::Complete, None));
        info!(
            "掃描完成 - 處理: {}, 略過: {}, 失敗: {}, 總計: {}",
            summary.processed, summary.skipped, summary.failed, summary.total
        );
        Ok(summary)
    }

    /// 第一階段：只計數，不寫入任何資料
    fn count_phase(&self, root: &Path, events: &Sender<ScanProgress>) -> Vec<PathBuf> {
        let walker = VideoWalker::new(root, &self.file_type_table);
        let mut paths = Vec::new();
        for path in walker.walk() {
            if self.is_shutdown() {
                break;
            }
            let name = file_name_of(&path);
            paths.push(path);
            let _ = events.send(ScanProgress::counting(paths.len(), Some(name)));
        }
        paths
    }

    /// 第二階段：以固定寬度的執行緒池處理每個檔案
    fn process_phase(
        &self,
        library: &Library,
        paths: &[PathBuf],
        events: &Sender<ScanProgress>,
    ) -> Result<ScanSummary> {
        let limiter = ConcurrencyLimiter::new(self.worker_count)?;
        debug!("以 {} 個執行緒處理 {} 個檔案", limiter.width(), paths.len());
        let counters = Mutex::new(ScanSummary {
            total: paths.len(),
            ..ScanSummary::default()
        });

        limiter.run_all(paths, |path| {
            if self.is_shutdown() {
                return;
            }
            let outcome = self.process_unit(library, path);

            let snapshot = {
                let mut counters = counters.lock().unwrap_or_else(PoisonError::into_inner);
                match outcome {
                    Ok(UnitOutcome::Processed) => counters.processed += 1,
                    Ok(UnitOutcome::Skipped) => counters.skipped += 1,
                    Err(e) => {
                        warn!("處理失敗，略過 {}: {e:#}", path.display());
                        counters.failed += 1;
                    }
                }
                *counters
            };
            let _ = events.send(snapshot.to_event(ScanPhase::Processing, Some(file_name_of(path))));
        });

        let mut summary = counters.into_inner().unwrap_or_else(PoisonError::into_inner);
        summary.interrupted = self.is_shutdown();
        if summary.interrupted {
            warn!("掃描已中斷");
        }
        Ok(summary)
    }

    /// 處理單一檔案
    ///
    /// 指紋相同就略過；否則探測資訊、寫入紀錄，再同時產生縮圖與 sprite。
    /// 指紋在素材都產生成功後才寫入，失敗的檔案下次掃描會重新處理。
    pub fn process_unit(&self, library: &Library, path: &Path) -> Result<UnitOutcome> {
        let store = library.store();
        let fingerprint = calculate_fingerprint(path)?;

        if let Some(existing) = store.get_video_by_path(path)? {
            if existing.fingerprint.as_deref() == Some(fingerprint.as_str()) {
                debug!("未變更，略過: {}", path.display());
                return Ok(UnitOutcome::Skipped);
            }
        }

        let metadata = self.probe.probe(path)?;
        let file_meta =
            fs::metadata(path).with_context(|| format!("無法讀取檔案資訊: {}", path.display()))?;
        let created_at: DateTime<Utc> = file_meta
            .created()
            .or_else(|_| file_meta.modified())
            .map_or_else(|_| Utc::now(), DateTime::from);

        let mut video = VideoRecord::new(path, file_meta.len(), metadata.duration_seconds, created_at);
        video.width = metadata.width;
        video.height = metadata.height;
        video.codec = metadata.codec;
        video.frame_rate = Some(metadata.frame_rate);
        video.bit_rate = metadata.bit_rate;
        video.source_mtime = file_meta.modified().ok().map(format_mtime);
        video.scanned_at = Some(Utc::now());
        store.upsert_video(&video)?;

        let layout = library.layout();
        let thumbnail = layout.thumbnail_path(&video.id);
        let sprite = layout.sprite_path(&video.id);
        let generator = self.generator.as_ref();
        let duration = video.duration;

        let tasks: Vec<Task<'_>> = vec![
            Box::new(|| -> Result<()> {
                generator.thumbnail(path, &thumbnail, duration)?;
                Ok(())
            }),
            Box::new(|| -> Result<()> {
                generator.sprite_sheet(path, &sprite, duration)?;
                Ok(())
            }),
        ];
        run_concurrently(tasks)
            .with_context(|| format!("無法產生縮圖或 sprite: {}", path.display()))?;

        let assets = AssetPaths {
            thumbnail: Some(thumbnail),
            sprite: Some(sprite),
            proxy: None,
        };
        store.update_video_assets(&video.id, &assets, Some(&fingerprint))?;
        Ok(UnitOutcome::Processed)
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}
