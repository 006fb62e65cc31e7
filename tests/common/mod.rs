//! 整合測試共用的假探測器與假素材產生器（不需要 ffmpeg）

#![allow(dead_code)]

use anyhow::Result;
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use video_catalog_indexer::component::{AssetError, AssetGenerator};
use video_catalog_indexer::tools::{MetadataProbe, VideoMetadata};

/// 記錄呼叫次數與最大同時呼叫數
#[derive(Default)]
pub struct CountingProbe {
    pub calls: AtomicUsize,
    pub active: AtomicUsize,
    pub peak: AtomicUsize,
    pub delay: Duration,
}

impl CountingProbe {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl MetadataProbe for CountingProbe {
    fn probe(&self, _path: &Path) -> Result<VideoMetadata> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        Ok(VideoMetadata {
            duration_seconds: 90.0,
            width: Some(1280),
            height: Some(720),
            codec: Some("h264".to_string()),
            frame_rate: 30.0,
            bit_rate: Some(4_000_000),
        })
    }
}

fn touch(path: &Path) -> Result<(), AssetError> {
    fs::write(path, b"generated").map_err(|source| AssetError::Output {
        path: path.to_path_buf(),
        source,
    })
}

/// 直接寫出空檔案的產生器；來源檔名含 `fail` 時 proxy 失敗
#[derive(Default)]
pub struct FakeGenerator {
    pub thumbnails: AtomicUsize,
    pub sprites: AtomicUsize,
    pub proxy_order: Mutex<Vec<String>>,
    pub proxy_active: AtomicUsize,
    pub proxy_peak: AtomicUsize,
    pub proxy_delay: Duration,
}

impl FakeGenerator {
    pub fn with_proxy_delay(delay: Duration) -> Self {
        Self {
            proxy_delay: delay,
            ..Self::default()
        }
    }

    pub fn generated(&self) -> usize {
        self.thumbnails.load(Ordering::SeqCst) + self.sprites.load(Ordering::SeqCst)
    }

    pub fn proxy_order(&self) -> Vec<String> {
        self.proxy_order.lock().unwrap().clone()
    }
}

impl AssetGenerator for FakeGenerator {
    fn thumbnail(&self, _: &Path, destination: &Path, _: f64) -> Result<(), AssetError> {
        self.thumbnails.fetch_add(1, Ordering::SeqCst);
        touch(destination)
    }

    fn sprite_sheet(&self, _: &Path, destination: &Path, _: f64) -> Result<(), AssetError> {
        self.sprites.fetch_add(1, Ordering::SeqCst);
        touch(destination)
    }

    fn proxy(
        &self,
        source: &Path,
        destination: &Path,
        _: f64,
        on_progress: &dyn Fn(f64),
    ) -> Result<(), AssetError> {
        let name = source.file_name().unwrap().to_string_lossy().to_string();
        self.proxy_order.lock().unwrap().push(name.clone());

        let now = self.proxy_active.fetch_add(1, Ordering::SeqCst) + 1;
        self.proxy_peak.fetch_max(now, Ordering::SeqCst);
        if !self.proxy_delay.is_zero() {
            thread::sleep(self.proxy_delay);
        }

        // 進度故意倒退一次，最終結果應仍保持最大值
        for fraction in [0.6, 0.2, 0.4] {
            on_progress(fraction);
        }
        self.proxy_active.fetch_sub(1, Ordering::SeqCst);

        if name.contains("fail") {
            return Err(AssetError::ProcessFailed {
                program: "fake".to_string(),
                status: "exit status: 1".to_string(),
                stderr: "simulated failure".to_string(),
            });
        }
        on_progress(1.0);
        touch(destination)
    }
}

/// 在目錄中建立假影片檔
pub fn write_video(dir: &Path, relative: &str, content: &[u8]) -> std::path::PathBuf {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}
