//! E2E 測試 - 使用真實 ffmpeg / ffprobe
//!
//! 系統中沒有 ffmpeg 時自動略過。

use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use tempfile::TempDir;
use video_catalog_indexer::Library;
use video_catalog_indexer::component::library_scanner::{ScanOrchestrator, progress_channel};
use video_catalog_indexer::component::{AssetGenerator, FfmpegAssetGenerator, ProxyQueue};
use video_catalog_indexer::config::Config;
use video_catalog_indexer::store::JobStatus;
use video_catalog_indexer::tools::{Ffprobe, MetadataProbe};

fn ffmpeg_available() -> bool {
    ["ffmpeg", "ffprobe"].iter().all(|bin| {
        Command::new(bin)
            .arg("-version")
            .output()
            .is_ok_and(|o| o.status.success())
    })
}

/// 以 lavfi 產生一段測試影片
fn make_test_video(path: &Path, seconds: u32) -> bool {
    Command::new("ffmpeg")
        .args(["-hide_banner", "-loglevel", "error", "-y", "-f", "lavfi", "-i"])
        .arg(format!("testsrc=duration={seconds}:size=320x240:rate=25"))
        .args(["-c:v", "libx264", "-pix_fmt", "yuv420p"])
        .arg(path)
        .status()
        .is_ok_and(|s| s.success())
}

#[test]
fn test_real_pipeline_e2e() {
    if !ffmpeg_available() {
        println!("跳過測試：找不到 ffmpeg / ffprobe");
        return;
    }

    let temp_dir = TempDir::new().unwrap();
    let library = Arc::new(Library::open(temp_dir.path()).unwrap());
    let video_path = library.root().join("sample.mp4");
    if !make_test_video(&video_path, 4) {
        println!("跳過測試：無法產生測試影片");
        return;
    }

    // 1. 探測
    let probe = Ffprobe::default();
    let metadata = probe.probe(&video_path).unwrap();
    assert!((metadata.duration_seconds - 4.0).abs() < 0.5);
    assert_eq!(metadata.width, Some(320));
    assert_eq!(metadata.height, Some(240));
    assert!((metadata.frame_rate - 25.0).abs() < 0.01);

    // 2. 掃描：產生縮圖與 sprite
    let generator: Arc<dyn AssetGenerator> = Arc::new(FfmpegAssetGenerator::default());
    let scanner = ScanOrchestrator::new(
        Arc::new(probe),
        Arc::clone(&generator),
        Config::load_embedded_file_type_table().unwrap(),
    );
    let (tx, rx) = progress_channel();
    drop(rx);
    let summary = scanner.scan(&library, &tx).unwrap();
    assert_eq!(summary.processed, 1);

    let video = library.store().get_video_by_path(&video_path).unwrap().unwrap();
    assert!(video.thumbnail_path.as_ref().is_some_and(|p| p.exists()));
    assert!(video.sprite_path.as_ref().is_some_and(|p| p.exists()));
    assert!(!video.has_proxy);

    // 3. proxy 佇列
    let queue = ProxyQueue::new(Arc::clone(&library), generator);
    let job = queue.push(&video.id).unwrap();
    assert_eq!(queue.run_until_empty().unwrap(), 1);

    let job = library.store().get_job(&job.id).unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Complete, "error: {:?}", job.error);
    assert_eq!(job.progress, 100);
    let video = library.store().get_video(&video.id).unwrap().unwrap();
    assert!(video.proxy_path.as_ref().is_some_and(|p| p.exists()));

    println!("✓ E2E 流程測試通過");
}
