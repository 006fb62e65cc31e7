//! 整合測試 - Proxy 佇列（假產生器）

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use chrono::Utc;
use common::FakeGenerator;
use tempfile::TempDir;
use video_catalog_indexer::Library;
use video_catalog_indexer::component::ProxyQueue;
use video_catalog_indexer::store::{JobStatus, ProxyJob, VideoRecord};

fn library_with(names: &[&str]) -> (TempDir, Arc<Library>, Vec<String>) {
    let temp_dir = TempDir::new().unwrap();
    let library = Library::open(temp_dir.path()).unwrap();
    let ids = names
        .iter()
        .map(|name| {
            let video = VideoRecord::new(&library.root().join(name), 100, 60.0, Utc::now());
            library.store().upsert_video(&video).unwrap();
            video.id
        })
        .collect();
    (temp_dir, Arc::new(library), ids)
}

fn status_of(library: &Library, job: &ProxyJob) -> JobStatus {
    library.store().get_job(&job.id).unwrap().unwrap().status
}

/// 測試 1: 先進先出，失敗的工作不會擋住後面的工作
#[test]
fn test_fifo_order_and_failure_isolation() {
    let (_dir, library, ids) = library_with(&["one.mp4", "two_fail.mp4", "three.mp4"]);
    let generator = Arc::new(FakeGenerator::default());
    let queue = ProxyQueue::new(Arc::clone(&library), generator.clone());

    let jobs: Vec<ProxyJob> = ids.iter().map(|id| queue.push(id).unwrap()).collect();
    assert_eq!(queue.run_until_empty().unwrap(), 3);

    assert_eq!(generator.proxy_order(), ["one.mp4", "two_fail.mp4", "three.mp4"]);
    assert_eq!(status_of(&library, &jobs[0]), JobStatus::Complete);
    assert_eq!(status_of(&library, &jobs[1]), JobStatus::Error);
    assert_eq!(status_of(&library, &jobs[2]), JobStatus::Complete);

    let failed = library.store().get_job(&jobs[1].id).unwrap().unwrap();
    assert!(failed.error.unwrap().contains("simulated failure"));

    // 失敗的影片素材狀態不變
    let video = library.store().get_video(&ids[1]).unwrap().unwrap();
    assert!(!video.has_proxy && video.proxy_path.is_none());

    let done = library.store().get_video(&ids[0]).unwrap().unwrap();
    assert!(done.has_thumbnail && done.has_sprite && done.has_proxy);
    assert_eq!(
        done.proxy_path,
        Some(library.layout().proxy_path(&ids[0]))
    );

    println!("✓ 佇列順序與失敗隔離測試通過");
}

/// 測試 2: 進度只會遞增（加權：縮圖 5%、sprite 15%、proxy 80%）
#[test]
fn test_progress_is_monotonic() {
    let (_dir, library, ids) = library_with(&["stalls_fail.mp4"]);
    let queue = ProxyQueue::new(Arc::clone(&library), Arc::new(FakeGenerator::default()));

    let job = queue.push(&ids[0]).unwrap();
    queue.run_until_empty().unwrap();

    // 5 + 15 + 0.6 * 80，之後回報的 0.2、0.4 不會降低進度
    let stored = library.store().get_job(&job.id).unwrap().unwrap();
    assert_eq!(stored.status, JobStatus::Error);
    assert_eq!(stored.progress, 68);
}

/// 測試 3: 同時 enqueue 也只會有一個工作迴圈
#[test]
fn test_single_worker_under_concurrent_enqueue() {
    let names: Vec<String> = (0..8).map(|i| format!("clip_{i}.mp4")).collect();
    let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let (_dir, library, ids) = library_with(&name_refs);

    let generator = Arc::new(FakeGenerator::with_proxy_delay(Duration::from_millis(10)));
    let queue = ProxyQueue::new(Arc::clone(&library), generator.clone());

    let handles: Vec<_> = thread::scope(|scope| {
        let spawned: Vec<_> = ids
            .iter()
            .map(|id| {
                let queue = &queue;
                scope.spawn(move || queue.enqueue(id).unwrap())
            })
            .collect();
        spawned
            .into_iter()
            .filter_map(|h| h.join().unwrap().1)
            .collect()
    });

    assert!(!handles.is_empty());
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(generator.proxy_peak.load(Ordering::SeqCst), 1);
    assert!(!library.is_queue_running());
    let complete = library.store().jobs_with_status(JobStatus::Complete).unwrap();
    assert_eq!(complete.len(), 8);
}

/// 測試 4: 重複 enqueue 同一影片會回傳既有工作
#[test]
fn test_enqueue_dedupes_active_job() {
    let (_dir, library, ids) = library_with(&["a.mp4"]);
    let queue = ProxyQueue::new(Arc::clone(&library), Arc::new(FakeGenerator::default()));

    let first = queue.push(&ids[0]).unwrap();
    let second = queue.push(&ids[0]).unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(library.store().list_jobs().unwrap().len(), 1);
}

/// 測試 5: 卡住的 processing 工作可手動重新排入
#[test]
fn test_requeue_stuck_job() {
    let (_dir, library, ids) = library_with(&["a.mp4"]);
    let queue = ProxyQueue::new(Arc::clone(&library), Arc::new(FakeGenerator::default()));

    let job = queue.push(&ids[0]).unwrap();
    // 模擬程式在處理中途結束
    let claimed = library.store().claim_next_job().unwrap().unwrap();
    assert_eq!(claimed.id, job.id);
    assert_eq!(queue.run_until_empty().unwrap(), 0);
    assert_eq!(status_of(&library, &job), JobStatus::Processing);

    assert!(library.store().requeue_job(&job.id).unwrap());
    assert_eq!(queue.run_until_empty().unwrap(), 1);
    assert_eq!(status_of(&library, &job), JobStatus::Complete);
}

/// 測試 6: 收到中斷信號後不再取出新工作
#[test]
fn test_shutdown_stops_claiming() {
    let (_dir, library, ids) = library_with(&["a.mp4", "b.mp4"]);
    let shutdown = Arc::new(AtomicBool::new(true));
    let queue = ProxyQueue::new(Arc::clone(&library), Arc::new(FakeGenerator::default()))
        .with_shutdown_signal(shutdown);

    for id in &ids {
        queue.push(id).unwrap();
    }
    assert_eq!(queue.run_until_empty().unwrap(), 0);
    assert_eq!(
        library.store().jobs_with_status(JobStatus::Queued).unwrap().len(),
        2
    );
}
