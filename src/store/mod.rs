//! 影片庫資料儲存（SQLite）
//!
//! 單一連線以 `Mutex` 保護，掃描與 proxy 佇列可同時寫入。

mod job_repo;
pub mod models;
mod scan_repo;
mod selection_repo;
mod settings_repo;
mod video_repo;

pub use models::{
    AssetPaths, JobStatus, ProxyJob, ScanSession, ScanStatus, Selection, VideoRecord,
};
pub use settings_repo::{LAST_SCAN_AT, LAST_SCAN_ROOT};

use anyhow::{Context, Result};
use log::debug;
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("無法開啟資料庫: {}", path.display()))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::initialize(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::initialize(Connection::open_in_memory()?)
    }

    fn initialize(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )?;
        conn.execute_batch(SCHEMA).context("無法初始化資料庫結構")?;
        debug!("資料庫結構已初始化");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub(crate) fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS videos (
    id TEXT PRIMARY KEY,
    file_path TEXT UNIQUE NOT NULL,
    file_name TEXT NOT NULL,
    file_size INTEGER NOT NULL,
    duration REAL NOT NULL,
    width INTEGER,
    height INTEGER,
    codec TEXT,
    frame_rate REAL,
    bit_rate INTEGER,
    created_at TEXT NOT NULL,
    directory TEXT NOT NULL,
    has_thumbnail INTEGER NOT NULL DEFAULT 0,
    has_sprite INTEGER NOT NULL DEFAULT 0,
    has_proxy INTEGER NOT NULL DEFAULT 0,
    thumbnail_path TEXT,
    sprite_path TEXT,
    proxy_path TEXT,
    file_hash TEXT,
    file_mtime TEXT,
    scanned_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_videos_directory ON videos(directory);
CREATE INDEX IF NOT EXISTS idx_videos_created_at ON videos(created_at);
CREATE INDEX IF NOT EXISTS idx_videos_file_hash ON videos(file_hash);

CREATE TABLE IF NOT EXISTS selections (
    video_id TEXT PRIMARY KEY REFERENCES videos(id) ON DELETE CASCADE,
    is_favorite INTEGER NOT NULL DEFAULT 0,
    notes TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS proxy_queue (
    id TEXT PRIMARY KEY,
    video_id TEXT NOT NULL REFERENCES videos(id) ON DELETE CASCADE,
    status TEXT NOT NULL DEFAULT 'queued',
    progress INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    started_at TEXT,
    completed_at TEXT,
    error TEXT
);

CREATE INDEX IF NOT EXISTS idx_proxy_queue_status ON proxy_queue(status, created_at);

CREATE TABLE IF NOT EXISTS scans (
    id TEXT PRIMARY KEY,
    root_path TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'scanning',
    videos_found INTEGER NOT NULL DEFAULT 0,
    started_at TEXT NOT NULL,
    completed_at TEXT
);

CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
";

/// 狀態欄位轉換失敗時的錯誤
pub(crate) fn invalid_column(index: usize, raw: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        index,
        rusqlite::types::Type::Text,
        format!("未知的狀態值: {raw}").into(),
    )
}
