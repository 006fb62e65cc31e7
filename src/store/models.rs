use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// 影片資料，主鍵由絕對路徑決定
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoRecord {
    pub id: String,
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
    pub duration: f64,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub codec: Option<String>,
    pub frame_rate: Option<f64>,
    pub bit_rate: Option<u64>,
    pub created_at: DateTime<Utc>,
    pub directory: String,
    pub fingerprint: Option<String>,
    pub source_mtime: Option<String>,
    pub scanned_at: Option<DateTime<Utc>>,
    pub thumbnail_path: Option<PathBuf>,
    pub sprite_path: Option<PathBuf>,
    pub proxy_path: Option<PathBuf>,
    pub has_thumbnail: bool,
    pub has_sprite: bool,
    pub has_proxy: bool,
}

impl VideoRecord {
    /// 由路徑產生穩定主鍵（同一路徑永遠得到同一主鍵）
    #[must_use]
    pub fn key_for_path(path: &Path) -> String {
        let hash = blake3::hash(path.to_string_lossy().as_bytes());
        hash.to_hex()[..16].to_string()
    }

    /// 建立尚未產生任何衍生素材的紀錄
    #[must_use]
    pub fn new(path: &Path, size: u64, duration: f64, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Self::key_for_path(path),
            path: path.to_path_buf(),
            name: path
                .file_name()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default(),
            size,
            duration,
            width: None,
            height: None,
            codec: None,
            frame_rate: None,
            bit_rate: None,
            created_at,
            directory: path
                .parent()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            fingerprint: None,
            source_mtime: None,
            scanned_at: None,
            thumbnail_path: None,
            sprite_path: None,
            proxy_path: None,
            has_thumbnail: false,
            has_sprite: false,
            has_proxy: false,
        }
    }
}

/// 衍生素材路徑，`None` 表示不變更
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetPaths {
    pub thumbnail: Option<PathBuf>,
    pub sprite: Option<PathBuf>,
    pub proxy: Option<PathBuf>,
}

/// 使用者對影片的標記（我的最愛、備註）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub video_id: String,
    pub is_favorite: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Complete,
    Error,
}

impl JobStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Complete => "complete",
            Self::Error => "error",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "queued" => Some(Self::Queued),
            "processing" => Some(Self::Processing),
            "complete" => Some(Self::Complete),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProxyJob {
    pub id: String,
    pub video_id: String,
    pub status: JobStatus,
    pub progress: u8,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Scanning,
    Complete,
    Error,
}

impl ScanStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scanning => "scanning",
            Self::Complete => "complete",
            Self::Error => "error",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "scanning" => Some(Self::Scanning),
            "complete" => Some(Self::Complete),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanSession {
    pub id: String,
    pub root_path: PathBuf,
    pub status: ScanStatus,
    pub videos_found: usize,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ScanSession {
    #[must_use]
    pub fn start(root_path: &Path) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            root_path: root_path.to_path_buf(),
            status: ScanStatus::Scanning,
            videos_found: 0,
            started_at: Utc::now(),
            completed_at: None,
        }
    }
}
