//! 影片庫控制代碼
//!
//! 所有衍生資料都放在根目錄下的隱藏資料夾中（資料庫 + proxies/），
//! 整個影片庫可以連同根目錄一起搬移。

use crate::store::Store;
use crate::tools::{ensure_directory_exists, validate_directory_exists};
use anyhow::{Context, Result};
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

pub const DATA_DIR_NAME: &str = ".catalog-data";
pub const DATABASE_FILE: &str = "catalog.db";
pub const PROXIES_DIR: &str = "proxies";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogLayout {
    pub root: PathBuf,
    pub data_dir: PathBuf,
    pub proxies_dir: PathBuf,
    pub database_path: PathBuf,
}

impl CatalogLayout {
    #[must_use]
    pub fn new(root: &Path) -> Self {
        let data_dir = root.join(DATA_DIR_NAME);
        Self {
            root: root.to_path_buf(),
            proxies_dir: data_dir.join(PROXIES_DIR),
            database_path: data_dir.join(DATABASE_FILE),
            data_dir,
        }
    }

    #[must_use]
    pub fn thumbnail_path(&self, video_id: &str) -> PathBuf {
        self.proxies_dir.join(format!("{video_id}_thumb.jpg"))
    }

    #[must_use]
    pub fn sprite_path(&self, video_id: &str) -> PathBuf {
        self.proxies_dir.join(format!("{video_id}_sprite.jpg"))
    }

    #[must_use]
    pub fn proxy_path(&self, video_id: &str) -> PathBuf {
        self.proxies_dir.join(format!("{video_id}_proxy.mp4"))
    }
}

/// 單一旗標的 RAII 守衛，離開作用域時自動釋放
#[derive(Debug)]
pub struct FlagGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> FlagGuard<'a> {
    /// 旗標未被佔用時取得；已被佔用則回傳 `None`
    #[must_use]
    pub fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self { flag })
    }

    /// 接手一個已由他處設為 `true` 的旗標
    #[must_use]
    pub fn adopt(flag: &'a AtomicBool) -> Self {
        Self { flag }
    }
}

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// 一個已開啟的影片庫
///
/// 同時只允許一個掃描、一個 proxy 佇列工作迴圈，狀態由此物件持有。
pub struct Library {
    layout: CatalogLayout,
    store: Store,
    scan_active: AtomicBool,
    queue_running: AtomicBool,
}

impl Library {
    /// 開啟（或建立）影片庫
    pub fn open(root: &Path) -> Result<Self> {
        validate_directory_exists(root)?;
        let root = root
            .canonicalize()
            .with_context(|| format!("無法解析路徑: {}", root.display()))?;
        let layout = CatalogLayout::new(&root);

        ensure_directory_exists(&layout.data_dir)?;
        ensure_directory_exists(&layout.proxies_dir)?;
        let store = Store::open(&layout.database_path)?;

        info!("已開啟影片庫: {}", root.display());
        Ok(Self::with_store(layout, store))
    }

    /// 使用指定的 store 建立（測試或自訂儲存位置時使用）
    #[must_use]
    pub fn with_store(layout: CatalogLayout, store: Store) -> Self {
        Self {
            layout,
            store,
            scan_active: AtomicBool::new(false),
            queue_running: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.layout.root
    }

    #[must_use]
    pub const fn layout(&self) -> &CatalogLayout {
        &self.layout
    }

    #[must_use]
    pub const fn store(&self) -> &Store {
        &self.store
    }

    #[must_use]
    pub fn is_scanning(&self) -> bool {
        self.scan_active.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn is_queue_running(&self) -> bool {
        self.queue_running.load(Ordering::SeqCst)
    }

    pub(crate) fn try_begin_scan(&self) -> Option<FlagGuard<'_>> {
        FlagGuard::acquire(&self.scan_active)
    }

    pub(crate) const fn queue_flag(&self) -> &AtomicBool {
        &self.queue_running
    }

    /// 刪除某目錄（含子目錄）下所有影片紀錄及其衍生檔案
    pub fn purge_directory(&self, directory: &Path) -> Result<usize> {
        let removed = self.store.delete_videos_under_directory(directory)?;
        for video in &removed {
            for path in [&video.thumbnail_path, &video.sprite_path, &video.proxy_path]
                .into_iter()
                .flatten()
            {
                if path.exists() {
                    if let Err(e) = fs::remove_file(path) {
                        warn!("無法刪除衍生檔案 {}: {}", path.display(), e);
                    }
                }
            }
        }
        info!("已清除 {} 筆影片紀錄: {}", removed.len(), directory.display());
        Ok(removed.len())
    }

    /// 刪除整個影片庫快取（資料庫與所有衍生檔案），需重新掃描
    pub fn clear_cache(self) -> Result<()> {
        let data_dir = self.layout.data_dir.clone();
        drop(self);
        if data_dir.exists() {
            fs::remove_dir_all(&data_dir)
                .with_context(|| format!("無法刪除快取資料夾: {}", data_dir.display()))?;
        }
        info!("已清除快取: {}", data_dir.display());
        Ok(())
    }
}
