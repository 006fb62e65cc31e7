use crate::library::Library;
use crate::store::{LAST_SCAN_AT, LAST_SCAN_ROOT};
use anyhow::{Result, bail};
use console::style;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Select};
use log::info;
use rust_i18n::t;
use std::path::PathBuf;
use std::sync::Arc;

const RECENT_SCAN_LIMIT: usize = 5;
const LISTED_VIDEO_LIMIT: usize = 20;

/// 互動式影片庫維護
#[derive(Debug, Default)]
pub struct CatalogMaintenance;

impl CatalogMaintenance {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// 影片庫概覽：影片數、最近掃描、最新加入的影片
    pub fn show_overview(&self, library: &Library) -> Result<()> {
        let store = library.store();
        println!("{}", style(t!("catalog.title")).cyan().bold());
        println!("  {}", t!("catalog.root", path = library.root().display()));
        println!("  {}", t!("catalog.video_count", count = store.count_videos()?));
        println!(
            "  {}",
            t!("catalog.missing_proxy", count = store.videos_missing_proxy()?.len())
        );

        if let Some(at) = store.get_setting(LAST_SCAN_AT)? {
            let root = store.get_setting(LAST_SCAN_ROOT)?.unwrap_or_default();
            println!("  {}", t!("catalog.last_scan", at = at, root = root));
        }

        let scans = store.recent_scans(RECENT_SCAN_LIMIT)?;
        if !scans.is_empty() {
            println!("\n{}", style(t!("catalog.recent_scans")).bold());
            for scan in &scans {
                println!(
                    "  {} [{}] {}",
                    scan.started_at.format("%Y-%m-%d %H:%M:%S"),
                    scan.status.as_str(),
                    t!("catalog.videos_found", count = scan.videos_found)
                );
            }
        }

        let videos = store.all_videos()?;
        if !videos.is_empty() {
            println!("\n{}", style(t!("catalog.newest_videos")).bold());
            for video in videos.iter().take(LISTED_VIDEO_LIMIT) {
                let resolution = match (video.width, video.height) {
                    (Some(w), Some(h)) => format!("{w}x{h}"),
                    _ => "-".to_string(),
                };
                let proxy = if video.has_proxy { "P" } else { " " };
                println!(
                    "  {proxy} {:>8.1}s {resolution:>9}  {}",
                    video.duration,
                    video.path.display()
                );
            }
        }

        let favorites = store.favorite_videos()?;
        if !favorites.is_empty() {
            println!(
                "\n{}",
                style(t!("catalog.favorites", count = favorites.len())).bold()
            );
            for video in favorites.iter().take(LISTED_VIDEO_LIMIT) {
                println!("  ★ {}", video.path.display());
            }
        }
        Ok(())
    }

    /// 切換我的最愛或編輯備註
    pub fn edit_selection(&self, library: &Library) -> Result<()> {
        println!("{}", style(t!("selection.title")).cyan().bold());
        let input: String = Input::new()
            .with_prompt(t!("selection.prompt"))
            .interact_text()?;
        let input = input.trim();
        if input.is_empty() {
            return Ok(());
        }

        let store = library.store();
        let path = resolve_in_library(library, input)?;
        let Some(video) = store.get_video_by_path(&path)? else {
            println!("{}", style(t!("selection.not_found", path = path.display())).yellow());
            return Ok(());
        };
        let current = store.get_selection(&video.id)?;
        let is_favorite = current.as_ref().is_some_and(|s| s.is_favorite);
        let notes = current.and_then(|s| s.notes).unwrap_or_default();
        println!(
            "  {} {}",
            if is_favorite { "★" } else { "☆" },
            video.path.display()
        );
        if !notes.is_empty() {
            println!("  {}", t!("selection.current_notes", notes = notes));
        }

        let options = [t!("selection.opt_favorite"), t!("selection.opt_notes")];
        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt(t!("selection.action"))
            .items(&options)
            .default(0)
            .interact_opt()?;

        match selection {
            Some(0) => {
                let favorite = store.toggle_favorite(&video.id)?;
                let message = if favorite {
                    t!("selection.favorited")
                } else {
                    t!("selection.unfavorited")
                };
                println!("{}", style(message).green());
            }
            Some(1) => {
                let edited: String = Input::new()
                    .with_prompt(t!("selection.notes_prompt"))
                    .with_initial_text(notes)
                    .allow_empty(true)
                    .interact_text()?;
                store.set_notes(&video.id, Some(&edited))?;
                println!("{}", style(t!("selection.notes_saved")).green());
            }
            _ => {}
        }
        Ok(())
    }

    /// 清除指定目錄下的影片紀錄與衍生檔案
    pub fn purge_directory(&self, library: &Library) -> Result<()> {
        println!("{}", style(t!("purge.title")).cyan().bold());
        let input: String = Input::new()
            .with_prompt(t!("purge.prompt"))
            .interact_text()?;
        let input = input.trim();
        if input.is_empty() {
            return Ok(());
        }

        let directory = resolve_in_library(library, input)?;

        let count = library.store().videos_under_directory(&directory)?.len();
        if count == 0 {
            println!("{}", style(t!("purge.nothing")).yellow());
            return Ok(());
        }

        let confirmed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(t!("purge.confirm", count = count, path = directory.display()))
            .default(false)
            .interact()?;
        if confirmed {
            let removed = library.purge_directory(&directory)?;
            println!("{}", style(t!("purge.done", count = removed)).green());
        }
        Ok(())
    }

    /// 刪除影片庫所有快取資料
    ///
    /// 清除成功時控制代碼被消耗並回傳 `None`；取消或仍有其他持有者
    /// （如背景佇列）時原樣交還。
    pub fn clear_cache(&self, library: Arc<Library>) -> Result<Option<Arc<Library>>> {
        println!("{}", style(t!("cache.title")).cyan().bold());
        let confirmed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(t!("cache.confirm", path = library.layout().data_dir.display()))
            .default(false)
            .interact()?;
        if !confirmed {
            return Ok(Some(library));
        }

        if library.is_scanning() || library.is_queue_running() {
            println!("{}", style(t!("cache.busy")).yellow());
            return Ok(Some(library));
        }
        let library = match Arc::try_unwrap(library) {
            Ok(library) => library,
            Err(shared) => {
                println!("{}", style(t!("cache.busy")).yellow());
                return Ok(Some(shared));
            }
        };

        let root = library.root().to_path_buf();
        library.clear_cache()?;
        info!("已清除影片庫快取: {}", root.display());
        println!("{}", style(t!("cache.done")).green());
        Ok(None)
    }
}

/// 相對路徑以影片庫根目錄為基準，且必須位於影片庫內
fn resolve_in_library(library: &Library, input: &str) -> Result<PathBuf> {
    let mut path = PathBuf::from(input);
    if path.is_relative() {
        path = library.root().join(path);
    }
    if !path.starts_with(library.root()) {
        bail!("{}", t!("library.outside_root", path = path.display()));
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_in_library() {
        let temp_dir = TempDir::new().unwrap();
        let library = Library::open(temp_dir.path()).unwrap();

        let relative = resolve_in_library(&library, "trip/a.mp4").unwrap();
        assert_eq!(relative, library.root().join("trip/a.mp4"));

        let absolute = library.root().join("b.mp4");
        let resolved = resolve_in_library(&library, &absolute.to_string_lossy()).unwrap();
        assert_eq!(resolved, absolute);

        assert!(resolve_in_library(&library, "/definitely/elsewhere").is_err());
    }
}
