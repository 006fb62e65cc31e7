use crate::config::FileTypeTable;
use log::warn;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// 影片檔案走訪器
///
/// 以深度優先、惰性方式列出根目錄下所有影片檔案。
/// 名稱以 `.` 開頭的項目與黑名單資料夾會被略過；
/// 無法讀取的子資料夾只記錄警告，不會中斷走訪。
#[derive(Debug, Clone)]
pub struct VideoWalker {
    root: PathBuf,
    video_extensions: HashSet<String>,
    skip_directories: HashSet<String>,
}

impl VideoWalker {
    #[must_use]
    pub fn new(root: &Path, file_type_table: &FileTypeTable) -> Self {
        Self {
            root: root.to_path_buf(),
            video_extensions: file_type_table.video_extensions_set(),
            skip_directories: file_type_table.skip_directory_set(),
        }
    }

    /// 每次呼叫都從頭重新列舉
    pub fn walk(&self) -> impl Iterator<Item = PathBuf> + '_ {
        WalkDir::new(&self.root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !self.is_skipped(entry))
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    let location = e
                        .path()
                        .map_or_else(|| "?".to_string(), |p| p.display().to_string());
                    warn!("無法讀取 {location}，略過: {e}");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| self.is_video(entry.path()))
            .map(DirEntry::into_path)
    }

    fn is_skipped(&self, entry: &DirEntry) -> bool {
        let name = entry.file_name().to_string_lossy();
        if name.starts_with('.') {
            return true;
        }
        entry.file_type().is_dir() && self.skip_directories.contains(name.as_ref())
    }

    fn is_video(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.video_extensions.contains(&ext.to_lowercase()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn table() -> FileTypeTable {
        FileTypeTable {
            video_file: vec![".mp4".to_string(), ".mov".to_string(), ".mkv".to_string()],
            skip_directory: vec!["node_modules".to_string(), "__MACOSX".to_string()],
        }
    }

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"x").unwrap();
    }

    #[test]
    fn test_walk_finds_nested_videos() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        touch(&root.join("a.mp4"));
        touch(&root.join("sub/b.MOV"));
        touch(&root.join("sub/deeper/still/c.mkv"));
        touch(&root.join("sub/notes.txt"));

        let walker = VideoWalker::new(root, &table());
        let mut found: Vec<_> = walker.walk().collect();
        found.sort();

        assert_eq!(
            found,
            vec![
                root.join("a.mp4"),
                root.join("sub/b.MOV"),
                root.join("sub/deeper/still/c.mkv"),
            ]
        );
    }

    #[test]
    fn test_walk_skips_hidden_and_deny_listed() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        touch(&root.join("keep.mp4"));
        touch(&root.join(".hidden.mp4"));
        touch(&root.join(".catalog-data/proxies/x_proxy.mp4"));
        touch(&root.join("node_modules/pkg/demo.mp4"));
        touch(&root.join("__MACOSX/clip.mov"));
        touch(&root.join("ok/.secret/inner.mp4"));

        let walker = VideoWalker::new(root, &table());
        let found: Vec<_> = walker.walk().collect();

        assert_eq!(found, vec![root.join("keep.mp4")]);
    }

    #[test]
    fn test_walk_is_restartable() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        touch(&root.join("a.mp4"));

        let walker = VideoWalker::new(root, &table());
        assert_eq!(walker.walk().count(), 1);
        touch(&root.join("b.mp4"));
        assert_eq!(walker.walk().count(), 2);
    }

    #[test]
    fn test_walk_hidden_root_is_still_walked() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join(".library");
        touch(&root.join("a.mp4"));

        let walker = VideoWalker::new(&root, &table());
        assert_eq!(walker.walk().count(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_walk_continues_past_unreadable_directory() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        touch(&root.join("a/one.mp4"));
        touch(&root.join("locked/two.mp4"));
        touch(&root.join("z/three.mp4"));
        let locked = root.join("locked");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        let walker = VideoWalker::new(root, &table());
        let found: Vec<_> = walker.walk().collect();

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        assert!(found.contains(&root.join("a/one.mp4")));
        assert!(found.contains(&root.join("z/three.mp4")));
        // root 權限下仍可讀取，因此不檢查 locked 內容
    }
}
