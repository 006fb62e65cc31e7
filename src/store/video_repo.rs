use super::Store;
use super::models::{AssetPaths, VideoRecord};
use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::{MAIN_SEPARATOR, Path, PathBuf};

pub(super) const VIDEO_COLUMNS: &str = "id, file_path, file_name, file_size, duration, width, height, \
     codec, frame_rate, bit_rate, created_at, directory, file_hash, file_mtime, scanned_at, \
     thumbnail_path, sprite_path, proxy_path, has_thumbnail, has_sprite, has_proxy";

fn path_text(path: Option<&PathBuf>) -> Option<String> {
    path.map(|p| p.to_string_lossy().to_string())
}

fn upsert_in(conn: &Connection, video: &VideoRecord) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO videos (
            id, file_path, file_name, file_size, duration, width, height,
            codec, frame_rate, bit_rate, created_at, directory, file_hash, file_mtime, scanned_at,
            thumbnail_path, sprite_path, proxy_path, has_thumbnail, has_sprite, has_proxy
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21)
        ON CONFLICT(id) DO UPDATE SET
            file_path = excluded.file_path,
            file_name = excluded.file_name,
            file_size = excluded.file_size,
            duration = excluded.duration,
            width = excluded.width,
            height = excluded.height,
            codec = excluded.codec,
            frame_rate = excluded.frame_rate,
            bit_rate = excluded.bit_rate,
            created_at = excluded.created_at,
            directory = excluded.directory,
            file_hash = excluded.file_hash,
            file_mtime = excluded.file_mtime,
            scanned_at = excluded.scanned_at,
            thumbnail_path = excluded.thumbnail_path,
            sprite_path = excluded.sprite_path,
            proxy_path = excluded.proxy_path,
            has_thumbnail = excluded.has_thumbnail,
            has_sprite = excluded.has_sprite,
            has_proxy = excluded.has_proxy",
        params![
            video.id,
            video.path.to_string_lossy(),
            video.name,
            video.size as i64,
            video.duration,
            video.width,
            video.height,
            video.codec,
            video.frame_rate,
            video.bit_rate.map(|b| b as i64),
            video.created_at,
            video.directory,
            video.fingerprint,
            video.source_mtime,
            video.scanned_at,
            path_text(video.thumbnail_path.as_ref()),
            path_text(video.sprite_path.as_ref()),
            path_text(video.proxy_path.as_ref()),
            video.has_thumbnail,
            video.has_sprite,
            video.has_proxy,
        ],
    )?;
    Ok(())
}

pub(super) fn row_to_video(row: &Row<'_>) -> rusqlite::Result<VideoRecord> {
    Ok(VideoRecord {
        id: row.get(0)?,
        path: PathBuf::from(row.get::<_, String>(1)?),
        name: row.get(2)?,
        size: row.get::<_, i64>(3)? as u64,
        duration: row.get(4)?,
        width: row.get(5)?,
        height: row.get(6)?,
        codec: row.get(7)?,
        frame_rate: row.get(8)?,
        bit_rate: row.get::<_, Option<i64>>(9)?.map(|b| b as u64),
        created_at: row.get(10)?,
        directory: row.get(11)?,
        fingerprint: row.get(12)?,
        source_mtime: row.get(13)?,
        scanned_at: row.get(14)?,
        thumbnail_path: row.get::<_, Option<String>>(15)?.map(PathBuf::from),
        sprite_path: row.get::<_, Option<String>>(16)?.map(PathBuf::from),
        proxy_path: row.get::<_, Option<String>>(17)?.map(PathBuf::from),
        has_thumbnail: row.get(18)?,
        has_sprite: row.get(19)?,
        has_proxy: row.get(20)?,
    })
}

/// 目錄前綴的範圍查詢邊界：`[prefix/, prefix0)`（分隔字元的下一個字元）
fn prefix_bounds(prefix: &str) -> (String, String, String) {
    let exact = prefix.trim_end_matches(MAIN_SEPARATOR).to_string();
    let lower = format!("{exact}{MAIN_SEPARATOR}");
    let next = char::from_u32(MAIN_SEPARATOR as u32 + 1).unwrap_or(char::MAX);
    let upper = format!("{exact}{next}");
    (exact, lower, upper)
}

impl Store {
    /// 單筆寫入（以主鍵 upsert，不會重複）
    pub fn upsert_video(&self, video: &VideoRecord) -> Result<()> {
        upsert_in(&self.conn(), video)
            .with_context(|| format!("無法寫入影片紀錄: {}", video.path.display()))
    }

    /// 批次寫入，單一交易，全部成功或全部不寫入
    pub fn upsert_videos(&self, videos: &[VideoRecord]) -> Result<usize> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        for video in videos {
            upsert_in(&tx, video)
                .with_context(|| format!("批次寫入失敗: {}", video.path.display()))?;
        }
        tx.commit().context("無法提交批次寫入")?;
        Ok(videos.len())
    }

    pub fn get_video(&self, id: &str) -> Result<Option<VideoRecord>> {
        let sql = format!("SELECT {VIDEO_COLUMNS} FROM videos WHERE id = ?1");
        Ok(self
            .conn()
            .query_row(&sql, params![id], row_to_video)
            .optional()?)
    }

    pub fn get_video_by_path(&self, path: &Path) -> Result<Option<VideoRecord>> {
        let sql = format!("SELECT {VIDEO_COLUMNS} FROM videos WHERE file_path = ?1");
        Ok(self
            .conn()
            .query_row(&sql, params![path.to_string_lossy()], row_to_video)
            .optional()?)
    }

    /// 列出目錄（含子目錄）下的所有影片
    pub fn videos_under_directory(&self, prefix: &Path) -> Result<Vec<VideoRecord>> {
        let (exact, lower, upper) = prefix_bounds(&prefix.to_string_lossy());
        let sql = format!(
            "SELECT {VIDEO_COLUMNS} FROM videos \
             WHERE directory = ?1 OR (directory >= ?2 AND directory < ?3) \
             ORDER BY file_path"
        );
        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let videos = stmt.query_map(params![exact, lower, upper], row_to_video)?;
        Ok(videos.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// 全部影片，依建立時間由新到舊
    pub fn all_videos(&self) -> Result<Vec<VideoRecord>> {
        let sql = format!("SELECT {VIDEO_COLUMNS} FROM videos ORDER BY created_at DESC, file_path");
        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let videos = stmt.query_map([], row_to_video)?;
        Ok(videos.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn videos_missing_proxy(&self) -> Result<Vec<VideoRecord>> {
        let sql = format!(
            "SELECT {VIDEO_COLUMNS} FROM videos WHERE has_proxy = 0 ORDER BY created_at DESC, file_path"
        );
        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let videos = stmt.query_map([], row_to_video)?;
        Ok(videos.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn count_videos(&self) -> Result<usize> {
        let count: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM videos", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// 更新衍生素材路徑（單一 UPDATE，`None` 欄位保持原值）
    ///
    /// 提供 `fingerprint` 時一併寫入，代表此影片已完整處理。
    pub fn update_video_assets(
        &self,
        id: &str,
        assets: &AssetPaths,
        fingerprint: Option<&str>,
    ) -> Result<bool> {
        let updated = self.conn().execute(
            "UPDATE videos SET
                thumbnail_path = COALESCE(?2, thumbnail_path),
                has_thumbnail = CASE WHEN ?2 IS NULL THEN has_thumbnail ELSE 1 END,
                sprite_path = COALESCE(?3, sprite_path),
                has_sprite = CASE WHEN ?3 IS NULL THEN has_sprite ELSE 1 END,
                proxy_path = COALESCE(?4, proxy_path),
                has_proxy = CASE WHEN ?4 IS NULL THEN has_proxy ELSE 1 END,
                file_hash = COALESCE(?5, file_hash)
             WHERE id = ?1",
            params![
                id,
                path_text(assets.thumbnail.as_ref()),
                path_text(assets.sprite.as_ref()),
                path_text(assets.proxy.as_ref()),
                fingerprint,
            ],
        )?;
        Ok(updated > 0)
    }

    /// 刪除目錄（含子目錄）下的影片紀錄，回傳被刪除的紀錄
    ///
    /// 相關的 proxy 工作會因外鍵一併刪除。
    pub fn delete_videos_under_directory(&self, prefix: &Path) -> Result<Vec<VideoRecord>> {
        let (exact, lower, upper) = prefix_bounds(&prefix.to_string_lossy());
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let removed = {
            let sql = format!(
                "SELECT {VIDEO_COLUMNS} FROM videos \
                 WHERE directory = ?1 OR (directory >= ?2 AND directory < ?3)"
            );
            let mut stmt = tx.prepare(&sql)?;
            let rows = stmt.query_map(params![exact, lower, upper], row_to_video)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };
        tx.execute(
            "DELETE FROM videos WHERE directory = ?1 OR (directory >= ?2 AND directory < ?3)",
            params![exact, lower, upper],
        )?;
        tx.commit()?;
        Ok(removed)
    }
}
