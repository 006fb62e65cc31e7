use super::Store;
use super::models::{Selection, VideoRecord};
use super::video_repo::{VIDEO_COLUMNS, row_to_video};
use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{OptionalExtension, params};

impl Store {
    /// 切換我的最愛，回傳切換後的狀態
    pub fn toggle_favorite(&self, video_id: &str) -> Result<bool> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO selections (video_id, is_favorite, created_at) VALUES (?1, 1, ?2)
             ON CONFLICT(video_id) DO UPDATE SET is_favorite = 1 - is_favorite",
            params![video_id, Utc::now()],
        )
        .with_context(|| format!("無法標記影片: {video_id}"))?;
        let is_favorite: bool = tx.query_row(
            "SELECT is_favorite FROM selections WHERE video_id = ?1",
            params![video_id],
            |row| row.get(0),
        )?;
        tx.commit()?;
        Ok(is_favorite)
    }

    /// 設定備註，空白內容視為清除
    pub fn set_notes(&self, video_id: &str, notes: Option<&str>) -> Result<()> {
        let notes = notes.map(str::trim).filter(|n| !n.is_empty());
        self.conn()
            .execute(
                "INSERT INTO selections (video_id, is_favorite, notes, created_at)
                 VALUES (?1, 0, ?2, ?3)
                 ON CONFLICT(video_id) DO UPDATE SET notes = excluded.notes",
                params![video_id, notes, Utc::now()],
            )
            .with_context(|| format!("無法寫入備註: {video_id}"))?;
        Ok(())
    }

    pub fn get_selection(&self, video_id: &str) -> Result<Option<Selection>> {
        Ok(self
            .conn()
            .query_row(
                "SELECT video_id, is_favorite, notes, created_at FROM selections WHERE video_id = ?1",
                params![video_id],
                |row| {
                    Ok(Selection {
                        video_id: row.get(0)?,
                        is_favorite: row.get(1)?,
                        notes: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                },
            )
            .optional()?)
    }

    /// 我的最愛影片，依建立時間由新到舊
    pub fn favorite_videos(&self) -> Result<Vec<VideoRecord>> {
        let sql = format!(
            "SELECT {VIDEO_COLUMNS} FROM videos \
             WHERE id IN (SELECT video_id FROM selections WHERE is_favorite = 1) \
             ORDER BY created_at DESC, file_path"
        );
        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let videos = stmt.query_map([], row_to_video)?;
        Ok(videos.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}
