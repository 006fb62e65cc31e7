use super::models::{ScanSession, ScanStatus};
use super::{Store, invalid_column};
use anyhow::Result;
use chrono::Utc;
use rusqlite::{OptionalExtension, Row, params};
use std::path::PathBuf;

fn row_to_session(row: &Row<'_>) -> rusqlite::Result<ScanSession> {
    let raw_status: String = row.get(2)?;
    let status = ScanStatus::parse(&raw_status).ok_or_else(|| invalid_column(2, &raw_status))?;
    Ok(ScanSession {
        id: row.get(0)?,
        root_path: PathBuf::from(row.get::<_, String>(1)?),
        status,
        videos_found: row.get::<_, i64>(3)? as usize,
        started_at: row.get(4)?,
        completed_at: row.get(5)?,
    })
}

impl Store {
    pub fn insert_scan(&self, session: &ScanSession) -> Result<()> {
        self.conn().execute(
            "INSERT INTO scans (id, root_path, status, videos_found, started_at, completed_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                session.id,
                session.root_path.to_string_lossy(),
                session.status.as_str(),
                session.videos_found as i64,
                session.started_at,
                session.completed_at,
            ],
        )?;
        Ok(())
    }

    pub fn update_scan_found(&self, id: &str, videos_found: usize) -> Result<()> {
        self.conn().execute(
            "UPDATE scans SET videos_found = ?2 WHERE id = ?1",
            params![id, videos_found as i64],
        )?;
        Ok(())
    }

    pub fn finish_scan(&self, id: &str, status: ScanStatus) -> Result<()> {
        self.conn().execute(
            "UPDATE scans SET status = ?2, completed_at = ?3 WHERE id = ?1",
            params![id, status.as_str(), Utc::now()],
        )?;
        Ok(())
    }

    pub fn get_scan(&self, id: &str) -> Result<Option<ScanSession>> {
        Ok(self
            .conn()
            .query_row(
                "SELECT id, root_path, status, videos_found, started_at, completed_at \
                 FROM scans WHERE id = ?1",
                params![id],
                row_to_session,
            )
            .optional()?)
    }

    /// 最近的掃描紀錄
    pub fn recent_scans(&self, limit: usize) -> Result<Vec<ScanSession>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, root_path, status, videos_found, started_at, completed_at \
             FROM scans ORDER BY started_at DESC, rowid DESC LIMIT ?1",
        )?;
        let sessions = stmt.query_map(params![limit as i64], row_to_session)?;
        Ok(sessions.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}
