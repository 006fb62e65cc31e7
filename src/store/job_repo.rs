use super::models::{JobStatus, ProxyJob};
use super::{Store, invalid_column};
use anyhow::{Context, Result, bail};
use chrono::Utc;
use rusqlite::{OptionalExtension, Row, params};

const JOB_COLUMNS: &str =
    "id, video_id, status, progress, created_at, started_at, completed_at, error";

fn row_to_job(row: &Row<'_>) -> rusqlite::Result<ProxyJob> {
    let raw_status: String = row.get(2)?;
    let status = JobStatus::parse(&raw_status).ok_or_else(|| invalid_column(2, &raw_status))?;
    Ok(ProxyJob {
        id: row.get(0)?,
        video_id: row.get(1)?,
        status,
        progress: row.get::<_, i64>(3)?.clamp(0, 100) as u8,
        created_at: row.get(4)?,
        started_at: row.get(5)?,
        completed_at: row.get(6)?,
        error: row.get(7)?,
    })
}

impl Store {
    /// 將影片加入 proxy 佇列
    ///
    /// 若該影片已有 queued 或 processing 的工作，直接回傳該工作。
    pub fn enqueue_job(&self, video_id: &str) -> Result<ProxyJob> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM videos WHERE id = ?1)",
            params![video_id],
            |row| row.get(0),
        )?;
        if !exists {
            bail!("找不到影片: {video_id}");
        }

        let active_sql = format!(
            "SELECT {JOB_COLUMNS} FROM proxy_queue \
             WHERE video_id = ?1 AND status IN ('queued', 'processing') \
             ORDER BY created_at, rowid LIMIT 1"
        );
        if let Some(job) = tx
            .query_row(&active_sql, params![video_id], row_to_job)
            .optional()?
        {
            return Ok(job);
        }

        let job = ProxyJob {
            id: uuid::Uuid::new_v4().to_string(),
            video_id: video_id.to_string(),
            status: JobStatus::Queued,
            progress: 0,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            error: None,
        };
        tx.execute(
            "INSERT INTO proxy_queue (id, video_id, status, progress, created_at) \
             VALUES (?1, ?2, ?3, 0, ?4)",
            params![job.id, job.video_id, job.status.as_str(), job.created_at],
        )
        .with_context(|| format!("無法加入佇列: {video_id}"))?;
        tx.commit()?;
        Ok(job)
    }

    pub fn get_job(&self, id: &str) -> Result<Option<ProxyJob>> {
        let sql = format!("SELECT {JOB_COLUMNS} FROM proxy_queue WHERE id = ?1");
        Ok(self
            .conn()
            .query_row(&sql, params![id], row_to_job)
            .optional()?)
    }

    /// 佇列最前端（最早建立）的 queued 工作
    pub fn next_queued_job(&self) -> Result<Option<ProxyJob>> {
        let sql = format!(
            "SELECT {JOB_COLUMNS} FROM proxy_queue WHERE status = 'queued' \
             ORDER BY created_at, rowid LIMIT 1"
        );
        Ok(self.conn().query_row(&sql, [], row_to_job).optional()?)
    }

    /// 取出最前端的 queued 工作並標記為 processing（progress 歸零）
    pub fn claim_next_job(&self) -> Result<Option<ProxyJob>> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let sql = format!(
            "SELECT {JOB_COLUMNS} FROM proxy_queue WHERE status = 'queued' \
             ORDER BY created_at, rowid LIMIT 1"
        );
        let Some(mut job) = tx.query_row(&sql, [], row_to_job).optional()? else {
            return Ok(None);
        };

        let started_at = Utc::now();
        tx.execute(
            "UPDATE proxy_queue SET status = 'processing', progress = 0, started_at = ?2 \
             WHERE id = ?1",
            params![job.id, started_at],
        )?;
        tx.commit()?;

        job.status = JobStatus::Processing;
        job.progress = 0;
        job.started_at = Some(started_at);
        Ok(Some(job))
    }

    /// 更新進度，只允許遞增
    pub fn update_job_progress(&self, id: &str, progress: u8) -> Result<()> {
        self.conn().execute(
            "UPDATE proxy_queue SET progress = MAX(progress, ?2) \
             WHERE id = ?1 AND status = 'processing'",
            params![id, i64::from(progress.min(100))],
        )?;
        Ok(())
    }

    pub fn complete_job(&self, id: &str) -> Result<()> {
        self.conn().execute(
            "UPDATE proxy_queue SET status = 'complete', progress = 100, completed_at = ?2, \
             error = NULL WHERE id = ?1",
            params![id, Utc::now()],
        )?;
        Ok(())
    }

    pub fn fail_job(&self, id: &str, message: &str) -> Result<()> {
        self.conn().execute(
            "UPDATE proxy_queue SET status = 'error', completed_at = ?2, error = ?3 WHERE id = ?1",
            params![id, Utc::now(), message],
        )?;
        Ok(())
    }

    /// 手動將 error 或卡住的 processing 工作放回佇列尾端
    pub fn requeue_job(&self, id: &str) -> Result<bool> {
        let updated = self.conn().execute(
            "UPDATE proxy_queue SET status = 'queued', progress = 0, created_at = ?2, \
             started_at = NULL, completed_at = NULL, error = NULL \
             WHERE id = ?1 AND status IN ('error', 'processing')",
            params![id, Utc::now()],
        )?;
        Ok(updated > 0)
    }

    /// 全部工作，依建立時間由新到舊
    pub fn list_jobs(&self) -> Result<Vec<ProxyJob>> {
        let sql = format!(
            "SELECT {JOB_COLUMNS} FROM proxy_queue ORDER BY created_at DESC, rowid DESC"
        );
        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let jobs = stmt.query_map([], row_to_job)?;
        Ok(jobs.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn jobs_with_status(&self, status: JobStatus) -> Result<Vec<ProxyJob>> {
        let sql = format!(
            "SELECT {JOB_COLUMNS} FROM proxy_queue WHERE status = ?1 ORDER BY created_at, rowid"
        );
        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let jobs = stmt.query_map(params![status.as_str()], row_to_job)?;
        Ok(jobs.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}
