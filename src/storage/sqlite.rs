//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Repository trait.

use crate::state::SiteStatus;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Repository, StorageError, StorageResult};
use crate::storage::{PageRecord, SiteJob, SiteSummary};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite storage backend
///
/// The connection sits behind a mutex so one repository can be shared by every
/// site job of a run.
pub struct SqliteRepository {
    conn: Mutex<Connection>,
}

impl SqliteRepository {
    /// Opens (or creates) the database at `path`
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Database("connection lock poisoned".to_string()))
    }
}

fn site_job_from_row(row: &Row<'_>) -> rusqlite::Result<SiteJob> {
    Ok(SiteJob {
        id: row.get(0)?,
        url: row.get(1)?,
        name: row.get(2)?,
        status: SiteStatus::from_db_string(&row.get::<_, String>(3)?)
            .unwrap_or(SiteStatus::Failed),
        status_time: row.get(4)?,
        last_error: row.get(5)?,
    })
}

impl Repository for SqliteRepository {
    // ===== Site Jobs =====

    fn delete_site_data(&self, url: &str) -> StorageResult<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM sites WHERE url = ?1", params![url])?;
        Ok(())
    }

    fn create_site_job(&self, url: &str, name: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO sites (url, name, status, status_time) VALUES (?1, ?2, ?3, ?4)",
            params![url, name, SiteStatus::Indexing.to_db_string(), now],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn update_job_status(
        &self,
        job_id: i64,
        status: SiteStatus,
        last_error: Option<&str>,
    ) -> StorageResult<()> {
        if !SiteStatus::Indexing.can_transition_to(status) {
            return Err(StorageError::InvalidTransition {
                from: SiteStatus::Indexing,
                to: status,
            });
        }

        let now = Utc::now().to_rfc3339();
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE sites SET status = ?1, status_time = ?2, last_error = ?3
             WHERE id = ?4 AND status = ?5",
            params![
                status.to_db_string(),
                now,
                last_error,
                job_id,
                SiteStatus::Indexing.to_db_string()
            ],
        )?;

        if updated == 0 {
            let current: Option<String> = conn
                .query_row(
                    "SELECT status FROM sites WHERE id = ?1",
                    params![job_id],
                    |row| row.get(0),
                )
                .optional()?;

            return match current.and_then(|s| SiteStatus::from_db_string(&s)) {
                Some(from) => Err(StorageError::InvalidTransition { from, to: status }),
                None => Err(StorageError::JobNotFound(job_id)),
            };
        }

        Ok(())
    }

    fn get_site_job(&self, job_id: i64) -> StorageResult<SiteJob> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, url, name, status, status_time, last_error FROM sites WHERE id = ?1",
            params![job_id],
            site_job_from_row,
        )
        .optional()?
        .ok_or(StorageError::JobNotFound(job_id))
    }

    fn get_site_job_by_url(&self, url: &str) -> StorageResult<Option<SiteJob>> {
        let conn = self.lock()?;
        let job = conn
            .query_row(
                "SELECT id, url, name, status, status_time, last_error FROM sites WHERE url = ?1",
                params![url],
                site_job_from_row,
            )
            .optional()?;
        Ok(job)
    }

    // ===== Pages =====

    fn save_all_pages(&self, records: &[PageRecord]) -> StorageResult<()> {
        if records.is_empty() {
            return Ok(());
        }

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO pages (site_id, path, code, content, error) VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for record in records {
                stmt.execute(params![
                    record.site_id,
                    record.path,
                    record.code,
                    record.content,
                    record.error
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn get_pages(&self, job_id: i64) -> StorageResult<Vec<PageRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT site_id, path, code, content, error FROM pages WHERE site_id = ?1 ORDER BY path",
        )?;

        let pages = stmt
            .query_map(params![job_id], |row| {
                Ok(PageRecord {
                    site_id: row.get(0)?,
                    path: row.get(1)?,
                    code: row.get(2)?,
                    content: row.get(3)?,
                    error: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(pages)
    }

    // ===== Statistics =====

    fn site_summaries(&self) -> StorageResult<Vec<SiteSummary>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT s.url, s.name, s.status, s.status_time, s.last_error,
                    COUNT(p.id),
                    COALESCE(SUM(CASE WHEN p.content IS NULL THEN 1 ELSE 0 END), 0)
             FROM sites s
             LEFT JOIN pages p ON p.site_id = s.id
             GROUP BY s.id
             ORDER BY s.id",
        )?;

        let summaries = stmt
            .query_map([], |row| {
                Ok(SiteSummary {
                    url: row.get(0)?,
                    name: row.get(1)?,
                    status: SiteStatus::from_db_string(&row.get::<_, String>(2)?)
                        .unwrap_or(SiteStatus::Failed),
                    status_time: row.get(3)?,
                    last_error: row.get(4)?,
                    pages: row.get::<_, i64>(5)? as u64,
                    failed_pages: row.get::<_, i64>(6)? as u64,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(summaries)
    }
}
