//! Audit log repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Rows are never updated or deleted.
//! - `record` checks for an existing key before inserting and the insert is
//!   `OR IGNORE`, so recording the same key twice leaves one row.

use crate::model::audit::{LogAction, LogEntry};
use crate::model::timestamp::{format_wiki_ts, format_wp10_ts};
use crate::repo::{parse_wiki_ts_column, parse_wp10_ts_column, RepoError, RepoResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, Row};

pub trait LogRepository {
    fn is_recorded(
        &self,
        project: &str,
        namespace: i64,
        article: &str,
        action: LogAction,
        timestamp: &NaiveDateTime,
    ) -> RepoResult<bool>;
    /// Returns `true` when a new row was written.
    fn record(&self, entry: &LogEntry) -> RepoResult<bool>;
    /// All rows for `project`, oldest cycle first.
    fn list_for_project(&self, project: &str) -> RepoResult<Vec<LogEntry>>;
}

/// SQLite-backed audit log repository.
pub struct SqliteLogRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteLogRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl LogRepository for SqliteLogRepository<'_> {
    fn is_recorded(
        &self,
        project: &str,
        namespace: i64,
        article: &str,
        action: LogAction,
        timestamp: &NaiveDateTime,
    ) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM logging
                WHERE l_project = ?1
                  AND l_namespace = ?2
                  AND l_article = ?3
                  AND l_action = ?4
                  AND l_timestamp = ?5
            );",
            params![
                project,
                namespace,
                article,
                action.as_str(),
                format_wp10_ts(timestamp)
            ],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn record(&self, entry: &LogEntry) -> RepoResult<bool> {
        if self.is_recorded(
            &entry.project,
            entry.namespace,
            &entry.article,
            entry.action,
            &entry.timestamp,
        )? {
            return Ok(false);
        }

        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO logging (
                l_project,
                l_namespace,
                l_article,
                l_action,
                l_timestamp,
                l_old,
                l_new,
                l_revision_timestamp
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                entry.project.as_str(),
                entry.namespace,
                entry.article.as_str(),
                entry.action.as_str(),
                format_wp10_ts(&entry.timestamp),
                entry.old.as_deref(),
                entry.new.as_deref(),
                format_wiki_ts(&entry.revision_timestamp),
            ],
        )?;
        Ok(inserted == 1)
    }

    fn list_for_project(&self, project: &str) -> RepoResult<Vec<LogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                l_project,
                l_namespace,
                l_article,
                l_action,
                l_timestamp,
                l_old,
                l_new,
                l_revision_timestamp
             FROM logging
             WHERE l_project = ?1
             ORDER BY l_timestamp ASC, l_namespace ASC, l_article ASC, l_action ASC;",
        )?;
        let mut rows = stmt.query([project])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push(parse_log_row(row)?);
        }
        Ok(entries)
    }
}

fn parse_log_row(row: &Row<'_>) -> RepoResult<LogEntry> {
    let action_text: String = row.get("l_action")?;
    let action = LogAction::parse(&action_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid action `{action_text}` in logging.l_action"))
    })?;
    let timestamp_text: String = row.get("l_timestamp")?;
    let revision_timestamp = parse_wiki_ts_column(
        Some(row.get("l_revision_timestamp")?),
        "logging.l_revision_timestamp",
    )?
    .ok_or_else(|| RepoError::InvalidData("logging.l_revision_timestamp is empty".to_string()))?;

    Ok(LogEntry {
        project: row.get("l_project")?,
        namespace: row.get("l_namespace")?,
        article: row.get("l_article")?,
        action,
        timestamp: parse_wp10_ts_column(&timestamp_text, "logging.l_timestamp")?,
        old: row.get("l_old")?,
        new: row.get("l_new")?,
        revision_timestamp,
    })
}
