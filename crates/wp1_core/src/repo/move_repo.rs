//! Move repository contracts and SQLite implementation.
//!
//! # Invariants
//! - `moves` is global (not per project) and append-only.
//! - Inserting an already-recorded move is a no-op, which also absorbs
//!   races between workers reconciling different projects.

use crate::model::page_move::PageMove;
use crate::model::timestamp::format_wiki_ts;
use crate::repo::{parse_wiki_ts_column, RepoError, RepoResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};

pub trait MoveRepository {
    fn get_move(
        &self,
        timestamp: &NaiveDateTime,
        old_namespace: i64,
        old_article: &str,
    ) -> RepoResult<Option<PageMove>>;
    /// Most recent recorded move of the page strictly after `since`.
    fn latest_move_after(
        &self,
        old_namespace: i64,
        old_article: &str,
        since: &NaiveDateTime,
    ) -> RepoResult<Option<PageMove>>;
    /// Returns `true` when a new row was written.
    fn insert_if_absent(&self, page_move: &PageMove) -> RepoResult<bool>;
}

/// SQLite-backed move repository.
pub struct SqliteMoveRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteMoveRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl MoveRepository for SqliteMoveRepository<'_> {
    fn get_move(
        &self,
        timestamp: &NaiveDateTime,
        old_namespace: i64,
        old_article: &str,
    ) -> RepoResult<Option<PageMove>> {
        let found = self
            .conn
            .query_row(
                "SELECT m_timestamp, m_old_namespace, m_old_article, m_new_namespace, m_new_article
                 FROM moves
                 WHERE m_timestamp = ?1
                   AND m_old_namespace = ?2
                   AND m_old_article = ?3;",
                params![format_wiki_ts(timestamp), old_namespace, old_article],
                read_move_columns,
            )
            .optional()?;
        found.map(into_page_move).transpose()
    }

    fn latest_move_after(
        &self,
        old_namespace: i64,
        old_article: &str,
        since: &NaiveDateTime,
    ) -> RepoResult<Option<PageMove>> {
        let found = self
            .conn
            .query_row(
                "SELECT m_timestamp, m_old_namespace, m_old_article, m_new_namespace, m_new_article
                 FROM moves
                 WHERE m_old_namespace = ?1
                   AND m_old_article = ?2
                   AND m_timestamp > ?3
                 ORDER BY m_timestamp DESC
                 LIMIT 1;",
                params![old_namespace, old_article, format_wiki_ts(since)],
                read_move_columns,
            )
            .optional()?;
        found.map(into_page_move).transpose()
    }

    fn insert_if_absent(&self, page_move: &PageMove) -> RepoResult<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO moves (
                m_timestamp,
                m_old_namespace,
                m_old_article,
                m_new_namespace,
                m_new_article
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                format_wiki_ts(&page_move.timestamp),
                page_move.old_namespace,
                page_move.old_article.as_str(),
                page_move.new_namespace,
                page_move.new_article.as_str(),
            ],
        )?;
        Ok(inserted == 1)
    }
}

type MoveColumns = (String, i64, String, i64, String);

fn read_move_columns(row: &Row<'_>) -> rusqlite::Result<MoveColumns> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
    ))
}

fn into_page_move(columns: MoveColumns) -> RepoResult<PageMove> {
    let (timestamp, old_namespace, old_article, new_namespace, new_article) = columns;
    let timestamp = parse_wiki_ts_column(Some(timestamp), "moves.m_timestamp")?
        .ok_or_else(|| RepoError::InvalidData("moves.m_timestamp is empty".to_string()))?;
    Ok(PageMove {
        timestamp,
        old_namespace,
        old_article,
        new_namespace,
        new_article,
    })
}
