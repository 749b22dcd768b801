//! Repository layer over the wp10 tables.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts per table.
//! - Keep SQL details out of the reconciliation services.
//!
//! # Invariants
//! - Every write is an idempotent upsert or insert-if-absent keyed by the
//!   table's primary key, so a crashed cycle can be re-run safely.
//! - Repositories borrow a `Connection`; a `Transaction` derefs to one, so
//!   callers choose the batch boundary.

use crate::db::DbError;
use crate::model::timestamp::{format_wiki_ts, parse_wiki_ts, parse_wp10_ts};
use chrono::NaiveDateTime;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod category_repo;
pub mod log_repo;
pub mod move_repo;
pub mod project_repo;
pub mod rating_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for wp10 persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted wp10 data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

pub(crate) fn wiki_ts_to_db(value: Option<&NaiveDateTime>) -> Option<String> {
    value.map(format_wiki_ts)
}

pub(crate) fn parse_wiki_ts_column(
    value: Option<String>,
    column: &'static str,
) -> RepoResult<Option<NaiveDateTime>> {
    value
        .map(|text| {
            parse_wiki_ts(&text).ok_or_else(|| {
                RepoError::InvalidData(format!("invalid timestamp `{text}` in {column}"))
            })
        })
        .transpose()
}

pub(crate) fn parse_wp10_ts_column(text: &str, column: &'static str) -> RepoResult<NaiveDateTime> {
    parse_wp10_ts(text)
        .ok_or_else(|| RepoError::InvalidData(format!("invalid timestamp `{text}` in {column}")))
}
