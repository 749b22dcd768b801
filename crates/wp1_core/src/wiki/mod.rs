//! Wiki-side collaborators consumed by reconciliation.
//!
//! # Responsibility
//! - Define the read-only interfaces the engine needs from the wiki:
//!   category membership, the local redirect table, and the live API.
//! - Provide the SQLite replica reader and the helpers that sit at the
//!   wiki boundary (namespace names, retry policy, template overrides).
//!
//! # Invariants
//! - Nothing in this module writes to the wiki.
//! - Live API failures surface as `ApiError`, never as panics.

use crate::db::DbError;
use chrono::NaiveDateTime;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod extra;
pub mod namespace;
pub mod replica;
pub mod retry;

/// Namespace id of `Category:` pages.
pub const CATEGORY_NS: i64 = 14;

pub type WikiResult<T> = Result<T, WikiError>;
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors from local wiki readers (replica database or equivalent).
#[derive(Debug)]
pub enum WikiError {
    Db(DbError),
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    InvalidData(String),
}

impl Display for WikiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::MissingRequiredTable(table) => {
                write!(f, "wiki replica requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "wiki replica requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid wiki data: {message}"),
        }
    }
}

impl Error for WikiError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::MissingRequiredTable(_) => None,
            Self::MissingRequiredColumn { .. } => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for WikiError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for WikiError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Live API failure, classified for the retry policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Timeouts, connection resets, 5xx: worth another attempt.
    Transient(String),
    /// Malformed request or response: retrying cannot help.
    Permanent(String),
}

impl ApiError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transient(message) => write!(f, "transient api failure: {message}"),
            Self::Permanent(message) => write!(f, "permanent api failure: {message}"),
        }
    }
}

impl Error for ApiError {}

/// One page listed in a category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryMember {
    pub namespace: i64,
    /// Underscored title without namespace prefix.
    pub title: String,
    /// When the page was added to the category.
    pub timestamp: NaiveDateTime,
}

/// Where a page now lives, and since when.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageTarget {
    pub namespace: i64,
    pub title: String,
    pub timestamp: NaiveDateTime,
}

/// Read-only category listing.
pub trait CategoryReader {
    /// Lists members of `category` (title without prefix), optionally
    /// restricted to one namespace.
    fn list_members(
        &self,
        category: &str,
        namespace: Option<i64>,
    ) -> WikiResult<Vec<CategoryMember>>;
}

/// Local copy of the wiki redirect table.
pub trait RedirectSource {
    fn redirect_target(&self, namespace: i64, title: &str) -> WikiResult<Option<PageTarget>>;
}

/// Live wiki API, addressed by prefixed title (`Talk:Foo`).
pub trait WikiApi {
    /// Move log events for the page, newest first.
    fn page_moves(&self, title_with_ns: &str) -> ApiResult<Vec<PageTarget>>;
    /// Redirect resolution; `None` when the page is not a redirect.
    fn redirect_target(&self, title_with_ns: &str) -> ApiResult<Option<PageTarget>>;
}
