//! Reconciliation use-case services.
//!
//! # Responsibility
//! - Turn wiki category membership into rating writes and audit rows.
//! - Orchestrate one project cycle over the repositories.
//!
//! # Invariants
//! - Writes happen in bounded batches, one transaction per batch; there is
//!   no cycle-wide transaction.
//! - Wiki collaborators are only read, never written.

use crate::db::DbError;
use crate::repo::RepoError;
use crate::wiki::WikiError;
use log::debug;
use rusqlite::{Connection, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod audit_service;
pub mod category_service;
pub mod diff_service;
pub mod move_service;
pub mod progress;
pub mod project_service;
pub mod reconcile_service;

pub type ReconcileResult<T> = Result<T, ReconcileError>;

/// Service error for one reconciliation cycle.
#[derive(Debug)]
pub enum ReconcileError {
    /// wp10 storage failure; the current batch was rolled back.
    Repo(RepoError),
    /// Local wiki reader failure (replica unavailable or malformed).
    Wiki(WikiError),
}

impl Display for ReconcileError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::Wiki(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ReconcileError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Wiki(err) => Some(err),
        }
    }
}

impl From<RepoError> for ReconcileError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<WikiError> for ReconcileError {
    fn from(value: WikiError) -> Self {
        Self::Wiki(value)
    }
}

impl From<rusqlite::Error> for ReconcileError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(RepoError::Db(DbError::Sqlite(value)))
    }
}

/// Applies `write` to every item, committing every `batch_size` items.
///
/// A failure rolls back only the batch in flight; earlier batches stay
/// committed. Returns the number of committed batches.
pub(crate) fn commit_in_batches<T>(
    conn: &mut Connection,
    items: &[T],
    batch_size: usize,
    mut write: impl FnMut(&Connection, &T) -> ReconcileResult<()>,
) -> ReconcileResult<usize> {
    let mut committed = 0;
    for chunk in items.chunks(batch_size.max(1)) {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        for item in chunk {
            write(&tx, item)?;
        }
        tx.commit()?;
        committed += 1;
        debug!(
            "event=batch_commit module=service status=ok batch={committed} items={}",
            chunk.len()
        );
    }
    Ok(committed)
}
