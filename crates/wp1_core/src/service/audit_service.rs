//! Append-only audit trail of rating changes and moves.
//!
//! # Invariants
//! - Every row written through one `AuditLog` carries the same cycle
//!   timestamp, so repeating a cycle cannot duplicate rows.
//! - `record` is a no-op returning `false` when the key already exists.

use crate::model::audit::{LogAction, LogEntry};
use crate::repo::log_repo::LogRepository;
use crate::repo::RepoResult;
use chrono::NaiveDateTime;
use log::debug;

/// Audit writer bound to one reconciliation cycle.
pub struct AuditLog<R: LogRepository> {
    repo: R,
    cycle_timestamp: NaiveDateTime,
}

impl<R: LogRepository> AuditLog<R> {
    pub fn new(repo: R, cycle_timestamp: NaiveDateTime) -> Self {
        Self {
            repo,
            cycle_timestamp,
        }
    }

    /// Records one change; returns whether a row was written.
    pub fn record(
        &self,
        project: &str,
        namespace: i64,
        article: &str,
        action: LogAction,
        old: Option<&str>,
        new: Option<&str>,
        revision_timestamp: NaiveDateTime,
    ) -> RepoResult<bool> {
        let entry = LogEntry {
            project: project.to_string(),
            namespace,
            article: article.to_string(),
            action,
            timestamp: self.cycle_timestamp,
            old: old.map(str::to_string),
            new: new.map(str::to_string),
            revision_timestamp,
        };
        let written = self.repo.record(&entry)?;
        if !written {
            debug!(
                "event=audit_record module=service status=skipped reason=already_recorded action={action} namespace={namespace}"
            );
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::AuditLog;
    use crate::db::open_db_in_memory;
    use crate::model::audit::LogAction;
    use crate::model::timestamp::{parse_wiki_ts, parse_wp10_ts};
    use crate::repo::log_repo::{LogRepository, SqliteLogRepository};

    #[test]
    fn second_record_with_same_key_is_noop() {
        let conn = open_db_in_memory().unwrap();
        let cycle = parse_wp10_ts("20240101120000").unwrap();
        let revision = parse_wiki_ts("2023-12-31T00:00:00Z").unwrap();
        let audit = AuditLog::new(SqliteLogRepository::new(&conn), cycle);

        let first = audit
            .record("Test", 0, "Foo", LogAction::Quality, Some("NotA-Class"), Some("B-Class"), revision)
            .unwrap();
        let second = audit
            .record("Test", 0, "Foo", LogAction::Quality, Some("B-Class"), Some("C-Class"), revision)
            .unwrap();

        assert!(first);
        assert!(!second);
        let rows = SqliteLogRepository::new(&conn).list_for_project("Test").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].new.as_deref(), Some("B-Class"));
        assert_eq!(rows[0].timestamp, cycle);
    }

    #[test]
    fn different_actions_are_separate_rows() {
        let conn = open_db_in_memory().unwrap();
        let cycle = parse_wp10_ts("20240101120000").unwrap();
        let audit = AuditLog::new(SqliteLogRepository::new(&conn), cycle);

        for action in [LogAction::Quality, LogAction::Importance, LogAction::Moved] {
            assert!(audit
                .record("Test", 0, "Foo", action, None, None, cycle)
                .unwrap());
        }
        let rows = SqliteLogRepository::new(&conn).list_for_project("Test").unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|row| row.old.is_none()));
    }
}
