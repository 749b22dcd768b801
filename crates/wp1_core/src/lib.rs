//! Core domain logic for WP1 project rating reconciliation.
//! This crate is the single source of truth for rating invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod wiki;

pub use config::{ConfigError, ReconcileConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_level, init_logging, LogSettings, LoggingError};
pub use model::audit::{LogAction, LogEntry};
pub use model::category::Category;
pub use model::kind::{AssessmentKind, InvalidKindError};
pub use model::page_move::PageMove;
pub use model::project::Project;
pub use model::rating::{ArticleRef, Rating};
pub use repo::{RepoError, RepoResult};
pub use service::category_service::{CategoryRatingMapper, RatingBucket, RatingMap};
pub use service::diff_service::{RatingDiffEngine, RatingSnapshot};
pub use service::move_service::{MoveResolver, ResolvedMove};
pub use service::progress::{NoopProgress, ProgressSink};
pub use service::project_service::project_names_to_update;
pub use service::reconcile_service::{ProjectReconciler, ReconcileReport};
pub use service::{ReconcileError, ReconcileResult};
pub use wiki::extra::ExtraAssessments;
pub use wiki::namespace::NamespaceDirectory;
pub use wiki::replica::SqliteWikiReplica;
pub use wiki::retry::RetryPolicy;
pub use wiki::{ApiError, CategoryReader, RedirectSource, WikiApi, WikiError};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
