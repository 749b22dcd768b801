//! Move and redirect resolution for articles that left their categories.
//!
//! # Responsibility
//! - Find where a vanished article went, consulting cheap sources first.
//! - Record a found move once, plus a `moved` audit row per project.
//!
//! # Invariants
//! - Only evidence strictly newer than `since` counts.
//! - Source order: recorded moves, replica redirects, API move log, API
//!   redirect resolution. The first hit wins.
//! - Live API and replica failures degrade to "no move found".

use crate::model::audit::LogAction;
use crate::model::page_move::PageMove;
use crate::repo::log_repo::LogRepository;
use crate::repo::move_repo::{MoveRepository, SqliteMoveRepository};
use crate::repo::RepoResult;
use crate::service::audit_service::AuditLog;
use crate::wiki::namespace::NamespaceDirectory;
use crate::wiki::retry::RetryPolicy;
use crate::wiki::{PageTarget, RedirectSource, WikiApi};
use chrono::NaiveDateTime;
use log::{debug, warn};
use rusqlite::Connection;

/// Where an article went and when.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMove {
    pub dest_namespace: i64,
    pub dest_title: String,
    pub timestamp: NaiveDateTime,
    pub source: MoveSource,
}

/// Which source produced a [`ResolvedMove`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveSource {
    Recorded,
    ReplicaRedirect,
    ApiMoveLog,
    ApiRedirect,
}

impl MoveSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Recorded => "recorded",
            Self::ReplicaRedirect => "replica_redirect",
            Self::ApiMoveLog => "api_move_log",
            Self::ApiRedirect => "api_redirect",
        }
    }
}

impl ResolvedMove {
    fn from_target(target: PageTarget, source: MoveSource) -> Self {
        Self {
            dest_namespace: target.namespace,
            dest_title: target.title,
            timestamp: target.timestamp,
            source,
        }
    }
}

/// Ordered move lookup over local and live sources.
pub struct MoveResolver<'a> {
    redirects: &'a dyn RedirectSource,
    api: Option<&'a dyn WikiApi>,
    namespaces: &'a NamespaceDirectory,
    retry: RetryPolicy,
}

impl<'a> MoveResolver<'a> {
    pub fn new(redirects: &'a dyn RedirectSource, namespaces: &'a NamespaceDirectory) -> Self {
        Self {
            redirects,
            api: None,
            namespaces,
            retry: RetryPolicy::default(),
        }
    }

    /// Enables the live API sources.
    pub fn with_api(mut self, api: &'a dyn WikiApi) -> Self {
        self.api = Some(api);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Finds the first move of `(namespace, title)` newer than `since`.
    ///
    /// # Errors
    /// - Only wp10 storage failures; every wiki-side failure is logged and
    ///   treated as no data.
    pub fn resolve_move(
        &self,
        conn: &Connection,
        namespace: i64,
        title: &str,
        since: &NaiveDateTime,
    ) -> RepoResult<Option<ResolvedMove>> {
        if let Some(recorded) =
            SqliteMoveRepository::new(conn).latest_move_after(namespace, title, since)?
        {
            return Ok(Some(ResolvedMove {
                dest_namespace: recorded.new_namespace,
                dest_title: recorded.new_article,
                timestamp: recorded.timestamp,
                source: MoveSource::Recorded,
            }));
        }

        match self.redirects.redirect_target(namespace, title) {
            Ok(Some(target)) if target.timestamp > *since => {
                return Ok(Some(ResolvedMove::from_target(
                    target,
                    MoveSource::ReplicaRedirect,
                )));
            }
            Ok(_) => {}
            Err(err) => {
                warn!(
                    "event=move_lookup module=service status=error source=replica_redirect namespace={namespace} error={err}"
                );
            }
        }

        Ok(self.resolve_from_api(namespace, title, since))
    }

    fn resolve_from_api(
        &self,
        namespace: i64,
        title: &str,
        since: &NaiveDateTime,
    ) -> Option<ResolvedMove> {
        let api = self.api?;
        let Some(title_with_ns) = self.namespaces.title_for_api(namespace, title) else {
            debug!(
                "event=move_lookup module=service status=skipped reason=unknown_namespace namespace={namespace}"
            );
            return None;
        };

        let moves = self
            .retry
            .run("page_moves", || api.page_moves(&title_with_ns))
            .unwrap_or_default();
        if let Some(target) = moves.into_iter().find(|target| target.timestamp > *since) {
            return Some(ResolvedMove::from_target(target, MoveSource::ApiMoveLog));
        }

        self.retry
            .run("redirect_target", || api.redirect_target(&title_with_ns))
            .flatten()
            .filter(|target| target.timestamp > *since)
            .map(|target| ResolvedMove::from_target(target, MoveSource::ApiRedirect))
    }

    /// Stores the move (if not already known) and a `moved` audit row for
    /// `project`. Returns whether a new `moves` row was written.
    pub fn record_move<R: LogRepository>(
        &self,
        conn: &Connection,
        audit: &AuditLog<R>,
        project: &str,
        old_namespace: i64,
        old_title: &str,
        resolved: &ResolvedMove,
    ) -> RepoResult<bool> {
        let inserted = SqliteMoveRepository::new(conn).insert_if_absent(&PageMove {
            timestamp: resolved.timestamp,
            old_namespace,
            old_article: old_title.to_string(),
            new_namespace: resolved.dest_namespace,
            new_article: resolved.dest_title.clone(),
        })?;
        if !inserted {
            debug!(
                "event=move_record module=service status=skipped reason=already_recorded namespace={old_namespace}"
            );
        }
        audit.record(
            project,
            old_namespace,
            old_title,
            LogAction::Moved,
            Some(""),
            Some(""),
            resolved.timestamp,
        )?;
        debug!(
            "event=move_record module=service status=ok source={} namespace={old_namespace} dest_namespace={}",
            resolved.source.as_str(),
            resolved.dest_namespace
        );
        Ok(inserted)
    }
}
