//! One reconciliation cycle for one project.
//!
//! # Responsibility
//! - Run the cycle steps in order: snapshot, per-kind map/diff/commit,
//!   unseen articles, normalization, project record.
//! - Report what the cycle did.
//!
//! # Invariants
//! - Kinds are processed sequentially, quality first.
//! - Every row written in one cycle shares the cycle timestamp.
//! - Re-running a cycle with unchanged wiki state writes no audit rows.

use crate::config::ReconcileConfig;
use crate::model::audit::LogAction;
use crate::model::kind::AssessmentKind;
use crate::model::project::Project;
use crate::model::rating::{ArticleRef, Rating};
use crate::model::timestamp::{format_wp10_ts, now_utc};
use crate::repo::log_repo::SqliteLogRepository;
use crate::repo::project_repo::{ProjectRepository, SqliteProjectRepository};
use crate::repo::rating_repo::{RatingRepository, SqliteRatingRepository};
use crate::service::audit_service::AuditLog;
use crate::service::category_service::CategoryRatingMapper;
use crate::service::diff_service::{RatingDiffEngine, RatingSnapshot};
use crate::service::move_service::{MoveResolver, ResolvedMove};
use crate::service::progress::{initial_work, NoopProgress, ProgressSink};
use crate::service::project_service::{normalize_ratings, update_project_record, NormalizeCounts};
use crate::service::{commit_in_batches, ReconcileResult};
use crate::wiki::extra::ExtraAssessments;
use crate::wiki::namespace::NamespaceDirectory;
use crate::wiki::retry::RetryPolicy;
use crate::wiki::{CategoryReader, RedirectSource, WikiApi};
use chrono::NaiveDateTime;
use log::{error, info};
use rusqlite::Connection;
use std::collections::BTreeSet;
use std::time::Instant;
use uuid::Uuid;

static NOOP_PROGRESS: NoopProgress = NoopProgress;

/// Outcome of one kind's map/diff/commit step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindReport {
    pub kind: AssessmentKind,
    /// Buckets in the rating map, sentinel included.
    pub buckets: usize,
    pub accepted_pages: usize,
    pub rejected_pages: usize,
    pub writes: usize,
    pub logged: usize,
}

/// Outcome of the unseen-article pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnseenReport {
    pub in_seen: usize,
    /// Unseen but already unrated for both kinds.
    pub skipped: usize,
    pub processed: usize,
    pub moves_found: usize,
}

/// Summary of one project cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub run_id: Uuid,
    pub cycle_timestamp: NaiveDateTime,
    pub kinds: Vec<KindReport>,
    pub unseen: UnseenReport,
    pub normalized: NormalizeCounts,
    /// Project record as stored at the end of the cycle.
    pub project: Project,
}

impl ReconcileReport {
    pub fn kind(&self, kind: AssessmentKind) -> Option<&KindReport> {
        self.kinds.iter().find(|report| report.kind == kind)
    }
}

struct UnseenArticle<'s> {
    old: &'s Rating,
    stale_kinds: Vec<AssessmentKind>,
    resolved: Option<ResolvedMove>,
}

/// Reconciles stored ratings of a project with the wiki.
pub struct ProjectReconciler<'a> {
    config: &'a ReconcileConfig,
    categories: &'a dyn CategoryReader,
    resolver: MoveResolver<'a>,
    progress: &'a dyn ProgressSink,
}

impl<'a> ProjectReconciler<'a> {
    pub fn new(
        config: &'a ReconcileConfig,
        categories: &'a dyn CategoryReader,
        redirects: &'a dyn RedirectSource,
        namespaces: &'a NamespaceDirectory,
    ) -> Self {
        Self {
            config,
            categories,
            resolver: MoveResolver::new(redirects, namespaces)
                .with_retry(RetryPolicy::new(config.api_max_attempts)),
            progress: &NOOP_PROGRESS,
        }
    }

    /// Enables live API move lookups for unseen articles.
    pub fn with_api(mut self, api: &'a dyn WikiApi) -> Self {
        self.resolver = self.resolver.with_api(api);
        self
    }

    pub fn with_progress(mut self, progress: &'a dyn ProgressSink) -> Self {
        self.progress = progress;
        self
    }

    /// Runs one cycle stamped with the current time.
    pub fn update_project(
        &self,
        conn: &mut Connection,
        project_name: &str,
        extra: &ExtraAssessments,
    ) -> ReconcileResult<ReconcileReport> {
        self.update_project_at(conn, project_name, extra, now_utc())
    }

    /// Runs one cycle stamped with `cycle_timestamp`.
    ///
    /// # Errors
    /// - Storage and replica failures abort the cycle; batches committed
    ///   before the failure stay committed and the next cycle repairs the
    ///   rest.
    pub fn update_project_at(
        &self,
        conn: &mut Connection,
        project_name: &str,
        extra: &ExtraAssessments,
        cycle_timestamp: NaiveDateTime,
    ) -> ReconcileResult<ReconcileReport> {
        let run_id = Uuid::new_v4();
        let started_at = Instant::now();
        info!(
            "event=reconcile_run module=service status=start run_id={run_id} cycle_ts={}",
            format_wp10_ts(&cycle_timestamp)
        );

        let result = self.run_cycle(conn, project_name, extra, run_id, cycle_timestamp);
        match &result {
            Ok(report) => info!(
                "event=reconcile_run module=service status=ok run_id={run_id} duration_ms={} unseen_processed={} moves_found={} deleted={}",
                started_at.elapsed().as_millis(),
                report.unseen.processed,
                report.unseen.moves_found,
                report.normalized.deleted
            ),
            Err(err) => error!(
                "event=reconcile_run module=service status=error run_id={run_id} duration_ms={} error={err}",
                started_at.elapsed().as_millis()
            ),
        }
        result
    }

    fn run_cycle(
        &self,
        conn: &mut Connection,
        project_name: &str,
        extra: &ExtraAssessments,
        run_id: Uuid,
        cycle_timestamp: NaiveDateTime,
    ) -> ReconcileResult<ReconcileReport> {
        let project = SqliteProjectRepository::new(conn)
            .get_project(project_name)?
            .unwrap_or_else(|| Project::new(project_name));
        let since = project.synced_since();

        let old_ratings: RatingSnapshot = SqliteRatingRepository::new(conn)
            .list_for_project(project_name)?
            .into_iter()
            .map(|rating| (rating.article_ref(), rating))
            .collect();
        self.progress.start(
            &self.config.progress_key(project_name),
            initial_work(old_ratings.len()),
        );

        let mapper = CategoryRatingMapper::new(self.categories, self.config);
        let engine = RatingDiffEngine::new(self.categories, self.config, self.progress);
        let mut seen = BTreeSet::new();
        let mut kinds = Vec::with_capacity(AssessmentKind::ALL.len());
        for kind in AssessmentKind::ALL {
            let rating_map = mapper.build_rating_map(conn, project_name, kind, extra)?;
            let diff = engine.reconcile(project_name, kind, &rating_map, &old_ratings)?;
            let logged = engine.commit(conn, &diff.writes, cycle_timestamp)?;
            kinds.push(KindReport {
                kind,
                buckets: rating_map.len(),
                accepted_pages: diff.accepted_pages,
                rejected_pages: diff.rejected_pages,
                writes: diff.writes.len(),
                logged,
            });
            seen.extend(diff.seen);
        }

        let unseen = self.process_unseen(
            conn,
            project_name,
            &old_ratings,
            &seen,
            &since,
            cycle_timestamp,
        )?;
        let normalized = normalize_ratings(conn, project_name, &self.config.not_a_class)?;
        let project = update_project_record(conn, project, extra, self.config, cycle_timestamp)?;

        Ok(ReconcileReport {
            run_id,
            cycle_timestamp,
            kinds,
            unseen,
            normalized,
            project,
        })
    }

    /// Forces the sentinel onto previously rated articles that no tracking
    /// category lists any more, recording moves found on the way.
    fn process_unseen(
        &self,
        conn: &mut Connection,
        project: &str,
        old_ratings: &RatingSnapshot,
        seen: &BTreeSet<ArticleRef>,
        since: &NaiveDateTime,
        cycle_timestamp: NaiveDateTime,
    ) -> ReconcileResult<UnseenReport> {
        let sentinel = self.config.not_a_class.as_str();
        let mut report = UnseenReport::default();
        let mut pending = Vec::new();

        for (article, old) in old_ratings {
            if seen.contains(article) {
                report.in_seen += 1;
                continue;
            }
            let stale_kinds: Vec<AssessmentKind> = AssessmentKind::ALL
                .into_iter()
                .filter(|kind| !old.is_unrated(*kind, sentinel))
                .collect();
            if stale_kinds.is_empty() {
                report.skipped += 1;
                continue;
            }
            let resolved =
                self.resolver
                    .resolve_move(conn, article.namespace, &article.title, since)?;
            pending.push(UnseenArticle {
                old,
                stale_kinds,
                resolved,
            });
        }
        report.processed = pending.len();
        report.moves_found = pending
            .iter()
            .filter(|item| item.resolved.is_some())
            .count();

        commit_in_batches(conn, &pending, self.config.batch_size, |tx, item| {
            let audit = AuditLog::new(SqliteLogRepository::new(tx), cycle_timestamp);
            let namespace = item.old.namespace;
            let title = item.old.article.as_str();

            let changed_at = match &item.resolved {
                Some(resolved) => {
                    self.resolver
                        .record_move(tx, &audit, project, namespace, title, resolved)?;
                    resolved.timestamp
                }
                None => cycle_timestamp,
            };

            let ratings = SqliteRatingRepository::new(tx);
            let mut rating = Rating::new(project, namespace, title);
            for &kind in &item.stale_kinds {
                rating.set(kind, sentinel, changed_at);
                ratings.upsert_kind(&rating, kind)?;
                audit.record(
                    project,
                    namespace,
                    title,
                    LogAction::for_kind(kind),
                    item.old.value(kind),
                    Some(sentinel),
                    changed_at,
                )?;
            }
            Ok(())
        })?;

        info!(
            "event=unseen_pass module=service status=ok in_seen={} skipped={} processed={} moves_found={}",
            report.in_seen, report.skipped, report.processed, report.moves_found
        );
        Ok(report)
    }
}
