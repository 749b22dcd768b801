//! Category membership vs stored ratings, one kind at a time.
//!
//! # Responsibility
//! - Resolve each listed article to exactly one winning label per kind.
//! - Stage rating upserts and audit rows for labels that changed.
//! - Flush staged writes in bounded transactions.
//!
//! # Invariants
//! - Banners live on talk pages: article namespace = member namespace - 1.
//! - Rejected namespaces never reach `seen`.
//! - Highest ranking wins; on equal rankings the bucket first in label
//!   order wins.
//! - An article whose stored label already matches stages nothing.

use crate::config::ReconcileConfig;
use crate::model::audit::LogAction;
use crate::model::kind::AssessmentKind;
use crate::model::rating::{ArticleRef, Rating};
use crate::repo::log_repo::SqliteLogRepository;
use crate::repo::rating_repo::{RatingRepository, SqliteRatingRepository};
use crate::service::audit_service::AuditLog;
use crate::service::category_service::RatingMap;
use crate::service::progress::ProgressSink;
use crate::service::{commit_in_batches, ReconcileResult};
use crate::wiki::CategoryReader;
use chrono::NaiveDateTime;
use log::{debug, info};
use rusqlite::Connection;
use std::collections::{BTreeMap, BTreeSet};

/// Stored ratings of one project keyed by article.
pub type RatingSnapshot = BTreeMap<ArticleRef, Rating>;

/// Whether an article namespace can carry project ratings.
///
/// Negative (virtual), User (2) and any talk (odd) namespace are rejected.
pub fn is_namespace_acceptable(namespace: i64) -> bool {
    !(namespace < 0 || namespace == 2 || namespace % 2 != 0)
}

/// One rating change waiting to be committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedWrite {
    pub kind: AssessmentKind,
    /// Row to upsert; only the `kind` columns are authoritative.
    pub rating: Rating,
    pub old_value: Option<String>,
    pub new_value: String,
    /// Category-link time of the winning bucket.
    pub revision_timestamp: NaiveDateTime,
}

/// Result of diffing one kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KindDiff {
    pub writes: Vec<StagedWrite>,
    pub seen: BTreeSet<ArticleRef>,
    pub accepted_pages: usize,
    pub rejected_pages: usize,
}

struct Candidate<'m> {
    label: &'m str,
    ranking: i64,
    timestamp: NaiveDateTime,
}

/// Diffs category membership against a rating snapshot.
pub struct RatingDiffEngine<'a> {
    reader: &'a dyn CategoryReader,
    config: &'a ReconcileConfig,
    progress: &'a dyn ProgressSink,
}

impl<'a> RatingDiffEngine<'a> {
    pub fn new(
        reader: &'a dyn CategoryReader,
        config: &'a ReconcileConfig,
        progress: &'a dyn ProgressSink,
    ) -> Self {
        Self {
            reader,
            config,
            progress,
        }
    }

    /// Computes the writes needed for `kind` and the set of articles seen.
    ///
    /// Nothing is written; pass the result to [`RatingDiffEngine::commit`].
    pub fn reconcile(
        &self,
        project: &str,
        kind: AssessmentKind,
        rating_map: &RatingMap,
        old_ratings: &RatingSnapshot,
    ) -> ReconcileResult<KindDiff> {
        let progress_key = self.config.progress_key(project);
        let mut diff = KindDiff::default();
        let mut winners: BTreeMap<ArticleRef, Candidate<'_>> = BTreeMap::new();

        for (label, bucket) in rating_map {
            if bucket.category.is_empty() {
                continue;
            }
            for member in self.reader.list_members(&bucket.category, None)? {
                let namespace = member.namespace - 1;
                if !is_namespace_acceptable(namespace) {
                    debug!(
                        "event=member_skip module=service status=skipped reason=namespace namespace={namespace}"
                    );
                    diff.rejected_pages += 1;
                    continue;
                }
                diff.accepted_pages += 1;
                self.progress.increment(&progress_key);

                let article = ArticleRef::new(namespace, member.title);
                diff.seen.insert(article.clone());
                let candidate = Candidate {
                    label: label.as_str(),
                    ranking: bucket.ranking,
                    timestamp: member.timestamp,
                };
                let outranks = winners
                    .get(&article)
                    .map_or(true, |current| candidate.ranking > current.ranking);
                if outranks {
                    winners.insert(article, candidate);
                }
            }
        }

        for (article, winner) in winners {
            let stored = old_ratings.get(&article);
            let old_value = match stored {
                Some(rating) => rating.value(kind).map(str::to_string),
                None => Some(self.config.not_a_class.clone()),
            };
            if stored.is_some() && old_value.as_deref() == Some(winner.label) {
                continue;
            }

            let mut rating = stored
                .cloned()
                .unwrap_or_else(|| Rating::new(project, article.namespace, article.title));
            rating.set(kind, winner.label, winner.timestamp);
            diff.writes.push(StagedWrite {
                kind,
                rating,
                old_value,
                new_value: winner.label.to_string(),
                revision_timestamp: winner.timestamp,
            });
        }

        info!(
            "event=rating_diff module=service status=ok kind={kind} accepted={} rejected={} seen={} writes={}",
            diff.accepted_pages,
            diff.rejected_pages,
            diff.seen.len(),
            diff.writes.len()
        );
        Ok(diff)
    }

    /// Upserts staged ratings and their audit rows, `batch_size` per
    /// transaction. Returns the number of audit rows written.
    pub fn commit(
        &self,
        conn: &mut Connection,
        writes: &[StagedWrite],
        cycle_timestamp: NaiveDateTime,
    ) -> ReconcileResult<usize> {
        let mut logged = 0;
        commit_in_batches(conn, writes, self.config.batch_size, |tx, write| {
            SqliteRatingRepository::new(tx).upsert_kind(&write.rating, write.kind)?;
            let audit = AuditLog::new(SqliteLogRepository::new(tx), cycle_timestamp);
            if audit.record(
                &write.rating.project,
                write.rating.namespace,
                &write.rating.article,
                LogAction::for_kind(write.kind),
                write.old_value.as_deref(),
                Some(write.new_value.as_str()),
                write.revision_timestamp,
            )? {
                logged += 1;
            }
            Ok(())
        })?;
        Ok(logged)
    }
}
