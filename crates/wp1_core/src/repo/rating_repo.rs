//! Rating repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Snapshot, upsert and normalize per-project `ratings` rows.
//! - Provide the counters used for the project record.
//!
//! # Invariants
//! - `upsert_kind` only overwrites the columns of the given kind when the row
//!   already exists.
//! - Normalization statements are idempotent.

use crate::model::kind::AssessmentKind;
use crate::model::rating::Rating;
use crate::repo::{parse_wiki_ts_column, wiki_ts_to_db, RepoResult};
use rusqlite::{params, Connection, Row};

const RATING_SELECT_SQL: &str = "SELECT
    r_project,
    r_namespace,
    r_article,
    r_score,
    r_quality,
    r_quality_timestamp,
    r_importance,
    r_importance_timestamp
FROM ratings";

/// Repository interface for project ratings.
pub trait RatingRepository {
    /// Every stored rating of `project`, ordered by namespace and title.
    fn list_for_project(&self, project: &str) -> RepoResult<Vec<Rating>>;
    fn get_rating(&self, project: &str, namespace: i64, article: &str)
        -> RepoResult<Option<Rating>>;
    /// Inserts `rating`, or updates only the `kind` columns of an existing row.
    fn upsert_kind(&self, rating: &Rating, kind: AssessmentKind) -> RepoResult<()>;
    /// Deletes rows whose quality and importance are both sentinel or NULL.
    fn delete_unrated(&self, project: &str, not_a_class: &str) -> RepoResult<usize>;
    /// Sets NULL `kind` values to the sentinel, copying the other kind's timestamp.
    fn backfill_null(
        &self,
        project: &str,
        kind: AssessmentKind,
        not_a_class: &str,
    ) -> RepoResult<usize>;
    fn count_for_project(&self, project: &str) -> RepoResult<i64>;
    /// Rows whose `kind` value is one of `labels`.
    fn count_with_labels(
        &self,
        project: &str,
        kind: AssessmentKind,
        labels: &[&str],
    ) -> RepoResult<i64>;
}

/// SQLite-backed rating repository.
pub struct SqliteRatingRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRatingRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl RatingRepository for SqliteRatingRepository<'_> {
    fn list_for_project(&self, project: &str) -> RepoResult<Vec<Rating>> {
        let mut stmt = self.conn.prepare(&format!(
            "{RATING_SELECT_SQL}
             WHERE r_project = ?1
             ORDER BY r_namespace ASC, r_article ASC;"
        ))?;
        let mut rows = stmt.query([project])?;
        let mut ratings = Vec::new();
        while let Some(row) = rows.next()? {
            ratings.push(parse_rating_row(row)?);
        }
        Ok(ratings)
    }

    fn get_rating(
        &self,
        project: &str,
        namespace: i64,
        article: &str,
    ) -> RepoResult<Option<Rating>> {
        let mut stmt = self.conn.prepare(&format!(
            "{RATING_SELECT_SQL}
             WHERE r_project = ?1
               AND r_namespace = ?2
               AND r_article = ?3;"
        ))?;
        let mut rows = stmt.query(params![project, namespace, article])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_rating_row(row)?));
        }
        Ok(None)
    }

    fn upsert_kind(&self, rating: &Rating, kind: AssessmentKind) -> RepoResult<()> {
        let on_conflict = match kind {
            AssessmentKind::Quality => {
                "r_quality = excluded.r_quality,
                 r_quality_timestamp = excluded.r_quality_timestamp"
            }
            AssessmentKind::Importance => {
                "r_importance = excluded.r_importance,
                 r_importance_timestamp = excluded.r_importance_timestamp"
            }
        };

        self.conn.execute(
            &format!(
                "INSERT INTO ratings (
                    r_project,
                    r_namespace,
                    r_article,
                    r_score,
                    r_quality,
                    r_quality_timestamp,
                    r_importance,
                    r_importance_timestamp
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ON CONFLICT (r_project, r_namespace, r_article) DO UPDATE SET
                    {on_conflict};"
            ),
            params![
                rating.project.as_str(),
                rating.namespace,
                rating.article.as_str(),
                rating.score,
                rating.quality.as_deref(),
                wiki_ts_to_db(rating.quality_timestamp.as_ref()),
                rating.importance.as_deref(),
                wiki_ts_to_db(rating.importance_timestamp.as_ref()),
            ],
        )?;
        Ok(())
    }

    fn delete_unrated(&self, project: &str, not_a_class: &str) -> RepoResult<usize> {
        let deleted = self.conn.execute(
            "DELETE FROM ratings
             WHERE r_project = ?1
               AND (r_quality IS NULL OR r_quality = ?2)
               AND (r_importance IS NULL OR r_importance = ?2);",
            params![project, not_a_class],
        )?;
        Ok(deleted)
    }

    fn backfill_null(
        &self,
        project: &str,
        kind: AssessmentKind,
        not_a_class: &str,
    ) -> RepoResult<usize> {
        let sql = match kind {
            AssessmentKind::Quality => {
                "UPDATE ratings
                 SET r_quality = ?2,
                     r_quality_timestamp = r_importance_timestamp
                 WHERE r_project = ?1
                   AND r_quality IS NULL;"
            }
            AssessmentKind::Importance => {
                "UPDATE ratings
                 SET r_importance = ?2,
                     r_importance_timestamp = r_quality_timestamp
                 WHERE r_project = ?1
                   AND r_importance IS NULL;"
            }
        };
        let updated = self.conn.execute(sql, params![project, not_a_class])?;
        Ok(updated)
    }

    fn count_for_project(&self, project: &str) -> RepoResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM ratings WHERE r_project = ?1;",
            [project],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn count_with_labels(
        &self,
        project: &str,
        kind: AssessmentKind,
        labels: &[&str],
    ) -> RepoResult<i64> {
        let column = match kind {
            AssessmentKind::Quality => "r_quality",
            AssessmentKind::Importance => "r_importance",
        };
        let mut total = 0;
        for label in labels {
            let count: i64 = self.conn.query_row(
                &format!(
                    "SELECT COUNT(*) FROM ratings
                     WHERE r_project = ?1
                       AND {column} = ?2;"
                ),
                params![project, label],
                |row| row.get(0),
            )?;
            total += count;
        }
        Ok(total)
    }
}

fn parse_rating_row(row: &Row<'_>) -> RepoResult<Rating> {
    Ok(Rating {
        project: row.get("r_project")?,
        namespace: row.get("r_namespace")?,
        article: row.get("r_article")?,
        score: row.get("r_score")?,
        quality: row.get("r_quality")?,
        quality_timestamp: parse_wiki_ts_column(
            row.get("r_quality_timestamp")?,
            "ratings.r_quality_timestamp",
        )?,
        importance: row.get("r_importance")?,
        importance_timestamp: parse_wiki_ts_column(
            row.get("r_importance_timestamp")?,
            "ratings.r_importance_timestamp",
        )?,
    })
}
