//! Project-level steps around the per-kind diff.
//!
//! # Responsibility
//! - Discover which projects have tracking categories.
//! - Normalize stored ratings after a cycle.
//! - Refresh the project record counters.
//!
//! # Invariants
//! - Normalization is idempotent: a second run changes nothing.
//! - After normalization no rating row has a NULL quality or importance.

use crate::config::ReconcileConfig;
use crate::model::kind::AssessmentKind;
use crate::model::project::Project;
use crate::repo::project_repo::{ProjectRepository, SqliteProjectRepository};
use crate::repo::rating_repo::{RatingRepository, SqliteRatingRepository};
use crate::repo::RepoResult;
use crate::wiki::extra::ExtraAssessments;
use crate::wiki::{CategoryReader, WikiResult, CATEGORY_NS};
use chrono::NaiveDateTime;
use log::{info, warn};
use rusqlite::{Connection, TransactionBehavior};

const UPLOAD_TIMESTAMP_UNSET: &str = "00000000000000";

/// Row counts changed by [`normalize_ratings`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeCounts {
    pub deleted: usize,
    pub quality_backfilled: usize,
    pub importance_backfilled: usize,
}

/// Lists project names that have a quality tracking category under the
/// root assessments category.
///
/// The project name is the title minus its `_articles_by_quality` suffix,
/// so names that themselves contain "articles" survive intact. Titles
/// without the quality tag, and the generic `articles_by_quality` category
/// itself, are skipped.
pub fn project_names_to_update(
    reader: &dyn CategoryReader,
    config: &ReconcileConfig,
) -> WikiResult<Vec<String>> {
    let quality_tag = &config.by_quality;
    let suffix = format!("_{}_{}", config.articles_label, config.by_quality);
    let generic = format!("{}_{}", config.articles_label, config.by_quality).to_lowercase();

    let mut names = Vec::new();
    for page in reader.list_members(&config.root_category, Some(CATEGORY_NS))? {
        if !page.title.contains(quality_tag.as_str()) {
            info!("event=project_discover module=service status=skipped reason=no_quality_tag");
            continue;
        }
        if page.title.to_lowercase().starts_with(&generic) {
            info!("event=project_discover module=service status=skipped reason=generic_category");
            continue;
        }
        let Some(base) = page.title.strip_suffix(suffix.as_str()) else {
            info!("event=project_discover module=service status=skipped reason=no_project_suffix");
            continue;
        };
        names.push(base.to_string());
    }
    Ok(names)
}

/// Deletes fully unrated rows, then backfills NULL kinds with the sentinel
/// and the other kind's timestamp. Runs in one transaction.
pub fn normalize_ratings(
    conn: &mut Connection,
    project: &str,
    not_a_class: &str,
) -> RepoResult<NormalizeCounts> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let counts = {
        let repo = SqliteRatingRepository::new(&tx);
        NormalizeCounts {
            deleted: repo.delete_unrated(project, not_a_class)?,
            quality_backfilled: repo.backfill_null(project, AssessmentKind::Quality, not_a_class)?,
            importance_backfilled: repo.backfill_null(
                project,
                AssessmentKind::Importance,
                not_a_class,
            )?,
        }
    };
    tx.commit()?;

    info!(
        "event=ratings_normalize module=service status=ok deleted={} quality_backfilled={} importance_backfilled={}",
        counts.deleted, counts.quality_backfilled, counts.importance_backfilled
    );
    Ok(counts)
}

/// Recomputes counters for `project`, stamps it with the cycle timestamp
/// and stores it.
///
/// Metadata missing from `extra` keeps whatever the record already had.
pub fn update_project_record(
    conn: &Connection,
    mut project: Project,
    extra: &ExtraAssessments,
    config: &ReconcileConfig,
    cycle_timestamp: NaiveDateTime,
) -> RepoResult<Project> {
    let ratings = SqliteRatingRepository::new(conn);
    let unassessed = [config.not_a_class.as_str(), config.unassessed_class.as_str()];

    let count = ratings.count_for_project(&project.name)?;
    let quality_unassessed =
        ratings.count_with_labels(&project.name, AssessmentKind::Quality, &unassessed)?;
    let importance_unassessed =
        ratings.count_with_labels(&project.name, AssessmentKind::Importance, &unassessed)?;

    for (field, value, slot) in [
        ("wikipage", &extra.homepage, &mut project.wikipage),
        ("parent", &extra.parent, &mut project.parent),
        ("shortname", &extra.shortname, &mut project.shortname),
    ] {
        match value {
            Some(value) => *slot = Some(value.clone()),
            None => warn!(
                "event=project_record module=service status=warn reason=missing_metadata field={field}"
            ),
        }
    }

    project.timestamp = Some(cycle_timestamp);
    project.count = Some(count);
    project.quality_count = Some(count - quality_unassessed);
    project.importance_count = Some(count - importance_unassessed);
    project.upload_timestamp = Some(UPLOAD_TIMESTAMP_UNSET.to_string());
    project.scope = 0;

    SqliteProjectRepository::new(conn).insert_or_update(&project)?;
    info!(
        "event=project_record module=service status=ok count={count} quality_count={} importance_count={}",
        count - quality_unassessed,
        count - importance_unassessed
    );
    Ok(project)
}

#[cfg(test)]
mod tests {
    use super::{normalize_ratings, project_names_to_update, NormalizeCounts};
    use crate::config::ReconcileConfig;
    use crate::db::open_db_in_memory;
    use crate::model::kind::AssessmentKind;
    use crate::model::rating::Rating;
    use crate::model::timestamp::parse_wiki_ts;
    use crate::repo::rating_repo::{RatingRepository, SqliteRatingRepository};
    use crate::wiki::{CategoryMember, CategoryReader, WikiResult};

    struct RootReader(Vec<&'static str>);

    impl CategoryReader for RootReader {
        fn list_members(
            &self,
            category: &str,
            _namespace: Option<i64>,
        ) -> WikiResult<Vec<CategoryMember>> {
            assert_eq!(category, "Wikipedia_1.0_assessments");
            let timestamp = parse_wiki_ts("2020-01-01T00:00:00Z").unwrap();
            Ok(self
                .0
                .iter()
                .map(|title| CategoryMember {
                    namespace: 14,
                    title: title.to_string(),
                    timestamp,
                })
                .collect())
        }
    }

    #[test]
    fn project_names_skip_generic_and_untagged_categories() {
        let reader = RootReader(vec![
            "Chess_articles_by_quality",
            "Articles_by_quality",
            "Chess_articles_by_importance",
            "Medicine_articles_by_quality",
        ]);
        let names = project_names_to_update(&reader, &ReconcileConfig::default()).unwrap();
        assert_eq!(names, vec!["Chess".to_string(), "Medicine".to_string()]);
    }

    #[test]
    fn project_names_keep_articles_inside_the_name() {
        let reader = RootReader(vec![
            "Good_articles_articles_by_quality",
            "Vital_articles_articles_by_quality",
            "Chess_articles_by_quality_extra",
        ]);
        let names = project_names_to_update(&reader, &ReconcileConfig::default()).unwrap();
        assert_eq!(
            names,
            vec!["Good_articles".to_string(), "Vital_articles".to_string()]
        );
    }

    #[test]
    fn normalization_is_idempotent() {
        let mut conn = open_db_in_memory().unwrap();
        let at = parse_wiki_ts("2020-05-05T00:00:00Z").unwrap();
        {
            let repo = SqliteRatingRepository::new(&conn);
            let mut both_sentinel = Rating::new("Test", 0, "Gone");
            both_sentinel.set(AssessmentKind::Quality, "NotA-Class", at);
            both_sentinel.set(AssessmentKind::Importance, "NotA-Class", at);
            repo.upsert_kind(&both_sentinel, AssessmentKind::Quality).unwrap();

            let mut importance_only = Rating::new("Test", 0, "Half");
            importance_only.set(AssessmentKind::Importance, "Mid-Class", at);
            repo.upsert_kind(&importance_only, AssessmentKind::Importance)
                .unwrap();
        }

        let first = normalize_ratings(&mut conn, "Test", "NotA-Class").unwrap();
        assert_eq!(first.deleted, 1);
        assert_eq!(first.quality_backfilled, 1);
        assert_eq!(first.importance_backfilled, 0);

        let second = normalize_ratings(&mut conn, "Test", "NotA-Class").unwrap();
        assert_eq!(second, NormalizeCounts::default());

        let half = SqliteRatingRepository::new(&conn)
            .get_rating("Test", 0, "Half")
            .unwrap()
            .unwrap();
        assert_eq!(half.quality.as_deref(), Some("NotA-Class"));
        assert_eq!(half.quality_timestamp, Some(at));
    }
}
