//! Tracking-category to rating-bucket mapping.
//!
//! # Responsibility
//! - Discover the per-rating categories of a project for one kind.
//! - Persist every discovered bucket into `categories`.
//!
//! # Invariants
//! - The returned map always contains the sentinel bucket with an empty
//!   category and the lowest ranking.
//! - A page that cannot be mapped is skipped; mapping never fails because
//!   of wiki content, only because of storage or reader errors.
//! - Overrides cannot claim the sentinel label.

use crate::config::ReconcileConfig;
use crate::model::category::Category;
use crate::model::kind::AssessmentKind;
use crate::repo::category_repo::{CategoryRepository, SqliteCategoryRepository};
use crate::service::ReconcileResult;
use crate::wiki::extra::ExtraAssessments;
use crate::wiki::{CategoryMember, CategoryReader, CATEGORY_NS};
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::Connection;
use std::collections::BTreeMap;

static CLASS_INDICATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Za-z]+)[ _-]").expect("valid class indicator regex"));

/// Where articles with one rating label are listed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatingBucket {
    /// Wiki category title without prefix; empty for the sentinel.
    pub category: String,
    pub ranking: i64,
    pub replacement: String,
}

/// Rating label -> bucket, iterated in label order.
pub type RatingMap = BTreeMap<String, RatingBucket>;

/// Builds rating maps from a project's tracking categories.
pub struct CategoryRatingMapper<'a> {
    reader: &'a dyn CategoryReader,
    config: &'a ReconcileConfig,
}

impl<'a> CategoryRatingMapper<'a> {
    pub fn new(reader: &'a dyn CategoryReader, config: &'a ReconcileConfig) -> Self {
        Self { reader, config }
    }

    /// Maps every rating category of `project` for `kind` and upserts the
    /// matching `categories` rows.
    ///
    /// # Contract
    /// - The main tracking category is listed first; the alternate name is
    ///   only consulted when the main one has no category pages.
    /// - A later page yielding the same label replaces the earlier bucket.
    pub fn build_rating_map(
        &self,
        conn: &Connection,
        project: &str,
        kind: AssessmentKind,
        extra: &ExtraAssessments,
    ) -> ReconcileResult<RatingMap> {
        let repo = SqliteCategoryRepository::new(conn);
        let mut map = RatingMap::new();

        for category_page in self.tracking_pages(project, kind)? {
            let Some((label, bucket)) = self.bucket_for_page(&category_page.title, kind, extra)
            else {
                continue;
            };
            repo.upsert_category(&Category {
                project: project.to_string(),
                kind,
                rating: label.clone(),
                replacement: bucket.replacement.clone(),
                category: bucket.category.clone(),
                ranking: bucket.ranking,
            })?;
            map.insert(label, bucket);
        }

        let sentinel = RatingBucket {
            category: String::new(),
            ranking: self.config.not_a_class_ranking,
            replacement: self.config.unknown_class.clone(),
        };
        repo.upsert_category(&Category {
            project: project.to_string(),
            kind,
            rating: self.config.not_a_class.clone(),
            replacement: sentinel.replacement.clone(),
            category: sentinel.category.clone(),
            ranking: sentinel.ranking,
        })?;
        map.insert(self.config.not_a_class.clone(), sentinel);

        info!(
            "event=rating_map_build module=service status=ok kind={kind} buckets={}",
            map.len()
        );
        Ok(map)
    }

    fn tracking_pages(
        &self,
        project: &str,
        kind: AssessmentKind,
    ) -> ReconcileResult<Vec<CategoryMember>> {
        let main = self.config.category_for_project(project, kind, false);
        let alt = self.config.category_for_project(project, kind, true);

        let pages = self.reader.list_members(&main, Some(CATEGORY_NS))?;
        if !pages.is_empty() || alt == main {
            return Ok(pages);
        }
        debug!("event=rating_map_build module=service status=fallback kind={kind} category={alt}");
        Ok(self.reader.list_members(&alt, Some(CATEGORY_NS))?)
    }

    fn bucket_for_page(
        &self,
        page_title: &str,
        kind: AssessmentKind,
        extra: &ExtraAssessments,
    ) -> Option<(String, RatingBucket)> {
        if let Some(raw) = extra.override_for(page_title) {
            let validated = match raw.validate() {
                Ok(validated) => validated,
                Err(err) => {
                    warn!(
                        "event=override_skip module=service status=skipped kind={kind} category={page_title} error={err}"
                    );
                    return None;
                }
            };
            if validated.label == self.config.not_a_class {
                warn!(
                    "event=override_skip module=service status=skipped reason=sentinel_label kind={kind} category={page_title}"
                );
                return None;
            }
            let replacement = match kind {
                AssessmentKind::Quality => validated
                    .replacement
                    .unwrap_or_else(|| validated.label.clone()),
                AssessmentKind::Importance => validated.label.clone(),
            };
            return Some((
                validated.label,
                RatingBucket {
                    category: page_title.to_string(),
                    ranking: validated.ranking,
                    replacement,
                },
            ));
        }

        let Some(indicator) = CLASS_INDICATOR_RE
            .captures(page_title)
            .and_then(|caps| caps.get(1))
        else {
            debug!(
                "event=category_skip module=service status=skipped reason=no_indicator category={page_title}"
            );
            return None;
        };
        let label = self.config.label_for_indicator(indicator.as_str());
        let Some(ranking) = self.config.rankings(kind).get(&label).copied() else {
            debug!(
                "event=category_skip module=service status=skipped reason=unknown_rating kind={kind} rating={label}"
            );
            return None;
        };
        Some((
            label.clone(),
            RatingBucket {
                category: page_title.to_string(),
                ranking,
                replacement: label,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::CategoryRatingMapper;
    use crate::config::ReconcileConfig;
    use crate::db::open_db_in_memory;
    use crate::model::kind::AssessmentKind;
    use crate::model::timestamp::parse_wiki_ts;
    use crate::repo::category_repo::{CategoryRepository, SqliteCategoryRepository};
    use crate::wiki::extra::{ExtraAssessments, RawOverride};
    use crate::wiki::{CategoryMember, CategoryReader, WikiResult, CATEGORY_NS};
    use std::collections::BTreeMap;

    struct StaticReader(BTreeMap<String, Vec<String>>);

    impl CategoryReader for StaticReader {
        fn list_members(
            &self,
            category: &str,
            namespace: Option<i64>,
        ) -> WikiResult<Vec<CategoryMember>> {
            assert_eq!(namespace, Some(CATEGORY_NS));
            let timestamp = parse_wiki_ts("2020-01-01T00:00:00Z").unwrap();
            Ok(self
                .0
                .get(category)
                .into_iter()
                .flatten()
                .map(|title| CategoryMember {
                    namespace: CATEGORY_NS,
                    title: title.clone(),
                    timestamp,
                })
                .collect())
        }
    }

    fn reader(entries: &[(&str, &[&str])]) -> StaticReader {
        StaticReader(
            entries
                .iter()
                .map(|(category, pages)| {
                    (
                        category.to_string(),
                        pages.iter().map(|page| page.to_string()).collect(),
                    )
                })
                .collect(),
        )
    }

    #[test]
    fn indicator_pages_map_to_static_rankings() {
        let conn = open_db_in_memory().unwrap();
        let config = ReconcileConfig::default();
        let reader = reader(&[(
            "Test_articles_by_quality",
            &["FA-Class_Test_articles", "Bogus-Class_Test_articles", "Test_articles"],
        )]);

        let map = CategoryRatingMapper::new(&reader, &config)
            .build_rating_map(&conn, "Test", AssessmentKind::Quality, &ExtraAssessments::default())
            .unwrap();

        assert_eq!(map.len(), 2);
        assert_eq!(map["FA-Class"].ranking, 500);
        assert_eq!(map["FA-Class"].category, "FA-Class_Test_articles");
        assert_eq!(map["NotA-Class"].category, "");
        assert_eq!(map["NotA-Class"].replacement, "Unknown-Class");
    }

    #[test]
    fn importance_falls_back_to_priority_category() {
        let conn = open_db_in_memory().unwrap();
        let config = ReconcileConfig::default();
        let reader = reader(&[("Test_articles_by_priority", &["Top-Class_Test_articles"])]);

        let map = CategoryRatingMapper::new(&reader, &config)
            .build_rating_map(&conn, "Test", AssessmentKind::Importance, &ExtraAssessments::default())
            .unwrap();

        assert_eq!(map["Top-Class"].ranking, 400);
    }

    #[test]
    fn overrides_win_and_invalid_overrides_are_skipped() {
        let conn = open_db_in_memory().unwrap();
        let config = ReconcileConfig::default();
        let reader = reader(&[(
            "Test_articles_by_quality",
            &["Future-Class_Test_articles", "Broken_Test_articles"],
        )]);
        let mut extra = ExtraAssessments::default();
        extra.overrides.insert(
            "Future-Class_Test_articles".to_string(),
            RawOverride {
                title: Some("Future-Class".to_string()),
                ranking: Some("42".to_string()),
                replaces: Some("Start-Class".to_string()),
                ..RawOverride::default()
            },
        );
        extra.overrides.insert(
            "Broken_Test_articles".to_string(),
            RawOverride {
                title: Some("Broken-Class".to_string()),
                ranking: Some("high".to_string()),
                ..RawOverride::default()
            },
        );

        let map = CategoryRatingMapper::new(&reader, &config)
            .build_rating_map(&conn, "Test", AssessmentKind::Quality, &extra)
            .unwrap();

        assert_eq!(map["Future-Class"].ranking, 42);
        assert_eq!(map["Future-Class"].replacement, "Start-Class");
        assert!(!map.contains_key("Broken-Class"));
        assert!(!map.contains_key("Broken"));
    }

    #[test]
    fn override_using_sentinel_label_is_skipped() {
        let conn = open_db_in_memory().unwrap();
        let config = ReconcileConfig::default();
        let reader = reader(&[(
            "Test_articles_by_quality",
            &["Unrated_Test_articles", "B-Class_Test_articles"],
        )]);
        let mut extra = ExtraAssessments::default();
        extra.overrides.insert(
            "Unrated_Test_articles".to_string(),
            RawOverride {
                title: Some("NotA-Class".to_string()),
                ranking: Some("5".to_string()),
                ..RawOverride::default()
            },
        );

        let map = CategoryRatingMapper::new(&reader, &config)
            .build_rating_map(&conn, "Test", AssessmentKind::Quality, &extra)
            .unwrap();

        assert_eq!(map.len(), 2);
        assert_eq!(map["NotA-Class"].category, "");
        assert_eq!(map["NotA-Class"].ranking, -1);
        let stored = SqliteCategoryRepository::new(&conn)
            .list_for_project("Test", AssessmentKind::Quality)
            .unwrap();
        assert!(stored
            .iter()
            .all(|category| category.category != "Unrated_Test_articles"));
    }
}
