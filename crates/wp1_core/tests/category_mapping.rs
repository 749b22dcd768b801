mod common;

use common::FakeWiki;
use std::collections::BTreeMap;
use wp1_core::db::open_db_in_memory;
use wp1_core::repo::category_repo::{CategoryRepository, SqliteCategoryRepository};
use wp1_core::wiki::extra::RawOverride;
use wp1_core::{AssessmentKind, CategoryRatingMapper, ExtraAssessments, ReconcileConfig};

#[test]
fn rating_map_is_persisted_with_sentinel_for_each_kind() {
    let conn = open_db_in_memory().unwrap();
    let config = ReconcileConfig::default();
    let mut wiki = FakeWiki::new();
    wiki.add_rating_category("Test", "by_quality", "FA-Class_Test_articles");
    wiki.add_rating_category("Test", "by_quality", "B-Class_Test_articles");
    wiki.add_rating_category("Test", "by_importance", "Top-Class_Test_articles");
    let mapper = CategoryRatingMapper::new(&wiki, &config);

    for kind in AssessmentKind::ALL {
        mapper
            .build_rating_map(&conn, "Test", kind, &ExtraAssessments::default())
            .unwrap();
    }

    let repo = SqliteCategoryRepository::new(&conn);
    let quality = repo
        .list_for_project("Test", AssessmentKind::Quality)
        .unwrap();
    let labels: Vec<&str> = quality.iter().map(|row| row.rating.as_str()).collect();
    assert_eq!(labels, vec!["FA-Class", "B-Class", "NotA-Class"]);

    let importance = repo
        .list_for_project("Test", AssessmentKind::Importance)
        .unwrap();
    assert_eq!(importance.len(), 2);
    let sentinel = importance.last().unwrap();
    assert_eq!(sentinel.rating, "NotA-Class");
    assert_eq!(sentinel.category, "");
    assert_eq!(sentinel.replacement, "Unknown-Class");
    assert_eq!(sentinel.ranking, -1);
}

#[test]
fn repeated_mapping_updates_rows_instead_of_duplicating() {
    let conn = open_db_in_memory().unwrap();
    let config = ReconcileConfig::default();
    let mut wiki = FakeWiki::new();
    wiki.add_rating_category("Test", "by_quality", "GA-Class_Test_articles");
    let mapper = CategoryRatingMapper::new(&wiki, &config);

    let first = mapper
        .build_rating_map(&conn, "Test", AssessmentKind::Quality, &ExtraAssessments::default())
        .unwrap();
    let second = mapper
        .build_rating_map(&conn, "Test", AssessmentKind::Quality, &ExtraAssessments::default())
        .unwrap();

    assert_eq!(first, second);
    let rows = SqliteCategoryRepository::new(&conn)
        .list_for_project("Test", AssessmentKind::Quality)
        .unwrap();
    assert_eq!(rows.len(), 2);
}

#[test]
fn template_overrides_feed_the_mapper() {
    let conn = open_db_in_memory().unwrap();
    let config = ReconcileConfig::default();
    let mut wiki = FakeWiki::new();
    wiki.add_rating_category("Test", "by_quality", "Bplus-Class_Test_articles");

    let params: BTreeMap<String, String> = [
        ("homepage", "WikiProject Test"),
        ("extra1-title", "Bplus-Class"),
        ("extra1-type", "quality"),
        ("extra1-category", "Category:Bplus-Class Test articles"),
        ("extra1-ranking", "350"),
        ("extra1-replaces", "B-Class"),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_string(), value.to_string()))
    .collect();
    let extra = ExtraAssessments::from_template_params(&params, &config.category_ns);

    let map = CategoryRatingMapper::new(&wiki, &config)
        .build_rating_map(&conn, "Test", AssessmentKind::Quality, &extra)
        .unwrap();

    let bucket = &map["Bplus-Class"];
    assert_eq!(bucket.ranking, 350);
    assert_eq!(bucket.replacement, "B-Class");
    assert_eq!(bucket.category, "Bplus-Class_Test_articles");
}

#[test]
fn importance_override_never_uses_replaces() {
    let conn = open_db_in_memory().unwrap();
    let config = ReconcileConfig::default();
    let mut wiki = FakeWiki::new();
    wiki.add_rating_category("Test", "by_importance", "Core-Class_Test_articles");
    let mut extra = ExtraAssessments::default();
    extra.overrides.insert(
        "Core-Class_Test_articles".to_string(),
        RawOverride {
            title: Some("Core-Class".to_string()),
            ranking: Some("450".to_string()),
            replaces: Some("Top-Class".to_string()),
            kind: Some("importance".to_string()),
            category: Some("Core-Class_Test_articles".to_string()),
        },
    );

    let map = CategoryRatingMapper::new(&wiki, &config)
        .build_rating_map(&conn, "Test", AssessmentKind::Importance, &extra)
        .unwrap();

    assert_eq!(map["Core-Class"].replacement, "Core-Class");
}

#[test]
fn missing_tracking_categories_still_yield_sentinel() {
    let conn = open_db_in_memory().unwrap();
    let config = ReconcileConfig::default();
    let wiki = FakeWiki::new();

    let map = CategoryRatingMapper::new(&wiki, &config)
        .build_rating_map(&conn, "Empty", AssessmentKind::Importance, &ExtraAssessments::default())
        .unwrap();

    assert_eq!(map.len(), 1);
    assert!(map.contains_key("NotA-Class"));
}
