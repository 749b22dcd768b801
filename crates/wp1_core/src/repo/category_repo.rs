//! Category repository contracts and SQLite implementation.
//!
//! # Invariants
//! - `(project, kind, rating)` identifies a bucket; upserts merge the
//!   replacement, category title and ranking into an existing row.

use crate::model::category::Category;
use crate::model::kind::AssessmentKind;
use crate::repo::{RepoError, RepoResult};
use rusqlite::{params, Connection};

pub trait CategoryRepository {
    fn upsert_category(&self, category: &Category) -> RepoResult<()>;
    /// Buckets of one kind, highest ranking first.
    fn list_for_project(&self, project: &str, kind: AssessmentKind) -> RepoResult<Vec<Category>>;
}

/// SQLite-backed category repository.
pub struct SqliteCategoryRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCategoryRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl CategoryRepository for SqliteCategoryRepository<'_> {
    fn upsert_category(&self, category: &Category) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO categories (
                c_project,
                c_type,
                c_rating,
                c_replacement,
                c_category,
                c_ranking
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT (c_project, c_type, c_rating) DO UPDATE SET
                c_replacement = excluded.c_replacement,
                c_category = excluded.c_category,
                c_ranking = excluded.c_ranking;",
            params![
                category.project.as_str(),
                category.kind.as_str(),
                category.rating.as_str(),
                category.replacement.as_str(),
                category.category.as_str(),
                category.ranking,
            ],
        )?;
        Ok(())
    }

    fn list_for_project(&self, project: &str, kind: AssessmentKind) -> RepoResult<Vec<Category>> {
        let mut stmt = self.conn.prepare(
            "SELECT c_project, c_type, c_rating, c_replacement, c_category, c_ranking
             FROM categories
             WHERE c_project = ?1
               AND c_type = ?2
             ORDER BY c_ranking DESC, c_rating ASC;",
        )?;
        let mut rows = stmt.query(params![project, kind.as_str()])?;
        let mut categories = Vec::new();
        while let Some(row) = rows.next()? {
            let kind_text: String = row.get("c_type")?;
            let kind = kind_text.parse::<AssessmentKind>().map_err(|err| {
                RepoError::InvalidData(format!("categories.c_type: {err}"))
            })?;
            categories.push(Category {
                project: row.get("c_project")?,
                kind,
                rating: row.get("c_rating")?,
                replacement: row
                    .get::<_, Option<String>>("c_replacement")?
                    .unwrap_or_default(),
                category: row
                    .get::<_, Option<String>>("c_category")?
                    .unwrap_or_default(),
                ranking: row.get::<_, Option<i64>>("c_ranking")?.unwrap_or_default(),
            });
        }
        Ok(categories)
    }
}
