//! Project repository contracts and SQLite implementation.

use crate::model::project::Project;
use crate::model::timestamp::format_wp10_ts;
use crate::repo::{parse_wp10_ts_column, RepoResult};
use rusqlite::{params, Connection, Row};

const PROJECT_SELECT_SQL: &str = "SELECT
    p_project,
    p_timestamp,
    p_wikipage,
    p_parent,
    p_shortname,
    p_count,
    p_qcount,
    p_icount,
    p_upload_timestamp,
    p_scope
FROM projects";

/// Stored in `p_timestamp` for a project that has never completed a cycle.
const NEVER_SYNCED: &str = "19700101000000";

pub trait ProjectRepository {
    fn get_project(&self, name: &str) -> RepoResult<Option<Project>>;
    /// Updates every column of an existing project, or inserts it.
    fn insert_or_update(&self, project: &Project) -> RepoResult<()>;
    fn list_all(&self) -> RepoResult<Vec<Project>>;
    fn count(&self) -> RepoResult<i64>;
}

/// SQLite-backed project repository.
pub struct SqliteProjectRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteProjectRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ProjectRepository for SqliteProjectRepository<'_> {
    fn get_project(&self, name: &str) -> RepoResult<Option<Project>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PROJECT_SELECT_SQL} WHERE p_project = ?1;"))?;
        let mut rows = stmt.query([name])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_project_row(row)?));
        }
        Ok(None)
    }

    fn insert_or_update(&self, project: &Project) -> RepoResult<()> {
        let timestamp = project
            .timestamp
            .as_ref()
            .map(format_wp10_ts)
            .unwrap_or_else(|| NEVER_SYNCED.to_string());
        self.conn.execute(
            "INSERT INTO projects (
                p_project,
                p_timestamp,
                p_wikipage,
                p_parent,
                p_shortname,
                p_count,
                p_qcount,
                p_icount,
                p_upload_timestamp,
                p_scope
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT (p_project) DO UPDATE SET
                p_timestamp = excluded.p_timestamp,
                p_wikipage = excluded.p_wikipage,
                p_parent = excluded.p_parent,
                p_shortname = excluded.p_shortname,
                p_count = excluded.p_count,
                p_qcount = excluded.p_qcount,
                p_icount = excluded.p_icount,
                p_upload_timestamp = excluded.p_upload_timestamp,
                p_scope = excluded.p_scope;",
            params![
                project.name.as_str(),
                timestamp,
                project.wikipage.as_deref(),
                project.parent.as_deref(),
                project.shortname.as_deref(),
                project.count,
                project.quality_count,
                project.importance_count,
                project.upload_timestamp.as_deref(),
                project.scope,
            ],
        )?;
        Ok(())
    }

    fn list_all(&self) -> RepoResult<Vec<Project>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PROJECT_SELECT_SQL} ORDER BY p_project ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut projects = Vec::new();
        while let Some(row) = rows.next()? {
            projects.push(parse_project_row(row)?);
        }
        Ok(projects)
    }

    fn count(&self) -> RepoResult<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM projects;", [], |row| row.get(0))?;
        Ok(count)
    }
}

fn parse_project_row(row: &Row<'_>) -> RepoResult<Project> {
    let timestamp_text: String = row.get("p_timestamp")?;
    let timestamp = if timestamp_text == NEVER_SYNCED {
        None
    } else {
        Some(parse_wp10_ts_column(&timestamp_text, "projects.p_timestamp")?)
    };

    Ok(Project {
        name: row.get("p_project")?,
        timestamp,
        wikipage: row.get("p_wikipage")?,
        parent: row.get("p_parent")?,
        shortname: row.get("p_shortname")?,
        count: row.get("p_count")?,
        quality_count: row.get("p_qcount")?,
        importance_count: row.get("p_icount")?,
        upload_timestamp: row.get("p_upload_timestamp")?,
        scope: row.get("p_scope")?,
    })
}
