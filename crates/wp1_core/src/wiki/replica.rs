//! Category and redirect reader over a wiki replica database.
//!
//! # Responsibility
//! - List category members by joining `page` and `categorylinks`.
//! - Resolve redirects by joining `page` and `redirect`.
//!
//! # Invariants
//! - Read-only: no statement here mutates the replica.
//! - Titles are matched in underscored form.

use crate::model::timestamp::{parse_wiki_ts, parse_wp10_ts};
use crate::wiki::{CategoryMember, CategoryReader, PageTarget, RedirectSource, WikiError, WikiResult};
use chrono::NaiveDateTime;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OpenFlags, OptionalExtension};
use std::path::Path;

const REPLICA_SCHEMA_SQL: &str = include_str!("replica_schema.sql");
const SQL_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const REQUIRED_COLUMNS: &[(&str, &[&str])] = &[
    ("page", &["page_id", "page_namespace", "page_title", "page_touched"]),
    ("categorylinks", &["cl_from", "cl_to", "cl_timestamp"]),
    ("redirect", &["rd_from", "rd_namespace", "rd_title"]),
];

/// Opens a replica database file read-only.
pub fn open_replica(path: impl AsRef<Path>) -> WikiResult<Connection> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    Ok(conn)
}

/// Replica-backed implementation of [`CategoryReader`] and [`RedirectSource`].
pub struct SqliteWikiReplica<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteWikiReplica<'conn> {
    /// Wraps a replica connection after checking the tables it reads.
    pub fn try_new(conn: &'conn Connection) -> WikiResult<Self> {
        ensure_replica_ready(conn)?;
        Ok(Self { conn })
    }

    /// Creates empty replica tables for local fixtures.
    pub fn bootstrap_schema(conn: &Connection) -> WikiResult<()> {
        conn.execute_batch(REPLICA_SCHEMA_SQL)?;
        Ok(())
    }
}

impl CategoryReader for SqliteWikiReplica<'_> {
    fn list_members(
        &self,
        category: &str,
        namespace: Option<i64>,
    ) -> WikiResult<Vec<CategoryMember>> {
        let mut sql = String::from(
            "SELECT page_namespace, page_title, cl_timestamp
             FROM page
             JOIN categorylinks ON page_id = cl_from
             WHERE cl_to = ?",
        );
        let mut bind_values = vec![Value::Text(category.to_string())];
        if let Some(namespace) = namespace {
            sql.push_str(" AND page_namespace = ?");
            bind_values.push(Value::Integer(namespace));
        }
        sql.push_str(" ORDER BY page_namespace ASC, page_title ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut members = Vec::new();
        while let Some(row) = rows.next()? {
            let raw_timestamp: String = row.get("cl_timestamp")?;
            let timestamp = parse_link_timestamp(&raw_timestamp).ok_or_else(|| {
                WikiError::InvalidData(format!(
                    "invalid categorylinks.cl_timestamp `{raw_timestamp}`"
                ))
            })?;
            members.push(CategoryMember {
                namespace: row.get("page_namespace")?,
                title: row.get("page_title")?,
                timestamp,
            });
        }
        Ok(members)
    }
}

impl RedirectSource for SqliteWikiReplica<'_> {
    fn redirect_target(&self, namespace: i64, title: &str) -> WikiResult<Option<PageTarget>> {
        let db_title = title.replace(' ', "_");
        let row = self
            .conn
            .query_row(
                "SELECT rd_namespace, rd_title, page_touched
                 FROM page
                 JOIN redirect ON page_id = rd_from
                 WHERE page_title = ?1
                   AND page_namespace = ?2;",
                params![db_title, namespace],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;

        let Some((rd_namespace, rd_title, touched)) = row else {
            return Ok(None);
        };
        let timestamp = parse_wp10_ts(&touched).ok_or_else(|| {
            WikiError::InvalidData(format!("invalid page.page_touched `{touched}`"))
        })?;
        Ok(Some(PageTarget {
            namespace: rd_namespace,
            title: rd_title,
            timestamp,
        }))
    }
}

/// Accepts the SQL datetime spelling used by MariaDB replicas as well as the
/// wiki and compact forms.
fn parse_link_timestamp(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, SQL_DATETIME_FORMAT)
        .ok()
        .or_else(|| parse_wiki_ts(value))
        .or_else(|| parse_wp10_ts(value))
}

fn ensure_replica_ready(conn: &Connection) -> WikiResult<()> {
    for &(table, columns) in REQUIRED_COLUMNS {
        let present = table_columns(conn, table)?;
        if present.is_empty() {
            return Err(WikiError::MissingRequiredTable(table));
        }
        for &column in columns {
            if !present.iter().any(|name| name == column) {
                return Err(WikiError::MissingRequiredColumn { table, column });
            }
        }
    }
    Ok(())
}

fn table_columns(conn: &Connection, table: &str) -> WikiResult<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    let mut columns = Vec::new();
    while let Some(row) = rows.next()? {
        columns.push(row.get::<_, String>(1)?);
    }
    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::{parse_link_timestamp, SqliteWikiReplica};
    use crate::wiki::{CategoryReader, RedirectSource, WikiError, CATEGORY_NS};
    use rusqlite::Connection;

    fn replica() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        SqliteWikiReplica::bootstrap_schema(&conn).unwrap();
        conn.execute_batch(
            "INSERT INTO page (page_id, page_namespace, page_title, page_touched) VALUES
                (1, 1, 'Foo', '20200101000000'),
                (2, 14, 'FA-Class_Test_articles', '20200101000000'),
                (3, 0, 'Old_name', '20210304050607');
             INSERT INTO categorylinks (cl_from, cl_to, cl_timestamp) VALUES
                (1, 'FA-Class_Test_articles', '2020-01-02 03:04:05'),
                (2, 'Test_articles_by_quality', '2020-01-01T00:00:00Z');
             INSERT INTO redirect (rd_from, rd_namespace, rd_title) VALUES
                (3, 0, 'New_name');",
        )
        .unwrap();
        conn
    }

    #[test]
    fn lists_members_with_optional_namespace_filter() {
        let conn = replica();
        let reader = SqliteWikiReplica::try_new(&conn).unwrap();

        let members = reader.list_members("FA-Class_Test_articles", None).unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].namespace, 1);
        assert_eq!(members[0].title, "Foo");

        let categories = reader
            .list_members("Test_articles_by_quality", Some(CATEGORY_NS))
            .unwrap();
        assert_eq!(categories.len(), 1);
        assert!(reader
            .list_members("Test_articles_by_quality", Some(0))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn resolves_redirect_with_page_touched_timestamp() {
        let conn = replica();
        let reader = SqliteWikiReplica::try_new(&conn).unwrap();

        let target = reader.redirect_target(0, "Old name").unwrap().unwrap();
        assert_eq!(target.title, "New_name");
        assert_eq!(
            target.timestamp,
            parse_link_timestamp("20210304050607").unwrap()
        );
        assert!(reader.redirect_target(0, "Foo").unwrap().is_none());
    }

    #[test]
    fn missing_tables_are_reported() {
        let conn = Connection::open_in_memory().unwrap();
        let err = SqliteWikiReplica::try_new(&conn).err().unwrap();
        assert!(matches!(err, WikiError::MissingRequiredTable("page")));
    }
}
