//! Namespace name <-> id directory for one wiki.
//!
//! # Invariants
//! - Built once per wiki connection and passed explicitly; there is no
//!   process-global cache.
//! - When several names map to one id, the `primary` name is used for
//!   formatting titles.

use crate::db::DbResult;
use rusqlite::Connection;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceDirectory {
    name_to_id: BTreeMap<String, i64>,
    id_to_name: BTreeMap<i64, String>,
}

impl NamespaceDirectory {
    /// Loads all names recorded for `dbname` in `namespacename`.
    pub fn load(conn: &Connection, dbname: &str) -> DbResult<Self> {
        let mut stmt = conn.prepare(
            "SELECT ns_name, ns_id
             FROM namespacename
             WHERE dbname = ?1
             ORDER BY
                CASE ns_type
                    WHEN 'primary' THEN 0
                    WHEN 'canonical' THEN 1
                    ELSE 2
                END ASC,
                ns_name ASC;",
        )?;
        let mut rows = stmt.query([dbname])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push((row.get::<_, String>(0)?, row.get::<_, i64>(1)?));
        }
        Ok(Self::from_entries(entries))
    }

    /// Builds a directory from `(name, id)` pairs; the first name seen for an
    /// id becomes its display name.
    pub fn from_entries<N: Into<String>>(entries: impl IntoIterator<Item = (N, i64)>) -> Self {
        let mut directory = Self::default();
        for (name, id) in entries {
            let name = name.into();
            directory.id_to_name.entry(id).or_insert_with(|| name.clone());
            directory.name_to_id.insert(name, id);
        }
        directory
    }

    pub fn id_for(&self, name: &str) -> Option<i64> {
        self.name_to_id.get(name).copied()
    }

    pub fn name_for(&self, id: i64) -> Option<&str> {
        self.id_to_name.get(&id).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_name.is_empty()
    }

    /// Prefixed title for API calls (`Talk:Foo`); main-namespace titles are
    /// returned bare. `None` when the namespace id is unknown.
    pub fn title_for_api(&self, namespace: i64, title: &str) -> Option<String> {
        let name = self.name_for(namespace)?;
        if name.is_empty() {
            Some(title.to_string())
        } else {
            Some(format!("{name}:{title}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::NamespaceDirectory;

    fn directory() -> NamespaceDirectory {
        NamespaceDirectory::from_entries([
            ("", 0),
            ("Talk", 1),
            ("Wikipedia", 4),
            ("WP", 4),
            ("Category", 14),
        ])
    }

    #[test]
    fn lookups_work_in_both_directions() {
        let directory = directory();
        assert_eq!(directory.id_for("WP"), Some(4));
        assert_eq!(directory.id_for("Wikipedia"), Some(4));
        assert_eq!(directory.name_for(4), Some("Wikipedia"));
        assert_eq!(directory.name_for(99), None);
    }

    #[test]
    fn api_titles_prefix_non_main_namespaces() {
        let directory = directory();
        assert_eq!(directory.title_for_api(0, "Foo").as_deref(), Some("Foo"));
        assert_eq!(
            directory.title_for_api(4, "Bar").as_deref(),
            Some("Wikipedia:Bar")
        );
        assert_eq!(directory.title_for_api(7, "Baz"), None);
    }
}
