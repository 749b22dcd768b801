//! WikiProject record.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// One WikiProject and the counters refreshed by every reconciliation cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Project name as it appears in tracking categories (underscored).
    pub name: String,
    /// End of the last successful cycle; `None` for a never-synced project.
    pub timestamp: Option<NaiveDateTime>,
    pub wikipage: Option<String>,
    pub parent: Option<String>,
    pub shortname: Option<String>,
    pub count: Option<i64>,
    pub quality_count: Option<i64>,
    pub importance_count: Option<i64>,
    pub upload_timestamp: Option<String>,
    pub scope: i64,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            timestamp: None,
            wikipage: None,
            parent: None,
            shortname: None,
            count: None,
            quality_count: None,
            importance_count: None,
            upload_timestamp: None,
            scope: 0,
        }
    }

    /// Lower bound for move/redirect evidence: the last sync, or the epoch.
    pub fn synced_since(&self) -> NaiveDateTime {
        self.timestamp
            .unwrap_or_else(|| DateTime::<Utc>::UNIX_EPOCH.naive_utc())
    }
}
