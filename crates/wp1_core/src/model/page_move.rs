//! Recorded page renames.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One observed rename/redirect of a page; immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMove {
    pub timestamp: NaiveDateTime,
    pub old_namespace: i64,
    pub old_article: String,
    pub new_namespace: i64,
    pub new_article: String,
}
