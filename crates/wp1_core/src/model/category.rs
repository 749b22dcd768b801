//! Per-project rating buckets as persisted in `categories`.

use crate::model::kind::AssessmentKind;
use serde::{Deserialize, Serialize};

/// Binding of one rating label to the wiki category that backs it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub project: String,
    pub kind: AssessmentKind,
    /// Label derived from the wiki category (or override title).
    pub rating: String,
    /// Canonical label used when comparing across projects.
    pub replacement: String,
    /// Wiki category title; empty for the synthetic sentinel bucket.
    pub category: String,
    pub ranking: i64,
}
