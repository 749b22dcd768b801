//! Audit log rows.
//!
//! # Invariants
//! - One row per `(project, namespace, article, action, timestamp)`;
//!   `timestamp` is the cycle timestamp, so re-running one cycle cannot
//!   duplicate a row.

use crate::model::kind::AssessmentKind;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// What changed for an article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogAction {
    Quality,
    Importance,
    Moved,
}

impl LogAction {
    pub fn for_kind(kind: AssessmentKind) -> Self {
        match kind {
            AssessmentKind::Quality => Self::Quality,
            AssessmentKind::Importance => Self::Importance,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Quality => "quality",
            Self::Importance => "importance",
            Self::Moved => "moved",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "quality" => Some(Self::Quality),
            "importance" => Some(Self::Importance),
            "moved" => Some(Self::Moved),
            _ => None,
        }
    }
}

impl Display for LogAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub project: String,
    pub namespace: i64,
    pub article: String,
    pub action: LogAction,
    pub timestamp: NaiveDateTime,
    pub old: Option<String>,
    pub new: Option<String>,
    /// When the wiki-side change happened (category link or move time).
    pub revision_timestamp: NaiveDateTime,
}
