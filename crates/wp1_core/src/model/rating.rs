//! Rating rows and article identity.
//!
//! # Invariants
//! - `ArticleRef` holds the article namespace, never the talk namespace the
//!   wiki tags with project banners.
//! - After normalization neither `quality` nor `importance` is `None`.

use crate::model::kind::AssessmentKind;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Identity of one article inside a project: `(namespace, title)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ArticleRef {
    pub namespace: i64,
    pub title: String,
}

impl ArticleRef {
    pub fn new(namespace: i64, title: impl Into<String>) -> Self {
        Self {
            namespace,
            title: title.into(),
        }
    }
}

impl Display for ArticleRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.namespace, self.title)
    }
}

/// Stored quality/importance assessment for one article of one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rating {
    pub project: String,
    pub namespace: i64,
    pub article: String,
    /// Carried for the selection tooling; reconciliation always writes 0.
    pub score: i64,
    pub quality: Option<String>,
    pub quality_timestamp: Option<NaiveDateTime>,
    pub importance: Option<String>,
    pub importance_timestamp: Option<NaiveDateTime>,
}

impl Rating {
    /// Creates an unrated row for one article.
    pub fn new(project: impl Into<String>, namespace: i64, article: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            namespace,
            article: article.into(),
            score: 0,
            quality: None,
            quality_timestamp: None,
            importance: None,
            importance_timestamp: None,
        }
    }

    pub fn article_ref(&self) -> ArticleRef {
        ArticleRef::new(self.namespace, self.article.clone())
    }

    /// Returns the label stored for `kind`.
    pub fn value(&self, kind: AssessmentKind) -> Option<&str> {
        match kind {
            AssessmentKind::Quality => self.quality.as_deref(),
            AssessmentKind::Importance => self.importance.as_deref(),
        }
    }

    pub fn timestamp(&self, kind: AssessmentKind) -> Option<NaiveDateTime> {
        match kind {
            AssessmentKind::Quality => self.quality_timestamp,
            AssessmentKind::Importance => self.importance_timestamp,
        }
    }

    /// Sets label and timestamp for `kind`, leaving the other axis untouched.
    pub fn set(&mut self, kind: AssessmentKind, label: impl Into<String>, at: NaiveDateTime) {
        match kind {
            AssessmentKind::Quality => {
                self.quality = Some(label.into());
                self.quality_timestamp = Some(at);
            }
            AssessmentKind::Importance => {
                self.importance = Some(label.into());
                self.importance_timestamp = Some(at);
            }
        }
    }

    /// True when `kind` is unset or holds the `not_a_class` sentinel.
    pub fn is_unrated(&self, kind: AssessmentKind, not_a_class: &str) -> bool {
        self.value(kind).map_or(true, |value| value == not_a_class)
    }
}
