//! Reconciliation settings.
//!
//! # Responsibility
//! - Hold the wiki naming conventions used to derive tracking categories.
//! - Hold the static rating -> ranking tables for both assessment kinds.
//! - Hold resource bounds (commit batch size, live API attempts).
//!
//! # Invariants
//! - `not_a_class_ranking` is lower than every ranking in both tables, so
//!   sentinel-rated articles always sort last.
//! - `batch_size` and `api_max_attempts` are non-zero.

use crate::model::kind::AssessmentKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

const DEFAULT_BATCH_SIZE: usize = 200;
const DEFAULT_API_MAX_ATTEMPTS: u32 = 3;

#[derive(Debug)]
pub enum ConfigError {
    Parse(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "failed to parse reconcile config: {err}"),
            Self::Invalid(message) => write!(f, "invalid reconcile config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

/// Settings for one reconciliation worker.
///
/// Every field has a default matching English Wikipedia, so a JSON document
/// only needs to list what differs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Middle part of `<Project>_<articles_label>_by_quality`.
    pub articles_label: String,
    pub by_quality: String,
    pub by_importance: String,
    /// Some projects track importance as "priority".
    pub by_importance_alt: String,
    pub category_ns: String,
    /// Category whose members are the per-project quality categories.
    pub root_category: String,
    /// Suffix appended to a class indicator: `FA` -> `FA-Class`.
    pub class_suffix: String,
    /// Sentinel label for "tracked but not rated for this kind".
    pub not_a_class: String,
    pub not_a_class_ranking: i64,
    /// Replacement label stored for the sentinel bucket.
    pub unknown_class: String,
    pub unassessed_class: String,
    pub quality: BTreeMap<String, i64>,
    pub importance: BTreeMap<String, i64>,
    /// Articles written per storage transaction.
    pub batch_size: usize,
    /// Attempts per live API call before giving up.
    pub api_max_attempts: u32,
    /// Key into `namespacename.dbname`.
    pub wiki_dbname: String,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            articles_label: "articles".to_string(),
            by_quality: "by_quality".to_string(),
            by_importance: "by_importance".to_string(),
            by_importance_alt: "by_priority".to_string(),
            category_ns: "Category".to_string(),
            root_category: "Wikipedia_1.0_assessments".to_string(),
            class_suffix: "Class".to_string(),
            not_a_class: "NotA-Class".to_string(),
            not_a_class_ranking: -1,
            unknown_class: "Unknown-Class".to_string(),
            unassessed_class: "Unassessed-Class".to_string(),
            quality: ranking_table(&[
                ("FA-Class", 500),
                ("FL-Class", 480),
                ("A-Class", 425),
                ("GA-Class", 400),
                ("B-Class", 300),
                ("C-Class", 225),
                ("Start-Class", 150),
                ("Stub-Class", 100),
                ("List-Class", 80),
                ("Unassessed-Class", 0),
            ]),
            importance: ranking_table(&[
                ("Top-Class", 400),
                ("High-Class", 300),
                ("Mid-Class", 200),
                ("Low-Class", 100),
                ("NA-Class", 25),
                ("Unknown-Class", 10),
            ]),
            batch_size: DEFAULT_BATCH_SIZE,
            api_max_attempts: DEFAULT_API_MAX_ATTEMPTS,
            wiki_dbname: "enwiki_p".to_string(),
        }
    }
}

impl ReconcileConfig {
    /// Parses a JSON document layered over the defaults and validates it.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid("batch_size must be > 0".to_string()));
        }
        if self.api_max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "api_max_attempts must be > 0".to_string(),
            ));
        }
        for (field, value) in [
            ("articles_label", &self.articles_label),
            ("by_quality", &self.by_quality),
            ("by_importance", &self.by_importance),
            ("not_a_class", &self.not_a_class),
            ("class_suffix", &self.class_suffix),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("{field} cannot be empty")));
            }
        }

        for kind in AssessmentKind::ALL {
            let table = self.rankings(kind);
            if table.contains_key(&self.not_a_class) {
                return Err(ConfigError::Invalid(format!(
                    "{kind} table must not contain sentinel `{}`",
                    self.not_a_class
                )));
            }
            if let Some((label, ranking)) = table
                .iter()
                .find(|(_, ranking)| **ranking <= self.not_a_class_ranking)
            {
                return Err(ConfigError::Invalid(format!(
                    "{kind} ranking {ranking} for `{label}` is not above sentinel ranking {}",
                    self.not_a_class_ranking
                )));
            }
        }

        Ok(())
    }

    /// Static rating -> ranking table for one kind.
    pub fn rankings(&self, kind: AssessmentKind) -> &BTreeMap<String, i64> {
        match kind {
            AssessmentKind::Quality => &self.quality,
            AssessmentKind::Importance => &self.importance,
        }
    }

    /// Tracking category title (no namespace prefix) for `project` and `kind`.
    ///
    /// `use_alt` only changes the importance name; quality has no alternate.
    pub fn category_for_project(
        &self,
        project: &str,
        kind: AssessmentKind,
        use_alt: bool,
    ) -> String {
        let kind_tag = match kind {
            AssessmentKind::Quality => &self.by_quality,
            AssessmentKind::Importance if use_alt => &self.by_importance_alt,
            AssessmentKind::Importance => &self.by_importance,
        };
        format!("{project}_{}_{kind_tag}", self.articles_label)
    }

    /// Rating label for a class indicator: `FA` -> `FA-Class`.
    pub fn label_for_indicator(&self, indicator: &str) -> String {
        format!("{indicator}-{}", self.class_suffix)
    }

    /// Key under which progress for `project` is reported.
    pub fn progress_key(&self, project: &str) -> String {
        format!("progress:{project}")
    }
}

fn ranking_table(entries: &[(&str, i64)]) -> BTreeMap<String, i64> {
    entries
        .iter()
        .map(|(label, ranking)| ((*label).to_string(), *ranking))
        .collect()
}
