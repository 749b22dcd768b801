//! Per-project "extra assessment" overrides.
//!
//! Projects declare extra rating buckets and metadata through the
//! `ReleaseVersionParameters` template on their quality category page.
//! The template parameters arrive here already extracted from wikitext.
//!
//! # Invariants
//! - Overrides are keyed by underscored category title without the
//!   `Category:` prefix.
//! - Raw overrides are validated into [`LabelOverride`] at the mapper
//!   boundary; a bad override never aborts a cycle.

use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

static EXTRA_PARAM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^extra(\d)-(.+)$").expect("valid extra param regex"));

/// Override fields exactly as declared on the wiki.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawOverride {
    pub title: Option<String>,
    pub ranking: Option<String>,
    pub replaces: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub category: Option<String>,
}

/// Validated override for one tracking category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelOverride {
    pub label: String,
    pub ranking: i64,
    pub replacement: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverrideError {
    MissingField(&'static str),
    NonIntegerRanking(String),
}

impl Display for OverrideError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "override is missing `{field}`"),
            Self::NonIntegerRanking(value) => {
                write!(f, "override ranking `{value}` is not an integer")
            }
        }
    }
}

impl Error for OverrideError {}

impl RawOverride {
    pub fn validate(&self) -> Result<LabelOverride, OverrideError> {
        let label = non_empty(self.title.as_deref()).ok_or(OverrideError::MissingField("title"))?;
        let raw_ranking =
            non_empty(self.ranking.as_deref()).ok_or(OverrideError::MissingField("ranking"))?;
        let ranking = raw_ranking
            .parse::<i64>()
            .map_err(|_| OverrideError::NonIntegerRanking(raw_ranking.to_string()))?;

        Ok(LabelOverride {
            label: label.to_string(),
            ranking,
            replacement: non_empty(self.replaces.as_deref()).map(str::to_string),
        })
    }
}

/// Project metadata and bucket overrides from the wiki template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraAssessments {
    pub homepage: Option<String>,
    pub parent: Option<String>,
    pub shortname: Option<String>,
    #[serde(default)]
    pub overrides: BTreeMap<String, RawOverride>,
}

impl ExtraAssessments {
    /// Builds overrides from flat template parameters.
    ///
    /// Parameters named `extraN-<field>` are grouped by `N`; groups missing
    /// any of `title`, `type`, `category`, `ranking` are dropped.
    pub fn from_template_params(params: &BTreeMap<String, String>, category_ns: &str) -> Self {
        let mut extra = Self {
            homepage: metadata_param(params, "homepage"),
            parent: metadata_param(params, "parent"),
            shortname: metadata_param(params, "shortname"),
            overrides: BTreeMap::new(),
        };

        let mut groups: BTreeMap<&str, BTreeMap<&str, &str>> = BTreeMap::new();
        for (name, value) in params {
            if let Some(caps) = EXTRA_PARAM_RE.captures(name.trim()) {
                let (Some(group), Some(field)) = (caps.get(1), caps.get(2)) else {
                    continue;
                };
                groups
                    .entry(group.as_str())
                    .or_default()
                    .insert(field.as_str(), value.trim());
            }
        }

        let prefix = format!("{category_ns}:");
        for fields in groups.values() {
            let complete = ["title", "type", "category", "ranking"]
                .iter()
                .all(|field| fields.contains_key(field));
            if !complete {
                continue;
            }
            let category = fields["category"]
                .trim_start_matches(prefix.as_str())
                .replace(' ', "_");
            let raw = RawOverride {
                title: fields.get("title").map(|value| value.to_string()),
                ranking: fields.get("ranking").map(|value| value.to_string()),
                replaces: fields.get("replaces").map(|value| value.to_string()),
                kind: fields.get("type").map(|value| value.to_string()),
                category: Some(category.clone()),
            };
            extra.overrides.insert(category, raw);
        }

        extra
    }

    /// Parses a JSON object of template parameters, as exported from the
    /// project's template, and groups it like [`Self::from_template_params`].
    ///
    /// Numeric values are accepted for fields such as `extraN-ranking`;
    /// other non-string values are dropped with a warning.
    pub fn from_template_json(raw: &str, category_ns: &str) -> Result<Self, serde_json::Error> {
        let values: BTreeMap<String, serde_json::Value> = serde_json::from_str(raw)?;
        let mut params = BTreeMap::new();
        for (name, value) in values {
            match value {
                serde_json::Value::String(text) => {
                    params.insert(name, text);
                }
                serde_json::Value::Number(number) => {
                    params.insert(name, number.to_string());
                }
                _ => warn!(
                    "event=extra_params_parse module=wiki status=skipped reason=not_scalar param={name}"
                ),
            }
        }
        Ok(Self::from_template_params(&params, category_ns))
    }

    pub fn override_for(&self, category_title: &str) -> Option<&RawOverride> {
        self.overrides.get(category_title)
    }
}

fn metadata_param(params: &BTreeMap<String, String>, key: &str) -> Option<String> {
    params
        .get(key)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
