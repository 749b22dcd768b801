//! Assessment axes.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// One of the two independent rating axes tracked per article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentKind {
    Quality,
    Importance,
}

impl AssessmentKind {
    /// Processing order for one reconciliation cycle.
    pub const ALL: [AssessmentKind; 2] = [AssessmentKind::Quality, AssessmentKind::Importance];

    /// Storage spelling used by `categories.c_type` and `logging.l_action`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Quality => "quality",
            Self::Importance => "importance",
        }
    }
}

impl Display for AssessmentKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when text that should name a kind names something else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidKindError(pub String);

impl Display for InvalidKindError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "assessment kind `{}` is not one of quality|importance",
            self.0
        )
    }
}

impl Error for InvalidKindError {}

impl FromStr for AssessmentKind {
    type Err = InvalidKindError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "quality" => Ok(Self::Quality),
            "importance" => Ok(Self::Importance),
            other => Err(InvalidKindError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::AssessmentKind;

    #[test]
    fn parses_storage_spelling() {
        assert_eq!(
            "importance".parse::<AssessmentKind>().unwrap(),
            AssessmentKind::Importance
        );
        assert_eq!(AssessmentKind::Quality.to_string(), "quality");
    }

    #[test]
    fn rejects_both_and_unknown_kinds() {
        let err = "both".parse::<AssessmentKind>().unwrap_err();
        assert!(err.to_string().contains("`both`"));
        assert!("Quality".parse::<AssessmentKind>().is_err());
    }
}
