use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::helper::error_chain_fmt;

/// A member-authored piece of content attached to an emne.
///
/// Contributions are created by members during or between meetings.
/// The synthesis pipeline never mutates them: it only reads the most
/// recent ones as input material for a generation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contribution {
    pub id: Uuid,
    pub emne_id: Uuid,
    pub meeting_id: Option<Uuid>,
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
    pub kind: ContributionKind,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContributionKind {
    Note,
    Question,
    Insight,
    Summary,
}

impl ContributionKind {
    pub fn parse(s: &str) -> Result<ContributionKind, ContributionKindError> {
        match s {
            "note" => Ok(Self::Note),
            "question" => Ok(Self::Question),
            "insight" => Ok(Self::Insight),
            "summary" => Ok(Self::Summary),
            other => Err(ContributionKindError::UnknownKind(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Note => "note",
            Self::Question => "question",
            Self::Insight => "insight",
            Self::Summary => "summary",
        }
    }
}

impl std::fmt::Display for ContributionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.as_str().fmt(f)
    }
}

#[derive(thiserror::Error)]
pub enum ContributionKindError {
    #[error("{0} is not a supported contribution kind. Use one of: note, question, insight, summary.")]
    UnknownKind(String),
}

impl std::fmt::Debug for ContributionKindError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
