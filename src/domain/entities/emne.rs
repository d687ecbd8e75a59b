use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A shared subject/course around which a study group organizes
/// contributions and meetings.
///
/// Owned by the rest of the platform, the synthesis pipeline only reads it:
/// `title` and `goals` feed the prompt construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Emne {
    pub id: Uuid,
    pub title: String,
    /// Course code, e.g. "MAT121"
    pub code: Option<String>,
    pub description: Option<String>,
    pub semester: Option<String>,
    pub goals: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
