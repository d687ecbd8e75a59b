use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A persisted, versioned artifact produced by the synthesis pipeline.
///
/// Master documents are append-only: every successful generation inserts a
/// new row with the next version for its emne, existing rows are never
/// updated. "Latest" is resolved by sort order when reading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterDocument {
    pub id: Uuid,
    pub emne_id: Uuid,
    pub title: String,
    pub content: String,
    /// Monotonically increasing per emne, assigned by the document store at insert
    pub version: i32,
    pub generated_at: DateTime<Utc>,
    /// The user instruction actually used: the caller override, or the
    /// fixed default marker when none was given
    pub ai_prompt: String,
    /// Provenance: the exact ordered list of contribution ids that were
    /// visible to the generation call, even if those contributions are
    /// later edited or deleted
    pub source_contributions: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A master document as produced by the orchestrator, before the document
/// store has assigned its id, version and timestamps.
#[derive(Debug, Clone)]
pub struct NewMasterDocument {
    pub emne_id: Uuid,
    pub title: String,
    pub content: String,
    pub ai_prompt: String,
    pub source_contributions: Vec<Uuid>,
}
