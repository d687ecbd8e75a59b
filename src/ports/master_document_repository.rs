use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    domain::entities::master_document::{MasterDocument, NewMasterDocument},
    helper::error_chain_fmt,
};

/// Persistence of generated master documents.
///
/// The store assigns id, version and timestamps at insert. Versions are
/// append-only: a single insert is the only write the pipeline ever does,
/// so the atomicity of that insert is all the transaction discipline needed.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MasterDocumentRepository: Send + Sync {
    async fn insert(
        &self,
        document: &NewMasterDocument,
    ) -> Result<MasterDocument, MasterDocumentRepositoryError>;

    /// Documents of one emne, most recently updated first
    async fn list_by_emne(
        &self,
        emne_id: Uuid,
    ) -> Result<Vec<MasterDocument>, MasterDocumentRepositoryError>;
}

#[derive(thiserror::Error)]
pub enum MasterDocumentRepositoryError {
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl std::fmt::Debug for MasterDocumentRepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
