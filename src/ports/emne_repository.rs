use async_trait::async_trait;
use uuid::Uuid;

use crate::{domain::entities::emne::Emne, helper::error_chain_fmt};

/// Read access to the emner owned by the rest of the platform
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmneRepository: Send + Sync {
    async fn fetch(&self, emne_id: Uuid) -> Result<Emne, EmneRepositoryError>;
}

#[derive(thiserror::Error)]
pub enum EmneRepositoryError {
    #[error("Emne {0} was not found")]
    NotFound(Uuid),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl std::fmt::Debug for EmneRepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
