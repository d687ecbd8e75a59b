use async_trait::async_trait;
use uuid::Uuid;

use crate::{domain::entities::contribution::Contribution, helper::error_chain_fmt};

/// Read access to member contributions.
///
/// The pipeline only ever asks for the most recent contributions of one emne,
/// newest first, with a bound on the result count to keep prompt size
/// predictable.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContributionRepository: Send + Sync {
    async fn fetch_recent(
        &self,
        emne_id: Uuid,
        limit: usize,
    ) -> Result<Vec<Contribution>, ContributionRepositoryError>;
}

#[derive(thiserror::Error)]
pub enum ContributionRepositoryError {
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl std::fmt::Debug for ContributionRepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
