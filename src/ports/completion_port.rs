use async_trait::async_trait;
use serde::Serialize;

use crate::helper::error_chain_fmt;

/// One text-completion call to the external generation provider.
///
/// The provider is a capability behind this port: the orchestrator never sees
/// provider-specific error shapes, only the classified `CompletionError`
/// kinds. The pipeline performs no retry, retry policy belongs to the caller
/// (a resilient decorator around this port would keep the orchestrator
/// contract unchanged).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionPort: Send + Sync {
    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, CompletionError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub system_instruction: String,
    pub user_instruction: String,
}

#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub text: String,
    pub usage: TokenUsage,
}

/// Token counts reported by the provider, surfaced unchanged to the caller
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// Classified provider failures.
///
/// Classification lets the caller distinguish configuration problems
/// (authentication, quota) from transient ones (timeout, rate limit)
/// without parsing provider messages.
#[derive(thiserror::Error)]
pub enum CompletionError {
    #[error("Invalid generation provider credentials: {0}")]
    Authentication(String),
    #[error("Generation provider rate limit exceeded: {0}")]
    RateLimitExceeded(String),
    #[error("Generation provider quota exhausted: {0}")]
    QuotaExhausted(String),
    #[error("Generation call timed out after {0} seconds")]
    Timeout(u64),
    #[error("Generation failed: {0}")]
    Failed(String),
}

impl std::fmt::Debug for CompletionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
