use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::{
    domain::{
        entities::{
            generation_mode::GenerationMode,
            master_document::{MasterDocument, NewMasterDocument},
        },
        services::prompt_builder::{build_prompt, document_title},
    },
    helper::error_chain_fmt,
    ports::{
        completion_port::{CompletionError, CompletionPort, CompletionRequest, TokenUsage},
        contribution_repository::{ContributionRepository, ContributionRepositoryError},
        emne_repository::{EmneRepository, EmneRepositoryError},
        master_document_repository::{MasterDocumentRepository, MasterDocumentRepositoryError},
    },
};

/// Upper bound on the number of contributions fed into one prompt,
/// newest first, to keep prompt size predictable
pub const MAX_SOURCE_CONTRIBUTIONS: usize = 20;

/// `ai_prompt` value persisted when the caller gave no instruction override
const DEFAULT_AI_PROMPT_MARKER: &str = "Standard generering";

#[derive(Debug, Clone)]
pub struct SynthesizeDocumentRequest {
    pub emne_id: Uuid,
    /// Wire-level mode string, validated against the closed mode set
    pub mode: String,
    pub instruction: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SynthesizeDocumentResponse {
    pub document: MasterDocument,
    /// Token counts exactly as reported by the generation provider
    pub usage: TokenUsage,
}

/// The synthesis pipeline entry point.
///
/// Coordinates contribution retrieval, prompt construction, the generation
/// call and persistence into one operation that looks atomic to the caller:
/// the single document insert happens only after a successful, non-empty
/// generation, so no partial or placeholder documents are ever written.
/// Every failure is terminal for the invocation, nothing is retried.
pub struct SynthesizeDocumentUseCase {
    emne_repository: Arc<dyn EmneRepository>,
    contribution_repository: Arc<dyn ContributionRepository>,
    master_document_repository: Arc<dyn MasterDocumentRepository>,
    completion_port: Arc<dyn CompletionPort>,
}

impl SynthesizeDocumentUseCase {
    pub fn new(
        emne_repository: Arc<dyn EmneRepository>,
        contribution_repository: Arc<dyn ContributionRepository>,
        master_document_repository: Arc<dyn MasterDocumentRepository>,
        completion_port: Arc<dyn CompletionPort>,
    ) -> Self {
        Self {
            emne_repository,
            contribution_repository,
            master_document_repository,
            completion_port,
        }
    }

    #[tracing::instrument(
        name = "Synthesizing master document",
        skip(self, request),
        fields(emne_id = %request.emne_id, mode = %request.mode)
    )]
    pub async fn execute(
        &self,
        request: SynthesizeDocumentRequest,
    ) -> Result<SynthesizeDocumentResponse, SynthesizeDocumentError> {
        // Mode is validated before touching any collaborator
        let mode = GenerationMode::parse(&request.mode)
            .map_err(|_| SynthesizeDocumentError::InvalidMode(request.mode.clone()))?;

        let emne = self
            .emne_repository
            .fetch(request.emne_id)
            .await
            .map_err(|error| match error {
                EmneRepositoryError::NotFound(emne_id) => {
                    SynthesizeDocumentError::EmneNotFound(emne_id)
                }
                EmneRepositoryError::Internal(error) => SynthesizeDocumentError::Internal(error),
            })?;

        // An emne without contributions is valid input: the prompt builder
        // degrades to its mode-agnostic default instruction
        let contributions = self
            .contribution_repository
            .fetch_recent(request.emne_id, MAX_SOURCE_CONTRIBUTIONS)
            .await
            .map_err(|ContributionRepositoryError::Internal(error)| {
                SynthesizeDocumentError::Internal(
                    error.context("Failed to fetch the contributions of the emne"),
                )
            })?;

        info!(
            contributions_count = contributions.len(),
            "Building prompt from recent contributions"
        );

        let prompt = build_prompt(
            mode,
            &emne.title,
            emne.goals.as_deref(),
            &contributions,
            request.instruction.as_deref(),
        );

        let completion = self
            .completion_port
            .complete(&CompletionRequest {
                system_instruction: prompt.system_instruction,
                user_instruction: prompt.user_instruction,
            })
            .await?;

        if completion.text.trim().is_empty() {
            return Err(SynthesizeDocumentError::EmptyGeneration);
        }

        // Provenance: the exact ids fetched above, order preserved
        let source_contributions: Vec<Uuid> =
            contributions.iter().map(|contribution| contribution.id).collect();

        let new_document = NewMasterDocument {
            emne_id: emne.id,
            title: document_title(mode, &emne.title),
            content: completion.text,
            ai_prompt: request
                .instruction
                .unwrap_or_else(|| DEFAULT_AI_PROMPT_MARKER.to_string()),
            source_contributions,
        };

        let document = self
            .master_document_repository
            .insert(&new_document)
            .await
            .map_err(SynthesizeDocumentError::PersistenceFailed)?;

        info!(
            document_id = %document.id,
            version = document.version,
            "Master document persisted"
        );

        Ok(SynthesizeDocumentResponse {
            document,
            usage: completion.usage,
        })
    }
}

/// Failure taxonomy of one synthesis invocation.
///
/// Completion errors propagate transparently: the caller can always tell a
/// configuration problem (authentication, quota) from a transient one
/// (timeout, rate limit) from an input problem (invalid mode, empty content).
/// A persistence failure after a successful generation is surfaced
/// distinctly, so the caller can decide between re-running the generation
/// (wasting tokens) and retrying only the write.
#[derive(thiserror::Error)]
pub enum SynthesizeDocumentError {
    #[error("{0} is not a supported generation mode. Use one of: synthesize_notes, generate_questions, analyze_knowledge_gaps.")]
    InvalidMode(String),
    #[error("Emne {0} was not found")]
    EmneNotFound(Uuid),
    #[error(transparent)]
    Completion(#[from] CompletionError),
    #[error("The generation provider returned no content")]
    EmptyGeneration,
    #[error("Failed to save the generated master document")]
    PersistenceFailed(#[source] MasterDocumentRepositoryError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl std::fmt::Debug for SynthesizeDocumentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{
        contribution::{Contribution, ContributionKind},
        emne::Emne,
    };
    use crate::ports::{
        completion_port::{CompletionResponse, MockCompletionPort},
        contribution_repository::MockContributionRepository,
        emne_repository::MockEmneRepository,
        master_document_repository::MockMasterDocumentRepository,
    };
    use chrono::Utc;

    fn an_emne(title: &str) -> Emne {
        Emne {
            id: Uuid::new_v4(),
            title: title.to_string(),
            code: Some("MAT121".to_string()),
            description: None,
            semester: Some("Høst 2024".to_string()),
            goals: Some("Bestå eksamen".to_string()),
            created_by: Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn a_contribution(emne_id: Uuid, title: &str) -> Contribution {
        Contribution {
            id: Uuid::new_v4(),
            emne_id,
            meeting_id: None,
            user_id: Uuid::new_v4(),
            title: title.to_string(),
            content: "Notatinnhold".to_string(),
            kind: ContributionKind::Note,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn persisted(document: &NewMasterDocument, version: i32) -> MasterDocument {
        MasterDocument {
            id: Uuid::new_v4(),
            emne_id: document.emne_id,
            title: document.title.clone(),
            content: document.content.clone(),
            version,
            generated_at: Utc::now(),
            ai_prompt: document.ai_prompt.clone(),
            source_contributions: document.source_contributions.clone(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn a_completion(text: &str) -> CompletionResponse {
        CompletionResponse {
            text: text.to_string(),
            usage: TokenUsage {
                prompt_tokens: 120,
                completion_tokens: 350,
                total_tokens: 470,
            },
        }
    }

    fn use_case_with(
        emne_repository: MockEmneRepository,
        contribution_repository: MockContributionRepository,
        master_document_repository: MockMasterDocumentRepository,
        completion_port: MockCompletionPort,
    ) -> SynthesizeDocumentUseCase {
        SynthesizeDocumentUseCase::new(
            Arc::new(emne_repository),
            Arc::new(contribution_repository),
            Arc::new(master_document_repository),
            Arc::new(completion_port),
        )
    }

    #[tokio::test]
    async fn an_unrecognized_mode_fails_before_any_collaborator_is_called() {
        let mut completion_port = MockCompletionPort::new();
        completion_port.expect_complete().times(0);
        let mut emne_repository = MockEmneRepository::new();
        emne_repository.expect_fetch().times(0);

        let use_case = use_case_with(
            emne_repository,
            MockContributionRepository::new(),
            MockMasterDocumentRepository::new(),
            completion_port,
        );

        let result = use_case
            .execute(SynthesizeDocumentRequest {
                emne_id: Uuid::new_v4(),
                mode: "summarize".to_string(),
                instruction: None,
            })
            .await;

        match result {
            Err(SynthesizeDocumentError::InvalidMode(mode)) => assert_eq!(mode, "summarize"),
            other => panic!("Expected InvalidMode, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn a_missing_emne_is_reported_as_not_found() {
        let emne_id = Uuid::new_v4();

        let mut emne_repository = MockEmneRepository::new();
        emne_repository
            .expect_fetch()
            .returning(|emne_id| Err(EmneRepositoryError::NotFound(emne_id)));

        let use_case = use_case_with(
            emne_repository,
            MockContributionRepository::new(),
            MockMasterDocumentRepository::new(),
            MockCompletionPort::new(),
        );

        let result = use_case
            .execute(SynthesizeDocumentRequest {
                emne_id,
                mode: "synthesize_notes".to_string(),
                instruction: None,
            })
            .await;

        match result {
            Err(SynthesizeDocumentError::EmneNotFound(id)) => assert_eq!(id, emne_id),
            other => panic!("Expected EmneNotFound, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn a_successful_synthesis_persists_one_document_with_exact_provenance() {
        // Scenario: synthesize_notes, emne "Calculus I", 3 contributions
        let emne = an_emne("Calculus I");
        let emne_id = emne.id;
        let contributions = vec![
            a_contribution(emne_id, "Derivasjon"),
            a_contribution(emne_id, "Integraler"),
            a_contribution(emne_id, "Grenseverdier"),
        ];
        let expected_sources: Vec<Uuid> = contributions.iter().map(|c| c.id).collect();

        let mut emne_repository = MockEmneRepository::new();
        let fetched_emne = emne.clone();
        emne_repository
            .expect_fetch()
            .returning(move |_| Ok(fetched_emne.clone()));

        let mut contribution_repository = MockContributionRepository::new();
        let fetched_contributions = contributions.clone();
        contribution_repository
            .expect_fetch_recent()
            .withf(move |id, limit| *id == emne_id && *limit == MAX_SOURCE_CONTRIBUTIONS)
            .returning(move |_, _| Ok(fetched_contributions.clone()));

        let mut completion_port = MockCompletionPort::new();
        completion_port
            .expect_complete()
            .withf(|request| {
                request.system_instruction.contains("(emne: \"Calculus I\")")
                    && request.user_instruction.contains("## Bidrag 1: Derivasjon (note)")
            })
            .returning(|_| Ok(a_completion("# Masterdokument\n\nInnhold ...")));

        let mut master_document_repository = MockMasterDocumentRepository::new();
        let sources_seen_by_store = expected_sources.clone();
        master_document_repository
            .expect_insert()
            .times(1)
            .withf(move |document| {
                document.title == "Masterdokument - Calculus I"
                    && document.source_contributions == sources_seen_by_store
                    && document.ai_prompt == "Standard generering"
            })
            .returning(|document| Ok(persisted(document, 1)));

        let use_case = use_case_with(
            emne_repository,
            contribution_repository,
            master_document_repository,
            completion_port,
        );

        let response = use_case
            .execute(SynthesizeDocumentRequest {
                emne_id,
                mode: "synthesize_notes".to_string(),
                instruction: None,
            })
            .await
            .unwrap();

        assert_eq!(response.document.title, "Masterdokument - Calculus I");
        assert!(!response.document.content.is_empty());
        assert_eq!(response.document.source_contributions, expected_sources);
        assert_eq!(response.usage.total_tokens, 470);
    }

    #[tokio::test]
    async fn empty_generation_output_is_rejected_without_persisting() {
        for blank in ["", "   \n\t  "] {
            let emne = an_emne("Calculus I");
            let emne_id = emne.id;

            let mut emne_repository = MockEmneRepository::new();
            let fetched_emne = emne.clone();
            emne_repository
                .expect_fetch()
                .returning(move |_| Ok(fetched_emne.clone()));

            let mut contribution_repository = MockContributionRepository::new();
            contribution_repository
                .expect_fetch_recent()
                .returning(|_, _| Ok(vec![]));

            let mut completion_port = MockCompletionPort::new();
            let text = blank.to_string();
            completion_port
                .expect_complete()
                .returning(move |_| Ok(a_completion(&text)));

            let mut master_document_repository = MockMasterDocumentRepository::new();
            master_document_repository.expect_insert().times(0);

            let use_case = use_case_with(
                emne_repository,
                contribution_repository,
                master_document_repository,
                completion_port,
            );

            let result = use_case
                .execute(SynthesizeDocumentRequest {
                    emne_id,
                    mode: "generate_questions".to_string(),
                    instruction: None,
                })
                .await;

            assert!(matches!(
                result,
                Err(SynthesizeDocumentError::EmptyGeneration)
            ));
        }
    }

    #[tokio::test]
    async fn a_rate_limited_provider_propagates_its_kind_and_writes_nothing() {
        let emne = an_emne("Calculus I");
        let emne_id = emne.id;

        let mut emne_repository = MockEmneRepository::new();
        let fetched_emne = emne.clone();
        emne_repository
            .expect_fetch()
            .returning(move |_| Ok(fetched_emne.clone()));

        let mut contribution_repository = MockContributionRepository::new();
        contribution_repository
            .expect_fetch_recent()
            .returning(|_, _| Ok(vec![]));

        let mut completion_port = MockCompletionPort::new();
        completion_port.expect_complete().returning(|_| {
            Err(CompletionError::RateLimitExceeded(
                "Rate limit reached".to_string(),
            ))
        });

        let mut master_document_repository = MockMasterDocumentRepository::new();
        master_document_repository.expect_insert().times(0);

        let use_case = use_case_with(
            emne_repository,
            contribution_repository,
            master_document_repository,
            completion_port,
        );

        let result = use_case
            .execute(SynthesizeDocumentRequest {
                emne_id,
                mode: "analyze_knowledge_gaps".to_string(),
                instruction: None,
            })
            .await;

        assert!(matches!(
            result,
            Err(SynthesizeDocumentError::Completion(
                CompletionError::RateLimitExceeded(_)
            ))
        ));
    }

    #[tokio::test]
    async fn the_contribution_fetch_is_capped_at_twenty() {
        // The store enforces the limit: the use case must ask for exactly the cap
        let emne = an_emne("Calculus I");
        let emne_id = emne.id;
        let contributions: Vec<Contribution> = (0..MAX_SOURCE_CONTRIBUTIONS)
            .map(|i| a_contribution(emne_id, &format!("Bidrag {}", i)))
            .collect();
        let expected_sources: Vec<Uuid> = contributions.iter().map(|c| c.id).collect();

        let mut emne_repository = MockEmneRepository::new();
        let fetched_emne = emne.clone();
        emne_repository
            .expect_fetch()
            .returning(move |_| Ok(fetched_emne.clone()));

        let mut contribution_repository = MockContributionRepository::new();
        let fetched_contributions = contributions.clone();
        contribution_repository
            .expect_fetch_recent()
            .withf(|_, limit| *limit == 20)
            .returning(move |_, _| Ok(fetched_contributions.clone()));

        let mut completion_port = MockCompletionPort::new();
        completion_port
            .expect_complete()
            .withf(|request| {
                request.user_instruction.contains("## Bidrag 20:")
                    && !request.user_instruction.contains("## Bidrag 21:")
            })
            .returning(|_| Ok(a_completion("Innhold")));

        let mut master_document_repository = MockMasterDocumentRepository::new();
        let sources_seen_by_store = expected_sources.clone();
        master_document_repository
            .expect_insert()
            .withf(move |document| document.source_contributions == sources_seen_by_store)
            .returning(|document| Ok(persisted(document, 4)));

        let use_case = use_case_with(
            emne_repository,
            contribution_repository,
            master_document_repository,
            completion_port,
        );

        let response = use_case
            .execute(SynthesizeDocumentRequest {
                emne_id,
                mode: "synthesize_notes".to_string(),
                instruction: None,
            })
            .await
            .unwrap();

        assert_eq!(
            response.document.source_contributions.len(),
            MAX_SOURCE_CONTRIBUTIONS
        );
    }

    #[tokio::test]
    async fn the_instruction_override_reaches_both_prompt_and_provenance() {
        let emne = an_emne("Calculus I");
        let emne_id = emne.id;

        let mut emne_repository = MockEmneRepository::new();
        let fetched_emne = emne.clone();
        emne_repository
            .expect_fetch()
            .returning(move |_| Ok(fetched_emne.clone()));

        let mut contribution_repository = MockContributionRepository::new();
        let contribution = a_contribution(emne_id, "Notat");
        contribution_repository
            .expect_fetch_recent()
            .returning(move |_, _| Ok(vec![contribution.clone()]));

        let mut completion_port = MockCompletionPort::new();
        completion_port
            .expect_complete()
            .withf(|request| request.user_instruction.starts_with("Fokuser på kapittel 3"))
            .returning(|_| Ok(a_completion("Innhold")));

        let mut master_document_repository = MockMasterDocumentRepository::new();
        master_document_repository
            .expect_insert()
            .withf(|document| document.ai_prompt == "Fokuser på kapittel 3")
            .returning(|document| Ok(persisted(document, 2)));

        let use_case = use_case_with(
            emne_repository,
            contribution_repository,
            master_document_repository,
            completion_port,
        );

        use_case
            .execute(SynthesizeDocumentRequest {
                emne_id,
                mode: "synthesize_notes".to_string(),
                instruction: Some("Fokuser på kapittel 3".to_string()),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn a_failed_write_is_reported_as_persistence_failure() {
        let emne = an_emne("Calculus I");
        let emne_id = emne.id;

        let mut emne_repository = MockEmneRepository::new();
        let fetched_emne = emne.clone();
        emne_repository
            .expect_fetch()
            .returning(move |_| Ok(fetched_emne.clone()));

        let mut contribution_repository = MockContributionRepository::new();
        contribution_repository
            .expect_fetch_recent()
            .returning(|_, _| Ok(vec![]));

        let mut completion_port = MockCompletionPort::new();
        completion_port
            .expect_complete()
            .returning(|_| Ok(a_completion("Innhold")));

        let mut master_document_repository = MockMasterDocumentRepository::new();
        master_document_repository.expect_insert().returning(|_| {
            Err(MasterDocumentRepositoryError::Internal(anyhow::anyhow!(
                "connection reset"
            )))
        });

        let use_case = use_case_with(
            emne_repository,
            contribution_repository,
            master_document_repository,
            completion_port,
        );

        let result = use_case
            .execute(SynthesizeDocumentRequest {
                emne_id,
                mode: "synthesize_notes".to_string(),
                instruction: None,
            })
            .await;

        assert!(matches!(
            result,
            Err(SynthesizeDocumentError::PersistenceFailed(_))
        ));
    }

    #[tokio::test]
    async fn an_emne_without_contributions_still_synthesizes() {
        let emne = an_emne("Calculus I");
        let emne_id = emne.id;

        let mut emne_repository = MockEmneRepository::new();
        let fetched_emne = emne.clone();
        emne_repository
            .expect_fetch()
            .returning(move |_| Ok(fetched_emne.clone()));

        let mut contribution_repository = MockContributionRepository::new();
        contribution_repository
            .expect_fetch_recent()
            .returning(|_, _| Ok(vec![]));

        let mut completion_port = MockCompletionPort::new();
        completion_port
            .expect_complete()
            .withf(|request| {
                request.user_instruction
                    == "Analyser emnets innhold og generer relevant informasjon."
            })
            .returning(|_| Ok(a_completion("Innhold")));

        let mut master_document_repository = MockMasterDocumentRepository::new();
        master_document_repository
            .expect_insert()
            .withf(|document| document.source_contributions.is_empty())
            .returning(|document| Ok(persisted(document, 1)));

        let use_case = use_case_with(
            emne_repository,
            contribution_repository,
            master_document_repository,
            completion_port,
        );

        let response = use_case
            .execute(SynthesizeDocumentRequest {
                emne_id,
                mode: "synthesize_notes".to_string(),
                instruction: None,
            })
            .await
            .unwrap();

        assert!(response.document.source_contributions.is_empty());
    }

    #[tokio::test]
    async fn an_infrastructure_error_on_the_emne_fetch_is_internal() {
        let mut emne_repository = MockEmneRepository::new();
        emne_repository.expect_fetch().returning(|_| {
            Err(EmneRepositoryError::Internal(anyhow::anyhow!(
                "pool timed out"
            )))
        });

        let use_case = use_case_with(
            emne_repository,
            MockContributionRepository::new(),
            MockMasterDocumentRepository::new(),
            MockCompletionPort::new(),
        );

        let result = use_case
            .execute(SynthesizeDocumentRequest {
                emne_id: Uuid::new_v4(),
                mode: "synthesize_notes".to_string(),
                instruction: None,
            })
            .await;

        assert!(matches!(result, Err(SynthesizeDocumentError::Internal(_))));
    }
}
