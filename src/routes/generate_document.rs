use actix_web::http::header::ContentType;
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::helper::error_chain_fmt;
use crate::ports::completion_port::CompletionError;
use crate::use_cases::synthesize_document::{
    SynthesizeDocumentError, SynthesizeDocumentRequest, SynthesizeDocumentUseCase,
};

#[derive(Debug, serde::Deserialize, serde::Serialize)]
pub struct GenerateDocumentBodyData {
    pub emne_id: Uuid,
    pub mode: String,
    pub instruction: Option<String>,
}

/// Triggers one synthesis invocation for an emne.
///
/// The handler is a thin layer: validation, orchestration and persistence
/// all live in the use case. Authorization (emne membership) is the
/// responsibility of the gateway in front of this service.
#[tracing::instrument(
    name = "Generate master document",
    skip(synthesize_document_use_case, body),
    fields(emne_id = %body.emne_id, mode = %body.mode)
)]
pub async fn generate_document(
    synthesize_document_use_case: web::Data<SynthesizeDocumentUseCase>,
    body: web::Json<GenerateDocumentBodyData>,
) -> Result<HttpResponse, GenerateDocumentError> {
    info!("Received master document generation request");

    let response = synthesize_document_use_case
        .execute(SynthesizeDocumentRequest {
            emne_id: body.emne_id,
            mode: body.mode.clone(),
            instruction: body.instruction.clone(),
        })
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "document_id": response.document.id,
        "document": response.document,
        "usage": response.usage,
    })))
}

#[derive(thiserror::Error)]
pub enum GenerateDocumentError {
    #[error(transparent)]
    SynthesisError(#[from] SynthesizeDocumentError),
}

impl std::fmt::Debug for GenerateDocumentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for GenerateDocumentError {
    fn status_code(&self) -> StatusCode {
        let GenerateDocumentError::SynthesisError(error) = self;

        match error {
            SynthesizeDocumentError::InvalidMode(_) => StatusCode::BAD_REQUEST,
            SynthesizeDocumentError::EmneNotFound(_) => StatusCode::NOT_FOUND,
            // Transient provider conditions: the caller may try again later
            SynthesizeDocumentError::Completion(
                CompletionError::RateLimitExceeded(_) | CompletionError::Timeout(_),
            ) => StatusCode::SERVICE_UNAVAILABLE,
            // Configuration problems (credentials, quota) and everything else
            SynthesizeDocumentError::Completion(_)
            | SynthesizeDocumentError::EmptyGeneration
            | SynthesizeDocumentError::PersistenceFailed(_)
            | SynthesizeDocumentError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    #[tracing::instrument(name = "Response error from generate_document handler", skip(self), fields(error = %self))]
    fn error_response(&self) -> HttpResponse<actix_web::body::BoxBody> {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .json(json!({ "error": self.to_string() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_error_kind_keeps_its_own_status_code() {
        let cases = [
            (
                GenerateDocumentError::SynthesisError(SynthesizeDocumentError::InvalidMode(
                    "summarize".to_string(),
                )),
                StatusCode::BAD_REQUEST,
            ),
            (
                GenerateDocumentError::SynthesisError(SynthesizeDocumentError::EmneNotFound(
                    Uuid::new_v4(),
                )),
                StatusCode::NOT_FOUND,
            ),
            (
                GenerateDocumentError::SynthesisError(SynthesizeDocumentError::Completion(
                    CompletionError::RateLimitExceeded("slow down".to_string()),
                )),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                GenerateDocumentError::SynthesisError(SynthesizeDocumentError::Completion(
                    CompletionError::Timeout(60),
                )),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                GenerateDocumentError::SynthesisError(SynthesizeDocumentError::Completion(
                    CompletionError::Authentication("bad key".to_string()),
                )),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                GenerateDocumentError::SynthesisError(SynthesizeDocumentError::EmptyGeneration),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.status_code(), expected, "for error: {}", error);
        }
    }
}
