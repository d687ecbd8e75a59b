use actix_web::http::header::ContentType;
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use serde_json::json;
use uuid::Uuid;

use crate::helper::error_chain_fmt;
use crate::ports::master_document_repository::{
    MasterDocumentRepository, MasterDocumentRepositoryError,
};
use crate::repositories::master_document_postgres_repository::MasterDocumentPostgresRepository;

/// Reader surface for the generated documents of one emne,
/// most recently updated first
#[tracing::instrument(name = "List master documents", skip(master_document_repository))]
pub async fn list_documents(
    master_document_repository: web::Data<MasterDocumentPostgresRepository>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ListDocumentsError> {
    let emne_id = path.into_inner();

    let documents = master_document_repository.list_by_emne(emne_id).await?;

    Ok(HttpResponse::Ok().json(json!({ "documents": documents })))
}

#[derive(thiserror::Error)]
pub enum ListDocumentsError {
    #[error(transparent)]
    RepositoryError(#[from] MasterDocumentRepositoryError),
}

impl std::fmt::Debug for ListDocumentsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for ListDocumentsError {
    fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    #[tracing::instrument(name = "Response error from list_documents handler", skip(self), fields(error = %self))]
    fn error_response(&self) -> HttpResponse<actix_web::body::BoxBody> {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .json(json!({ "error": self.to_string() }))
    }
}
