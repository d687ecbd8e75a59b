use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Row};
use uuid::Uuid;

use crate::{
    domain::entities::master_document::{MasterDocument, NewMasterDocument},
    ports::master_document_repository::{MasterDocumentRepository, MasterDocumentRepositoryError},
};

/// Repository for `MasterDocument` persisted in Postgres
pub struct MasterDocumentPostgresRepository {
    pg_pool: PgPool,
}

impl MasterDocumentPostgresRepository {
    pub fn new(pg_pool: PgPool) -> Self {
        Self { pg_pool }
    }
}

#[async_trait]
impl MasterDocumentRepository for MasterDocumentPostgresRepository {
    #[tracing::instrument(
        name = "Saving new master document in database",
        skip(self, document),
        fields(emne_id = %document.emne_id, title = %document.title)
    )]
    async fn insert(
        &self,
        document: &NewMasterDocument,
    ) -> Result<MasterDocument, MasterDocumentRepositoryError> {
        let source_contributions = serde_json::to_value(&document.source_contributions)
            .context("Failed to serialize source contribution ids")?;

        // The next version for the emne is computed inside the insert itself,
        // documents are append-only and never updated in place.
        let row = sqlx::query(
            r#"
    INSERT INTO master_documents (emne_id, title, content, version, ai_prompt, source_contributions)
    VALUES ($1, $2, $3, (SELECT COALESCE(MAX(version), 0) + 1 FROM master_documents WHERE emne_id = $1), $4, $5)
    RETURNING id, emne_id, title, content, version, generated_at, ai_prompt, source_contributions, created_at, updated_at
            "#,
        )
        .bind(document.emne_id)
        .bind(&document.title)
        .bind(&document.content)
        .bind(&document.ai_prompt)
        .bind(source_contributions)
        .fetch_one(&self.pg_pool)
        .await
        .context("Failed to insert master document")?;

        master_document_from_row(&row)
    }

    #[tracing::instrument(name = "Listing master documents from database", skip(self))]
    async fn list_by_emne(
        &self,
        emne_id: Uuid,
    ) -> Result<Vec<MasterDocument>, MasterDocumentRepositoryError> {
        let rows = sqlx::query(
            r#"
    SELECT id, emne_id, title, content, version, generated_at, ai_prompt, source_contributions, created_at, updated_at
    FROM master_documents
    WHERE emne_id = $1
    ORDER BY updated_at DESC
            "#,
        )
        .bind(emne_id)
        .fetch_all(&self.pg_pool)
        .await
        .context("Failed to list master documents")?;

        rows.iter().map(master_document_from_row).collect()
    }
}

fn master_document_from_row(row: &PgRow) -> Result<MasterDocument, MasterDocumentRepositoryError> {
    let source_contributions: serde_json::Value = row
        .try_get("source_contributions")
        .context("Failed to decode master_documents.source_contributions")?;
    let source_contributions: Vec<Uuid> = serde_json::from_value(source_contributions)
        .context("Stored source contribution ids are not a list of uuids")?;

    let document = MasterDocument {
        id: row.try_get("id").context("Failed to decode master_documents.id")?,
        emne_id: row
            .try_get("emne_id")
            .context("Failed to decode master_documents.emne_id")?,
        title: row
            .try_get("title")
            .context("Failed to decode master_documents.title")?,
        content: row
            .try_get("content")
            .context("Failed to decode master_documents.content")?,
        version: row
            .try_get("version")
            .context("Failed to decode master_documents.version")?,
        generated_at: row
            .try_get("generated_at")
            .context("Failed to decode master_documents.generated_at")?,
        ai_prompt: row
            .try_get("ai_prompt")
            .context("Failed to decode master_documents.ai_prompt")?,
        source_contributions,
        created_at: row
            .try_get("created_at")
            .context("Failed to decode master_documents.created_at")?,
        updated_at: row
            .try_get("updated_at")
            .context("Failed to decode master_documents.updated_at")?,
    };

    Ok(document)
}
