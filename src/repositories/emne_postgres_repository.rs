use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Row};
use uuid::Uuid;

use crate::{
    domain::entities::emne::Emne,
    ports::emne_repository::{EmneRepository, EmneRepositoryError},
};

/// Repository for `Emne` persisted in Postgres
pub struct EmnePostgresRepository {
    pg_pool: PgPool,
}

impl EmnePostgresRepository {
    pub fn new(pg_pool: PgPool) -> Self {
        Self { pg_pool }
    }
}

#[async_trait]
impl EmneRepository for EmnePostgresRepository {
    #[tracing::instrument(name = "Fetching emne from database", skip(self))]
    async fn fetch(&self, emne_id: Uuid) -> Result<Emne, EmneRepositoryError> {
        let row = sqlx::query(
            r#"
    SELECT id, title, code, description, semester, goals, created_by, created_at, updated_at
    FROM emne
    WHERE id = $1
            "#,
        )
        .bind(emne_id)
        .fetch_optional(&self.pg_pool)
        .await
        .context("Failed to fetch emne")?;

        match row {
            Some(row) => Ok(emne_from_row(&row)?),
            None => Err(EmneRepositoryError::NotFound(emne_id)),
        }
    }
}

fn emne_from_row(row: &PgRow) -> Result<Emne, EmneRepositoryError> {
    let emne = Emne {
        id: row.try_get("id").context("Failed to decode emne.id")?,
        title: row.try_get("title").context("Failed to decode emne.title")?,
        code: row.try_get("code").context("Failed to decode emne.code")?,
        description: row
            .try_get("description")
            .context("Failed to decode emne.description")?,
        semester: row
            .try_get("semester")
            .context("Failed to decode emne.semester")?,
        goals: row.try_get("goals").context("Failed to decode emne.goals")?,
        created_by: row
            .try_get("created_by")
            .context("Failed to decode emne.created_by")?,
        created_at: row
            .try_get("created_at")
            .context("Failed to decode emne.created_at")?,
        updated_at: row
            .try_get("updated_at")
            .context("Failed to decode emne.updated_at")?,
    };

    Ok(emne)
}
