use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Row};
use uuid::Uuid;

use crate::{
    domain::entities::contribution::{Contribution, ContributionKind},
    ports::contribution_repository::{ContributionRepository, ContributionRepositoryError},
};

/// Repository for `Contribution` persisted in Postgres
pub struct ContributionPostgresRepository {
    pg_pool: PgPool,
}

impl ContributionPostgresRepository {
    pub fn new(pg_pool: PgPool) -> Self {
        Self { pg_pool }
    }
}

#[async_trait]
impl ContributionRepository for ContributionPostgresRepository {
    #[tracing::instrument(name = "Fetching recent contributions from database", skip(self))]
    async fn fetch_recent(
        &self,
        emne_id: Uuid,
        limit: usize,
    ) -> Result<Vec<Contribution>, ContributionRepositoryError> {
        let rows = sqlx::query(
            r#"
    SELECT id, emne_id, meeting_id, user_id, title, content, kind, created_at, updated_at
    FROM contributions
    WHERE emne_id = $1
    ORDER BY created_at DESC
    LIMIT $2
            "#,
        )
        .bind(emne_id)
        .bind(limit as i64)
        .fetch_all(&self.pg_pool)
        .await
        .context("Failed to fetch recent contributions")?;

        rows.iter().map(contribution_from_row).collect()
    }
}

fn contribution_from_row(row: &PgRow) -> Result<Contribution, ContributionRepositoryError> {
    let kind: String = row
        .try_get("kind")
        .context("Failed to decode contributions.kind")?;
    let kind = ContributionKind::parse(&kind)
        .map_err(anyhow::Error::new)
        .context("Stored contribution kind is not recognized")?;

    let contribution = Contribution {
        id: row.try_get("id").context("Failed to decode contributions.id")?,
        emne_id: row
            .try_get("emne_id")
            .context("Failed to decode contributions.emne_id")?,
        meeting_id: row
            .try_get("meeting_id")
            .context("Failed to decode contributions.meeting_id")?,
        user_id: row
            .try_get("user_id")
            .context("Failed to decode contributions.user_id")?,
        title: row
            .try_get("title")
            .context("Failed to decode contributions.title")?,
        content: row
            .try_get("content")
            .context("Failed to decode contributions.content")?,
        kind,
        created_at: row
            .try_get("created_at")
            .context("Failed to decode contributions.created_at")?,
        updated_at: row
            .try_get("updated_at")
            .context("Failed to decode contributions.updated_at")?,
    };

    Ok(contribution)
}
