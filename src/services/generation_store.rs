// Generation record access
// The orchestrator only reads records and moves their status

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use thiserror::Error;
use uuid::Uuid;

use crate::db::DieselPool;
use crate::models::generation::{GenerationRecord, GenerationRow, GenerationStatus};
use crate::schema::generations;

#[derive(Debug, Error)]
pub enum GenerationStoreError {
    #[error("Generation {0} not found")]
    NotFound(Uuid),

    #[error("Generation store error: {0}")]
    Store(String),
}

impl From<diesel::result::Error> for GenerationStoreError {
    fn from(error: diesel::result::Error) -> Self {
        GenerationStoreError::Store(error.to_string())
    }
}

#[async_trait]
pub trait GenerationStore: Send + Sync {
    async fn find(&self, id: Uuid) -> Result<GenerationRecord, GenerationStoreError>;

    /// Move a record to `status`, optionally recording the result image
    async fn set_status(
        &self,
        id: Uuid,
        status: GenerationStatus,
        image_url: Option<&str>,
    ) -> Result<(), GenerationStoreError>;

    /// Bind the provider job that will produce this record's image
    async fn attach_task(&self, id: Uuid, task_id: &str) -> Result<(), GenerationStoreError>;
}

/// PostgreSQL-backed generation records
pub struct DieselGenerationStore {
    pool: DieselPool,
}

impl DieselGenerationStore {
    pub fn new(pool: DieselPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GenerationStore for DieselGenerationStore {
    async fn find(&self, id: Uuid) -> Result<GenerationRecord, GenerationStoreError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| GenerationStoreError::Store(e.to_string()))?;

        let row = generations::table
            .find(id)
            .select(GenerationRow::as_select())
            .first(&mut conn)
            .await
            .optional()?
            .ok_or(GenerationStoreError::NotFound(id))?;

        GenerationRecord::try_from(row).map_err(GenerationStoreError::Store)
    }

    async fn set_status(
        &self,
        id: Uuid,
        status: GenerationStatus,
        image_url: Option<&str>,
    ) -> Result<(), GenerationStoreError> {
        use generations::dsl;

        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| GenerationStoreError::Store(e.to_string()))?;

        let target = dsl::generations.filter(dsl::id.eq(id));
        let now = Utc::now();

        let updated = match image_url {
            Some(url) => {
                diesel::update(target)
                    .set((
                        dsl::status.eq(status.as_str()),
                        dsl::image_url.eq(url),
                        dsl::updated_at.eq(now),
                    ))
                    .execute(&mut conn)
                    .await?
            },
            None => {
                diesel::update(target)
                    .set((dsl::status.eq(status.as_str()), dsl::updated_at.eq(now)))
                    .execute(&mut conn)
                    .await?
            },
        };

        if updated == 0 {
            return Err(GenerationStoreError::NotFound(id));
        }
        Ok(())
    }

    async fn attach_task(&self, id: Uuid, task_id: &str) -> Result<(), GenerationStoreError> {
        use generations::dsl;

        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| GenerationStoreError::Store(e.to_string()))?;

        let updated = diesel::update(dsl::generations.filter(dsl::id.eq(id)))
            .set((dsl::task_id.eq(task_id), dsl::updated_at.eq(Utc::now())))
            .execute(&mut conn)
            .await?;

        if updated == 0 {
            return Err(GenerationStoreError::NotFound(id));
        }
        Ok(())
    }
}
