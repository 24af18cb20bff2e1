use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use crate::coordinator::{ChannelName, CompletedGame};

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Game {0} already recorded")]
    Duplicate(uuid::Uuid),
}

/// Durable store for finished lobbies
#[async_trait]
pub trait GameRecordRepository: Send + Sync {
    async fn record_game(&self, record: &CompletedGame) -> Result<(), RecordError>;
}

/// Keeps records in memory, for development and tests
#[derive(Debug, Default)]
pub struct InMemoryGameRecordRepository {
    records: RwLock<Vec<CompletedGame>>,
}

impl InMemoryGameRecordRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<CompletedGame> {
        self.records.read().await.clone()
    }

    pub async fn records_for(&self, channel: &ChannelName) -> Vec<CompletedGame> {
        self.records
            .read()
            .await
            .iter()
            .filter(|r| &r.channel == channel)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl GameRecordRepository for InMemoryGameRecordRepository {
    async fn record_game(&self, record: &CompletedGame) -> Result<(), RecordError> {
        let mut records = self.records.write().await;
        if records.iter().any(|r| r.id == record.id) {
            return Err(RecordError::Duplicate(record.id));
        }
        records.push(record.clone());
        Ok(())
    }
}

/// PostgreSQL implementation of the record store
pub struct PostgresGameRecordRepository {
    pool: PgPool,
}

impl PostgresGameRecordRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn ensure_schema(&self) -> Result<(), RecordError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS pickup_games (
                id UUID PRIMARY KEY,
                channel TEXT NOT NULL,
                variant TEXT NOT NULL,
                map TEXT NOT NULL,
                server TEXT NOT NULL,
                roster JSONB NOT NULL,
                completed_at TIMESTAMPTZ NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| RecordError::Database(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl GameRecordRepository for PostgresGameRecordRepository {
    #[instrument(skip(self, record), fields(game_id = %record.id, channel = %record.channel))]
    async fn record_game(&self, record: &CompletedGame) -> Result<(), RecordError> {
        debug!("Recording completed game in database");

        sqlx::query(
            "INSERT INTO pickup_games (id, channel, variant, map, server, roster, completed_at) VALUES ($1, $2, $3, $4, $5, $6, $7)"
        )
        .bind(record.id)
        .bind(record.channel.as_str())
        .bind(&record.variant)
        .bind(&record.map)
        .bind(&record.server.address)
        .bind(sqlx::types::Json(&record.roster))
        .bind(record.completed_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to record game in database");
            RecordError::Database(e.to_string())
        })?;

        debug!("Game recorded successfully in database");
        Ok(())
    }
}
