use std::sync::Arc;

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::config::{AppConfig, LogStoreKind};
use crate::logs::{memory::InMemoryLogStore, repo::PgLogStore, store::LogStore};
use crate::recognition::{self, Recognizer};
use crate::storage::{S3Storage, StorageClient};

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<AppConfig>,
    pub storage: Arc<dyn StorageClient>,
    pub logs: Arc<dyn LogStore>,
    pub recognizer: Arc<dyn Recognizer>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let db = PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;

        let storage = S3Storage::connect(&config.photos).await?;
        if config.photos.create_bucket {
            storage.ensure_bucket().await?;
        }
        let storage = Arc::new(storage) as Arc<dyn StorageClient>;
        let logs: Arc<dyn LogStore> = match config.log_store {
            LogStoreKind::Postgres => Arc::new(PgLogStore::new(db.clone())),
            LogStoreKind::Memory => {
                tracing::warn!("using in-memory log store; food logs are lost on restart");
                Arc::new(InMemoryLogStore::new())
            }
        };
        let recognizer = recognition::from_config(&config.recognition)?;
        tracing::info!(provider = ?config.recognition.provider, "recognition provider configured");

        Ok(Self {
            db,
            config,
            storage,
            logs,
            recognizer,
        })
    }
}
