pub mod api;
pub mod core;
pub mod db;
pub mod ocr;
pub mod pipeline;
pub mod providers;
pub mod storage;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::{
    core::{config::Settings, errors::AppResult},
    db::Database,
    pipeline::OcrPipeline,
    providers::{replicate::ReplicateClient, textract::TextractAnalyzer},
    storage::{ObjectStorage, S3ObjectStorage},
};

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub storage: Arc<dyn ObjectStorage>,
    pub pipeline: OcrPipeline,
    pub settings: Settings,
}

impl AppState {
    /// Wires the real collaborators: SQLite, S3, Textract, Replicate.
    pub async fn from_settings(settings: Settings) -> AppResult<Self> {
        let data_dir = db::default_data_dir(settings.data_dir.clone())?;
        let db = Database::new(&data_dir).await?;
        let storage: Arc<dyn ObjectStorage> = Arc::new(S3ObjectStorage::new(&settings));
        let analyzer = Arc::new(TextractAnalyzer::new(&settings));
        let model = Arc::new(ReplicateClient::new(
            settings.replicate_model.clone(),
            settings.replicate_api_token.clone(),
        )?);
        let pipeline = OcrPipeline::new(analyzer, model);
        Ok(Self {
            db,
            storage,
            pipeline,
            settings,
        })
    }
}

/// Global subscriber honoring `FORMLIFT_LOG` (default `info`).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env("FORMLIFT_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
