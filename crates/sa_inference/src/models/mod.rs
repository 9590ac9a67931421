use std::sync::Arc;
use sa_core::{InferenceModel, Result};
use tracing::info;

use crate::{Config, ModelKind};

pub mod gemini;
pub mod offline;

pub use gemini::GeminiModel;
pub use offline::OfflineModel;

pub fn create_model(config: &Config) -> Result<Arc<dyn InferenceModel>> {
    let model: Arc<dyn InferenceModel> = match config.kind {
        ModelKind::Gemini => Arc::new(GeminiModel::new(config.api_key.clone())?),
        ModelKind::Offline => Arc::new(OfflineModel::new()),
    };
    info!("🤖 Using {} model", model.name());
    Ok(model)
}
