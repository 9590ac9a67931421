use sa_pipeline::{Pipeline, Settings};
use std::sync::Arc;

/// Built once at startup and shared by every request.
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub articles_to_fetch: usize,
    pub articles_to_inference: usize,
}

impl AppState {
    pub fn new(pipeline: Arc<Pipeline>, articles_to_fetch: usize, articles_to_inference: usize) -> Self {
        Self {
            pipeline,
            articles_to_fetch,
            articles_to_inference,
        }
    }

    pub fn from_settings(settings: &Settings) -> sa_core::Result<Self> {
        let pipeline = Pipeline::from_settings(settings)?;
        Ok(Self::new(
            Arc::new(pipeline),
            settings.articles_to_fetch,
            settings.articles_to_inference,
        ))
    }
}
