use std::fmt;

pub mod analyzer;
pub mod embeddings;
pub mod models;
pub mod parse;
pub mod sentiment;
pub mod synthesis;

pub use analyzer::ModelAnalyzer;
pub use embeddings::RelevanceFilter;
pub use models::create_model;
pub use sentiment::SentimentScorer;
pub use synthesis::ReportSynthesizer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ModelKind {
    Gemini,
    Offline,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::Gemini => f.write_str("gemini"),
            ModelKind::Offline => f.write_str("offline"),
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub kind: ModelKind,
    pub api_key: Option<String>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("kind", &self.kind)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            kind: ModelKind::Offline,
            api_key: None,
        }
    }
}

pub mod prelude {
    pub use super::{Config, ModelAnalyzer, ModelKind};
    pub use super::models::create_model;
    pub use sa_core::{InferenceModel, Result, Error, StockAnalyzer};
}
