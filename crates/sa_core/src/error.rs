use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("News API error: {0}")]
    NewsApi(String),

    #[error("Inference error: {0}")]
    Inference(String),

    /// The model answered, but not with something we can use.
    #[error("Malformed model response: {reason}")]
    MalformedResponse { reason: String, raw: String },

    #[error("Index error: {0}")]
    Index(String),

    #[error("Statistics error: {0}")]
    Stats(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No articles found")]
    NoArticles,

    #[error("RAG returned no relevant articles")]
    NoRelevantArticles,

    #[error("Analysis failed to produce items ({} errors)", .errors.len())]
    NoAnalysisItems { errors: Vec<String> },

    #[error("External error: {0}")]
    External(#[from] anyhow::Error),
}

/// Pipeline stage at which a fatal error was first observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Fetch,
    Rag,
    Analysis,
    Synthesis,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Fetch => "FETCH",
            Stage::Rag => "RAG",
            Stage::Analysis => "ANALYSIS",
            Stage::Synthesis => "SYNTHESIS",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fatal run failure: the original error, tagged with its stage.
#[derive(Error, Debug)]
#[error("[{stage}] {source}")]
pub struct PipelineError {
    pub stage: Stage,
    #[source]
    pub source: Error,
}

impl PipelineError {
    pub fn new(stage: Stage, source: Error) -> Self {
        Self { stage, source }
    }

    /// The underlying message without the stage tag.
    pub fn message(&self) -> String {
        self.source.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_error_keeps_source_message() {
        let err = PipelineError::new(Stage::Rag, Error::NoRelevantArticles);
        assert_eq!(err.stage, Stage::Rag);
        assert_eq!(err.message(), "RAG returned no relevant articles");
        assert_eq!(err.to_string(), "[RAG] RAG returned no relevant articles");
    }

    #[test]
    fn test_no_analysis_items_counts_errors() {
        let err = Error::NoAnalysisItems {
            errors: vec!["timeout".to_string(), "bad json".to_string()],
        };
        assert_eq!(err.to_string(), "Analysis failed to produce items (2 errors)");
    }
}
