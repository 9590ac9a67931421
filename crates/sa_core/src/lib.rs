pub mod analyzer;
pub mod error;
pub mod models;
pub mod news;
pub mod types;

pub use analyzer::StockAnalyzer;
pub use error::{Error, PipelineError, Stage};
pub use models::{GenerationRequest, InferenceModel};
pub use news::{NewsProvider, RetryObserver};
pub use types::*;

pub type Result<T> = std::result::Result<T, Error>;

pub mod prelude {
    pub use super::{
        AnalysisResult, Article, Error, FinalReport, NewsProvider, PipelineError, Result,
        SentimentItem, Stage, StockAnalyzer,
    };
}
