use async_trait::async_trait;
use crate::types::{AnalysisResult, Article, FinalReport, SentimentItem};
use crate::Result;

/// The model-backed half of a run: relevance filtering, scoring and synthesis.
#[async_trait]
pub trait StockAnalyzer: Send + Sync {
    /// Select the `count` article texts most relevant to `ticker`
    async fn filter_relevant(&self, ticker: &str, articles: &[Article], count: usize) -> Result<Vec<String>>;

    /// Score every text; individual failures end up in `AnalysisResult::errors`
    async fn analyze(&self, ticker: &str, texts: Vec<String>) -> Result<AnalysisResult>;

    /// Merge scored items into one recommendation
    async fn synthesize(&self, ticker: &str, items: &[SentimentItem]) -> Result<FinalReport>;
}
