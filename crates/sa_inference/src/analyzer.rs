use async_trait::async_trait;
use sa_core::{AnalysisResult, Article, FinalReport, InferenceModel, Result, SentimentItem, StockAnalyzer};
use std::sync::Arc;

use crate::{RelevanceFilter, ReportSynthesizer, SentimentScorer};

/// `StockAnalyzer` backed by a single model for embedding and generation.
pub struct ModelAnalyzer {
    filter: RelevanceFilter,
    scorer: SentimentScorer,
    synthesizer: ReportSynthesizer,
}

impl ModelAnalyzer {
    pub fn new(model: Arc<dyn InferenceModel>) -> Self {
        Self {
            filter: RelevanceFilter::new(Arc::clone(&model)),
            scorer: SentimentScorer::new(Arc::clone(&model)),
            synthesizer: ReportSynthesizer::new(model),
        }
    }

    /// Bound the number of concurrent scoring calls. `None` scores every text at once.
    pub fn with_max_concurrency(mut self, max_concurrency: Option<usize>) -> Self {
        self.scorer = self.scorer.with_max_concurrency(max_concurrency);
        self
    }
}

#[async_trait]
impl StockAnalyzer for ModelAnalyzer {
    async fn filter_relevant(&self, ticker: &str, articles: &[Article], count: usize) -> Result<Vec<String>> {
        self.filter.filter(ticker, articles, count).await
    }

    async fn analyze(&self, ticker: &str, texts: Vec<String>) -> Result<AnalysisResult> {
        Ok(self.scorer.analyze(ticker, texts).await)
    }

    async fn synthesize(&self, ticker: &str, items: &[SentimentItem]) -> Result<FinalReport> {
        self.synthesizer.synthesize(ticker, items).await
    }
}
