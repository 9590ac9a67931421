use sa_core::{FinalReport, GenerationRequest, InferenceModel, Result, SentimentItem};
use serde_json::{json, Value};
use std::fmt::Write;
use std::sync::Arc;
use tracing::info;

use crate::parse::parse_final_report;

/// Precedes the per-article digest in a synthesis prompt.
pub const DIGEST_MARKER: &str = "ANALYSIS RESULTS FROM INDIVIDUAL ARTICLES:";

pub fn report_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "overall_summary": {"type": "STRING"},
            "final_sentiment": {"type": "STRING", "enum": ["Bullish", "Neutral", "Bearish"]},
            "recommendation": {"type": "STRING", "enum": ["BUY", "HOLD", "SELL"]},
            "major_risks": {"type": "ARRAY", "items": {"type": "STRING"}}
        },
        "required": ["overall_summary", "final_sentiment", "recommendation", "major_risks"]
    })
}

/// One line per item: score, category, reason and source headline.
pub fn build_digest(items: &[SentimentItem]) -> String {
    items.iter().fold(String::new(), |mut digest, item| {
        let _ = writeln!(
            digest,
            "- Score {}/10 ({}): {} (Source: {})",
            item.sentiment_score, item.sentiment_category, item.impact_reason, item.headline
        );
        digest
    })
}

pub fn synthesis_prompt(ticker: &str, digest: &str) -> String {
    format!(
        "You are a chief investment strategist. Combine the article-level sentiment below into one view on {ticker}.\n\
         \n\
         Produce:\n\
         - overall_summary: 2-3 sentences on the overall news picture.\n\
         - final_sentiment: Bullish, Neutral or Bearish.\n\
         - recommendation: BUY, HOLD or SELL.\n\
         - major_risks: exactly 2 major risks.\n\
         Respond with a single JSON object and nothing else.\n\
         \n\
         {marker}\n\
         {digest}",
        ticker = ticker,
        marker = DIGEST_MARKER,
        digest = digest
    )
}

/// Merges scored items into a single recommendation. One call, no retry.
pub struct ReportSynthesizer {
    model: Arc<dyn InferenceModel>,
}

impl ReportSynthesizer {
    pub fn new(model: Arc<dyn InferenceModel>) -> Self {
        Self { model }
    }

    pub async fn synthesize(&self, ticker: &str, items: &[SentimentItem]) -> Result<FinalReport> {
        info!("📝 Synthesizing final report for {} from {} items", ticker, items.len());
        let request = GenerationRequest::new(synthesis_prompt(ticker, &build_digest(items)), report_schema());
        let raw = self.model.generate(&request).await?;
        parse_final_report(&raw)
    }
}
