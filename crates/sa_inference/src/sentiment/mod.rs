use chrono::Local;
use futures::stream::{FuturesUnordered, StreamExt};
use sa_core::{AnalysisResult, GenerationRequest, InferenceModel, SentimentItem};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::parse::parse_sentiment_item;

/// Precedes the article text in a scoring prompt.
pub const ARTICLE_MARKER: &str = "ARTICLE TO ANALYZE:";

pub const SCORING_MAX_OUTPUT_TOKENS: u32 = 1024;

pub fn sentiment_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "headline": {"type": "STRING"},
            "sentiment_score": {"type": "INTEGER"},
            "sentiment_category": {"type": "STRING", "enum": ["POSITIVE", "NEGATIVE", "NEUTRAL"]},
            "impact_reason": {"type": "STRING"}
        },
        "required": ["headline", "sentiment_score", "sentiment_category", "impact_reason"]
    })
}

pub fn sentiment_prompt(ticker: &str, text: &str) -> String {
    format!(
        "You are a senior capital markets analyst. Assess how the news below affects the stock of {ticker}.\n\
         \n\
         Rules:\n\
         1. Respond with a single JSON object and nothing else.\n\
         2. sentiment_score is an integer from 1 (extremely negative for the price) to 10 (extremely positive).\n\
         3. sentiment_category is POSITIVE, NEGATIVE or NEUTRAL and must agree with the score.\n\
         4. headline is a short title for the news.\n\
         5. impact_reason explains the expected price impact in at most 20 words.\n\
         \n\
         {marker}\n\
         {text}",
        ticker = ticker,
        marker = ARTICLE_MARKER,
        text = text
    )
}

/// Result of one scoring task. Failures are values, never panics across the join.
#[derive(Debug)]
pub enum ScoreOutcome {
    Scored(SentimentItem),
    Failed { message: String, raw: Option<String> },
}

fn preview(text: &str) -> String {
    let mut preview: String = text.chars().take(60).collect();
    if text.chars().count() > 60 {
        preview.push_str("...");
    }
    preview
}

pub async fn score_article(model: &dyn InferenceModel, ticker: &str, text: &str) -> ScoreOutcome {
    let request = GenerationRequest::new(sentiment_prompt(ticker, text), sentiment_schema())
        .with_max_output_tokens(SCORING_MAX_OUTPUT_TOKENS);

    let raw = match model.generate(&request).await {
        Ok(raw) => raw,
        Err(e) => {
            return ScoreOutcome::Failed {
                message: format!("Sentiment analysis failed for '{}': {}", preview(text), e),
                raw: None,
            }
        }
    };

    match parse_sentiment_item(&raw) {
        Ok(item) => ScoreOutcome::Scored(item),
        Err(e) => ScoreOutcome::Failed {
            message: format!("Sentiment analysis failed for '{}': {}", preview(text), e),
            raw: Some(raw),
        },
    }
}

/// Scores every text concurrently, one task per text.
///
/// Without a cap every task runs at once; `with_max_concurrency` bounds the
/// number of model calls in flight.
pub struct SentimentScorer {
    model: Arc<dyn InferenceModel>,
    max_concurrency: Option<usize>,
}

impl SentimentScorer {
    pub fn new(model: Arc<dyn InferenceModel>) -> Self {
        Self {
            model,
            max_concurrency: None,
        }
    }

    pub fn with_max_concurrency(mut self, max_concurrency: Option<usize>) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    pub async fn analyze(&self, ticker: &str, texts: Vec<String>) -> AnalysisResult {
        let total = texts.len();
        info!("🧠 Scoring {} articles for {} with {}", total, ticker, self.model.name());

        let limit = self.max_concurrency.unwrap_or(total).clamp(1, total.max(1));
        debug!("Scoring pool size {}", limit);
        let permits = Arc::new(Semaphore::new(limit));
        let tasks: FuturesUnordered<_> = texts
            .into_iter()
            .map(|text| {
                let model = Arc::clone(&self.model);
                let permits = Arc::clone(&permits);
                let ticker = ticker.to_string();
                tokio::spawn(async move {
                    // the pool is never closed
                    let _permit = permits.acquire_owned().await.ok();
                    score_article(model.as_ref(), &ticker, &text).await
                })
            })
            .collect();

        // join everything, in completion order, before aggregating
        let outcomes: Vec<_> = tasks.collect().await;

        let mut result = AnalysisResult::new(ticker, Local::now().date_naive());
        for outcome in outcomes {
            match outcome {
                Ok(ScoreOutcome::Scored(item)) => result.push_item(item),
                Ok(ScoreOutcome::Failed { message, raw }) => {
                    warn!("⚠️ {}", message);
                    if let Some(raw) = raw {
                        debug!("Raw model output: {}", raw);
                    }
                    result.push_error(message);
                }
                Err(e) => {
                    warn!("⚠️ Scoring task aborted: {}", e);
                    result.push_error(format!("Scoring task aborted: {}", e));
                }
            }
        }

        info!(
            "✅ Scored {} of {} articles ({} errors)",
            result.news_items.len(),
            total,
            result.errors_count
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sa_core::{Error, Result, SentimentCategory};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Replies based on the article text: "good" scores, "garbled" returns
    /// broken JSON, "offline" errors. "slow" delays before scoring.
    #[derive(Debug, Default)]
    struct ScriptedModel {
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl InferenceModel for ScriptedModel {
        fn name(&self) -> &str {
            "Scripted"
        }

        async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![0.0]).collect())
        }

        async fn embed_query(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![0.0])
        }

        async fn generate(&self, request: &GenerationRequest) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(request.temperature, 0.0);
            assert_eq!(request.max_output_tokens, Some(SCORING_MAX_OUTPUT_TOKENS));

            let text = request.prompt.rsplit(ARTICLE_MARKER).next().unwrap_or("").trim();
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            if text.contains("slow") {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            if text.contains("garbled") {
                return Ok("```json\n{\"headline\": ".to_string());
            }
            if text.contains("offline") {
                return Err(Error::Inference("503 Service Unavailable".to_string()));
            }
            Ok(format!(
                "```json\n{{\"headline\": \"{}\", \"sentiment_score\": 8, \"sentiment_category\": \"POSITIVE\", \"impact_reason\": \"Good\"}}\n```",
                text
            ))
        }
    }

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_partial_failures_are_collected() {
        let model = Arc::new(ScriptedModel::default());
        let scorer = SentimentScorer::new(model.clone());

        let result = scorer
            .analyze("AAPL", texts(&["good one", "garbled", "good two", "offline"]))
            .await;

        assert_eq!(model.calls.load(Ordering::SeqCst), 4);
        assert_eq!(result.ticker, "AAPL");
        assert_eq!(result.news_items.len(), 2);
        assert_eq!(result.errors.len(), 2);
        assert_eq!(result.errors_count, 2);
        assert!(result.is_usable());
        assert!(result.errors.iter().any(|e| e.contains("Malformed model response")));
        assert!(result.errors.iter().any(|e| e.contains("503 Service Unavailable")));
        assert!(result.news_items.iter().all(|i| i.sentiment_category == SentimentCategory::Positive));
    }

    #[tokio::test]
    async fn test_results_arrive_in_completion_order() {
        let scorer = SentimentScorer::new(Arc::new(ScriptedModel::default()));

        let result = scorer.analyze("AAPL", texts(&["good slow", "good fast"])).await;

        let headlines: Vec<_> = result.news_items.iter().map(|i| i.headline.as_str()).collect();
        assert_eq!(headlines, vec!["good fast", "good slow"]);
    }

    #[tokio::test]
    async fn test_failures_also_arrive_in_completion_order() {
        let scorer = SentimentScorer::new(Arc::new(ScriptedModel::default()));

        let result = scorer.analyze("AAPL", texts(&["offline slow", "garbled"])).await;

        assert_eq!(result.errors_count, 2);
        assert!(result.errors[0].contains("Malformed model response"));
        assert!(result.errors[1].contains("503 Service Unavailable"));
    }

    #[tokio::test]
    async fn test_uncapped_scores_everything_at_once() {
        let model = Arc::new(ScriptedModel::default());
        let scorer = SentimentScorer::new(model.clone());

        let result = scorer.analyze("AAPL", texts(&["good slow 1", "good slow 2", "good slow 3"])).await;

        assert_eq!(result.news_items.len(), 3);
        assert_eq!(model.peak.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_concurrency_cap_is_honored() {
        let model = Arc::new(ScriptedModel::default());
        let scorer = SentimentScorer::new(model.clone()).with_max_concurrency(Some(1));

        let result = scorer.analyze("AAPL", texts(&["good slow 1", "good slow 2", "good slow 3"])).await;

        assert_eq!(result.news_items.len(), 3);
        assert_eq!(model.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_total_failure_is_not_a_panic() {
        let scorer = SentimentScorer::new(Arc::new(ScriptedModel::default()));

        let result = scorer.analyze("AAPL", texts(&["offline", "garbled"])).await;

        assert!(!result.is_usable());
        assert_eq!(result.errors_count, 2);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let scorer = SentimentScorer::new(Arc::new(ScriptedModel::default()));
        let result = scorer.analyze("AAPL", Vec::new()).await;
        assert!(result.news_items.is_empty());
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_prompt_ends_with_article() {
        let prompt = sentiment_prompt("TSLA", "Deliveries rose");
        assert!(prompt.contains("TSLA"));
        assert!(prompt.ends_with(&format!("{}\nDeliveries rose", ARTICLE_MARKER)));
        assert_eq!(sentiment_schema()["properties"]["sentiment_category"]["enum"][2], "NEUTRAL");
    }

    #[test]
    fn test_preview_truncates_long_text() {
        assert_eq!(preview("short"), "short");
        assert_eq!(preview(&"x".repeat(80)).len(), 63);
    }
}
