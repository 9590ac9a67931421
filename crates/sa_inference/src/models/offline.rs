use async_trait::async_trait;
use sa_core::{
    Error, FinalReport, FinalSentiment, GenerationRequest, InferenceModel, Recommendation, Result,
    SentimentCategory, SentimentItem, MAX_SENTIMENT_SCORE, MIN_SENTIMENT_SCORE,
};
use std::fmt;

use crate::sentiment::ARTICLE_MARKER;
use crate::synthesis::DIGEST_MARKER;

pub const EMBEDDING_DIMENSION: usize = 64;

const POSITIVE_WORDS: &[&str] = &[
    "beat", "beats", "growth", "gain", "gains", "surge", "surges", "record", "rally", "profit",
    "upgrade", "upgraded", "strong", "rise", "rises", "rose", "outperform", "bullish", "soar",
    "soars", "expands", "approval", "buyback", "dividend",
];

const NEGATIVE_WORDS: &[&str] = &[
    "miss", "misses", "loss", "losses", "decline", "declines", "drop", "drops", "fell", "fall",
    "lawsuit", "probe", "downgrade", "downgraded", "weak", "cut", "cuts", "layoffs", "recall",
    "bearish", "plunge", "plunges", "slump", "fine", "delay", "worries",
];

/// Deterministic, network-free model.
///
/// Embeddings are hashed bag-of-words vectors and generation is a word-list
/// sentiment heuristic. Output is fenced like a chatty hosted model would.
pub struct OfflineModel;

impl OfflineModel {
    pub fn new() -> Self {
        Self
    }
}

impl Default for OfflineModel {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for OfflineModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OfflineModel").finish()
    }
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(|word| word.to_lowercase())
}

// FNV-1a, stable across runs and platforms
fn bucket(token: &str) -> usize {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in token.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x100000001b3);
    }
    (hash % EMBEDDING_DIMENSION as u64) as usize
}

fn embed(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; EMBEDDING_DIMENSION];
    for token in tokens(text) {
        vector[bucket(&token)] += 1.0;
    }
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter_mut().for_each(|v| *v /= norm);
    }
    vector
}

fn lexicon_counts(text: &str) -> (i32, i32) {
    tokens(text).fold((0, 0), |(pos, neg), token| {
        if POSITIVE_WORDS.contains(&token.as_str()) {
            (pos + 1, neg)
        } else if NEGATIVE_WORDS.contains(&token.as_str()) {
            (pos, neg + 1)
        } else {
            (pos, neg)
        }
    })
}

/// The part of a prompt after the last occurrence of `marker`.
fn payload<'a>(prompt: &'a str, marker: &str) -> Option<&'a str> {
    prompt.rfind(marker).map(|at| prompt[at + marker.len()..].trim())
}

fn score_article(text: &str) -> SentimentItem {
    let (positive, negative) = lexicon_counts(text);
    let raw = 5 + positive - negative;
    let score = raw.clamp(i32::from(MIN_SENTIMENT_SCORE), i32::from(MAX_SENTIMENT_SCORE)) as u8;
    let category = match score {
        6.. => SentimentCategory::Positive,
        ..=4 => SentimentCategory::Negative,
        _ => SentimentCategory::Neutral,
    };
    let headline = text.split_whitespace().take(8).collect::<Vec<_>>().join(" ");

    SentimentItem {
        headline,
        sentiment_score: score,
        sentiment_category: category,
        impact_reason: format!("Found {} positive and {} negative market cues.", positive, negative),
    }
}

/// Averages the `Score N/10` entries of a digest.
fn digest_scores(digest: &str) -> Vec<u8> {
    digest
        .lines()
        .filter_map(|line| line.trim().strip_prefix("- Score "))
        .filter_map(|rest| rest.split('/').next())
        .filter_map(|score| score.trim().parse().ok())
        .collect()
}

fn synthesize(digest: &str) -> FinalReport {
    let scores = digest_scores(digest);
    let average = if scores.is_empty() {
        5.0
    } else {
        scores.iter().map(|&s| f64::from(s)).sum::<f64>() / scores.len() as f64
    };

    let (final_sentiment, recommendation) = if average >= 6.5 {
        (FinalSentiment::Bullish, Recommendation::Buy)
    } else if average <= 4.5 {
        (FinalSentiment::Bearish, Recommendation::Sell)
    } else {
        (FinalSentiment::Neutral, Recommendation::Hold)
    };

    FinalReport {
        overall_summary: format!(
            "{} scored articles average {:.2}/10. Coverage leans {}.",
            scores.len(),
            average,
            final_sentiment.as_str().to_lowercase()
        ),
        final_sentiment,
        recommendation,
        major_risks: vec![
            "Headline sentiment can reverse on the next earnings release.".to_string(),
            "A small article sample may not represent the wider market view.".to_string(),
        ],
    }
}

fn schema_has_property(request: &GenerationRequest, property: &str) -> bool {
    request
        .response_schema
        .get("properties")
        .and_then(|props| props.get(property))
        .is_some()
}

fn fenced(json: String) -> String {
    format!("```json\n{}\n```", json)
}

#[async_trait]
impl InferenceModel for OfflineModel {
    fn name(&self) -> &str {
        "Offline"
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| embed(text)).collect())
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        Ok(embed(text))
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        if schema_has_property(request, "sentiment_score") {
            let text = payload(&request.prompt, ARTICLE_MARKER).unwrap_or(&request.prompt);
            return Ok(fenced(serde_json::to_string_pretty(&score_article(text))?));
        }
        if schema_has_property(request, "recommendation") {
            let digest = payload(&request.prompt, DIGEST_MARKER).unwrap_or(&request.prompt);
            return Ok(fenced(serde_json::to_string_pretty(&synthesize(digest))?));
        }
        Err(Error::Inference("Offline model does not support this response schema".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::{parse_final_report, parse_sentiment_item};
    use serde_json::json;

    #[tokio::test]
    async fn test_embeddings_are_deterministic_and_normalized() {
        let model = OfflineModel::new();
        let texts = vec!["Apple beats estimates".to_string(), "".to_string()];
        let vectors = model.embed_documents(&texts).await.unwrap();

        assert_eq!(vectors.len(), 2);
        assert!(vectors.iter().all(|v| v.len() == EMBEDDING_DIMENSION));
        let norm: f32 = vectors[0].iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
        assert!(vectors[1].iter().all(|&v| v == 0.0));
        assert_eq!(model.embed_query("Apple beats estimates").await.unwrap(), vectors[0]);
    }

    #[tokio::test]
    async fn test_scores_article_text_only() {
        let model = OfflineModel::new();
        let prompt = format!(
            "Rate this. Negative drop loss decline.\n{}\nShares surge after record profit and strong growth",
            ARTICLE_MARKER
        );
        let request = GenerationRequest::new(prompt, json!({"properties": {"sentiment_score": {}}}));

        let raw = model.generate(&request).await.unwrap();
        assert!(raw.starts_with("```json"));
        let item = parse_sentiment_item(&raw).unwrap();

        assert_eq!(item.sentiment_score, 10);
        assert_eq!(item.sentiment_category, SentimentCategory::Positive);
        assert_eq!(item.headline, "Shares surge after record profit and strong growth");
    }

    #[tokio::test]
    async fn test_report_follows_digest_average() {
        let model = OfflineModel::new();
        let prompt = format!(
            "Summarize.\n{}\n- Score 2/10 (NEGATIVE): bad (Source: a)\n- Score 3/10 (NEGATIVE): worse (Source: b)\n",
            DIGEST_MARKER
        );
        let request = GenerationRequest::new(prompt, json!({"properties": {"recommendation": {}}}));

        let report = parse_final_report(&model.generate(&request).await.unwrap()).unwrap();

        assert_eq!(report.final_sentiment, FinalSentiment::Bearish);
        assert_eq!(report.recommendation, Recommendation::Sell);
        assert_eq!(report.major_risks.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_schema_is_rejected() {
        let request = GenerationRequest::new("anything", json!({"type": "OBJECT"}));
        assert!(OfflineModel::new().generate(&request).await.is_err());
    }
}
