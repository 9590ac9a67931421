use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    #[serde(default)]
    pub author: Option<String>,
    pub title: String,
    pub content: String,
}

impl Article {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            author: None,
            title: title.into(),
            content: content.into(),
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Only articles with both a title and a body make it into a run.
    pub fn is_usable(&self) -> bool {
        !self.title.trim().is_empty() && !self.content.trim().is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SentimentCategory {
    Positive,
    Negative,
    Neutral,
}

impl SentimentCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentCategory::Positive => "POSITIVE",
            SentimentCategory::Negative => "NEGATIVE",
            SentimentCategory::Neutral => "NEUTRAL",
        }
    }
}

impl fmt::Display for SentimentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sentiment of one article as scored by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentItem {
    pub headline: String,
    /// 1 (extremely negative) to 10 (extremely positive).
    pub sentiment_score: u8,
    pub sentiment_category: SentimentCategory,
    pub impact_reason: String,
}

pub const MIN_SENTIMENT_SCORE: u8 = 1;
pub const MAX_SENTIMENT_SCORE: u8 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub ticker: String,
    pub analysis_date: NaiveDate,
    pub news_items: Vec<SentimentItem>,
    pub errors: Vec<String>,
    pub errors_count: usize,
}

impl AnalysisResult {
    pub fn new(ticker: impl Into<String>, analysis_date: NaiveDate) -> Self {
        Self {
            ticker: ticker.into(),
            analysis_date,
            news_items: Vec::new(),
            errors: Vec::new(),
            errors_count: 0,
        }
    }

    pub fn push_item(&mut self, item: SentimentItem) {
        self.news_items.push(item);
    }

    pub fn push_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
        self.errors_count = self.errors.len();
    }

    /// Partial failure is fine as long as something was scored.
    pub fn is_usable(&self) -> bool {
        !self.news_items.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinalSentiment {
    Bullish,
    Neutral,
    Bearish,
}

impl FinalSentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            FinalSentiment::Bullish => "Bullish",
            FinalSentiment::Neutral => "Neutral",
            FinalSentiment::Bearish => "Bearish",
        }
    }
}

impl fmt::Display for FinalSentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Recommendation {
    Buy,
    Hold,
    Sell,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::Buy => "BUY",
            Recommendation::Hold => "HOLD",
            Recommendation::Sell => "SELL",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal artifact of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalReport {
    pub overall_summary: String,
    pub final_sentiment: FinalSentiment,
    pub recommendation: Recommendation,
    #[serde(default)]
    pub major_risks: Vec<String>,
}
