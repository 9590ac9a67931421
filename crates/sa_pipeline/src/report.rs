use sa_core::{FinalReport, SentimentItem};
use std::fmt::{self, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentimentBand {
    StrongBullish,
    NeutralMixed,
    Bearish,
}

impl SentimentBand {
    /// `>= 7.0` strong bullish, `[6.0, 7.0)` neutral/mixed, below 6.0 bearish.
    pub fn classify(average: f64) -> Self {
        if average >= 7.0 {
            SentimentBand::StrongBullish
        } else if average >= 6.0 {
            SentimentBand::NeutralMixed
        } else {
            SentimentBand::Bearish
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SentimentBand::StrongBullish => "Strong Bullish (High Greed)",
            SentimentBand::NeutralMixed => "Neutral/Mixed (Uncertainty)",
            SentimentBand::Bearish => "Bearish (High Fear)",
        }
    }
}

impl fmt::Display for SentimentBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Score summary over one run's scored items.
#[derive(Debug, Clone, PartialEq)]
pub struct SentimentIndex {
    pub ticker: String,
    pub article_count: usize,
    pub average: f64,
    pub band: SentimentBand,
    pub most_positive: SentimentItem,
    pub most_negative: SentimentItem,
}

impl SentimentIndex {
    /// `None` when there is nothing to summarize.
    pub fn from_items(ticker: &str, items: &[SentimentItem]) -> Option<Self> {
        // first item wins ties on both ends
        let most_positive = items
            .iter()
            .reduce(|best, item| if item.sentiment_score > best.sentiment_score { item } else { best })?;
        let most_negative = items
            .iter()
            .reduce(|worst, item| if item.sentiment_score < worst.sentiment_score { item } else { worst })?;

        let total: u32 = items.iter().map(|item| u32::from(item.sentiment_score)).sum();
        let average = f64::from(total) / items.len() as f64;

        Some(Self {
            ticker: ticker.to_string(),
            article_count: items.len(),
            average,
            band: SentimentBand::classify(average),
            most_positive: most_positive.clone(),
            most_negative: most_negative.clone(),
        })
    }
}

fn write_item(out: &mut String, title: &str, item: &SentimentItem) -> fmt::Result {
    writeln!(out, "\n{}", title)?;
    writeln!(out, "  Score:    {}/10", item.sentiment_score)?;
    writeln!(out, "  Category: {}", item.sentiment_category)?;
    writeln!(out, "  Headline: {}", item.headline)?;
    writeln!(out, "  Reason:   {}", item.impact_reason)
}

impl fmt::Display for SentimentIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(60);
        let mut out = String::new();
        writeln!(out, "{}", rule)?;
        writeln!(
            out,
            "📊 FINAL SENTIMENT INDEX FOR {} (Based on {} Articles)",
            self.ticker, self.article_count
        )?;
        writeln!(out, "{}", rule)?;
        writeln!(out, "Overall Average Score: {:.2} / 10.00", self.average)?;
        writeln!(out, "Overall Sentiment: {}", self.band)?;
        write_item(&mut out, "⭐ Most Positive News", &self.most_positive)?;
        write_item(&mut out, "🔻 Most Negative News", &self.most_negative)?;
        write!(out, "{}", rule)?;
        f.write_str(&out)
    }
}

/// Human-readable rendering of the final recommendation.
pub fn render_report(ticker: &str, report: &FinalReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "🏦 INVESTMENT REPORT: {}", ticker);
    let _ = writeln!(out, "Sentiment:      {}", report.final_sentiment);
    let _ = writeln!(out, "Recommendation: {}", report.recommendation);
    let _ = writeln!(out, "\n{}", report.overall_summary);
    if !report.major_risks.is_empty() {
        let _ = writeln!(out, "\nMajor risks:");
        for risk in &report.major_risks {
            let _ = writeln!(out, "  - {}", risk);
        }
    }
    out
}
