use chrono::{DateTime, Local, NaiveDate, Utc};
use sa_core::{
    AnalysisResult, Error, FinalReport, FinalSentiment, Recommendation, Result, RetryObserver,
    SentimentCategory, Stage,
};
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, info};

pub const NOT_AVAILABLE: &str = "N/A";

pub const HEADERS: [&str; 30] = [
    "run_id",
    "run_timestamp",
    "analysis_date",
    "ticker",
    "articles_to_fetch",
    "articles_to_inference",
    "news_fetch_status",
    "articles_requested",
    "articles_returned",
    "articles_after_filter",
    "fetch_duration_sec",
    "fetch_retry_count",
    "relevant_articles_found",
    "analysis_success_count",
    "analysis_error_count",
    "analysis_duration_sec",
    "sentiment_score_avg",
    "sentiment_score_min",
    "sentiment_score_max",
    "news_items_positive_count",
    "news_items_negative_count",
    "news_items_neutral_count",
    "synthesis_duration_sec",
    "final_sentiment",
    "final_recommendation",
    "major_risks_json",
    "total_runtime_sec",
    "run_status",
    "error_stage",
    "error_message",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    InProgress,
    Ok,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::InProgress => "IN_PROGRESS",
            RunStatus::Ok => "OK",
            RunStatus::Failed => "FAILED",
        }
    }
}

/// Metrics for exactly one pipeline run; becomes one CSV row.
#[derive(Debug, Clone)]
pub struct RunStats {
    started: Instant,
    pub run_id: String,
    pub run_timestamp: DateTime<Local>,
    pub analysis_date: NaiveDate,
    pub ticker: String,
    pub articles_to_fetch: usize,
    pub articles_to_inference: usize,
    pub news_fetch_status: Option<&'static str>,
    pub articles_requested: usize,
    pub articles_returned: usize,
    pub articles_after_filter: usize,
    pub fetch_duration_sec: f64,
    pub fetch_retry_count: u32,
    pub relevant_articles_found: usize,
    pub analysis_success_count: usize,
    pub analysis_error_count: usize,
    pub analysis_duration_sec: f64,
    pub sentiment_score_avg: Option<f64>,
    pub sentiment_score_min: Option<u8>,
    pub sentiment_score_max: Option<u8>,
    pub news_items_positive_count: usize,
    pub news_items_negative_count: usize,
    pub news_items_neutral_count: usize,
    pub synthesis_duration_sec: f64,
    pub final_sentiment: Option<FinalSentiment>,
    pub final_recommendation: Option<Recommendation>,
    pub major_risks: Option<Vec<String>>,
    pub total_runtime_sec: f64,
    pub run_status: RunStatus,
    pub error_stage: Option<Stage>,
    pub error_message: Option<String>,
}

impl RunStats {
    pub fn begin(ticker: &str, articles_to_fetch: usize, articles_to_inference: usize) -> Self {
        let now = Local::now();
        Self {
            started: Instant::now(),
            run_id: format!("{}_{}", Utc::now().timestamp(), ticker),
            run_timestamp: now,
            analysis_date: now.date_naive(),
            ticker: ticker.to_string(),
            articles_to_fetch,
            articles_to_inference,
            news_fetch_status: None,
            articles_requested: 0,
            articles_returned: 0,
            articles_after_filter: 0,
            fetch_duration_sec: 0.0,
            fetch_retry_count: 0,
            relevant_articles_found: 0,
            analysis_success_count: 0,
            analysis_error_count: 0,
            analysis_duration_sec: 0.0,
            sentiment_score_avg: None,
            sentiment_score_min: None,
            sentiment_score_max: None,
            news_items_positive_count: 0,
            news_items_negative_count: 0,
            news_items_neutral_count: 0,
            synthesis_duration_sec: 0.0,
            final_sentiment: None,
            final_recommendation: None,
            major_risks: None,
            total_runtime_sec: 0.0,
            run_status: RunStatus::InProgress,
            error_stage: None,
            error_message: None,
        }
    }

    pub fn record_fetch(
        &mut self,
        requested: usize,
        returned: usize,
        after_filter: usize,
        duration: Duration,
        retries: u32,
    ) {
        self.articles_requested = requested;
        self.articles_returned = returned;
        self.articles_after_filter = after_filter;
        self.fetch_duration_sec = rounded_secs(duration);
        self.fetch_retry_count = retries;
        self.news_fetch_status = Some(if after_filter > 0 { "OK" } else { "NO_ARTICLES" });
    }

    pub fn record_fetch_error(&mut self, requested: usize, duration: Duration, retries: u32) {
        self.articles_requested = requested;
        self.fetch_duration_sec = rounded_secs(duration);
        self.fetch_retry_count = retries;
        self.news_fetch_status = Some("ERROR");
    }

    pub fn record_relevant(&mut self, found: usize) {
        self.relevant_articles_found = found;
    }

    pub fn record_analysis(&mut self, result: &AnalysisResult, duration: Duration) {
        let items = &result.news_items;
        self.analysis_duration_sec = rounded_secs(duration);
        self.analysis_success_count = items.len();
        self.analysis_error_count = result.errors_count;

        if items.is_empty() {
            return;
        }

        let total: u32 = items.iter().map(|item| u32::from(item.sentiment_score)).sum();
        let average = f64::from(total) / items.len() as f64;
        self.sentiment_score_avg = Some((average * 100.0).round() / 100.0);
        self.sentiment_score_min = items.iter().map(|item| item.sentiment_score).min();
        self.sentiment_score_max = items.iter().map(|item| item.sentiment_score).max();

        let count = |category: SentimentCategory| {
            items
                .iter()
                .filter(|item| item.sentiment_category == category)
                .count()
        };
        self.news_items_positive_count = count(SentimentCategory::Positive);
        self.news_items_negative_count = count(SentimentCategory::Negative);
        self.news_items_neutral_count = count(SentimentCategory::Neutral);
    }

    pub fn record_synthesis(&mut self, report: &FinalReport, duration: Duration) {
        self.synthesis_duration_sec = rounded_secs(duration);
        self.final_sentiment = Some(report.final_sentiment);
        self.final_recommendation = Some(report.recommendation);
        self.major_risks = Some(report.major_risks.clone());
    }

    pub fn fail(&mut self, stage: Stage, message: &str) {
        self.run_status = RunStatus::Failed;
        self.error_stage = Some(stage);
        // one CSV cell, one line
        self.error_message = Some(message.replace('\n', " | "));
    }

    /// Stamp the total runtime; an unfinished run is marked OK.
    pub fn finish(&mut self) {
        self.total_runtime_sec = rounded_secs(self.started.elapsed());
        if self.run_status == RunStatus::InProgress {
            self.run_status = RunStatus::Ok;
        }
    }

    /// Column values in `HEADERS` order.
    pub fn to_record(&self) -> Vec<String> {
        fn or_na<T: ToString>(value: Option<T>) -> String {
            value.map(|v| v.to_string()).unwrap_or_else(|| NOT_AVAILABLE.to_string())
        }
        // always keeps a decimal point: 9.0, 6.67
        fn decimal(value: f64) -> String {
            format!("{:?}", value)
        }

        let major_risks = self
            .major_risks
            .as_ref()
            .and_then(|risks| serde_json::to_string(risks).ok());

        vec![
            self.run_id.clone(),
            self.run_timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            self.analysis_date.format("%Y-%m-%d").to_string(),
            self.ticker.clone(),
            self.articles_to_fetch.to_string(),
            self.articles_to_inference.to_string(),
            or_na(self.news_fetch_status),
            self.articles_requested.to_string(),
            self.articles_returned.to_string(),
            self.articles_after_filter.to_string(),
            decimal(self.fetch_duration_sec),
            self.fetch_retry_count.to_string(),
            self.relevant_articles_found.to_string(),
            self.analysis_success_count.to_string(),
            self.analysis_error_count.to_string(),
            decimal(self.analysis_duration_sec),
            or_na(self.sentiment_score_avg.map(decimal)),
            or_na(self.sentiment_score_min),
            or_na(self.sentiment_score_max),
            self.news_items_positive_count.to_string(),
            self.news_items_negative_count.to_string(),
            self.news_items_neutral_count.to_string(),
            decimal(self.synthesis_duration_sec),
            or_na(self.final_sentiment),
            or_na(self.final_recommendation),
            or_na(major_risks),
            decimal(self.total_runtime_sec),
            self.run_status.as_str().to_string(),
            or_na(self.error_stage),
            or_na(self.error_message.clone()),
        ]
    }
}

fn rounded_secs(duration: Duration) -> f64 {
    (duration.as_secs_f64() * 1000.0).round() / 1000.0
}

/// Append-only CSV log of run statistics, one row per run.
///
/// Also collects retry observations from the news provider chain, keyed by
/// ticker, until the pipeline claims them for the run's row.
#[derive(Debug)]
pub struct StatsLog {
    path: PathBuf,
    pending_retries: Mutex<HashMap<String, u32>>,
    write_lock: Mutex<()>,
}

impl StatsLog {
    /// Open (creating if needed) the log at `path`. The header is only
    /// written when the file is new.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        if path.is_dir() {
            return Err(Error::Stats(format!("{} is a directory", path.display())));
        }
        if !path.exists() {
            let mut writer = csv::Writer::from_path(&path)?;
            writer.write_record(HEADERS)?;
            writer.flush()?;
            debug!("Created run statistics log at {}", path.display());
        }
        Ok(Self {
            path,
            pending_retries: Mutex::new(HashMap::new()),
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, stats: &RunStats) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let file = OpenOptions::new().append(true).open(&self.path)?;
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        writer.write_record(stats.to_record())?;
        writer.flush()?;
        info!("📊 Run statistics saved to {} ({})", self.path.display(), stats.run_id);
        Ok(())
    }

    /// Claim and reset the retries observed for `ticker` so far.
    pub fn take_retries(&self, ticker: &str) -> u32 {
        self.pending_retries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(ticker)
            .unwrap_or(0)
    }
}

impl RetryObserver for StatsLog {
    fn record_retry(&self, ticker: &str, attempt: u32) {
        debug!("Recording fetch retry {} for {}", attempt, ticker);
        *self
            .pending_retries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(ticker.to_string())
            .or_insert(0) += 1;
    }
}
