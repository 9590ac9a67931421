use clap::Args;
use sa_core::{Error, Result};
use sa_inference::ModelKind;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

fn positive(value: &str) -> std::result::Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("must be greater than zero".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

/// Runtime settings. Every field can come from a flag or the environment.
#[derive(Args, Clone)]
pub struct Settings {
    /// NewsAPI key
    #[arg(long, env = "NEWS_API_KEY", hide_env_values = true)]
    pub news_api_key: Option<String>,

    /// Gemini API key, required with `--model gemini`
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: Option<String>,

    #[arg(long, env = "SA_MODEL", value_enum, default_value_t = ModelKind::Gemini)]
    pub model: ModelKind,

    /// Articles requested from the news provider
    #[arg(long, env = "ARTICLES_TO_FETCH", default_value_t = 50, value_parser = positive)]
    pub articles_to_fetch: usize,

    /// Most relevant articles sent to the model for scoring
    #[arg(long, env = "ARTICLES_TO_INFERENCE", default_value_t = 5, value_parser = positive)]
    pub articles_to_inference: usize,

    #[arg(long, env = "CACHE_TTL_SECONDS", default_value_t = 3600, value_parser = clap::value_parser!(u64).range(1..))]
    pub cache_ttl_seconds: u64,

    #[arg(long, env = "SA_CACHE_DIR", default_value = "data/cache")]
    pub cache_dir: PathBuf,

    #[arg(long, env = "SA_STATS_FILE", default_value = "data/reports/run_stats.csv")]
    pub stats_file: PathBuf,

    #[arg(long, env = "SA_LOG_DIR", default_value = "data/logs")]
    pub log_dir: PathBuf,

    /// Fetch attempts before giving up
    #[arg(long, env = "SA_MAX_RETRIES", default_value_t = 3, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_retries: u32,

    #[arg(long, env = "SA_RETRY_WAIT_SECONDS", default_value_t = 2)]
    pub retry_wait_seconds: u64,

    /// Most scoring calls in flight at once (default: one per article)
    #[arg(long, env = "SA_MAX_CONCURRENCY", value_parser = positive)]
    pub max_concurrency: Option<usize>,
}

impl Settings {
    pub fn news_api_key(&self) -> Result<&str> {
        self.news_api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| Error::Config("NEWS_API_KEY is not set".to_string()))
    }

    /// Check that everything the selected model needs is present.
    pub fn validate(&self) -> Result<()> {
        self.news_api_key()?;
        if self.model == ModelKind::Gemini && self.gemini_api_key.as_deref().unwrap_or("").is_empty() {
            return Err(Error::Config("GEMINI_API_KEY is not set".to_string()));
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    pub fn retry_wait(&self) -> Duration {
        Duration::from_secs(self.retry_wait_seconds)
    }

    pub fn model_config(&self) -> sa_inference::Config {
        sa_inference::Config {
            kind: self.model,
            api_key: self.gemini_api_key.clone(),
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |key: &Option<String>| key.as_ref().map(|_| "<redacted>");
        f.debug_struct("Settings")
            .field("news_api_key", &redact(&self.news_api_key))
            .field("gemini_api_key", &redact(&self.gemini_api_key))
            .field("model", &self.model)
            .field("articles_to_fetch", &self.articles_to_fetch)
            .field("articles_to_inference", &self.articles_to_inference)
            .field("cache_ttl_seconds", &self.cache_ttl_seconds)
            .field("cache_dir", &self.cache_dir)
            .field("stats_file", &self.stats_file)
            .field("log_dir", &self.log_dir)
            .field("max_retries", &self.max_retries)
            .field("retry_wait_seconds", &self.retry_wait_seconds)
            .field("max_concurrency", &self.max_concurrency)
            .finish()
    }
}
