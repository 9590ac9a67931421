use sa_core::{NewsProvider, Result, RetryObserver, StockAnalyzer};
use sa_inference::{create_model, ModelAnalyzer};
use sa_news::{CachedProvider, NewsApiClient, RetryProvider};
use sa_storage::StatsLog;
use std::sync::Arc;
use tracing::info;

use crate::{Pipeline, Settings};

/// NewsAPI behind retry, behind the cache. The stats log observes retries.
pub fn build_provider(settings: &Settings, stats: Arc<StatsLog>) -> Result<Arc<dyn NewsProvider>> {
    let client = NewsApiClient::new(settings.news_api_key()?)?;
    let observer: Arc<dyn RetryObserver> = stats;
    let retrying = RetryProvider::new(client)
        .with_max_retries(settings.max_retries)
        .with_wait(settings.retry_wait())
        .with_observer(observer);
    let cached = CachedProvider::new(retrying, settings.cache_dir.clone()).with_ttl(settings.cache_ttl());
    Ok(Arc::new(cached))
}

pub fn build_analyzer(settings: &Settings) -> Result<Arc<dyn StockAnalyzer>> {
    let model = create_model(&settings.model_config())?;
    Ok(Arc::new(ModelAnalyzer::new(model).with_max_concurrency(settings.max_concurrency)))
}

impl Pipeline {
    /// Wire up the production pipeline described by `settings`.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        settings.validate()?;
        let stats = Arc::new(StatsLog::open(settings.stats_file.clone())?);
        let provider = build_provider(settings, Arc::clone(&stats))?;
        let analyzer = build_analyzer(settings)?;
        info!(
            "🔧 Pipeline ready: model={}, cache={}, stats={}",
            settings.model,
            settings.cache_dir.display(),
            settings.stats_file.display()
        );
        Ok(Pipeline::new(provider, analyzer, stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        settings: Settings,
    }

    fn settings(dir: &std::path::Path, extra: &[&str]) -> Settings {
        let cache = dir.join("cache");
        let stats = dir.join("reports/run_stats.csv");
        let mut argv = vec![
            "sa".to_string(),
            "--model".to_string(),
            "offline".to_string(),
            "--cache-dir".to_string(),
            cache.display().to_string(),
            "--stats-file".to_string(),
            stats.display().to_string(),
        ];
        argv.extend(extra.iter().map(|s| s.to_string()));
        TestCli::try_parse_from(argv).unwrap().settings
    }

    #[test]
    fn test_from_settings_creates_stats_log() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path(), &["--news-api-key", "news"]);

        let pipeline = Pipeline::from_settings(&settings).unwrap();

        assert!(pipeline.stats().path().exists());
    }

    #[test]
    fn test_missing_news_key_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = settings(dir.path(), &[]);
        settings.news_api_key = None;

        let err = Pipeline::from_settings(&settings).err().unwrap();
        assert_eq!(err.to_string(), "Configuration error: NEWS_API_KEY is not set");
    }
}
