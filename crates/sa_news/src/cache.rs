use async_trait::async_trait;
use sa_core::{Article, NewsProvider, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Persists successful fetches as one JSON file per ticker.
///
/// A snapshot is fresh while its mtime is younger than the TTL. Cache
/// failures of any kind fall through to the inner provider.
pub struct CachedProvider<P> {
    inner: P,
    cache_dir: PathBuf,
    ttl: Duration,
}

impl<P: NewsProvider> CachedProvider<P> {
    pub fn new(inner: P, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            inner,
            cache_dir: cache_dir.into(),
            ttl: DEFAULT_CACHE_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn cache_path(&self, ticker: &str) -> PathBuf {
        let name: String = ticker
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
            .collect();
        self.cache_dir.join(format!("{}_news.json", name))
    }

    async fn load_fresh(&self, path: &Path) -> Option<Vec<Article>> {
        let modified = tokio::fs::metadata(path).await.ok()?.modified().ok()?;
        // an mtime in the future counts as brand new
        let age = modified.elapsed().unwrap_or(Duration::ZERO);
        if age >= self.ttl {
            debug!("Cache snapshot {} is stale ({}s old)", path.display(), age.as_secs());
            return None;
        }

        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("⚠️ Cache read failed for {}: {}", path.display(), e);
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(articles) => Some(articles),
            Err(e) => {
                warn!("⚠️ Cache snapshot {} is corrupt: {}", path.display(), e);
                None
            }
        }
    }

    async fn save(&self, path: &Path, articles: &[Article]) {
        if let Err(e) = self.try_save(path, articles).await {
            warn!("⚠️ Cache save failed for {}: {}", path.display(), e);
        }
    }

    async fn try_save(&self, path: &Path, articles: &[Article]) -> Result<()> {
        tokio::fs::create_dir_all(&self.cache_dir).await?;
        let json = serde_json::to_vec_pretty(articles)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }
}

#[async_trait]
impl<P: NewsProvider> NewsProvider for CachedProvider<P> {
    async fn fetch_articles(&self, ticker: &str, count: usize) -> Result<Vec<Article>> {
        let path = self.cache_path(ticker);

        if let Some(articles) = self.load_fresh(&path).await {
            info!("📦 Loaded {} {} articles from local cache", articles.len(), ticker);
            return Ok(articles);
        }

        info!("🌐 Cache miss for {}, asking inner provider", ticker);
        let articles = self.inner.fetch_articles(ticker, count).await?;
        if !articles.is_empty() {
            self.save(&path, &articles).await;
        }
        Ok(articles)
    }
}
