use async_trait::async_trait;
use std::sync::Arc;
use crate::types::Article;
use crate::Result;

#[async_trait]
pub trait NewsProvider: Send + Sync {
    /// Fetch up to `count` usable articles about `ticker`
    async fn fetch_articles(&self, ticker: &str, count: usize) -> Result<Vec<Article>>;
}

#[async_trait]
impl<T: NewsProvider + ?Sized> NewsProvider for Arc<T> {
    async fn fetch_articles(&self, ticker: &str, count: usize) -> Result<Vec<Article>> {
        (**self).fetch_articles(ticker, count).await
    }
}

#[async_trait]
impl<T: NewsProvider + ?Sized> NewsProvider for Box<T> {
    async fn fetch_articles(&self, ticker: &str, count: usize) -> Result<Vec<Article>> {
        (**self).fetch_articles(ticker, count).await
    }
}

/// Receives one observation per failed fetch attempt.
pub trait RetryObserver: Send + Sync {
    fn record_retry(&self, ticker: &str, attempt: u32);
}
