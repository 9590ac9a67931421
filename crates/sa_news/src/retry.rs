use async_trait::async_trait;
use sa_core::{Article, NewsProvider, Result, RetryObserver};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_WAIT: Duration = Duration::from_secs(2);

/// Retries the wrapped provider with a fixed wait between attempts.
///
/// Never fails: once every attempt has errored the result is an empty list.
pub struct RetryProvider<P> {
    inner: P,
    max_retries: u32,
    wait: Duration,
    observer: Option<Arc<dyn RetryObserver>>,
}

impl<P: NewsProvider> RetryProvider<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            max_retries: DEFAULT_MAX_RETRIES,
            wait: DEFAULT_RETRY_WAIT,
            observer: None,
        }
    }

    /// Total number of attempts, at least one.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    pub fn with_wait(mut self, wait: Duration) -> Self {
        self.wait = wait;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn RetryObserver>) -> Self {
        self.observer = Some(observer);
        self
    }
}

#[async_trait]
impl<P: NewsProvider> NewsProvider for RetryProvider<P> {
    async fn fetch_articles(&self, ticker: &str, count: usize) -> Result<Vec<Article>> {
        info!("🛡️ Fetching {} news with retry protection", ticker);

        for attempt in 1..=self.max_retries {
            match self.inner.fetch_articles(ticker, count).await {
                Ok(articles) => return Ok(articles),
                Err(e) => {
                    warn!("⚠️ Fetch attempt {}/{} for {} failed: {}", attempt, self.max_retries, ticker, e);
                    if let Some(observer) = &self.observer {
                        observer.record_retry(ticker, attempt);
                    }
                    if attempt < self.max_retries {
                        tokio::time::sleep(self.wait).await;
                    }
                }
            }
        }

        error!("💀 All {} fetch attempts for {} failed", self.max_retries, ticker);
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sa_core::Error;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Fails the first `failures` calls, then returns one article.
    struct FlakyProvider {
        failures: u32,
        calls: AtomicU32,
    }

    impl FlakyProvider {
        fn new(failures: u32) -> Self {
            Self { failures, calls: AtomicU32::new(0) }
        }
    }

    #[async_trait]
    impl NewsProvider for FlakyProvider {
        async fn fetch_articles(&self, _ticker: &str, _count: usize) -> Result<Vec<Article>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.failures {
                return Err(Error::NewsApi(format!("rate limited (call {})", call)));
            }
            Ok(vec![Article::new("Recovered", "Body")])
        }
    }

    #[derive(Default)]
    struct RecordingObserver {
        attempts: Mutex<Vec<(String, u32)>>,
    }

    impl RetryObserver for RecordingObserver {
        fn record_retry(&self, ticker: &str, attempt: u32) {
            self.attempts.lock().unwrap().push((ticker.to_string(), attempt));
        }
    }

    fn provider(inner: Arc<FlakyProvider>, observer: Arc<RecordingObserver>) -> RetryProvider<Arc<FlakyProvider>> {
        RetryProvider::new(inner)
            .with_max_retries(3)
            .with_wait(Duration::from_millis(1))
            .with_observer(observer)
    }

    #[tokio::test]
    async fn test_recovers_after_two_failures() {
        let inner = Arc::new(FlakyProvider::new(2));
        let observer = Arc::new(RecordingObserver::default());

        let articles = provider(inner.clone(), observer.clone())
            .fetch_articles("AAPL", 10)
            .await
            .unwrap();

        assert_eq!(articles, vec![Article::new("Recovered", "Body")]);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            *observer.attempts.lock().unwrap(),
            vec![("AAPL".to_string(), 1), ("AAPL".to_string(), 2)]
        );
    }

    #[tokio::test]
    async fn test_exhausted_retries_yield_empty_list() {
        let inner = Arc::new(FlakyProvider::new(u32::MAX));
        let observer = Arc::new(RecordingObserver::default());

        let articles = provider(inner.clone(), observer.clone())
            .fetch_articles("AAPL", 10)
            .await
            .unwrap();

        assert!(articles.is_empty());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
        assert_eq!(observer.attempts.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_zero_retries_still_attempts_once() {
        let inner = Arc::new(FlakyProvider::new(0));
        let retry = RetryProvider::new(inner.clone()).with_max_retries(0);

        assert_eq!(retry.fetch_articles("AAPL", 1).await.unwrap().len(), 1);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }
}
