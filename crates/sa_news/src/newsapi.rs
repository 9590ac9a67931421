use async_trait::async_trait;
use reqwest::Client;
use sa_core::{Article, Error, NewsProvider, Result};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://newsapi.org/v2/";

#[derive(Deserialize)]
struct EverythingResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    articles: Vec<RawArticle>,
}

#[derive(Deserialize)]
struct RawArticle {
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

/// NewsAPI `everything` search for recent articles about a ticker.
pub struct NewsApiClient {
    client: Client,
    api_key: String,
    base_url: Url,
}

impl NewsApiClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        let base_url = Url::parse(DEFAULT_BASE_URL)
            .map_err(|e| Error::Config(format!("Invalid NewsAPI URL: {}", e)))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url,
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Result<Self> {
        self.base_url = Url::parse(base_url)
            .map_err(|e| Error::Config(format!("Invalid NewsAPI URL {}: {}", base_url, e)))?;
        Ok(self)
    }

    fn everything_url(&self) -> Result<Url> {
        self.base_url
            .join("everything")
            .map_err(|e| Error::Config(format!("Invalid NewsAPI URL: {}", e)))
    }
}

impl fmt::Debug for NewsApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewsApiClient")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url.as_str())
            .finish()
    }
}

#[async_trait]
impl NewsProvider for NewsApiClient {
    async fn fetch_articles(&self, ticker: &str, count: usize) -> Result<Vec<Article>> {
        let query = format!("{} stock", ticker);
        let page_size = count.to_string();

        let response = self
            .client
            .get(self.everything_url()?)
            .query(&[
                ("q", query.as_str()),
                ("apiKey", self.api_key.as_str()),
                ("language", "en"),
                ("sortBy", "publishedAt"),
                ("pageSize", page_size.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json::<EverythingResponse>()
            .await?;

        let articles = usable_articles(response)?;
        debug!("NewsAPI returned {} usable articles for {}", articles.len(), ticker);
        Ok(articles)
    }
}

/// Drop everything we cannot embed: articles need a title and a body.
fn usable_articles(response: EverythingResponse) -> Result<Vec<Article>> {
    if response.status != "ok" {
        return Err(Error::NewsApi(
            response.message.unwrap_or_else(|| "Unknown error".to_string()),
        ));
    }

    Ok(response
        .articles
        .into_iter()
        .filter_map(|raw| {
            let article = Article {
                author: raw.author.filter(|a| !a.is_empty()),
                title: raw.title?,
                content: raw.content?,
            };
            article.is_usable().then_some(article)
        })
        .collect())
}
