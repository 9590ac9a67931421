pub mod cache;
pub mod newsapi;
pub mod retry;

pub use cache::CachedProvider;
pub use newsapi::NewsApiClient;
pub use retry::RetryProvider;

pub mod prelude {
    pub use super::{CachedProvider, NewsApiClient, RetryProvider};
    pub use sa_core::{Article, Error, NewsProvider, Result};
}
