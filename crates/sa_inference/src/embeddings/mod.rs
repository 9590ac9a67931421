use std::sync::Arc;
use sa_core::{Article, Error, InferenceModel, Result};
use sa_storage::FlatL2Index;
use tracing::{debug, info};

/// The retrieval query every article is ranked against.
pub fn relevance_query(ticker: &str) -> String {
    format!(
        "Significant positive or negative news impacting {} stock price and sentiment.",
        ticker
    )
}

/// Embedding-based relevance filter over one run's articles.
///
/// The index lives only as long as the run that built it.
pub struct RelevanceFilter {
    model: Arc<dyn InferenceModel>,
}

impl RelevanceFilter {
    pub fn new(model: Arc<dyn InferenceModel>) -> Self {
        Self { model }
    }

    /// Embed every article body in one batched call and index the vectors.
    pub async fn embed(&self, articles: &[Article]) -> Result<(Vec<String>, FlatL2Index)> {
        let texts: Vec<String> = articles.iter().map(|a| a.content.clone()).collect();
        if texts.is_empty() {
            return Ok((texts, FlatL2Index::default()));
        }

        let vectors = self.model.embed_documents(&texts).await?;
        if vectors.len() != texts.len() {
            return Err(Error::Inference(format!(
                "{} returned {} vectors for {} articles",
                self.model.name(),
                vectors.len(),
                texts.len()
            )));
        }

        let index = FlatL2Index::from_vectors(vectors)?;
        debug!("Indexed {} articles ({} dimensions)", index.len(), index.dimension());
        Ok((texts, index))
    }

    /// The `k` texts nearest to the ticker query, nearest first.
    ///
    /// `k` larger than the index returns every text; `k == 0` returns none.
    pub async fn search(
        &self,
        ticker: &str,
        texts: &[String],
        index: &FlatL2Index,
        k: usize,
    ) -> Result<Vec<String>> {
        if index.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let query = self.model.embed_query(&relevance_query(ticker)).await?;
        let neighbors = index.search(&query, k)?;
        Ok(neighbors
            .into_iter()
            .filter_map(|n| texts.get(n.position).cloned())
            .collect())
    }

    pub async fn filter(&self, ticker: &str, articles: &[Article], k: usize) -> Result<Vec<String>> {
        info!("🔎 Ranking {} articles for {} relevance", articles.len(), ticker);
        let (texts, index) = self.embed(articles).await?;
        let relevant = self.search(ticker, &texts, &index, k).await?;
        info!("🎯 Kept {} of {} articles", relevant.len(), texts.len());
        Ok(relevant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sa_core::GenerationRequest;
    use std::collections::HashMap;

    /// Looks up fixed vectors by text; the ticker query maps to the origin.
    #[derive(Debug)]
    struct FixedEmbeddings {
        vectors: HashMap<String, Vec<f32>>,
        short_batch: bool,
    }

    impl FixedEmbeddings {
        fn new(entries: &[(&str, [f32; 2])]) -> Self {
            Self {
                vectors: entries.iter().map(|(t, v)| (t.to_string(), v.to_vec())).collect(),
                short_batch: false,
            }
        }
    }

    #[async_trait]
    impl InferenceModel for FixedEmbeddings {
        fn name(&self) -> &str {
            "Fixed"
        }

        async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let mut vectors: Vec<Vec<f32>> = texts
                .iter()
                .map(|t| self.vectors.get(t).cloned().unwrap_or_else(|| vec![100.0, 100.0]))
                .collect();
            if self.short_batch {
                vectors.pop();
            }
            Ok(vectors)
        }

        async fn embed_query(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![0.0, 0.0])
        }

        async fn generate(&self, _request: &GenerationRequest) -> Result<String> {
            Err(Error::Inference("not a generator".to_string()))
        }
    }

    fn articles() -> Vec<Article> {
        ["far", "near", "middle", "nearest"]
            .iter()
            .map(|body| Article::new(format!("{} headline", body), *body))
            .collect()
    }

    fn filter() -> RelevanceFilter {
        RelevanceFilter::new(Arc::new(FixedEmbeddings::new(&[
            ("far", [9.0, 9.0]),
            ("near", [1.0, 1.0]),
            ("middle", [3.0, 0.0]),
            ("nearest", [0.5, 0.0]),
        ])))
    }

    #[test]
    fn test_query_template() {
        assert_eq!(
            relevance_query("AAPL"),
            "Significant positive or negative news impacting AAPL stock price and sentiment."
        );
    }

    #[tokio::test]
    async fn test_search_returns_k_nearest_first() {
        let filter = filter();
        let (texts, index) = filter.embed(&articles()).await.unwrap();
        assert_eq!(index.len(), 4);

        let top = filter.search("AAPL", &texts, &index, 2).await.unwrap();
        assert_eq!(top, vec!["nearest", "near"]);
        assert!(top.iter().all(|t| texts.contains(t)));
    }

    #[tokio::test]
    async fn test_k_larger_than_index_is_clamped() {
        let top = filter().filter("AAPL", &articles(), 10).await.unwrap();
        assert_eq!(top, vec!["nearest", "near", "middle", "far"]);
    }

    #[tokio::test]
    async fn test_zero_k_and_empty_input_yield_nothing() {
        let filter = filter();
        assert!(filter.filter("AAPL", &articles(), 0).await.unwrap().is_empty());
        assert!(filter.filter("AAPL", &[], 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_vector_count_mismatch_is_an_error() {
        let mut model = FixedEmbeddings::new(&[]);
        model.short_batch = true;
        let filter = RelevanceFilter::new(Arc::new(model));
        assert!(matches!(filter.embed(&articles()).await, Err(Error::Inference(_))));
    }

    #[tokio::test]
    async fn test_embedding_failure_propagates() {
        #[derive(Debug)]
        struct Down;

        #[async_trait]
        impl InferenceModel for Down {
            fn name(&self) -> &str {
                "Down"
            }
            async fn embed_documents(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
                Err(Error::Inference("quota exceeded".to_string()))
            }
            async fn embed_query(&self, _text: &str) -> Result<Vec<f32>> {
                Err(Error::Inference("quota exceeded".to_string()))
            }
            async fn generate(&self, _request: &GenerationRequest) -> Result<String> {
                Err(Error::Inference("quota exceeded".to_string()))
            }
        }

        let filter = RelevanceFilter::new(Arc::new(Down));
        let err = filter.filter("AAPL", &articles(), 2).await.unwrap_err();
        assert_eq!(err.to_string(), "Inference error: quota exceeded");
    }
}
