use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use crate::Result;

/// A structured-output generation call.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub temperature: f32,
    pub max_output_tokens: Option<u32>,
    /// JSON schema the response must conform to.
    pub response_schema: Value,
}

impl GenerationRequest {
    /// Deterministic (temperature 0) request constrained to `response_schema`.
    pub fn new(prompt: impl Into<String>, response_schema: Value) -> Self {
        Self {
            prompt: prompt.into(),
            temperature: 0.0,
            max_output_tokens: None,
            response_schema,
        }
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = Some(max_output_tokens);
        self
    }
}

#[async_trait]
pub trait InferenceModel: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Embed documents for retrieval; one vector per text, in input order
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a retrieval query
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>>;

    /// Run a structured-output generation and return the raw response text.
    /// The text is untrusted: it may be fenced, truncated or off-schema.
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;
}
