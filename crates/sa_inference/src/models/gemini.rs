use async_trait::async_trait;
use reqwest::Client;
use sa_core::{Error, GenerationRequest, InferenceModel, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/";
pub const EMBEDDING_MODEL: &str = "text-embedding-004";
pub const GENERATION_MODEL: &str = "gemini-2.5-flash";

// batchEmbedContents accepts at most this many requests per call
const MAX_EMBED_BATCH: usize = 100;

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

impl Content {
    fn text(text: &str) -> Self {
        Self {
            parts: vec![Part { text: text.to_string() }],
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest {
    model: String,
    content: Content,
    task_type: &'static str,
}

#[derive(Serialize)]
struct BatchEmbedRequest {
    requests: Vec<EmbedContentRequest>,
}

#[derive(Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

#[derive(Deserialize)]
struct EmbedContentResponse {
    embedding: ContentEmbedding,
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Serialize)]
struct UserContent {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    response_mime_type: &'static str,
    response_schema: Value,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<UserContent>,
    generation_config: GenerationConfig,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

/// Gemini over its REST API: `text-embedding-004` for retrieval vectors and
/// `gemini-2.5-flash` for structured JSON generation.
pub struct GeminiModel {
    client: Client,
    api_key: String,
    base_url: Url,
    embedding_model: String,
    generation_model: String,
}

impl GeminiModel {
    pub fn new(api_key: Option<String>) -> Result<Self> {
        let api_key = api_key
            .filter(|key| !key.is_empty())
            .ok_or_else(|| Error::Config("Gemini API key is required".to_string()))?;
        let client = Client::builder().timeout(Duration::from_secs(60)).build()?;
        let base_url = Url::parse(DEFAULT_BASE_URL)
            .map_err(|e| Error::Config(format!("Invalid Gemini URL: {}", e)))?;
        Ok(Self {
            client,
            api_key,
            base_url,
            embedding_model: EMBEDDING_MODEL.to_string(),
            generation_model: GENERATION_MODEL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Result<Self> {
        self.base_url = Url::parse(base_url)
            .map_err(|e| Error::Config(format!("Invalid Gemini URL {}: {}", base_url, e)))?;
        Ok(self)
    }

    pub fn with_generation_model(mut self, model: impl Into<String>) -> Self {
        self.generation_model = model.into();
        self
    }

    fn method_url(&self, model: &str, method: &str) -> Result<Url> {
        self.base_url
            .join(&format!("models/{}:{}", model, method))
            .map_err(|e| Error::Config(format!("Invalid Gemini URL: {}", e)))
    }

    async fn post<B: Serialize, R: DeserializeOwned>(&self, url: Url, body: &B) -> Result<R> {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::Inference(format!("Gemini returned {}: {}", status, detail)));
        }
        Ok(response.json::<R>().await?)
    }

    fn embed_request(&self, text: &str, task_type: &'static str) -> EmbedContentRequest {
        EmbedContentRequest {
            model: format!("models/{}", self.embedding_model),
            content: Content::text(text),
            task_type,
        }
    }
}

impl fmt::Debug for GeminiModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiModel")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url.as_str())
            .field("embedding_model", &self.embedding_model)
            .field("generation_model", &self.generation_model)
            .finish()
    }
}

#[async_trait]
impl InferenceModel for GeminiModel {
    fn name(&self) -> &str {
        "Gemini"
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = self.method_url(&self.embedding_model, "batchEmbedContents")?;
        let mut vectors = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(MAX_EMBED_BATCH) {
            let request = BatchEmbedRequest {
                requests: chunk
                    .iter()
                    .map(|text| self.embed_request(text, "RETRIEVAL_DOCUMENT"))
                    .collect(),
            };
            let response: BatchEmbedResponse = self.post(url.clone(), &request).await?;
            if response.embeddings.len() != chunk.len() {
                return Err(Error::Inference(format!(
                    "Gemini returned {} embeddings for {} documents",
                    response.embeddings.len(),
                    chunk.len()
                )));
            }
            vectors.extend(response.embeddings.into_iter().map(|e| e.values));
        }

        debug!("Embedded {} documents", vectors.len());
        Ok(vectors)
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let url = self.method_url(&self.embedding_model, "embedContent")?;
        let request = self.embed_request(text, "RETRIEVAL_QUERY");
        let response: EmbedContentResponse = self.post(url, &request).await?;
        Ok(response.embedding.values)
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let url = self.method_url(&self.generation_model, "generateContent")?;
        let body = GenerateContentRequest {
            contents: vec![UserContent {
                role: "user",
                parts: vec![Part { text: request.prompt.clone() }],
            }],
            generation_config: GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_output_tokens,
                response_mime_type: "application/json",
                response_schema: request.response_schema.clone(),
            },
        };

        let response: GenerateContentResponse = self.post(url, &body).await?;
        first_candidate_text(response)
    }
}

fn first_candidate_text(response: GenerateContentResponse) -> Result<String> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        let feedback = response
            .prompt_feedback
            .map(|f| f.to_string())
            .unwrap_or_else(|| "none".to_string());
        return Err(Error::Inference(format!("Gemini returned no candidates (feedback: {})", feedback)));
    };

    let text: String = candidate
        .content
        .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(Error::Inference(format!(
            "Gemini candidate has no text (finish reason: {})",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        )));
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_model_requires_api_key() {
        let result = GeminiModel::new(None);
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().to_string(), "Configuration error: Gemini API key is required");
        assert!(GeminiModel::new(Some(String::new())).is_err());
        assert!(GeminiModel::new(Some("test-key".to_string())).is_ok());
    }

    #[test]
    fn test_method_urls() {
        let model = GeminiModel::new(Some("test-key".to_string())).unwrap();
        assert_eq!(
            model.method_url(EMBEDDING_MODEL, "batchEmbedContents").unwrap().as_str(),
            "https://generativelanguage.googleapis.com/v1beta/models/text-embedding-004:batchEmbedContents"
        );
        assert!(!format!("{:?}", model).contains("test-key"));
    }

    #[test]
    fn test_generation_request_wire_format() {
        let body = GenerateContentRequest {
            contents: vec![UserContent {
                role: "user",
                parts: vec![Part { text: "prompt".to_string() }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.0,
                max_output_tokens: None,
                response_mime_type: "application/json",
                response_schema: json!({"type": "OBJECT"}),
            },
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(value["generationConfig"]["responseSchema"]["type"], "OBJECT");
        assert!(value["generationConfig"].get("maxOutputTokens").is_none());
        assert_eq!(value["contents"][0]["parts"][0]["text"], "prompt");
    }

    #[test]
    fn test_candidate_text_is_joined() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {"parts": [{"text": "{\"a\":"}, {"text": " 1}"}], "role": "model"},
                "finishReason": "STOP"
            }]
        }))
        .unwrap();
        assert_eq!(first_candidate_text(response).unwrap(), "{\"a\": 1}");
    }

    #[test]
    fn test_blocked_prompt_is_an_error() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "promptFeedback": {"blockReason": "SAFETY"}
        }))
        .unwrap();
        let err = first_candidate_text(response).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[tokio::test]
    #[ignore = "requires GEMINI_API_KEY and network access"]
    async fn test_embed_live() {
        let model = GeminiModel::new(std::env::var("GEMINI_API_KEY").ok()).unwrap();
        let vectors = model
            .embed_documents(&["first".to_string(), "second".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0].len(), vectors[1].len());
    }
}
