//! OpenAI embedding provider implementation

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::DomainError;
use crate::domain::embedding::EmbeddingProvider;
use crate::infrastructure::http_client::HttpClientTrait;

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";

pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Known OpenAI embedding models and their native dimensions
const EMBEDDING_MODELS: &[(&str, usize)] = &[
    ("text-embedding-3-small", 1536),
    ("text-embedding-3-large", 3072),
    ("text-embedding-ada-002", 1536),
];

/// Native dimension of a known model
pub fn model_dimensions(model: &str) -> Option<usize> {
    EMBEDDING_MODELS
        .iter()
        .find(|(name, _)| *name == model)
        .map(|(_, dims)| *dims)
}

/// OpenAI embedding provider
///
/// `text-embedding-3-*` models are asked for exactly `dimensions` values;
/// other models must natively produce that many.
#[derive(Debug)]
pub struct OpenAiEmbeddingProvider<C: HttpClientTrait> {
    client: C,
    auth_header: String,
    base_url: String,
    model: String,
    dimensions: usize,
}

impl<C: HttpClientTrait> OpenAiEmbeddingProvider<C> {
    /// Create a new OpenAI embedding provider
    pub fn new(
        client: C,
        api_key: impl Into<String>,
        model: impl Into<String>,
        dimensions: usize,
    ) -> Self {
        Self::with_base_url(client, api_key, model, dimensions, DEFAULT_OPENAI_BASE_URL)
    }

    /// Create a new provider with custom base URL
    pub fn with_base_url(
        client: C,
        api_key: impl Into<String>,
        model: impl Into<String>,
        dimensions: usize,
        base_url: impl Into<String>,
    ) -> Self {
        let api_key = api_key.into();
        let auth_header = format!("Bearer {}", api_key);
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Self {
            client,
            auth_header,
            base_url,
            model: model.into(),
            dimensions,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn embeddings_url(&self) -> String {
        format!("{}/v1/embeddings", self.base_url)
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        vec![
            ("Authorization", self.auth_header.as_str()),
            ("Content-Type", "application/json"),
        ]
    }

    fn build_request(&self, text: &str) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.model,
            "input": text,
            "encoding_format": "float",
        });

        if self.model.starts_with("text-embedding-3") {
            body["dimensions"] = serde_json::json!(self.dimensions);
        }

        body
    }

    fn parse_response(&self, json: serde_json::Value) -> Result<Vec<f32>, DomainError> {
        let response: OpenAiEmbeddingResponse = serde_json::from_value(json).map_err(|e| {
            DomainError::embedding("openai", format!("Failed to parse embedding response: {}", e))
        })?;

        response
            .data
            .into_iter()
            .min_by_key(|d| d.index)
            .map(|d| d.embedding)
            .ok_or_else(|| DomainError::embedding("openai", "Response contained no embeddings"))
    }
}

#[async_trait]
impl<C: HttpClientTrait> EmbeddingProvider for OpenAiEmbeddingProvider<C> {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, DomainError> {
        let url = self.embeddings_url();
        let body = self.build_request(text);

        let response = self
            .client
            .post_json(&url, self.headers(), &body)
            .await
            .map_err(|e| DomainError::embedding("openai", e.to_string()))?;

        self.parse_response(response)
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

// OpenAI API types for embeddings

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiEmbeddingResponse {
    data: Vec<OpenAiEmbeddingData>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiEmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::http_client::mock::MockHttpClient;

    const TEST_URL: &str = "https://api.openai.com/v1/embeddings";

    fn create_mock_response(dimensions: usize) -> serde_json::Value {
        let embedding: Vec<f32> = (0..dimensions).map(|j| j as f32 * 0.001).collect();

        serde_json::json!({
            "model": "text-embedding-3-small",
            "data": [{ "index": 0, "embedding": embedding, "object": "embedding" }],
            "usage": { "prompt_tokens": 10, "total_tokens": 10 }
        })
    }

    #[tokio::test]
    async fn test_embed_text() {
        let client = MockHttpClient::new().with_response(TEST_URL, create_mock_response(256));
        let provider =
            OpenAiEmbeddingProvider::new(client, "test-api-key", DEFAULT_EMBEDDING_MODEL, 256);

        let vector = provider.embed("Hello world").await.unwrap();

        assert_eq!(vector.len(), 256);
        assert!((vector[1] - 0.001).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_request_body_carries_dimensions() {
        let client = MockHttpClient::new().with_response(TEST_URL, create_mock_response(256));
        let provider =
            OpenAiEmbeddingProvider::new(client, "test-api-key", DEFAULT_EMBEDDING_MODEL, 256);

        provider.embed("a cat").await.unwrap();

        let requests = provider.client.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].1["input"], "a cat");
        assert_eq!(requests[0].1["dimensions"], 256);
        assert_eq!(requests[0].1["model"], "text-embedding-3-small");
    }

    #[tokio::test]
    async fn test_ada_request_omits_dimensions() {
        let client = MockHttpClient::new().with_response(TEST_URL, create_mock_response(1536));
        let provider =
            OpenAiEmbeddingProvider::new(client, "test-api-key", "text-embedding-ada-002", 1536);

        provider.embed("a cat").await.unwrap();

        assert!(provider.client.requests()[0].1.get("dimensions").is_none());
    }

    #[tokio::test]
    async fn test_embed_error_is_embedding_error() {
        let client = MockHttpClient::new().with_error(TEST_URL, "Rate limit exceeded");
        let provider =
            OpenAiEmbeddingProvider::new(client, "test-api-key", DEFAULT_EMBEDDING_MODEL, 256);

        let result = provider.embed("Hello").await;

        assert!(matches!(result, Err(DomainError::Embedding { .. })));
    }

    #[tokio::test]
    async fn test_empty_response_is_error() {
        let client = MockHttpClient::new()
            .with_response(TEST_URL, serde_json::json!({ "data": [] }));
        let provider =
            OpenAiEmbeddingProvider::new(client, "test-api-key", DEFAULT_EMBEDDING_MODEL, 256);

        assert!(provider.embed("Hello").await.is_err());
    }

    #[tokio::test]
    async fn test_custom_base_url() {
        let custom_url = "http://localhost:8080/v1/embeddings";
        let client = MockHttpClient::new().with_response(custom_url, create_mock_response(8));
        let provider = OpenAiEmbeddingProvider::with_base_url(
            client,
            "test-key",
            DEFAULT_EMBEDDING_MODEL,
            8,
            "http://localhost:8080/",
        );

        assert_eq!(provider.embed("Test").await.unwrap().len(), 8);
    }

    #[test]
    fn test_provider_info() {
        let provider =
            OpenAiEmbeddingProvider::new(MockHttpClient::new(), "test-key", DEFAULT_EMBEDDING_MODEL, 512);

        assert_eq!(provider.provider_name(), "openai");
        assert_eq!(provider.dimensions(), 512);
        assert_eq!(provider.model(), "text-embedding-3-small");
        assert_eq!(model_dimensions("text-embedding-3-large"), Some(3072));
        assert_eq!(model_dimensions("unknown-model"), None);
    }
}
