//! OpenAI-compatible image generation backend

use async_trait::async_trait;
use serde::Deserialize;

use crate::domain::DomainError;
use crate::domain::generation::{Artifact, GenerationBackend, GenerationRequest};
use crate::infrastructure::http_client::HttpClientTrait;

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";

pub const DEFAULT_IMAGE_MODEL: &str = "dall-e-2";

const IMAGE_CONTENT_TYPE: &str = "image/png";

/// Image backend calling `POST {base}/v1/images/generations`
///
/// Pass-through parameters (size, n, quality, style, ...) are forwarded as
/// top-level body fields. The response format is always forced to
/// `b64_json` and the first image becomes the artifact.
#[derive(Debug)]
pub struct OpenAiImageBackend<C: HttpClientTrait> {
    client: C,
    auth_header: String,
    base_url: String,
    default_model: String,
}

impl<C: HttpClientTrait> OpenAiImageBackend<C> {
    pub fn new(client: C, api_key: impl Into<String>) -> Self {
        Self::with_base_url(client, api_key, DEFAULT_OPENAI_BASE_URL)
    }

    pub fn with_base_url(
        client: C,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let auth_header = format!("Bearer {}", api_key.into());
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Self {
            client,
            auth_header,
            base_url,
            default_model: DEFAULT_IMAGE_MODEL.to_string(),
        }
    }

    /// Model used when the request does not name one
    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    fn generations_url(&self) -> String {
        format!("{}/v1/images/generations", self.base_url)
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        vec![
            ("Authorization", self.auth_header.as_str()),
            ("Content-Type", "application/json"),
        ]
    }

    fn build_request(&self, request: &GenerationRequest) -> serde_json::Value {
        let mut body = serde_json::Map::new();

        for (key, value) in &request.parameters {
            body.insert(key.clone(), value.clone());
        }

        body.insert("prompt".to_string(), serde_json::json!(request.prompt));
        body.insert("response_format".to_string(), serde_json::json!("b64_json"));
        body.entry("model")
            .or_insert_with(|| serde_json::json!(self.default_model));

        serde_json::Value::Object(body)
    }

    fn parse_response(&self, json: serde_json::Value) -> Result<Artifact, DomainError> {
        let response: ImageGenerationResponse = serde_json::from_value(json).map_err(|e| {
            DomainError::backend("openai", format!("Failed to parse image response: {}", e))
        })?;

        let encoded = response
            .data
            .into_iter()
            .find_map(|image| image.b64_json)
            .ok_or_else(|| DomainError::backend("openai", "Response contained no image data"))?;

        Artifact::from_base64(&encoded, IMAGE_CONTENT_TYPE)
            .map_err(|e| DomainError::backend("openai", e.to_string()))
    }
}

#[async_trait]
impl<C: HttpClientTrait> GenerationBackend for OpenAiImageBackend<C> {
    async fn generate(&self, request: &GenerationRequest) -> Result<Artifact, DomainError> {
        let url = self.generations_url();
        let body = self.build_request(request);

        let response = self
            .client
            .post_json(&url, self.headers(), &body)
            .await
            .map_err(|e| DomainError::backend("openai", e.to_string()))?;

        self.parse_response(response)
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

#[derive(Debug, Deserialize)]
struct ImageGenerationResponse {
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    #[serde(default)]
    b64_json: Option<String>,
}
