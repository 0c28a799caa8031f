use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A generation request as received from the caller
///
/// Only `prompt` takes part in cache matching. Every other field is carried
/// verbatim in `parameters` and forwarded to the backend on a miss.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    #[serde(flatten)]
    pub parameters: Map<String, Value>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            parameters: Map::new(),
        }
    }

    pub fn builder(prompt: impl Into<String>) -> GenerationRequestBuilder {
        GenerationRequestBuilder::new(prompt)
    }

    /// Get a pass-through parameter
    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.parameters.get(name)
    }
}

/// Builder for GenerationRequest
#[derive(Debug)]
pub struct GenerationRequestBuilder {
    prompt: String,
    parameters: Map<String, Value>,
}

impl GenerationRequestBuilder {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            parameters: Map::new(),
        }
    }

    pub fn parameter(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    pub fn size(self, size: impl Into<String>) -> Self {
        self.parameter("size", size.into())
    }

    pub fn model(self, model: impl Into<String>) -> Self {
        self.parameter("model", model.into())
    }

    pub fn count(self, n: u32) -> Self {
        self.parameter("n", n)
    }

    pub fn build(self) -> GenerationRequest {
        GenerationRequest {
            prompt: self.prompt,
            parameters: self.parameters,
        }
    }
}
