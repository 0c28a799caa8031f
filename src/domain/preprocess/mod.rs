//! Request normalization: extracting the cacheable key text from a request

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;
use crate::domain::generation::GenerationRequest;

/// Extracts the canonical key text from a request
///
/// Two calls with the same request must yield the same text.
pub trait RequestNormalizer: Send + Sync + Debug {
    fn normalize(&self, request: &GenerationRequest) -> Result<String, DomainError>;
}

/// Options for `PromptNormalizer`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NormalizerConfig {
    /// Collapse runs of whitespace into a single space
    #[serde(default = "default_true")]
    pub collapse_whitespace: bool,

    /// Lowercase the prompt before matching
    #[serde(default)]
    pub lowercase: bool,
}

fn default_true() -> bool {
    true
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            collapse_whitespace: true,
            lowercase: false,
        }
    }
}

/// Keeps only the prompt text; every other request field is ignored
#[derive(Debug, Clone, Default)]
pub struct PromptNormalizer {
    config: NormalizerConfig,
}

impl PromptNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: NormalizerConfig) -> Self {
        Self { config }
    }
}

impl RequestNormalizer for PromptNormalizer {
    fn normalize(&self, request: &GenerationRequest) -> Result<String, DomainError> {
        let trimmed = request.prompt.trim();

        let mut text = if self.config.collapse_whitespace {
            trimmed.split_whitespace().collect::<Vec<_>>().join(" ")
        } else {
            trimmed.to_string()
        };

        if self.config.lowercase {
            text = text.to_lowercase();
        }

        if text.is_empty() {
            return Err(DomainError::invalid_request("Prompt is empty after normalization"));
        }

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_only_prompt() {
        let normalizer = PromptNormalizer::new();
        let a = GenerationRequest::builder("a cat").size("256x256").build();
        let b = GenerationRequest::builder("a cat").size("1024x1024").model("x").build();

        assert_eq!(normalizer.normalize(&a).unwrap(), "a cat");
        assert_eq!(normalizer.normalize(&a).unwrap(), normalizer.normalize(&b).unwrap());
    }

    #[test]
    fn test_collapses_whitespace() {
        let normalizer = PromptNormalizer::new();
        let request = GenerationRequest::new("  a   cat\n in\tspace ");

        assert_eq!(normalizer.normalize(&request).unwrap(), "a cat in space");
    }

    #[test]
    fn test_keeps_inner_whitespace_when_disabled() {
        let normalizer = PromptNormalizer::with_config(NormalizerConfig {
            collapse_whitespace: false,
            lowercase: false,
        });
        let request = GenerationRequest::new("  a   cat ");

        assert_eq!(normalizer.normalize(&request).unwrap(), "a   cat");
    }

    #[test]
    fn test_lowercase() {
        let normalizer = PromptNormalizer::with_config(NormalizerConfig {
            collapse_whitespace: true,
            lowercase: true,
        });

        assert_eq!(
            normalizer.normalize(&GenerationRequest::new("A Cat")).unwrap(),
            "a cat"
        );
    }

    #[test]
    fn test_empty_prompt_is_invalid() {
        let normalizer = PromptNormalizer::new();

        for prompt in ["", "   ", "\n\t"] {
            let result = normalizer.normalize(&GenerationRequest::new(prompt));
            assert!(matches!(result, Err(DomainError::InvalidRequest { .. })));
        }
    }
}
