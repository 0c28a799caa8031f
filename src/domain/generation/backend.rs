use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use super::{Artifact, GenerationRequest};
use crate::domain::DomainError;

/// The expensive generative API sitting behind the cache
#[cfg_attr(test, automock)]
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Produce a fresh artifact for the full request
    async fn generate(&self, request: &GenerationRequest) -> Result<Artifact, DomainError>;

    /// Get the provider name
    fn provider_name(&self) -> &'static str;
}
