//! Generation backend domain models and traits

mod artifact;
mod backend;
mod request;

pub use artifact::Artifact;
pub use backend::GenerationBackend;
pub use request::{GenerationRequest, GenerationRequestBuilder};

#[cfg(test)]
pub use backend::MockGenerationBackend;
