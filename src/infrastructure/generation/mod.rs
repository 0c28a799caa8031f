//! Generation backend implementations

mod openai_image;

pub use openai_image::{DEFAULT_IMAGE_MODEL, OpenAiImageBackend};
