//! Similarity evaluation between query and candidate embeddings

mod evaluator;
mod metric;

pub use evaluator::{DistanceEvaluator, Evaluation, SimilarityEvaluator, SimilarityResult};
pub use metric::DistanceMetric;
