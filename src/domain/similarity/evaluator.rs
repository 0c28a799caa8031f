use std::fmt::Debug;

use crate::domain::DomainError;
use crate::domain::embedding::check_dimension;

use super::DistanceMetric;

/// Score and decision for one (query, candidate) pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub score: f32,
    pub is_similar: bool,
}

/// Outcome of evaluating a stored candidate against a query
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityResult {
    pub entry_id: String,
    pub score: f32,
    pub is_similar: bool,
}

impl SimilarityResult {
    pub fn new(entry_id: impl Into<String>, evaluation: Evaluation) -> Self {
        Self {
            entry_id: entry_id.into(),
            score: evaluation.score,
            is_similar: evaluation.is_similar,
        }
    }
}

/// Decides whether a stored candidate is close enough to a query
///
/// Implementations are pure: the same inputs always give the same result.
pub trait SimilarityEvaluator: Send + Sync + Debug {
    fn evaluate(&self, query: &[f32], candidate: &[f32]) -> Result<Evaluation, DomainError>;
}

/// Threshold evaluator over a `DistanceMetric`
#[derive(Debug, Clone)]
pub struct DistanceEvaluator {
    metric: DistanceMetric,
    threshold: f32,
    dimension: usize,
}

impl DistanceEvaluator {
    pub fn new(metric: DistanceMetric, threshold: f32, dimension: usize) -> Self {
        Self {
            metric,
            threshold,
            dimension,
        }
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }
}

impl SimilarityEvaluator for DistanceEvaluator {
    fn evaluate(&self, query: &[f32], candidate: &[f32]) -> Result<Evaluation, DomainError> {
        check_dimension(query, self.dimension)?;
        check_dimension(candidate, self.dimension)?;

        let score = self.metric.score(query, candidate);

        Ok(Evaluation {
            score,
            is_similar: self.metric.passes(score, self.threshold),
        })
    }
}
