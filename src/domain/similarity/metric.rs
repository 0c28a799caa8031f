use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;
use crate::domain::embedding::{cosine_similarity, euclidean_distance};

/// Distance metric used to rank and judge candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// L2 distance; lower scores are closer
    Euclidean,
    /// Cosine similarity; higher scores are closer
    #[default]
    Cosine,
}

impl DistanceMetric {
    /// Raw score as reported to callers (distance or similarity)
    pub fn score(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            DistanceMetric::Euclidean => euclidean_distance(a, b),
            DistanceMetric::Cosine => cosine_similarity(a, b),
        }
    }

    /// Ranking distance where smaller is always closer
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        self.distance_from_score(self.score(a, b))
    }

    /// Convert a score into an ascending ranking distance
    pub fn distance_from_score(&self, score: f32) -> f32 {
        match self {
            DistanceMetric::Euclidean => score,
            DistanceMetric::Cosine => 1.0 - score,
        }
    }

    /// Whether a higher score means a closer match
    pub fn higher_is_better(&self) -> bool {
        matches!(self, DistanceMetric::Cosine)
    }

    /// Whether a score passes the threshold in this metric's direction
    pub fn passes(&self, score: f32, threshold: f32) -> bool {
        if self.higher_is_better() {
            score >= threshold
        } else {
            score <= threshold
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistanceMetric::Euclidean => write!(f, "euclidean"),
            DistanceMetric::Cosine => write!(f, "cosine"),
        }
    }
}

impl FromStr for DistanceMetric {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "euclidean" | "l2" => Ok(DistanceMetric::Euclidean),
            "cosine" => Ok(DistanceMetric::Cosine),
            _ => Err(DomainError::configuration(format!(
                "Unknown distance metric: {}. Valid metrics: euclidean, cosine",
                s
            ))),
        }
    }
}
