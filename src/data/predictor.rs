//! Predictor descriptors: named per-subject score columns.

use serde::{Deserialize, Serialize};

/// How a predictor's scores are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScoreKind {
    /// Scores are probabilities already on [0, 1], used as-is.
    Probability,
    /// Scores are a 0/1 indicator of a dichotomous rule. The classification
    /// is the indicator itself at every threshold.
    BinaryIndicator,
    /// Raw scores mapped onto [0, 1] by min-max rescaling before use.
    RawScore,
}

impl ScoreKind {
    /// Descriptive name matching the serialized form.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Probability => "probability",
            Self::BinaryIndicator => "binary-indicator",
            Self::RawScore => "raw-score",
        }
    }
}

/// A named score column under evaluation.
///
/// Scores use `f64::NAN` as the missing marker; subjects with a missing score
/// are dropped from this predictor's evaluation only, never from the cohort.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Predictor {
    /// Display name, also the key for harm lookup.
    pub name: String,
    /// Interpretation of the scores.
    pub kind: ScoreKind,
    /// One score per subject, aligned with the cohort outcome.
    pub scores: Vec<f64>,
}

impl Predictor {
    /// A predictor whose scores are probabilities.
    pub fn probability(name: impl Into<String>, scores: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            kind: ScoreKind::Probability,
            scores,
        }
    }

    /// A predictor that is a 0/1 indicator.
    pub fn binary(name: impl Into<String>, scores: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            kind: ScoreKind::BinaryIndicator,
            scores,
        }
    }

    /// A predictor with raw scores to be min-max rescaled.
    pub fn raw(name: impl Into<String>, scores: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            kind: ScoreKind::RawScore,
            scores,
        }
    }

    /// Number of subjects (including those with a missing score).
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Indices of subjects with an observed (finite) score.
    pub fn observed_indices(&self) -> Vec<usize> {
        self.scores
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_finite())
            .map(|(i, _)| i)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        let p = Predictor::probability("model", vec![0.1, 0.9]);
        assert_eq!(p.kind, ScoreKind::Probability);
        assert_eq!(p.len(), 2);

        let b = Predictor::binary("test", vec![0.0, 1.0]);
        assert_eq!(b.kind, ScoreKind::BinaryIndicator);

        let r = Predictor::raw("marker", vec![3.2, 8.1]);
        assert_eq!(r.kind, ScoreKind::RawScore);
    }

    #[test]
    fn test_observed_indices() {
        let p = Predictor::probability("model", vec![0.1, f64::NAN, 0.9, f64::NAN]);
        assert_eq!(p.observed_indices(), vec![0, 2]);
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(ScoreKind::Probability.name(), "probability");
        assert_eq!(ScoreKind::BinaryIndicator.name(), "binary-indicator");
        assert_eq!(ScoreKind::RawScore.name(), "raw-score");
    }
}
