//! Subject classification against a threshold probability.

use crate::data::{Predictor, ScoreKind};
use crate::error::{DcaError, Result};

/// Validate a predictor's scores and normalize them onto [0, 1].
///
/// Probability scores are used as-is after range validation. Binary
/// indicators must be exactly 0 or 1. Raw scores are min-max rescaled over
/// the observed values. `f64::NAN` entries mark missing scores and pass
/// through untouched; validation only considers observed values.
///
/// The returned vector is computed once per predictor and reused across all
/// thresholds.
///
/// # Errors
/// `InvalidPredictorKind` for out-of-range probabilities or non-0/1
/// indicators; `DegenerateScore` for a constant raw score; `EmptyData` when
/// no score is observed.
pub fn normalize_scores(predictor: &Predictor) -> Result<Vec<f64>> {
    let observed: Vec<f64> = predictor
        .scores
        .iter()
        .copied()
        .filter(|s| s.is_finite())
        .collect();
    if observed.is_empty() {
        return Err(DcaError::EmptyData(format!(
            "Predictor '{}' has no observed scores",
            predictor.name
        )));
    }

    match predictor.kind {
        ScoreKind::Probability => {
            if observed.iter().any(|&s| !(0.0..=1.0).contains(&s)) {
                return Err(DcaError::InvalidPredictorKind {
                    predictor: predictor.name.clone(),
                    reason: "probability scores must lie in [0, 1]".to_string(),
                });
            }
            Ok(predictor.scores.clone())
        }
        ScoreKind::BinaryIndicator => {
            if observed.iter().any(|&s| s != 0.0 && s != 1.0) {
                return Err(DcaError::InvalidPredictorKind {
                    predictor: predictor.name.clone(),
                    reason: "binary indicator scores must be exactly 0 or 1".to_string(),
                });
            }
            Ok(predictor.scores.clone())
        }
        ScoreKind::RawScore => {
            let min = observed.iter().copied().fold(f64::INFINITY, f64::min);
            let max = observed.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            if max == min {
                return Err(DcaError::DegenerateScore(predictor.name.clone()));
            }
            let range = max - min;
            Ok(predictor
                .scores
                .iter()
                .map(|&s| if s.is_finite() { (s - min) / range } else { s })
                .collect())
        }
    }
}

/// Label each subject "would act" at threshold `pt`.
///
/// Probability and rescaled scores act when `score >= pt`. A binary
/// indicator acts exactly where the indicator is 1, at every threshold: the
/// classification never changes across the grid, only the odds weighting of
/// its false positives does. Missing (`NaN`) scores never act; callers
/// exclude those subjects via the predictor's observed-index mask.
pub fn would_act(scores: &[f64], kind: ScoreKind, pt: f64) -> Vec<bool> {
    match kind {
        ScoreKind::Probability | ScoreKind::RawScore => {
            scores.iter().map(|&s| s >= pt).collect()
        }
        ScoreKind::BinaryIndicator => scores.iter().map(|&s| s == 1.0).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_probability_passthrough() {
        let p = Predictor::probability("model", vec![0.2, 0.8, f64::NAN]);
        let scores = normalize_scores(&p).unwrap();
        assert_relative_eq!(scores[0], 0.2);
        assert!(scores[2].is_nan());
    }

    #[test]
    fn test_probability_out_of_range() {
        let p = Predictor::probability("model", vec![0.2, 1.3]);
        assert!(matches!(
            normalize_scores(&p),
            Err(DcaError::InvalidPredictorKind { .. })
        ));
    }

    #[test]
    fn test_binary_indicator_validation() {
        let ok = Predictor::binary("test", vec![0.0, 1.0, 1.0]);
        assert!(normalize_scores(&ok).is_ok());

        let bad = Predictor::binary("test", vec![0.0, 0.5]);
        assert!(matches!(
            normalize_scores(&bad),
            Err(DcaError::InvalidPredictorKind { .. })
        ));
    }

    #[test]
    fn test_raw_rescaling() {
        let p = Predictor::raw("marker", vec![10.0, 20.0, 15.0, f64::NAN]);
        let scores = normalize_scores(&p).unwrap();
        assert_relative_eq!(scores[0], 0.0);
        assert_relative_eq!(scores[1], 1.0);
        assert_relative_eq!(scores[2], 0.5);
        assert!(scores[3].is_nan());
    }

    #[test]
    fn test_constant_raw_score_degenerate() {
        let p = Predictor::raw("marker", vec![5.0, 5.0, 5.0]);
        assert!(matches!(
            normalize_scores(&p),
            Err(DcaError::DegenerateScore(_))
        ));
    }

    #[test]
    fn test_all_missing_rejected() {
        let p = Predictor::probability("model", vec![f64::NAN, f64::NAN]);
        assert!(matches!(normalize_scores(&p), Err(DcaError::EmptyData(_))));
    }

    #[test]
    fn test_would_act_probability() {
        let labels = would_act(&[0.1, 0.5, 0.9], ScoreKind::Probability, 0.5);
        assert_eq!(labels, vec![false, true, true]);
    }

    #[test]
    fn test_would_act_shrinks_with_threshold() {
        let scores = [0.1, 0.3, 0.5, 0.7, 0.9];
        let low: usize = would_act(&scores, ScoreKind::Probability, 0.2)
            .iter()
            .filter(|&&a| a)
            .count();
        let high: usize = would_act(&scores, ScoreKind::Probability, 0.8)
            .iter()
            .filter(|&&a| a)
            .count();
        assert!(high <= low);
    }

    #[test]
    fn test_would_act_binary_ignores_threshold() {
        let scores = [0.0, 1.0, 1.0];
        for pt in [0.05, 0.5, 0.95] {
            let labels = would_act(&scores, ScoreKind::BinaryIndicator, pt);
            assert_eq!(labels, vec![false, true, true]);
        }
    }

    #[test]
    fn test_would_act_nan_never_acts() {
        let labels = would_act(&[f64::NAN, 0.9], ScoreKind::Probability, 0.5);
        assert_eq!(labels, vec![false, true]);
    }
}
