//! Binary outcome estimator: direct counting.

use crate::error::{DcaError, Result};
use crate::estimate::RiskFractions;

/// Estimate true/false-positive fractions for a binary outcome.
///
/// Over the full subject set of size `n`, counts subjects that would act and
/// did (true positives) or did not (false positives) experience the event,
/// returning `(TP/n, FP/n)`.
///
/// # Errors
/// `MismatchedLength` when labels and outcomes differ in length; `EmptyData`
/// for an empty subject set.
pub fn estimate_binary(would_act: &[bool], outcomes: &[bool]) -> Result<RiskFractions> {
    if would_act.len() != outcomes.len() {
        return Err(DcaError::MismatchedLength {
            expected: outcomes.len(),
            actual: would_act.len(),
        });
    }
    let n = outcomes.len();
    if n == 0 {
        return Err(DcaError::EmptyData(
            "Binary estimator requires at least one subject".to_string(),
        ));
    }

    let mut tp = 0usize;
    let mut fp = 0usize;
    for (&act, &event) in would_act.iter().zip(outcomes) {
        if act {
            if event {
                tp += 1;
            } else {
                fp += 1;
            }
        }
    }

    Ok(RiskFractions::new(
        tp as f64 / n as f64,
        fp as f64 / n as f64,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_counting() {
        let would_act = vec![true, true, true, false, false];
        let outcomes = vec![true, true, false, true, false];
        let frac = estimate_binary(&would_act, &outcomes).unwrap();
        assert_relative_eq!(frac.tp, 0.4);
        assert_relative_eq!(frac.fp, 0.2);
        assert!(!frac.extrapolated);
    }

    #[test]
    fn test_nobody_acts() {
        let frac = estimate_binary(&[false, false], &[true, false]).unwrap();
        assert_relative_eq!(frac.tp, 0.0);
        assert_relative_eq!(frac.fp, 0.0);
    }

    #[test]
    fn test_everyone_acts_recovers_prevalence() {
        let outcomes = vec![true, false, false, false, true];
        let frac = estimate_binary(&[true; 5], &outcomes).unwrap();
        assert_relative_eq!(frac.tp, 0.4);
        assert_relative_eq!(frac.fp, 0.6);
    }

    #[test]
    fn test_length_mismatch() {
        assert!(matches!(
            estimate_binary(&[true], &[true, false]),
            Err(DcaError::MismatchedLength { .. })
        ));
    }

    #[test]
    fn test_empty_rejected() {
        assert!(matches!(
            estimate_binary(&[], &[]),
            Err(DcaError::EmptyData(_))
        ));
    }
}
