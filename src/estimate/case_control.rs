//! Case-control outcome estimator: reweighting by external prevalence.

use crate::error::{DcaError, Result};
use crate::estimate::RiskFractions;

/// Estimate true/false-positive fractions from a case-control sample.
///
/// Case-control sampling draws cases and controls separately, so the sample
/// case fraction says nothing about the population prevalence; the caller
/// must supply it. Counting within the sample yields the rule's sensitivity
/// (acting cases / cases) and false-positive rate (acting controls /
/// controls), which are then reweighted onto the population scale:
///
/// ```text
/// TP/n = sensitivity * prevalence
/// FP/n = (1 - specificity) * (1 - prevalence)
/// ```
///
/// With `prevalence` equal to the sample case fraction this reproduces the
/// binary estimator exactly.
///
/// # Errors
/// `MismatchedLength` for differing array lengths; `InvalidParameter` for a
/// prevalence outside (0, 1); `EmptyData` when the sample lacks cases or
/// controls.
pub fn estimate_case_control(
    would_act: &[bool],
    cases: &[bool],
    prevalence: f64,
) -> Result<RiskFractions> {
    if would_act.len() != cases.len() {
        return Err(DcaError::MismatchedLength {
            expected: cases.len(),
            actual: would_act.len(),
        });
    }
    if !(prevalence.is_finite() && prevalence > 0.0 && prevalence < 1.0) {
        return Err(DcaError::InvalidParameter(format!(
            "Prevalence must lie in the open interval (0, 1), got {}",
            prevalence
        )));
    }

    let mut acting_cases = 0usize;
    let mut acting_controls = 0usize;
    let mut n_cases = 0usize;
    let mut n_controls = 0usize;
    for (&act, &case) in would_act.iter().zip(cases) {
        if case {
            n_cases += 1;
            if act {
                acting_cases += 1;
            }
        } else {
            n_controls += 1;
            if act {
                acting_controls += 1;
            }
        }
    }
    if n_cases == 0 || n_controls == 0 {
        return Err(DcaError::EmptyData(
            "Case-control estimation requires both cases and controls".to_string(),
        ));
    }

    let sensitivity = acting_cases as f64 / n_cases as f64;
    let false_positive_rate = acting_controls as f64 / n_controls as f64;

    Ok(RiskFractions::new(
        sensitivity * prevalence,
        false_positive_rate * (1.0 - prevalence),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimate::estimate_binary;
    use approx::assert_relative_eq;

    #[test]
    fn test_reweighting() {
        // 4 cases (3 acting), 6 controls (2 acting).
        let cases = vec![
            true, true, true, true, false, false, false, false, false, false,
        ];
        let would_act = vec![
            true, true, true, false, true, true, false, false, false, false,
        ];
        let frac = estimate_case_control(&would_act, &cases, 0.1).unwrap();
        assert_relative_eq!(frac.tp, 0.75 * 0.1);
        assert_relative_eq!(frac.fp, (2.0 / 6.0) * 0.9);
    }

    #[test]
    fn test_sample_prevalence_recovers_binary() {
        let cases = vec![true, true, false, false, false];
        let would_act = vec![true, false, true, false, false];
        // Sample case fraction is 0.4.
        let cc = estimate_case_control(&would_act, &cases, 0.4).unwrap();
        let binary = estimate_binary(&would_act, &cases).unwrap();
        assert_relative_eq!(cc.tp, binary.tp, epsilon = 1e-12);
        assert_relative_eq!(cc.fp, binary.fp, epsilon = 1e-12);
    }

    #[test]
    fn test_invalid_prevalence() {
        let cases = vec![true, false];
        let would_act = vec![true, true];
        assert!(estimate_case_control(&would_act, &cases, 0.0).is_err());
        assert!(estimate_case_control(&would_act, &cases, 1.0).is_err());
        assert!(estimate_case_control(&would_act, &cases, f64::NAN).is_err());
    }

    #[test]
    fn test_requires_both_classes() {
        assert!(matches!(
            estimate_case_control(&[true, true], &[true, true], 0.2),
            Err(DcaError::EmptyData(_))
        ));
    }
}
