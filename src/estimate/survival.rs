//! Survival outcome estimator: nonparametric event risk at a time horizon.
//!
//! Single-event data uses the Kaplan-Meier estimator, reporting the
//! cumulative event probability `1 - S(t)`. Competing-risks data uses the
//! Aalen-Johansen cumulative incidence function for the event of interest:
//! competing events reduce the risk set without contributing to the cause's
//! incidence, which is why the CIF is not `1 - S(t)` whenever competing
//! events occur.

use crate::error::{DcaError, Result};
use crate::estimate::RiskFractions;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

/// One step of a cumulative event-probability curve.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RiskStep {
    /// Event time of the step.
    pub time: f64,
    /// Cumulative event probability at this time.
    pub risk: f64,
    /// Pointwise standard error (Greenwood for Kaplan-Meier, Aalen/delta
    /// accumulation for the cumulative incidence function).
    pub se: f64,
}

/// A right-continuous step function for the cumulative event probability of
/// one subgroup, with one step per distinct event time of the target cause.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskCurve {
    /// Steps in ascending time order.
    pub steps: Vec<RiskStep>,
    /// Subjects the curve was estimated from.
    pub n: usize,
    /// Events of the target cause.
    pub n_events: usize,
}

impl RiskCurve {
    /// Evaluate the curve at time `t`.
    ///
    /// Returns the cumulative event probability together with a flag that is
    /// true when no observed event time reaches `t`, i.e. the value is the
    /// last available estimate carried forward (low confidence).
    pub fn risk_at(&self, t: f64) -> (f64, bool) {
        let risk = self
            .steps
            .iter()
            .take_while(|s| s.time <= t)
            .last()
            .map(|s| s.risk)
            .unwrap_or(0.0);
        let extrapolated = self.steps.last().map(|s| s.time < t).unwrap_or(true);
        (risk, extrapolated)
    }

    /// Normal-approximation confidence bounds at time `t`, clamped to [0, 1].
    pub fn ci_at(&self, t: f64, conf_level: f64) -> Result<(f64, f64)> {
        if !(conf_level > 0.0 && conf_level < 1.0) {
            return Err(DcaError::InvalidParameter(format!(
                "Confidence level must lie in (0, 1), got {}",
                conf_level
            )));
        }
        let normal = Normal::new(0.0, 1.0).unwrap();
        let z = normal.inverse_cdf(1.0 - (1.0 - conf_level) / 2.0);
        let (risk, se) = self
            .steps
            .iter()
            .take_while(|s| s.time <= t)
            .last()
            .map(|s| (s.risk, s.se))
            .unwrap_or((0.0, 0.0));
        Ok(((risk - z * se).max(0.0), (risk + z * se).min(1.0)))
    }
}

/// Sort indices by time ascending, events before censorings at tied times.
fn time_order(times: &[f64], events: &[u32]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..times.len()).collect();
    order.sort_by(|&a, &b| {
        times[a].total_cmp(&times[b]).then_with(|| {
            let ea = u8::from(events[a] == 0);
            let eb = u8::from(events[b] == 0);
            ea.cmp(&eb)
        })
    });
    order
}

/// Kaplan-Meier cumulative event probability, `1 - S(t)`.
///
/// Any non-zero event code counts as the event; with several causes present
/// this is the pooled all-cause risk. Use [`cumulative_incidence`] to single
/// out one cause.
pub fn km_event_risk(times: &[f64], events: &[u32]) -> RiskCurve {
    let n = times.len();
    let order = time_order(times, events);

    let mut steps = Vec::new();
    let mut at_risk = n;
    let mut surv = 1.0_f64;
    let mut var_sum = 0.0_f64; // Greenwood accumulator
    let mut n_events = 0usize;

    let mut i = 0;
    while i < n {
        let t = times[order[i]];
        let mut d = 0usize;
        let mut c = 0usize;
        let mut j = i;
        while j < n && times[order[j]] == t {
            if events[order[j]] > 0 {
                d += 1;
            } else {
                c += 1;
            }
            j += 1;
        }

        if d > 0 && at_risk > 0 {
            let nk = at_risk as f64;
            surv *= 1.0 - d as f64 / nk;
            if at_risk > d {
                var_sum += d as f64 / (nk * (nk - d as f64));
            }
            let se = surv * var_sum.sqrt();
            steps.push(RiskStep {
                time: t,
                risk: 1.0 - surv,
                se,
            });
            n_events += d;
        }

        at_risk -= d + c;
        i = j;
    }

    RiskCurve { steps, n, n_events }
}

/// Aalen-Johansen cumulative incidence for `cause`.
///
/// The CIF increments by `S(t-) * d_cause / n_k` at each event time of the
/// target cause, where `S` is the all-cause Kaplan-Meier survival. Competing
/// events enter `S` (shrinking future increments) but never the target
/// incidence, so they are not pooled into censoring.
pub fn cumulative_incidence(times: &[f64], events: &[u32], cause: u32) -> RiskCurve {
    let n = times.len();
    let order = time_order(times, events);

    let mut steps = Vec::new();
    let mut at_risk = n;
    let mut km_surv = 1.0_f64; // all-cause survival at t-
    let mut cif = 0.0_f64;
    let mut sum_hazard_var = 0.0_f64;
    let mut n_events = 0usize;

    let mut i = 0;
    while i < n {
        let t = times[order[i]];
        let mut d_target = 0usize;
        let mut d_any = 0usize;
        let mut c = 0usize;
        let mut j = i;
        while j < n && times[order[j]] == t {
            let e = events[order[j]];
            if e == 0 {
                c += 1;
            } else {
                d_any += 1;
                if e == cause {
                    d_target += 1;
                }
            }
            j += 1;
        }

        let nk = at_risk as f64;
        if d_target > 0 && at_risk > 0 {
            let h_target = d_target as f64 / nk;
            cif += km_surv * h_target;
            n_events += d_target;

            if at_risk > d_any {
                sum_hazard_var += d_any as f64 / (nk * (nk - d_any as f64));
            }
            let var =
                cif * cif * sum_hazard_var + km_surv * km_surv * h_target * (1.0 - h_target) / nk;
            steps.push(RiskStep {
                time: t,
                risk: cif.min(1.0),
                se: var.max(0.0).sqrt(),
            });
        } else if d_any > 0 && at_risk > d_any {
            sum_hazard_var += d_any as f64 / (nk * (nk - d_any as f64));
        }

        if d_any > 0 && at_risk > 0 {
            km_surv *= 1.0 - d_any as f64 / nk;
        }

        at_risk -= d_any + c;
        i = j;
    }

    RiskCurve { steps, n, n_events }
}

/// Validate a time horizon against the cohort's follow-up.
///
/// # Errors
/// `InvalidTimeHorizon` when the horizon is non-positive or non-finite, or
/// when fewer than `min_at_risk` subjects remain under observation at the
/// horizon (the horizon exceeds the observed follow-up).
pub fn validate_horizon(times: &[f64], time_horizon: f64, min_at_risk: usize) -> Result<()> {
    if !(time_horizon.is_finite() && time_horizon > 0.0) {
        return Err(DcaError::InvalidTimeHorizon(format!(
            "horizon must be positive and finite, got {}",
            time_horizon
        )));
    }
    let at_risk = times.iter().filter(|&&t| t >= time_horizon).count();
    if at_risk < min_at_risk {
        return Err(DcaError::InvalidTimeHorizon(format!(
            "horizon {} exceeds the observed follow-up ({} at risk, {} required)",
            time_horizon, at_risk, min_at_risk
        )));
    }
    Ok(())
}

/// Estimate true/false-positive fractions for a time-to-event outcome.
///
/// The event probability by `time_horizon` is estimated within the would-act
/// subgroup: nonparametrically (Kaplan-Meier, or Aalen-Johansen when
/// `competing` is set), or as the subgroup mean of `subject_risk` when a
/// per-subject estimate is supplied externally. The fractions are
///
/// ```text
/// TP/n = P(act) * risk_acted(time_horizon)
/// FP/n = P(act) * (1 - risk_acted(time_horizon))
/// ```
///
/// Under competing risks the event of interest is the first non-censoring
/// code encountered in subject order. An estimate carried forward past the
/// subgroup's last observed event time is flagged, not failed.
pub fn estimate_survival(
    would_act: &[bool],
    times: &[f64],
    events: &[u32],
    time_horizon: f64,
    competing: bool,
    subject_risk: Option<&[f64]>,
) -> Result<RiskFractions> {
    let n = times.len();
    if would_act.len() != n {
        return Err(DcaError::MismatchedLength {
            expected: n,
            actual: would_act.len(),
        });
    }
    if events.len() != n {
        return Err(DcaError::MismatchedLength {
            expected: n,
            actual: events.len(),
        });
    }
    if n == 0 {
        return Err(DcaError::EmptyData(
            "Survival estimator requires at least one subject".to_string(),
        ));
    }
    if !(time_horizon.is_finite() && time_horizon > 0.0) {
        return Err(DcaError::InvalidTimeHorizon(format!(
            "horizon must be positive and finite, got {}",
            time_horizon
        )));
    }

    let n_act = would_act.iter().filter(|&&a| a).count();
    if n_act == 0 {
        return Ok(RiskFractions::new(0.0, 0.0));
    }
    let p_act = n_act as f64 / n as f64;

    let (risk, extrapolated) = match subject_risk {
        Some(risk) => {
            if risk.len() != n {
                return Err(DcaError::MismatchedLength {
                    expected: n,
                    actual: risk.len(),
                });
            }
            if risk.iter().any(|r| !(0.0..=1.0).contains(r)) {
                return Err(DcaError::InvalidParameter(
                    "Subject-level event probabilities must lie in [0, 1]".to_string(),
                ));
            }
            let sum: f64 = risk
                .iter()
                .zip(would_act)
                .filter(|(_, &a)| a)
                .map(|(&r, _)| r)
                .sum();
            (sum / n_act as f64, false)
        }
        None => {
            let sub_times: Vec<f64> = times
                .iter()
                .zip(would_act)
                .filter(|(_, &a)| a)
                .map(|(&t, _)| t)
                .collect();
            let sub_events: Vec<u32> = events
                .iter()
                .zip(would_act)
                .filter(|(_, &a)| a)
                .map(|(&e, _)| e)
                .collect();
            let curve = if competing {
                let cause = events.iter().copied().find(|&e| e > 0).ok_or_else(|| {
                    DcaError::EmptyData("No events observed in the survival data".to_string())
                })?;
                cumulative_incidence(&sub_times, &sub_events, cause)
            } else {
                km_event_risk(&sub_times, &sub_events)
            };
            curve.risk_at(time_horizon)
        }
    };

    Ok(RiskFractions {
        tp: p_act * risk,
        fp: p_act * (1.0 - risk),
        extrapolated,
    })
}
