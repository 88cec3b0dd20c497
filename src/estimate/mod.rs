//! Outcome estimators: mapping a would-act rule to true/false-positive
//! fractions.
//!
//! The three outcome regimes share one contract: given a would-act label per
//! subject, estimate the probability that a random subject is a true or false
//! positive under that rule. The regimes form a closed set, so dispatch is an
//! exhaustive match over [`Estimator`] rather than open-ended trait objects.
//!
//! - **binary**: direct counting over the subject set.
//! - **case-control**: sample sensitivity/specificity reweighted by an
//!   externally supplied prevalence.
//! - **survival**: nonparametric cumulative event probability at a fixed
//!   time horizon, per would-act subgroup, with single-event or
//!   competing-risks semantics.

pub mod binary;
pub mod case_control;
pub mod survival;

pub use binary::estimate_binary;
pub use case_control::estimate_case_control;
pub use survival::{
    cumulative_incidence, estimate_survival, km_event_risk, validate_horizon, RiskCurve, RiskStep,
};

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Estimated true/false-positive fractions for one would-act rule.
///
/// `tp + fp` equals the probability of acting; both are on the scale of the
/// full subject set, so they combine directly with the odds term of the net
/// benefit formula.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskFractions {
    /// P(would act and is/will be a case).
    pub tp: f64,
    /// P(would act and is/will not be a case).
    pub fp: f64,
    /// True when a survival estimate was carried forward past the last
    /// observed event time in a subgroup (low confidence).
    pub extrapolated: bool,
}

impl RiskFractions {
    pub(crate) fn new(tp: f64, fp: f64) -> Self {
        Self {
            tp,
            fp,
            extrapolated: false,
        }
    }
}

/// One analysis run's outcome estimator, borrowing the immutable cohort data.
///
/// The regime is selected once per run; every predictor in the run shares it.
#[derive(Debug, Clone)]
pub enum Estimator<'a> {
    Binary {
        outcomes: &'a [bool],
    },
    Survival {
        times: &'a [f64],
        events: &'a [u32],
        time_horizon: f64,
        competing: bool,
        /// Externally modeled per-subject event probability at the horizon
        /// (e.g. from a Cox fit); when absent the estimator derives one
        /// nonparametrically per subgroup.
        subject_risk: Option<&'a [f64]>,
    },
    CaseControl {
        cases: &'a [bool],
        prevalence: f64,
    },
}

impl Estimator<'_> {
    /// Estimate true/false-positive fractions for the given would-act rule.
    pub fn estimate(&self, would_act: &[bool]) -> Result<RiskFractions> {
        match self {
            Self::Binary { outcomes } => estimate_binary(would_act, outcomes),
            Self::Survival {
                times,
                events,
                time_horizon,
                competing,
                subject_risk,
            } => estimate_survival(
                would_act,
                times,
                events,
                *time_horizon,
                *competing,
                *subject_risk,
            ),
            Self::CaseControl { cases, prevalence } => {
                estimate_case_control(would_act, cases, *prevalence)
            }
        }
    }

    /// Fractions for the treat-everyone reference strategy.
    pub fn treat_all(&self) -> Result<RiskFractions> {
        let labels = vec![true; self.n()];
        self.estimate(&labels)
    }

    /// Number of subjects the estimator operates on.
    pub fn n(&self) -> usize {
        match self {
            Self::Binary { outcomes } => outcomes.len(),
            Self::Survival { times, .. } => times.len(),
            Self::CaseControl { cases, .. } => cases.len(),
        }
    }
}
