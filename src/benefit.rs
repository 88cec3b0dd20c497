//! Net benefit and net interventions avoided.

use crate::error::{DcaError, Result};
use crate::estimate::RiskFractions;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The odds of a threshold probability, `pt / (1 - pt)`.
///
/// Thresholds come from a validated grid, so `pt` lies strictly inside
/// (0, 1) and the odds are finite.
pub fn threshold_odds(pt: f64) -> f64 {
    pt / (1.0 - pt)
}

/// Net benefit of a would-act rule at threshold `pt`:
///
/// ```text
/// net_benefit = TP/n - FP/n * pt / (1 - pt) - harm
/// ```
///
/// in units of net true positives per subject, comparable across every
/// strategy at the same threshold. `harm` is the fixed per-subject cost of
/// acting; it is suppressed when the rule acts on nobody (`TP + FP == 0`),
/// so a harm change never moves a strategy with an empty would-act set. For
/// conditional multi-stage strategies the caller pre-scales harm to
/// `P(tested) * harm_per_test`; the calculator stays strategy-agnostic.
pub fn net_benefit(fractions: &RiskFractions, pt: f64, harm: f64) -> f64 {
    let applied_harm = if fractions.tp + fractions.fp > 0.0 {
        harm
    } else {
        0.0
    };
    fractions.tp - fractions.fp * threshold_odds(pt) - applied_harm
}

/// Net benefit re-expressed against the treat-all strategy:
///
/// ```text
/// net_intervention_avoided = (net_benefit - net_benefit_treat_all) / odds
/// ```
///
/// in units of subjects who avoid an unnecessary intervention.
pub fn net_intervention_avoided(nb: f64, nb_treat_all: f64, pt: f64) -> f64 {
    (nb - nb_treat_all) / threshold_odds(pt)
}

/// Per-predictor fixed cost of acting (e.g. the cost of a test), applied
/// uniformly to every would-act subject at every threshold. Defaults to 0
/// for predictors with no entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HarmSpec {
    harms: HashMap<String, f64>,
}

impl HarmSpec {
    /// An empty specification (all harms 0).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the harm for a predictor.
    ///
    /// # Errors
    /// `InvalidParameter` for a negative or non-finite harm.
    pub fn set(&mut self, predictor: impl Into<String>, harm: f64) -> Result<()> {
        if !(harm.is_finite() && harm >= 0.0) {
            return Err(DcaError::InvalidParameter(format!(
                "Harm must be nonnegative and finite, got {}",
                harm
            )));
        }
        self.harms.insert(predictor.into(), harm);
        Ok(())
    }

    /// The harm for a predictor, 0 when unset.
    pub fn get(&self, predictor: &str) -> f64 {
        self.harms.get(predictor).copied().unwrap_or(0.0)
    }

    /// Check if any harm has been specified.
    pub fn is_empty(&self) -> bool {
        self.harms.is_empty()
    }
}

impl FromIterator<(String, f64)> for HarmSpec {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self {
            harms: iter.into_iter().collect(),
        }
    }
}
