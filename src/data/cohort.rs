//! Subject-level data for a single analysis run.

use crate::data::Predictor;
use crate::error::{DcaError, Result};
use serde::{Deserialize, Serialize};

/// Outcome observations for every subject, one variant per outcome regime.
///
/// Outcome values cannot be missing: the containers are dense and validated
/// at construction. Predictor scores may be missing per-subject instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutcomeData {
    /// Event occurred / did not.
    Binary(Vec<bool>),
    /// Observed follow-up time plus event code. Code 0 is censoring; positive
    /// codes are event causes (a single cause, or several under competing
    /// risks).
    Survival { times: Vec<f64>, events: Vec<u32> },
    /// Case (true) / control (false) sampling indicator.
    CaseControl(Vec<bool>),
}

impl OutcomeData {
    /// Number of subjects.
    pub fn len(&self) -> usize {
        match self {
            Self::Binary(o) => o.len(),
            Self::Survival { times, .. } => times.len(),
            Self::CaseControl(o) => o.len(),
        }
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The event of interest under competing risks: the first non-censoring
    /// event code in subject order.
    pub fn event_of_interest(&self) -> Option<u32> {
        match self {
            Self::Survival { events, .. } => events.iter().copied().find(|&e| e > 0),
            _ => None,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(DcaError::EmptyData(
                "Outcome data has no subjects".to_string(),
            ));
        }
        if let Self::Survival { times, events } = self {
            if times.len() != events.len() {
                return Err(DcaError::MismatchedLength {
                    expected: times.len(),
                    actual: events.len(),
                });
            }
            if times.iter().any(|t| !t.is_finite() || *t < 0.0) {
                return Err(DcaError::InvalidParameter(
                    "Follow-up times must be finite and nonnegative".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// A cohort: outcome observations plus the predictors under evaluation.
///
/// All entities are created fresh per analysis invocation; the cohort is
/// read-only during a run and shared safely across parallel estimators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cohort {
    outcome: OutcomeData,
    predictors: Vec<Predictor>,
}

impl Cohort {
    /// Create a cohort from validated outcome data.
    pub fn new(outcome: OutcomeData) -> Result<Self> {
        outcome.validate()?;
        Ok(Self {
            outcome,
            predictors: Vec::new(),
        })
    }

    /// Add a predictor, validating its length against the cohort.
    pub fn add_predictor(&mut self, predictor: Predictor) -> Result<()> {
        if predictor.len() != self.n() {
            return Err(DcaError::MismatchedLength {
                expected: self.n(),
                actual: predictor.len(),
            });
        }
        if self.predictors.iter().any(|p| p.name == predictor.name) {
            return Err(DcaError::InvalidParameter(format!(
                "Duplicate predictor name '{}'",
                predictor.name
            )));
        }
        self.predictors.push(predictor);
        Ok(())
    }

    /// Builder-style variant of [`add_predictor`](Self::add_predictor).
    pub fn with_predictor(mut self, predictor: Predictor) -> Result<Self> {
        self.add_predictor(predictor)?;
        Ok(self)
    }

    /// Number of subjects.
    pub fn n(&self) -> usize {
        self.outcome.len()
    }

    /// The outcome observations.
    pub fn outcome(&self) -> &OutcomeData {
        &self.outcome
    }

    /// The predictors in insertion order.
    pub fn predictors(&self) -> &[Predictor] {
        &self.predictors
    }

    /// Look up a predictor by name.
    pub fn predictor(&self, name: &str) -> Option<&Predictor> {
        self.predictors.iter().find(|p| p.name == name)
    }
}
