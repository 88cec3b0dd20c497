//! Composable Decision Curve Analysis (DCA) Library
//!
//! This library quantifies the net clinical benefit of acting on candidate
//! predictors of an outcome, swept across a range of threshold probabilities
//! and compared against the two default strategies: treat everyone and treat
//! no one.
//!
//! # Overview
//!
//! The library is organized into composable modules:
//!
//! - **data**: Core data structures (Cohort, Predictor, result table)
//! - **grid**: Threshold probability grids
//! - **classify**: Score normalization and would-act classification
//! - **estimate**: Outcome estimators (binary, survival, case-control)
//! - **benefit**: Net benefit and net interventions avoided
//! - **smooth**: Local-regression smoothing of net-benefit curves
//! - **analysis**: Run configuration and execution
//!
//! Prediction models are fitted elsewhere: callers supply one score per
//! subject per predictor (a probability, a 0/1 indicator, or a raw score to
//! rescale), and consume the frozen long-format result table.
//!
//! # Example
//!
//! ```
//! use decision_curve::prelude::*;
//!
//! # fn main() -> decision_curve::error::Result<()> {
//! let outcomes = vec![true, true, false, false, false];
//! let cohort = Cohort::new(OutcomeData::Binary(outcomes))?
//!     .with_predictor(Predictor::probability("model", vec![0.9, 0.6, 0.4, 0.2, 0.1]))?;
//!
//! let output = DcaAnalysis::binary()
//!     .with_thresholds(ThresholdGrid::sweep(0.05, 0.50, 0.05)?)
//!     .run(&cohort)?;
//!
//! for row in output.table.for_strategy("model") {
//!     println!("pt = {:.2}  net benefit = {:.4}", row.threshold, row.net_benefit);
//! }
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod benefit;
pub mod classify;
pub mod data;
pub mod error;
pub mod estimate;
pub mod grid;
pub mod smooth;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::analysis::{
        DcaAnalysis, DcaConfig, DcaOutput, Regime, RegimeConfig, RegimeKind, SkippedPredictor,
    };
    pub use crate::benefit::{net_benefit, net_intervention_avoided, threshold_odds, HarmSpec};
    pub use crate::classify::{normalize_scores, would_act};
    pub use crate::data::{
        Cohort, DcaRow, DcaTable, InterventionsAvoided, OutcomeData, Predictor, ScoreKind,
        TableSummary, TREAT_ALL, TREAT_NONE,
    };
    pub use crate::error::{DcaError, Result};
    pub use crate::estimate::{
        cumulative_incidence, estimate_binary, estimate_case_control, estimate_survival,
        km_event_risk, validate_horizon, Estimator, RiskCurve, RiskFractions, RiskStep,
    };
    pub use crate::grid::ThresholdGrid;
    pub use crate::smooth::{smooth_loess, SmoothConfig};
}
