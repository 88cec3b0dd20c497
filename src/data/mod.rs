//! Core data structures: cohorts, predictors, and result tables.

pub mod cohort;
pub mod predictor;
pub mod result;

pub use cohort::{Cohort, OutcomeData};
pub use predictor::{Predictor, ScoreKind};
pub use result::{
    DcaRow, DcaTable, InterventionsAvoided, TableSummary, TREAT_ALL, TREAT_NONE,
};
