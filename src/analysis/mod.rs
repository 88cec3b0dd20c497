//! Analysis configuration and execution.

mod runner;

pub use runner::{
    DcaAnalysis, DcaConfig, DcaOutput, Regime, RegimeConfig, RegimeKind, SkippedPredictor,
};
