//! Threshold probability grids.

use crate::error::{DcaError, Result};
use serde::{Deserialize, Serialize};

/// An ordered grid of threshold probabilities.
///
/// Thresholds lie strictly inside the open interval (0, 1) and are strictly
/// increasing. The endpoints are rejected at construction because the odds
/// term `pt / (1 - pt)` is undefined there. The grid is immutable once built
/// and is threaded through an analysis as an explicit value, so concurrent
/// runs never interfere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdGrid {
    thresholds: Vec<f64>,
}

impl ThresholdGrid {
    /// Build a grid from explicit thresholds.
    ///
    /// # Errors
    /// `EmptyThresholdGrid` for an empty sequence; `InvalidParameter` for
    /// values outside (0, 1), non-finite values, or a non-increasing order.
    pub fn new(thresholds: Vec<f64>) -> Result<Self> {
        if thresholds.is_empty() {
            return Err(DcaError::EmptyThresholdGrid);
        }
        for &pt in &thresholds {
            if !pt.is_finite() || pt <= 0.0 || pt >= 1.0 {
                return Err(DcaError::InvalidParameter(format!(
                    "Threshold {} lies outside the open interval (0, 1)",
                    pt
                )));
            }
        }
        if thresholds.windows(2).any(|w| w[1] <= w[0]) {
            return Err(DcaError::InvalidParameter(
                "Thresholds must be strictly increasing".to_string(),
            ));
        }
        Ok(Self { thresholds })
    }

    /// Build an evenly spaced grid over `[start, end]` with the given step.
    ///
    /// Both endpoints must lie in (0, 1). The grid includes every point
    /// `start + k * step` that does not exceed `end`.
    pub fn sweep(start: f64, end: f64, step: f64) -> Result<Self> {
        if !(step.is_finite() && step > 0.0) {
            return Err(DcaError::InvalidParameter(
                "Sweep step must be positive".to_string(),
            ));
        }
        if start > end {
            return Err(DcaError::InvalidParameter(
                "Sweep start must not exceed end".to_string(),
            ));
        }
        let mut thresholds = Vec::new();
        let mut k = 0usize;
        loop {
            let pt = start + k as f64 * step;
            if pt > end + 1e-12 {
                break;
            }
            thresholds.push(pt);
            k += 1;
        }
        Self::new(thresholds)
    }

    /// The default dense sweep: 0.01 through 0.99 in steps of 0.01.
    pub fn default_sweep() -> Self {
        let thresholds = (1..100).map(|i| i as f64 / 100.0).collect();
        Self { thresholds }
    }

    /// The thresholds in ascending order.
    pub fn thresholds(&self) -> &[f64] {
        &self.thresholds
    }

    /// Number of thresholds.
    pub fn len(&self) -> usize {
        self.thresholds.len()
    }

    /// Check if empty (never true for a constructed grid).
    pub fn is_empty(&self) -> bool {
        self.thresholds.is_empty()
    }

    /// A new grid restricted to thresholds in `[min, max]`.
    ///
    /// # Errors
    /// `EmptyThresholdGrid` if no thresholds fall inside the window.
    pub fn restrict(&self, min: f64, max: f64) -> Result<Self> {
        let kept: Vec<f64> = self
            .thresholds
            .iter()
            .copied()
            .filter(|&pt| pt >= min && pt <= max)
            .collect();
        Self::new(kept)
    }
}

impl Default for ThresholdGrid {
    fn default() -> Self {
        Self::default_sweep()
    }
}
