//! Local-regression smoothing of net-benefit curves.
//!
//! Smoothing is opt-in and purely presentational: the smoothed series only
//! annotates the raw one, because a smoothed curve can cross strategy
//! boundaries inaccurately. The raw curve remains the source of truth for
//! any decision.

use crate::error::{DcaError, Result};
use nalgebra::{Matrix2, Vector2};
use serde::{Deserialize, Serialize};

/// Configuration for the local-regression smoother.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SmoothConfig {
    /// Fraction of points used in each local fit, in (0, 1].
    pub span: f64,
    /// Series shorter than this are returned unchanged.
    pub min_points: usize,
}

impl Default for SmoothConfig {
    fn default() -> Self {
        Self {
            span: 0.25,
            min_points: 3,
        }
    }
}

impl SmoothConfig {
    /// A configuration with the given span and the default minimum length.
    pub fn with_span(span: f64) -> Self {
        Self {
            span,
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<()> {
        if !(self.span.is_finite() && self.span > 0.0 && self.span <= 1.0) {
            return Err(DcaError::InvalidParameter(format!(
                "Smoothing span must lie in (0, 1], got {}",
                self.span
            )));
        }
        Ok(())
    }
}

/// Tricube-weighted local linear regression over an ordered series.
///
/// For each point, the `span` fraction of nearest neighbors (by distance in
/// `x`) receives tricube weights and a weighted linear fit is evaluated at
/// that point. Series shorter than `min_points` are returned unchanged
/// rather than failing. A singular local fit (e.g. duplicated `x`) falls
/// back to the weighted mean.
pub fn smooth_loess(x: &[f64], y: &[f64], config: &SmoothConfig) -> Result<Vec<f64>> {
    config.validate()?;
    if x.len() != y.len() {
        return Err(DcaError::MismatchedLength {
            expected: x.len(),
            actual: y.len(),
        });
    }
    let n = x.len();
    if n < config.min_points {
        return Ok(y.to_vec());
    }

    let k = ((config.span * n as f64).ceil() as usize).clamp(2, n);
    let mut fitted = Vec::with_capacity(n);

    for i in 0..n {
        // k nearest neighbors of x[i].
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| {
            (x[a] - x[i])
                .abs()
                .total_cmp(&(x[b] - x[i]).abs())
        });
        let neighbors = &order[..k];
        let dmax = (x[neighbors[k - 1]] - x[i]).abs();

        if dmax == 0.0 {
            // All neighbors share x[i]; the local fit is their mean.
            let mean = neighbors.iter().map(|&j| y[j]).sum::<f64>() / k as f64;
            fitted.push(mean);
            continue;
        }

        let mut sw = 0.0;
        let mut swx = 0.0;
        let mut swxx = 0.0;
        let mut swy = 0.0;
        let mut swxy = 0.0;
        for &j in neighbors {
            let d = ((x[j] - x[i]).abs() / dmax).min(1.0);
            let w = (1.0 - d * d * d).powi(3);
            sw += w;
            swx += w * x[j];
            swxx += w * x[j] * x[j];
            swy += w * y[j];
            swxy += w * x[j] * y[j];
        }

        let a = Matrix2::new(sw, swx, swx, swxx);
        let b = Vector2::new(swy, swxy);
        let value = match a.lu().solve(&b) {
            Some(beta) => beta[0] + beta[1] * x[i],
            None => swy / sw,
        };
        fitted.push(value);
    }

    Ok(fitted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_short_series_is_noop() {
        let config = SmoothConfig::default();
        let x = vec![0.1, 0.2];
        let y = vec![1.0, -1.0];
        assert_eq!(smooth_loess(&x, &y, &config).unwrap(), y);
    }

    #[test]
    fn test_linear_series_reproduced_exactly() {
        // A local linear fit reproduces a line regardless of the weights.
        let config = SmoothConfig::with_span(0.5);
        let x: Vec<f64> = (1..=20).map(|i| i as f64 / 20.0).collect();
        let y: Vec<f64> = x.iter().map(|&v| 2.0 * v - 0.3).collect();
        let smoothed = smooth_loess(&x, &y, &config).unwrap();
        for (s, t) in smoothed.iter().zip(&y) {
            assert_relative_eq!(s, t, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_noise_is_attenuated() {
        let config = SmoothConfig::with_span(0.5);
        let x: Vec<f64> = (1..=50).map(|i| i as f64 / 50.0).collect();
        // Deterministic noise around a line.
        let mut seed = 42u64;
        let mut noise = || {
            seed = seed.wrapping_mul(1103515245).wrapping_add(12345);
            ((seed >> 16) & 0x7FFF) as f64 / 32768.0 - 0.5
        };
        let y: Vec<f64> = x.iter().map(|&v| v + 0.2 * noise()).collect();
        let smoothed = smooth_loess(&x, &y, &config).unwrap();

        let sq = |series: &[f64]| -> f64 {
            series
                .iter()
                .zip(&x)
                .map(|(s, &v)| (s - v) * (s - v))
                .sum::<f64>()
        };
        assert!(sq(&smoothed) < sq(&y));
    }

    #[test]
    fn test_same_length_output() {
        let config = SmoothConfig::default();
        let x: Vec<f64> = (1..=30).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|&v| v.sin()).collect();
        assert_eq!(smooth_loess(&x, &y, &config).unwrap().len(), 30);
    }

    #[test]
    fn test_invalid_span() {
        let x = vec![1.0, 2.0, 3.0];
        let y = vec![1.0, 2.0, 3.0];
        assert!(smoo_err(&x, &y, 0.0));
        assert!(smoo_err(&x, &y, 1.5));
    }

    fn smoo_err(x: &[f64], y: &[f64], span: f64) -> bool {
        smooth_loess(x, y, &SmoothConfig::with_span(span)).is_err()
    }

    #[test]
    fn test_length_mismatch() {
        let config = SmoothConfig::default();
        assert!(matches!(
            smooth_loess(&[1.0, 2.0, 3.0], &[1.0], &config),
            Err(DcaError::MismatchedLength { .. })
        ));
    }
}
