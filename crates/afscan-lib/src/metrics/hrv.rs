//! Time-domain HRV features over an IBI series (milliseconds).
//!
//! Every function needs at least two intervals. The dispersion features divide
//! by the mean interval and refuse a zero mean instead of producing NaN.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Successive-difference threshold (ms) used by pNN50.
pub const DEFAULT_PNN_X_MS: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum FeatureError {
    #[error("at least 2 intervals are required, got {0}")]
    TooFewIntervals(usize),
    #[error("mean inter-beat interval is zero")]
    ZeroMeanInterval,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HrvFeatures {
    pub n: usize,
    pub mean_ibi_ms: f64,
    pub rmssd_ms: f64,
    pub normalized_rmssd: f64,
    pub cv: f64,
    pub pnnx: f64,
    pub pnnx_x_ms: f64,
}

impl HrvFeatures {
    pub fn compute(ibi: &[f64], x_ms: f64) -> Result<Self, FeatureError> {
        let rmssd_ms = rmssd(ibi)?;
        let mean_ibi_ms = nonzero_mean(ibi)?;
        Ok(Self {
            n: ibi.len(),
            mean_ibi_ms,
            rmssd_ms,
            normalized_rmssd: rmssd_ms / mean_ibi_ms,
            cv: coefficient_of_variation(ibi)?,
            pnnx: pnnx(ibi, x_ms)?,
            pnnx_x_ms: x_ms,
        })
    }
}

fn ensure_len(ibi: &[f64]) -> Result<(), FeatureError> {
    if ibi.len() < 2 {
        Err(FeatureError::TooFewIntervals(ibi.len()))
    } else {
        Ok(())
    }
}

fn mean(ibi: &[f64]) -> f64 {
    ibi.iter().sum::<f64>() / ibi.len() as f64
}

fn nonzero_mean(ibi: &[f64]) -> Result<f64, FeatureError> {
    ensure_len(ibi)?;
    let m = mean(ibi);
    if m == 0.0 {
        return Err(FeatureError::ZeroMeanInterval);
    }
    Ok(m)
}

fn successive_diffs(ibi: &[f64]) -> impl Iterator<Item = f64> + '_ {
    ibi.windows(2).map(|w| w[1] - w[0])
}

/// Root mean square of successive differences.
pub fn rmssd(ibi: &[f64]) -> Result<f64, FeatureError> {
    ensure_len(ibi)?;
    let sum_sq: f64 = successive_diffs(ibi).map(|d| d * d).sum();
    Ok((sum_sq / (ibi.len() - 1) as f64).sqrt())
}

/// RMSSD divided by the mean interval.
pub fn normalized_rmssd(ibi: &[f64]) -> Result<f64, FeatureError> {
    let r = rmssd(ibi)?;
    Ok(r / nonzero_mean(ibi)?)
}

/// Population standard deviation (divide by N) over the mean interval.
pub fn coefficient_of_variation(ibi: &[f64]) -> Result<f64, FeatureError> {
    let m = nonzero_mean(ibi)?;
    let var = ibi.iter().map(|x| (x - m).powi(2)).sum::<f64>() / ibi.len() as f64;
    Ok(var.sqrt() / m)
}

/// Percentage of successive differences whose magnitude exceeds `x_ms`.
pub fn pnnx(ibi: &[f64], x_ms: f64) -> Result<f64, FeatureError> {
    ensure_len(ibi)?;
    let count = successive_diffs(ibi).filter(|d| d.abs() > x_ms).count();
    Ok(100.0 * count as f64 / (ibi.len() - 1) as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    const IRREGULAR: [f64; 5] = [600.0, 900.0, 500.0, 950.0, 550.0];

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        let diff = (actual - expected).abs();
        assert!(
            diff <= tol,
            "expected {expected}, got {actual} (diff {diff} > tol {tol})"
        );
    }

    #[test]
    fn constant_rhythm_has_no_variability() {
        let ibi = [1000.0; 4];
        assert_eq!(rmssd(&ibi).unwrap(), 0.0);
        assert_eq!(normalized_rmssd(&ibi).unwrap(), 0.0);
        assert_eq!(coefficient_of_variation(&ibi).unwrap(), 0.0);
        assert_eq!(pnnx(&ibi, DEFAULT_PNN_X_MS).unwrap(), 0.0);
    }

    #[test]
    fn irregular_rhythm_reference_values() {
        let r = rmssd(&IRREGULAR).unwrap();
        assert_close(r, (612_500.0f64 / 4.0).sqrt(), 1e-9);
        assert_close(r, 391.31, 0.01);
        assert_close(normalized_rmssd(&IRREGULAR).unwrap(), 0.559, 1e-3);
        assert_close(coefficient_of_variation(&IRREGULAR).unwrap(), 0.267, 1e-3);
        assert_eq!(pnnx(&IRREGULAR, 50.0).unwrap(), 100.0);
    }

    #[test]
    fn cv_uses_population_deviation() {
        // population std of [1, 3] is 1, sample std would be sqrt(2)
        assert_close(coefficient_of_variation(&[1.0, 3.0]).unwrap(), 0.5, 1e-12);
    }

    #[test]
    fn normalized_rmssd_is_rmssd_over_mean() {
        for ibi in [
            vec![812.0, 790.0, 845.0, 801.0],
            IRREGULAR.to_vec(),
            vec![400.0, 1200.0],
        ] {
            let expected = rmssd(&ibi).unwrap() / mean(&ibi);
            assert_eq!(normalized_rmssd(&ibi).unwrap(), expected);
        }
    }

    #[test]
    fn pnnx_is_non_increasing_in_x() {
        let ibi = [700.0, 760.0, 690.0, 900.0, 880.0, 1010.0, 640.0];
        let mut prev = f64::INFINITY;
        for x in (0..400).step_by(5) {
            let value = pnnx(&ibi, x as f64).unwrap();
            assert!(value <= prev, "pNN{x} = {value} rose above {prev}");
            prev = value;
        }
    }

    #[test]
    fn pnnx_bounds() {
        let small_steps = [800.0, 820.0, 810.0, 850.0];
        assert_eq!(pnnx(&small_steps, 40.0).unwrap(), 0.0);
        // equality does not count
        assert_eq!(pnnx(&small_steps, 40.0 - 1e-9).unwrap(), 100.0 / 3.0);
        let big_steps = [600.0, 700.0, 580.0, 660.0];
        assert_eq!(pnnx(&big_steps, 50.0).unwrap(), 100.0);
    }

    #[test]
    fn short_series_is_rejected() {
        assert_eq!(rmssd(&[]), Err(FeatureError::TooFewIntervals(0)));
        assert_eq!(pnnx(&[800.0], 50.0), Err(FeatureError::TooFewIntervals(1)));
        assert_eq!(
            HrvFeatures::compute(&[800.0], 50.0),
            Err(FeatureError::TooFewIntervals(1))
        );
    }

    #[test]
    fn zero_mean_is_a_degenerate_input() {
        let ibi = [0.0, 0.0, 0.0];
        assert_eq!(normalized_rmssd(&ibi), Err(FeatureError::ZeroMeanInterval));
        assert_eq!(
            coefficient_of_variation(&ibi),
            Err(FeatureError::ZeroMeanInterval)
        );
        assert_eq!(rmssd(&ibi), Ok(0.0));
    }

    #[test]
    fn feature_vector_bundles_all_metrics() {
        let f = HrvFeatures::compute(&IRREGULAR, 50.0).unwrap();
        assert_eq!(f.n, 5);
        assert_close(f.mean_ibi_ms, 700.0, 1e-9);
        assert_close(f.normalized_rmssd, f.rmssd_ms / 700.0, 1e-12);
        assert_eq!(f.pnnx, 100.0);
        assert_eq!(f.pnnx_x_ms, 50.0);
    }
}
