//! Signal-processing collaborators used by the interval extractor.

pub mod ppg;

use crate::signal::Events;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reason a cleaner refuses to vouch for its output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QualityWarning {
    NonFiniteSamples { count: usize },
    SamplingRateTooLow { fs: f64, min_fs: f64 },
    TooShort { samples: usize, min_samples: usize },
    FlatSignal,
    /// Too little band-passed power in the cardiac band: noise rather than a pulse.
    NoPulse { cardiac_power_ratio: f64, min_ratio: f64 },
}

impl fmt::Display for QualityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualityWarning::NonFiniteSamples { count } => {
                write!(f, "{count} missing or non-finite samples")
            }
            QualityWarning::SamplingRateTooLow { fs, min_fs } => {
                write!(f, "sampling rate {fs} Hz is too low, need more than {min_fs} Hz")
            }
            QualityWarning::TooShort {
                samples,
                min_samples,
            } => write!(f, "{samples} samples, at least {min_samples} needed"),
            QualityWarning::FlatSignal => write!(f, "signal is flat"),
            QualityWarning::NoPulse {
                cardiac_power_ratio,
                min_ratio,
            } => write!(
                f,
                "no pulse: {:.0}% of power in the cardiac band, need {:.0}%",
                cardiac_power_ratio * 100.0,
                min_ratio * 100.0
            ),
        }
    }
}

/// Cleaner output: filtered samples plus any quality warnings raised on the way.
#[derive(Debug, Clone, Default)]
pub struct CleanedSignal {
    pub data: Vec<f64>,
    pub warnings: Vec<QualityWarning>,
}

impl CleanedSignal {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Removes noise/baseline from a raw segment.
pub trait SignalCleaner {
    fn clean(&self, samples: &[f64], fs: f64) -> Result<CleanedSignal>;
}

/// Locates beats in a cleaned segment. Indices must be strictly increasing.
pub trait PeakDetector {
    fn detect_peaks(&self, cleaned: &[f64], fs: f64) -> Result<Events>;
}
