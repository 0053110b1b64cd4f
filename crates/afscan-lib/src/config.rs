use crate::detectors::ppg::{PpgCleanConfig, PpgPeakConfig};
use crate::metrics::hrv::DEFAULT_PNN_X_MS;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("sampling rate must be positive, got {0}")]
    SamplingRate(f64),
    #[error("segment length must be positive, got {0} s")]
    SegmentLength(f64),
    #[error("step length must be positive, got {0} s")]
    StepLength(f64),
    #[error("segment spans {0} samples, at least 2 are needed")]
    SegmentTooShort(usize),
}

/// Classifier thresholds. A window is AF-suspect when all three are exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// normalized RMSSD (RMSSD / mean IBI)
    pub rmssd: f64,
    /// coefficient of variation
    pub cv: f64,
    /// pNNx, in percent
    pub pnnx: f64,
    /// x of pNNx, in milliseconds
    pub pnnx_x_ms: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            rmssd: 0.1,
            cv: 0.1,
            pnnx: 20.0,
            pnnx_x_ms: DEFAULT_PNN_X_MS,
        }
    }
}

/// Operating parameters for one screening run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreeningConfig {
    pub sampling_rate_hz: f64,
    /// Window length (seconds).
    pub segment_s: f64,
    /// Distance between consecutive window starts (seconds).
    pub step_s: f64,
    /// Column holding the PPG samples in subject CSV files.
    pub ppg_column: String,
    pub thresholds: Thresholds,
    pub cleaner: PpgCleanConfig,
    pub peaks: PpgPeakConfig,
}

impl Default for ScreeningConfig {
    fn default() -> Self {
        Self {
            sampling_rate_hz: 125.0,
            segment_s: 30.0,
            step_s: 5.0,
            ppg_column: "PPG".into(),
            thresholds: Thresholds::default(),
            cleaner: PpgCleanConfig::default(),
            peaks: PpgPeakConfig::default(),
        }
    }
}

impl ScreeningConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(text).context("parsing screening config")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.sampling_rate_hz > 0.0) {
            return Err(ConfigError::SamplingRate(self.sampling_rate_hz));
        }
        if !(self.segment_s > 0.0) {
            return Err(ConfigError::SegmentLength(self.segment_s));
        }
        if !(self.step_s > 0.0) {
            return Err(ConfigError::StepLength(self.step_s));
        }
        if self.segment_len() < 2 {
            return Err(ConfigError::SegmentTooShort(self.segment_len()));
        }
        Ok(())
    }

    /// Window length in samples.
    pub fn segment_len(&self) -> usize {
        (self.segment_s * self.sampling_rate_hz).round() as usize
    }

    /// Window step in samples, never below one.
    pub fn step_len(&self) -> usize {
        ((self.step_s * self.sampling_rate_hz).round() as usize).max(1)
    }
}
