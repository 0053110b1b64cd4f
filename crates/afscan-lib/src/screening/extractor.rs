use crate::config::ScreeningConfig;
use crate::detectors::ppg::{PpgCleaner, PpgPeakDetector};
use crate::detectors::{PeakDetector, QualityWarning, SignalCleaner};
use crate::signal::IbiSeries;
use thiserror::Error;

/// Why a segment produced no IBI series.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExtractionError {
    #[error("signal quality rejected: {}", join_warnings(.0))]
    QualityRejected(Vec<QualityWarning>),
    #[error("cleaning failed: {0}")]
    CleaningFailed(String),
    #[error("peak detection failed: {0}")]
    PeakDetectionFailed(String),
    #[error("peak indices are not strictly increasing")]
    UnorderedPeaks,
    #[error("peak index {index} lies outside a {len}-sample segment")]
    PeakOutOfRange { index: usize, len: usize },
}

impl ExtractionError {
    /// True when a collaborator misbehaved, as opposed to refusing noisy input.
    pub fn is_collaborator_failure(&self) -> bool {
        !matches!(self, ExtractionError::QualityRejected(_))
    }
}

fn join_warnings(warnings: &[QualityWarning]) -> String {
    warnings
        .iter()
        .map(|w| w.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Turns raw segment samples into inter-beat intervals.
#[derive(Debug, Clone)]
pub struct IntervalExtractor<C, P> {
    cleaner: C,
    detector: P,
}

impl IntervalExtractor<PpgCleaner, PpgPeakDetector> {
    pub fn ppg(cfg: &ScreeningConfig) -> Self {
        Self::new(PpgCleaner::new(cfg.cleaner), PpgPeakDetector::new(cfg.peaks))
    }
}

impl<C: SignalCleaner, P: PeakDetector> IntervalExtractor<C, P> {
    pub fn new(cleaner: C, detector: P) -> Self {
        Self { cleaner, detector }
    }

    pub fn extract(&self, samples: &[f64], fs: f64) -> Result<IbiSeries, ExtractionError> {
        let cleaned = self
            .cleaner
            .clean(samples, fs)
            .map_err(|e| ExtractionError::CleaningFailed(format!("{e:#}")))?;
        if !cleaned.is_clean() {
            return Err(ExtractionError::QualityRejected(cleaned.warnings));
        }

        let events = self
            .detector
            .detect_peaks(&cleaned.data, fs)
            .map_err(|e| ExtractionError::PeakDetectionFailed(format!("{e:#}")))?;
        if !events.is_strictly_increasing() {
            return Err(ExtractionError::UnorderedPeaks);
        }
        if let Some(&index) = events.indices.iter().find(|&&i| i >= cleaned.data.len()) {
            return Err(ExtractionError::PeakOutOfRange {
                index,
                len: cleaned.data.len(),
            });
        }
        Ok(IbiSeries::from_events(&events, fs))
    }
}
