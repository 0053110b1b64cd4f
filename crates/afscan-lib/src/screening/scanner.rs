use super::classifier::{AfFlags, Classification, Classifier};
use super::extractor::{ExtractionError, IntervalExtractor};
use crate::config::{ConfigError, ScreeningConfig};
use crate::detectors::ppg::{PpgCleaner, PpgPeakDetector};
use crate::detectors::{PeakDetector, SignalCleaner};
use crate::metrics::hrv::{FeatureError, HrvFeatures};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

/// Fixed-length window over a recording.
#[derive(Debug, Clone, Copy)]
pub struct Segment<'a> {
    /// Offset of the first sample.
    pub start: usize,
    pub samples: &'a [f64],
}

/// Full-length windows at `0, step, 2 * step, ...`. The shorter tail is never produced.
#[derive(Debug, Clone)]
pub struct Segments<'a> {
    data: &'a [f64],
    segment_len: usize,
    step: usize,
    next: usize,
}

pub fn segments(data: &[f64], segment_len: usize, step: usize) -> Segments<'_> {
    Segments {
        data,
        segment_len,
        step: step.max(1),
        next: 0,
    }
}

impl<'a> Iterator for Segments<'a> {
    type Item = Segment<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.next;
        let end = start.checked_add(self.segment_len)?;
        if end > self.data.len() {
            return None;
        }
        self.next = start.saturating_add(self.step);
        Some(Segment {
            start,
            samples: &self.data[start..end],
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    TooFewSamples(usize),
    Extraction(ExtractionError),
    InsufficientIntervals(usize),
    DegenerateFeatures(FeatureError),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::TooFewSamples(n) => write!(f, "segment holds only {n} samples"),
            SkipReason::Extraction(e) => write!(f, "{e}"),
            SkipReason::InsufficientIntervals(n) => write!(f, "insufficient IBI data ({n} intervals)"),
            SkipReason::DegenerateFeatures(e) => write!(f, "degenerate features: {e}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WindowVerdict {
    Classified(Classification),
    Skipped(SkipReason),
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindowOutcome {
    pub start: usize,
    pub start_s: f64,
    pub verdict: WindowVerdict,
}

impl WindowOutcome {
    pub fn is_af(&self) -> bool {
        matches!(&self.verdict, WindowVerdict::Classified(c) if c.af_detected)
    }
}

/// First AF-suspect window of a subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub subject_id: String,
    /// Window start, in samples.
    pub segment_start: usize,
    pub segment_start_s: f64,
    pub af_detected: bool,
    pub flags: AfFlags,
    pub features: HrvFeatures,
}

/// Terminal state of a subject scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ScanOutcome {
    Found(Detection),
    Exhausted {
        subject_id: String,
        windows_visited: usize,
    },
}

impl ScanOutcome {
    pub fn detection(&self) -> Option<&Detection> {
        match self {
            ScanOutcome::Found(d) => Some(d),
            ScanOutcome::Exhausted { .. } => None,
        }
    }
}

/// Slides the extractor and classifier over one subject's recording.
#[derive(Debug, Clone)]
pub struct Scanner<C, P> {
    extractor: IntervalExtractor<C, P>,
    classifier: Classifier,
    fs: f64,
    segment_len: usize,
    step_len: usize,
}

impl Scanner<PpgCleaner, PpgPeakDetector> {
    pub fn ppg(cfg: &ScreeningConfig) -> Result<Self, ConfigError> {
        Self::new(cfg, IntervalExtractor::ppg(cfg))
    }
}

impl<C: SignalCleaner, P: PeakDetector> Scanner<C, P> {
    pub fn new(cfg: &ScreeningConfig, extractor: IntervalExtractor<C, P>) -> Result<Self, ConfigError> {
        cfg.validate()?;
        Ok(Self {
            extractor,
            classifier: Classifier::new(cfg.thresholds),
            fs: cfg.sampling_rate_hz,
            segment_len: cfg.segment_len(),
            step_len: cfg.step_len(),
        })
    }

    pub fn segment_len(&self) -> usize {
        self.segment_len
    }

    pub fn step_len(&self) -> usize {
        self.step_len
    }

    pub fn evaluate(&self, segment: Segment<'_>) -> WindowOutcome {
        let verdict = if segment.samples.len() < 2 {
            WindowVerdict::Skipped(SkipReason::TooFewSamples(segment.samples.len()))
        } else {
            match self.extractor.extract(segment.samples, self.fs) {
                Err(e) => WindowVerdict::Skipped(SkipReason::Extraction(e)),
                Ok(ibi) if ibi.len() < 2 => {
                    WindowVerdict::Skipped(SkipReason::InsufficientIntervals(ibi.len()))
                }
                Ok(ibi) => match self.classifier.classify(ibi.as_slice()) {
                    Ok(c) => WindowVerdict::Classified(c),
                    Err(e) => WindowVerdict::Skipped(SkipReason::DegenerateFeatures(e)),
                },
            }
        };
        WindowOutcome {
            start: segment.start,
            start_s: segment.start as f64 / self.fs,
            verdict,
        }
    }

    /// Every window of the recording in order, with its verdict or skip reason.
    pub fn windows<'a>(
        &'a self,
        subject_id: &'a str,
        samples: &'a [f64],
    ) -> impl Iterator<Item = WindowOutcome> + 'a {
        segments(samples, self.segment_len, self.step_len)
            .map(move |segment| self.evaluate(segment))
            .inspect(move |outcome| log_outcome(subject_id, outcome))
    }

    /// Stops at the first AF-suspect window.
    pub fn scan(&self, subject_id: &str, samples: &[f64]) -> ScanOutcome {
        let mut visited = 0usize;
        let found = self
            .windows(subject_id, samples)
            .inspect(|_| visited += 1)
            .find_map(|outcome| match outcome.verdict {
                WindowVerdict::Classified(c) if c.af_detected => Some((outcome.start, outcome.start_s, c)),
                _ => None,
            });
        match found {
            Some((segment_start, segment_start_s, c)) => {
                info!(
                    "AF detected in {} at segment starting {} seconds",
                    subject_id, segment_start_s
                );
                ScanOutcome::Found(Detection {
                    subject_id: subject_id.to_string(),
                    segment_start,
                    segment_start_s,
                    af_detected: c.af_detected,
                    flags: c.flags,
                    features: c.features,
                })
            }
            None => {
                debug!("{}: no AF-suspect window in {} windows", subject_id, visited);
                ScanOutcome::Exhausted {
                    subject_id: subject_id.to_string(),
                    windows_visited: visited,
                }
            }
        }
    }
}

fn log_outcome(subject_id: &str, outcome: &WindowOutcome) {
    match &outcome.verdict {
        WindowVerdict::Classified(c) => debug!(
            "{} @ {}s: nRMSSD {:.4}, CV {:.4}, pNN{} {:.2}, AF {}",
            subject_id,
            outcome.start_s,
            c.features.normalized_rmssd,
            c.features.cv,
            c.features.pnnx_x_ms,
            c.features.pnnx,
            c.af_detected
        ),
        WindowVerdict::Skipped(SkipReason::Extraction(e)) if e.is_collaborator_failure() => warn!(
            "{}: segment starting {} seconds skipped: {}",
            subject_id, outcome.start_s, e
        ),
        WindowVerdict::Skipped(reason) => info!(
            "{}: segment starting {} seconds skipped: {}",
            subject_id, outcome.start_s, reason
        ),
    }
}
