use crate::config::Thresholds;
use crate::metrics::hrv::{FeatureError, HrvFeatures};
use serde::{Deserialize, Serialize};

/// Per-metric outcome of the threshold test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AfFlags {
    pub normalized_rmssd: bool,
    pub cv: bool,
    pub pnnx: bool,
}

impl AfFlags {
    /// A window is AF-suspect only when every metric is over its threshold.
    pub fn all(&self) -> bool {
        self.normalized_rmssd && self.cv && self.pnnx
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub af_detected: bool,
    pub flags: AfFlags,
    pub features: HrvFeatures,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Classifier {
    thresholds: Thresholds,
}

impl Classifier {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    pub fn flags(&self, features: &HrvFeatures) -> AfFlags {
        let t = &self.thresholds;
        AfFlags {
            normalized_rmssd: features.normalized_rmssd > t.rmssd,
            cv: features.cv > t.cv,
            pnnx: features.pnnx > t.pnnx,
        }
    }

    pub fn classify(&self, ibi: &[f64]) -> Result<Classification, FeatureError> {
        let features = HrvFeatures::compute(ibi, self.thresholds.pnnx_x_ms)?;
        let flags = self.flags(&features);
        Ok(Classification {
            af_detected: flags.all(),
            flags,
            features,
        })
    }
}
