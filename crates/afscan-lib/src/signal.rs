use serde::{Deserialize, Serialize};

/// Uniformly sampled PPG recording for one subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSeries {
    /// Uniform sampling frequency in Hz
    pub fs: f64,
    /// Samples
    pub data: Vec<f64>,
}

impl TimeSeries {
    pub fn new(fs: f64, data: Vec<f64>) -> Self {
        Self { fs, data }
    }
    pub fn len(&self) -> usize {
        self.data.len()
    }
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
    pub fn duration(&self) -> f64 {
        self.data.len() as f64 / self.fs
    }
}

/// Point events on a timeline (detected systolic peaks, as sample indices).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Events {
    pub indices: Vec<usize>,
}

impl Events {
    pub fn from_indices(indices: Vec<usize>) -> Self {
        Self { indices }
    }

    pub fn is_strictly_increasing(&self) -> bool {
        self.indices.windows(2).all(|w| w[0] < w[1])
    }
}

/// Inter-beat intervals in milliseconds.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IbiSeries {
    pub ibi_ms: Vec<f64>,
}

impl IbiSeries {
    pub fn from_events(events: &Events, fs: f64) -> Self {
        let scale = 1000.0 / fs;
        let ibi_ms = events
            .indices
            .windows(2)
            .map(|w| (w[1] as f64 - w[0] as f64) * scale)
            .collect();
        Self { ibi_ms }
    }

    pub fn len(&self) -> usize {
        self.ibi_ms.len()
    }
    pub fn is_empty(&self) -> bool {
        self.ibi_ms.is_empty()
    }
    pub fn as_slice(&self) -> &[f64] {
        &self.ibi_ms
    }
}
