use super::{CleanedSignal, PeakDetector, QualityWarning, SignalCleaner};
use crate::signal::Events;
use anyhow::{anyhow, Result};
use biquad::{Biquad, Coefficients, DirectForm1, Hertz, Type, Q_BUTTERWORTH_F64};
use serde::{Deserialize, Serialize};

/// Band-pass corners and pulse-quality gate for PPG cleaning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PpgCleanConfig {
    /// High-pass corner removing baseline wander (Hz).
    pub lowcut_hz: f64,
    /// Low-pass corner removing high-frequency noise (Hz).
    pub highcut_hz: f64,
    /// Upper edge of the cardiac band (Hz). Systolic pulses keep most of their power below it.
    pub cardiac_band_hz: f64,
    /// Minimum share of band-passed power that must sit in the cardiac band.
    pub min_cardiac_power_ratio: f64,
}

impl Default for PpgCleanConfig {
    fn default() -> Self {
        Self {
            lowcut_hz: 0.5,
            highcut_hz: 8.0,
            cardiac_band_hz: 3.0,
            min_cardiac_power_ratio: 0.5,
        }
    }
}

/// Parameters of the two-moving-average systolic peak detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PpgPeakConfig {
    /// Averaging window matching a systolic peak (seconds).
    pub peak_window_s: f64,
    /// Averaging window matching one beat (seconds).
    pub beat_window_s: f64,
    /// Offset of the block threshold, as a fraction of the mean squared signal.
    pub beta: f64,
    /// Minimum distance between accepted peaks (seconds).
    pub min_delay_s: f64,
}

impl Default for PpgPeakConfig {
    fn default() -> Self {
        Self {
            peak_window_s: 0.111,
            beat_window_s: 0.667,
            beta: 0.02,
            min_delay_s: 0.3,
        }
    }
}

/// Residual spread, relative to the signal level, below which a segment counts as flat.
const FLAT_TOLERANCE: f64 = 1e-9;

/// Zero-phase Butterworth band-pass cleaner.
#[derive(Debug, Clone, Copy, Default)]
pub struct PpgCleaner {
    pub cfg: PpgCleanConfig,
}

impl PpgCleaner {
    pub fn new(cfg: PpgCleanConfig) -> Self {
        Self { cfg }
    }

    fn quality_warnings(&self, samples: &[f64], fs: f64) -> Vec<QualityWarning> {
        let mut warnings = Vec::new();
        let non_finite = samples.iter().filter(|x| !x.is_finite()).count();
        if non_finite > 0 {
            warnings.push(QualityWarning::NonFiniteSamples { count: non_finite });
        }
        let min_fs = 2.0 * self.cfg.highcut_hz;
        if fs <= min_fs {
            warnings.push(QualityWarning::SamplingRateTooLow { fs, min_fs });
        }
        // one second of signal, so the high-pass has something to settle on
        let min_samples = fs.max(0.0).ceil() as usize;
        if samples.len() < min_samples {
            warnings.push(QualityWarning::TooShort {
                samples: samples.len(),
                min_samples,
            });
        }
        warnings
    }

    /// Share of the band-passed energy left after a further low-pass at the cardiac band edge.
    /// Pulse trains sit near 1; broadband noise lands near the bandwidth ratio.
    fn cardiac_power_ratio(&self, band_passed: &[f64], fs: f64) -> Result<f64> {
        let total: f64 = band_passed.iter().map(|x| x * x).sum();
        if !(total > 0.0) {
            return Ok(0.0);
        }
        let mut cardiac = band_passed.to_vec();
        let lp = make_coefficients(Type::LowPass, fs, self.cfg.cardiac_band_hz)?;
        forward_backward_filter(&mut cardiac, &mut DirectForm1::<f64>::new(lp));
        let kept: f64 = cardiac.iter().map(|x| x * x).sum();
        Ok(kept / total)
    }
}

impl SignalCleaner for PpgCleaner {
    fn clean(&self, samples: &[f64], fs: f64) -> Result<CleanedSignal> {
        let warnings = self.quality_warnings(samples, fs);
        if !warnings.is_empty() {
            return Ok(CleanedSignal {
                data: samples.to_vec(),
                warnings,
            });
        }

        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        let mut data: Vec<f64> = samples.iter().map(|x| x - mean).collect();
        let spread = data.iter().fold(0.0f64, |acc, x| acc.max(x.abs()));
        if spread <= FLAT_TOLERANCE * mean.abs().max(1.0) {
            return Ok(CleanedSignal {
                data,
                warnings: vec![QualityWarning::FlatSignal],
            });
        }

        let hp = make_coefficients(Type::HighPass, fs, self.cfg.lowcut_hz)?;
        forward_backward_filter(&mut data, &mut DirectForm1::<f64>::new(hp));
        let lp = make_coefficients(Type::LowPass, fs, self.cfg.highcut_hz)?;
        forward_backward_filter(&mut data, &mut DirectForm1::<f64>::new(lp));

        let ratio = self.cardiac_power_ratio(&data, fs)?;
        let warnings = if ratio < self.cfg.min_cardiac_power_ratio {
            vec![QualityWarning::NoPulse {
                cardiac_power_ratio: ratio,
                min_ratio: self.cfg.min_cardiac_power_ratio,
            }]
        } else {
            Vec::new()
        };
        Ok(CleanedSignal { data, warnings })
    }
}

fn make_coefficients(f_type: Type<f64>, fs: f64, freq: f64) -> Result<Coefficients<f64>> {
    let build_err = || anyhow!("cannot build {freq} Hz filter at fs {fs} Hz");
    let fs_hz = Hertz::<f64>::from_hz(fs).map_err(|_| build_err())?;
    let f0_hz = Hertz::<f64>::from_hz(freq).map_err(|_| build_err())?;
    Coefficients::<f64>::from_params(f_type, fs_hz, f0_hz, Q_BUTTERWORTH_F64).map_err(|_| build_err())
}

fn forward_backward_filter<F: Biquad<f64>>(signal: &mut [f64], filter: &mut F) {
    signal.iter_mut().for_each(|x| *x = filter.run(*x));
    filter.reset_state();
    signal.reverse();
    signal.iter_mut().for_each(|x| *x = filter.run(*x));
    filter.reset_state();
    signal.reverse();
}

/// Systolic peak detector comparing a peak-width and a beat-width moving average.
#[derive(Debug, Clone, Copy, Default)]
pub struct PpgPeakDetector {
    pub cfg: PpgPeakConfig,
}

impl PpgPeakDetector {
    pub fn new(cfg: PpgPeakConfig) -> Self {
        Self { cfg }
    }
}

impl PeakDetector for PpgPeakDetector {
    fn detect_peaks(&self, cleaned: &[f64], fs: f64) -> Result<Events> {
        if !(fs > 0.0) {
            return Err(anyhow!("invalid sampling rate {fs}"));
        }
        if cleaned.iter().any(|x| !x.is_finite()) {
            return Err(anyhow!("cleaned signal contains non-finite values"));
        }
        Ok(Events::from_indices(find_peaks(cleaned, fs, &self.cfg)))
    }
}

fn find_peaks(signal: &[f64], fs: f64, cfg: &PpgPeakConfig) -> Vec<usize> {
    if signal.len() < 3 {
        return Vec::new();
    }

    let squared: Vec<f64> = signal.iter().map(|x| x.max(0.0).powi(2)).collect();
    let peak_win = ((cfg.peak_window_s * fs).round() as usize).max(1);
    let beat_win = ((cfg.beat_window_s * fs).round() as usize).max(1);
    let ma_peak = centered_moving_average(&squared, peak_win);
    let ma_beat = centered_moving_average(&squared, beat_win);
    let offset = cfg.beta * squared.iter().sum::<f64>() / squared.len() as f64;
    let min_delay = (cfg.min_delay_s * fs).round() as usize;

    let mut peaks: Vec<usize> = Vec::new();
    let mut block_start: Option<usize> = None;
    for i in 0..=signal.len() {
        let inside = i < signal.len() && ma_peak[i] > ma_beat[i] + offset;
        match (inside, block_start) {
            (true, None) => block_start = Some(i),
            (false, Some(start)) => {
                block_start = None;
                if i - start < peak_win {
                    continue;
                }
                let idx = argmax(&signal[start..i]) + start;
                let far_enough = peaks.last().map_or(true, |&last| idx - last > min_delay);
                if far_enough {
                    peaks.push(idx);
                }
            }
            _ => {}
        }
    }
    peaks
}

fn centered_moving_average(data: &[f64], win: usize) -> Vec<f64> {
    if win <= 1 {
        return data.to_vec();
    }
    let mut prefix = Vec::with_capacity(data.len() + 1);
    prefix.push(0.0);
    let mut acc = 0.0;
    for &x in data {
        acc += x;
        prefix.push(acc);
    }
    let half = win / 2;
    (0..data.len())
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = (i + win - half).min(data.len());
            (prefix[hi] - prefix[lo]) / win as f64
        })
        .collect()
}

fn argmax(data: &[f64]) -> usize {
    let mut idx = 0;
    let mut max_val = f64::MIN;
    for (i, &v) in data.iter().enumerate() {
        if v > max_val {
            max_val = v;
            idx = i;
        }
    }
    idx
}
