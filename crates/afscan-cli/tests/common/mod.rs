#![allow(dead_code)]

use rand::{rngs::StdRng, Rng, SeedableRng};
use std::f64::consts::PI;
use std::fs;
use std::path::{Path, PathBuf};

pub const FS: f64 = 125.0;

/// PPG-like waveform: one Gaussian systolic bump per beat over a drifting baseline.
pub fn synthetic_ppg(fs: f64, duration_s: f64, ibi_s: &[f64]) -> Vec<f64> {
    let mut beats = Vec::new();
    let mut t = 0.4;
    for interval in ibi_s.iter().cycle() {
        if t > duration_s + 1.0 {
            break;
        }
        beats.push(t);
        t += interval;
    }
    let samples = (duration_s * fs) as usize;
    (0..samples)
        .map(|i| {
            let time = i as f64 / fs;
            let mut v = 1.5 + 0.2 * (2.0 * PI * 0.15 * time).sin();
            for &bt in &beats {
                let d = time - bt;
                if d.abs() < 0.6 {
                    v += (-0.5 * (d / 0.1).powi(2)).exp();
                }
            }
            v
        })
        .collect()
}

/// Intervals drawn uniformly from 0.45-1.1 s, like an irregularly irregular rhythm.
pub fn irregular_ibi(seed: u64, count: usize) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count).map(|_| rng.gen_range(0.45..1.1)).collect()
}

pub fn write_ppg_csv(path: &Path, samples: &[f64]) {
    let mut text = String::from("Time,PPG\n");
    for (i, v) in samples.iter().enumerate() {
        text.push_str(&format!("{:.3},{:.6}\n", i as f64 / FS, v));
    }
    fs::write(path, text).expect("write synthetic csv");
}

pub fn af_subject(dir: &Path, name: &str, duration_s: f64) -> PathBuf {
    let path = dir.join(name);
    write_ppg_csv(&path, &synthetic_ppg(FS, duration_s, &irregular_ibi(7, 200)));
    path
}

pub fn regular_subject(dir: &Path, name: &str, duration_s: f64) -> PathBuf {
    let path = dir.join(name);
    write_ppg_csv(&path, &synthetic_ppg(FS, duration_s, &[0.8]));
    path
}

pub fn path_str(path: &Path) -> String {
    path.to_string_lossy().to_string()
}
