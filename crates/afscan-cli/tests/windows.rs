mod common;

use assert_cmd::cargo::cargo_bin_cmd;
use common::{path_str, regular_subject};
use serde::Deserialize;
use std::{error::Error, fs};

#[derive(Deserialize)]
struct WindowLine {
    start: usize,
    start_s: f64,
    af_detected: Option<bool>,
    skipped: Option<String>,
}

#[derive(Deserialize)]
struct IbiOutput {
    length: usize,
    ibi_ms: Vec<f64>,
}

fn parse_lines(stdout: &[u8]) -> Result<Vec<WindowLine>, Box<dyn Error>> {
    let text = String::from_utf8(stdout.to_vec())?;
    let mut lines = Vec::new();
    for line in text.lines().filter(|l| !l.trim().is_empty()) {
        lines.push(serde_json::from_str(line)?);
    }
    Ok(lines)
}

#[test]
fn windows_lists_every_full_window() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let steady = regular_subject(dir.path(), "steady.csv", 42.0);
    let mut cmd = cargo_bin_cmd!("afscan");
    cmd.args(["windows", "--input", &path_str(&steady)]);
    let out = cmd.assert().success().get_output().stdout.clone();
    let lines = parse_lines(&out)?;
    // 5250 samples: starts 0, 625, 1250; 1875 + 3750 would overrun
    let starts: Vec<usize> = lines.iter().map(|l| l.start).collect();
    assert_eq!(starts, vec![0, 625, 1250]);
    assert_eq!(lines[2].start_s, 10.0);
    for line in &lines {
        assert_eq!(line.af_detected, Some(false));
        assert!(line.skipped.is_none());
    }
    Ok(())
}

#[test]
fn windows_honours_config_file() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let steady = regular_subject(dir.path(), "steady.csv", 40.0);
    let config = dir.path().join("screening.toml");
    fs::write(&config, "segment_s = 20.0\nstep_s = 5.0\n")?;
    let mut cmd = cargo_bin_cmd!("afscan");
    cmd.args([
        "windows",
        "--input",
        &path_str(&steady),
        "--config",
        &path_str(&config),
    ]);
    let out = cmd.assert().success().get_output().stdout.clone();
    assert_eq!(parse_lines(&out)?.len(), 5);

    // flags override the file
    let mut cmd = cargo_bin_cmd!("afscan");
    cmd.args([
        "windows",
        "--input",
        &path_str(&steady),
        "--config",
        &path_str(&config),
        "--step-s",
        "10",
    ]);
    let out = cmd.assert().success().get_output().stdout.clone();
    assert_eq!(parse_lines(&out)?.len(), 3);
    Ok(())
}

#[test]
fn windows_reports_skipped_segments() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("flat.csv");
    let mut text = String::from("PPG\n");
    for _ in 0..(35 * 125) {
        text.push_str("0.5\n");
    }
    fs::write(&path, text)?;
    let mut cmd = cargo_bin_cmd!("afscan");
    cmd.args(["windows", "--input", &path_str(&path)]);
    let out = cmd.assert().success().get_output().stdout.clone();
    let lines = parse_lines(&out)?;
    assert_eq!(lines.len(), 2);
    for line in &lines {
        assert!(line.af_detected.is_none());
        let reason = line.skipped.as_deref().unwrap_or_default();
        assert!(reason.contains("flat"), "unexpected reason {reason}");
    }
    Ok(())
}

#[test]
fn extract_ibi_recovers_steady_rhythm() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let steady = regular_subject(dir.path(), "steady.csv", 20.0);
    let mut cmd = cargo_bin_cmd!("afscan");
    cmd.args([
        "extract-ibi",
        "--input",
        &path_str(&steady),
        "--start",
        "300",
        "--length",
        "1250",
    ]);
    let out = cmd.assert().success().get_output().stdout.clone();
    let ibi: IbiOutput = serde_json::from_slice(&out)?;
    assert_eq!(ibi.length, 1250);
    assert!(ibi.ibi_ms.len() >= 10, "{:?}", ibi.ibi_ms);
    for v in ibi.ibi_ms {
        assert!((v - 800.0).abs() <= 16.0, "interval {v}");
    }
    Ok(())
}

#[test]
fn extract_ibi_fails_on_rejected_segment() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("flat.csv");
    fs::write(&path, format!("PPG\n{}", "1.0\n".repeat(500)))?;
    let mut cmd = cargo_bin_cmd!("afscan");
    cmd.args(["extract-ibi", "--input", &path_str(&path)]);
    cmd.assert().failure();
    Ok(())
}
