use afscan_lib::screening::Classification;
use assert_cmd::cargo::cargo_bin_cmd;
use std::error::Error;

const IRREGULAR: &str = "600\n900\n500\n950\n550\n";

#[test]
fn features_from_stdin() -> Result<(), Box<dyn Error>> {
    let mut cmd = cargo_bin_cmd!("afscan");
    cmd.arg("features").write_stdin(IRREGULAR);
    let out = cmd.assert().success().get_output().stdout.clone();
    let c: Classification = serde_json::from_slice(&out)?;
    assert!(c.af_detected);
    assert_eq!(c.features.n, 5);
    assert!((c.features.normalized_rmssd - 0.559).abs() < 1e-3);
    assert!((c.features.cv - 0.267).abs() < 1e-3);
    assert_eq!(c.features.pnnx, 100.0);
    Ok(())
}

#[test]
fn features_respect_threshold_overrides() -> Result<(), Box<dyn Error>> {
    let mut cmd = cargo_bin_cmd!("afscan");
    cmd.args(["features", "--pnnx-thresh", "100"])
        .write_stdin(IRREGULAR);
    let out = cmd.assert().success().get_output().stdout.clone();
    let c: Classification = serde_json::from_slice(&out)?;
    assert!(c.flags.normalized_rmssd && c.flags.cv);
    assert!(!c.flags.pnnx);
    assert!(!c.af_detected);
    Ok(())
}

#[test]
fn features_from_file_with_steady_rhythm() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("ibi.txt");
    std::fs::write(&path, "# steady\n1000, 1000, 1000, 1000\n")?;
    let mut cmd = cargo_bin_cmd!("afscan");
    cmd.args(["features", "--input", &path.to_string_lossy()]);
    let out = cmd.assert().success().get_output().stdout.clone();
    let c: Classification = serde_json::from_slice(&out)?;
    assert!(!c.af_detected);
    assert_eq!(c.features.rmssd_ms, 0.0);
    assert_eq!(c.features.cv, 0.0);
    Ok(())
}

#[test]
fn features_need_two_intervals() {
    let mut cmd = cargo_bin_cmd!("afscan");
    cmd.arg("features").write_stdin("800\n");
    cmd.assert().failure();
}
