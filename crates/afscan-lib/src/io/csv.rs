use crate::screening::Detection;
use crate::signal::TimeSeries;
use anyhow::{Context, Result};
use csv::{ReaderBuilder, Writer, WriterBuilder};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Load one numeric column of a subject CSV as a PPG recording.
pub fn read_ppg_csv(path: &Path, column: &str, fs: f64) -> Result<TimeSeries> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let headers = reader.headers().context("reading header")?.clone();
    let idx = headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(column))
        .with_context(|| format!("missing signal column '{}' in {}", column, path.display()))?;

    let mut data = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("reading row {} of {}", row + 1, path.display()))?;
        let cell = record
            .get(idx)
            .with_context(|| format!("row {} has no '{}' value", row + 1, column))?
            .trim();
        let value: f64 = cell
            .parse()
            .with_context(|| format!("row {}: '{}' is not a number", row + 1, cell))?;
        data.push(value);
    }
    Ok(TimeSeries::new(fs, data))
}

/// `*.csv` files directly inside `dir`, sorted by file name.
pub fn list_subject_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("listing {}", dir.display()))? {
        let path = entry?.path();
        let is_csv = path
            .extension()
            .and_then(|e| e.to_str())
            .map_or(false, |e| e.eq_ignore_ascii_case("csv"));
        if is_csv && path.is_file() {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// One row of the result table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
    pub file_name: String,
    /// Window start, in samples.
    pub detected_time_segment: usize,
    pub af_detected: bool,
    pub normalized_rmssd: bool,
    pub cv: bool,
    pub pnn50: bool,
}

impl From<&Detection> for DetectionRecord {
    fn from(d: &Detection) -> Self {
        Self {
            file_name: d.subject_id.clone(),
            detected_time_segment: d.segment_start,
            af_detected: d.af_detected,
            normalized_rmssd: d.flags.normalized_rmssd,
            cv: d.flags.cv,
            pnn50: d.flags.pnnx,
        }
    }
}

/// Result table sink. The header is written even when no subject is flagged.
pub struct DetectionWriter<W: Write> {
    inner: Writer<W>,
}

impl DetectionWriter<File> {
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        Self::new(file)
    }
}

impl<W: Write> DetectionWriter<W> {
    pub fn new(sink: W) -> Result<Self> {
        let mut inner = WriterBuilder::new().has_headers(false).from_writer(sink);
        inner.write_record([
            "file_name",
            "detected_time_segment",
            "af_detected",
            "normalized_rmssd",
            "cv",
            "pnn50",
        ])?;
        Ok(Self { inner })
    }

    pub fn write(&mut self, detection: &Detection) -> Result<()> {
        self.inner
            .serialize(DetectionRecord::from(detection))
            .context("writing detection row")?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<W> {
        self.inner.flush()?;
        self.inner
            .into_inner()
            .map_err(|e| anyhow::anyhow!("flushing result table: {}", e.error()))
    }
}

/// Write every detection to a result table at `path`.
pub fn write_detections<'a>(
    path: &Path,
    detections: impl IntoIterator<Item = &'a Detection>,
) -> Result<usize> {
    let mut writer = DetectionWriter::create(path)?;
    let mut rows = 0;
    for d in detections {
        writer.write(d)?;
        rows += 1;
    }
    writer.finish()?;
    Ok(rows)
}

/// Read a result table back.
pub fn read_detections(path: &Path) -> Result<Vec<DetectionRecord>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let mut rows = Vec::new();
    for record in reader.deserialize() {
        let row: DetectionRecord = record.context("reading detection row")?;
        rows.push(row);
    }
    Ok(rows)
}
