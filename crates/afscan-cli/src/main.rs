use afscan_lib::{
    config::ScreeningConfig,
    detectors::{PeakDetector, SignalCleaner},
    io::{csv as csv_io, text as text_io},
    metrics::hrv::HrvFeatures,
    screening::{
        AfFlags, Classifier, Detection, IntervalExtractor, ScanOutcome, Scanner, WindowOutcome,
        WindowVerdict,
    },
    signal::TimeSeries,
};
use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use env_logger::Env;
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use rayon::prelude::*;
use serde::Serialize;
use std::{
    io::{self, Read},
    path::{Path, PathBuf},
};

#[derive(Parser)]
#[command(
    name = "afscan",
    version,
    about = "Screen PPG recordings for suspected atrial fibrillation"
)]
struct Cli {
    /// Logging verbosity (e.g., debug, info, warn)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

/// Operating parameters shared by every subcommand. Flags override the config file.
#[derive(Args, Clone)]
struct ScreeningArgs {
    /// TOML file with screening parameters
    #[arg(long)]
    config: Option<PathBuf>,
    /// Sampling rate of the recordings (Hz)
    #[arg(long)]
    fs: Option<f64>,
    /// Window length (seconds)
    #[arg(long)]
    segment_s: Option<f64>,
    /// Window step (seconds)
    #[arg(long)]
    step_s: Option<f64>,
    /// CSV column holding the PPG samples
    #[arg(long)]
    column: Option<String>,
    /// Normalized RMSSD threshold
    #[arg(long)]
    rmssd_thresh: Option<f64>,
    /// Coefficient of variation threshold
    #[arg(long)]
    cv_thresh: Option<f64>,
    /// pNNx threshold (percent)
    #[arg(long)]
    pnnx_thresh: Option<f64>,
    /// x of pNNx (milliseconds)
    #[arg(long)]
    pnnx_x: Option<f64>,
}

impl ScreeningArgs {
    fn resolve(&self) -> Result<ScreeningConfig> {
        let mut cfg = match &self.config {
            Some(path) => ScreeningConfig::load(path)?,
            None => ScreeningConfig::default(),
        };
        if let Some(fs) = self.fs {
            cfg.sampling_rate_hz = fs;
        }
        if let Some(v) = self.segment_s {
            cfg.segment_s = v;
        }
        if let Some(v) = self.step_s {
            cfg.step_s = v;
        }
        if let Some(column) = &self.column {
            cfg.ppg_column = column.clone();
        }
        if let Some(v) = self.rmssd_thresh {
            cfg.thresholds.rmssd = v;
        }
        if let Some(v) = self.cv_thresh {
            cfg.thresholds.cv = v;
        }
        if let Some(v) = self.pnnx_thresh {
            cfg.thresholds.pnnx = v;
        }
        if let Some(v) = self.pnnx_x {
            cfg.thresholds.pnnx_x_ms = v;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Scan every subject CSV in a folder and write the result table
    Screen {
        #[arg(long)]
        input_dir: PathBuf,
        #[arg(long, default_value = "labels.csv")]
        output: PathBuf,
        /// Worker threads (0 = one per core)
        #[arg(long, default_value_t = 0)]
        jobs: usize,
        #[command(flatten)]
        screening: ScreeningArgs,
    },
    /// Scan one subject CSV and print the outcome as JSON
    ScreenFile {
        #[arg(long)]
        input: PathBuf,
        #[command(flatten)]
        screening: ScreeningArgs,
    },
    /// Print the verdict or skip reason of every window as JSON lines
    Windows {
        #[arg(long)]
        input: PathBuf,
        #[command(flatten)]
        screening: ScreeningArgs,
    },
    /// Extract inter-beat intervals from a subject CSV (whole recording or one segment)
    ExtractIbi {
        #[arg(long)]
        input: PathBuf,
        /// First sample of the segment
        #[arg(long, default_value_t = 0)]
        start: usize,
        /// Segment length in samples (defaults to the rest of the recording)
        #[arg(long)]
        length: Option<usize>,
        #[command(flatten)]
        screening: ScreeningArgs,
    },
    /// Compute HRV features and the AF verdict from IBI values (ms) read from stdin or --input
    Features {
        #[arg(long)]
        input: Option<PathBuf>,
        #[command(flatten)]
        screening: ScreeningArgs,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or(&cli.log_level)).init();
    match cli.command {
        Commands::Screen {
            input_dir,
            output,
            jobs,
            screening,
        } => cmd_screen(&input_dir, &output, jobs, &screening.resolve()?)?,
        Commands::ScreenFile { input, screening } => {
            cmd_screen_file(&input, &screening.resolve()?)?
        }
        Commands::Windows { input, screening } => cmd_windows(&input, &screening.resolve()?)?,
        Commands::ExtractIbi {
            input,
            start,
            length,
            screening,
        } => cmd_extract_ibi(&input, start, length, &screening.resolve()?)?,
        Commands::Features { input, screening } => {
            cmd_features(input.as_deref(), &screening.resolve()?)?
        }
    }
    Ok(())
}

fn subject_id(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn load_recording(path: &Path, cfg: &ScreeningConfig) -> Result<TimeSeries> {
    csv_io::read_ppg_csv(path, &cfg.ppg_column, cfg.sampling_rate_hz)
}

fn read_values(input: Option<&Path>) -> Result<Vec<f64>> {
    match input {
        Some(path) => text_io::read_f64_series(path),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            text_io::parse_f64_series(&buf)
        }
    }
}

enum SubjectResult {
    Flagged(Detection),
    Clear,
    Failed,
}

#[derive(Serialize)]
struct ScreenSummary {
    subjects: usize,
    flagged: usize,
    failed: usize,
    output: PathBuf,
}

fn cmd_screen(input_dir: &Path, output: &Path, jobs: usize, cfg: &ScreeningConfig) -> Result<()> {
    let files = csv_io::list_subject_files(input_dir)?;
    if files.is_empty() {
        warn!("no CSV files found in {}", input_dir.display());
    }
    let scanner = Scanner::ppg(cfg)?;
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build()
        .context("building worker pool")?;

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} subjects ({eta})")?
            .progress_chars("#>-"),
    );

    let results: Vec<SubjectResult> = pool.install(|| {
        files
            .par_iter()
            .map(|path| {
                let id = subject_id(path);
                let result = match load_recording(path, cfg) {
                    Ok(ts) => match scanner.scan(&id, &ts.data) {
                        ScanOutcome::Found(d) => SubjectResult::Flagged(d),
                        ScanOutcome::Exhausted { .. } => SubjectResult::Clear,
                    },
                    Err(e) => {
                        error!("{}: {:#}", id, e);
                        SubjectResult::Failed
                    }
                };
                pb.inc(1);
                result
            })
            .collect()
    });
    pb.finish_and_clear();

    let detections: Vec<&Detection> = results
        .iter()
        .filter_map(|r| match r {
            SubjectResult::Flagged(d) => Some(d),
            _ => None,
        })
        .collect();
    let failed = results
        .iter()
        .filter(|r| matches!(r, SubjectResult::Failed))
        .count();
    let flagged = csv_io::write_detections(output, detections.iter().copied())?;
    info!(
        "{} of {} subjects flagged, {} unreadable; results in {}",
        flagged,
        files.len(),
        failed,
        output.display()
    );
    let summary = ScreenSummary {
        subjects: files.len(),
        flagged,
        failed,
        output: output.to_path_buf(),
    };
    println!("{}", serde_json::to_string(&summary)?);
    Ok(())
}

fn describe_recording<C, P>(id: &str, ts: &TimeSeries, scanner: &Scanner<C, P>)
where
    C: SignalCleaner,
    P: PeakDetector,
{
    info!(
        "{}: {:.1} s at {} Hz, {}-sample windows every {} samples",
        id,
        ts.duration(),
        ts.fs,
        scanner.segment_len(),
        scanner.step_len()
    );
    if ts.len() < scanner.segment_len() {
        warn!("{}: recording is shorter than one window", id);
    }
}

fn cmd_screen_file(input: &Path, cfg: &ScreeningConfig) -> Result<()> {
    let ts = load_recording(input, cfg)?;
    let scanner = Scanner::ppg(cfg)?;
    let id = subject_id(input);
    describe_recording(&id, &ts, &scanner);
    let outcome = scanner.scan(&id, &ts.data);
    println!("{}", serde_json::to_string(&outcome)?);
    Ok(())
}

#[derive(Serialize)]
struct WindowReport {
    start: usize,
    start_s: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    af_detected: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    flags: Option<AfFlags>,
    #[serde(skip_serializing_if = "Option::is_none")]
    features: Option<HrvFeatures>,
    #[serde(skip_serializing_if = "Option::is_none")]
    skipped: Option<String>,
}

impl From<WindowOutcome> for WindowReport {
    fn from(outcome: WindowOutcome) -> Self {
        let mut report = WindowReport {
            start: outcome.start,
            start_s: outcome.start_s,
            af_detected: None,
            flags: None,
            features: None,
            skipped: None,
        };
        match outcome.verdict {
            WindowVerdict::Classified(c) => {
                report.af_detected = Some(c.af_detected);
                report.flags = Some(c.flags);
                report.features = Some(c.features);
            }
            WindowVerdict::Skipped(reason) => report.skipped = Some(reason.to_string()),
        }
        report
    }
}

fn cmd_windows(input: &Path, cfg: &ScreeningConfig) -> Result<()> {
    let ts = load_recording(input, cfg)?;
    let scanner = Scanner::ppg(cfg)?;
    let id = subject_id(input);
    describe_recording(&id, &ts, &scanner);
    for outcome in scanner.windows(&id, &ts.data) {
        println!("{}", serde_json::to_string(&WindowReport::from(outcome))?);
    }
    Ok(())
}

#[derive(Serialize)]
struct IbiReport {
    start: usize,
    length: usize,
    fs: f64,
    ibi_ms: Vec<f64>,
}

fn cmd_extract_ibi(
    input: &Path,
    start: usize,
    length: Option<usize>,
    cfg: &ScreeningConfig,
) -> Result<()> {
    let ts = load_recording(input, cfg)?;
    if start >= ts.len() {
        bail!("start {} is beyond the {}-sample recording", start, ts.len());
    }
    let end = match length {
        Some(len) => start.saturating_add(len).min(ts.len()),
        None => ts.len(),
    };
    let extractor = IntervalExtractor::ppg(cfg);
    let ibi = extractor
        .extract(&ts.data[start..end], ts.fs)
        .with_context(|| format!("no IBI for samples {}..{} of {}", start, end, input.display()))?;
    let report = IbiReport {
        start,
        length: end - start,
        fs: ts.fs,
        ibi_ms: ibi.ibi_ms,
    };
    println!("{}", serde_json::to_string(&report)?);
    Ok(())
}

fn cmd_features(input: Option<&Path>, cfg: &ScreeningConfig) -> Result<()> {
    let ibi = read_values(input)?;
    let classification = Classifier::new(cfg.thresholds).classify(&ibi)?;
    println!("{}", serde_json::to_string(&classification)?);
    Ok(())
}
