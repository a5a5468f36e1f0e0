//! Batch driver: map the per-trace pipeline over a directory of files.
//!
//! Traces share nothing, so they are handed to a rayon pool as-is. A trace
//! that fails is reported and skipped; its outputs are never partially
//! written.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use serde::Serialize;

use crate::data::loader::{self, load_trace};
use crate::data::model::Band;
use crate::data::writer::write_all;
use crate::error::{Error, Result};
use crate::pipeline::Pipeline;

// ---------------------------------------------------------------------------
// Stage – what a batch does with each file
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "stage", rename_all = "lowercase")]
pub enum Stage {
    /// Boundary validation only; writes the cleaned trace.
    Clean { cleaned: PathBuf },
    /// Inputs are already cleaned; writes the signal and noise traces.
    Decompose { signal: PathBuf, noise: PathBuf },
    /// Clean and decompose in one go; writes all three.
    Run {
        cleaned: PathBuf,
        signal: PathBuf,
        noise: PathBuf,
    },
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Clean { .. } => "clean",
            Stage::Decompose { .. } => "decompose",
            Stage::Run { .. } => "run",
        }
    }

    fn output_dirs(&self) -> Vec<&Path> {
        match self {
            Stage::Clean { cleaned } => vec![cleaned.as_path()],
            Stage::Decompose { signal, noise } => vec![signal.as_path(), noise.as_path()],
            Stage::Run {
                cleaned,
                signal,
                noise,
            } => vec![cleaned.as_path(), signal.as_path(), noise.as_path()],
        }
    }

    fn band_dir(&self, band: Band) -> Option<&Path> {
        match (self, band) {
            (Stage::Decompose { signal, .. } | Stage::Run { signal, .. }, Band::Low) => {
                Some(signal.as_path())
            }
            (Stage::Decompose { noise, .. } | Stage::Run { noise, .. }, Band::High) => {
                Some(noise.as_path())
            }
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct TraceOutcome {
    pub trace: String,
    pub samples: usize,
    /// Missing samples in the input file, before cleaning.
    pub missing: usize,
    pub outputs: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TraceFailure {
    pub trace: String,
    pub path: PathBuf,
    pub error: String,
}

/// Per-trace results of one batch, in input order.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub stage: Stage,
    pub succeeded: Vec<TraceOutcome>,
    pub failed: Vec<TraceFailure>,
    /// Inputs never started because the batch was aborted.
    pub skipped: Vec<PathBuf>,
}

impl BatchReport {
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len() + self.skipped.len()
    }

    pub fn log_summary(&self) {
        log::info!(
            "{}: {} of {} traces written, {} failed, {} skipped",
            self.stage.name(),
            self.succeeded.len(),
            self.total(),
            self.failed.len(),
            self.skipped.len()
        );
        for f in &self.failed {
            log::warn!("  {}: {}", f.path.display(), f.error);
        }
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text).map_err(|e| Error::io(path, e))
    }
}

enum Outcome {
    Done(TraceOutcome),
    Failed(TraceFailure),
    Skipped(PathBuf),
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

/// Trace files directly inside `dir`, sorted by name.
pub fn discover(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| Error::io(dir, e))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| Error::io(dir, e))?.path();
        let supported = matches!(loader::extension(&path).as_str(), "csv" | "parquet" | "pq");
        if path.is_file() && supported {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

pub struct BatchRunner<'a> {
    pipeline: &'a Pipeline,
    stage: Stage,
    jobs: usize,
}

impl<'a> BatchRunner<'a> {
    /// `jobs == 0` lets rayon pick the thread count.
    pub fn new(pipeline: &'a Pipeline, stage: Stage, jobs: usize) -> Self {
        Self {
            pipeline,
            stage,
            jobs,
        }
    }

    /// Process every input. Only setup problems (output directories, thread
    /// pool) fail the whole batch; everything else lands in the report.
    ///
    /// Once `abort_flag` is set no further trace is started.
    pub fn run(&self, inputs: &[PathBuf], abort_flag: &AtomicBool) -> Result<BatchReport> {
        for dir in self.stage.output_dirs() {
            fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
        }
        log::info!(
            "{}: {} traces on {} worker(s)",
            self.stage.name(),
            inputs.len(),
            if self.jobs == 0 { rayon::current_num_threads() } else { self.jobs }
        );

        let outcomes: Vec<Outcome> = if self.jobs == 1 {
            inputs.iter().map(|p| self.run_one(p, abort_flag)).collect()
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.jobs)
                .build()
                .map_err(|e| Error::Config(format!("cannot start worker pool: {e}")))?;
            pool.install(|| {
                inputs
                    .par_iter()
                    .map(|p| self.run_one(p, abort_flag))
                    .collect()
            })
        };

        let mut report = BatchReport {
            stage: self.stage.clone(),
            succeeded: Vec::new(),
            failed: Vec::new(),
            skipped: Vec::new(),
        };
        for outcome in outcomes {
            match outcome {
                Outcome::Done(o) => report.succeeded.push(o),
                Outcome::Failed(f) => report.failed.push(f),
                Outcome::Skipped(p) => report.skipped.push(p),
            }
        }
        Ok(report)
    }

    fn run_one(&self, path: &Path, abort_flag: &AtomicBool) -> Outcome {
        if abort_flag.load(Ordering::Relaxed) {
            return Outcome::Skipped(path.to_path_buf());
        }
        match self.process_file(path) {
            Ok(outcome) => {
                log::debug!("{} → {} file(s)", outcome.trace, outcome.outputs.len());
                Outcome::Done(outcome)
            }
            Err(e) => {
                log::error!("{}: {e}", path.display());
                Outcome::Failed(TraceFailure {
                    trace: loader::trace_id(path),
                    path: path.to_path_buf(),
                    error: e.to_string(),
                })
            }
        }
    }

    fn process_file(&self, path: &Path) -> Result<TraceOutcome> {
        let token = self.pipeline.config().missing_token.as_str();
        let raw = load_trace(path, token)?;
        let file_name = path
            .file_name()
            .ok_or_else(|| Error::UnsupportedFormat(path.display().to_string()))?;

        let written = match &self.stage {
            Stage::Clean { cleaned } => {
                let trace = self.pipeline.clean(&raw);
                write_all(&[(&trace, cleaned.join(file_name))], token)?
            }
            Stage::Decompose { .. } => {
                let pair = self.pipeline.split(&raw)?;
                let outputs: Vec<_> = Band::ALL
                    .iter()
                    .filter_map(|&b| Some((pair.band(b), self.stage.band_dir(b)?.join(file_name))))
                    .collect();
                write_all(&outputs, token)?
            }
            Stage::Run { cleaned, .. } => {
                let processed = self.pipeline.process(&raw)?;
                let mut outputs = vec![(&processed.cleaned, cleaned.join(file_name))];
                outputs.extend(Band::ALL.iter().filter_map(|&b| {
                    Some((processed.pair.band(b), self.stage.band_dir(b)?.join(file_name)))
                }));
                write_all(&outputs, token)?
            }
        };

        Ok(TraceOutcome {
            trace: raw.id.clone(),
            samples: raw.len(),
            missing: raw.missing_count(),
            outputs: written,
        })
    }
}
