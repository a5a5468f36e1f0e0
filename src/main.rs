mod cli;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use cli::{Cli, Commands};
use gaze_split::batch::{discover, BatchRunner, Stage};
use gaze_split::{Pipeline, PipelineConfig};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::from(2)
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

/// `Ok(false)` when at least one trace failed.
fn run(cli: Cli) -> Result<bool> {
    let config = match &cli.config {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    let (input, stage) = match cli.command {
        Commands::Config => {
            config.validate().context("checking config")?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            return Ok(true);
        }
        Commands::Clean { input, output } => (input, Stage::Clean { cleaned: output }),
        Commands::Decompose {
            input,
            signal,
            noise,
        } => (input, Stage::Decompose { signal, noise }),
        Commands::Run {
            input,
            cleaned,
            signal,
            noise,
        } => (
            input,
            Stage::Run {
                cleaned,
                signal,
                noise,
            },
        ),
    };

    let pipeline = Pipeline::new(config).context("building filters")?;
    let inputs = collect_inputs(&input)?;
    if inputs.is_empty() {
        log::warn!("no .csv or .parquet traces found in {}", input.display());
    }

    // Ctrl-C lets running traces finish and skips the rest
    let abort_flag = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&abort_flag);
    ctrlc::set_handler(move || {
        log::warn!("interrupted, finishing traces already started");
        handler_flag.store(true, Ordering::SeqCst);
    })
    .context("installing Ctrl-C handler")?;

    let report = BatchRunner::new(&pipeline, stage, cli.jobs)
        .run(&inputs, &abort_flag)
        .context("running batch")?;
    report.log_summary();

    if let Some(path) = &cli.report {
        report
            .write_json(path)
            .with_context(|| format!("writing report {}", path.display()))?;
    }
    Ok(!report.has_failures())
}

fn collect_inputs(input: &Path) -> Result<Vec<PathBuf>> {
    if input.is_dir() {
        discover(input).with_context(|| format!("listing {}", input.display()))
    } else if input.exists() {
        Ok(vec![input.to_path_buf()])
    } else {
        anyhow::bail!("input {} does not exist", input.display())
    }
}
