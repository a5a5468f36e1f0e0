//! Command-line interface

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// Clean gaze traces and split them into signal and noise bands
#[derive(Parser, Debug)]
#[command(name = "gaze-split")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,

    /// More log output (-v info, -vv debug, -vvv trace); RUST_LOG wins
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// JSON config file (bounds, filter, precision, missing token)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Worker threads (0 = one per core, 1 = sequential)
    #[arg(short, long, global = true, default_value = "0")]
    pub jobs: usize,

    /// Write a JSON report of every trace to this file
    #[arg(long, global = true)]
    pub report: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Mark off-screen samples as missing and round coordinates
    Clean {
        /// Input trace file or directory of traces
        input: PathBuf,

        /// Directory for cleaned traces
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Split cleaned traces into lowpass (signal) and highpass (noise) traces
    Decompose {
        /// Cleaned trace file or directory of traces
        input: PathBuf,

        /// Directory for lowpass output
        #[arg(long)]
        signal: PathBuf,

        /// Directory for highpass output
        #[arg(long)]
        noise: PathBuf,
    },

    /// Clean and split in one pass
    Run {
        /// Raw trace file or directory of traces
        input: PathBuf,

        /// Directory for cleaned traces
        #[arg(long)]
        cleaned: PathBuf,

        /// Directory for lowpass output
        #[arg(long)]
        signal: PathBuf,

        /// Directory for highpass output
        #[arg(long)]
        noise: PathBuf,
    },

    /// Print the effective configuration as JSON
    Config,
}
