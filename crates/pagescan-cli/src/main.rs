// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pagescan — camera-to-PDF document scanning
//
// Headless entry point. Initialises logging, parses the command line, and
// reports failures in plain language.

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use pagescan_core::error::{Result, ScanError};
use pagescan_core::human_errors::humanize_error;
use pagescan_core::{FilterMode, Rotation};
use pagescan_document::detect::DetectorKind;

use commands::{ReplayOptions, Report, ScanOptions};

#[derive(Parser)]
#[command(name = "pagescan", author, version, about, long_about = None)]
struct Cli {
    /// JSON configuration file (defaults are used when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crop, filter, and rotate photos into one PDF
    Scan {
        /// Photos, one page each, in order
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Output PDF path
        #[arg(short, long, default_value = "scan.pdf")]
        output: PathBuf,
        /// Tone mode: color, grayscale, or bw
        #[arg(short, long, default_value = "color")]
        filter: FilterMode,
        /// Clockwise rotation in degrees (multiple of 90)
        #[arg(short, long, default_value_t = 0, allow_negative_numbers = true)]
        rotate: i32,
        /// Edge detector: hough or fixed
        #[arg(short, long, default_value = "hough")]
        detector: DetectorKind,
    },
    /// Replay image files as camera frames until auto-capture fires
    Replay {
        /// Frames, in playback order; the last one repeats
        #[arg(required = true)]
        frames: Vec<PathBuf>,
        #[arg(short, long, default_value = "replay.pdf")]
        output: PathBuf,
        #[arg(short, long, default_value = "color")]
        filter: FilterMode,
        #[arg(short, long, default_value = "hough")]
        detector: DetectorKind,
        /// Capture manually after this many ticks without a stable page
        #[arg(long, default_value_t = 30)]
        max_ticks: usize,
        /// Tick interval in milliseconds (overrides the configuration)
        #[arg(long)]
        interval_ms: Option<u64>,
    },
    /// List cameras
    Devices,
    /// Show the configuration, or write the defaults with --init
    Config {
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "Command failed");
            let human = humanize_error(&err);
            eprintln!("{}\n{}", human.message, human.suggestion);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Scan {
            inputs,
            output,
            filter,
            rotate,
            detector,
        } => {
            let rotation = Rotation::from_degrees(rotate).ok_or_else(|| {
                ScanError::Config(format!("rotation must be a multiple of 90, got {rotate}"))
            })?;
            let config = commands::load_config(cli.config.as_deref())?;
            let options = ScanOptions {
                inputs,
                output,
                filter,
                rotation,
                detector,
            };
            print_report(&commands::scan(config, &options)?);
        }
        Commands::Replay {
            frames,
            output,
            filter,
            detector,
            max_ticks,
            interval_ms,
        } => {
            let config = commands::load_config(cli.config.as_deref())?;
            let options = ReplayOptions {
                frames,
                output,
                filter,
                detector,
                max_ticks: max_ticks.max(1),
                interval: interval_ms.map(Duration::from_millis),
            };
            print_report(&commands::replay(config, &options).await?);
        }
        Commands::Devices => {
            let config = commands::load_config(cli.config.as_deref())?;
            for line in commands::devices(&config)? {
                println!("{line}");
            }
        }
        Commands::Config { init } => {
            println!("{}", commands::config(cli.config.as_deref(), init)?);
        }
    }
    Ok(())
}

fn print_report(report: &Report) {
    println!(
        "{} ({} page{}, sha256 {})",
        report.output.display(),
        report.pages,
        if report.pages == 1 { "" } else { "s" },
        report.sha256
    );
}
