// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! edgeflow CLI
//!
//! Validate flow configurations and run them against the synthetic backend.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "edgeflow")]
#[command(author, version, about = "Video analytics flow runtime", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a flow configuration and print the resolved graph
    Check {
        /// Flow configuration file (YAML)
        #[arg(value_name = "CONFIG")]
        config: PathBuf,

        /// Print the graph as JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Run a flow configuration against generated frames
    Run {
        /// Flow configuration file (YAML)
        #[arg(value_name = "CONFIG")]
        config: PathBuf,

        /// Frames per input before end-of-stream (default: endless)
        #[arg(long)]
        frames: Option<u64>,

        /// Frame rate of the generated inputs
        #[arg(long, default_value = "30")]
        fps: f64,

        /// Side of the square synthetic model input, in pixels
        #[arg(long, default_value = "224")]
        model_size: u32,

        /// Seconds between statistics reports
        #[arg(long, default_value = "5")]
        stats_interval: u64,

        /// Print the final statistics as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Check { config, json } => commands::check::run(&config, json),
        Commands::Run {
            config,
            frames,
            fps,
            model_size,
            stats_interval,
            json,
        } => commands::run::run(
            &config,
            commands::run::RunOptions {
                frames,
                fps,
                model_size,
                stats_interval,
                json,
            },
        ),
    }
}
