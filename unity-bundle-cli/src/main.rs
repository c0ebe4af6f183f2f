//! Unity Bundle Inspector CLI
//!
//! Command-line interface for inspecting Unity asset bundles.

mod commands;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use unity_bundle::{BundleParser, CommonStrings};

#[derive(Parser)]
#[command(name = "unity-bundle")]
#[command(about = "Inspect Unity asset bundles")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Load the common type-tree string table from this file
    #[arg(long, value_name = "PATH", global = true)]
    strings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show header fields, blocks, nodes and assets
    Info {
        /// Bundle file
        file: PathBuf,
    },

    /// List the object directory of one asset
    Objects {
        /// Bundle file
        file: PathBuf,

        /// Asset index
        #[arg(short, long, default_value_t = 0)]
        asset: usize,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Print the type trees of one asset
    Types {
        /// Bundle file
        file: PathBuf,

        /// Asset index
        #[arg(short, long, default_value_t = 0)]
        asset: usize,

        /// Only this class id
        #[arg(long, allow_negative_numbers = true)]
        class: Option<i32>,

        /// Print JSON instead of indented listings
        #[arg(long)]
        json: bool,
    },

    /// Write one embedded file's raw bytes
    Extract {
        /// Bundle file
        file: PathBuf,

        /// Node (or legacy asset) name
        node: String,

        /// Output path
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let parser = match &cli.strings {
        Some(path) => {
            let strings = CommonStrings::from_file(path)
                .with_context(|| format!("Failed to load string table {}", path.display()))?;
            BundleParser::with_strings(Arc::new(strings))
        }
        None => BundleParser::new(),
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match cli.command {
        Commands::Info { file } => commands::info(&parser, &file, &mut out),
        Commands::Objects { file, asset, json } => {
            commands::objects(&parser, &file, asset, json, &mut out)
        }
        Commands::Types {
            file,
            asset,
            class,
            json,
        } => commands::types(&parser, &file, asset, class, json, &mut out),
        Commands::Extract { file, node, output } => {
            commands::extract(&parser, &file, &node, &output, &mut out)
        }
    }
}

/// Log to stderr; `RUST_LOG` overrides the level picked by `-v`
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}
