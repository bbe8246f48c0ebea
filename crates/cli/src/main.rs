//! Fitness Predictor CLI
//!
//! Collects workout and body measurements from the command line, runs them
//! through the prediction pipeline and prints the result.

mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{check, predict, schema};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Fitness Predictor CLI
#[derive(Parser)]
#[command(name = "fitp")]
#[command(author, version, about = "Predict workout performance scores and calories burned", long_about = None)]
pub struct Cli {
    /// Directory holding model and scaler artifacts (can also be set via FITP_ARTIFACT_DIR)
    #[arg(long, env = "FITP_ARTIFACT_DIR", global = true)]
    pub artifact_dir: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'o', default_value = "table", global = true)]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a prediction
    Predict {
        /// Model variant (performance, calorie_burn)
        variant: String,

        /// Input field as KEY=VALUE (repeatable)
        #[arg(long = "field", short = 'f', value_name = "KEY=VALUE")]
        fields: Vec<String>,

        /// JSON file with input fields; --field values take precedence
        #[arg(long, short)]
        input: Option<PathBuf>,

        /// Clip out-of-range values into their declared bounds instead of rejecting them
        #[arg(long)]
        clip: bool,
    },

    /// Show the feature schema and input fields of a variant
    Schema {
        /// Model variant (performance, calorie_burn)
        variant: String,
    },

    /// Load artifacts and report checksums and declared features
    Check {
        /// Only check this variant
        variant: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = config::Config::load()?;
    let layout = config.artifact_layout(cli.artifact_dir.clone());

    match cli.command {
        Commands::Predict {
            variant,
            fields,
            input,
            clip,
        } => {
            predict::run_prediction(&layout, &variant, &fields, input.as_deref(), clip, cli.format)?;
        }
        Commands::Schema { variant } => {
            schema::show_schema(&variant, cli.format)?;
        }
        Commands::Check { variant } => {
            check::check_artifacts(&layout, variant.as_deref(), cli.format)?;
        }
    }

    Ok(())
}
