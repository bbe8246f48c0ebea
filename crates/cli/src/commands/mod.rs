//! CLI subcommands

pub mod check;
pub mod predict;
pub mod schema;

use anyhow::{anyhow, Result};
use predictor_lib::predictor::ModelVariant;

/// Parse a variant name given on the command line
pub fn parse_variant(name: &str) -> Result<ModelVariant> {
    name.parse::<ModelVariant>().map_err(|e| anyhow!(e))
}
