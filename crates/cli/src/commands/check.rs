//! Artifact check command

use anyhow::{bail, Result};
use predictor_lib::predictor::{ArtifactInfo, ArtifactLayout, ArtifactLoader, ModelVariant};
use serde::Serialize;
use tabled::Tabled;

use super::parse_variant;
use crate::output::{
    color_status, format_bytes, print_error, print_json, print_success, print_table, OutputFormat,
};

#[derive(Tabled)]
struct ArtifactRow {
    #[tabled(rename = "Variant")]
    variant: String,
    #[tabled(rename = "Role")]
    role: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Format")]
    format: String,
    #[tabled(rename = "Checksum")]
    checksum: String,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Path")]
    path: String,
}

impl From<&ArtifactInfo> for ArtifactRow {
    fn from(info: &ArtifactInfo) -> Self {
        Self {
            variant: info.variant.to_string(),
            role: info.role.to_string(),
            kind: info.kind.clone(),
            format: format!("{:?}", info.format).to_lowercase(),
            checksum: info.checksum_prefix().to_string(),
            size: format_bytes(info.size_bytes),
            status: color_status("ok"),
            path: info.path.display().to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct CheckReport {
    artifacts: Vec<ArtifactInfo>,
    failures: Vec<CheckFailure>,
}

#[derive(Debug, Serialize)]
struct CheckFailure {
    variant: ModelVariant,
    error: String,
}

fn run_checks(layout: &ArtifactLayout, variants: &[ModelVariant]) -> CheckReport {
    let loader = ArtifactLoader::new(layout.clone());
    let mut report = CheckReport {
        artifacts: Vec::new(),
        failures: Vec::new(),
    };

    for &variant in variants {
        match loader.load_variant(variant) {
            Ok(loaded) => report.artifacts.extend(loaded.infos().cloned()),
            Err(e) => report.failures.push(CheckFailure {
                variant,
                error: e.to_string(),
            }),
        }
    }

    report
}

/// Load and validate the artifacts of one or all variants
pub fn check_artifacts(
    layout: &ArtifactLayout,
    variant: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let variants = match variant {
        Some(name) => vec![parse_variant(name)?],
        None => ModelVariant::ALL.to_vec(),
    };

    let report = run_checks(layout, &variants);

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => {
            if !report.artifacts.is_empty() {
                print_table(report.artifacts.iter().map(ArtifactRow::from).collect());
            }
            for failure in &report.failures {
                print_error(&format!("{}: {}", failure.variant, failure.error));
            }
            if report.failures.is_empty() {
                print_success(&format!(
                    "All artifacts in {} match their schemas",
                    layout.dir.display()
                ));
            }
        }
    }

    if !report.failures.is_empty() {
        bail!(
            "{} of {} variant(s) failed artifact checks",
            report.failures.len(),
            variants.len()
        );
    }
    Ok(())
}
