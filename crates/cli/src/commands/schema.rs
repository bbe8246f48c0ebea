//! Schema command

use anyhow::Result;
use colored::Colorize;
use predictor_lib::predictor::{FeatureSource, FeatureSpec, InputField, InputKind, ModelVariant};
use serde::Serialize;
use tabled::Tabled;

use super::parse_variant;
use crate::output::{print_info, print_json, print_table, OutputFormat};

#[derive(Tabled)]
struct FeatureRow {
    #[tabled(rename = "#")]
    position: usize,
    #[tabled(rename = "Feature")]
    name: String,
    #[tabled(rename = "Source")]
    source: String,
}

#[derive(Tabled)]
struct InputRow {
    #[tabled(rename = "Field")]
    name: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Bound / Choices")]
    allowed: String,
    #[tabled(rename = "Unit")]
    unit: String,
    #[tabled(rename = "Description")]
    description: String,
}

#[derive(Serialize)]
struct SchemaView {
    variant: ModelVariant,
    target: &'static str,
    requires_scaler: bool,
    features: &'static [FeatureSpec],
    inputs: &'static [InputField],
}

fn describe_source(source: &FeatureSource) -> String {
    match source {
        FeatureSource::Numeric { field } => format!("{} (numeric)", field),
        FeatureSource::Categorical { field, .. } => format!("{} (encoded)", field),
        FeatureSource::Bmi {
            weight,
            height,
            height_unit,
        } => format!("{} / ({} in {})²", weight, height, height_unit.symbol()),
    }
}

fn input_row(field: &InputField) -> InputRow {
    match field.kind {
        InputKind::Numeric {
            bound,
            unit,
            integer,
        } => InputRow {
            name: field.name.to_string(),
            kind: if integer { "integer" } else { "number" }.to_string(),
            allowed: bound.to_string(),
            unit: unit.to_string(),
            description: field.description.to_string(),
        },
        InputKind::Categorical { kind } => InputRow {
            name: field.name.to_string(),
            kind: "choice".to_string(),
            allowed: kind
                .codes()
                .iter()
                .map(|(label, code)| format!("{}={}", label, code))
                .collect::<Vec<_>>()
                .join(", "),
            unit: String::new(),
            description: field.description.to_string(),
        },
    }
}

/// Show the feature schema and input fields of a variant
pub fn show_schema(variant: &str, format: OutputFormat) -> Result<()> {
    let variant = parse_variant(variant)?;

    match format {
        OutputFormat::Json => {
            print_json(&SchemaView {
                variant,
                target: variant.target_label(),
                requires_scaler: variant.requires_scaler(),
                features: variant.schema(),
                inputs: variant.input_fields(),
            })?;
        }
        OutputFormat::Table => {
            println!(
                "{} {} ({} features)",
                variant.to_string().bold(),
                variant.target_label(),
                variant.feature_count()
            );
            if variant.requires_scaler() {
                print_info("Features are standardized before inference");
            }

            println!("\n{}", "Model features".bold());
            let rows: Vec<FeatureRow> = variant
                .schema()
                .iter()
                .enumerate()
                .map(|(position, spec)| FeatureRow {
                    position,
                    name: spec.name.to_string(),
                    source: describe_source(&spec.source),
                })
                .collect();
            print_table(rows);

            println!("\n{}", "Input fields".bold());
            print_table(variant.input_fields().iter().map(input_row).collect());
        }
    }

    Ok(())
}
