//! Prediction command
//!
//! Collects input from `--field` assignments and an optional JSON file,
//! enforces the declared field bounds, then runs the variant's pipeline.

use anyhow::{bail, Context, Result};
use colored::Colorize;
use predictor_lib::predictor::{
    ArtifactLayout, ArtifactLoader, FieldBound, InputKind, ModelVariant, OutputFormatter,
    PredictionOutcome, PredictionPipeline,
};
use predictor_lib::{RawInput, RawValue};
use std::path::Path;
use tabled::Tabled;
use tracing::debug;

use super::parse_variant;
use crate::output::{print_error, print_json, print_success, print_table, print_warning, OutputFormat};

/// A value rounded or moved into its declared bound by `--clip`
#[derive(Debug, Clone, PartialEq)]
pub struct Adjustment {
    pub field: String,
    pub original: f64,
    pub adjusted: f64,
    pub bound: FieldBound,
}

/// Row comparing expected and supplied feature names
#[derive(Tabled)]
struct FeatureRow {
    #[tabled(rename = "#")]
    position: usize,
    #[tabled(rename = "Expected")]
    expected: String,
    #[tabled(rename = "Supplied")]
    supplied: String,
}

/// Merge the input file (if any) with `--field` assignments; assignments win
pub fn collect_input(fields: &[String], input_file: Option<&Path>) -> Result<RawInput> {
    let mut input = match input_file {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read input file {}", path.display()))?;
            serde_json::from_str::<RawInput>(&content)
                .with_context(|| format!("Input file {} is not a JSON object", path.display()))?
        }
        None => RawInput::new(),
    };

    let mut assigned = RawInput::new();
    for field in fields {
        match RawInput::parse_assignment(field) {
            Some((key, value)) => assigned.insert(key, value),
            None => bail!("Invalid --field '{}', expected KEY=VALUE", field),
        }
    }
    input.merge(assigned);

    Ok(input)
}

fn numeric_value(value: &RawValue) -> Option<f64> {
    match value {
        RawValue::Number(n) => Some(*n),
        RawValue::Text(text) => text.trim().parse::<f64>().ok(),
    }
}

/// Reject out-of-bound or fractional integer fields, or clip and round them
/// when `clip` is set.
///
/// Missing and non-numeric fields are left for the encoder to report.
pub fn enforce_bounds(
    variant: ModelVariant,
    input: &mut RawInput,
    clip: bool,
) -> Result<Vec<Adjustment>> {
    let mut adjustments = Vec::new();

    for field in variant.input_fields() {
        let InputKind::Numeric {
            bound,
            unit,
            integer,
        } = field.kind
        else {
            continue;
        };
        let Some(value) = input.get(field.name).and_then(numeric_value) else {
            continue;
        };
        if !value.is_finite() {
            continue;
        }

        let mut adjusted = value;
        if integer && adjusted.fract() != 0.0 {
            if !clip {
                bail!(
                    "{}={} must be a whole number (use --clip to round)",
                    field.name,
                    value
                );
            }
            adjusted = adjusted.round();
        }
        if !bound.contains(adjusted) {
            if !clip {
                bail!(
                    "{}={} is outside the allowed range {} {} (use --clip to clamp)",
                    field.name,
                    value,
                    bound,
                    unit
                );
            }
            adjusted = bound.clamp(adjusted);
        }

        if adjusted != value {
            input.insert(field.name, adjusted);
            adjustments.push(Adjustment {
                field: field.name.to_string(),
                original: value,
                adjusted,
                bound,
            });
        }
    }

    Ok(adjustments)
}

/// Input fields the variant does not declare
fn unknown_fields(variant: ModelVariant, input: &RawInput) -> Vec<String> {
    input
        .iter()
        .filter(|(name, _)| variant.input_field(name).is_none())
        .map(|(name, _)| name.to_string())
        .collect()
}

/// Run a prediction and print the outcome
pub fn run_prediction(
    layout: &ArtifactLayout,
    variant: &str,
    fields: &[String],
    input_file: Option<&Path>,
    clip: bool,
    format: OutputFormat,
) -> Result<()> {
    let variant = parse_variant(variant)?;
    let mut input = collect_input(fields, input_file)?;

    for name in unknown_fields(variant, &input) {
        print_warning(&format!("Ignoring unknown field {}", name));
    }

    let adjustments = enforce_bounds(variant, &mut input, clip)?;
    for adj in &adjustments {
        print_warning(&format!(
            "{} adjusted from {} to {} (allowed {})",
            adj.field, adj.original, adj.adjusted, adj.bound
        ));
    }

    let artifacts = ArtifactLoader::new(layout.clone())
        .load_variant(variant)
        .with_context(|| format!("Failed to load {} artifacts", variant))?;
    let pipeline = PredictionPipeline::from_artifacts(&artifacts)?;
    debug!(variant = %variant, fields = input.len(), "Running prediction");

    let formatter = OutputFormatter::new();
    let outcome = formatter.from_result(variant, &pipeline.predict(&input));

    match format {
        OutputFormat::Json => print_json(&outcome)?,
        OutputFormat::Table => print_outcome(&outcome, &formatter),
    }

    if !outcome.is_success() {
        bail!("{} prediction failed", variant);
    }
    Ok(())
}

fn print_outcome(outcome: &PredictionOutcome, formatter: &OutputFormatter) {
    let places = formatter.config().decimal_places;
    if outcome.is_success() {
        print_success(&outcome.headline(places).bold().to_string());
        return;
    }

    print_error(&outcome.headline(places));
    if let Some(stage) = outcome.stage {
        eprintln!("Stage: {:?}", stage);
    }

    let expected = outcome.expected_features.as_deref().unwrap_or_default();
    let supplied = outcome.supplied_features.as_deref().unwrap_or_default();
    if expected.is_empty() && supplied.is_empty() {
        return;
    }

    let rows: Vec<FeatureRow> = (0..expected.len().max(supplied.len()))
        .map(|idx| {
            let e = expected.get(idx).map(String::as_str).unwrap_or("-");
            let s = supplied.get(idx).map(String::as_str).unwrap_or("-");
            let (e, s) = if e == s {
                (e.to_string(), s.to_string())
            } else {
                (e.red().to_string(), s.red().to_string())
            };
            FeatureRow {
                position: idx,
                expected: e,
                supplied: s,
            }
        })
        .collect();
    print_table(rows);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_fields_override_input_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"Age": 30, "Gender": "Female"}}"#).unwrap();

        let input = collect_input(
            &["Age=41".to_string(), "Workout_Type=Yoga".to_string()],
            Some(file.path()),
        )
        .unwrap();

        assert_eq!(input.get("Age"), Some(&RawValue::Number(41.0)));
        assert_eq!(input.get("Gender"), Some(&RawValue::from("Female")));
        assert_eq!(input.get("Workout_Type"), Some(&RawValue::from("Yoga")));
    }

    #[test]
    fn test_invalid_assignment_rejected() {
        let err = collect_input(&["Age".to_string()], None).unwrap_err();
        assert!(err.to_string().contains("KEY=VALUE"));
    }

    #[test]
    fn test_out_of_bound_rejected_without_clip() {
        let mut input = RawInput::new().with("Age", 95).with("Weight", 70);
        let err = enforce_bounds(ModelVariant::Performance, &mut input, false).unwrap_err();
        assert!(err.to_string().contains("Age=95"));
        assert!(err.to_string().contains("10–80"));
    }

    #[test]
    fn test_clip_clamps_into_bound() {
        let mut input = RawInput::new()
            .with("Age", 95)
            .with("Height", 2.8)
            .with("Gender", "Male");
        let adjustments = enforce_bounds(ModelVariant::CalorieBurn, &mut input, true).unwrap();

        assert_eq!(adjustments.len(), 2);
        assert_eq!(input.get("Age"), Some(&RawValue::Number(80.0)));
        assert_eq!(input.get("Height"), Some(&RawValue::Number(2.5)));
        assert_eq!(adjustments[0].original, 95.0);
    }

    #[test]
    fn test_fractional_integer_field_rejected_without_clip() {
        let mut input = RawInput::new().with("Age", 25.7).with("Weight", 70.5);
        let err = enforce_bounds(ModelVariant::Performance, &mut input, false).unwrap_err();
        assert!(err.to_string().contains("Age=25.7 must be a whole number"));

        // Weight is not an integer field
        let mut input = RawInput::new().with("Weight", 70.5).with("Heart_Rate", "120");
        assert!(enforce_bounds(ModelVariant::Performance, &mut input, false)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_clip_rounds_integer_fields() {
        let mut input = RawInput::new()
            .with("Age", 25.7)
            .with("Workout_Frequency", 7.6)
            .with("Session_Duration", 1.25);
        let adjustments = enforce_bounds(ModelVariant::CalorieBurn, &mut input, true).unwrap();

        assert_eq!(input.get("Age"), Some(&RawValue::Number(26.0)));
        // Rounded to 8, then clamped into 1–7
        assert_eq!(input.get("Workout_Frequency"), Some(&RawValue::Number(7.0)));
        assert_eq!(input.get("Session_Duration"), Some(&RawValue::Number(1.25)));
        assert_eq!(adjustments.len(), 2);
    }

    #[test]
    fn test_height_bound_depends_on_variant() {
        let mut cm = RawInput::new().with("Height", 170);
        assert!(enforce_bounds(ModelVariant::Performance, &mut cm, false).is_ok());

        let mut cm = RawInput::new().with("Height", 170);
        assert!(enforce_bounds(ModelVariant::CalorieBurn, &mut cm, false).is_err());
    }

    #[test]
    fn test_unknown_fields() {
        let input = RawInput::new().with("Age", 30).with("Mood", "great");
        assert_eq!(unknown_fields(ModelVariant::Performance, &input), vec!["Mood"]);
    }
}
