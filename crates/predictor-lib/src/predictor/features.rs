//! Feature encoding for ML inference
//!
//! Turns a raw input record into the ordered feature vector a variant's
//! model was trained on. Categorical fields are replaced by their codes and
//! derived features (BMI) are computed from raw fields. Numeric fields pass
//! through unchanged; bounds are the input collector's job.

use super::schema::{FeatureSource, FeatureSpec, HeightUnit, ModelVariant};
use crate::error::EncodingError;
use crate::models::{FeatureVector, RawInput, RawValue};

/// Encodes raw input for one model variant
#[derive(Debug, Clone, Copy)]
pub struct FeatureEncoder {
    variant: ModelVariant,
}

impl FeatureEncoder {
    pub fn new(variant: ModelVariant) -> Self {
        Self { variant }
    }

    pub fn variant(&self) -> ModelVariant {
        self.variant
    }

    pub fn schema(&self) -> &'static [FeatureSpec] {
        self.variant.schema()
    }

    pub fn encode(&self, input: &RawInput) -> Result<FeatureVector, EncodingError> {
        let schema = self.schema();
        let mut features = FeatureVector::with_capacity(schema.len());
        for spec in schema {
            features.push(spec.name, encode_feature(spec, input)?);
        }
        Ok(features)
    }
}

fn encode_feature(spec: &FeatureSpec, input: &RawInput) -> Result<f64, EncodingError> {
    match spec.source {
        FeatureSource::Numeric { field } => numeric_field(input, field),
        FeatureSource::Categorical { field, kind } => {
            let value = required(input, field)?;
            kind.encode(field, value).map(|code| code as f64)
        }
        FeatureSource::Bmi {
            weight,
            height,
            height_unit,
        } => {
            let weight_kg = numeric_field(input, weight)?;
            let height = numeric_field(input, height)?;
            derive_bmi(spec.name, weight_kg, height, height_unit)
        }
    }
}

fn required<'a>(input: &'a RawInput, field: &str) -> Result<&'a RawValue, EncodingError> {
    input.get(field).ok_or_else(|| EncodingError::MissingField {
        field: field.to_string(),
    })
}

fn numeric_field(input: &RawInput, field: &str) -> Result<f64, EncodingError> {
    let value = match required(input, field)? {
        RawValue::Number(n) => *n,
        RawValue::Text(text) => text.trim().parse::<f64>().map_err(|_| EncodingError::NotNumeric {
            field: field.to_string(),
            value: format!("{:?}", text),
        })?,
    };
    if !value.is_finite() {
        return Err(EncodingError::NonFinite {
            field: field.to_string(),
        });
    }
    Ok(value)
}

fn derive_bmi(
    feature: &str,
    weight_kg: f64,
    height: f64,
    unit: HeightUnit,
) -> Result<f64, EncodingError> {
    let height_m = unit.to_meters(height);
    if height_m <= 0.0 {
        return Err(EncodingError::InvalidDerived {
            feature: feature.to_string(),
            reason: format!("height must be positive, got {}{}", height, unit.symbol()),
        });
    }
    Ok(body_mass_index(weight_kg, height_m))
}

/// Body-mass index from weight in kilograms and height in meters
pub fn body_mass_index(weight_kg: f64, height_m: f64) -> f64 {
    weight_kg / (height_m * height_m)
}
