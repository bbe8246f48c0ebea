//! Core data models for the fitness predictor

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single user-supplied value before encoding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
}

impl RawValue {
    /// Interpret free-form text, as typed on a command line or in a form field.
    ///
    /// Anything that parses as a finite number becomes `Number`, the rest stays text.
    pub fn infer(text: &str) -> Self {
        match text.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => RawValue::Number(n),
            _ => RawValue::Text(text.trim().to_string()),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            RawValue::Number(n) => Some(*n),
            RawValue::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            RawValue::Text(s) => Some(s),
            RawValue::Number(_) => None,
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Number(n) => write!(f, "{}", n),
            RawValue::Text(s) => write!(f, "{:?}", s),
        }
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Number(value)
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        RawValue::Number(value as f64)
    }
}

impl From<i32> for RawValue {
    fn from(value: i32) -> Self {
        RawValue::Number(value as f64)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Text(value)
    }
}

/// Raw named fields collected from the user
///
/// Serializes as a plain JSON object, e.g. `{"Age": 25, "Gender": "Male"}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawInput {
    fields: BTreeMap<String, RawValue>,
}

impl RawInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<RawValue>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<RawValue> {
        self.fields.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&RawValue> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Merge `other` into `self`, with `other` winning on conflicts
    pub fn merge(&mut self, other: RawInput) {
        self.fields.extend(other.fields);
    }

    /// Parse a `KEY=VALUE` assignment into a field
    pub fn parse_assignment(text: &str) -> Option<(String, RawValue)> {
        let (key, value) = text.split_once('=')?;
        let key = key.trim();
        if key.is_empty() {
            return None;
        }
        Some((key.to_string(), RawValue::infer(value)))
    }
}

impl<K: Into<String>, V: Into<RawValue>> FromIterator<(K, V)> for RawInput {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Ordered, named numeric features in the exact layout a model was trained on
///
/// Only built through `push` or `FromIterator`, which keep names and values
/// the same length; it serializes for output but is never read back.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeatureVector {
    names: Vec<String>,
    values: Vec<f64>,
}

impl FeatureVector {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            names: Vec::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, name: impl Into<String>, value: f64) {
        self.names.push(name.into());
        self.values.push(value);
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .and_then(|idx| self.values.get(idx).copied())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.names.iter().map(String::as_str).zip(self.values.iter().copied())
    }

    /// Same names, new values. Returns `None` when the lengths differ.
    pub fn with_values(&self, values: Vec<f64>) -> Option<Self> {
        if values.len() != self.names.len() {
            return None;
        }
        Some(Self {
            names: self.names.clone(),
            values,
        })
    }

    /// Values narrowed to f32 for tensor input
    pub fn to_f32(&self) -> Vec<f32> {
        self.values.iter().map(|v| *v as f32).collect()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for FeatureVector {
    fn from_iter<T: IntoIterator<Item = (K, f64)>>(iter: T) -> Self {
        let mut fv = FeatureVector::default();
        for (name, value) in iter {
            fv.push(name, value);
        }
        fv
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_value_infer() {
        assert_eq!(RawValue::infer("70"), RawValue::Number(70.0));
        assert_eq!(RawValue::infer(" 1.5 "), RawValue::Number(1.5));
        assert_eq!(RawValue::infer("Male"), RawValue::Text("Male".to_string()));
        assert_eq!(RawValue::infer("NaN"), RawValue::Text("NaN".to_string()));
    }

    #[test]
    fn test_raw_input_from_json() {
        let input: RawInput =
            serde_json::from_str(r#"{"Age": 25, "Gender": "Male", "Water_Intake": 1.5}"#).unwrap();
        assert_eq!(input.len(), 3);
        assert_eq!(input.get("Age"), Some(&RawValue::Number(25.0)));
        assert_eq!(input.get("Gender"), Some(&RawValue::Text("Male".to_string())));
    }

    #[test]
    fn test_parse_assignment() {
        let (k, v) = RawInput::parse_assignment("Weight=70.5").unwrap();
        assert_eq!(k, "Weight");
        assert_eq!(v, RawValue::Number(70.5));
        assert!(RawInput::parse_assignment("Weight").is_none());
        assert!(RawInput::parse_assignment("=3").is_none());
    }

    #[test]
    fn test_merge_prefers_other() {
        let mut base = RawInput::new().with("Age", 30).with("Gender", "Female");
        base.merge(RawInput::new().with("Age", 40));
        assert_eq!(base.get("Age"), Some(&RawValue::Number(40.0)));
        assert_eq!(base.len(), 2);
    }

    #[test]
    fn test_feature_vector_with_values() {
        let fv: FeatureVector = [("a", 1.0), ("b", 2.0)].into_iter().collect();
        let scaled = fv.with_values(vec![0.5, 0.25]).unwrap();
        assert_eq!(scaled.names(), fv.names());
        assert_eq!(scaled.get("b"), Some(0.25));
        assert!(fv.with_values(vec![1.0]).is_none());
    }

    #[test]
    fn test_feature_vector_serializes_parallel_lists() {
        let fv: FeatureVector = [("Age", 25.0), ("BMI", 24.22)].into_iter().collect();
        assert_eq!(
            serde_json::to_value(&fv).unwrap(),
            serde_json::json!({"names": ["Age", "BMI"], "values": [25.0, 24.22]})
        );
        assert_eq!(fv.get("BMI"), Some(24.22));
        assert_eq!(fv.get("Height"), None);
    }
}
