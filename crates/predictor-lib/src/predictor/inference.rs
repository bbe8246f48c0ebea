//! Model inference
//!
//! ONNX models run through tract; linear models are plain JSON coefficient
//! files. `invoke_model` wraps either behind the schema check and attaches
//! the expected/supplied feature names to any failure.

use super::Model;
use crate::error::{InferenceCause, InferenceError, SchemaMismatch};
use crate::models::FeatureVector;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tract_onnx::pb::tensor_shape_proto::dimension;
use tract_onnx::pb::{type_proto, ModelProto};
use tract_onnx::prelude::*;
use tracing::{debug, warn};

/// ONNX metadata property holding comma-separated feature names
pub const FEATURE_NAMES_KEY: &str = "feature_names";

/// Maximum inference latency before warning
const MAX_INFERENCE_MS: u128 = 5;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// ONNX model run with tract
pub struct OnnxModel {
    plan: TractModel,
    feature_names: Option<Vec<String>>,
    n_features: usize,
}

impl OnnxModel {
    /// Parse and optimize an ONNX model.
    ///
    /// The input width is the one the graph declares. A symbolic width falls
    /// back to the `feature_names` metadata, then to `fallback_width`.
    pub fn from_bytes(model_bytes: &[u8], fallback_width: usize) -> Result<Self> {
        let onnx = tract_onnx::onnx();
        let proto = onnx
            .proto_model_for_read(&mut std::io::Cursor::new(model_bytes))
            .context("Failed to parse ONNX model")?;

        let feature_names = proto
            .metadata_props
            .iter()
            .find(|p| p.key == FEATURE_NAMES_KEY)
            .map(|p| parse_feature_names(&p.value))
            .filter(|names| !names.is_empty());

        let declared = declared_input_width(&proto);
        if let (Some(width), Some(names)) = (declared, &feature_names) {
            if names.len() != width {
                bail!(
                    "metadata lists {} feature names for an input of width {}",
                    names.len(),
                    width
                );
            }
        }
        let n_features = declared
            .or_else(|| feature_names.as_ref().map(Vec::len))
            .unwrap_or(fallback_width);

        let plan = onnx
            .model_for_proto_model(&proto)
            .context("Failed to build ONNX graph")?
            .with_input_fact(0, f32::fact([1, n_features]).into())
            .with_context(|| format!("Failed to set input shape [1, {}]", n_features))?
            .into_optimized()
            .context("Failed to optimize model")?
            .into_runnable()
            .context("Failed to create runnable model")?;

        Ok(Self {
            plan,
            feature_names,
            n_features,
        })
    }

    fn features_to_tensor(&self, features: &FeatureVector) -> Result<Tensor> {
        let array = tract_ndarray::Array2::from_shape_vec((1, self.n_features), features.to_f32())
            .context("Feature vector does not fit the model input shape")?;
        Ok(array.into())
    }
}

/// Width of the graph's first non-initializer input, when it is a fixed
/// `[batch, n]` shape
fn declared_input_width(proto: &ModelProto) -> Option<usize> {
    let graph = proto.graph.as_ref()?;
    let input = graph
        .input
        .iter()
        .find(|input| !graph.initializer.iter().any(|t| t.name == input.name))?;
    let type_proto::Value::TensorType(tensor) = input.r#type.as_ref()?.value.as_ref()?;
    let dims = &tensor.shape.as_ref()?.dim;
    if dims.len() != 2 {
        return None;
    }
    match dims[1].value.as_ref()? {
        dimension::Value::DimValue(n) if *n > 0 => usize::try_from(*n).ok(),
        _ => None,
    }
}

impl Model for OnnxModel {
    fn predict(&self, features: &FeatureVector) -> Result<f64> {
        let start = Instant::now();
        let input = self.features_to_tensor(features)?;

        let result = self.plan.run(tvec!(input.into()))?;
        let output = result.first().context("No output from model")?;
        // Regressors emit f32, classifiers an integer label
        let output = output.cast_to::<f32>()?;
        let value = output
            .to_array_view::<f32>()?
            .iter()
            .next()
            .copied()
            .context("Model returned an empty output")?;

        let elapsed = start.elapsed();
        if elapsed.as_millis() > MAX_INFERENCE_MS {
            warn!(elapsed_ms = elapsed.as_millis(), "Inference exceeded {}ms target", MAX_INFERENCE_MS);
        } else {
            debug!(elapsed_us = elapsed.as_micros(), "Inference completed");
        }

        Ok(value as f64)
    }

    fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    fn n_features(&self) -> Option<usize> {
        Some(self.n_features)
    }

    fn kind(&self) -> &'static str {
        "onnx"
    }
}

/// Split a comma-separated feature-name list
pub fn parse_feature_names(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Linear model stored as JSON coefficients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    #[serde(default)]
    pub feature_names: Option<Vec<String>>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

/// JSON model artifact, tagged by `kind`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    Linear(LinearModel),
}

impl ModelArtifact {
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let artifact: ModelArtifact = serde_json::from_slice(bytes)?;
        match &artifact {
            ModelArtifact::Linear(linear) => linear.validate()?,
        }
        Ok(artifact)
    }

    pub fn into_model(self) -> Box<dyn Model> {
        match self {
            ModelArtifact::Linear(linear) => Box::new(linear),
        }
    }
}

impl LinearModel {
    fn validate(&self) -> Result<()> {
        if self.coefficients.is_empty() {
            bail!("linear model has no coefficients");
        }
        if let Some(names) = &self.feature_names {
            if names.len() != self.coefficients.len() {
                bail!(
                    "linear model declares {} feature names for {} coefficients",
                    names.len(),
                    self.coefficients.len()
                );
            }
        }
        if !self.intercept.is_finite() || self.coefficients.iter().any(|c| !c.is_finite()) {
            bail!("linear model parameters contain non-finite values");
        }
        Ok(())
    }
}

impl Model for LinearModel {
    fn predict(&self, features: &FeatureVector) -> Result<f64> {
        if features.len() != self.coefficients.len() {
            bail!(
                "expected {} features, got {}",
                self.coefficients.len(),
                features.len()
            );
        }
        let dot: f64 = self
            .coefficients
            .iter()
            .zip(features.values())
            .map(|(c, x)| c * x)
            .sum();
        Ok(self.intercept + dot)
    }

    fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    fn n_features(&self) -> Option<usize> {
        Some(self.coefficients.len())
    }

    fn kind(&self) -> &'static str {
        "linear"
    }
}

/// Invoke a model, checking the supplied schema first.
///
/// Every failure carries the model's expected names (if exposed) and the
/// names that were supplied.
pub fn invoke_model(model: &dyn Model, features: &FeatureVector) -> Result<f64, InferenceError> {
    let fail = |cause: InferenceCause| InferenceError {
        expected: model.feature_names().map(<[String]>::to_vec),
        supplied: features.names().to_vec(),
        cause,
    };

    if let Some(expected) = model.feature_names() {
        if SchemaMismatch::compare(expected, features.names()).is_some() {
            return Err(fail(InferenceCause::SchemaMismatch));
        }
    } else if let Some(expected) = model.n_features() {
        if expected != features.len() {
            return Err(fail(InferenceCause::FeatureCount {
                expected,
                supplied: features.len(),
            }));
        }
    }

    let value = model
        .predict(features)
        .map_err(|e| fail(InferenceCause::Model(e.into())))?;

    if !value.is_finite() {
        return Err(fail(InferenceCause::NonFinite(value)));
    }
    Ok(value)
}

/// ONNX graphs for tests: `output = input · weights`, optionally cast to an
/// int64 label the way classifiers emit one.
#[cfg(test)]
pub(crate) mod onnx_fixture {
    use prost::Message;
    use tract_onnx::pb::attribute_proto::AttributeType;
    use tract_onnx::pb::tensor_proto::DataType;
    use tract_onnx::pb::tensor_shape_proto::{dimension, Dimension};
    use tract_onnx::pb::{
        type_proto, AttributeProto, GraphProto, ModelProto, NodeProto, OperatorSetIdProto,
        StringStringEntryProto, TensorProto, TensorShapeProto, TypeProto, ValueInfoProto,
    };

    pub enum Width {
        Fixed(usize),
        Symbolic,
    }

    fn value_info(name: &str, elem_type: DataType, dims: Vec<dimension::Value>) -> ValueInfoProto {
        ValueInfoProto {
            name: name.to_string(),
            r#type: Some(TypeProto {
                value: Some(type_proto::Value::TensorType(type_proto::Tensor {
                    elem_type: elem_type as i32,
                    shape: Some(TensorShapeProto {
                        dim: dims
                            .into_iter()
                            .map(|value| Dimension {
                                value: Some(value),
                                ..Default::default()
                            })
                            .collect(),
                    }),
                })),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    pub fn matmul(
        weights: &[f32],
        width: Width,
        feature_names: Option<&str>,
        label_output: bool,
    ) -> Vec<u8> {
        let input_width = match width {
            Width::Fixed(n) => dimension::Value::DimValue(n as i64),
            Width::Symbolic => dimension::Value::DimParam("n_features".to_string()),
        };

        let mut nodes = vec![NodeProto {
            input: vec!["input".to_string(), "weights".to_string()],
            output: vec!["score".to_string()],
            op_type: "MatMul".to_string(),
            ..Default::default()
        }];
        let output_type = if label_output {
            nodes.push(NodeProto {
                input: vec!["score".to_string()],
                output: vec!["output".to_string()],
                op_type: "Cast".to_string(),
                attribute: vec![AttributeProto {
                    name: "to".to_string(),
                    r#type: AttributeType::Int as i32,
                    i: DataType::Int64 as i64,
                    ..Default::default()
                }],
                ..Default::default()
            });
            DataType::Int64
        } else {
            nodes[0].output = vec!["output".to_string()];
            DataType::Float
        };

        let model = ModelProto {
            ir_version: 7,
            opset_import: vec![OperatorSetIdProto {
                domain: String::new(),
                version: 13,
            }],
            graph: Some(GraphProto {
                name: "matmul".to_string(),
                node: nodes,
                initializer: vec![TensorProto {
                    name: "weights".to_string(),
                    dims: vec![weights.len() as i64, 1],
                    data_type: DataType::Float as i32,
                    float_data: weights.to_vec(),
                    ..Default::default()
                }],
                input: vec![value_info(
                    "input",
                    DataType::Float,
                    vec![dimension::Value::DimValue(1), input_width],
                )],
                output: vec![value_info(
                    "output",
                    output_type,
                    vec![dimension::Value::DimValue(1), dimension::Value::DimValue(1)],
                )],
                ..Default::default()
            }),
            metadata_props: feature_names
                .map(|names| StringStringEntryProto {
                    key: super::FEATURE_NAMES_KEY.to_string(),
                    value: names.to_string(),
                })
                .into_iter()
                .collect(),
            ..Default::default()
        };
        model.encode_to_vec()
    }
}
