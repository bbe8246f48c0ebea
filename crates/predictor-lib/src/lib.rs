//! Fitness prediction library
//!
//! This crate provides the core functionality for:
//! - Encoding raw workout and body measurements into model feature vectors
//! - Applying pre-fitted scalers
//! - Running ONNX or linear models behind a schema check
//! - Loading and checksumming artifacts at startup
//! - Health reporting and observability

pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod predictor;

pub use error::{
    ArtifactRole, EncodingError, ErrorKind, InferenceCause, InferenceError, LoadError,
    PredictionError, ScalingError, SchemaMismatch, Stage,
};
pub use health::{ComponentStatus, HealthReport, HealthResponse, ReadinessResponse};
pub use models::*;
pub use observability::{PredictorMetrics, StructuredLogger};
