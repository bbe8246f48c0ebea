//! ML prediction engine

mod categorical;
mod features;
mod inference;
mod loader;
mod output;
mod pipeline;
mod scaler;
mod schema;

pub use categorical::{
    Categorical, CategoricalKind, ExperienceLevel, Gender, GymWorkoutType, WorkoutType,
};
pub use features::{body_mass_index, FeatureEncoder};
pub use inference::{
    invoke_model, parse_feature_names, LinearModel, ModelArtifact, OnnxModel,
    FEATURE_NAMES_KEY,
};
pub use loader::{
    compute_checksum, validate_artifacts, ArtifactFormat, ArtifactInfo, ArtifactLayout,
    ArtifactLoader, LoadedArtifacts,
};
pub use output::{OutcomeStatus, OutputConfig, OutputFormatter, PredictionOutcome};
pub use pipeline::{Prediction, PredictionPipeline, PredictorRegistry};
pub use scaler::{scale_features, ScalerArtifact};
pub use schema::{
    FeatureSource, FeatureSpec, FieldBound, HeightUnit, InputField, InputKind, ModelVariant,
};

use crate::models::FeatureVector;
use anyhow::Result;

/// A trained model that maps a feature vector to one value
pub trait Model: Send + Sync {
    /// Run the model on an already encoded (and scaled) vector
    fn predict(&self, features: &FeatureVector) -> Result<f64>;

    /// Feature names the model was trained on, when the artifact records them
    fn feature_names(&self) -> Option<&[String]> {
        None
    }

    /// Input width, when known
    fn n_features(&self) -> Option<usize>;

    fn kind(&self) -> &'static str;
}

/// A fitted transform applied between encoding and inference
pub trait Scaler: Send + Sync {
    fn feature_names(&self) -> Option<&[String]>;

    fn n_features(&self) -> usize;

    fn transform_values(&self, values: &[f64]) -> Result<Vec<f64>>;

    fn kind(&self) -> &'static str;
}
