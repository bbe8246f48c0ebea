//! Model variants and their feature schemas
//!
//! A schema is the ordered list of features a trained model consumes. The
//! order and names here must match the training data exactly.

use super::categorical::CategoricalKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unit a height field is measured in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeightUnit {
    Centimeters,
    Meters,
}

impl HeightUnit {
    pub fn to_meters(self, value: f64) -> f64 {
        match self {
            HeightUnit::Centimeters => value / 100.0,
            HeightUnit::Meters => value,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            HeightUnit::Centimeters => "cm",
            HeightUnit::Meters => "m",
        }
    }
}

/// Where a feature value comes from
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum FeatureSource {
    /// A raw numeric field, passed through unchanged
    Numeric { field: &'static str },
    /// A raw categorical field, replaced by its integer code
    Categorical {
        field: &'static str,
        kind: CategoricalKind,
    },
    /// Body-mass index computed from weight (kg) and height
    Bmi {
        weight: &'static str,
        height: &'static str,
        height_unit: HeightUnit,
    },
}

/// One named column of a feature vector
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureSpec {
    pub name: &'static str,
    #[serde(flatten)]
    pub source: FeatureSource,
}

impl FeatureSpec {
    const fn numeric(name: &'static str, field: &'static str) -> Self {
        Self {
            name,
            source: FeatureSource::Numeric { field },
        }
    }

    const fn categorical(name: &'static str, field: &'static str, kind: CategoricalKind) -> Self {
        Self {
            name,
            source: FeatureSource::Categorical { field, kind },
        }
    }
}

/// Inclusive bounds declared for a raw numeric field
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldBound {
    pub min: f64,
    pub max: f64,
}

impl FieldBound {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

impl fmt::Display for FieldBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}–{}", self.min, self.max)
    }
}

/// Kind of value an input field accepts
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputKind {
    Numeric {
        bound: FieldBound,
        unit: &'static str,
        integer: bool,
    },
    Categorical {
        kind: CategoricalKind,
    },
}

/// A raw field the input collector must supply
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InputField {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(flatten)]
    pub kind: InputKind,
}

impl InputField {
    const fn number(
        name: &'static str,
        description: &'static str,
        min: f64,
        max: f64,
        unit: &'static str,
    ) -> Self {
        Self {
            name,
            description,
            kind: InputKind::Numeric {
                bound: FieldBound::new(min, max),
                unit,
                integer: false,
            },
        }
    }

    const fn integer(
        name: &'static str,
        description: &'static str,
        min: f64,
        max: f64,
        unit: &'static str,
    ) -> Self {
        Self {
            name,
            description,
            kind: InputKind::Numeric {
                bound: FieldBound::new(min, max),
                unit,
                integer: true,
            },
        }
    }

    const fn choice(name: &'static str, description: &'static str, kind: CategoricalKind) -> Self {
        Self {
            name,
            description,
            kind: InputKind::Categorical { kind },
        }
    }

    pub fn bound(&self) -> Option<FieldBound> {
        match self.kind {
            InputKind::Numeric { bound, .. } => Some(bound),
            InputKind::Categorical { .. } => None,
        }
    }
}

const PERFORMANCE_SCHEMA: &[FeatureSpec] = &[
    FeatureSpec::numeric("Age", "Age"),
    FeatureSpec::categorical("Gender", "Gender", CategoricalKind::Gender),
    FeatureSpec::numeric("Weight", "Weight"),
    FeatureSpec::numeric("Height", "Height"),
    FeatureSpec::numeric("Exercise_Duration", "Exercise_Duration"),
    FeatureSpec::numeric("Heart_Rate", "Heart_Rate"),
    FeatureSpec::numeric("Body_Temperature", "Body_Temperature"),
    FeatureSpec::categorical("Workout_Type", "Workout_Type", CategoricalKind::WorkoutType),
    FeatureSpec::numeric("Water_Intake", "Water_Intake"),
    FeatureSpec::numeric("Sleep_Hours", "Sleep_Hours"),
];

const CALORIE_SCHEMA: &[FeatureSpec] = &[
    FeatureSpec::numeric("Age", "Age"),
    FeatureSpec::categorical("Gender", "Gender", CategoricalKind::Gender),
    FeatureSpec::numeric("Weight (kg)", "Weight"),
    FeatureSpec::numeric("Height (m)", "Height"),
    FeatureSpec::numeric("Max_BPM", "Max_BPM"),
    FeatureSpec::numeric("Avg_BPM", "Avg_BPM"),
    FeatureSpec::numeric("Resting_BPM", "Resting_BPM"),
    FeatureSpec::numeric("Session_Duration (hours)", "Session_Duration"),
    FeatureSpec::categorical("Workout_Type", "Workout_Type", CategoricalKind::GymWorkoutType),
    FeatureSpec::numeric("Fat_Percentage", "Fat_Percentage"),
    FeatureSpec::numeric("Water_Intake (liters)", "Water_Intake"),
    FeatureSpec::numeric("Workout_Frequency (days/week)", "Workout_Frequency"),
    FeatureSpec::categorical(
        "Experience_Level",
        "Experience_Level",
        CategoricalKind::ExperienceLevel,
    ),
    FeatureSpec {
        name: "BMI",
        source: FeatureSource::Bmi {
            weight: "Weight",
            height: "Height",
            height_unit: HeightUnit::Meters,
        },
    },
];

const PERFORMANCE_INPUTS: &[InputField] = &[
    InputField::integer("Age", "Age", 10.0, 80.0, "years"),
    InputField::choice("Gender", "Gender", CategoricalKind::Gender),
    InputField::number("Weight", "Weight", 30.0, 200.0, "kg"),
    InputField::number("Height", "Height", 100.0, 220.0, "cm"),
    InputField::integer("Exercise_Duration", "Exercise duration", 10.0, 240.0, "min"),
    InputField::integer("Heart_Rate", "Average heart rate", 40.0, 200.0, "bpm"),
    InputField::number("Body_Temperature", "Body temperature", 35.0, 42.0, "°C"),
    InputField::choice("Workout_Type", "Workout type", CategoricalKind::WorkoutType),
    InputField::number("Water_Intake", "Water intake", 0.0, 5.0, "l"),
    InputField::number("Sleep_Hours", "Sleep last night", 0.0, 12.0, "h"),
];

const CALORIE_INPUTS: &[InputField] = &[
    InputField::integer("Age", "Age", 10.0, 80.0, "years"),
    InputField::choice("Gender", "Gender", CategoricalKind::Gender),
    InputField::number("Weight", "Weight", 30.0, 200.0, "kg"),
    InputField::number("Height", "Height", 1.0, 2.5, "m"),
    InputField::integer("Max_BPM", "Maximum heart rate", 100.0, 220.0, "bpm"),
    InputField::integer("Avg_BPM", "Average heart rate", 60.0, 200.0, "bpm"),
    InputField::integer("Resting_BPM", "Resting heart rate", 40.0, 100.0, "bpm"),
    InputField::number("Session_Duration", "Session duration", 0.25, 4.0, "h"),
    InputField::choice("Workout_Type", "Workout type", CategoricalKind::GymWorkoutType),
    InputField::number("Fat_Percentage", "Body fat", 5.0, 50.0, "%"),
    InputField::number("Water_Intake", "Water intake", 0.0, 5.0, "l"),
    InputField::integer("Workout_Frequency", "Workouts per week", 1.0, 7.0, "days/week"),
    InputField::choice(
        "Experience_Level",
        "Experience level",
        CategoricalKind::ExperienceLevel,
    ),
];

/// One of the independent prediction pipelines
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelVariant {
    /// Performance score; height in centimeters, no scaler
    Performance,
    /// Calories burned; height in meters, standardized features
    CalorieBurn,
}

impl ModelVariant {
    pub const ALL: [ModelVariant; 2] = [ModelVariant::Performance, ModelVariant::CalorieBurn];

    pub fn as_str(self) -> &'static str {
        match self {
            ModelVariant::Performance => "performance",
            ModelVariant::CalorieBurn => "calorie_burn",
        }
    }

    /// What the model predicts, for display
    pub fn target_label(self) -> &'static str {
        match self {
            ModelVariant::Performance => "Performance Score",
            ModelVariant::CalorieBurn => "Calories Burned",
        }
    }

    pub fn schema(self) -> &'static [FeatureSpec] {
        match self {
            ModelVariant::Performance => PERFORMANCE_SCHEMA,
            ModelVariant::CalorieBurn => CALORIE_SCHEMA,
        }
    }

    pub fn input_fields(self) -> &'static [InputField] {
        match self {
            ModelVariant::Performance => PERFORMANCE_INPUTS,
            ModelVariant::CalorieBurn => CALORIE_INPUTS,
        }
    }

    pub fn input_field(self, name: &str) -> Option<&'static InputField> {
        self.input_fields().iter().find(|f| f.name == name)
    }

    pub fn feature_names(self) -> Vec<String> {
        self.schema().iter().map(|f| f.name.to_string()).collect()
    }

    pub fn feature_count(self) -> usize {
        self.schema().len()
    }

    pub fn requires_scaler(self) -> bool {
        matches!(self, ModelVariant::CalorieBurn)
    }

    pub fn height_unit(self) -> HeightUnit {
        match self {
            ModelVariant::Performance => HeightUnit::Centimeters,
            ModelVariant::CalorieBurn => HeightUnit::Meters,
        }
    }
}

impl fmt::Display for ModelVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "performance" | "performance_score" => Ok(ModelVariant::Performance),
            "calorie_burn" | "calories" | "calorie" | "calories_burned" => {
                Ok(ModelVariant::CalorieBurn)
            }
            other => Err(format!(
                "unknown variant '{}' (expected performance or calorie_burn)",
                other
            )),
        }
    }
}
