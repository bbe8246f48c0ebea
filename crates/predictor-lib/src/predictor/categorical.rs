//! Categorical encodings
//!
//! Each categorical input field has its own enum. The integer code is an
//! exhaustive `match`, so a new variant cannot be added without a code.

use crate::error::EncodingError;
use crate::models::RawValue;
use serde::{Deserialize, Serialize};

/// A closed set of labels with fixed integer codes
pub trait Categorical: Sized + Copy + 'static {
    /// Every value, in declared order
    const ALL: &'static [Self];
    /// Labels accepted on input, in declared order
    const DOMAIN: &'static [&'static str];
    /// Whether a bare integer code is accepted in place of a label
    const ACCEPTS_CODE: bool = false;

    fn code(self) -> i64;
    fn label(self) -> &'static str;

    fn from_label(text: &str) -> Option<Self> {
        let text = text.trim();
        Self::ALL.iter().copied().find(|v| v.label() == text)
    }

    fn from_code(code: i64) -> Option<Self> {
        Self::ALL.iter().copied().find(|v| v.code() == code)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Female,
    Male,
    Other,
}

impl Categorical for Gender {
    const ALL: &'static [Self] = &[Gender::Male, Gender::Female, Gender::Other];
    const DOMAIN: &'static [&'static str] = &["Male", "Female", "Other"];

    fn code(self) -> i64 {
        match self {
            Gender::Female => 0,
            Gender::Male => 1,
            Gender::Other => 2,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Gender::Female => "Female",
            Gender::Male => "Male",
            Gender::Other => "Other",
        }
    }
}

/// Workout types offered by the performance-score model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkoutType {
    Cardio,
    Strength,
    Yoga,
    CrossFit,
    Mixed,
}

impl Categorical for WorkoutType {
    const ALL: &'static [Self] = &[
        WorkoutType::Cardio,
        WorkoutType::Strength,
        WorkoutType::Yoga,
        WorkoutType::CrossFit,
        WorkoutType::Mixed,
    ];
    const DOMAIN: &'static [&'static str] = &["Cardio", "Strength", "Yoga", "CrossFit", "Mixed"];

    fn code(self) -> i64 {
        match self {
            WorkoutType::Cardio => 0,
            WorkoutType::Strength => 1,
            WorkoutType::Yoga => 2,
            WorkoutType::CrossFit => 3,
            WorkoutType::Mixed => 4,
        }
    }

    fn label(self) -> &'static str {
        match self {
            WorkoutType::Cardio => "Cardio",
            WorkoutType::Strength => "Strength",
            WorkoutType::Yoga => "Yoga",
            WorkoutType::CrossFit => "CrossFit",
            WorkoutType::Mixed => "Mixed",
        }
    }
}

/// Workout types in the gym-members data the calorie model was fitted on.
/// Codes follow the label encoder's alphabetical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GymWorkoutType {
    Cardio,
    Hiit,
    Strength,
    Yoga,
}

impl Categorical for GymWorkoutType {
    const ALL: &'static [Self] = &[
        GymWorkoutType::Cardio,
        GymWorkoutType::Hiit,
        GymWorkoutType::Strength,
        GymWorkoutType::Yoga,
    ];
    const DOMAIN: &'static [&'static str] = &["Cardio", "HIIT", "Strength", "Yoga"];

    fn code(self) -> i64 {
        match self {
            GymWorkoutType::Cardio => 0,
            GymWorkoutType::Hiit => 1,
            GymWorkoutType::Strength => 2,
            GymWorkoutType::Yoga => 3,
        }
    }

    fn label(self) -> &'static str {
        match self {
            GymWorkoutType::Cardio => "Cardio",
            GymWorkoutType::Hiit => "HIIT",
            GymWorkoutType::Strength => "Strength",
            GymWorkoutType::Yoga => "Yoga",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExperienceLevel {
    Beginner,
    Intermediate,
    Expert,
}

impl Categorical for ExperienceLevel {
    const ALL: &'static [Self] = &[
        ExperienceLevel::Beginner,
        ExperienceLevel::Intermediate,
        ExperienceLevel::Expert,
    ];
    const DOMAIN: &'static [&'static str] = &["Beginner", "Intermediate", "Expert"];
    const ACCEPTS_CODE: bool = true;

    fn code(self) -> i64 {
        match self {
            ExperienceLevel::Beginner => 1,
            ExperienceLevel::Intermediate => 2,
            ExperienceLevel::Expert => 3,
        }
    }

    fn label(self) -> &'static str {
        match self {
            ExperienceLevel::Beginner => "Beginner",
            ExperienceLevel::Intermediate => "Intermediate",
            ExperienceLevel::Expert => "Expert",
        }
    }
}

/// Which categorical table a schema field uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoricalKind {
    Gender,
    WorkoutType,
    GymWorkoutType,
    ExperienceLevel,
}

impl CategoricalKind {
    pub fn domain(self) -> &'static [&'static str] {
        match self {
            CategoricalKind::Gender => Gender::DOMAIN,
            CategoricalKind::WorkoutType => WorkoutType::DOMAIN,
            CategoricalKind::GymWorkoutType => GymWorkoutType::DOMAIN,
            CategoricalKind::ExperienceLevel => ExperienceLevel::DOMAIN,
        }
    }

    /// `(label, code)` pairs in declared order
    pub fn codes(self) -> Vec<(&'static str, i64)> {
        fn pairs<T: Categorical>() -> Vec<(&'static str, i64)> {
            T::ALL.iter().map(|v| (v.label(), v.code())).collect()
        }
        match self {
            CategoricalKind::Gender => pairs::<Gender>(),
            CategoricalKind::WorkoutType => pairs::<WorkoutType>(),
            CategoricalKind::GymWorkoutType => pairs::<GymWorkoutType>(),
            CategoricalKind::ExperienceLevel => pairs::<ExperienceLevel>(),
        }
    }

    /// Encode a raw value for `field` with this table
    pub fn encode(self, field: &str, value: &RawValue) -> Result<i64, EncodingError> {
        match self {
            CategoricalKind::Gender => encode_value::<Gender>(field, value),
            CategoricalKind::WorkoutType => encode_value::<WorkoutType>(field, value),
            CategoricalKind::GymWorkoutType => encode_value::<GymWorkoutType>(field, value),
            CategoricalKind::ExperienceLevel => encode_value::<ExperienceLevel>(field, value),
        }
    }
}

fn encode_value<T: Categorical>(field: &str, value: &RawValue) -> Result<i64, EncodingError> {
    let found = match value {
        RawValue::Text(text) => T::from_label(text).or_else(|| {
            if T::ACCEPTS_CODE {
                text.trim().parse::<i64>().ok().and_then(T::from_code)
            } else {
                None
            }
        }),
        RawValue::Number(n) if T::ACCEPTS_CODE && n.fract() == 0.0 => T::from_code(*n as i64),
        RawValue::Number(_) => None,
    };

    found.map(T::code).ok_or_else(|| EncodingError::UnknownCategory {
        field: field.to_string(),
        value: value.to_string(),
        allowed: T::DOMAIN,
    })
}
