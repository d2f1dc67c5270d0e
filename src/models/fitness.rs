use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::Male => "male",
            Sex::Female => "female",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "male" => Some(Sex::Male),
            "female" => Some(Sex::Female),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FitnessGoal {
    LoseFat,
    GainMuscle,
    Strength,
    Recomposition,
    Maintenance,
}

impl FitnessGoal {
    pub fn as_str(&self) -> &'static str {
        match self {
            FitnessGoal::LoseFat => "lose_fat",
            FitnessGoal::GainMuscle => "gain_muscle",
            FitnessGoal::Strength => "strength",
            FitnessGoal::Recomposition => "recomposition",
            FitnessGoal::Maintenance => "maintenance",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "lose_fat" => Some(FitnessGoal::LoseFat),
            "gain_muscle" => Some(FitnessGoal::GainMuscle),
            "strength" => Some(FitnessGoal::Strength),
            "recomposition" => Some(FitnessGoal::Recomposition),
            "maintenance" => Some(FitnessGoal::Maintenance),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FitnessGoal::LoseFat => "fat loss",
            FitnessGoal::GainMuscle => "muscle gain",
            FitnessGoal::Strength => "strength",
            FitnessGoal::Recomposition => "body recomposition",
            FitnessGoal::Maintenance => "maintenance",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    Sedentary,
    Light,
    Moderate,
    Active,
    #[serde(alias = "very_active")]
    Athlete,
}

impl ActivityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityLevel::Sedentary => "sedentary",
            ActivityLevel::Light => "light",
            ActivityLevel::Moderate => "moderate",
            ActivityLevel::Active => "active",
            ActivityLevel::Athlete => "athlete",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "sedentary" => Some(ActivityLevel::Sedentary),
            "light" => Some(ActivityLevel::Light),
            "moderate" => Some(ActivityLevel::Moderate),
            "active" => Some(ActivityLevel::Active),
            "athlete" | "very_active" => Some(ActivityLevel::Athlete),
            _ => None,
        }
    }

    /// Harris-Benedict activity multiplier
    pub fn multiplier(&self) -> f64 {
        match self {
            ActivityLevel::Sedentary => 1.2,
            ActivityLevel::Light => 1.375,
            ActivityLevel::Moderate => 1.55,
            ActivityLevel::Active => 1.725,
            ActivityLevel::Athlete => 1.9,
        }
    }
}

impl Default for ActivityLevel {
    fn default() -> Self {
        ActivityLevel::Moderate
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum ExperienceLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl ExperienceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExperienceLevel::Beginner => "beginner",
            ExperienceLevel::Intermediate => "intermediate",
            ExperienceLevel::Advanced => "advanced",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "beginner" => Some(ExperienceLevel::Beginner),
            "intermediate" => Some(ExperienceLevel::Intermediate),
            "advanced" => Some(ExperienceLevel::Advanced),
            _ => None,
        }
    }

    pub fn max_training_days(&self) -> u8 {
        match self {
            ExperienceLevel::Beginner => 4,
            ExperienceLevel::Intermediate => 5,
            ExperienceLevel::Advanced => 6,
        }
    }

    /// Upper bound on week-over-week volume increase, as a fraction
    pub fn max_volume_increase(&self) -> f64 {
        match self {
            ExperienceLevel::Beginner => 0.05,
            ExperienceLevel::Intermediate => 0.10,
            ExperienceLevel::Advanced => 0.15,
        }
    }
}

impl Default for ExperienceLevel {
    fn default() -> Self {
        ExperienceLevel::Intermediate
    }
}

macro_rules! impl_display_as_str {
    ($($ty:ty),*) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.as_str())
                }
            }
        )*
    };
}

impl_display_as_str!(Sex, FitnessGoal, ActivityLevel, ExperienceLevel);
