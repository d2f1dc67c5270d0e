use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;
use validator::Validate;

use super::fitness::{ActivityLevel, ExperienceLevel, FitnessGoal};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MuscleGroup {
    Chest,
    Back,
    Shoulders,
    Triceps,
    Biceps,
    Legs,
    Core,
}

impl MuscleGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            MuscleGroup::Chest => "chest",
            MuscleGroup::Back => "back",
            MuscleGroup::Shoulders => "shoulders",
            MuscleGroup::Triceps => "triceps",
            MuscleGroup::Biceps => "biceps",
            MuscleGroup::Legs => "legs",
            MuscleGroup::Core => "core",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            MuscleGroup::Chest => "Chest",
            MuscleGroup::Back => "Back",
            MuscleGroup::Shoulders => "Shoulders",
            MuscleGroup::Triceps => "Triceps",
            MuscleGroup::Biceps => "Biceps",
            MuscleGroup::Legs => "Legs",
            MuscleGroup::Core => "Core",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepRange {
    pub low: u32,
    pub high: u32,
}

impl RepRange {
    pub const fn new(low: u32, high: u32) -> Self {
        Self { low, high }
    }

    /// Scale both ends, truncating like whole reps do
    pub fn scaled(&self, multiplier: f64) -> Self {
        Self {
            low: (self.low as f64 * multiplier) as u32,
            high: (self.high as f64 * multiplier) as u32,
        }
    }
}

impl fmt::Display for RepRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.low, self.high)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlannedExercise {
    pub name: String,
    pub muscle_group: MuscleGroup,
    pub sets: u32,
    pub reps: RepRange,
    pub rest_seconds: u32,
    pub equipment: Vec<String>,
    pub substitutions: Vec<String>,
    pub notes: Option<String>,
    pub corrective: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkoutDay {
    pub day: u8,
    pub name: String,
    pub focus: Vec<MuscleGroup>,
    pub exercises: Vec<PlannedExercise>,
    pub estimated_minutes: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanWeek {
    pub week: u8,
    pub focus: String,
    pub intensity_multiplier: f64,
    pub deload: bool,
    pub progression_note: Option<String>,
    pub workouts: Vec<WorkoutDay>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Macros {
    pub protein_g: u32,
    pub carbs_g: u32,
    pub fat_g: u32,
}

impl Macros {
    pub fn calories(&self) -> u32 {
        self.protein_g * 4 + self.carbs_g * 4 + self.fat_g * 9
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MacroSplit {
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MealType::Breakfast => "breakfast",
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
            MealType::Snack => "snack",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MealSuggestion {
    pub meal: MealType,
    pub name: String,
    pub description: String,
    pub calories: u32,
    pub macros: Macros,
    pub ingredients: Vec<String>,
    pub prep_minutes: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DietaryRestriction {
    Vegetarian,
    Vegan,
    GlutenFree,
    DairyFree,
}

impl DietaryRestriction {
    /// Tag a meal must carry to be served under this restriction
    pub fn tag(&self) -> &'static str {
        match self {
            DietaryRestriction::Vegetarian => "vegetarian",
            DietaryRestriction::Vegan => "vegan",
            DietaryRestriction::GlutenFree => "gluten_free",
            DietaryRestriction::DairyFree => "dairy_free",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DietaryRestriction::Vegetarian => "vegetarian",
            DietaryRestriction::Vegan => "vegan",
            DietaryRestriction::GlutenFree => "gluten free",
            DietaryRestriction::DairyFree => "dairy free",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MicronutrientTargets {
    pub fiber_g: u32,
    pub sodium_mg: u32,
    pub calcium_mg: u32,
    pub iron_mg: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NutritionPlan {
    pub bmr: f64,
    pub tdee: f64,
    pub target_calories: u32,
    pub macros: Macros,
    pub macro_split: MacroSplit,
    #[serde(default)]
    pub micronutrients: MicronutrientTargets,
    #[serde(default)]
    pub dietary_restrictions: Vec<DietaryRestriction>,
    pub meals: Vec<MealSuggestion>,
    pub hydration_ml: u32,
    pub adjustments: Vec<String>,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    Active,
    Inactive,
}

impl PlanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanStatus::Active => "active",
            PlanStatus::Inactive => "inactive",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(PlanStatus::Active),
            "inactive" => Some(PlanStatus::Inactive),
            _ => None,
        }
    }
}

/// Everything about a plan except its identity and lifecycle; stored as one JSON document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanDocument {
    pub goal: FitnessGoal,
    pub days_per_week: u8,
    pub activity_level: ActivityLevel,
    pub experience_level: ExperienceLevel,
    pub workout_plan: Vec<WorkoutDay>,
    pub weeks: Vec<PlanWeek>,
    pub nutrition_plan: NutritionPlan,
    pub rationale: String,
    pub vision_adjustments: Vec<String>,
    pub progression_rules: Vec<String>,
    pub equipment_needed: Vec<String>,
    pub estimated_session_minutes: u32,
    pub source_analysis_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Plan {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: PlanStatus,
    #[serde(flatten)]
    pub document: PlanDocument,
    pub accepted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Plan {
    /// Week one begins when the plan was accepted, or generated if it never was
    pub fn started_at(&self) -> DateTime<Utc> {
        self.accepted_at.unwrap_or(self.created_at)
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct PlanRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub document: Json<PlanDocument>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<PlanRow> for Plan {
    type Error = anyhow::Error;

    fn try_from(row: PlanRow) -> Result<Self, Self::Error> {
        let status = PlanStatus::from_str(&row.status)
            .ok_or_else(|| anyhow::anyhow!("Unknown plan status: {}", row.status))?;

        Ok(Plan {
            id: row.id,
            user_id: row.user_id,
            status,
            document: row.document.0,
            accepted_at: row.accepted_at,
            created_at: row.created_at,
        })
    }
}

/// Lightweight listing entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanSummary {
    pub id: Uuid,
    pub status: PlanStatus,
    pub goal: FitnessGoal,
    pub days_per_week: u8,
    pub target_calories: u32,
    pub accepted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&Plan> for PlanSummary {
    fn from(plan: &Plan) -> Self {
        PlanSummary {
            id: plan.id,
            status: plan.status,
            goal: plan.document.goal,
            days_per_week: plan.document.days_per_week,
            target_calories: plan.document.nutrition_plan.target_calories,
            accepted_at: plan.accepted_at,
            created_at: plan.created_at,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct PlanRequest {
    pub fitness_goal: Option<FitnessGoal>,
    #[validate(range(min = 3, max = 6, message = "Training days must be between 3-6 per week"))]
    pub days_per_week: Option<u8>,
    pub activity_level: Option<ActivityLevel>,
    pub experience_level: Option<ExperienceLevel>,
    #[serde(default)]
    pub dietary_restrictions: Vec<DietaryRestriction>,
}
