use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Daily wellbeing check-in
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct ProgressLog {
    pub id: Uuid,
    pub user_id: Uuid,
    #[sqlx(rename = "log_date")]
    pub date: NaiveDate,
    pub weight_kg: Option<f64>,
    pub energy_level: Option<i64>,
    pub mood: Option<i64>,
    pub sleep_hours: Option<f64>,
    pub water_intake_liters: Option<f64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CreateProgressLog {
    pub date: Option<NaiveDate>,
    #[serde(alias = "weight")]
    #[validate(range(min = 30.0, max = 300.0, message = "Weight must be between 30-300 kg"))]
    pub weight_kg: Option<f64>,
    #[validate(range(min = 1, max = 10, message = "Energy level must be between 1-10"))]
    pub energy_level: Option<u8>,
    #[validate(range(min = 1, max = 10, message = "Mood must be between 1-10"))]
    pub mood: Option<u8>,
    #[validate(range(min = 0.0, max = 24.0, message = "Sleep hours must be between 0-24"))]
    pub sleep_hours: Option<f64>,
    #[validate(range(min = 0.0, max = 15.0, message = "Water intake must be between 0-15 liters"))]
    pub water_intake_liters: Option<f64>,
    #[validate(length(max = 1000, message = "Notes cannot exceed 1000 characters"))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct CompletedExercise {
    #[validate(length(min = 1, max = 200, message = "Exercise name must be 1-200 characters"))]
    pub name: String,
    #[validate(range(min = 1, max = 50, message = "Sets must be between 1-50"))]
    pub sets: u32,
    #[validate(range(min = 1, max = 200, message = "Reps must be between 1-200"))]
    pub reps: u32,
    #[validate(range(min = 0.0, max = 1000.0, message = "Exercise weight must be between 0-1000 kg"))]
    pub weight_kg: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct WorkoutLog {
    pub id: Uuid,
    pub user_id: Uuid,
    #[sqlx(rename = "log_date")]
    pub date: NaiveDate,
    pub workout_name: String,
    pub duration_minutes: i64,
    pub exercises_completed: Json<Vec<CompletedExercise>>,
    pub difficulty_rating: Option<i64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateWorkoutLog {
    pub date: Option<NaiveDate>,
    #[validate(length(min = 1, max = 200, message = "Workout name must be 1-200 characters"))]
    pub workout_name: String,
    #[validate(range(min = 1, max = 600, message = "Duration must be between 1-600 minutes"))]
    pub duration_minutes: u32,
    #[serde(default)]
    #[validate(nested)]
    pub exercises_completed: Vec<CompletedExercise>,
    #[validate(range(min = 1, max = 10, message = "Difficulty rating must be between 1-10"))]
    pub difficulty_rating: Option<u8>,
    #[validate(length(max = 1000, message = "Notes cannot exceed 1000 characters"))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct WeightEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    #[sqlx(rename = "log_date")]
    pub date: NaiveDate,
    pub weight_kg: f64,
    pub body_fat_percentage: Option<f64>,
    pub muscle_percentage: Option<f64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateWeightEntry {
    pub date: Option<NaiveDate>,
    #[serde(alias = "weight")]
    #[validate(range(min = 30.0, max = 300.0, message = "Weight must be between 30-300 kg"))]
    pub weight_kg: f64,
    #[validate(range(min = 3.0, max = 50.0, message = "Body fat must be between 3-50%"))]
    pub body_fat_percentage: Option<f64>,
    #[validate(range(min = 20.0, max = 60.0, message = "Muscle percentage must be between 20-60%"))]
    pub muscle_percentage: Option<f64>,
    #[validate(length(max = 1000, message = "Notes cannot exceed 1000 characters"))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct BodyMeasurement {
    pub id: Uuid,
    pub user_id: Uuid,
    #[sqlx(rename = "log_date")]
    pub date: NaiveDate,
    pub chest_cm: Option<f64>,
    pub waist_cm: Option<f64>,
    pub hips_cm: Option<f64>,
    pub bicep_cm: Option<f64>,
    pub thigh_cm: Option<f64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CreateBodyMeasurement {
    pub date: Option<NaiveDate>,
    #[validate(range(min = 10.0, max = 250.0, message = "Chest must be between 10-250 cm"))]
    pub chest_cm: Option<f64>,
    #[validate(range(min = 10.0, max = 250.0, message = "Waist must be between 10-250 cm"))]
    pub waist_cm: Option<f64>,
    #[validate(range(min = 10.0, max = 250.0, message = "Hips must be between 10-250 cm"))]
    pub hips_cm: Option<f64>,
    #[validate(range(min = 10.0, max = 250.0, message = "Bicep must be between 10-250 cm"))]
    pub bicep_cm: Option<f64>,
    #[validate(range(min = 10.0, max = 250.0, message = "Thigh must be between 10-250 cm"))]
    pub thigh_cm: Option<f64>,
    #[validate(length(max = 1000, message = "Notes cannot exceed 1000 characters"))]
    pub notes: Option<String>,
}

impl CreateBodyMeasurement {
    pub fn is_empty(&self) -> bool {
        self.chest_cm.is_none()
            && self.waist_cm.is_none()
            && self.hips_cm.is_none()
            && self.bicep_cm.is_none()
            && self.thigh_cm.is_none()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryQuery {
    pub days: Option<u32>,
}

impl HistoryQuery {
    pub fn days_or(&self, default: u32) -> u32 {
        self.days.unwrap_or(default).clamp(1, 365)
    }
}
