use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use super::fitness::{ActivityLevel, ExperienceLevel, FitnessGoal, Sex};

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Profile row as stored; enum columns are plain text.
#[derive(Debug, Clone, FromRow)]
pub struct UserProfileRow {
    pub user_id: Uuid,
    pub date_of_birth: Option<NaiveDate>,
    pub sex: Option<String>,
    pub primary_fitness_goal: Option<String>,
    pub activity_level: Option<String>,
    pub gym_experience: Option<String>,
    pub preferred_training_days: Option<i64>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub user_id: Uuid,
    pub email: String,
    pub full_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub age: Option<u32>,
    pub sex: Option<Sex>,
    pub primary_fitness_goal: Option<FitnessGoal>,
    pub activity_level: Option<ActivityLevel>,
    pub gym_experience: Option<ExperienceLevel>,
    pub preferred_training_days: Option<u8>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 2, max = 100, message = "Full name must be 2-100 characters"))]
    pub full_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub sex: Option<Sex>,
    pub primary_fitness_goal: Option<FitnessGoal>,
    pub activity_level: Option<ActivityLevel>,
    pub gym_experience: Option<ExperienceLevel>,
    #[validate(range(min = 3, max = 6, message = "Training days must be between 3-6 per week"))]
    pub preferred_training_days: Option<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct SmartScaleData {
    #[validate(range(min = 3.0, max = 50.0, message = "Body fat must be between 3-50%"))]
    pub body_fat_percentage: Option<f64>,
    #[validate(range(min = 20.0, max = 60.0, message = "Muscle percentage must be between 20-60%"))]
    pub muscle_percentage: Option<f64>,
    #[validate(range(min = 1.0, max = 30.0, message = "Visceral fat must be between 1-30"))]
    pub visceral_fat: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct BodyMetricsRequest {
    #[serde(alias = "weight")]
    #[validate(range(min = 30.0, max = 300.0, message = "Weight must be between 30-300 kg"))]
    pub weight_kg: f64,
    #[serde(alias = "height")]
    #[validate(range(min = 100.0, max = 250.0, message = "Height must be between 100-250 cm"))]
    pub height_cm: f64,
    #[validate(range(min = 13, max = 100, message = "Age must be between 13-100 years"))]
    pub age: u32,
    pub sex: Sex,
    #[validate(nested)]
    pub smart_scale: Option<SmartScaleData>,
}

#[derive(Debug, Clone, FromRow)]
pub struct BodyMetricsRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub weight_kg: f64,
    pub height_cm: f64,
    pub age: i64,
    pub sex: String,
    pub smart_scale: Option<Json<SmartScaleData>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BodyMetrics {
    pub id: Uuid,
    pub user_id: Uuid,
    pub weight_kg: f64,
    pub height_cm: f64,
    pub age: u32,
    pub sex: Sex,
    pub smart_scale: Option<SmartScaleData>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<BodyMetricsRow> for BodyMetrics {
    type Error = anyhow::Error;

    fn try_from(row: BodyMetricsRow) -> Result<Self, Self::Error> {
        let sex = Sex::from_str(&row.sex)
            .ok_or_else(|| anyhow::anyhow!("Unknown sex value in storage: {}", row.sex))?;

        Ok(BodyMetrics {
            id: row.id,
            user_id: row.user_id,
            weight_kg: row.weight_kg,
            height_cm: row.height_cm,
            age: u32::try_from(row.age)?,
            sex,
            smart_scale: row.smart_scale.map(|json| json.0),
            created_at: row.created_at,
        })
    }
}
