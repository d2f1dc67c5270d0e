use chrono::{Days, NaiveDate, Utc};
use sqlx::types::Json;
use sqlx::SqlitePool;
use uuid::Uuid;
use validator::Validate;

use crate::errors::ApiError;
use crate::models::{
    BodyMeasurement, CreateBodyMeasurement, CreateProgressLog, CreateWeightEntry, CreateWorkoutLog,
    ProgressLog, WeightEntry, WorkoutLog,
};

pub const DEFAULT_PROGRESS_DAYS: u32 = 30;
pub const DEFAULT_WORKOUT_DAYS: u32 = 30;
pub const DEFAULT_WEIGHT_DAYS: u32 = 90;
pub const DEFAULT_MEASUREMENT_DAYS: u32 = 90;

const PROGRESS_COLUMNS: &str =
    "id, user_id, log_date, weight_kg, energy_level, mood, sleep_hours, water_intake_liters, notes, created_at";
const WORKOUT_COLUMNS: &str =
    "id, user_id, log_date, workout_name, duration_minutes, exercises_completed, difficulty_rating, notes, created_at";
const WEIGHT_COLUMNS: &str =
    "id, user_id, log_date, weight_kg, body_fat_percentage, muscle_percentage, notes, created_at";
const MEASUREMENT_COLUMNS: &str =
    "id, user_id, log_date, chest_cm, waist_cm, hips_cm, bicep_cm, thigh_cm, notes, created_at";

/// First day included in a window of `days` ending today
fn window_start(today: NaiveDate, days: u32) -> NaiveDate {
    today
        .checked_sub_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MIN)
}

/// Date-stamped logs: wellbeing check-ins, workouts, weigh-ins and tape measurements
#[derive(Debug, Clone)]
pub struct ProgressService {
    db: SqlitePool,
}

impl ProgressService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    #[tracing::instrument(skip(self, request))]
    pub async fn log_progress(
        &self,
        user_id: Uuid,
        request: CreateProgressLog,
    ) -> Result<ProgressLog, ApiError> {
        request.validate()?;

        let log = sqlx::query_as::<_, ProgressLog>(&format!(
            "INSERT INTO progress_logs ({PROGRESS_COLUMNS})
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING {PROGRESS_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(request.date.unwrap_or_else(|| Utc::now().date_naive()))
        .bind(request.weight_kg)
        .bind(request.energy_level.map(i64::from))
        .bind(request.mood.map(i64::from))
        .bind(request.sleep_hours)
        .bind(request.water_intake_liters)
        .bind(request.notes)
        .bind(Utc::now())
        .fetch_one(&self.db)
        .await?;

        tracing::info!(%user_id, date = %log.date, "Logged progress");
        Ok(log)
    }

    pub async fn progress_logs(&self, user_id: Uuid, days: u32) -> Result<Vec<ProgressLog>, ApiError> {
        let since = window_start(Utc::now().date_naive(), days);
        let logs = sqlx::query_as::<_, ProgressLog>(&format!(
            "SELECT {PROGRESS_COLUMNS} FROM progress_logs
             WHERE user_id = ? AND log_date >= ?
             ORDER BY log_date DESC, created_at DESC"
        ))
        .bind(user_id)
        .bind(since)
        .fetch_all(&self.db)
        .await?;

        Ok(logs)
    }

    #[tracing::instrument(skip(self, request))]
    pub async fn log_workout(
        &self,
        user_id: Uuid,
        request: CreateWorkoutLog,
    ) -> Result<WorkoutLog, ApiError> {
        request.validate()?;

        let log = sqlx::query_as::<_, WorkoutLog>(&format!(
            "INSERT INTO workout_logs ({WORKOUT_COLUMNS})
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING {WORKOUT_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(request.date.unwrap_or_else(|| Utc::now().date_naive()))
        .bind(request.workout_name.trim())
        .bind(i64::from(request.duration_minutes))
        .bind(Json(&request.exercises_completed))
        .bind(request.difficulty_rating.map(i64::from))
        .bind(request.notes.as_deref())
        .bind(Utc::now())
        .fetch_one(&self.db)
        .await?;

        tracing::info!(
            %user_id,
            workout = %log.workout_name,
            minutes = log.duration_minutes,
            "Logged workout"
        );
        Ok(log)
    }

    pub async fn workout_logs(&self, user_id: Uuid, days: u32) -> Result<Vec<WorkoutLog>, ApiError> {
        let since = window_start(Utc::now().date_naive(), days);
        let logs = sqlx::query_as::<_, WorkoutLog>(&format!(
            "SELECT {WORKOUT_COLUMNS} FROM workout_logs
             WHERE user_id = ? AND log_date >= ?
             ORDER BY log_date DESC, created_at DESC"
        ))
        .bind(user_id)
        .bind(since)
        .fetch_all(&self.db)
        .await?;

        Ok(logs)
    }

    #[tracing::instrument(skip(self, request))]
    pub async fn log_weight(
        &self,
        user_id: Uuid,
        request: CreateWeightEntry,
    ) -> Result<WeightEntry, ApiError> {
        request.validate()?;

        let entry = sqlx::query_as::<_, WeightEntry>(&format!(
            "INSERT INTO weight_entries ({WEIGHT_COLUMNS})
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING {WEIGHT_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(request.date.unwrap_or_else(|| Utc::now().date_naive()))
        .bind(request.weight_kg)
        .bind(request.body_fat_percentage)
        .bind(request.muscle_percentage)
        .bind(request.notes)
        .bind(Utc::now())
        .fetch_one(&self.db)
        .await?;

        tracing::info!(%user_id, weight_kg = entry.weight_kg, "Logged weight");
        Ok(entry)
    }

    pub async fn weight_entries(&self, user_id: Uuid, days: u32) -> Result<Vec<WeightEntry>, ApiError> {
        let since = window_start(Utc::now().date_naive(), days);
        let entries = sqlx::query_as::<_, WeightEntry>(&format!(
            "SELECT {WEIGHT_COLUMNS} FROM weight_entries
             WHERE user_id = ? AND log_date >= ?
             ORDER BY log_date DESC, created_at DESC"
        ))
        .bind(user_id)
        .bind(since)
        .fetch_all(&self.db)
        .await?;

        Ok(entries)
    }

    pub async fn latest_weight(&self, user_id: Uuid) -> Result<Option<WeightEntry>, ApiError> {
        let entry = sqlx::query_as::<_, WeightEntry>(&format!(
            "SELECT {WEIGHT_COLUMNS} FROM weight_entries
             WHERE user_id = ?
             ORDER BY log_date DESC, created_at DESC
             LIMIT 1"
        ))
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(entry)
    }

    #[tracing::instrument(skip(self, request))]
    pub async fn log_measurements(
        &self,
        user_id: Uuid,
        request: CreateBodyMeasurement,
    ) -> Result<BodyMeasurement, ApiError> {
        request.validate()?;
        if request.is_empty() {
            return Err(ApiError::Validation(vec![
                "At least one measurement is required".to_string(),
            ]));
        }

        let measurement = sqlx::query_as::<_, BodyMeasurement>(&format!(
            "INSERT INTO body_measurements ({MEASUREMENT_COLUMNS})
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING {MEASUREMENT_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(request.date.unwrap_or_else(|| Utc::now().date_naive()))
        .bind(request.chest_cm)
        .bind(request.waist_cm)
        .bind(request.hips_cm)
        .bind(request.bicep_cm)
        .bind(request.thigh_cm)
        .bind(request.notes)
        .bind(Utc::now())
        .fetch_one(&self.db)
        .await?;

        tracing::info!(%user_id, "Logged body measurements");
        Ok(measurement)
    }

    pub async fn measurements(
        &self,
        user_id: Uuid,
        days: u32,
    ) -> Result<Vec<BodyMeasurement>, ApiError> {
        let since = window_start(Utc::now().date_naive(), days);
        let measurements = sqlx::query_as::<_, BodyMeasurement>(&format!(
            "SELECT {MEASUREMENT_COLUMNS} FROM body_measurements
             WHERE user_id = ? AND log_date >= ?
             ORDER BY log_date DESC, created_at DESC"
        ))
        .bind(user_id)
        .bind(since)
        .fetch_all(&self.db)
        .await?;

        Ok(measurements)
    }
}
