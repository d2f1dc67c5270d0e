use chrono::Utc;
use sqlx::types::Json;
use sqlx::SqlitePool;
use uuid::Uuid;
use validator::Validate;

use crate::errors::ApiError;
use crate::models::{
    age_on, validate_date_of_birth, ActivityLevel, BodyMetrics, BodyMetricsRequest, BodyMetricsRow,
    ExperienceLevel, FitnessGoal, Sex, UpdateProfileRequest, User, UserProfile, UserProfileRow,
};

const BODY_METRICS_COLUMNS: &str = "id, user_id, weight_kg, height_cm, age, sex, smart_scale, created_at";

/// Profile and body-metrics storage
#[derive(Debug, Clone)]
pub struct UserService {
    db: SqlitePool,
}

impl UserService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn get_profile(&self, user_id: Uuid) -> Result<UserProfile, ApiError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash, full_name, created_at, updated_at FROM users WHERE id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

        let row = sqlx::query_as::<_, UserProfileRow>(
            "SELECT user_id, date_of_birth, sex, primary_fitness_goal, activity_level,
                    gym_experience, preferred_training_days, updated_at
             FROM user_profiles WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(compose_profile(user, row))
    }

    /// Partial update: fields left out of the request keep their stored value
    #[tracing::instrument(skip(self, request))]
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        request: UpdateProfileRequest,
    ) -> Result<UserProfile, ApiError> {
        request.validate()?;
        if let Some(dob) = request.date_of_birth {
            validate_date_of_birth(dob, Utc::now().date_naive())
                .map_err(|message| ApiError::Validation(vec![message]))?;
        }

        let now = Utc::now();
        let mut tx = self.db.begin().await?;

        if let Some(full_name) = request.full_name.as_deref() {
            sqlx::query("UPDATE users SET full_name = ?, updated_at = ? WHERE id = ?")
                .bind(full_name.trim())
                .bind(now)
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query(
            "INSERT INTO user_profiles (user_id, date_of_birth, sex, primary_fitness_goal,
                                        activity_level, gym_experience, preferred_training_days, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT (user_id) DO UPDATE SET
                date_of_birth = COALESCE(excluded.date_of_birth, user_profiles.date_of_birth),
                sex = COALESCE(excluded.sex, user_profiles.sex),
                primary_fitness_goal = COALESCE(excluded.primary_fitness_goal, user_profiles.primary_fitness_goal),
                activity_level = COALESCE(excluded.activity_level, user_profiles.activity_level),
                gym_experience = COALESCE(excluded.gym_experience, user_profiles.gym_experience),
                preferred_training_days = COALESCE(excluded.preferred_training_days, user_profiles.preferred_training_days),
                updated_at = excluded.updated_at",
        )
        .bind(user_id)
        .bind(request.date_of_birth)
        .bind(request.sex.map(|s| s.as_str()))
        .bind(request.primary_fitness_goal.map(|g| g.as_str()))
        .bind(request.activity_level.map(|a| a.as_str()))
        .bind(request.gym_experience.map(|e| e.as_str()))
        .bind(request.preferred_training_days.map(i64::from))
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(%user_id, "Updated profile");
        self.get_profile(user_id).await
    }

    #[tracing::instrument(skip(self, request))]
    pub async fn record_body_metrics(
        &self,
        user_id: Uuid,
        request: BodyMetricsRequest,
    ) -> Result<BodyMetrics, ApiError> {
        request.validate()?;

        let row = sqlx::query_as::<_, BodyMetricsRow>(&format!(
            "INSERT INTO body_metrics (id, user_id, weight_kg, height_cm, age, sex, smart_scale, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING {BODY_METRICS_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(request.weight_kg)
        .bind(request.height_cm)
        .bind(i64::from(request.age))
        .bind(request.sex.as_str())
        .bind(request.smart_scale.map(Json))
        .bind(Utc::now())
        .fetch_one(&self.db)
        .await?;

        tracing::info!(%user_id, weight_kg = row.weight_kg, "Recorded body metrics");
        Ok(BodyMetrics::try_from(row)?)
    }

    pub async fn latest_body_metrics(&self, user_id: Uuid) -> Result<Option<BodyMetrics>, ApiError> {
        let row = sqlx::query_as::<_, BodyMetricsRow>(&format!(
            "SELECT {BODY_METRICS_COLUMNS} FROM body_metrics
             WHERE user_id = ? ORDER BY created_at DESC LIMIT 1"
        ))
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(BodyMetrics::try_from).transpose()?)
    }

    pub async fn body_metrics_history(
        &self,
        user_id: Uuid,
        limit: u32,
    ) -> Result<Vec<BodyMetrics>, ApiError> {
        let rows = sqlx::query_as::<_, BodyMetricsRow>(&format!(
            "SELECT {BODY_METRICS_COLUMNS} FROM body_metrics
             WHERE user_id = ? ORDER BY created_at DESC LIMIT ?"
        ))
        .bind(user_id)
        .bind(i64::from(limit))
        .fetch_all(&self.db)
        .await?;

        rows.into_iter()
            .map(|row| BodyMetrics::try_from(row).map_err(ApiError::from))
            .collect()
    }
}

fn compose_profile(user: User, row: Option<UserProfileRow>) -> UserProfile {
    let today = Utc::now().date_naive();

    match row {
        Some(row) => UserProfile {
            user_id: user.id,
            email: user.email,
            full_name: user.full_name,
            date_of_birth: row.date_of_birth,
            age: row.date_of_birth.and_then(|dob| age_on(dob, today)),
            sex: row.sex.as_deref().and_then(Sex::from_str),
            primary_fitness_goal: row.primary_fitness_goal.as_deref().and_then(FitnessGoal::from_str),
            activity_level: row.activity_level.as_deref().and_then(ActivityLevel::from_str),
            gym_experience: row.gym_experience.as_deref().and_then(ExperienceLevel::from_str),
            preferred_training_days: row
                .preferred_training_days
                .and_then(|days| u8::try_from(days).ok()),
            updated_at: row.updated_at.max(user.updated_at),
        },
        None => UserProfile {
            user_id: user.id,
            email: user.email,
            full_name: user.full_name,
            date_of_birth: None,
            age: None,
            sex: None,
            primary_fitness_goal: None,
            activity_level: None,
            gym_experience: None,
            preferred_training_days: None,
            updated_at: user.updated_at,
        },
    }
}
