use chrono::Utc;
use sqlx::types::Json;
use sqlx::SqlitePool;
use uuid::Uuid;
use validator::Validate;

use crate::errors::ApiError;
use crate::models::{
    ActivityLevel, BodyMetrics, DietaryRestriction, ExperienceLevel, FitnessGoal, ImageAnalysis, Plan, PlanDocument,
    PlanRequest, PlanRow, PlanStatus, PlanSummary, UserProfile,
};
use crate::services::checkin_service::{plan_schedule, store_check_ins};
use crate::services::nutrition_service::{build_nutrition_plan, BodyStats, VisionSignal};
use crate::services::user_service::UserService;
use crate::services::vision_analysis_service::VisionAnalysisService;
use crate::services::workout_planner::{build_program, WorkoutInputs};

const PLAN_COLUMNS: &str = "id, user_id, status, document, accepted_at, created_at";
const DEFAULT_TRAINING_DAYS: u8 = 4;

/// Plan parameters after falling back from the request to the stored profile
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedParameters {
    pub goal: FitnessGoal,
    pub days_per_week: u8,
    pub activity_level: ActivityLevel,
    pub experience_level: ExperienceLevel,
    pub dietary_restrictions: Vec<DietaryRestriction>,
}

pub fn resolve_parameters(
    request: &PlanRequest,
    profile: &UserProfile,
) -> Result<ResolvedParameters, ApiError> {
    let goal = request
        .fitness_goal
        .or(profile.primary_fitness_goal)
        .ok_or_else(|| {
            ApiError::BadRequest(
                "Please set a fitness goal in your profile or include one in the request".to_string(),
            )
        })?;

    Ok(ResolvedParameters {
        goal,
        days_per_week: request
            .days_per_week
            .or(profile.preferred_training_days)
            .unwrap_or(DEFAULT_TRAINING_DAYS),
        activity_level: request
            .activity_level
            .or(profile.activity_level)
            .unwrap_or_default(),
        experience_level: request
            .experience_level
            .or(profile.gym_experience)
            .unwrap_or_default(),
        dietary_restrictions: request.dietary_restrictions.clone(),
    })
}

/// Assemble the plan document from body metrics and an optional photo analysis.
pub fn compose_plan(
    params: &ResolvedParameters,
    metrics: &BodyMetrics,
    analysis: Option<&ImageAnalysis>,
) -> Result<PlanDocument, ApiError> {
    let stats = BodyStats::new(metrics.weight_kg, metrics.height_cm, metrics.age, metrics.sex)?;

    let vision = analysis.map(|a| VisionSignal {
        body_fat_percentage: a.metrics.bf_estimate,
        confidence: a.metrics.confidence,
    });
    let nutrition_plan = build_nutrition_plan(
        &stats,
        params.goal,
        params.activity_level,
        vision.as_ref(),
        &params.dietary_restrictions,
    );

    let program = build_program(&WorkoutInputs {
        goal: params.goal,
        days_per_week: params.days_per_week,
        experience: params.experience_level,
        posture_flags: analysis
            .map(|a| a.metrics.pose_alerts.clone())
            .unwrap_or_default(),
        femur_to_height_ratio: analysis.map(|a| a.metrics.anthro.femur_to_height_ratio),
    });

    let mut vision_adjustments = program.vision_adjustments;
    vision_adjustments.extend(nutrition_plan.adjustments.iter().cloned());

    let mut rationale = format!(
        "{} Nutrition targets {} kcal from a TDEE of {:.0} kcal.",
        program.rationale, nutrition_plan.target_calories, nutrition_plan.tdee
    );
    if let Some(analysis) = analysis {
        rationale.push_str(&format!(
            " Adjusted using your photo analysis ({:.1}% estimated body fat, {} confidence).",
            analysis.metrics.bf_estimate,
            analysis.metrics.confidence.as_str()
        ));
    }

    Ok(PlanDocument {
        goal: params.goal,
        days_per_week: program.days_per_week,
        activity_level: params.activity_level,
        experience_level: params.experience_level,
        workout_plan: program.base_week,
        weeks: program.weeks,
        nutrition_plan,
        rationale,
        vision_adjustments,
        progression_rules: program.progression_rules,
        equipment_needed: program.equipment_needed,
        estimated_session_minutes: program.estimated_session_minutes,
        source_analysis_id: analysis.map(|a| a.id),
    })
}

#[derive(Clone)]
pub struct PlanGenerationService {
    db: SqlitePool,
    users: UserService,
    vision: VisionAnalysisService,
}

impl PlanGenerationService {
    pub fn new(db: SqlitePool, vision: VisionAnalysisService) -> Self {
        Self {
            users: UserService::new(db.clone()),
            db,
            vision,
        }
    }

    /// Generate a plan and make it the user's only active plan
    #[tracing::instrument(skip(self, request))]
    pub async fn generate(&self, user_id: Uuid, request: PlanRequest) -> Result<Plan, ApiError> {
        request.validate()?;

        let profile = self.users.get_profile(user_id).await?;
        let params = resolve_parameters(&request, &profile)?;

        let metrics = self
            .users
            .latest_body_metrics(user_id)
            .await?
            .ok_or_else(|| ApiError::BadRequest("Please provide body metrics first".to_string()))?;
        let analysis = self.vision.latest(user_id).await?;

        let document = compose_plan(&params, &metrics, analysis.as_ref())?;

        let mut tx = self.db.begin().await?;

        sqlx::query("UPDATE plans SET status = ? WHERE user_id = ? AND status = ?")
            .bind(PlanStatus::Inactive.as_str())
            .bind(user_id)
            .bind(PlanStatus::Active.as_str())
            .execute(&mut *tx)
            .await?;

        let row = sqlx::query_as::<_, PlanRow>(&format!(
            "INSERT INTO plans ({PLAN_COLUMNS}) VALUES (?, ?, ?, ?, NULL, ?) RETURNING {PLAN_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(PlanStatus::Active.as_str())
        .bind(Json(&document))
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            %user_id,
            plan_id = %row.id,
            goal = %params.goal,
            days = document.days_per_week,
            used_analysis = analysis.is_some(),
            "Generated plan"
        );

        Ok(Plan::try_from(row)?)
    }

    /// Make `plan_id` the active plan, stamp the acceptance time and schedule its
    /// check-ins. Accepting an already accepted plan only reactivates it.
    #[tracing::instrument(skip(self))]
    pub async fn accept(&self, user_id: Uuid, plan_id: Uuid) -> Result<Plan, ApiError> {
        let mut tx = self.db.begin().await?;

        let current = sqlx::query_as::<_, PlanRow>(&format!(
            "SELECT {PLAN_COLUMNS} FROM plans WHERE id = ? AND user_id = ?"
        ))
        .bind(plan_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| ApiError::NotFound("Plan not found".to_string()))?;
        let first_acceptance = current.accepted_at.is_none();

        sqlx::query("UPDATE plans SET status = ? WHERE user_id = ? AND status = ? AND id != ?")
            .bind(PlanStatus::Inactive.as_str())
            .bind(user_id)
            .bind(PlanStatus::Active.as_str())
            .bind(plan_id)
            .execute(&mut *tx)
            .await?;

        let now = Utc::now();
        let row = sqlx::query_as::<_, PlanRow>(&format!(
            "UPDATE plans SET status = ?, accepted_at = COALESCE(accepted_at, ?)
             WHERE id = ?
             RETURNING {PLAN_COLUMNS}"
        ))
        .bind(PlanStatus::Active.as_str())
        .bind(now)
        .bind(plan_id)
        .fetch_one(&mut *tx)
        .await?;

        if first_acceptance {
            let schedule = plan_schedule(plan_id, now.date_naive());
            store_check_ins(&mut tx, user_id, &schedule).await?;
        }

        tx.commit().await?;

        tracing::info!(%user_id, %plan_id, first_acceptance, "Accepted plan");
        Ok(Plan::try_from(row)?)
    }

    pub async fn list(&self, user_id: Uuid) -> Result<Vec<PlanSummary>, ApiError> {
        let rows = sqlx::query_as::<_, PlanRow>(&format!(
            "SELECT {PLAN_COLUMNS} FROM plans WHERE user_id = ? ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter()
            .map(|row| -> Result<PlanSummary, ApiError> {
                let plan = Plan::try_from(row)?;
                Ok(PlanSummary::from(&plan))
            })
            .collect()
    }

    pub async fn get(&self, user_id: Uuid, plan_id: Uuid) -> Result<Plan, ApiError> {
        let row = sqlx::query_as::<_, PlanRow>(&format!(
            "SELECT {PLAN_COLUMNS} FROM plans WHERE id = ? AND user_id = ?"
        ))
        .bind(plan_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Plan not found".to_string()))?;

        Ok(Plan::try_from(row)?)
    }

    pub async fn active(&self, user_id: Uuid) -> Result<Option<Plan>, ApiError> {
        let row = sqlx::query_as::<_, PlanRow>(&format!(
            "SELECT {PLAN_COLUMNS} FROM plans WHERE user_id = ? AND status = ?
             ORDER BY created_at DESC LIMIT 1"
        ))
        .bind(user_id)
        .bind(PlanStatus::Active.as_str())
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(Plan::try_from).transpose()?)
    }
}
