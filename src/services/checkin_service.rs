//! Check-ins: reminders scheduled when a plan is accepted, plus custom ones the user adds.

use chrono::{Days, NaiveDate, Utc};
use sqlx::types::Json;
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;
use validator::Validate;

use crate::errors::ApiError;
use crate::models::{
    CheckIn, CheckInDraft, CheckInKind, CheckInRow, CheckInStatus, CompleteCheckIn, CreateCheckIn,
};

const CHECK_IN_COLUMNS: &str =
    "id, user_id, plan_id, kind, title, description, due_date, status, response, completed_at, created_at";
const PLAN_WEEKS: u64 = 4;
const PHOTO_WEEKS: [u64; 2] = [1, 3];

fn weeks_after(start: NaiveDate, weeks: u64) -> NaiveDate {
    start.checked_add_days(Days::new(weeks * 7)).unwrap_or(start)
}

/// Weekly weigh-ins, two progress photos and a closing review across the four plan weeks.
pub fn plan_schedule(plan_id: Uuid, start: NaiveDate) -> Vec<CheckInDraft> {
    let weigh_ins = (0..PLAN_WEEKS).map(|week| CheckInDraft {
        plan_id: Some(plan_id),
        kind: CheckInKind::WeeklyWeight,
        title: format!("Week {} Weight Check-in", week + 1),
        description: "Record your weight and how you're feeling this week".to_string(),
        due_date: weeks_after(start, week),
    });

    let photos = PHOTO_WEEKS.into_iter().map(|week| CheckInDraft {
        plan_id: Some(plan_id),
        kind: CheckInKind::ProgressPhoto,
        title: format!("Week {} Progress Photo", week + 1),
        description: "Take a progress photo to track your visual changes".to_string(),
        due_date: weeks_after(start, week),
    });

    let review = CheckInDraft {
        plan_id: Some(plan_id),
        kind: CheckInKind::PlanCompletion,
        title: "Plan Completion Review".to_string(),
        description: "Review your 4-week plan results and plan your next steps".to_string(),
        due_date: weeks_after(start, PLAN_WEEKS),
    };

    weigh_ins.chain(photos).chain(std::iter::once(review)).collect()
}

/// Insert drafts on an existing connection so plan acceptance can share its transaction.
pub(crate) async fn store_check_ins(
    conn: &mut SqliteConnection,
    user_id: Uuid,
    drafts: &[CheckInDraft],
) -> Result<Vec<CheckIn>, ApiError> {
    let mut stored = Vec::with_capacity(drafts.len());

    for draft in drafts {
        let row = sqlx::query_as::<_, CheckInRow>(&format!(
            "INSERT INTO check_ins ({CHECK_IN_COLUMNS})
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, NULL, NULL, ?)
             RETURNING {CHECK_IN_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(draft.plan_id)
        .bind(draft.kind.as_str())
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(draft.due_date)
        .bind(CheckInStatus::Pending.as_str())
        .bind(Utc::now())
        .fetch_one(&mut *conn)
        .await?;

        stored.push(CheckIn::try_from(row)?);
    }

    Ok(stored)
}

#[derive(Debug, Clone)]
pub struct CheckInService {
    db: SqlitePool,
}

impl CheckInService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    #[tracing::instrument(skip(self, request))]
    pub async fn create(&self, user_id: Uuid, request: CreateCheckIn) -> Result<CheckIn, ApiError> {
        request.validate()?;

        let draft = CheckInDraft {
            plan_id: None,
            kind: request.kind,
            title: request.title.trim().to_string(),
            description: request.description.trim().to_string(),
            due_date: request.due_date.unwrap_or_else(|| Utc::now().date_naive()),
        };

        let mut conn = self.db.acquire().await?;
        let mut stored = store_check_ins(&mut conn, user_id, std::slice::from_ref(&draft)).await?;
        stored
            .pop()
            .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("Check-in insert returned no row")))
    }

    /// Pending check-ins due on or before `today`, earliest first
    pub async fn pending(&self, user_id: Uuid, today: NaiveDate) -> Result<Vec<CheckIn>, ApiError> {
        let rows = sqlx::query_as::<_, CheckInRow>(&format!(
            "SELECT {CHECK_IN_COLUMNS} FROM check_ins
             WHERE user_id = ? AND status = ? AND due_date <= ?
             ORDER BY due_date, created_at"
        ))
        .bind(user_id)
        .bind(CheckInStatus::Pending.as_str())
        .bind(today)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter()
            .map(|row| CheckIn::try_from(row).map_err(ApiError::from))
            .collect()
    }

    /// Newest first
    pub async fn history(&self, user_id: Uuid, limit: u32) -> Result<Vec<CheckIn>, ApiError> {
        let rows = sqlx::query_as::<_, CheckInRow>(&format!(
            "SELECT {CHECK_IN_COLUMNS} FROM check_ins
             WHERE user_id = ?
             ORDER BY created_at DESC, due_date DESC
             LIMIT ?"
        ))
        .bind(user_id)
        .bind(i64::from(limit))
        .fetch_all(&self.db)
        .await?;

        rows.into_iter()
            .map(|row| CheckIn::try_from(row).map_err(ApiError::from))
            .collect()
    }

    #[tracing::instrument(skip(self, request))]
    pub async fn complete(
        &self,
        user_id: Uuid,
        check_in_id: Uuid,
        request: CompleteCheckIn,
    ) -> Result<CheckIn, ApiError> {
        let current = sqlx::query_as::<_, CheckInRow>(&format!(
            "SELECT {CHECK_IN_COLUMNS} FROM check_ins WHERE id = ? AND user_id = ?"
        ))
        .bind(check_in_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Check-in not found".to_string()))?;

        if current.status == CheckInStatus::Completed.as_str() {
            return Err(ApiError::Conflict("Check-in already completed".to_string()));
        }

        let row = sqlx::query_as::<_, CheckInRow>(&format!(
            "UPDATE check_ins SET status = ?, response = ?, completed_at = ?
             WHERE id = ? AND user_id = ?
             RETURNING {CHECK_IN_COLUMNS}"
        ))
        .bind(CheckInStatus::Completed.as_str())
        .bind(Json(&request.response))
        .bind(Utc::now())
        .bind(check_in_id)
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(%user_id, %check_in_id, "Completed check-in");
        Ok(CheckIn::try_from(row)?)
    }
}
