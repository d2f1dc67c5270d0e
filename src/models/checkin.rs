use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

pub const DEFAULT_HISTORY_LIMIT: u32 = 20;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CheckInKind {
    WeeklyWeight,
    ProgressPhoto,
    PlanFeedback,
    WellnessCheck,
    PlanCompletion,
}

impl CheckInKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckInKind::WeeklyWeight => "weekly_weight",
            CheckInKind::ProgressPhoto => "progress_photo",
            CheckInKind::PlanFeedback => "plan_feedback",
            CheckInKind::WellnessCheck => "wellness_check",
            CheckInKind::PlanCompletion => "plan_completion",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "weekly_weight" => Some(CheckInKind::WeeklyWeight),
            "progress_photo" => Some(CheckInKind::ProgressPhoto),
            "plan_feedback" => Some(CheckInKind::PlanFeedback),
            "wellness_check" => Some(CheckInKind::WellnessCheck),
            "plan_completion" => Some(CheckInKind::PlanCompletion),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CheckInStatus {
    Pending,
    Completed,
}

impl CheckInStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckInStatus::Pending => "pending",
            CheckInStatus::Completed => "completed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(CheckInStatus::Pending),
            "completed" => Some(CheckInStatus::Completed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckIn {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan_id: Option<Uuid>,
    pub kind: CheckInKind,
    pub title: String,
    pub description: String,
    pub due_date: NaiveDate,
    pub status: CheckInStatus,
    pub response: Option<Map<String, Value>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct CheckInRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan_id: Option<Uuid>,
    pub kind: String,
    pub title: String,
    pub description: String,
    pub due_date: NaiveDate,
    pub status: String,
    pub response: Option<Json<Map<String, Value>>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<CheckInRow> for CheckIn {
    type Error = anyhow::Error;

    fn try_from(row: CheckInRow) -> Result<Self, Self::Error> {
        let kind = CheckInKind::from_str(&row.kind)
            .ok_or_else(|| anyhow::anyhow!("Unknown check-in kind: {}", row.kind))?;
        let status = CheckInStatus::from_str(&row.status)
            .ok_or_else(|| anyhow::anyhow!("Unknown check-in status: {}", row.status))?;

        Ok(CheckIn {
            id: row.id,
            user_id: row.user_id,
            plan_id: row.plan_id,
            kind,
            title: row.title,
            description: row.description,
            due_date: row.due_date,
            status,
            response: row.response.map(|json| json.0),
            completed_at: row.completed_at,
            created_at: row.created_at,
        })
    }
}

/// A check-in before it is stored
#[derive(Debug, Clone, PartialEq)]
pub struct CheckInDraft {
    pub plan_id: Option<Uuid>,
    pub kind: CheckInKind,
    pub title: String,
    pub description: String,
    pub due_date: NaiveDate,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCheckIn {
    pub kind: CheckInKind,
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 1000, message = "Description cannot exceed 1000 characters"))]
    pub description: String,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompleteCheckIn {
    #[serde(default)]
    pub response: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckInHistoryQuery {
    pub limit: Option<u32>,
}

impl CheckInHistoryQuery {
    pub fn limit_or_default(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_HISTORY_LIMIT).clamp(1, 100)
    }
}
