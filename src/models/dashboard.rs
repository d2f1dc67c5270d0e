use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::plan::{Macros, WorkoutDay};
use super::progress::ProgressLog;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NextWorkout {
    pub name: String,
    pub week: u8,
    pub day: u8,
    pub estimated_minutes: u32,
    pub exercise_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DashboardStats {
    pub current_weight: Option<f64>,
    pub weight_change_7d: Option<f64>,
    pub weight_change_30d: Option<f64>,
    pub workouts_this_week: u32,
    pub total_workout_minutes_week: u32,
    pub current_streak: u32,
    pub next_workout: Option<NextWorkout>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NutritionTargets {
    pub calories: u32,
    pub macros: Macros,
    pub hydration_ml: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TodaysFocus {
    pub workout_scheduled: Option<String>,
    pub nutrition_targets: Option<NutritionTargets>,
    pub progress_logged: bool,
    pub motivational_message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeightPoint {
    pub date: NaiveDate,
    pub weight_kg: f64,
    pub body_fat_percentage: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeeklyFrequency {
    pub label: String,
    pub week_start: NaiveDate,
    pub workouts: u32,
    pub total_minutes: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DataAvailability {
    pub progress_logs: bool,
    pub workout_logs: bool,
    pub weight_entries: bool,
    pub image_analysis: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DashboardResponse {
    pub stats: DashboardStats,
    pub todays_focus: TodaysFocus,
    pub recent_progress: Vec<ProgressLog>,
    pub weight_trend: Vec<WeightPoint>,
    pub workout_frequency: Vec<WeeklyFrequency>,
    pub has_active_plan: bool,
    pub data_available: DataAvailability,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TodaysWorkout {
    pub plan_id: Uuid,
    pub week: u8,
    pub week_focus: String,
    pub workouts_completed_this_week: u32,
    pub workout: WorkoutDay,
}
