//! Dashboard aggregation. Everything except loading the rows is a pure function of
//! the stored logs and the current date so it can be tested without a database.

use chrono::{Datelike, Days, NaiveDate, Utc};
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::errors::ApiError;
use crate::models::{
    DashboardResponse, DashboardStats, DataAvailability, NextWorkout, NutritionTargets, Plan,
    ProgressLog, TodaysFocus, TodaysWorkout, WeeklyFrequency, WeightEntry, WeightPoint, WorkoutLog,
};
use crate::services::nutrition_service::round_to;
use crate::services::plan_generation_service::PlanGenerationService;
use crate::services::progress_service::ProgressService;
use crate::services::vision_analysis_service::VisionAnalysisService;
use crate::services::workout_templates::week_focus;

const MAX_STREAK_DAYS: u32 = 30;
const RECENT_PROGRESS_ENTRIES: usize = 14;
const WEIGHT_TREND_ENTRIES: usize = 30;
const FREQUENCY_WEEKS: u64 = 4;
/// Enough history for the 4-week frequency chart and the 30-day streak
const WORKOUT_HISTORY_DAYS: u32 = 35;
const WEIGHT_HISTORY_DAYS: u32 = 90;
const PROGRESS_HISTORY_DAYS: u32 = 30;

const STREAK_MESSAGE: &str = "Stay consistent with your goals! Every day counts.";
const START_MESSAGE: &str = "Today is a great day to start your fitness journey!";

/// Everything the dashboard is computed from
#[derive(Debug, Clone, Default)]
pub struct DashboardData {
    pub weights: Vec<WeightEntry>,
    /// Most recent weigh-in regardless of the history window
    pub latest_weight: Option<WeightEntry>,
    pub workouts: Vec<WorkoutLog>,
    pub progress: Vec<ProgressLog>,
    pub active_plan: Option<Plan>,
    pub has_image_analysis: bool,
}

fn iso_week_start(date: NaiveDate) -> NaiveDate {
    date.checked_sub_days(Days::new(u64::from(date.weekday().num_days_from_monday())))
        .unwrap_or(date)
}

fn days_before(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_sub_days(Days::new(days)).unwrap_or(NaiveDate::MIN)
}

/// Latest minus oldest weight within the window, when there are at least two entries
pub fn weight_change(weights: &[WeightEntry], today: NaiveDate, days: u64) -> Option<f64> {
    let since = days_before(today, days);
    let window: Vec<&WeightEntry> = weights.iter().filter(|w| w.date >= since).collect();
    if window.len() < 2 {
        return None;
    }

    let newest = window.iter().max_by_key(|w| (w.date, w.created_at))?;
    let oldest = window.iter().min_by_key(|w| (w.date, w.created_at))?;
    Some(round_to(newest.weight_kg - oldest.weight_kg, 1))
}

/// Consecutive days with at least one workout, ending today
pub fn workout_streak(workouts: &[WorkoutLog], today: NaiveDate) -> u32 {
    let days: BTreeSet<NaiveDate> = workouts.iter().map(|w| w.date).collect();

    let mut streak = 0;
    let mut day = today;
    while streak < MAX_STREAK_DAYS && days.contains(&day) {
        streak += 1;
        match day.pred_opt() {
            Some(previous) => day = previous,
            None => break,
        }
    }
    streak
}

pub fn workouts_this_week(workouts: &[WorkoutLog], today: NaiveDate) -> Vec<&WorkoutLog> {
    let week_start = iso_week_start(today);
    workouts
        .iter()
        .filter(|w| w.date >= week_start && w.date <= today)
        .collect()
}

/// Workout counts for the last four ISO weeks, oldest first; the last entry is the current week
pub fn workout_frequency(workouts: &[WorkoutLog], today: NaiveDate) -> Vec<WeeklyFrequency> {
    let current_week = iso_week_start(today);

    (0..FREQUENCY_WEEKS)
        .rev()
        .enumerate()
        .map(|(idx, weeks_ago)| {
            let week_start = days_before(current_week, weeks_ago * 7);
            let week_end = week_start + Days::new(7);
            let in_week: Vec<&WorkoutLog> = workouts
                .iter()
                .filter(|w| w.date >= week_start && w.date < week_end)
                .collect();

            WeeklyFrequency {
                label: format!("Week {}", idx + 1),
                week_start,
                workouts: in_week.len() as u32,
                total_minutes: in_week
                    .iter()
                    .map(|w| u32::try_from(w.duration_minutes).unwrap_or(0))
                    .sum(),
            }
        })
        .collect()
}

/// Select today's session from the active plan. The plan cycles through its four
/// weeks by calendar, and through the week's days by workouts logged this week.
pub fn todays_workout(plan: &Plan, today: NaiveDate, completed_this_week: u32) -> Option<TodaysWorkout> {
    let days_since_start = (today - plan.started_at().date_naive()).num_days().max(0);
    let week = ((days_since_start / 7) % 4 + 1) as u8;

    let (focus, workouts) = match plan.document.weeks.iter().find(|w| w.week == week) {
        Some(plan_week) => (plan_week.focus.clone(), &plan_week.workouts),
        None => (week_focus(week, false).to_string(), &plan.document.workout_plan),
    };
    if workouts.is_empty() {
        return None;
    }

    let index = completed_this_week as usize % workouts.len();
    Some(TodaysWorkout {
        plan_id: plan.id,
        week,
        week_focus: focus,
        workouts_completed_this_week: completed_this_week,
        workout: workouts[index].clone(),
    })
}

pub fn build_dashboard(data: &DashboardData, today: NaiveDate) -> DashboardResponse {
    let mut weights: Vec<&WeightEntry> = data.weights.iter().collect();
    weights.sort_by_key(|w| (w.date, w.created_at));

    let this_week = workouts_this_week(&data.workouts, today);
    let completed = this_week.len() as u32;
    let streak = workout_streak(&data.workouts, today);

    let scheduled = data
        .active_plan
        .as_ref()
        .and_then(|plan| todays_workout(plan, today, completed));

    let stats = DashboardStats {
        current_weight: data
            .latest_weight
            .as_ref()
            .or(weights.last().copied())
            .map(|w| w.weight_kg),
        weight_change_7d: weight_change(&data.weights, today, 7),
        weight_change_30d: weight_change(&data.weights, today, 30),
        workouts_this_week: completed,
        total_workout_minutes_week: this_week
            .iter()
            .map(|w| u32::try_from(w.duration_minutes).unwrap_or(0))
            .sum(),
        current_streak: streak,
        next_workout: scheduled.as_ref().map(|t| NextWorkout {
            name: t.workout.name.clone(),
            week: t.week,
            day: t.workout.day,
            estimated_minutes: t.workout.estimated_minutes,
            exercise_count: t.workout.exercises.len(),
        }),
    };

    let todays_focus = TodaysFocus {
        workout_scheduled: scheduled.as_ref().map(|t| t.workout.name.clone()),
        nutrition_targets: data.active_plan.as_ref().map(|plan| {
            let nutrition = &plan.document.nutrition_plan;
            NutritionTargets {
                calories: nutrition.target_calories,
                macros: nutrition.macros,
                hydration_ml: nutrition.hydration_ml,
            }
        }),
        progress_logged: data.progress.iter().any(|p| p.date == today),
        motivational_message: (if streak > 0 { STREAK_MESSAGE } else { START_MESSAGE }).to_string(),
    };

    let mut progress: Vec<ProgressLog> = data.progress.clone();
    progress.sort_by_key(|p| (p.date, p.created_at));
    let recent_progress = progress
        .split_off(progress.len().saturating_sub(RECENT_PROGRESS_ENTRIES));

    let weight_trend = weights[weights.len().saturating_sub(WEIGHT_TREND_ENTRIES)..]
        .iter()
        .map(|w| WeightPoint {
            date: w.date,
            weight_kg: w.weight_kg,
            body_fat_percentage: w.body_fat_percentage,
        })
        .collect();

    DashboardResponse {
        stats,
        todays_focus,
        recent_progress,
        weight_trend,
        workout_frequency: workout_frequency(&data.workouts, today),
        has_active_plan: data.active_plan.is_some(),
        data_available: DataAvailability {
            progress_logs: !data.progress.is_empty(),
            workout_logs: !data.workouts.is_empty(),
            weight_entries: !data.weights.is_empty(),
            image_analysis: data.has_image_analysis,
        },
    }
}

#[derive(Clone)]
pub struct DashboardService {
    plans: PlanGenerationService,
    progress: ProgressService,
    vision: VisionAnalysisService,
}

impl DashboardService {
    pub fn new(
        plans: PlanGenerationService,
        progress: ProgressService,
        vision: VisionAnalysisService,
    ) -> Self {
        Self {
            plans,
            progress,
            vision,
        }
    }

    async fn load(&self, user_id: Uuid) -> Result<DashboardData, ApiError> {
        let (weights, latest_weight, workouts, progress, active_plan, analysis) = tokio::try_join!(
            self.progress.weight_entries(user_id, WEIGHT_HISTORY_DAYS),
            self.progress.latest_weight(user_id),
            self.progress.workout_logs(user_id, WORKOUT_HISTORY_DAYS),
            self.progress.progress_logs(user_id, PROGRESS_HISTORY_DAYS),
            self.plans.active(user_id),
            self.vision.latest(user_id),
        )?;

        Ok(DashboardData {
            weights,
            latest_weight,
            workouts,
            progress,
            active_plan,
            has_image_analysis: analysis.is_some(),
        })
    }

    #[tracing::instrument(skip(self))]
    pub async fn dashboard(&self, user_id: Uuid) -> Result<DashboardResponse, ApiError> {
        let data = self.load(user_id).await?;
        Ok(build_dashboard(&data, Utc::now().date_naive()))
    }

    pub async fn todays_workout(&self, user_id: Uuid) -> Result<TodaysWorkout, ApiError> {
        let plan = self.plans.active(user_id).await?.ok_or_else(|| {
            ApiError::NotFound("No active plan; generate a plan first".to_string())
        })?;

        let today = Utc::now().date_naive();
        let workouts = self.progress.workout_logs(user_id, 7).await?;
        let completed = workouts_this_week(&workouts, today).len() as u32;

        todays_workout(&plan, today, completed)
            .ok_or_else(|| ApiError::NotFound("Active plan has no workouts".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActivityLevel, ExperienceLevel, FitnessGoal, PlanStatus, Sex};
    use crate::services::plan_generation_service::{compose_plan, ResolvedParameters};
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use sqlx::types::Json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn weight(on: NaiveDate, kg: f64) -> WeightEntry {
        WeightEntry {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            date: on,
            weight_kg: kg,
            body_fat_percentage: None,
            muscle_percentage: None,
            notes: None,
            created_at: Utc::now(),
        }
    }

    fn workout(on: NaiveDate, minutes: i64) -> WorkoutLog {
        WorkoutLog {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            date: on,
            workout_name: "Session".to_string(),
            duration_minutes: minutes,
            exercises_completed: Json(Vec::new()),
            difficulty_rating: None,
            notes: None,
            created_at: Utc::now(),
        }
    }

    fn plan_started(on: NaiveDate) -> Plan {
        let metrics = crate::models::BodyMetrics {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            weight_kg: 75.0,
            height_cm: 178.0,
            age: 28,
            sex: Sex::Male,
            smart_scale: None,
            created_at: Utc::now(),
        };
        let params = ResolvedParameters {
            goal: FitnessGoal::GainMuscle,
            days_per_week: 3,
            activity_level: ActivityLevel::Moderate,
            experience_level: ExperienceLevel::Intermediate,
            dietary_restrictions: Vec::new(),
        };

        Plan {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            status: PlanStatus::Active,
            document: compose_plan(&params, &metrics, None).unwrap(),
            accepted_at: None,
            created_at: Utc.from_utc_datetime(&on.and_hms_opt(9, 0, 0).unwrap()),
        }
    }

    #[test]
    fn test_weight_change_needs_two_entries() {
        let today = date(2024, 6, 20);
        let weights = vec![weight(today, 80.0)];
        assert_eq!(weight_change(&weights, today, 7), None);

        let weights = vec![
            weight(date(2024, 6, 15), 81.26),
            weight(today, 80.0),
            weight(date(2024, 5, 1), 85.0),
        ];
        assert_eq!(weight_change(&weights, today, 7), Some(-1.3));
        assert_eq!(weight_change(&weights, today, 30), Some(-1.3));
        assert_eq!(weight_change(&weights, today, 60), Some(-5.0));
    }

    #[test]
    fn test_streak_ends_today() {
        let today = date(2024, 6, 20);
        let workouts = vec![
            workout(today, 45),
            workout(date(2024, 6, 19), 30),
            workout(date(2024, 6, 18), 30),
            workout(date(2024, 6, 16), 30),
        ];
        assert_eq!(workout_streak(&workouts, today), 3);
        assert_eq!(workout_streak(&workouts, date(2024, 6, 21)), 0);
    }

    #[test]
    fn test_streak_is_capped() {
        let today = date(2024, 6, 30);
        let workouts: Vec<_> = (0..40).map(|d| workout(days_before(today, d), 20)).collect();
        assert_eq!(workout_streak(&workouts, today), MAX_STREAK_DAYS);
    }

    #[test]
    fn test_frequency_is_chronological() {
        // Thursday
        let today = date(2024, 6, 20);
        let workouts = vec![
            workout(date(2024, 6, 17), 40),
            workout(date(2024, 6, 19), 50),
            workout(date(2024, 5, 28), 60),
        ];

        let frequency = workout_frequency(&workouts, today);
        assert_eq!(frequency.len(), 4);
        assert_eq!(frequency[0].label, "Week 1");
        assert_eq!(frequency[0].week_start, date(2024, 5, 27));
        assert_eq!(frequency[0].workouts, 1);
        assert_eq!(frequency[3].week_start, date(2024, 6, 17));
        assert_eq!(frequency[3].workouts, 2);
        assert_eq!(frequency[3].total_minutes, 90);
    }

    #[test]
    fn test_todays_workout_rotates_through_days() {
        let start = date(2024, 6, 3);
        let plan = plan_started(start);

        let first = todays_workout(&plan, start, 0).unwrap();
        assert_eq!(first.week, 1);
        assert_eq!(first.workout.day, 1);

        let second = todays_workout(&plan, start, 1).unwrap();
        assert_eq!(second.workout.day, 2);

        let wrapped = todays_workout(&plan, start, 3).unwrap();
        assert_eq!(wrapped.workout.day, 1);
    }

    #[test]
    fn test_todays_workout_cycles_weeks() {
        let start = date(2024, 6, 3);
        let plan = plan_started(start);

        assert_eq!(todays_workout(&plan, date(2024, 6, 10), 0).unwrap().week, 2);
        let deload = todays_workout(&plan, date(2024, 6, 24), 0).unwrap();
        assert_eq!(deload.week, 4);
        assert!(deload.week_focus.starts_with("Deload"));
        assert_eq!(todays_workout(&plan, date(2024, 7, 1), 0).unwrap().week, 1);
    }

    #[test]
    fn test_acceptance_restarts_week_one() {
        let mut plan = plan_started(date(2024, 6, 3));
        plan.accepted_at = Some(Utc.from_utc_datetime(&date(2024, 6, 17).and_hms_opt(18, 0, 0).unwrap()));

        assert_eq!(todays_workout(&plan, date(2024, 6, 20), 0).unwrap().week, 1);
        assert_eq!(todays_workout(&plan, date(2024, 6, 24), 0).unwrap().week, 2);
    }

    #[test]
    fn test_empty_dashboard() {
        let dashboard = build_dashboard(&DashboardData::default(), date(2024, 6, 20));

        assert_eq!(dashboard.stats.current_weight, None);
        assert_eq!(dashboard.stats.current_streak, 0);
        assert_eq!(dashboard.stats.next_workout, None);
        assert_eq!(dashboard.todays_focus.motivational_message, START_MESSAGE);
        assert!(!dashboard.has_active_plan);
        assert!(!dashboard.data_available.weight_entries);
        assert_eq!(dashboard.workout_frequency.len(), 4);
    }

    #[test]
    fn test_dashboard_with_plan_and_logs() {
        let today = date(2024, 6, 20);
        let data = DashboardData {
            weights: vec![weight(date(2024, 6, 14), 82.0), weight(today, 81.0)],
            latest_weight: None,
            workouts: vec![workout(today, 50), workout(date(2024, 6, 18), 40)],
            progress: Vec::new(),
            active_plan: Some(plan_started(date(2024, 6, 17))),
            has_image_analysis: false,
        };

        let dashboard = build_dashboard(&data, today);
        assert_eq!(dashboard.stats.current_weight, Some(81.0));
        assert_eq!(dashboard.stats.weight_change_7d, Some(-1.0));
        assert_eq!(dashboard.stats.workouts_this_week, 2);
        assert_eq!(dashboard.stats.total_workout_minutes_week, 90);
        assert_eq!(dashboard.stats.current_streak, 1);
        assert_eq!(dashboard.stats.next_workout.as_ref().map(|n| n.day), Some(3));
        assert_eq!(dashboard.todays_focus.motivational_message, STREAK_MESSAGE);
        assert!(dashboard.todays_focus.nutrition_targets.is_some());
        assert_eq!(dashboard.weight_trend.first().map(|w| w.weight_kg), Some(82.0));
        assert!(dashboard.has_active_plan);
    }

    #[test]
    fn test_current_weight_outlives_history_window() {
        let data = DashboardData {
            latest_weight: Some(weight(date(2024, 1, 5), 79.4)),
            ..Default::default()
        };

        let dashboard = build_dashboard(&data, date(2024, 6, 20));
        assert_eq!(dashboard.stats.current_weight, Some(79.4));
        assert!(dashboard.weight_trend.is_empty());
        assert!(!dashboard.data_available.weight_entries);
    }
}
