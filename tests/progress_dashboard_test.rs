mod common;

use axum::http::StatusCode;
use chrono::{Days, Utc};
use pretty_assertions::assert_eq;
use serde_json::json;

use common::TestApp;

#[tokio::test]
async fn test_progress_logs() {
    let app = TestApp::new().await;
    let token = app.register("progress@example.com").await;

    let (status, log) = app
        .post(
            "/api/v1/progress",
            &token,
            json!({ "energy_level": 8, "mood": 7, "sleep_hours": 7.5 }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{log}");
    assert_eq!(log["date"], Utc::now().date_naive().to_string());

    let (status, body) = app
        .post("/api/v1/progress", &token, json!({ "energy_level": 11 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    let (status, logs) = app.get("/api/v1/progress?days=7", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(logs.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_weight_history_window() {
    let app = TestApp::new().await;
    let token = app.register("weight@example.com").await;
    let today = Utc::now().date_naive();

    for (days_ago, kg) in [(0u64, 80.0), (20, 81.5), (60, 84.0)] {
        let date = today.checked_sub_days(Days::new(days_ago)).unwrap();
        let (status, _) = app
            .post(
                "/api/v1/progress/weight",
                &token,
                json!({ "date": date, "weight_kg": kg }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, all) = app.get("/api/v1/progress/weight", &token).await;
    assert_eq!(all.as_array().unwrap().len(), 3);

    let (_, recent) = app.get("/api/v1/progress/weight?days=30", &token).await;
    assert_eq!(recent.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_measurements_need_a_value() {
    let app = TestApp::new().await;
    let token = app.register("tape@example.com").await;

    let (status, _) = app
        .post("/api/v1/progress/measurements", &token, json!({ "notes": "forgot the tape" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post("/api/v1/progress/measurements", &token, json!({ "waist_cm": 86.0 }))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, measurements) = app.get("/api/v1/progress/measurements", &token).await;
    assert_eq!(measurements[0]["waist_cm"], 86.0);
}

#[tokio::test]
async fn test_empty_dashboard() {
    let app = TestApp::new().await;
    let token = app.register("fresh@example.com").await;

    let (status, dashboard) = app.get("/api/v1/dashboard", &token).await;
    assert_eq!(status, StatusCode::OK, "{dashboard}");
    assert_eq!(dashboard["has_active_plan"], false);
    assert!(dashboard["stats"]["current_weight"].is_null());
    assert_eq!(dashboard["stats"]["current_streak"], 0);
    assert_eq!(dashboard["workout_frequency"].as_array().unwrap().len(), 4);
    assert_eq!(dashboard["data_available"]["workout_logs"], false);

    let (status, _) = app.get("/api/v1/dashboard/todays-workout", &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_dashboard_follows_plan_and_logs() {
    let app = TestApp::new().await;
    let token = app.register("dashboard@example.com").await;
    app.record_metrics(&token).await;

    let (status, _) = app
        .post(
            "/api/v1/plans/generate",
            &token,
            json!({ "fitness_goal": "gain_muscle", "days_per_week": 3 }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, today) = app.get("/api/v1/dashboard/todays-workout", &token).await;
    assert_eq!(status, StatusCode::OK, "{today}");
    assert_eq!(today["week"], 1);
    assert_eq!(today["workout"]["day"], 1);

    let (status, _) = app
        .post(
            "/api/v1/progress/workouts",
            &token,
            json!({
                "workout_name": today["workout"]["name"],
                "duration_minutes": 60,
                "exercises_completed": [{ "name": "Push-ups", "sets": 3, "reps": 12 }]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    app.post("/api/v1/progress/weight", &token, json!({ "weight_kg": 81.0 }))
        .await;

    let (status, dashboard) = app.get("/api/v1/dashboard", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dashboard["has_active_plan"], true);
    assert_eq!(dashboard["stats"]["workouts_this_week"], 1);
    assert_eq!(dashboard["stats"]["total_workout_minutes_week"], 60);
    assert_eq!(dashboard["stats"]["current_streak"], 1);
    assert_eq!(dashboard["stats"]["current_weight"], 81.0);
    assert_eq!(dashboard["stats"]["next_workout"]["day"], 2);
    assert_eq!(
        dashboard["todays_focus"]["motivational_message"],
        "Stay consistent with your goals! Every day counts."
    );
    assert!(dashboard["todays_focus"]["nutrition_targets"]["calories"].as_u64().unwrap() > 0);
}
