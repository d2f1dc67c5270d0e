// Business logic services

pub mod body_composition;
pub mod checkin_service;
pub mod dashboard_service;
pub mod image_quality;
pub mod image_storage_service;
pub mod nutrition_service;
pub mod plan_generation_service;
pub mod pose_estimation_service;
pub mod progress_service;
pub mod user_service;
pub mod vision_analysis_service;
pub mod workout_planner;
pub mod workout_templates;

pub use checkin_service::CheckInService;
pub use dashboard_service::DashboardService;
pub use image_storage_service::ImageStorageService;
pub use plan_generation_service::PlanGenerationService;
pub use pose_estimation_service::PoseDetector;
pub use progress_service::ProgressService;
pub use user_service::UserService;
pub use vision_analysis_service::{VisionAnalysisService, VisionPipeline};
