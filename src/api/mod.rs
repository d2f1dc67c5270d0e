// API routes and handlers

pub mod auth;
pub mod checkins;
pub mod dashboard;
pub mod health;
pub mod plans;
pub mod progress;
pub mod routes;
pub mod user;
pub mod vision;

pub use routes::create_routes;
