// Domain models, request payloads and storage rows

pub mod checkin;
pub mod dashboard;
pub mod fitness;
pub mod image_analysis;
pub mod plan;
pub mod progress;
pub mod user;
pub mod validation;

pub use checkin::*;
pub use dashboard::*;
pub use fitness::*;
pub use image_analysis::*;
pub use plan::*;
pub use progress::*;
pub use user::*;
pub use validation::*;
