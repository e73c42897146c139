//! Data models for the car-service backend.
//!
//! Field names serialize in camelCase to match the site's JavaScript client.

mod booking;
mod cms;
mod comment;
mod cost;
mod driver;
mod feedback;
mod user;

pub use booking::*;
pub use cms::*;
pub use comment::*;
pub use cost::*;
pub use driver::*;
pub use feedback::*;
pub use user::*;
