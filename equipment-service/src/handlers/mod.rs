//! HTTP handlers for equipment-service.

pub mod auth;
pub mod equipment;
pub mod metrics;
pub mod user;

pub use auth::*;
pub use equipment::*;
pub use user::*;
