//! Services layer for equipment-service.
//!
//! Business logic for authentication, session tokens, account lockout and
//! the equipment rules engine, plus the store implementations behind them.

mod auth;
mod database;
mod equipment;
pub mod error;
mod jwt;
pub mod lockout;
mod memory_store;
pub mod metrics;
pub mod policy;
pub mod store;

pub use auth::{AuthService, AuthSession};
pub use database::Database;
pub use equipment::{authorize_access, EquipmentService};
pub use error::{ServiceError, ValidationError};
pub use jwt::{JwtService, SessionClaims, TokenError};
pub use lockout::{LockoutPolicy, LockoutState};
pub use memory_store::{default_statuses, MemoryStore};
pub use policy::{PolicyError, PolicyService};
pub use store::{EquipmentStore, LockoutStatus, LoginGate, StoreError, UserStore};
