//! Credential store interface.
//!
//! The services only reach durable state through these two traits. Both are
//! implemented by [`super::Database`] (PostgreSQL) and [`super::MemoryStore`].

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use super::lockout::LockoutPolicy;
use crate::models::{Equipment, EquipmentFilter, EquipmentPatch, User};

#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write. Carries the constraint name.
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Record not found")]
    NotFound,

    #[error("Store backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

/// Whether a login attempt may proceed, decided under the store's lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginGate {
    Open,
    Locked { remaining_seconds: i64 },
}

/// Outcome of a single atomic failed-attempt registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutStatus {
    pub is_locked: bool,
    pub remaining_seconds: i64,
    pub failed_attempts: i32,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Looks up by organization and normalised email.
    async fn find_user_by_email(
        &self,
        organization_id: Uuid,
        email: &str,
    ) -> Result<Option<User>, StoreError>;

    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, StoreError>;

    async fn create_user(&self, user: &User) -> Result<(), StoreError>;

    /// Records one failed attempt and engages the lock when the threshold is
    /// reached, as a single linearised read-modify-write.
    async fn check_and_update_lockout(
        &self,
        user_id: Uuid,
        policy: &LockoutPolicy,
    ) -> Result<LockoutStatus, StoreError>;

    /// Reads the lock state and, when an expired lock is found, resets the
    /// counter, in one atomic step. Returns `Locked` while a lock is in force.
    async fn open_login_attempt(&self, user_id: Uuid) -> Result<LoginGate, StoreError>;

    /// Marks a successful login (counter reset, lock cleared, `active`,
    /// `last_login_at = now`) unless a lock is in force at write time, in
    /// which case nothing is written and `Locked` is returned.
    async fn record_login(&self, user_id: Uuid) -> Result<LoginGate, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}

#[async_trait]
pub trait EquipmentStore: Send + Sync {
    /// Live (not soft-deleted) record by id, any organization.
    async fn find_equipment_by_id(&self, id: Uuid) -> Result<Option<Equipment>, StoreError>;

    async fn find_equipment_by_serial(
        &self,
        organization_id: Uuid,
        serial_number: &str,
    ) -> Result<Option<Equipment>, StoreError>;

    /// Live records of one organization, newest first.
    async fn find_equipment_by_org(
        &self,
        organization_id: Uuid,
        filter: &EquipmentFilter,
    ) -> Result<Vec<Equipment>, StoreError>;

    async fn count_equipment_by_org(&self, organization_id: Uuid) -> Result<i64, StoreError>;

    async fn create_equipment(&self, equipment: &Equipment) -> Result<(), StoreError>;

    /// Applies the patch to a live record and returns the stored result.
    async fn update_equipment(
        &self,
        id: Uuid,
        patch: &EquipmentPatch,
        updated_by: Uuid,
    ) -> Result<Equipment, StoreError>;

    async fn soft_delete_equipment(&self, id: Uuid, deleted_by: Uuid) -> Result<(), StoreError>;

    async fn is_enabled_status(&self, status_id: i16) -> Result<bool, StoreError>;

    /// Lowest-id enabled status, assigned when none is supplied.
    async fn first_enabled_status(&self) -> Result<Option<i16>, StoreError>;
}
