//! In-process store used by tests and database-less local runs.
//!
//! All state sits behind one mutex, so every trait method is a single
//! critical section; in particular `check_and_update_lockout` is atomic.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::lockout::{self, LockoutPolicy};
use super::store::{EquipmentStore, LockoutStatus, LoginGate, StoreError, UserStore};
use crate::models::{
    normalize_email, Equipment, EquipmentFilter, EquipmentPatch, EquipmentStatus, User,
};

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    equipment: HashMap<Uuid, Equipment>,
    statuses: Vec<EquipmentStatus>,
}

pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Store seeded with the same status lookup rows as the migration.
    pub fn new() -> Self {
        Self::with_statuses(default_statuses())
    }

    pub fn with_statuses(statuses: Vec<EquipmentStatus>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                statuses,
                ..Default::default()
            }),
        }
    }

    /// Test hook: overwrite a stored user (e.g. to age a lock).
    pub async fn put_user(&self, user: User) {
        self.inner.lock().await.users.insert(user.id, user);
    }

    /// Test hook: read a record even when soft-deleted.
    pub async fn raw_equipment(&self, id: Uuid) -> Option<Equipment> {
        self.inner.lock().await.equipment.get(&id).cloned()
    }
}

pub fn default_statuses() -> Vec<EquipmentStatus> {
    [
        (1, "in_service", "In service", "active"),
        (2, "in_repair", "In repair", "active"),
        (3, "in_storage", "In storage", "active"),
        (4, "retired", "Retired", "inactive"),
    ]
    .into_iter()
    .map(|(id, code, label, status)| EquipmentStatus {
        id,
        code: code.to_string(),
        label: label.to_string(),
        status: status.to_string(),
    })
    .collect()
}

fn live(equipment: &Equipment) -> bool {
    !equipment.is_deleted()
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user_by_email(
        &self,
        organization_id: Uuid,
        email: &str,
    ) -> Result<Option<User>, StoreError> {
        let email = normalize_email(email);
        let inner = self.inner.lock().await;
        Ok(inner
            .users
            .values()
            .find(|u| u.organization_id == organization_id && u.email == email)
            .cloned())
    }

    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.inner.lock().await.users.get(&user_id).cloned())
    }

    async fn create_user(&self, user: &User) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        let taken = inner
            .users
            .values()
            .any(|u| u.organization_id == user.organization_id && u.email == user.email);
        if taken {
            return Err(StoreError::UniqueViolation("users_org_email_key".to_string()));
        }
        inner.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn check_and_update_lockout(
        &self,
        user_id: Uuid,
        policy: &LockoutPolicy,
    ) -> Result<LockoutStatus, StoreError> {
        let mut inner = self.inner.lock().await;
        let user = inner.users.get_mut(&user_id).ok_or(StoreError::NotFound)?;
        Ok(policy.register_failure(user, Utc::now()))
    }

    async fn open_login_attempt(&self, user_id: Uuid) -> Result<LoginGate, StoreError> {
        let mut inner = self.inner.lock().await;
        let user = inner.users.get_mut(&user_id).ok_or(StoreError::NotFound)?;
        Ok(lockout::open_attempt(user, Utc::now()))
    }

    async fn record_login(&self, user_id: Uuid) -> Result<LoginGate, StoreError> {
        let mut inner = self.inner.lock().await;
        let user = inner.users.get_mut(&user_id).ok_or(StoreError::NotFound)?;
        Ok(lockout::record_success(user, Utc::now()))
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl EquipmentStore for MemoryStore {
    async fn find_equipment_by_id(&self, id: Uuid) -> Result<Option<Equipment>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.equipment.get(&id).filter(|e| live(e)).cloned())
    }

    async fn find_equipment_by_serial(
        &self,
        organization_id: Uuid,
        serial_number: &str,
    ) -> Result<Option<Equipment>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .equipment
            .values()
            .find(|e| {
                live(e) && e.organization_id == organization_id && e.serial_number == serial_number
            })
            .cloned())
    }

    async fn find_equipment_by_org(
        &self,
        organization_id: Uuid,
        filter: &EquipmentFilter,
    ) -> Result<Vec<Equipment>, StoreError> {
        let inner = self.inner.lock().await;
        let mut found: Vec<Equipment> = inner
            .equipment
            .values()
            .filter(|e| live(e) && e.organization_id == organization_id && filter.matches(e))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn count_equipment_by_org(&self, organization_id: Uuid) -> Result<i64, StoreError> {
        let inner = self.inner.lock().await;
        let count = inner
            .equipment
            .values()
            .filter(|e| live(e) && e.organization_id == organization_id)
            .count();
        Ok(count as i64)
    }

    async fn create_equipment(&self, equipment: &Equipment) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        let taken = inner.equipment.values().any(|e| {
            live(e)
                && e.organization_id == equipment.organization_id
                && e.serial_number == equipment.serial_number
        });
        if taken {
            return Err(StoreError::UniqueViolation(
                "equipment_org_serial_key".to_string(),
            ));
        }
        inner.equipment.insert(equipment.id, equipment.clone());
        Ok(())
    }

    async fn update_equipment(
        &self,
        id: Uuid,
        patch: &EquipmentPatch,
        updated_by: Uuid,
    ) -> Result<Equipment, StoreError> {
        let mut inner = self.inner.lock().await;
        let equipment = inner
            .equipment
            .get_mut(&id)
            .filter(|e| live(e))
            .ok_or(StoreError::NotFound)?;
        equipment.apply(patch);
        equipment.updated_by = updated_by;
        equipment.updated_at = Utc::now();
        Ok(equipment.clone())
    }

    async fn soft_delete_equipment(&self, id: Uuid, deleted_by: Uuid) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        let equipment = inner
            .equipment
            .get_mut(&id)
            .filter(|e| live(e))
            .ok_or(StoreError::NotFound)?;
        let now = Utc::now();
        equipment.deleted_at = Some(now);
        equipment.updated_by = deleted_by;
        equipment.updated_at = now;
        Ok(())
    }

    async fn is_enabled_status(&self, status_id: i16) -> Result<bool, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .statuses
            .iter()
            .any(|s| s.id == status_id && s.is_enabled()))
    }

    async fn first_enabled_status(&self) -> Result<Option<i16>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .statuses
            .iter()
            .filter(|s| s.is_enabled())
            .map(|s| s.id)
            .min())
    }
}
