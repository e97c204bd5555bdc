//! Equipment rules engine: field validation, tenant isolation and the
//! whitelisted update path.

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use super::error::{ServiceError, ValidationError};
use super::store::{EquipmentStore, StoreError};
use crate::models::{
    Equipment, EquipmentDraft, EquipmentFilter, EquipmentPatch, NewEquipment,
};

#[derive(Clone)]
pub struct EquipmentService {
    store: Arc<dyn EquipmentStore>,
}

/// Tenant gate for a loaded record. Foreign and soft-deleted records are
/// both reported as `NotFound` so existence never leaks across tenants.
pub fn authorize_access(organization_id: Uuid, equipment: &Equipment) -> Result<(), ServiceError> {
    if equipment.is_deleted() {
        return Err(ServiceError::NotFound);
    }
    if equipment.organization_id != organization_id {
        tracing::warn!(
            caller_organization_id = %organization_id,
            equipment_id = %equipment.id,
            "Cross-tenant equipment access denied"
        );
        return Err(ServiceError::NotFound);
    }
    Ok(())
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

impl EquipmentService {
    pub fn new(store: Arc<dyn EquipmentStore>) -> Self {
        Self { store }
    }

    /// Runs the field rules in order and stops at the first failure.
    pub async fn validate(
        &self,
        organization_id: Uuid,
        draft: &EquipmentDraft,
    ) -> Result<(), ServiceError> {
        if is_blank(&draft.serial_number) {
            return Err(ValidationError::SerialNumberRequired.into());
        }
        if is_blank(&draft.make) {
            return Err(ValidationError::MakeRequired.into());
        }
        if is_blank(&draft.model) {
            return Err(ValidationError::ModelRequired.into());
        }
        if draft.location.as_deref().is_some_and(is_blank) {
            return Err(ValidationError::LocationEmpty.into());
        }

        if let Some(existing) = self
            .store
            .find_equipment_by_serial(organization_id, &draft.serial_number)
            .await?
        {
            if Some(existing.id) != draft.id {
                return Err(ValidationError::SerialNumberExists.into());
            }
        }

        if let Some(status_id) = draft.status_id {
            if !self.store.is_enabled_status(status_id).await? {
                return Err(ValidationError::InvalidStatus.into());
            }
        }

        let today = Utc::now().date_naive();
        if let Some(warranty) = draft.warranty_expires {
            if warranty <= today {
                return Err(ValidationError::WarrantyNotInFuture.into());
            }
            if let Some(purchased) = draft.purchased_date {
                if warranty < purchased {
                    return Err(ValidationError::WarrantyBeforePurchase.into());
                }
            }
        }

        Ok(())
    }

    pub async fn get(&self, organization_id: Uuid, id: Uuid) -> Result<Equipment, ServiceError> {
        let equipment = self
            .store
            .find_equipment_by_id(id)
            .await?
            .ok_or(ServiceError::NotFound)?;
        authorize_access(organization_id, &equipment)?;
        Ok(equipment)
    }

    pub async fn list(
        &self,
        organization_id: Uuid,
        filter: &EquipmentFilter,
    ) -> Result<Vec<Equipment>, ServiceError> {
        Ok(self
            .store
            .find_equipment_by_org(organization_id, filter)
            .await?)
    }

    pub async fn count(&self, organization_id: Uuid) -> Result<i64, ServiceError> {
        Ok(self.store.count_equipment_by_org(organization_id).await?)
    }

    pub async fn create(
        &self,
        organization_id: Uuid,
        created_by: Uuid,
        new: NewEquipment,
    ) -> Result<Equipment, ServiceError> {
        self.validate(organization_id, &EquipmentDraft::from(&new))
            .await?;

        let status_id = match new.status_id.filter(|id| *id != 0) {
            Some(id) => id,
            None => self.default_status().await?,
        };

        let now = Utc::now();
        let equipment = Equipment {
            id: Uuid::new_v4(),
            organization_id,
            serial_number: new.serial_number,
            make: new.make,
            model: new.model,
            location: new.location,
            status_id,
            owner_id: new.owner_id,
            notes: new.notes,
            purchased_date: new.purchased_date,
            warranty_expires: new.warranty_expires,
            created_by,
            updated_by: created_by,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        self.store
            .create_equipment(&equipment)
            .await
            .map_err(serial_conflict)?;

        tracing::info!(
            equipment_id = %equipment.id,
            %organization_id,
            "Equipment created"
        );
        Ok(equipment)
    }

    /// Applies the whitelisted patch after validating the merged record.
    pub async fn update(
        &self,
        organization_id: Uuid,
        id: Uuid,
        mut patch: EquipmentPatch,
        updated_by: Uuid,
    ) -> Result<Equipment, ServiceError> {
        let current = self.get(organization_id, id).await?;

        if patch.status_id == Some(0) {
            patch.status_id = Some(self.default_status().await?);
        }

        if patch.is_empty() {
            return Ok(current);
        }

        let mut merged = current.clone();
        merged.apply(&patch);
        self.validate(organization_id, &EquipmentDraft::from(&merged))
            .await?;

        let updated = self
            .store
            .update_equipment(id, &patch, updated_by)
            .await
            .map_err(serial_conflict)?;

        tracing::info!(equipment_id = %id, %organization_id, "Equipment updated");
        Ok(updated)
    }

    pub async fn delete(
        &self,
        organization_id: Uuid,
        id: Uuid,
        deleted_by: Uuid,
    ) -> Result<(), ServiceError> {
        self.get(organization_id, id).await?;
        self.store.soft_delete_equipment(id, deleted_by).await?;

        tracing::info!(equipment_id = %id, %organization_id, "Equipment soft-deleted");
        Ok(())
    }

    async fn default_status(&self) -> Result<i16, ServiceError> {
        self.store.first_enabled_status().await?.ok_or_else(|| {
            ServiceError::Internal(anyhow::anyhow!("No enabled equipment status configured"))
        })
    }
}

/// The store's unique index backs the advisory serial check.
fn serial_conflict(err: StoreError) -> ServiceError {
    match err {
        StoreError::UniqueViolation(_) => ValidationError::SerialNumberExists.into(),
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::MemoryStore;
    use chrono::{Duration, NaiveDate};

    fn service() -> EquipmentService {
        EquipmentService::new(Arc::new(MemoryStore::new()))
    }

    fn new_equipment(serial: &str) -> NewEquipment {
        NewEquipment {
            serial_number: serial.to_string(),
            make: "Hilti".to_string(),
            model: "TE 30".to_string(),
            ..Default::default()
        }
    }

    fn future(days: i64) -> NaiveDate {
        Utc::now().date_naive() + Duration::days(days)
    }

    async fn rejected(service: &EquipmentService, org: Uuid, new: NewEquipment) -> ValidationError {
        match service.create(org, Uuid::new_v4(), new).await {
            Err(ServiceError::Validation(e)) => e,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn create_assigns_first_active_status() {
        let service = service();
        let created = service
            .create(Uuid::new_v4(), Uuid::new_v4(), new_equipment("SN-1"))
            .await
            .unwrap();
        assert_eq!(created.status_id, 1);
    }

    #[tokio::test]
    async fn required_fields_short_circuit_in_order() {
        let service = service();
        let org = Uuid::new_v4();

        let mut new = new_equipment(" ");
        new.make = String::new();
        assert_eq!(
            rejected(&service, org, new).await,
            ValidationError::SerialNumberRequired
        );

        let mut new = new_equipment("SN-1");
        new.make = String::new();
        new.model = String::new();
        assert_eq!(rejected(&service, org, new).await, ValidationError::MakeRequired);

        let mut new = new_equipment("SN-1");
        new.model = "  ".into();
        assert_eq!(rejected(&service, org, new).await, ValidationError::ModelRequired);

        let mut new = new_equipment("SN-1");
        new.location = Some(String::new());
        assert_eq!(rejected(&service, org, new).await, ValidationError::LocationEmpty);
    }

    #[tokio::test]
    async fn duplicate_serial_is_per_organization() {
        let service = service();
        let org = Uuid::new_v4();
        service
            .create(org, Uuid::new_v4(), new_equipment("SN-1"))
            .await
            .unwrap();

        assert_eq!(
            rejected(&service, org, new_equipment("SN-1")).await,
            ValidationError::SerialNumberExists
        );
        service
            .create(Uuid::new_v4(), Uuid::new_v4(), new_equipment("SN-1"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn status_must_be_enabled() {
        let service = service();
        let mut new = new_equipment("SN-1");
        new.status_id = Some(4);
        assert_eq!(
            rejected(&service, Uuid::new_v4(), new).await,
            ValidationError::InvalidStatus
        );
    }

    #[tokio::test]
    async fn warranty_rules() {
        let service = service();
        let org = Uuid::new_v4();

        let mut past = new_equipment("SN-1");
        past.warranty_expires = Some(Utc::now().date_naive() - Duration::days(1));
        assert_eq!(
            rejected(&service, org, past).await,
            ValidationError::WarrantyNotInFuture
        );

        let mut before_purchase = new_equipment("SN-1");
        before_purchase.purchased_date = Some(future(30));
        before_purchase.warranty_expires = Some(future(10));
        assert_eq!(
            rejected(&service, org, before_purchase).await,
            ValidationError::WarrantyBeforePurchase
        );

        let mut ok = new_equipment("SN-1");
        ok.purchased_date = Some(future(-365));
        ok.warranty_expires = Some(future(365));
        service.create(org, Uuid::new_v4(), ok).await.unwrap();
    }

    #[tokio::test]
    async fn foreign_records_are_not_found() {
        let service = service();
        let owner_org = Uuid::new_v4();
        let other_org = Uuid::new_v4();
        let created = service
            .create(owner_org, Uuid::new_v4(), new_equipment("SN-1"))
            .await
            .unwrap();

        assert!(matches!(
            service.get(other_org, created.id).await,
            Err(ServiceError::NotFound)
        ));
        let patch = EquipmentPatch {
            make: Some("Makita".into()),
            ..Default::default()
        };
        assert!(matches!(
            service.update(other_org, created.id, patch, Uuid::new_v4()).await,
            Err(ServiceError::NotFound)
        ));
        assert!(matches!(
            service.delete(other_org, created.id, Uuid::new_v4()).await,
            Err(ServiceError::NotFound)
        ));
        assert_eq!(service.get(owner_org, created.id).await.unwrap().make, "Hilti");
    }

    #[tokio::test]
    async fn update_validates_merged_record() {
        let service = service();
        let org = Uuid::new_v4();
        let user = Uuid::new_v4();
        let created = service.create(org, user, new_equipment("SN-1")).await.unwrap();

        let patch = EquipmentPatch {
            make: Some(String::new()),
            ..Default::default()
        };
        assert!(matches!(
            service.update(org, created.id, patch, user).await,
            Err(ServiceError::Validation(ValidationError::MakeRequired))
        ));

        let patch = EquipmentPatch {
            location: Some(Some("Yard 3".into())),
            status_id: Some(2),
            ..Default::default()
        };
        let updated = service.update(org, created.id, patch, user).await.unwrap();
        assert_eq!(updated.location.as_deref(), Some("Yard 3"));
        assert_eq!(updated.status_id, 2);
        assert_eq!(updated.serial_number, "SN-1");
    }

    #[tokio::test]
    async fn soft_deleted_records_disappear() {
        let service = service();
        let org = Uuid::new_v4();
        let user = Uuid::new_v4();
        let created = service.create(org, user, new_equipment("SN-1")).await.unwrap();

        service.delete(org, created.id, user).await.unwrap();

        assert!(matches!(
            service.get(org, created.id).await,
            Err(ServiceError::NotFound)
        ));
        assert_eq!(service.count(org).await.unwrap(), 0);
        // Serial is free again once the record is gone.
        service.create(org, user, new_equipment("SN-1")).await.unwrap();
    }
}
