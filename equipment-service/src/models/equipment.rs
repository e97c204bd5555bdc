//! Equipment model - tracked assets owned by exactly one organization.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Equipment entity (organization-scoped, soft-deletable).
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Equipment {
    pub id: Uuid,
    pub organization_id: Uuid,
    #[schema(example = "SN-000123")]
    pub serial_number: String,
    #[schema(example = "Caterpillar")]
    pub make: String,
    #[schema(example = "320 GC")]
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[schema(example = 1)]
    pub status_id: i16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, example = "2024-03-01")]
    pub purchased_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, example = "2027-03-01")]
    pub warranty_expires: Option<NaiveDate>,
    pub created_by: Uuid,
    pub updated_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Equipment {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Applies the whitelisted fields of `patch` in place.
    pub fn apply(&mut self, patch: &EquipmentPatch) {
        if let Some(make) = &patch.make {
            self.make = make.clone();
        }
        if let Some(model) = &patch.model {
            self.model = model.clone();
        }
        if let Some(location) = &patch.location {
            self.location = location.clone();
        }
        if let Some(status_id) = patch.status_id {
            self.status_id = status_id;
        }
        if let Some(owner_id) = patch.owner_id {
            self.owner_id = owner_id;
        }
        if let Some(notes) = &patch.notes {
            self.notes = notes.clone();
        }
        if let Some(purchased_date) = patch.purchased_date {
            self.purchased_date = purchased_date;
        }
        if let Some(warranty_expires) = patch.warranty_expires {
            self.warranty_expires = warranty_expires;
        }
    }
}

/// Row of the status lookup table. Only `active` statuses are assignable.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct EquipmentStatus {
    pub id: i16,
    #[schema(example = "in_service")]
    pub code: String,
    #[schema(example = "In service")]
    pub label: String,
    pub status: String,
}

impl EquipmentStatus {
    pub fn is_enabled(&self) -> bool {
        self.status == "active"
    }
}

/// Input of a create operation, after request parsing.
#[derive(Debug, Clone, Default)]
pub struct NewEquipment {
    pub serial_number: String,
    pub make: String,
    pub model: String,
    pub location: Option<String>,
    /// `None` (or `Some(0)`) selects the default status.
    pub status_id: Option<i16>,
    pub owner_id: Option<Uuid>,
    pub notes: Option<String>,
    pub purchased_date: Option<NaiveDate>,
    pub warranty_expires: Option<NaiveDate>,
}

/// Partial update restricted to the mutable fields of a record.
///
/// Outer `None` means "leave unchanged"; for nullable columns `Some(None)`
/// clears the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EquipmentPatch {
    pub make: Option<String>,
    pub model: Option<String>,
    pub location: Option<Option<String>>,
    pub status_id: Option<i16>,
    pub owner_id: Option<Option<Uuid>>,
    pub notes: Option<Option<String>>,
    pub purchased_date: Option<Option<NaiveDate>>,
    pub warranty_expires: Option<Option<NaiveDate>>,
}

impl EquipmentPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// The fields the validation rules look at, for both create and update.
#[derive(Debug, Clone)]
pub struct EquipmentDraft {
    /// Id of the record being updated; `None` on create.
    pub id: Option<Uuid>,
    pub serial_number: String,
    pub make: String,
    pub model: String,
    pub location: Option<String>,
    pub status_id: Option<i16>,
    pub purchased_date: Option<NaiveDate>,
    pub warranty_expires: Option<NaiveDate>,
}

impl From<&NewEquipment> for EquipmentDraft {
    fn from(new: &NewEquipment) -> Self {
        Self {
            id: None,
            serial_number: new.serial_number.clone(),
            make: new.make.clone(),
            model: new.model.clone(),
            location: new.location.clone(),
            status_id: new.status_id.filter(|id| *id != 0),
            purchased_date: new.purchased_date,
            warranty_expires: new.warranty_expires,
        }
    }
}

impl From<&Equipment> for EquipmentDraft {
    fn from(equipment: &Equipment) -> Self {
        Self {
            id: Some(equipment.id),
            serial_number: equipment.serial_number.clone(),
            make: equipment.make.clone(),
            model: equipment.model.clone(),
            location: equipment.location.clone(),
            status_id: Some(equipment.status_id).filter(|id| *id != 0),
            purchased_date: equipment.purchased_date,
            warranty_expires: equipment.warranty_expires,
        }
    }
}

/// List filters; empty strings are treated as absent.
#[derive(Debug, Clone, Default)]
pub struct EquipmentFilter {
    pub status_id: Option<i16>,
    pub location: Option<String>,
    pub search: Option<String>,
}

impl EquipmentFilter {
    pub fn matches(&self, equipment: &Equipment) -> bool {
        if let Some(status_id) = self.status_id {
            if equipment.status_id != status_id {
                return false;
            }
        }
        if let Some(location) = self.location.as_deref().filter(|l| !l.is_empty()) {
            let needle = location.to_lowercase();
            let found = equipment
                .location
                .as_deref()
                .map(|l| l.to_lowercase().contains(&needle))
                .unwrap_or(false);
            if !found {
                return false;
            }
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            let needle = search.to_lowercase();
            let hit = [&equipment.serial_number, &equipment.make, &equipment.model]
                .iter()
                .any(|field| field.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        true
    }
}
