use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::{double_option, empty_string_as_none};
use crate::models::{Equipment, EquipmentFilter, EquipmentPatch, NewEquipment};

/// Missing required strings default to empty so the rules engine reports
/// them instead of the JSON decoder.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateEquipmentRequest {
    #[serde(default)]
    #[validate(length(max = 128))]
    #[schema(example = "SN-000123")]
    pub serial_number: String,

    #[serde(default)]
    #[validate(length(max = 128))]
    #[schema(example = "Caterpillar")]
    pub make: String,

    #[serde(default)]
    #[validate(length(max = 128))]
    #[schema(example = "320 GC")]
    pub model: String,

    #[validate(length(max = 256))]
    pub location: Option<String>,

    #[schema(example = 1)]
    pub status_id: Option<i16>,

    pub owner_id: Option<Uuid>,

    #[validate(length(max = 4000))]
    pub notes: Option<String>,

    #[schema(value_type = Option<String>, format = Date, example = "2024-03-01")]
    pub purchased_date: Option<NaiveDate>,

    #[schema(value_type = Option<String>, format = Date, example = "2027-03-01")]
    pub warranty_expires: Option<NaiveDate>,
}

impl From<CreateEquipmentRequest> for NewEquipment {
    fn from(req: CreateEquipmentRequest) -> Self {
        Self {
            serial_number: req.serial_number,
            make: req.make,
            model: req.model,
            location: req.location,
            status_id: req.status_id,
            owner_id: req.owner_id,
            notes: req.notes,
            purchased_date: req.purchased_date,
            warranty_expires: req.warranty_expires,
        }
    }
}

/// Only the mutable fields are declared; anything else in the body
/// (serial number, organization, audit fields) is dropped by the decoder.
/// `null` clears a nullable field, an absent key leaves it unchanged.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateEquipmentRequest {
    #[validate(length(max = 128))]
    pub make: Option<String>,

    #[validate(length(max = 128))]
    pub model: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub location: Option<Option<String>>,

    #[schema(example = 2)]
    pub status_id: Option<i16>,

    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>, format = Uuid)]
    pub owner_id: Option<Option<Uuid>>,

    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub notes: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>, format = Date)]
    pub purchased_date: Option<Option<NaiveDate>>,

    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>, format = Date)]
    pub warranty_expires: Option<Option<NaiveDate>>,
}

impl From<UpdateEquipmentRequest> for EquipmentPatch {
    fn from(req: UpdateEquipmentRequest) -> Self {
        Self {
            make: req.make,
            model: req.model,
            location: req.location,
            status_id: req.status_id,
            owner_id: req.owner_id,
            notes: req.notes,
            purchased_date: req.purchased_date,
            warranty_expires: req.warranty_expires,
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListEquipmentQuery {
    /// Exact status id
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub status_id: Option<i16>,
    /// Case-insensitive substring of the location
    pub location: Option<String>,
    /// Case-insensitive substring of serial number, make or model
    pub search: Option<String>,
}

impl From<ListEquipmentQuery> for EquipmentFilter {
    fn from(query: ListEquipmentQuery) -> Self {
        Self {
            status_id: query.status_id,
            location: query.location.filter(|s| !s.trim().is_empty()),
            search: query.search.filter(|s| !s.trim().is_empty()),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EquipmentListResponse {
    pub equipment: Vec<Equipment>,
    #[schema(example = 1)]
    pub total: i64,
}
