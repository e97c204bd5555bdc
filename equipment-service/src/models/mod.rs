pub mod equipment;
pub mod role;
pub mod user;

pub use equipment::{
    Equipment, EquipmentDraft, EquipmentFilter, EquipmentPatch, EquipmentStatus, NewEquipment,
};
pub use role::Role;
pub use user::{normalize_email, User, UserStatus};
