//! Shared identifiers and enums used across the user management crates.

pub mod status;
pub mod types;

pub use status::{IncidentKind, ParseLabelError, VisitStatus};
pub use types::{
    AssignmentId, IncidentId, InventoryId, ProductId, SellerId, ShopkeeperId, UserId, VisitId,
    ZoneId,
};
