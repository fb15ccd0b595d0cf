//! Row types persisted by the store, plus the `New*` payloads used to insert them.

use chrono::{DateTime, NaiveDate, Utc};
use common::{
    AssignmentId, IncidentId, IncidentKind, InventoryId, ProductId, SellerId, ShopkeeperId, UserId,
    VisitId, VisitStatus, ZoneId,
};
use serde::{Deserialize, Serialize};

/// Default visit reason when the seller does not give one.
pub const DEFAULT_VISIT_REASON: &str = "reabastecimiento";

/// Stock thresholds given to an inventory row when the caller sends none.
pub const DEFAULT_MIN_STOCK: f64 = 10.0;
pub const DEFAULT_MAX_STOCK: f64 = 100.0;

/// A field sales representative working one zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Seller {
    pub id: SellerId,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub zone_id: ZoneId,
    pub user_id: Option<UserId>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewSeller {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub zone_id: ZoneId,
    pub user_id: Option<UserId>,
}

/// A store and its location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shopkeeper {
    pub id: ShopkeeperId,
    pub name: String,
    pub business_name: Option<String>,
    pub address: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewShopkeeper {
    pub name: String,
    pub business_name: Option<String>,
    pub address: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

/// Link between a seller and a shopkeeper.
///
/// Rows are never deleted: unassigning flips `is_active` and stamps
/// `unassigned_at`, so the table doubles as the assignment history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: AssignmentId,
    pub seller_id: SellerId,
    pub shopkeeper_id: ShopkeeperId,
    pub assigned_at: DateTime<Utc>,
    pub unassigned_at: Option<DateTime<Utc>>,
    pub assigned_by: Option<UserId>,
    pub unassigned_by: Option<UserId>,
    pub notes: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewAssignment {
    pub seller_id: SellerId,
    pub shopkeeper_id: ShopkeeperId,
    pub assigned_by: Option<UserId>,
    pub notes: Option<String>,
}

/// Closing data recorded when an assignment ends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Unassignment {
    pub unassigned_by: Option<UserId>,
    pub at: DateTime<Utc>,
}

/// A visit a seller scheduled to one of their shopkeepers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visit {
    pub id: VisitId,
    pub seller_id: SellerId,
    pub shopkeeper_id: ShopkeeperId,
    pub scheduled_date: DateTime<Utc>,
    pub status: VisitStatus,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancelled_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewVisit {
    pub seller_id: SellerId,
    pub shopkeeper_id: ShopkeeperId,
    pub scheduled_date: DateTime<Utc>,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

/// An incident recorded against a seller, optionally tied to a visit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SellerIncident {
    pub id: IncidentId,
    pub seller_id: SellerId,
    pub shopkeeper_id: Option<ShopkeeperId>,
    pub visit_id: Option<VisitId>,
    #[serde(rename = "type")]
    pub kind: IncidentKind,
    pub description: Option<String>,
    pub incident_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewIncident {
    pub seller_id: SellerId,
    pub shopkeeper_id: Option<ShopkeeperId>,
    pub visit_id: Option<VisitId>,
    pub kind: IncidentKind,
    pub description: Option<String>,
    pub incident_date: NaiveDate,
}

/// A product a shopkeeper carries, with its price and stock thresholds.
///
/// The product itself lives in the catalog service; the `product_*` columns
/// cache what the catalog said when the row was created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: InventoryId,
    pub shopkeeper_id: ShopkeeperId,
    pub product_id: ProductId,
    pub unit_price: f64,
    pub current_stock: f64,
    pub min_stock: f64,
    pub max_stock: f64,
    pub product_name: Option<String>,
    pub product_description: Option<String>,
    pub product_category: Option<String>,
    pub product_brand: Option<String>,
    pub is_validated: bool,
    pub validated_by: Option<UserId>,
    pub validated_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    /// Last time the stock level changed.
    pub last_updated: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InventoryItem {
    pub fn is_low_stock(&self) -> bool {
        self.current_stock < self.min_stock
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewInventoryItem {
    pub shopkeeper_id: ShopkeeperId,
    pub product_id: ProductId,
    pub unit_price: f64,
    pub current_stock: f64,
    pub min_stock: f64,
    pub max_stock: f64,
    pub product_name: Option<String>,
    pub product_description: Option<String>,
    pub product_category: Option<String>,
    pub product_brand: Option<String>,
    pub validated_by: Option<UserId>,
    pub validated_at: Option<DateTime<Utc>>,
}
