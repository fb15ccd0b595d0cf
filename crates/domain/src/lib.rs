//! Business rules for the user management service.
//!
//! This crate provides:
//! - Field validation shared by every command
//! - The authenticated [`Actor`] and its [`Role`]
//! - Services for sellers, shopkeepers, assignments, visits, incidents and
//!   inventories, generic over any [`store::UserStore`]
//! - Nearest-neighbour route planning for a seller's visits
//! - The [`ZoneDirectory`] and [`ProductCatalog`] seams to the geo and
//!   product services

pub mod actor;
pub mod assignment;
pub mod error;
pub mod incident;
pub mod inventory;
pub mod products;
pub mod route;
pub mod seller;
pub mod shopkeeper;
pub mod validation;
pub mod visit;
pub mod zones;

pub use actor::{Actor, Role};
pub use assignment::{
    AssignShopkeeper, AssignmentHistory, AssignmentService, AssignmentView,
    DEFAULT_MAX_SHOPKEEPERS_PER_SELLER, Reassign,
};
pub use error::{DomainError, ValidationError};
pub use incident::{IncidentService, IncidentView, RecordIncident, UpdateIncident};
pub use inventory::{
    AddInventoryItem, InventoryDetail, InventoryService, InventorySummary, StockAdjustment,
    StockAdjustmentResult, StockStatus, UpdateInventoryItem,
};
pub use products::{CatalogError, InMemoryProductCatalog, Product, ProductCatalog};
pub use route::{
    AlgorithmComparison, Coordinates, OptimizedRoute, RouteService, RouteStatistics, RouteStop,
};
pub use seller::{ChangeZone, CreateSeller, SellerService, SellerSummary, UpdateSeller};
pub use shopkeeper::{CreateShopkeeper, ShopkeeperService, ShopkeeperView, UpdateShopkeeper};
pub use visit::{
    CancelVisit, LowStockProduct, RestockSummary, ScheduleVisit, ShopkeeperLowStock, UpdateVisit,
    VisitFilter, VisitList, VisitService, VisitTransition, VisitView,
};
pub use zones::{InMemoryZoneDirectory, Zone, ZoneDirectory, ZoneError};
