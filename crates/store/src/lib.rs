//! Persistence for the user service: sellers, shopkeepers, the assignment
//! history between them, scheduled visits, seller incidents and each
//! shopkeeper's product inventory.
//!
//! Two backends implement [`UserStore`]: [`InMemoryUserStore`] for tests and
//! local runs, and [`PostgresUserStore`] for production.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod records;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryUserStore;
pub use postgres::PostgresUserStore;
pub use query::{
    AssignmentQuery, IncidentQuery, InventoryQuery, Page, SellerQuery, ShopkeeperQuery,
    VisitCounts, VisitQuery,
};
pub use records::{
    Assignment, DEFAULT_MAX_STOCK, DEFAULT_MIN_STOCK, DEFAULT_VISIT_REASON, InventoryItem,
    NewAssignment, NewIncident, NewInventoryItem, NewSeller, NewShopkeeper, NewVisit, Seller,
    SellerIncident, Shopkeeper, Unassignment, Visit,
};
pub use store::{UserStore, UserStoreExt};
