use async_trait::async_trait;
use common::{
    AssignmentId, IncidentId, InventoryId, ProductId, SellerId, ShopkeeperId, UserId, VisitId,
};

use crate::{
    Assignment, AssignmentQuery, IncidentQuery, InventoryItem, InventoryQuery, NewAssignment,
    NewIncident, NewInventoryItem, NewSeller, NewShopkeeper, NewVisit, Result, Seller,
    SellerIncident, SellerQuery, Shopkeeper, ShopkeeperQuery, StoreError, Unassignment, Visit,
    VisitCounts, VisitQuery,
};

/// Core trait for user store implementations.
///
/// A store owns the six tables of the service and enforces the uniqueness
/// rules that must hold under concurrent writers: seller emails (and
/// shopkeeper emails when present) are unique, a shopkeeper has at most one
/// active assignment, and a shopkeeper lists each product once. All
/// implementations must be thread-safe.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Checks that the backing storage answers.
    async fn ping(&self) -> Result<()>;

    // -- Sellers --

    /// Inserts a seller, returning it with its assigned id and timestamps.
    ///
    /// Fails with `UniqueViolation` if the email is taken.
    async fn insert_seller(&self, seller: NewSeller) -> Result<Seller>;

    async fn get_seller(&self, id: SellerId) -> Result<Option<Seller>>;

    async fn find_seller_by_email(&self, email: &str) -> Result<Option<Seller>>;

    async fn find_seller_by_user(&self, user_id: UserId) -> Result<Option<Seller>>;

    /// Lists sellers ordered by id.
    async fn list_sellers(&self, query: &SellerQuery) -> Result<Vec<Seller>>;

    /// Persists every mutable column of `seller` and refreshes `updated_at`.
    async fn update_seller(&self, seller: &Seller) -> Result<Seller>;

    // -- Shopkeepers --

    /// Inserts a shopkeeper. Fails with `UniqueViolation` on a taken email.
    async fn insert_shopkeeper(&self, shopkeeper: NewShopkeeper) -> Result<Shopkeeper>;

    async fn get_shopkeeper(&self, id: ShopkeeperId) -> Result<Option<Shopkeeper>>;

    async fn find_shopkeeper_by_email(&self, email: &str) -> Result<Option<Shopkeeper>>;

    /// Lists shopkeepers ordered by id.
    async fn list_shopkeepers(&self, query: &ShopkeeperQuery) -> Result<Vec<Shopkeeper>>;

    /// Lists active shopkeepers that have no active assignment, ordered by id.
    async fn list_unassigned_shopkeepers(&self) -> Result<Vec<Shopkeeper>>;

    /// Persists every mutable column of `shopkeeper` and refreshes `updated_at`.
    async fn update_shopkeeper(&self, shopkeeper: &Shopkeeper) -> Result<Shopkeeper>;

    // -- Assignments --

    /// Creates an active assignment.
    ///
    /// Fails with `UniqueViolation` if the shopkeeper already has one.
    async fn insert_assignment(&self, assignment: NewAssignment) -> Result<Assignment>;

    async fn get_assignment(&self, id: AssignmentId) -> Result<Option<Assignment>>;

    async fn active_assignment_for(
        &self,
        shopkeeper_id: ShopkeeperId,
    ) -> Result<Option<Assignment>>;

    async fn count_active_assignments(&self, seller_id: SellerId) -> Result<i64>;

    /// Lists assignments ordered by id.
    async fn list_assignments(&self, query: &AssignmentQuery) -> Result<Vec<Assignment>>;

    /// Every assignment a shopkeeper ever had, newest `assigned_at` first.
    async fn assignment_history(&self, shopkeeper_id: ShopkeeperId) -> Result<Vec<Assignment>>;

    /// Deactivates an assignment. Ending an inactive assignment is a no-op.
    async fn end_assignment(&self, id: AssignmentId, end: Unassignment) -> Result<Assignment>;

    /// Ends `current` and creates `next` atomically.
    async fn reassign(
        &self,
        current: AssignmentId,
        end: Unassignment,
        next: NewAssignment,
    ) -> Result<Assignment>;

    // -- Visits --

    async fn insert_visit(&self, visit: NewVisit) -> Result<Visit>;

    async fn get_visit(&self, id: VisitId) -> Result<Option<Visit>>;

    /// Persists every mutable column of `visit` and refreshes `updated_at`.
    async fn update_visit(&self, visit: &Visit) -> Result<Visit>;

    /// Lists visits ordered by `scheduled_date` ascending.
    async fn list_visits(&self, query: &VisitQuery) -> Result<Vec<Visit>>;

    /// Totals per status for the query's filters; pagination is ignored.
    async fn count_visits(&self, query: &VisitQuery) -> Result<VisitCounts>;

    // -- Incidents --

    async fn insert_incident(&self, incident: NewIncident) -> Result<SellerIncident>;

    async fn get_incident(&self, id: IncidentId) -> Result<Option<SellerIncident>>;

    /// Persists every mutable column of `incident` and refreshes `updated_at`.
    async fn update_incident(&self, incident: &SellerIncident) -> Result<SellerIncident>;

    /// Deletes an incident. Returns false if it did not exist.
    async fn delete_incident(&self, id: IncidentId) -> Result<bool>;

    /// Lists incidents newest first.
    async fn list_incidents(&self, query: &IncidentQuery) -> Result<Vec<SellerIncident>>;

    // -- Inventory --

    /// Inserts an inventory row.
    ///
    /// Fails with `UniqueViolation` if the shopkeeper already lists the product.
    async fn insert_inventory_item(&self, item: NewInventoryItem) -> Result<InventoryItem>;

    async fn get_inventory_item(&self, id: InventoryId) -> Result<Option<InventoryItem>>;

    /// Finds the row for a product in a shopkeeper's inventory, active or not.
    async fn find_inventory_item(
        &self,
        shopkeeper_id: ShopkeeperId,
        product_id: ProductId,
    ) -> Result<Option<InventoryItem>>;

    /// Persists every mutable column of `item` and refreshes `updated_at`.
    async fn update_inventory_item(&self, item: &InventoryItem) -> Result<InventoryItem>;

    /// Deletes an inventory row. Returns false if it did not exist.
    async fn delete_inventory_item(&self, id: InventoryId) -> Result<bool>;

    /// Lists inventory rows ordered by id.
    async fn list_inventory(&self, query: &InventoryQuery) -> Result<Vec<InventoryItem>>;
}

/// Extension trait providing convenience methods for user stores.
#[async_trait]
pub trait UserStoreExt: UserStore {
    /// Loads a seller or fails with `NotFound`.
    async fn require_seller(&self, id: SellerId) -> Result<Seller> {
        self.get_seller(id)
            .await?
            .ok_or_else(|| StoreError::not_found("seller", id))
    }

    /// Loads a shopkeeper or fails with `NotFound`.
    async fn require_shopkeeper(&self, id: ShopkeeperId) -> Result<Shopkeeper> {
        self.get_shopkeeper(id)
            .await?
            .ok_or_else(|| StoreError::not_found("shopkeeper", id))
    }

    /// Loads a visit or fails with `NotFound`.
    async fn require_visit(&self, id: VisitId) -> Result<Visit> {
        self.get_visit(id)
            .await?
            .ok_or_else(|| StoreError::not_found("visit", id))
    }

    /// Loads an inventory row or fails with `NotFound`.
    async fn require_inventory_item(&self, id: InventoryId) -> Result<InventoryItem> {
        self.get_inventory_item(id)
            .await?
            .ok_or_else(|| StoreError::not_found("inventory item", id))
    }

    /// Every shopkeeper the seller is actively assigned, active or not, ordered by id.
    async fn assigned_shopkeepers(&self, seller_id: SellerId) -> Result<Vec<Shopkeeper>> {
        self.list_shopkeepers(
            &ShopkeeperQuery::new()
                .assigned_to(seller_id)
                .page(crate::Page::all()),
        )
        .await
    }

    /// Returns true if the shopkeeper is actively assigned to the seller.
    async fn is_assigned(&self, seller_id: SellerId, shopkeeper_id: ShopkeeperId) -> Result<bool> {
        Ok(self
            .active_assignment_for(shopkeeper_id)
            .await?
            .is_some_and(|a| a.seller_id == seller_id))
    }
}

// Blanket implementation for all UserStore implementations
impl<T: UserStore + ?Sized> UserStoreExt for T {}
