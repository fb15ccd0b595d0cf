use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{
    AssignmentId, IncidentId, InventoryId, ProductId, SellerId, ShopkeeperId, UserId, VisitId,
};
use tokio::sync::RwLock;

use crate::{
    Assignment, AssignmentQuery, IncidentQuery, InventoryItem, InventoryQuery, NewAssignment,
    NewIncident, NewInventoryItem, NewSeller, NewShopkeeper, NewVisit, Result, Seller,
    SellerIncident, SellerQuery, Shopkeeper, ShopkeeperQuery, StoreError, Unassignment, Visit,
    VisitCounts, VisitQuery, store::UserStore,
};

#[derive(Debug, Default)]
struct Tables {
    sellers: BTreeMap<SellerId, Seller>,
    shopkeepers: BTreeMap<ShopkeeperId, Shopkeeper>,
    assignments: BTreeMap<AssignmentId, Assignment>,
    visits: BTreeMap<VisitId, Visit>,
    incidents: BTreeMap<IncidentId, SellerIncident>,
    inventory: BTreeMap<InventoryId, InventoryItem>,
    next_id: i64,
}

impl Tables {
    /// Ids are drawn from one sequence; callers only rely on uniqueness and
    /// monotonicity within a table.
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn active_assignment(&self, shopkeeper_id: ShopkeeperId) -> Option<&Assignment> {
        self.assignments
            .values()
            .find(|a| a.shopkeeper_id == shopkeeper_id && a.is_active)
    }

    fn seller_email_taken(&self, email: &str, except: Option<SellerId>) -> bool {
        self.sellers
            .values()
            .any(|s| s.email == email && Some(s.id) != except)
    }

    fn shopkeeper_email_taken(&self, email: &str, except: Option<ShopkeeperId>) -> bool {
        self.shopkeepers
            .values()
            .any(|s| s.email.as_deref() == Some(email) && Some(s.id) != except)
    }

    fn create_assignment(&mut self, new: NewAssignment) -> Result<Assignment> {
        if self.active_assignment(new.shopkeeper_id).is_some() {
            return Err(StoreError::UniqueViolation {
                entity: "assignment",
                field: "shopkeeper_id",
                value: new.shopkeeper_id.to_string(),
            });
        }

        let now = Utc::now();
        let assignment = Assignment {
            id: AssignmentId::new(self.next_id()),
            seller_id: new.seller_id,
            shopkeeper_id: new.shopkeeper_id,
            assigned_at: now,
            unassigned_at: None,
            assigned_by: new.assigned_by,
            unassigned_by: None,
            notes: new.notes,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.assignments.insert(assignment.id, assignment.clone());
        Ok(assignment)
    }

    fn close_assignment(&mut self, id: AssignmentId, end: Unassignment) -> Result<Assignment> {
        let assignment = self
            .assignments
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("assignment", id))?;

        if assignment.is_active {
            assignment.is_active = false;
            assignment.unassigned_at = Some(end.at);
            assignment.unassigned_by = end.unassigned_by;
            assignment.updated_at = end.at;
        }
        Ok(assignment.clone())
    }

    fn visit_matches(visit: &Visit, query: &VisitQuery) -> bool {
        query.seller_id.is_none_or(|id| visit.seller_id == id)
            && query.shopkeeper_id.is_none_or(|id| visit.shopkeeper_id == id)
            && query.status.is_none_or(|s| visit.status == s)
            && query.from.is_none_or(|from| visit.scheduled_date >= from)
            && query.to.is_none_or(|to| visit.scheduled_date <= to)
    }
}

/// In-memory user store.
///
/// Used when no database is configured and throughout the test suites. All
/// tables sit behind one lock, which makes `reassign` trivially atomic.
#[derive(Clone, Default)]
pub struct InMemoryUserStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryUserStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored sellers.
    pub async fn seller_count(&self) -> usize {
        self.tables.read().await.sellers.len()
    }

    /// Clears all tables.
    pub async fn clear(&self) {
        *self.tables.write().await = Tables::default();
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn ping(&self) -> Result<()> {
        let _tables = self.tables.read().await;
        Ok(())
    }

    async fn insert_seller(&self, new: NewSeller) -> Result<Seller> {
        let mut tables = self.tables.write().await;
        if tables.seller_email_taken(&new.email, None) {
            return Err(StoreError::UniqueViolation {
                entity: "seller",
                field: "email",
                value: new.email,
            });
        }

        let now = Utc::now();
        let seller = Seller {
            id: SellerId::new(tables.next_id()),
            name: new.name,
            email: new.email,
            phone: new.phone,
            address: new.address,
            zone_id: new.zone_id,
            user_id: new.user_id,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        tables.sellers.insert(seller.id, seller.clone());
        Ok(seller)
    }

    async fn get_seller(&self, id: SellerId) -> Result<Option<Seller>> {
        Ok(self.tables.read().await.sellers.get(&id).cloned())
    }

    async fn find_seller_by_email(&self, email: &str) -> Result<Option<Seller>> {
        let tables = self.tables.read().await;
        Ok(tables.sellers.values().find(|s| s.email == email).cloned())
    }

    async fn find_seller_by_user(&self, user_id: UserId) -> Result<Option<Seller>> {
        let tables = self.tables.read().await;
        Ok(tables
            .sellers
            .values()
            .find(|s| s.user_id == Some(user_id))
            .cloned())
    }

    async fn list_sellers(&self, query: &SellerQuery) -> Result<Vec<Seller>> {
        let tables = self.tables.read().await;
        let matching = tables.sellers.values().filter(|s| {
            query.zone_id.is_none_or(|z| s.zone_id == z)
                && query.is_active.is_none_or(|a| s.is_active == a)
        });
        Ok(query.page.apply(matching.cloned()))
    }

    async fn update_seller(&self, seller: &Seller) -> Result<Seller> {
        let mut tables = self.tables.write().await;
        if !tables.sellers.contains_key(&seller.id) {
            return Err(StoreError::not_found("seller", seller.id));
        }
        if tables.seller_email_taken(&seller.email, Some(seller.id)) {
            return Err(StoreError::UniqueViolation {
                entity: "seller",
                field: "email",
                value: seller.email.clone(),
            });
        }

        let mut updated = seller.clone();
        updated.updated_at = Utc::now();
        tables.sellers.insert(updated.id, updated.clone());
        Ok(updated)
    }

    async fn insert_shopkeeper(&self, new: NewShopkeeper) -> Result<Shopkeeper> {
        let mut tables = self.tables.write().await;
        if let Some(email) = new.email.as_deref()
            && tables.shopkeeper_email_taken(email, None)
        {
            return Err(StoreError::UniqueViolation {
                entity: "shopkeeper",
                field: "email",
                value: email.to_string(),
            });
        }

        let now = Utc::now();
        let shopkeeper = Shopkeeper {
            id: ShopkeeperId::new(tables.next_id()),
            name: new.name,
            business_name: new.business_name,
            address: new.address,
            phone: new.phone,
            email: new.email,
            latitude: new.latitude,
            longitude: new.longitude,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        tables.shopkeepers.insert(shopkeeper.id, shopkeeper.clone());
        Ok(shopkeeper)
    }

    async fn get_shopkeeper(&self, id: ShopkeeperId) -> Result<Option<Shopkeeper>> {
        Ok(self.tables.read().await.shopkeepers.get(&id).cloned())
    }

    async fn find_shopkeeper_by_email(&self, email: &str) -> Result<Option<Shopkeeper>> {
        let tables = self.tables.read().await;
        Ok(tables
            .shopkeepers
            .values()
            .find(|s| s.email.as_deref() == Some(email))
            .cloned())
    }

    async fn list_shopkeepers(&self, query: &ShopkeeperQuery) -> Result<Vec<Shopkeeper>> {
        let tables = self.tables.read().await;
        let matching = tables.shopkeepers.values().filter(|s| {
            if query.is_active.is_some_and(|a| s.is_active != a) {
                return false;
            }
            let active = tables.active_assignment(s.id);
            if query.unassigned && active.is_some() {
                return false;
            }
            query
                .seller_id
                .is_none_or(|seller| active.is_some_and(|a| a.seller_id == seller))
        });
        Ok(query.page.apply(matching.cloned()))
    }

    async fn list_unassigned_shopkeepers(&self) -> Result<Vec<Shopkeeper>> {
        let tables = self.tables.read().await;
        Ok(tables
            .shopkeepers
            .values()
            .filter(|s| s.is_active && tables.active_assignment(s.id).is_none())
            .cloned()
            .collect())
    }

    async fn update_shopkeeper(&self, shopkeeper: &Shopkeeper) -> Result<Shopkeeper> {
        let mut tables = self.tables.write().await;
        if !tables.shopkeepers.contains_key(&shopkeeper.id) {
            return Err(StoreError::not_found("shopkeeper", shopkeeper.id));
        }
        if let Some(email) = shopkeeper.email.as_deref()
            && tables.shopkeeper_email_taken(email, Some(shopkeeper.id))
        {
            return Err(StoreError::UniqueViolation {
                entity: "shopkeeper",
                field: "email",
                value: email.to_string(),
            });
        }

        let mut updated = shopkeeper.clone();
        updated.updated_at = Utc::now();
        tables.shopkeepers.insert(updated.id, updated.clone());
        Ok(updated)
    }

    async fn insert_assignment(&self, new: NewAssignment) -> Result<Assignment> {
        self.tables.write().await.create_assignment(new)
    }

    async fn get_assignment(&self, id: AssignmentId) -> Result<Option<Assignment>> {
        Ok(self.tables.read().await.assignments.get(&id).cloned())
    }

    async fn active_assignment_for(
        &self,
        shopkeeper_id: ShopkeeperId,
    ) -> Result<Option<Assignment>> {
        Ok(self
            .tables
            .read()
            .await
            .active_assignment(shopkeeper_id)
            .cloned())
    }

    async fn count_active_assignments(&self, seller_id: SellerId) -> Result<i64> {
        let tables = self.tables.read().await;
        Ok(tables
            .assignments
            .values()
            .filter(|a| a.seller_id == seller_id && a.is_active)
            .count() as i64)
    }

    async fn list_assignments(&self, query: &AssignmentQuery) -> Result<Vec<Assignment>> {
        let tables = self.tables.read().await;
        let matching = tables.assignments.values().filter(|a| {
            query.is_active.is_none_or(|active| a.is_active == active)
                && query.seller_id.is_none_or(|s| a.seller_id == s)
                && query.shopkeeper_id.is_none_or(|s| a.shopkeeper_id == s)
        });
        Ok(query.page.apply(matching.cloned()))
    }

    async fn assignment_history(&self, shopkeeper_id: ShopkeeperId) -> Result<Vec<Assignment>> {
        let tables = self.tables.read().await;
        let mut history: Vec<_> = tables
            .assignments
            .values()
            .filter(|a| a.shopkeeper_id == shopkeeper_id)
            .cloned()
            .collect();
        history.sort_by(|a, b| {
            b.assigned_at
                .cmp(&a.assigned_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(history)
    }

    async fn end_assignment(&self, id: AssignmentId, end: Unassignment) -> Result<Assignment> {
        self.tables.write().await.close_assignment(id, end)
    }

    async fn reassign(
        &self,
        current: AssignmentId,
        end: Unassignment,
        next: NewAssignment,
    ) -> Result<Assignment> {
        let mut tables = self.tables.write().await;

        // Validate before touching anything so a failure leaves no partial write.
        let existing = tables
            .assignments
            .get(&current)
            .ok_or_else(|| StoreError::not_found("assignment", current))?;
        if let Some(active) = tables.active_assignment(next.shopkeeper_id)
            && active.id != existing.id
        {
            return Err(StoreError::UniqueViolation {
                entity: "assignment",
                field: "shopkeeper_id",
                value: next.shopkeeper_id.to_string(),
            });
        }

        tables.close_assignment(current, end)?;
        tables.create_assignment(next)
    }

    async fn insert_visit(&self, new: NewVisit) -> Result<Visit> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let visit = Visit {
            id: VisitId::new(tables.next_id()),
            seller_id: new.seller_id,
            shopkeeper_id: new.shopkeeper_id,
            scheduled_date: new.scheduled_date,
            status: Default::default(),
            reason: new.reason,
            notes: new.notes,
            completed_at: None,
            cancelled_at: None,
            cancelled_reason: None,
            created_at: now,
            updated_at: now,
        };
        tables.visits.insert(visit.id, visit.clone());
        Ok(visit)
    }

    async fn get_visit(&self, id: VisitId) -> Result<Option<Visit>> {
        Ok(self.tables.read().await.visits.get(&id).cloned())
    }

    async fn update_visit(&self, visit: &Visit) -> Result<Visit> {
        let mut tables = self.tables.write().await;
        if !tables.visits.contains_key(&visit.id) {
            return Err(StoreError::not_found("visit", visit.id));
        }
        let mut updated = visit.clone();
        updated.updated_at = Utc::now();
        tables.visits.insert(updated.id, updated.clone());
        Ok(updated)
    }

    async fn list_visits(&self, query: &VisitQuery) -> Result<Vec<Visit>> {
        let tables = self.tables.read().await;
        let mut visits: Vec<_> = tables
            .visits
            .values()
            .filter(|v| Tables::visit_matches(v, query))
            .cloned()
            .collect();
        visits.sort_by(|a, b| {
            a.scheduled_date
                .cmp(&b.scheduled_date)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(query.page.apply(visits))
    }

    async fn count_visits(&self, query: &VisitQuery) -> Result<VisitCounts> {
        let tables = self.tables.read().await;
        let mut counts = VisitCounts::default();
        tables
            .visits
            .values()
            .filter(|v| Tables::visit_matches(v, query))
            .for_each(|v| counts.record(v.status));
        Ok(counts)
    }

    async fn insert_incident(&self, new: NewIncident) -> Result<SellerIncident> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let incident = SellerIncident {
            id: IncidentId::new(tables.next_id()),
            seller_id: new.seller_id,
            shopkeeper_id: new.shopkeeper_id,
            visit_id: new.visit_id,
            kind: new.kind,
            description: new.description,
            incident_date: new.incident_date,
            created_at: now,
            updated_at: now,
        };
        tables.incidents.insert(incident.id, incident.clone());
        Ok(incident)
    }

    async fn get_incident(&self, id: IncidentId) -> Result<Option<SellerIncident>> {
        Ok(self.tables.read().await.incidents.get(&id).cloned())
    }

    async fn update_incident(&self, incident: &SellerIncident) -> Result<SellerIncident> {
        let mut tables = self.tables.write().await;
        if !tables.incidents.contains_key(&incident.id) {
            return Err(StoreError::not_found("incident", incident.id));
        }
        let mut updated = incident.clone();
        updated.updated_at = Utc::now();
        tables.incidents.insert(updated.id, updated.clone());
        Ok(updated)
    }

    async fn delete_incident(&self, id: IncidentId) -> Result<bool> {
        Ok(self.tables.write().await.incidents.remove(&id).is_some())
    }

    async fn list_incidents(&self, query: &IncidentQuery) -> Result<Vec<SellerIncident>> {
        let tables = self.tables.read().await;
        let mut incidents: Vec<_> = tables
            .incidents
            .values()
            .filter(|i| {
                query.seller_id.is_none_or(|s| i.seller_id == s)
                    && query.visit_id.is_none_or(|v| i.visit_id == Some(v))
                    && query.shopkeeper_id.is_none_or(|s| i.shopkeeper_id == Some(s))
                    && query.kind.is_none_or(|k| i.kind == k)
            })
            .cloned()
            .collect();
        incidents.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(incidents)
    }

    async fn insert_inventory_item(&self, new: NewInventoryItem) -> Result<InventoryItem> {
        let mut tables = self.tables.write().await;
        let listed = tables
            .inventory
            .values()
            .any(|i| i.shopkeeper_id == new.shopkeeper_id && i.product_id == new.product_id);
        if listed {
            return Err(StoreError::UniqueViolation {
                entity: "inventory item",
                field: "product_id",
                value: new.product_id.to_string(),
            });
        }

        let now = Utc::now();
        let item = InventoryItem {
            id: InventoryId::new(tables.next_id()),
            shopkeeper_id: new.shopkeeper_id,
            product_id: new.product_id,
            unit_price: new.unit_price,
            current_stock: new.current_stock,
            min_stock: new.min_stock,
            max_stock: new.max_stock,
            product_name: new.product_name,
            product_description: new.product_description,
            product_category: new.product_category,
            product_brand: new.product_brand,
            is_validated: new.validated_by.is_some() || new.validated_at.is_some(),
            validated_by: new.validated_by,
            validated_at: new.validated_at,
            is_active: true,
            last_updated: now,
            created_at: now,
            updated_at: now,
        };
        tables.inventory.insert(item.id, item.clone());
        Ok(item)
    }

    async fn get_inventory_item(&self, id: InventoryId) -> Result<Option<InventoryItem>> {
        Ok(self.tables.read().await.inventory.get(&id).cloned())
    }

    async fn find_inventory_item(
        &self,
        shopkeeper_id: ShopkeeperId,
        product_id: ProductId,
    ) -> Result<Option<InventoryItem>> {
        let tables = self.tables.read().await;
        Ok(tables
            .inventory
            .values()
            .find(|i| i.shopkeeper_id == shopkeeper_id && i.product_id == product_id)
            .cloned())
    }

    async fn update_inventory_item(&self, item: &InventoryItem) -> Result<InventoryItem> {
        let mut tables = self.tables.write().await;
        if !tables.inventory.contains_key(&item.id) {
            return Err(StoreError::not_found("inventory item", item.id));
        }
        let mut updated = item.clone();
        updated.updated_at = Utc::now();
        tables.inventory.insert(updated.id, updated.clone());
        Ok(updated)
    }

    async fn delete_inventory_item(&self, id: InventoryId) -> Result<bool> {
        Ok(self.tables.write().await.inventory.remove(&id).is_some())
    }

    async fn list_inventory(&self, query: &InventoryQuery) -> Result<Vec<InventoryItem>> {
        let tables = self.tables.read().await;
        Ok(tables
            .inventory
            .values()
            .filter(|i| {
                query.shopkeeper_id.is_none_or(|s| i.shopkeeper_id == s)
                    && query.is_active.is_none_or(|a| i.is_active == a)
                    && (!query.low_stock_only || i.is_low_stock())
            })
            .cloned()
            .collect())
    }
}
