//! Restock views that help a seller decide which shopkeepers to visit.

use chrono::{DateTime, Utc};
use common::{ProductId, SellerId, ShopkeeperId};
use serde::Serialize;
use store::{InventoryQuery, Page, ShopkeeperQuery, UserStore, UserStoreExt};

use super::service::VisitService;
use crate::actor::{Actor, Role};
use crate::error::DomainError;
use crate::inventory::StockStatus;

/// A shopkeeper with at least one product below its minimum stock.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShopkeeperLowStock {
    pub shopkeeper_id: ShopkeeperId,
    pub shopkeeper_name: String,
    pub shopkeeper_business_name: Option<String>,
    pub shopkeeper_address: String,
    pub shopkeeper_phone: Option<String>,
    pub shopkeeper_email: Option<String>,
    pub low_stock_count: usize,
    pub total_products: usize,
    /// Latest stock change among the low-stock products.
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LowStockProduct {
    pub product_id: ProductId,
    pub product_name: Option<String>,
    pub current_stock: f64,
    pub min_stock: f64,
    pub max_stock: f64,
    pub unit_price: f64,
    pub stock_status: StockStatus,
}

/// What a seller needs to know about one shopkeeper's stock before a visit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RestockSummary {
    pub shopkeeper_id: ShopkeeperId,
    pub shopkeeper_name: String,
    pub shopkeeper_business_name: Option<String>,
    pub total_products: usize,
    pub low_stock_count: usize,
    pub low_stock_products: Vec<LowStockProduct>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl<S: UserStore> VisitService<S> {
    /// Shopkeepers with low stock, most urgent first.
    ///
    /// Sellers see their assigned shopkeepers (none if no seller record is
    /// linked). Administrators see one seller's shopkeepers or every active
    /// shopkeeper. Shopkeepers are refused; other roles see nothing.
    #[tracing::instrument(skip(self, actor), fields(role = %actor.role))]
    pub async fn low_stock_shopkeepers(
        &self,
        actor: &Actor,
        seller_id: Option<SellerId>,
    ) -> Result<Vec<ShopkeeperLowStock>, DomainError> {
        let shopkeepers = match (&actor.role, seller_id) {
            (Role::Shopkeeper, _) => {
                return Err(DomainError::Forbidden(
                    "Shopkeepers cannot list low-stock shopkeepers".to_string(),
                ));
            }
            (Role::Seller, _) => match self.resolve_seller(actor).await? {
                Some(seller) => self.store.assigned_shopkeepers(seller.id).await?,
                None => return Ok(Vec::new()),
            },
            (Role::Admin, Some(seller_id)) => {
                let seller = self.store.require_seller(seller_id).await?;
                self.store.assigned_shopkeepers(seller.id).await?
            }
            (Role::Admin, None) => {
                self.store
                    .list_shopkeepers(&ShopkeeperQuery::new().active(true).page(Page::all()))
                    .await?
            }
            (Role::Other(_), _) => return Ok(Vec::new()),
        };

        let mut result = Vec::new();
        for shopkeeper in shopkeepers {
            let items = self
                .store
                .list_inventory(&InventoryQuery::new().shopkeeper(shopkeeper.id).active(true))
                .await?;
            let low: Vec<_> = items.iter().filter(|i| i.is_low_stock()).collect();
            if low.is_empty() {
                continue;
            }
            result.push(ShopkeeperLowStock {
                low_stock_count: low.len(),
                total_products: items.len(),
                last_updated: low.iter().map(|i| i.last_updated).max(),
                shopkeeper_id: shopkeeper.id,
                shopkeeper_name: shopkeeper.name,
                shopkeeper_business_name: shopkeeper.business_name,
                shopkeeper_address: shopkeeper.address,
                shopkeeper_phone: shopkeeper.phone,
                shopkeeper_email: shopkeeper.email,
            });
        }

        result.sort_by(|a, b| b.low_stock_count.cmp(&a.low_stock_count));
        Ok(result)
    }

    /// One shopkeeper's low-stock products. Sellers may only look at their
    /// own shopkeepers; shopkeepers are refused.
    #[tracing::instrument(skip(self, actor), fields(role = %actor.role))]
    pub async fn restock_summary(
        &self,
        actor: &Actor,
        shopkeeper_id: ShopkeeperId,
    ) -> Result<RestockSummary, DomainError> {
        match actor.role {
            Role::Shopkeeper => {
                return Err(DomainError::Forbidden(
                    "Shopkeepers cannot view inventory summaries".to_string(),
                ));
            }
            Role::Seller => {
                let seller = self.resolve_seller(actor).await?.ok_or_else(|| {
                    DomainError::Forbidden("No seller is linked to this account".to_string())
                })?;
                if !self.store.is_assigned(seller.id, shopkeeper_id).await? {
                    return Err(DomainError::Forbidden(
                        "The shopkeeper is not assigned to you".to_string(),
                    ));
                }
            }
            Role::Admin | Role::Other(_) => {}
        }

        let shopkeeper = self.store.require_shopkeeper(shopkeeper_id).await?;
        let items = self
            .store
            .list_inventory(&InventoryQuery::new().shopkeeper(shopkeeper.id).active(true))
            .await?;

        let low_stock_products: Vec<_> = items
            .iter()
            .filter(|i| i.is_low_stock())
            .map(|i| LowStockProduct {
                product_id: i.product_id,
                product_name: i.product_name.clone(),
                current_stock: i.current_stock,
                min_stock: i.min_stock,
                max_stock: i.max_stock,
                unit_price: i.unit_price,
                stock_status: StockStatus::Low,
            })
            .collect();

        Ok(RestockSummary {
            shopkeeper_id: shopkeeper.id,
            shopkeeper_name: shopkeeper.name,
            shopkeeper_business_name: shopkeeper.business_name,
            total_products: items.len(),
            low_stock_count: low_stock_products.len(),
            low_stock_products,
            last_updated: items.iter().map(|i| i.last_updated).max(),
        })
    }
}
