//! Shopkeeper inventories: which catalog products each store carries, at
//! what price, and how its stock compares to the restock thresholds.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::{InventoryId, ProductId, ShopkeeperId};
use serde::{Deserialize, Serialize};
use store::{
    DEFAULT_MAX_STOCK, DEFAULT_MIN_STOCK, InventoryItem, InventoryQuery, NewInventoryItem,
    Shopkeeper, UserStore, UserStoreExt,
};

use crate::actor::Actor;
use crate::error::DomainError;
use crate::products::{Product, ProductCatalog};
use crate::validation;

fn default_min_stock() -> f64 {
    DEFAULT_MIN_STOCK
}

fn default_max_stock() -> f64 {
    DEFAULT_MAX_STOCK
}

/// Adds a catalog product to a shopkeeper's inventory. Missing product
/// details are filled in from the catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct AddInventoryItem {
    pub shopkeeper_id: ShopkeeperId,
    pub product_id: ProductId,
    pub unit_price: f64,
    #[serde(default)]
    pub current_stock: f64,
    #[serde(default = "default_min_stock")]
    pub min_stock: f64,
    #[serde(default = "default_max_stock")]
    pub max_stock: f64,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub product_description: Option<String>,
    #[serde(default)]
    pub product_category: Option<String>,
    #[serde(default)]
    pub product_brand: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateInventoryItem {
    pub current_stock: Option<f64>,
    pub min_stock: Option<f64>,
    pub max_stock: Option<f64>,
    pub unit_price: Option<f64>,
}

/// Adds (positive) or removes (negative) units of a product.
#[derive(Debug, Clone, Deserialize)]
pub struct StockAdjustment {
    pub product_id: ProductId,
    pub quantity: f64,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockAdjustmentResult {
    pub success: bool,
    pub message: String,
    pub product_name: String,
    pub previous_stock: f64,
    pub new_stock: f64,
    pub notes: Option<String>,
}

/// Where the current stock sits relative to the row's thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StockStatus {
    Low,
    Normal,
    High,
}

impl StockStatus {
    pub fn of(item: &InventoryItem) -> Self {
        if item.current_stock < item.min_stock {
            StockStatus::Low
        } else if item.current_stock > item.max_stock {
            StockStatus::High
        } else {
            StockStatus::Normal
        }
    }
}

/// An inventory row joined with its shopkeeper and product names.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventoryDetail {
    pub id: InventoryId,
    pub shopkeeper_id: ShopkeeperId,
    pub shopkeeper_name: String,
    pub business_name: Option<String>,
    pub product_id: ProductId,
    pub product_name: String,
    pub category: String,
    pub price: f64,
    pub stock: f64,
    pub min_stock: f64,
    pub max_stock: f64,
    pub stock_status: StockStatus,
    pub last_updated: DateTime<Utc>,
}

impl InventoryDetail {
    /// Catalog data wins over the cached columns when the catalog knows the product.
    fn new(item: InventoryItem, shopkeeper: &Shopkeeper, product: Option<Product>) -> Self {
        let (name, category) = match product {
            Some(product) => (product.name, product.category),
            None => (None, None),
        };
        Self {
            id: item.id,
            shopkeeper_id: item.shopkeeper_id,
            shopkeeper_name: shopkeeper.name.clone(),
            business_name: shopkeeper.business_name.clone(),
            product_id: item.product_id,
            product_name: name
                .or_else(|| item.product_name.clone())
                .unwrap_or_else(|| format!("Product {}", item.product_id)),
            category: category
                .or_else(|| item.product_category.clone())
                .unwrap_or_else(|| "Uncategorized".to_string()),
            price: item.unit_price,
            stock: item.current_stock,
            min_stock: item.min_stock,
            max_stock: item.max_stock,
            stock_status: StockStatus::of(&item),
            last_updated: item.last_updated,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventorySummary {
    pub shopkeeper_id: ShopkeeperId,
    pub shopkeeper_name: String,
    pub total_products: usize,
    pub low_stock_items: usize,
    /// Sum of stock times unit price over the active rows.
    pub total_value: f64,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Service for managing shopkeeper inventories.
pub struct InventoryService<S: UserStore> {
    store: Arc<S>,
    catalog: Arc<dyn ProductCatalog>,
}

impl<S: UserStore> InventoryService<S> {
    pub fn new(store: Arc<S>, catalog: Arc<dyn ProductCatalog>) -> Self {
        Self { store, catalog }
    }

    async fn active_items(
        &self,
        shopkeeper_id: ShopkeeperId,
        low_stock_only: bool,
    ) -> Result<Vec<InventoryItem>, DomainError> {
        let query = InventoryQuery::new()
            .shopkeeper(shopkeeper_id)
            .active(true)
            .low_stock(low_stock_only);
        Ok(self.store.list_inventory(&query).await?)
    }

    /// Lists a shopkeeper's active products with fresh catalog names.
    #[tracing::instrument(skip(self))]
    pub async fn list(
        &self,
        shopkeeper_id: ShopkeeperId,
        low_stock_only: bool,
    ) -> Result<Vec<InventoryDetail>, DomainError> {
        let shopkeeper = self.store.require_shopkeeper(shopkeeper_id).await?;
        let items = self.active_items(shopkeeper_id, low_stock_only).await?;

        let mut details = Vec::with_capacity(items.len());
        for item in items {
            let product = self.catalog.product(item.product_id).await?;
            details.push(InventoryDetail::new(item, &shopkeeper, product));
        }
        Ok(details)
    }

    #[tracing::instrument(skip(self))]
    pub async fn summary(
        &self,
        shopkeeper_id: ShopkeeperId,
    ) -> Result<InventorySummary, DomainError> {
        let shopkeeper = self.store.require_shopkeeper(shopkeeper_id).await?;
        let items = self.active_items(shopkeeper_id, false).await?;

        Ok(InventorySummary {
            shopkeeper_id,
            shopkeeper_name: shopkeeper.name,
            total_products: items.len(),
            low_stock_items: items.iter().filter(|i| i.is_low_stock()).count(),
            total_value: items.iter().map(|i| i.current_stock * i.unit_price).sum(),
            last_updated: items.iter().map(|i| i.last_updated).max(),
        })
    }

    /// Adds a product the catalog knows to a shopkeeper's inventory, marking
    /// the row as validated by the caller.
    #[tracing::instrument(
        skip(self, actor, cmd),
        fields(shopkeeper_id = %cmd.shopkeeper_id, product_id = %cmd.product_id)
    )]
    pub async fn add(
        &self,
        actor: &Actor,
        cmd: AddInventoryItem,
    ) -> Result<InventoryItem, DomainError> {
        if !cmd.product_id.is_valid() {
            return Err(DomainError::Rejected("Invalid product id".to_string()));
        }
        validation::positive_amount("unit_price", cmd.unit_price)?;
        validation::non_negative("current_stock", cmd.current_stock)?;
        validation::non_negative("min_stock", cmd.min_stock)?;
        validation::non_negative("max_stock", cmd.max_stock)?;

        let shopkeeper = self.store.require_shopkeeper(cmd.shopkeeper_id).await?;

        let product = self
            .catalog
            .product(cmd.product_id)
            .await?
            .ok_or_else(|| DomainError::not_found("product", cmd.product_id))?;

        if self
            .store
            .find_inventory_item(shopkeeper.id, cmd.product_id)
            .await?
            .is_some()
        {
            return Err(DomainError::Conflict(format!(
                "Product {} is already in this shopkeeper's inventory",
                cmd.product_id
            )));
        }

        let item = self
            .store
            .insert_inventory_item(NewInventoryItem {
                shopkeeper_id: shopkeeper.id,
                product_id: cmd.product_id,
                unit_price: cmd.unit_price,
                current_stock: cmd.current_stock,
                min_stock: cmd.min_stock,
                max_stock: cmd.max_stock,
                product_name: cmd.product_name.or(product.name),
                product_description: cmd.product_description.or(product.description),
                product_category: cmd.product_category.or(product.category),
                product_brand: cmd.product_brand.or(product.brand),
                validated_by: actor.user_id,
                validated_at: Some(Utc::now()),
            })
            .await?;

        metrics::counter!("users_inventory_items_added_total").increment(1);
        tracing::info!(inventory_id = %item.id, "inventory item added");
        Ok(item)
    }

    #[tracing::instrument(skip(self, cmd))]
    pub async fn update(
        &self,
        id: InventoryId,
        cmd: UpdateInventoryItem,
    ) -> Result<InventoryItem, DomainError> {
        let mut item = self.store.require_inventory_item(id).await?;

        if let Some(stock) = cmd.current_stock {
            validation::non_negative("current_stock", stock)?;
            item.current_stock = stock;
        }
        if let Some(min) = cmd.min_stock {
            validation::non_negative("min_stock", min)?;
            item.min_stock = min;
        }
        if let Some(max) = cmd.max_stock {
            validation::non_negative("max_stock", max)?;
            item.max_stock = max;
        }
        if let Some(price) = cmd.unit_price {
            validation::positive_amount("unit_price", price)?;
            item.unit_price = price;
        }
        item.last_updated = Utc::now();

        Ok(self.store.update_inventory_item(&item).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: InventoryId) -> Result<(), DomainError> {
        if self.store.delete_inventory_item(id).await? {
            tracing::info!(inventory_id = %id, "inventory item deleted");
            Ok(())
        } else {
            Err(DomainError::not_found("inventory item", id))
        }
    }

    /// Moves a product's stock by a signed quantity. Stock may not go below zero.
    #[tracing::instrument(skip(self, cmd), fields(product_id = %cmd.product_id))]
    pub async fn adjust_stock(
        &self,
        shopkeeper_id: ShopkeeperId,
        cmd: StockAdjustment,
    ) -> Result<StockAdjustmentResult, DomainError> {
        if !cmd.quantity.is_finite() {
            return Err(DomainError::Rejected("Quantity must be a number".to_string()));
        }

        let mut item = self
            .store
            .find_inventory_item(shopkeeper_id, cmd.product_id)
            .await?
            .ok_or_else(|| DomainError::not_found("inventory product", cmd.product_id))?;

        let previous_stock = item.current_stock;
        let new_stock = previous_stock + cmd.quantity;
        if new_stock < 0.0 {
            return Err(DomainError::Rejected(format!(
                "Insufficient stock: current stock is {previous_stock}, tried to remove {}",
                cmd.quantity.abs()
            )));
        }

        item.current_stock = new_stock;
        item.last_updated = Utc::now();
        let item = self.store.update_inventory_item(&item).await?;

        // The new stock is already saved; a catalog failure only costs the name.
        let catalog_name = match self.catalog.product(item.product_id).await {
            Ok(product) => product.and_then(|p| p.name),
            Err(e) => {
                tracing::warn!(error = %e, "product lookup failed after stock adjustment");
                None
            }
        };

        tracing::info!(inventory_id = %item.id, previous_stock, new_stock, "stock adjusted");
        Ok(StockAdjustmentResult {
            success: true,
            message: format!("Stock adjusted: {:+.2}", cmd.quantity),
            product_name: catalog_name
                .or(item.product_name)
                .unwrap_or_else(|| "Product".to_string()),
            previous_stock,
            new_stock: item.current_stock,
            notes: cmd.notes,
        })
    }

    /// Every active low-stock row across all shopkeepers, ordered by
    /// shopkeeper name then product name. Names come from the cached columns.
    #[tracing::instrument(skip(self))]
    pub async fn low_stock_all(&self) -> Result<Vec<InventoryDetail>, DomainError> {
        let items = self
            .store
            .list_inventory(&InventoryQuery::new().active(true).low_stock(true))
            .await?;

        let mut shopkeepers: BTreeMap<ShopkeeperId, Shopkeeper> = BTreeMap::new();
        let mut details = Vec::with_capacity(items.len());
        for item in items {
            if !shopkeepers.contains_key(&item.shopkeeper_id) {
                let shopkeeper = self.store.require_shopkeeper(item.shopkeeper_id).await?;
                shopkeepers.insert(shopkeeper.id, shopkeeper);
            }
            if let Some(shopkeeper) = shopkeepers.get(&item.shopkeeper_id) {
                details.push(InventoryDetail::new(item, shopkeeper, None));
            }
        }

        details.sort_by(|a, b| {
            a.shopkeeper_name
                .cmp(&b.shopkeeper_name)
                .then_with(|| a.product_name.cmp(&b.product_name))
        });
        Ok(details)
    }

    /// Products offered by the catalog, optionally within one category.
    #[tracing::instrument(skip(self))]
    pub async fn available_products(
        &self,
        category: Option<&str>,
    ) -> Result<Vec<Product>, DomainError> {
        Ok(self.catalog.products(category).await?)
    }
}
