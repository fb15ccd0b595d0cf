//! Seller registry.

use std::sync::Arc;

use common::{SellerId, UserId, ZoneId};
use serde::{Deserialize, Serialize};
use store::{NewSeller, Seller, SellerQuery, UserStore};

use crate::error::DomainError;
use crate::validation;
use crate::zones::ZoneDirectory;

/// Command to register a seller.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSeller {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    pub zone_id: ZoneId,
    #[serde(default)]
    pub user_id: Option<UserId>,
}

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateSeller {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub zone_id: Option<ZoneId>,
    pub is_active: Option<bool>,
}

/// Moves a seller to another zone.
#[derive(Debug, Clone, Deserialize)]
pub struct ChangeZone {
    pub new_zone_id: ZoneId,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A seller with the number of shopkeepers currently assigned to them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SellerSummary {
    #[serde(flatten)]
    pub seller: Seller,
    pub total_shopkeepers: i64,
}

/// Service for managing sellers.
pub struct SellerService<S: UserStore> {
    store: Arc<S>,
    zones: Arc<dyn ZoneDirectory>,
}

impl<S: UserStore> SellerService<S> {
    pub fn new(store: Arc<S>, zones: Arc<dyn ZoneDirectory>) -> Self {
        Self { store, zones }
    }

    /// Registers a seller after checking the zone exists and the email is free.
    #[tracing::instrument(skip(self, cmd), fields(email = %cmd.email, zone_id = %cmd.zone_id))]
    pub async fn create(&self, cmd: CreateSeller) -> Result<Seller, DomainError> {
        validation::name("name", &cmd.name)?;
        let email = validation::email("email", &cmd.email)?;
        validation::max_len("phone", cmd.phone.as_deref(), validation::PHONE_MAX)?;
        validation::positive_id("zone_id", cmd.zone_id.get())?;
        if let Some(user_id) = cmd.user_id {
            validation::positive_id("user_id", user_id.get())?;
        }

        self.zones.verify_zone(cmd.zone_id).await?;

        if self.store.find_seller_by_email(&email).await?.is_some() {
            return Err(DomainError::Conflict(format!(
                "A seller with email {email} already exists"
            )));
        }

        let seller = self
            .store
            .insert_seller(NewSeller {
                name: cmd.name.trim().to_string(),
                email,
                phone: cmd.phone,
                address: cmd.address,
                zone_id: cmd.zone_id,
                user_id: cmd.user_id,
            })
            .await?;

        metrics::counter!("users_sellers_created_total").increment(1);
        tracing::info!(seller_id = %seller.id, "seller created");
        Ok(seller)
    }

    /// Lists sellers, each with its active assignment count.
    #[tracing::instrument(skip(self))]
    pub async fn list(&self, query: &SellerQuery) -> Result<Vec<SellerSummary>, DomainError> {
        let sellers = self.store.list_sellers(query).await?;

        let mut summaries = Vec::with_capacity(sellers.len());
        for seller in sellers {
            let total_shopkeepers = self.store.count_active_assignments(seller.id).await?;
            summaries.push(SellerSummary {
                seller,
                total_shopkeepers,
            });
        }
        Ok(summaries)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get(&self, id: SellerId) -> Result<Seller, DomainError> {
        self.store
            .get_seller(id)
            .await?
            .ok_or_else(|| DomainError::not_found("seller", id))
    }

    /// Applies a partial update, re-verifying the zone and email when they change.
    #[tracing::instrument(skip(self, cmd))]
    pub async fn update(&self, id: SellerId, cmd: UpdateSeller) -> Result<Seller, DomainError> {
        let mut seller = self.get(id).await?;

        if let Some(name) = cmd.name {
            validation::name("name", &name)?;
            seller.name = name.trim().to_string();
        }
        if let Some(phone) = cmd.phone {
            validation::max_len("phone", Some(phone.as_str()), validation::PHONE_MAX)?;
            seller.phone = Some(phone);
        }
        if let Some(address) = cmd.address {
            seller.address = Some(address);
        }
        if let Some(email) = cmd.email {
            let email = validation::email("email", &email)?;
            if email != seller.email {
                if self.store.find_seller_by_email(&email).await?.is_some() {
                    return Err(DomainError::Conflict(format!(
                        "A seller with email {email} already exists"
                    )));
                }
                seller.email = email;
            }
        }
        if let Some(zone_id) = cmd.zone_id {
            validation::positive_id("zone_id", zone_id.get())?;
            if zone_id != seller.zone_id {
                self.zones.verify_zone(zone_id).await?;
                seller.zone_id = zone_id;
            }
        }
        if let Some(is_active) = cmd.is_active {
            seller.is_active = is_active;
        }

        Ok(self.store.update_seller(&seller).await?)
    }

    /// Soft delete: the row stays, `is_active` goes false.
    #[tracing::instrument(skip(self))]
    pub async fn deactivate(&self, id: SellerId) -> Result<(), DomainError> {
        let mut seller = self.get(id).await?;
        seller.is_active = false;
        self.store.update_seller(&seller).await?;
        tracing::info!(seller_id = %id, "seller deactivated");
        Ok(())
    }

    #[tracing::instrument(skip(self, cmd), fields(new_zone_id = %cmd.new_zone_id))]
    pub async fn change_zone(&self, id: SellerId, cmd: ChangeZone) -> Result<Seller, DomainError> {
        validation::positive_id("new_zone_id", cmd.new_zone_id.get())?;
        let mut seller = self.get(id).await?;
        self.zones.verify_zone(cmd.new_zone_id).await?;

        let previous = seller.zone_id;
        seller.zone_id = cmd.new_zone_id;
        let seller = self.store.update_seller(&seller).await?;

        tracing::info!(
            seller_id = %id,
            from_zone = %previous,
            to_zone = %seller.zone_id,
            notes = cmd.notes.as_deref().unwrap_or(""),
            "seller changed zone"
        );
        Ok(seller)
    }
}
