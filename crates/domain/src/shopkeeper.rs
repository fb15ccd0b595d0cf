//! Shopkeeper registry.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::{SellerId, ShopkeeperId};
use serde::{Deserialize, Serialize};
use store::{NewShopkeeper, Shopkeeper, ShopkeeperQuery, UserStore};

use crate::error::DomainError;
use crate::validation;

/// Command to register a shopkeeper.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateShopkeeper {
    pub name: String,
    #[serde(default)]
    pub business_name: Option<String>,
    pub address: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateShopkeeper {
    pub name: Option<String>,
    pub business_name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_active: Option<bool>,
}

/// A shopkeeper together with the seller currently responsible for it.
///
/// The seller fields are null when the shopkeeper is unassigned.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShopkeeperView {
    #[serde(flatten)]
    pub shopkeeper: Shopkeeper,
    pub seller_id: Option<SellerId>,
    pub seller_name: Option<String>,
    pub seller_email: Option<String>,
    pub assigned_at: Option<DateTime<Utc>>,
}

/// Service for managing shopkeepers.
pub struct ShopkeeperService<S: UserStore> {
    store: Arc<S>,
}

impl<S: UserStore> ShopkeeperService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self, cmd), fields(name = %cmd.name))]
    pub async fn create(&self, cmd: CreateShopkeeper) -> Result<Shopkeeper, DomainError> {
        validation::name("name", &cmd.name)?;
        validation::max_len(
            "business_name",
            cmd.business_name.as_deref(),
            validation::BUSINESS_NAME_MAX,
        )?;
        validation::address(&cmd.address)?;
        validation::max_len("phone", cmd.phone.as_deref(), validation::PHONE_MAX)?;
        validation::latitude(cmd.latitude)?;
        validation::longitude(cmd.longitude)?;

        let email = match cmd.email.as_deref() {
            Some(raw) => {
                let email = validation::email("email", raw)?;
                self.ensure_email_free(&email).await?;
                Some(email)
            }
            None => None,
        };

        let shopkeeper = self
            .store
            .insert_shopkeeper(NewShopkeeper {
                name: cmd.name.trim().to_string(),
                business_name: cmd.business_name,
                address: cmd.address.trim().to_string(),
                phone: cmd.phone,
                email,
                latitude: cmd.latitude,
                longitude: cmd.longitude,
            })
            .await?;

        tracing::info!(shopkeeper_id = %shopkeeper.id, "shopkeeper created");
        Ok(shopkeeper)
    }

    async fn ensure_email_free(&self, email: &str) -> Result<(), DomainError> {
        if self.store.find_shopkeeper_by_email(email).await?.is_some() {
            return Err(DomainError::Conflict(format!(
                "A shopkeeper with email {email} already exists"
            )));
        }
        Ok(())
    }

    /// Attaches the active assignment's seller, if any.
    async fn view(&self, shopkeeper: Shopkeeper) -> Result<ShopkeeperView, DomainError> {
        let mut view = ShopkeeperView {
            shopkeeper,
            seller_id: None,
            seller_name: None,
            seller_email: None,
            assigned_at: None,
        };

        if let Some(assignment) = self
            .store
            .active_assignment_for(view.shopkeeper.id)
            .await?
        {
            view.seller_id = Some(assignment.seller_id);
            view.assigned_at = Some(assignment.assigned_at);
            if let Some(seller) = self.store.get_seller(assignment.seller_id).await? {
                view.seller_name = Some(seller.name);
                view.seller_email = Some(seller.email);
            }
        }
        Ok(view)
    }

    /// Lists shopkeepers with their current seller; filters run before paging.
    #[tracing::instrument(skip(self))]
    pub async fn list(&self, query: &ShopkeeperQuery) -> Result<Vec<ShopkeeperView>, DomainError> {
        let shopkeepers = self.store.list_shopkeepers(query).await?;
        let mut views = Vec::with_capacity(shopkeepers.len());
        for shopkeeper in shopkeepers {
            views.push(self.view(shopkeeper).await?);
        }
        Ok(views)
    }

    /// Active shopkeepers nobody is responsible for.
    #[tracing::instrument(skip(self))]
    pub async fn unassigned(&self) -> Result<Vec<Shopkeeper>, DomainError> {
        Ok(self.store.list_unassigned_shopkeepers().await?)
    }

    async fn load(&self, id: ShopkeeperId) -> Result<Shopkeeper, DomainError> {
        self.store
            .get_shopkeeper(id)
            .await?
            .ok_or_else(|| DomainError::not_found("shopkeeper", id))
    }

    #[tracing::instrument(skip(self))]
    pub async fn get(&self, id: ShopkeeperId) -> Result<ShopkeeperView, DomainError> {
        let shopkeeper = self.load(id).await?;
        self.view(shopkeeper).await
    }

    #[tracing::instrument(skip(self, cmd))]
    pub async fn update(
        &self,
        id: ShopkeeperId,
        cmd: UpdateShopkeeper,
    ) -> Result<Shopkeeper, DomainError> {
        let mut shopkeeper = self.load(id).await?;

        if let Some(name) = cmd.name {
            validation::name("name", &name)?;
            shopkeeper.name = name.trim().to_string();
        }
        if let Some(business_name) = cmd.business_name {
            validation::max_len(
                "business_name",
                Some(business_name.as_str()),
                validation::BUSINESS_NAME_MAX,
            )?;
            shopkeeper.business_name = Some(business_name);
        }
        if let Some(address) = cmd.address {
            validation::address(&address)?;
            shopkeeper.address = address.trim().to_string();
        }
        if let Some(phone) = cmd.phone {
            validation::max_len("phone", Some(phone.as_str()), validation::PHONE_MAX)?;
            shopkeeper.phone = Some(phone);
        }
        if let Some(latitude) = cmd.latitude {
            validation::latitude(latitude)?;
            shopkeeper.latitude = latitude;
        }
        if let Some(longitude) = cmd.longitude {
            validation::longitude(longitude)?;
            shopkeeper.longitude = longitude;
        }
        if let Some(email) = cmd.email {
            let email = validation::email("email", &email)?;
            if shopkeeper.email.as_deref() != Some(email.as_str()) {
                self.ensure_email_free(&email).await?;
                shopkeeper.email = Some(email);
            }
        }
        if let Some(is_active) = cmd.is_active {
            shopkeeper.is_active = is_active;
        }

        Ok(self.store.update_shopkeeper(&shopkeeper).await?)
    }

    /// Soft delete. Assignments are left untouched.
    #[tracing::instrument(skip(self))]
    pub async fn deactivate(&self, id: ShopkeeperId) -> Result<(), DomainError> {
        let mut shopkeeper = self.load(id).await?;
        shopkeeper.is_active = false;
        self.store.update_shopkeeper(&shopkeeper).await?;
        tracing::info!(shopkeeper_id = %id, "shopkeeper deactivated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use common::{UserId, ZoneId};
    use store::{InMemoryUserStore, NewAssignment, NewSeller, Page};

    use super::*;
    use crate::error::ValidationError;

    fn create_cmd(name: &str) -> CreateShopkeeper {
        CreateShopkeeper {
            name: name.to_string(),
            business_name: Some("Supermercado La Esperanza".to_string()),
            address: "Calle 80 #12-34, Chapinero".to_string(),
            phone: Some("6012345678".to_string()),
            email: None,
            latitude: 4.60971,
            longitude: -74.08175,
        }
    }

    #[tokio::test]
    async fn coordinates_outside_colombia_are_rejected() {
        let service = ShopkeeperService::new(Arc::new(InMemoryUserStore::new()));
        let mut cmd = create_cmd("Tienda Lima");
        cmd.latitude = -12.04;
        cmd.longitude = -77.04;

        let err = service.create(cmd).await.unwrap_err();
        assert!(matches!(
            err,
            DomainError::Validation(ValidationError::OutOfRange {
                field: "latitude",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn email_unique_when_present() {
        let service = ShopkeeperService::new(Arc::new(InMemoryUserStore::new()));
        let mut first = create_cmd("Tienda Uno");
        first.email = Some("tienda@example.com".to_string());
        service.create(first).await.unwrap();

        let mut second = create_cmd("Tienda Dos");
        second.email = Some("TIENDA@example.com".to_string());
        assert!(matches!(
            service.create(second).await,
            Err(DomainError::Conflict(_))
        ));

        // Shopkeepers without email never collide.
        service.create(create_cmd("Tienda Tres")).await.unwrap();
        service.create(create_cmd("Tienda Cuatro")).await.unwrap();
    }

    #[tokio::test]
    async fn views_carry_current_seller() {
        let store = Arc::new(InMemoryUserStore::new());
        let service = ShopkeeperService::new(store.clone());

        let seller = store
            .insert_seller(NewSeller {
                name: "Juan Pérez".to_string(),
                email: "juan@vendedor.com".to_string(),
                phone: None,
                address: None,
                zone_id: ZoneId::new(1),
                user_id: None,
            })
            .await
            .unwrap();
        let assigned = service.create(create_cmd("Tienda Uno")).await.unwrap();
        let free = service.create(create_cmd("Tienda Dos")).await.unwrap();
        store
            .insert_assignment(NewAssignment {
                seller_id: seller.id,
                shopkeeper_id: assigned.id,
                assigned_by: Some(UserId::new(1)),
                notes: None,
            })
            .await
            .unwrap();

        let view = service.get(assigned.id).await.unwrap();
        assert_eq!(view.seller_id, Some(seller.id));
        assert_eq!(view.seller_email.as_deref(), Some("juan@vendedor.com"));
        assert!(view.assigned_at.is_some());

        let unassigned = service
            .list(&ShopkeeperQuery::new().unassigned_only().page(Page::default()))
            .await
            .unwrap();
        assert_eq!(unassigned.len(), 1);
        assert_eq!(unassigned[0].shopkeeper.id, free.id);
        assert!(unassigned[0].seller_name.is_none());

        let pool = service.unassigned().await.unwrap();
        assert_eq!(pool.iter().map(|s| s.id).collect::<Vec<_>>(), vec![free.id]);
    }

    #[tokio::test]
    async fn update_validates_changed_fields() {
        let service = ShopkeeperService::new(Arc::new(InMemoryUserStore::new()));
        let shopkeeper = service.create(create_cmd("Tienda Uno")).await.unwrap();

        let err = service
            .update(
                shopkeeper.id,
                UpdateShopkeeper {
                    longitude: Some(-60.0),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let updated = service
            .update(
                shopkeeper.id,
                UpdateShopkeeper {
                    address: Some("Carrera 7 # 45-10".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.address, "Carrera 7 # 45-10");
    }

    #[tokio::test]
    async fn deactivate_keeps_row() {
        let service = ShopkeeperService::new(Arc::new(InMemoryUserStore::new()));
        let shopkeeper = service.create(create_cmd("Tienda Uno")).await.unwrap();
        service.deactivate(shopkeeper.id).await.unwrap();
        assert!(!service.get(shopkeeper.id).await.unwrap().shopkeeper.is_active);
    }
}
