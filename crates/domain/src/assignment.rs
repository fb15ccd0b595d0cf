//! Seller/shopkeeper assignments.

use std::sync::Arc;

use chrono::Utc;
use common::{AssignmentId, SellerId, ShopkeeperId};
use serde::{Deserialize, Serialize};
use store::{
    Assignment, AssignmentQuery, NewAssignment, Seller, Shopkeeper, Unassignment, UserStore,
};

use crate::actor::Actor;
use crate::error::DomainError;
use crate::validation;

/// Default soft cap on active assignments per seller.
pub const DEFAULT_MAX_SHOPKEEPERS_PER_SELLER: i64 = 80;

#[derive(Debug, Clone, Deserialize)]
pub struct AssignShopkeeper {
    pub seller_id: SellerId,
    pub shopkeeper_id: ShopkeeperId,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Reassign {
    pub shopkeeper_id: ShopkeeperId,
    pub new_seller_id: SellerId,
    #[serde(default)]
    pub notes: Option<String>,
}

/// An assignment with the names of both parties.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssignmentView {
    #[serde(flatten)]
    pub assignment: Assignment,
    pub seller_name: String,
    pub shopkeeper_name: String,
}

impl AssignmentView {
    fn new(assignment: Assignment, seller: &Seller, shopkeeper: &Shopkeeper) -> Self {
        Self {
            assignment,
            seller_name: seller.name.clone(),
            shopkeeper_name: shopkeeper.name.clone(),
        }
    }
}

/// Every assignment a shopkeeper ever had, newest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssignmentHistory {
    pub shopkeeper_id: ShopkeeperId,
    pub shopkeeper_name: String,
    pub assignments: Vec<AssignmentView>,
    pub total_assignments: usize,
}

/// Service for assigning shopkeepers to sellers.
pub struct AssignmentService<S: UserStore> {
    store: Arc<S>,
    max_per_seller: i64,
}

impl<S: UserStore> AssignmentService<S> {
    pub fn new(store: Arc<S>, max_per_seller: i64) -> Self {
        Self {
            store,
            max_per_seller,
        }
    }

    async fn seller(&self, id: SellerId) -> Result<Seller, DomainError> {
        self.store
            .get_seller(id)
            .await?
            .ok_or_else(|| DomainError::not_found("seller", id))
    }

    async fn shopkeeper(&self, id: ShopkeeperId) -> Result<Shopkeeper, DomainError> {
        self.store
            .get_shopkeeper(id)
            .await?
            .ok_or_else(|| DomainError::not_found("shopkeeper", id))
    }

    /// Binds an unassigned shopkeeper to a seller.
    ///
    /// Exceeding the per-seller cap only logs a warning.
    #[tracing::instrument(skip(self, actor, cmd), fields(seller_id = %cmd.seller_id, shopkeeper_id = %cmd.shopkeeper_id))]
    pub async fn assign(
        &self,
        actor: &Actor,
        cmd: AssignShopkeeper,
    ) -> Result<AssignmentView, DomainError> {
        validation::positive_id("seller_id", cmd.seller_id.get())?;
        validation::positive_id("shopkeeper_id", cmd.shopkeeper_id.get())?;

        let seller = self.seller(cmd.seller_id).await?;
        let shopkeeper = self.shopkeeper(cmd.shopkeeper_id).await?;

        if self
            .store
            .active_assignment_for(shopkeeper.id)
            .await?
            .is_some()
        {
            return Err(DomainError::Conflict(format!(
                "Shopkeeper {} is already assigned to a seller",
                shopkeeper.id
            )));
        }

        let current = self.store.count_active_assignments(seller.id).await?;
        if current >= self.max_per_seller {
            metrics::counter!("users_seller_over_capacity_total").increment(1);
            tracing::warn!(
                seller_id = %seller.id,
                active = current,
                limit = self.max_per_seller,
                "seller exceeds recommended shopkeeper limit"
            );
        }

        let assignment = self
            .store
            .insert_assignment(NewAssignment {
                seller_id: seller.id,
                shopkeeper_id: shopkeeper.id,
                assigned_by: actor.user_id,
                notes: cmd.notes,
            })
            .await?;

        metrics::counter!("users_assignments_total", "action" => "assign").increment(1);
        tracing::info!(assignment_id = %assignment.id, "shopkeeper assigned");
        Ok(AssignmentView::new(assignment, &seller, &shopkeeper))
    }

    /// Moves a shopkeeper from its current seller to another in one step.
    #[tracing::instrument(skip(self, actor, cmd), fields(shopkeeper_id = %cmd.shopkeeper_id, new_seller_id = %cmd.new_seller_id))]
    pub async fn reassign(
        &self,
        actor: &Actor,
        cmd: Reassign,
    ) -> Result<AssignmentView, DomainError> {
        validation::positive_id("shopkeeper_id", cmd.shopkeeper_id.get())?;
        validation::positive_id("new_seller_id", cmd.new_seller_id.get())?;

        let current = self
            .store
            .active_assignment_for(cmd.shopkeeper_id)
            .await?
            .ok_or(DomainError::NotFound {
                entity: "active assignment for shopkeeper",
                id: cmd.shopkeeper_id.get(),
            })?;
        let seller = self.seller(cmd.new_seller_id).await?;
        let shopkeeper = self.shopkeeper(cmd.shopkeeper_id).await?;

        let end = Unassignment {
            unassigned_by: actor.user_id,
            at: Utc::now(),
        };
        let assignment = self
            .store
            .reassign(
                current.id,
                end,
                NewAssignment {
                    seller_id: seller.id,
                    shopkeeper_id: shopkeeper.id,
                    assigned_by: actor.user_id,
                    notes: cmd.notes,
                },
            )
            .await?;

        metrics::counter!("users_assignments_total", "action" => "reassign").increment(1);
        tracing::info!(
            from_seller = %current.seller_id,
            to_seller = %seller.id,
            "shopkeeper reassigned"
        );
        Ok(AssignmentView::new(assignment, &seller, &shopkeeper))
    }

    #[tracing::instrument(skip(self))]
    pub async fn list(&self, query: &AssignmentQuery) -> Result<Vec<AssignmentView>, DomainError> {
        let assignments = self.store.list_assignments(query).await?;
        let mut views = Vec::with_capacity(assignments.len());
        for assignment in assignments {
            let seller = self.seller(assignment.seller_id).await?;
            let shopkeeper = self.shopkeeper(assignment.shopkeeper_id).await?;
            views.push(AssignmentView::new(assignment, &seller, &shopkeeper));
        }
        Ok(views)
    }

    #[tracing::instrument(skip(self))]
    pub async fn history(
        &self,
        shopkeeper_id: ShopkeeperId,
    ) -> Result<AssignmentHistory, DomainError> {
        let shopkeeper = self.shopkeeper(shopkeeper_id).await?;
        let assignments = self.store.assignment_history(shopkeeper_id).await?;

        let mut views = Vec::with_capacity(assignments.len());
        for assignment in assignments {
            let seller = self.seller(assignment.seller_id).await?;
            views.push(AssignmentView::new(assignment, &seller, &shopkeeper));
        }

        Ok(AssignmentHistory {
            shopkeeper_id,
            shopkeeper_name: shopkeeper.name,
            total_assignments: views.len(),
            assignments: views,
        })
    }

    /// Ends an assignment. Ending one that is already inactive succeeds.
    #[tracing::instrument(skip(self, actor))]
    pub async fn unassign(&self, actor: &Actor, id: AssignmentId) -> Result<(), DomainError> {
        let assignment = self
            .store
            .get_assignment(id)
            .await?
            .ok_or_else(|| DomainError::not_found("assignment", id))?;

        if assignment.is_active {
            self.store
                .end_assignment(
                    id,
                    Unassignment {
                        unassigned_by: actor.user_id,
                        at: Utc::now(),
                    },
                )
                .await?;
            metrics::counter!("users_assignments_total", "action" => "unassign").increment(1);
            tracing::info!(shopkeeper_id = %assignment.shopkeeper_id, "shopkeeper unassigned");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use common::{UserId, ZoneId};
    use store::{InMemoryUserStore, NewSeller, NewShopkeeper};

    use super::*;
    use crate::actor::Role;

    fn admin() -> Actor {
        Actor::new("admin@example.com", Role::Admin, Some(UserId::new(9)))
    }

    async fn seed(
        store: &InMemoryUserStore,
        sellers: usize,
        shopkeepers: usize,
    ) -> (Vec<SellerId>, Vec<ShopkeeperId>) {
        let mut seller_ids = Vec::new();
        for i in 0..sellers {
            let seller = store
                .insert_seller(NewSeller {
                    name: format!("Vendedor {i}"),
                    email: format!("v{i}@example.com"),
                    phone: None,
                    address: None,
                    zone_id: ZoneId::new(1),
                    user_id: None,
                })
                .await
                .unwrap();
            seller_ids.push(seller.id);
        }
        let mut shopkeeper_ids = Vec::new();
        for i in 0..shopkeepers {
            let shopkeeper = store
                .insert_shopkeeper(NewShopkeeper {
                    name: format!("Tienda {i}"),
                    business_name: None,
                    address: "Calle 1 # 2-3".to_string(),
                    phone: None,
                    email: None,
                    latitude: 4.6,
                    longitude: -74.1,
                })
                .await
                .unwrap();
            shopkeeper_ids.push(shopkeeper.id);
        }
        (seller_ids, shopkeeper_ids)
    }

    #[tokio::test]
    async fn assign_records_caller_and_names() {
        let store = Arc::new(InMemoryUserStore::new());
        let (sellers, shopkeepers) = seed(&store, 1, 1).await;
        let service = AssignmentService::new(store, DEFAULT_MAX_SHOPKEEPERS_PER_SELLER);

        let view = service
            .assign(
                &admin(),
                AssignShopkeeper {
                    seller_id: sellers[0],
                    shopkeeper_id: shopkeepers[0],
                    notes: Some("cercanía".to_string()),
                },
            )
            .await
            .unwrap();

        assert!(view.assignment.is_active);
        assert_eq!(view.assignment.assigned_by, Some(UserId::new(9)));
        assert_eq!(view.seller_name, "Vendedor 0");
        assert_eq!(view.shopkeeper_name, "Tienda 0");
    }

    #[tokio::test]
    async fn second_assignment_is_conflict() {
        let store = Arc::new(InMemoryUserStore::new());
        let (sellers, shopkeepers) = seed(&store, 2, 1).await;
        let service = AssignmentService::new(store, DEFAULT_MAX_SHOPKEEPERS_PER_SELLER);

        let cmd = |seller_id| AssignShopkeeper {
            seller_id,
            shopkeeper_id: shopkeepers[0],
            notes: None,
        };
        service.assign(&admin(), cmd(sellers[0])).await.unwrap();
        let err = service.assign(&admin(), cmd(sellers[1])).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn unknown_parties_are_not_found() {
        let store = Arc::new(InMemoryUserStore::new());
        let (sellers, _) = seed(&store, 1, 0).await;
        let service = AssignmentService::new(store, DEFAULT_MAX_SHOPKEEPERS_PER_SELLER);

        let err = service
            .assign(
                &admin(),
                AssignShopkeeper {
                    seller_id: sellers[0],
                    shopkeeper_id: ShopkeeperId::new(404),
                    notes: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { entity: "shopkeeper", .. }));
    }

    #[tokio::test]
    async fn soft_limit_only_warns() {
        let store = Arc::new(InMemoryUserStore::new());
        let (sellers, shopkeepers) = seed(&store, 1, 3).await;
        let service = AssignmentService::new(store, 2);

        for shopkeeper_id in shopkeepers {
            service
                .assign(
                    &admin(),
                    AssignShopkeeper {
                        seller_id: sellers[0],
                        shopkeeper_id,
                        notes: None,
                    },
                )
                .await
                .unwrap();
        }

        let active = service
            .list(&AssignmentQuery::new().active(true).seller(sellers[0]))
            .await
            .unwrap();
        assert_eq!(active.len(), 3);
    }

    #[tokio::test]
    async fn reassign_builds_history() {
        let store = Arc::new(InMemoryUserStore::new());
        let (sellers, shopkeepers) = seed(&store, 2, 1).await;
        let service = AssignmentService::new(store, DEFAULT_MAX_SHOPKEEPERS_PER_SELLER);

        let first = service
            .assign(
                &admin(),
                AssignShopkeeper {
                    seller_id: sellers[0],
                    shopkeeper_id: shopkeepers[0],
                    notes: None,
                },
            )
            .await
            .unwrap();
        let second = service
            .reassign(
                &admin(),
                Reassign {
                    shopkeeper_id: shopkeepers[0],
                    new_seller_id: sellers[1],
                    notes: Some("optimización de rutas".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(second.seller_name, "Vendedor 1");

        let history = service.history(shopkeepers[0]).await.unwrap();
        assert_eq!(history.total_assignments, 2);
        assert_eq!(history.assignments[0].assignment.id, second.assignment.id);

        let closed = &history.assignments[1].assignment;
        assert_eq!(closed.id, first.assignment.id);
        assert!(!closed.is_active);
        assert_eq!(closed.unassigned_by, Some(UserId::new(9)));
        assert!(closed.unassigned_at.is_some());
    }

    #[tokio::test]
    async fn reassign_without_active_assignment_is_not_found() {
        let store = Arc::new(InMemoryUserStore::new());
        let (sellers, shopkeepers) = seed(&store, 1, 1).await;
        let service = AssignmentService::new(store, DEFAULT_MAX_SHOPKEEPERS_PER_SELLER);

        let err = service
            .reassign(
                &admin(),
                Reassign {
                    shopkeeper_id: shopkeepers[0],
                    new_seller_id: sellers[0],
                    notes: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn unassign_frees_shopkeeper() {
        let store = Arc::new(InMemoryUserStore::new());
        let (sellers, shopkeepers) = seed(&store, 1, 1).await;
        let service = AssignmentService::new(store.clone(), DEFAULT_MAX_SHOPKEEPERS_PER_SELLER);

        let view = service
            .assign(
                &admin(),
                AssignShopkeeper {
                    seller_id: sellers[0],
                    shopkeeper_id: shopkeepers[0],
                    notes: None,
                },
            )
            .await
            .unwrap();
        service.unassign(&admin(), view.assignment.id).await.unwrap();
        service.unassign(&admin(), view.assignment.id).await.unwrap();

        assert!(store.active_assignment_for(shopkeepers[0]).await.unwrap().is_none());
        assert!(matches!(
            service.unassign(&admin(), AssignmentId::new(999)).await,
            Err(DomainError::NotFound { .. })
        ));
    }
}
