//! Incidents recorded against sellers, optionally tied to a visit.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use common::{IncidentId, IncidentKind, SellerId, ShopkeeperId, VisitId, VisitStatus};
use serde::{Deserialize, Serialize};
use store::{IncidentQuery, NewIncident, SellerIncident, UserStore, UserStoreExt};

use crate::error::{DomainError, ValidationError};
use crate::validation;

/// Command to record an incident. Needs a seller, a visit, or both.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordIncident {
    #[serde(default)]
    pub seller_id: Option<SellerId>,
    #[serde(default)]
    pub shopkeeper_id: Option<ShopkeeperId>,
    #[serde(default)]
    pub visit_id: Option<VisitId>,
    #[serde(rename = "type")]
    pub kind: IncidentKind,
    #[serde(default)]
    pub description: Option<String>,
    pub incident_date: NaiveDate,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateIncident {
    pub seller_id: Option<SellerId>,
    pub shopkeeper_id: Option<ShopkeeperId>,
    pub visit_id: Option<VisitId>,
    #[serde(rename = "type")]
    pub kind: Option<IncidentKind>,
    pub description: Option<String>,
    pub incident_date: Option<NaiveDate>,
}

/// An incident with the names and visit details a reviewer needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IncidentView {
    #[serde(flatten)]
    pub incident: SellerIncident,
    pub seller_name: Option<String>,
    pub shopkeeper_name: Option<String>,
    pub shopkeeper_business_name: Option<String>,
    pub visit_scheduled_date: Option<DateTime<Utc>>,
    pub visit_status: Option<VisitStatus>,
}

/// The seller, shopkeeper and visit an incident ends up linked to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Links {
    seller_id: SellerId,
    shopkeeper_id: Option<ShopkeeperId>,
    visit_id: Option<VisitId>,
}

/// Service for recording and reviewing seller incidents.
pub struct IncidentService<S: UserStore> {
    store: Arc<S>,
}

impl<S: UserStore> IncidentService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Fills missing ids from the visit, checks given ids agree with it and
    /// that every referenced row exists.
    async fn resolve_links(
        &self,
        seller_id: Option<SellerId>,
        shopkeeper_id: Option<ShopkeeperId>,
        visit_id: Option<VisitId>,
    ) -> Result<Links, DomainError> {
        for (field, id) in [
            ("seller_id", seller_id.map(|id| id.get())),
            ("shopkeeper_id", shopkeeper_id.map(|id| id.get())),
            ("visit_id", visit_id.map(|id| id.get())),
        ] {
            if let Some(raw) = id {
                validation::positive_id(field, raw)?;
            }
        }

        let (seller_id, shopkeeper_id) = match visit_id {
            Some(visit_id) => {
                let visit = self.store.require_visit(visit_id).await?;
                let seller_id = seller_id.unwrap_or(visit.seller_id);
                if seller_id != visit.seller_id {
                    return Err(DomainError::Rejected(format!(
                        "seller_id {seller_id} does not match visit {visit_id}"
                    )));
                }
                let shopkeeper_id = shopkeeper_id.unwrap_or(visit.shopkeeper_id);
                if shopkeeper_id != visit.shopkeeper_id {
                    return Err(DomainError::Rejected(format!(
                        "shopkeeper_id {shopkeeper_id} does not match visit {visit_id}"
                    )));
                }
                (seller_id, Some(shopkeeper_id))
            }
            None => {
                let seller_id = seller_id.ok_or(ValidationError::Required {
                    what: "seller_id or visit_id",
                })?;
                (seller_id, shopkeeper_id)
            }
        };

        self.store.require_seller(seller_id).await?;
        if let Some(shopkeeper_id) = shopkeeper_id {
            self.store.require_shopkeeper(shopkeeper_id).await?;
        }

        Ok(Links {
            seller_id,
            shopkeeper_id,
            visit_id,
        })
    }

    async fn view(&self, incident: SellerIncident) -> Result<IncidentView, DomainError> {
        let seller = self.store.get_seller(incident.seller_id).await?;
        let shopkeeper = match incident.shopkeeper_id {
            Some(id) => self.store.get_shopkeeper(id).await?,
            None => None,
        };
        let visit = match incident.visit_id {
            Some(id) => self.store.get_visit(id).await?,
            None => None,
        };

        Ok(IncidentView {
            seller_name: seller.map(|s| s.name),
            shopkeeper_name: shopkeeper.as_ref().map(|s| s.name.clone()),
            shopkeeper_business_name: shopkeeper.and_then(|s| s.business_name),
            visit_scheduled_date: visit.as_ref().map(|v| v.scheduled_date),
            visit_status: visit.map(|v| v.status),
            incident,
        })
    }

    async fn load(&self, id: IncidentId) -> Result<SellerIncident, DomainError> {
        self.store
            .get_incident(id)
            .await?
            .ok_or_else(|| DomainError::not_found("incident", id))
    }

    /// Lists incidents newest first, with details.
    #[tracing::instrument(skip(self))]
    pub async fn list(&self, query: &IncidentQuery) -> Result<Vec<IncidentView>, DomainError> {
        let incidents = self.store.list_incidents(query).await?;
        let mut views = Vec::with_capacity(incidents.len());
        for incident in incidents {
            views.push(self.view(incident).await?);
        }
        Ok(views)
    }

    #[tracing::instrument(skip(self, cmd), fields(kind = %cmd.kind))]
    pub async fn record(&self, cmd: RecordIncident) -> Result<SellerIncident, DomainError> {
        let links = self
            .resolve_links(cmd.seller_id, cmd.shopkeeper_id, cmd.visit_id)
            .await?;

        let incident = self
            .store
            .insert_incident(NewIncident {
                seller_id: links.seller_id,
                shopkeeper_id: links.shopkeeper_id,
                visit_id: links.visit_id,
                kind: cmd.kind,
                description: cmd.description,
                incident_date: cmd.incident_date,
            })
            .await?;

        tracing::info!(
            incident_id = %incident.id,
            seller_id = %incident.seller_id,
            "incident recorded"
        );
        Ok(incident)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get(&self, id: IncidentId) -> Result<IncidentView, DomainError> {
        let incident = self.load(id).await?;
        self.view(incident).await
    }

    /// Applies a partial update. A newly given visit must belong to the
    /// resulting seller; the shopkeeper is only checked for existence.
    #[tracing::instrument(skip(self, cmd))]
    pub async fn update(
        &self,
        id: IncidentId,
        cmd: UpdateIncident,
    ) -> Result<SellerIncident, DomainError> {
        let mut incident = self.load(id).await?;

        if let Some(visit_id) = cmd.visit_id {
            validation::positive_id("visit_id", visit_id.get())?;
            let visit = self.store.require_visit(visit_id).await?;
            let seller_id = cmd.seller_id.unwrap_or(incident.seller_id);
            if seller_id != visit.seller_id {
                return Err(DomainError::Rejected(format!(
                    "seller_id {seller_id} does not match visit {visit_id}"
                )));
            }
            incident.visit_id = Some(visit_id);
        }
        if let Some(seller_id) = cmd.seller_id {
            validation::positive_id("seller_id", seller_id.get())?;
            self.store.require_seller(seller_id).await?;
            incident.seller_id = seller_id;
        }
        if let Some(shopkeeper_id) = cmd.shopkeeper_id {
            validation::positive_id("shopkeeper_id", shopkeeper_id.get())?;
            self.store.require_shopkeeper(shopkeeper_id).await?;
            incident.shopkeeper_id = Some(shopkeeper_id);
        }

        if let Some(kind) = cmd.kind {
            incident.kind = kind;
        }
        if let Some(description) = cmd.description {
            incident.description = Some(description);
        }
        if let Some(incident_date) = cmd.incident_date {
            incident.incident_date = incident_date;
        }

        Ok(self.store.update_incident(&incident).await?)
    }

    /// Removes the incident for good.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: IncidentId) -> Result<(), DomainError> {
        if !self.store.delete_incident(id).await? {
            return Err(DomainError::not_found("incident", id));
        }
        tracing::info!(incident_id = %id, "incident deleted");
        Ok(())
    }

    /// Incidents of one visit, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn for_visit(&self, visit_id: VisitId) -> Result<Vec<SellerIncident>, DomainError> {
        self.store.require_visit(visit_id).await?;
        Ok(self
            .store
            .list_incidents(&IncidentQuery::for_visit(visit_id))
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use common::ZoneId;
    use store::{InMemoryUserStore, NewSeller, NewShopkeeper, NewVisit, Visit};

    use super::*;

    struct Fixture {
        service: IncidentService<InMemoryUserStore>,
        seller: SellerId,
        other_seller: SellerId,
        shopkeeper: ShopkeeperId,
        visit: Visit,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(InMemoryUserStore::new());
        let mut sellers = Vec::new();
        for email in ["juan@vendedor.com", "maria@vendedor.com"] {
            let seller = store
                .insert_seller(NewSeller {
                    name: "Vendedor".to_string(),
                    email: email.to_string(),
                    phone: None,
                    address: None,
                    zone_id: ZoneId::new(1),
                    user_id: None,
                })
                .await
                .unwrap();
            sellers.push(seller.id);
        }
        let shopkeeper = store
            .insert_shopkeeper(NewShopkeeper {
                name: "Tienda Don José".to_string(),
                business_name: Some("Minimercado Don José".to_string()),
                address: "Carrera 15 #80-20".to_string(),
                phone: None,
                email: None,
                latitude: 4.67,
                longitude: -74.05,
            })
            .await
            .unwrap();
        let visit = store
            .insert_visit(NewVisit {
                seller_id: sellers[0],
                shopkeeper_id: shopkeeper.id,
                scheduled_date: Utc::now() + Duration::days(1),
                reason: None,
                notes: None,
            })
            .await
            .unwrap();

        Fixture {
            service: IncidentService::new(store),
            seller: sellers[0],
            other_seller: sellers[1],
            shopkeeper: shopkeeper.id,
            visit,
        }
    }

    fn record_cmd() -> RecordIncident {
        RecordIncident {
            seller_id: None,
            shopkeeper_id: None,
            visit_id: None,
            kind: IncidentKind::Delay,
            description: Some("Llegó 30 minutos tarde".to_string()),
            incident_date: NaiveDate::from_ymd_opt(2025, 11, 15).unwrap(),
        }
    }

    #[tokio::test]
    async fn visit_fills_missing_links() {
        let fx = fixture().await;
        let incident = fx
            .service
            .record(RecordIncident {
                visit_id: Some(fx.visit.id),
                ..record_cmd()
            })
            .await
            .unwrap();

        assert_eq!(incident.seller_id, fx.seller);
        assert_eq!(incident.shopkeeper_id, Some(fx.shopkeeper));

        let view = fx.service.get(incident.id).await.unwrap();
        assert_eq!(
            view.shopkeeper_business_name.as_deref(),
            Some("Minimercado Don José")
        );
        assert_eq!(view.visit_status, Some(VisitStatus::Pending));
    }

    #[tokio::test]
    async fn seller_or_visit_is_required() {
        let fx = fixture().await;
        let err = fx.service.record(record_cmd()).await.unwrap_err();
        assert!(matches!(
            err,
            DomainError::Validation(ValidationError::Required { .. })
        ));
    }

    #[tokio::test]
    async fn mismatched_seller_is_rejected() {
        let fx = fixture().await;
        let err = fx
            .service
            .record(RecordIncident {
                seller_id: Some(fx.other_seller),
                visit_id: Some(fx.visit.id),
                ..record_cmd()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Rejected(_)));
    }

    #[tokio::test]
    async fn unknown_references_are_not_found() {
        let fx = fixture().await;
        for cmd in [
            RecordIncident {
                seller_id: Some(SellerId::new(99)),
                ..record_cmd()
            },
            RecordIncident {
                seller_id: Some(fx.seller),
                shopkeeper_id: Some(ShopkeeperId::new(99)),
                ..record_cmd()
            },
            RecordIncident {
                visit_id: Some(VisitId::new(99)),
                ..record_cmd()
            },
        ] {
            assert!(matches!(
                fx.service.record(cmd).await,
                Err(DomainError::NotFound { .. })
            ));
        }
    }

    #[tokio::test]
    async fn update_checks_seller_against_a_new_visit() {
        let fx = fixture().await;
        let incident = fx
            .service
            .record(RecordIncident {
                seller_id: Some(fx.other_seller),
                ..record_cmd()
            })
            .await
            .unwrap();

        let err = fx
            .service
            .update(
                incident.id,
                UpdateIncident {
                    visit_id: Some(fx.visit.id),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Rejected(_)));

        let updated = fx
            .service
            .update(
                incident.id,
                UpdateIncident {
                    seller_id: Some(fx.seller),
                    visit_id: Some(fx.visit.id),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.seller_id, fx.seller);
        assert_eq!(updated.visit_id, Some(fx.visit.id));
    }

    #[tokio::test]
    async fn update_only_checks_shopkeeper_exists() {
        let fx = fixture().await;
        let other_shopkeeper = fx
            .service
            .store
            .insert_shopkeeper(NewShopkeeper {
                name: "Tienda La Esquina".to_string(),
                business_name: None,
                address: "Calle 50 #10-12".to_string(),
                phone: None,
                email: None,
                latitude: 4.65,
                longitude: -74.06,
            })
            .await
            .unwrap();
        let incident = fx
            .service
            .record(RecordIncident {
                visit_id: Some(fx.visit.id),
                ..record_cmd()
            })
            .await
            .unwrap();

        let updated = fx
            .service
            .update(
                incident.id,
                UpdateIncident {
                    shopkeeper_id: Some(other_shopkeeper.id),
                    kind: Some(IncidentKind::Absence),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.shopkeeper_id, Some(other_shopkeeper.id));
        assert_eq!(updated.kind, IncidentKind::Absence);
        assert_eq!(updated.visit_id, Some(fx.visit.id));

        // Another visit of the same seller, to a different shopkeeper.
        let other_visit = fx
            .service
            .store
            .insert_visit(NewVisit {
                seller_id: fx.seller,
                shopkeeper_id: other_shopkeeper.id,
                scheduled_date: Utc::now() + Duration::days(2),
                reason: None,
                notes: None,
            })
            .await
            .unwrap();
        let moved = fx
            .service
            .update(
                incident.id,
                UpdateIncident {
                    shopkeeper_id: Some(fx.shopkeeper),
                    visit_id: Some(other_visit.id),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(moved.visit_id, Some(other_visit.id));
        assert_eq!(moved.shopkeeper_id, Some(fx.shopkeeper));

        let err = fx
            .service
            .update(
                incident.id,
                UpdateIncident {
                    shopkeeper_id: Some(ShopkeeperId::new(99)),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn delete_is_final() {
        let fx = fixture().await;
        let incident = fx
            .service
            .record(RecordIncident {
                seller_id: Some(fx.seller),
                ..record_cmd()
            })
            .await
            .unwrap();

        fx.service.delete(incident.id).await.unwrap();
        assert!(matches!(
            fx.service.delete(incident.id).await,
            Err(DomainError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn visit_incidents_require_the_visit() {
        let fx = fixture().await;
        fx.service
            .record(RecordIncident {
                visit_id: Some(fx.visit.id),
                ..record_cmd()
            })
            .await
            .unwrap();

        assert_eq!(fx.service.for_visit(fx.visit.id).await.unwrap().len(), 1);
        assert!(matches!(
            fx.service.for_visit(VisitId::new(42)).await,
            Err(DomainError::NotFound { .. })
        ));
    }
}
