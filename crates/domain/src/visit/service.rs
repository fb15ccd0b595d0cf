//! Visit scheduling service.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};
use common::{SellerId, ShopkeeperId, VisitId, VisitStatus};
use serde::{Deserialize, Serialize};
use store::{
    DEFAULT_VISIT_REASON, NewVisit, Page, Seller, UserStore, UserStoreExt, Visit, VisitCounts,
    VisitQuery,
};

use super::schedule::validate_schedule;
use super::state::{VisitTransition, can_edit};
use crate::actor::{Actor, Role};
use crate::error::DomainError;
use crate::validation;

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleVisit {
    pub shopkeeper_id: ShopkeeperId,
    /// Must carry a UTC offset; its wall-clock time is checked against business hours.
    pub scheduled_date: DateTime<FixedOffset>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateVisit {
    pub scheduled_date: Option<DateTime<FixedOffset>>,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CancelVisit {
    #[serde(default)]
    pub cancelled_reason: Option<String>,
}

/// Listing filters. `seller_id` is only honoured for administrators.
#[derive(Debug, Clone, Default)]
pub struct VisitFilter {
    pub status: Option<VisitStatus>,
    pub shopkeeper_id: Option<ShopkeeperId>,
    pub seller_id: Option<SellerId>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub page: Page,
}

/// A visit with the seller's name and the shopkeeper's contact details.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisitView {
    #[serde(flatten)]
    pub visit: Visit,
    pub seller_name: String,
    pub shopkeeper_name: String,
    pub shopkeeper_business_name: Option<String>,
    pub shopkeeper_address: String,
    pub shopkeeper_phone: Option<String>,
    pub shopkeeper_email: Option<String>,
}

/// One page of visits plus per-status totals over the whole filter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisitList {
    pub visits: Vec<VisitView>,
    pub total: i64,
    pub pending: i64,
    pub completed: i64,
    pub cancelled: i64,
}

impl VisitList {
    fn new(visits: Vec<VisitView>, counts: VisitCounts) -> Self {
        Self {
            visits,
            total: counts.total,
            pending: counts.pending,
            completed: counts.completed,
            cancelled: counts.cancelled,
        }
    }

    fn empty() -> Self {
        Self::new(Vec::new(), VisitCounts::default())
    }
}

/// Service for scheduling and tracking visits.
pub struct VisitService<S: UserStore> {
    pub(super) store: Arc<S>,
}

impl<S: UserStore> VisitService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Finds the seller record behind a `VENDEDOR` caller, by user id first
    /// and then by email. Other roles never resolve.
    pub async fn resolve_seller(&self, actor: &Actor) -> Result<Option<Seller>, DomainError> {
        if actor.role != Role::Seller {
            return Ok(None);
        }

        if let Some(user_id) = actor.user_id
            && let Some(seller) = self.store.find_seller_by_user(user_id).await?
        {
            return Ok(Some(seller));
        }

        let email = actor.email.trim().to_lowercase();
        if email.is_empty() {
            return Ok(None);
        }
        Ok(self.store.find_seller_by_email(&email).await?)
    }

    async fn require_seller(&self, actor: &Actor) -> Result<Seller, DomainError> {
        self.resolve_seller(actor).await?.ok_or_else(|| {
            DomainError::Forbidden("No seller is linked to this account".to_string())
        })
    }

    /// Loads a visit owned by `seller`; someone else's visit reads as missing.
    async fn own_visit(&self, seller: &Seller, id: VisitId) -> Result<Visit, DomainError> {
        match self.store.get_visit(id).await? {
            Some(visit) if visit.seller_id == seller.id => Ok(visit),
            _ => Err(DomainError::not_found("visit", id)),
        }
    }

    async fn view(&self, visit: Visit) -> Result<VisitView, DomainError> {
        let seller = self.store.require_seller(visit.seller_id).await?;
        let shopkeeper = self.store.require_shopkeeper(visit.shopkeeper_id).await?;
        Ok(VisitView {
            visit,
            seller_name: seller.name,
            shopkeeper_name: shopkeeper.name,
            shopkeeper_business_name: shopkeeper.business_name,
            shopkeeper_address: shopkeeper.address,
            shopkeeper_phone: shopkeeper.phone,
            shopkeeper_email: shopkeeper.email,
        })
    }

    /// Lists visits visible to the caller, ordered by scheduled date.
    ///
    /// Sellers only see their own visits; administrators see all of them and
    /// may narrow by seller. Shopkeepers and unknown roles are refused.
    #[tracing::instrument(skip(self, actor), fields(role = %actor.role))]
    pub async fn list(&self, actor: &Actor, filter: VisitFilter) -> Result<VisitList, DomainError> {
        let seller_id = match &actor.role {
            Role::Admin => filter.seller_id,
            Role::Seller => match self.resolve_seller(actor).await? {
                Some(seller) => Some(seller.id),
                None => return Ok(VisitList::empty()),
            },
            Role::Shopkeeper => {
                return Err(DomainError::Forbidden(
                    "Shopkeepers cannot list visits".to_string(),
                ));
            }
            Role::Other(label) => {
                tracing::warn!(role = %label, "visit listing refused for unknown role");
                return Err(DomainError::Forbidden(
                    "Your role cannot list visits".to_string(),
                ));
            }
        };

        let mut query = VisitQuery::new()
            .between(filter.from, filter.to)
            .page(filter.page);
        query.seller_id = seller_id;
        query.shopkeeper_id = filter.shopkeeper_id;
        query.status = filter.status;

        let counts = self.store.count_visits(&query).await?;
        let visits = self.store.list_visits(&query).await?;

        let mut views = Vec::with_capacity(visits.len());
        for visit in visits {
            views.push(self.view(visit).await?);
        }
        Ok(VisitList::new(views, counts))
    }

    /// Reads one visit. Sellers may only read their own.
    #[tracing::instrument(skip(self, actor))]
    pub async fn get(&self, actor: &Actor, id: VisitId) -> Result<VisitView, DomainError> {
        let visit = self
            .store
            .get_visit(id)
            .await?
            .ok_or_else(|| DomainError::not_found("visit", id))?;

        if actor.role == Role::Seller {
            let owns = self
                .resolve_seller(actor)
                .await?
                .is_some_and(|seller| seller.id == visit.seller_id);
            if !owns {
                return Err(DomainError::Forbidden(
                    "You do not have access to this visit".to_string(),
                ));
            }
        }

        self.view(visit).await
    }

    /// Schedules a visit from the calling seller to one of their shopkeepers.
    #[tracing::instrument(skip(self, actor, cmd), fields(shopkeeper_id = %cmd.shopkeeper_id))]
    pub async fn schedule(&self, actor: &Actor, cmd: ScheduleVisit) -> Result<Visit, DomainError> {
        self.schedule_at(actor, cmd, Utc::now()).await
    }

    /// As [`schedule`](Self::schedule), with an explicit clock.
    pub async fn schedule_at(
        &self,
        actor: &Actor,
        cmd: ScheduleVisit,
        now: DateTime<Utc>,
    ) -> Result<Visit, DomainError> {
        if actor.role != Role::Seller {
            return Err(DomainError::Forbidden(
                "Only sellers can schedule visits".to_string(),
            ));
        }
        let seller = self.require_seller(actor).await?;

        validation::positive_id("shopkeeper_id", cmd.shopkeeper_id.get())?;
        validation::max_len("reason", cmd.reason.as_deref(), validation::REASON_MAX)?;

        let shopkeeper = self.store.require_shopkeeper(cmd.shopkeeper_id).await?;
        if !self.store.is_assigned(seller.id, shopkeeper.id).await? {
            return Err(DomainError::Forbidden(
                "The shopkeeper is not assigned to you".to_string(),
            ));
        }

        let scheduled_date = validate_schedule(cmd.scheduled_date, now)?;
        let reason = cmd
            .reason
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_VISIT_REASON.to_string());

        let visit = self
            .store
            .insert_visit(NewVisit {
                seller_id: seller.id,
                shopkeeper_id: shopkeeper.id,
                scheduled_date,
                reason: Some(reason),
                notes: cmd.notes,
            })
            .await?;

        tracing::info!(visit_id = %visit.id, seller_id = %seller.id, "visit scheduled");
        Ok(visit)
    }

    /// Edits one of the caller's pending visits.
    #[tracing::instrument(skip(self, actor, cmd))]
    pub async fn update(
        &self,
        actor: &Actor,
        id: VisitId,
        cmd: UpdateVisit,
    ) -> Result<Visit, DomainError> {
        let seller = self.require_seller(actor).await?;
        let mut visit = self.own_visit(&seller, id).await?;

        if !can_edit(visit.status) {
            return Err(DomainError::InvalidTransition {
                current: visit.status,
                action: "update",
            });
        }

        if let Some(date) = cmd.scheduled_date {
            visit.scheduled_date = validate_schedule(date, Utc::now())?;
        }
        if let Some(reason) = cmd.reason {
            validation::max_len("reason", Some(reason.as_str()), validation::REASON_MAX)?;
            visit.reason = Some(reason);
        }
        if let Some(notes) = cmd.notes {
            visit.notes = Some(notes);
        }

        Ok(self.store.update_visit(&visit).await?)
    }

    #[tracing::instrument(skip(self, actor, cmd))]
    pub async fn cancel(
        &self,
        actor: &Actor,
        id: VisitId,
        cmd: CancelVisit,
    ) -> Result<Visit, DomainError> {
        self.transition(actor, id, VisitTransition::Cancel, cmd.cancelled_reason)
            .await
    }

    #[tracing::instrument(skip(self, actor))]
    pub async fn complete(&self, actor: &Actor, id: VisitId) -> Result<Visit, DomainError> {
        self.transition(actor, id, VisitTransition::Complete, None)
            .await
    }

    async fn transition(
        &self,
        actor: &Actor,
        id: VisitId,
        transition: VisitTransition,
        cancelled_reason: Option<String>,
    ) -> Result<Visit, DomainError> {
        let seller = self.require_seller(actor).await?;
        let mut visit = self.own_visit(&seller, id).await?;

        visit.status = transition.apply(visit.status)?;
        let now = Utc::now();
        match transition {
            VisitTransition::Complete => visit.completed_at = Some(now),
            VisitTransition::Cancel => {
                visit.cancelled_at = Some(now);
                visit.cancelled_reason = cancelled_reason;
            }
        }

        let visit = self.store.update_visit(&visit).await?;
        metrics::counter!("users_visit_transitions_total", "to" => visit.status.as_str())
            .increment(1);
        tracing::info!(visit_id = %visit.id, status = %visit.status, "visit status changed");
        Ok(visit)
    }
}
