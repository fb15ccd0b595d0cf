//! Integration tests for the field sales workflow.
//!
//! These tests drive the services together over one in-memory store: a seller
//! is registered, shopkeepers are assigned and moved, visits are scheduled and
//! closed, and incidents are recorded against them.

use std::sync::Arc;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use common::{IncidentKind, UserId, VisitStatus, ZoneId};
use domain::{
    Actor, AssignShopkeeper, AssignmentService, CancelVisit, CreateSeller, CreateShopkeeper,
    DomainError, IncidentService, InMemoryZoneDirectory, Reassign, RecordIncident, Role,
    ScheduleVisit, SellerService, ShopkeeperService, VisitFilter, VisitService,
};
use store::{InMemoryUserStore, Seller, Shopkeeper, ShopkeeperQuery};

struct Services {
    sellers: SellerService<InMemoryUserStore>,
    shopkeepers: ShopkeeperService<InMemoryUserStore>,
    assignments: AssignmentService<InMemoryUserStore>,
    visits: VisitService<InMemoryUserStore>,
    incidents: IncidentService<InMemoryUserStore>,
}

/// Helper to wire every service over one store
fn create_services() -> Services {
    let store = Arc::new(InMemoryUserStore::new());
    let zones = Arc::new(InMemoryZoneDirectory::with_zones(5));
    Services {
        sellers: SellerService::new(store.clone(), zones),
        shopkeepers: ShopkeeperService::new(store.clone()),
        assignments: AssignmentService::new(store.clone(), 2),
        visits: VisitService::new(store.clone()),
        incidents: IncidentService::new(store),
    }
}

fn admin() -> Actor {
    Actor::new("admin@example.com", Role::Admin, Some(UserId::new(1)))
}

async fn register_seller(services: &Services, email: &str, user_id: i64) -> Seller {
    services
        .sellers
        .create(CreateSeller {
            name: "Juan Pérez".to_string(),
            email: email.to_string(),
            phone: Some("3001234567".to_string()),
            address: None,
            zone_id: ZoneId::new(1),
            user_id: Some(UserId::new(user_id)),
        })
        .await
        .unwrap()
}

async fn register_shopkeeper(services: &Services, name: &str) -> Shopkeeper {
    services
        .shopkeepers
        .create(CreateShopkeeper {
            name: name.to_string(),
            business_name: None,
            address: "Calle 80 #12-34, Bogotá".to_string(),
            phone: None,
            email: None,
            latitude: 4.65,
            longitude: -74.06,
        })
        .await
        .unwrap()
}

/// Tomorrow at `hour`:00 in Bogotá (UTC-5).
fn tomorrow_at(hour: u32) -> DateTime<FixedOffset> {
    let bogota = FixedOffset::west_opt(5 * 3600).unwrap();
    let date = (Utc::now() + Duration::days(1))
        .with_timezone(&bogota)
        .date_naive();
    bogota
        .from_local_datetime(&date.and_hms_opt(hour, 0, 0).unwrap())
        .unwrap()
}

mod assignment_lifecycle {
    use super::*;

    #[tokio::test]
    async fn assign_reassign_and_history() {
        let services = create_services();
        let juan = register_seller(&services, "juan@vendedor.com", 10).await;
        let maria = register_seller(&services, "maria@vendedor.com", 11).await;
        let tienda = register_shopkeeper(&services, "Tienda El Buen Sabor").await;

        services
            .assignments
            .assign(
                &admin(),
                AssignShopkeeper {
                    seller_id: juan.id,
                    shopkeeper_id: tienda.id,
                    notes: None,
                },
            )
            .await
            .unwrap();

        // The shopkeeper is now taken.
        let err = services
            .assignments
            .assign(
                &admin(),
                AssignShopkeeper {
                    seller_id: maria.id,
                    shopkeeper_id: tienda.id,
                    notes: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));

        let moved = services
            .assignments
            .reassign(
                &admin(),
                Reassign {
                    shopkeeper_id: tienda.id,
                    new_seller_id: maria.id,
                    notes: Some("Cambio de ruta".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(moved.seller_name, maria.name);

        let history = services.assignments.history(tienda.id).await.unwrap();
        assert_eq!(history.total_assignments, 2);
        assert!(history.assignments[0].assignment.is_active);
        assert_eq!(history.assignments[0].assignment.seller_id, maria.id);
        assert!(!history.assignments[1].assignment.is_active);
        assert!(history.assignments[1].assignment.unassigned_at.is_some());

        let view = services.shopkeepers.get(tienda.id).await.unwrap();
        assert_eq!(view.seller_id, Some(maria.id));

        let summaries = services
            .sellers
            .list(&store::SellerQuery::new().active(true))
            .await
            .unwrap();
        let totals: Vec<_> = summaries
            .iter()
            .map(|s| (s.seller.id, s.total_shopkeepers))
            .collect();
        assert_eq!(totals, vec![(juan.id, 0), (maria.id, 1)]);
    }

    #[tokio::test]
    async fn soft_limit_does_not_block_assignment() {
        let services = create_services();
        let juan = register_seller(&services, "juan@vendedor.com", 10).await;

        for i in 0..3 {
            let tienda = register_shopkeeper(&services, &format!("Tienda {i}")).await;
            services
                .assignments
                .assign(
                    &admin(),
                    AssignShopkeeper {
                        seller_id: juan.id,
                        shopkeeper_id: tienda.id,
                        notes: None,
                    },
                )
                .await
                .unwrap();
        }

        let assigned = services
            .shopkeepers
            .list(&ShopkeeperQuery::new().assigned_to(juan.id))
            .await
            .unwrap();
        assert_eq!(assigned.len(), 3);
        assert!(services.shopkeepers.unassigned().await.unwrap().is_empty());
    }
}

mod visit_lifecycle {
    use super::*;

    #[tokio::test]
    async fn schedule_cancel_and_record_incident() {
        let services = create_services();
        let juan = register_seller(&services, "juan@vendedor.com", 10).await;
        let tienda = register_shopkeeper(&services, "Tienda El Buen Sabor").await;
        services
            .assignments
            .assign(
                &admin(),
                AssignShopkeeper {
                    seller_id: juan.id,
                    shopkeeper_id: tienda.id,
                    notes: None,
                },
            )
            .await
            .unwrap();

        let caller = Actor::new("juan@vendedor.com", Role::Seller, Some(UserId::new(10)));
        let first = services
            .visits
            .schedule(
                &caller,
                ScheduleVisit {
                    shopkeeper_id: tienda.id,
                    scheduled_date: tomorrow_at(9),
                    reason: Some("Toma de pedido".to_string()),
                    notes: None,
                },
            )
            .await
            .unwrap();
        let second = services
            .visits
            .schedule(
                &caller,
                ScheduleVisit {
                    shopkeeper_id: tienda.id,
                    scheduled_date: tomorrow_at(18),
                    reason: None,
                    notes: None,
                },
            )
            .await
            .unwrap();

        services
            .visits
            .cancel(
                &caller,
                second.id,
                CancelVisit {
                    cancelled_reason: Some("Tienda cerrada".to_string()),
                },
            )
            .await
            .unwrap();

        let list = services
            .visits
            .list(&caller, VisitFilter::default())
            .await
            .unwrap();
        assert_eq!(list.total, 2);
        assert_eq!(list.pending, 1);
        assert_eq!(list.cancelled, 1);
        assert_eq!(list.visits[0].visit.id, first.id);

        let pending_only = services
            .visits
            .list(
                &admin(),
                VisitFilter {
                    status: Some(VisitStatus::Pending),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(pending_only.visits.len(), 1);

        let incident = services
            .incidents
            .record(RecordIncident {
                seller_id: None,
                shopkeeper_id: None,
                visit_id: Some(second.id),
                kind: IncidentKind::Absence,
                description: None,
                incident_date: NaiveDate::from_ymd_opt(2025, 11, 15).unwrap(),
            })
            .await
            .unwrap();
        assert_eq!(incident.seller_id, juan.id);

        let listed = services
            .incidents
            .list(&store::IncidentQuery {
                kind: Some(IncidentKind::Absence),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].visit_status, Some(VisitStatus::Cancelled));
    }

    #[tokio::test]
    async fn reassigned_shopkeeper_is_out_of_reach_for_previous_seller() {
        let services = create_services();
        let juan = register_seller(&services, "juan@vendedor.com", 10).await;
        let maria = register_seller(&services, "maria@vendedor.com", 11).await;
        let tienda = register_shopkeeper(&services, "Tienda El Buen Sabor").await;
        services
            .assignments
            .assign(
                &admin(),
                AssignShopkeeper {
                    seller_id: juan.id,
                    shopkeeper_id: tienda.id,
                    notes: None,
                },
            )
            .await
            .unwrap();
        services
            .assignments
            .reassign(
                &admin(),
                Reassign {
                    shopkeeper_id: tienda.id,
                    new_seller_id: maria.id,
                    notes: None,
                },
            )
            .await
            .unwrap();

        let juan_caller = Actor::new("juan@vendedor.com", Role::Seller, Some(UserId::new(10)));
        let err = services
            .visits
            .schedule(
                &juan_caller,
                ScheduleVisit {
                    shopkeeper_id: tienda.id,
                    scheduled_date: tomorrow_at(10),
                    reason: None,
                    notes: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
    }
}
