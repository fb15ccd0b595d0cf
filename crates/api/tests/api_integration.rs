//! Integration tests for the HTTP API over the in-memory store.

use std::sync::{Arc, OnceLock};

use api::auth::Claims;
use api::config::Config;
use api::state::AppState;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::{Duration, FixedOffset, Utc};
use domain::{InMemoryProductCatalog, InMemoryZoneDirectory};
use jsonwebtoken::{EncodingKey, Header};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{Value, json};
use store::InMemoryUserStore;
use tower::ServiceExt;

const PREFIX: &str = "/api/v1/users";
const SELLER_EMAIL: &str = "juan.perez@vendedor.com";

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            metrics_exporter_prometheus::PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

fn setup() -> Router {
    setup_with_catalog().0
}

/// The app plus the product catalog behind it, for tests that seed products.
fn setup_with_catalog() -> (Router, InMemoryProductCatalog) {
    let config = Config::default();
    let zones = Arc::new(InMemoryZoneDirectory::with_zones(5));
    let catalog = InMemoryProductCatalog::new();
    let state = Arc::new(AppState::new(
        Arc::new(InMemoryUserStore::new()),
        zones,
        Arc::new(catalog.clone()),
        &config,
    ));
    (api::create_app(state, &config, get_metrics_handle()), catalog)
}

fn token(email: &str, role: &str) -> String {
    let claims = Claims {
        sub: Some(email.to_string()),
        role: Some(role.to_string()),
        user_id: None,
        exp: Some((Utc::now() + Duration::hours(1)).timestamp() as u64),
    };
    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(Config::default().secret_key.as_bytes()),
    )
    .unwrap()
}

fn admin() -> String {
    token("admin@tienda.com", "ADMIN")
}

fn seller() -> String {
    token(SELLER_EMAIL, "VENDEDOR")
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn create_seller(app: &Router, email: &str) -> i64 {
    let (status, body) = send(
        app,
        "POST",
        &format!("{PREFIX}/sellers"),
        Some(&admin()),
        Some(json!({"name": "Juan Pérez", "email": email, "zone_id": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_i64().unwrap()
}

async fn create_shopkeeper(app: &Router, name: &str) -> i64 {
    create_shopkeeper_at(app, name, 4.6482, -74.0648).await
}

async fn create_shopkeeper_at(app: &Router, name: &str, latitude: f64, longitude: f64) -> i64 {
    let (status, body) = send(
        app,
        "POST",
        &format!("{PREFIX}/shopkeepers"),
        Some(&admin()),
        Some(json!({
            "name": name,
            "business_name": "Tienda La Esquina",
            "address": "Calle 45 #12-34, Bogotá",
            "latitude": latitude,
            "longitude": longitude
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_i64().unwrap()
}

async fn assign(app: &Router, seller_id: i64, shopkeeper_id: i64) -> (StatusCode, Value) {
    send(
        app,
        "POST",
        &format!("{PREFIX}/assign"),
        Some(&admin()),
        Some(json!({"seller_id": seller_id, "shopkeeper_id": shopkeeper_id})),
    )
    .await
}

/// Tomorrow at `hour`:00, Bogotá time.
fn tomorrow_at(hour: u32) -> String {
    let bogota = FixedOffset::west_opt(5 * 3600).unwrap();
    (Utc::now() + Duration::days(1))
        .with_timezone(&bogota)
        .date_naive()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
        .and_local_timezone(bogota)
        .unwrap()
        .to_rfc3339()
}

mod health {
    use super::*;

    #[tokio::test]
    async fn liveness_at_root() {
        let app = setup();
        let (status, body) = send(&app, "GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], Config::default().app_name);
    }

    #[tokio::test]
    async fn readiness_reports_database() {
        let app = setup();
        let (status, body) = send(&app, "GET", &format!("{PREFIX}/health"), None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["service"], "MS-USER");
        assert_eq!(body["database"], "connected");
    }

    #[tokio::test]
    async fn responses_carry_request_id() {
        let app = setup();
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn metrics_endpoint_renders() {
        let app = setup();
        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}

mod auth {
    use super::*;

    #[tokio::test]
    async fn missing_token_is_unauthorized() {
        let app = setup();
        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("{PREFIX}/sellers"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");
    }

    #[tokio::test]
    async fn forged_token_is_unauthorized() {
        let app = setup();
        let (status, _) = send(
            &app,
            "GET",
            &format!("{PREFIX}/sellers"),
            Some("not.a.token"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn any_authenticated_role_can_manage_sellers() {
        let app = setup();
        let (status, body) = send(
            &app,
            "POST",
            &format!("{PREFIX}/sellers"),
            Some(&seller()),
            Some(json!({"name": "Otro", "email": "otro@vendedor.com", "zone_id": 1})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");

        let shopkeeper = token("tienda@cliente.com", "TENDERO");
        let (status, _) = send(
            &app,
            "DELETE",
            &format!("{PREFIX}/sellers/{}", body["id"]),
            Some(&shopkeeper),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }
}

mod sellers {
    use super::*;

    #[tokio::test]
    async fn crud_round() {
        let app = setup();
        let id = create_seller(&app, "Juan.Perez@Vendedor.com").await;

        let (status, body) = send(
            &app,
            "GET",
            &format!("{PREFIX}/sellers/{id}"),
            Some(&seller()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["email"], SELLER_EMAIL);

        let (status, body) = send(
            &app,
            "PUT",
            &format!("{PREFIX}/sellers/{id}"),
            Some(&admin()),
            Some(json!({"phone": "+57 300 123 4567"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["phone"], "+57 300 123 4567");

        let (status, _) = send(
            &app,
            "DELETE",
            &format!("{PREFIX}/sellers/{id}"),
            Some(&admin()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, body) = send(&app, "GET", &format!("{PREFIX}/sellers"), Some(&admin()), None).await;
        assert_eq!(body.as_array().unwrap().len(), 0);

        let (_, body) = send(
            &app,
            "GET",
            &format!("{PREFIX}/sellers?is_active=false"),
            Some(&admin()),
            None,
        )
        .await;
        assert_eq!(body.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_email_and_unknown_zone() {
        let app = setup();
        create_seller(&app, SELLER_EMAIL).await;

        let (status, _) = send(
            &app,
            "POST",
            &format!("{PREFIX}/sellers"),
            Some(&admin()),
            Some(json!({"name": "Juan", "email": SELLER_EMAIL, "zone_id": 2})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            "POST",
            &format!("{PREFIX}/sellers"),
            Some(&admin()),
            Some(json!({"name": "Ana", "email": "ana@vendedor.com", "zone_id": 99})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn malformed_input_is_unprocessable() {
        let app = setup();
        let (status, _) = send(
            &app,
            "POST",
            &format!("{PREFIX}/sellers"),
            Some(&admin()),
            Some(json!({"name": "Sin correo"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = send(
            &app,
            "GET",
            &format!("{PREFIX}/sellers?limit=0"),
            Some(&admin()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = send(
            &app,
            "GET",
            &format!("{PREFIX}/sellers/abc"),
            Some(&admin()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }
}

mod assignments {
    use super::*;

    #[tokio::test]
    async fn assign_conflict_and_history() {
        let app = setup();
        let first = create_seller(&app, SELLER_EMAIL).await;
        let second = create_seller(&app, "maria@vendedor.com").await;
        let shopkeeper = create_shopkeeper(&app, "Pedro Gómez").await;

        let (status, body) = assign(&app, first, shopkeeper).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["shopkeeper_name"], "Pedro Gómez");

        let (status, _) = assign(&app, second, shopkeeper).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, body) = send(
            &app,
            "GET",
            &format!("{PREFIX}/shopkeepers/unassigned"),
            Some(&admin()),
            None,
        )
        .await;
        assert_eq!(body.as_array().unwrap().len(), 0);

        let (status, _) = send(
            &app,
            "POST",
            &format!("{PREFIX}/reassign"),
            Some(&admin()),
            Some(json!({"shopkeeper_id": shopkeeper, "new_seller_id": second})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(
            &app,
            "GET",
            &format!("{PREFIX}/assignments/history/{shopkeeper}"),
            Some(&admin()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_assignments"], 2);
    }

    #[tokio::test]
    async fn unassign_frees_the_shopkeeper() {
        let app = setup();
        let seller_id = create_seller(&app, SELLER_EMAIL).await;
        let shopkeeper = create_shopkeeper(&app, "Pedro Gómez").await;
        let (_, body) = assign(&app, seller_id, shopkeeper).await;
        let assignment = body["id"].as_i64().unwrap();

        let (status, _) = send(
            &app,
            "DELETE",
            &format!("{PREFIX}/assignments/{assignment}"),
            Some(&admin()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, body) = send(
            &app,
            "GET",
            &format!("{PREFIX}/shopkeepers?unassigned=true"),
            Some(&admin()),
            None,
        )
        .await;
        assert_eq!(body.as_array().unwrap().len(), 1);
    }
}

mod visits {
    use super::*;

    async fn assigned_pair(app: &Router) -> (i64, i64) {
        let seller_id = create_seller(app, SELLER_EMAIL).await;
        let shopkeeper = create_shopkeeper(app, "Pedro Gómez").await;
        let (status, _) = assign(app, seller_id, shopkeeper).await;
        assert_eq!(status, StatusCode::CREATED);
        (seller_id, shopkeeper)
    }

    async fn schedule(app: &Router, shopkeeper: i64, hour: u32) -> (StatusCode, Value) {
        send(
            app,
            "POST",
            &format!("{PREFIX}/visits"),
            Some(&seller()),
            Some(json!({"shopkeeper_id": shopkeeper, "scheduled_date": tomorrow_at(hour)})),
        )
        .await
    }

    #[tokio::test]
    async fn schedule_list_cancel() {
        let app = setup();
        let (seller_id, shopkeeper) = assigned_pair(&app).await;

        let (status, visit) = schedule(&app, shopkeeper, 10).await;
        assert_eq!(status, StatusCode::CREATED, "{visit}");
        assert_eq!(visit["status"], "pending");
        assert_eq!(visit["seller_id"], seller_id);
        let id = visit["id"].as_i64().unwrap();

        let (status, body) = send(&app, "GET", &format!("{PREFIX}/visits"), Some(&seller()), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 1);
        assert_eq!(body["pending"], 1);
        assert_eq!(body["visits"][0]["shopkeeper_name"], "Pedro Gómez");

        let (status, body) = send(
            &app,
            "PATCH",
            &format!("{PREFIX}/visits/{id}/cancel"),
            Some(&seller()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "cancelled");

        let (status, _) = send(
            &app,
            "PATCH",
            &format!("{PREFIX}/visits/{id}/complete"),
            Some(&seller()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, body) = send(
            &app,
            "GET",
            &format!("{PREFIX}/visits?status=cancelled"),
            Some(&admin()),
            None,
        )
        .await;
        assert_eq!(body["cancelled"], 1);
        assert_eq!(body["visits"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn outside_business_hours_is_rejected() {
        let app = setup();
        let (_, shopkeeper) = assigned_pair(&app).await;
        let (status, _) = schedule(&app, shopkeeper, 20).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn shopkeepers_cannot_list_visits() {
        let app = setup();
        let (status, _) = send(
            &app,
            "GET",
            &format!("{PREFIX}/visits"),
            Some(&token("tienda@correo.com", "TENDERO")),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn incidents_hang_off_visits() {
        let app = setup();
        let (seller_id, shopkeeper) = assigned_pair(&app).await;
        let (_, visit) = schedule(&app, shopkeeper, 9).await;
        let visit_id = visit["id"].as_i64().unwrap();

        let (status, incident) = send(
            &app,
            "POST",
            &format!("{PREFIX}/seller-incidents"),
            Some(&admin()),
            Some(json!({
                "visit_id": visit_id,
                "type": "delay",
                "description": "Llegó 40 minutos tarde",
                "incident_date": "2025-11-10"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{incident}");
        assert_eq!(incident["seller_id"], seller_id);
        assert_eq!(incident["shopkeeper_id"], shopkeeper);

        let (status, body) = send(
            &app,
            "GET",
            &format!("{PREFIX}/visits/{visit_id}/incidents"),
            Some(&seller()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["type"], "delay");

        let (status, _) = send(
            &app,
            "GET",
            &format!("{PREFIX}/seller-incidents?type=late"),
            Some(&admin()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let id = incident["id"].as_i64().unwrap();
        let (status, _) = send(
            &app,
            "DELETE",
            &format!("{PREFIX}/seller-incidents/{id}"),
            Some(&admin()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(
            &app,
            "GET",
            &format!("{PREFIX}/seller-incidents/{id}"),
            Some(&admin()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

mod routes {
    use super::*;

    #[tokio::test]
    async fn optimized_route_visits_nearest_first() {
        let app = setup();
        let seller_id = create_seller(&app, SELLER_EMAIL).await;
        let far = create_shopkeeper_at(&app, "Tienda Lejana", 4.70, -74.05).await;
        let near = create_shopkeeper_at(&app, "Tienda Cercana", 4.61, -74.07).await;
        for shopkeeper in [far, near] {
            let (status, _) = assign(&app, seller_id, shopkeeper).await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (status, body) = send(
            &app,
            "GET",
            &format!(
                "{PREFIX}/sellers/{seller_id}/optimized-route?start_latitude=4.60&start_longitude=-74.08"
            ),
            Some(&seller()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["algorithm_used"], "nearest_neighbor");
        assert_eq!(body["route_points"][0]["shopkeeper_id"], near);
        assert_eq!(body["route_points"][1]["shopkeeper_id"], far);
        assert_eq!(body["statistics"]["total_shopkeepers"], 2);
        assert!(body["statistics"]["total_distance_km"].as_f64().unwrap() > 0.0);

        let (status, body) = send(
            &app,
            "GET",
            &format!("{PREFIX}/routes/compare-algorithms?seller_id={seller_id}"),
            Some(&admin()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["algorithms"]["nearest_neighbor"]["num_stops"], 2);
        assert_eq!(body["algorithms"]["original_order"]["num_stops"], 2);
    }

    #[tokio::test]
    async fn seller_without_shopkeepers_has_no_route() {
        let app = setup();
        let seller_id = create_seller(&app, SELLER_EMAIL).await;

        let (status, _) = send(
            &app,
            "GET",
            &format!("{PREFIX}/sellers/{seller_id}/optimized-route"),
            Some(&admin()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(
            &app,
            "GET",
            &format!("{PREFIX}/routes/compare-algorithms?seller_id={seller_id}"),
            Some(&admin()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["algorithms"]["nearest_neighbor"]["num_stops"], 0);

        let (status, _) = send(
            &app,
            "GET",
            &format!("{PREFIX}/routes/compare-algorithms?seller_id=999"),
            Some(&admin()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

mod inventory {
    use super::*;

    async fn add_item(app: &Router, shopkeeper: i64, product: i64, stock: f64) -> (StatusCode, Value) {
        send(
            app,
            "POST",
            &format!("{PREFIX}/inventory"),
            Some(&admin()),
            Some(json!({
                "shopkeeper_id": shopkeeper,
                "product_id": product,
                "unit_price": 3500.0,
                "current_stock": stock
            })),
        )
        .await
    }

    #[tokio::test]
    async fn add_adjust_and_summarise() {
        let (app, catalog) = setup_with_catalog();
        catalog.add(1, "Arroz Diana 500g", "Granos");
        catalog.add(2, "Leche Alquería 1L", "Lácteos");
        let shopkeeper = create_shopkeeper(&app, "Pedro Gómez").await;

        let (status, item) = add_item(&app, shopkeeper, 1, 4.0).await;
        assert_eq!(status, StatusCode::CREATED, "{item}");
        assert_eq!(item["product_name"], "Arroz Diana 500g");
        assert_eq!(item["min_stock"], 10.0);
        let (status, _) = add_item(&app, shopkeeper, 2, 50.0).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, _) = add_item(&app, shopkeeper, 1, 1.0).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = add_item(&app, shopkeeper, 77, 1.0).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(
            &app,
            "GET",
            &format!("{PREFIX}/inventory/{shopkeeper}?low_stock_only=true"),
            Some(&seller()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["stock_status"], "low");
        assert_eq!(body[0]["category"], "Granos");

        let (status, body) = send(
            &app,
            "POST",
            &format!("{PREFIX}/inventory/{shopkeeper}/adjust-stock"),
            Some(&seller()),
            Some(json!({"product_id": 1, "quantity": 8, "notes": "Compra a proveedor"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["previous_stock"], 4.0);
        assert_eq!(body["new_stock"], 12.0);

        let (status, _) = send(
            &app,
            "POST",
            &format!("{PREFIX}/inventory/{shopkeeper}/adjust-stock"),
            Some(&seller()),
            Some(json!({"product_id": 1, "quantity": -20})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(
            &app,
            "GET",
            &format!("{PREFIX}/inventory/{shopkeeper}/summary"),
            Some(&seller()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_products"], 2);
        assert_eq!(body["low_stock_items"], 0);
        assert_eq!(body["total_value"], (12.0 + 50.0) * 3500.0);
    }

    #[tokio::test]
    async fn update_and_delete_by_row_id() {
        let (app, catalog) = setup_with_catalog();
        catalog.add(1, "Arroz Diana 500g", "Granos");
        let shopkeeper = create_shopkeeper(&app, "Pedro Gómez").await;
        let (_, item) = add_item(&app, shopkeeper, 1, 40.0).await;
        let id = item["id"].as_i64().unwrap();

        let (status, body) = send(
            &app,
            "PUT",
            &format!("{PREFIX}/inventory/{id}"),
            Some(&admin()),
            Some(json!({"min_stock": 50.0})),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["min_stock"], 50.0);

        let (_, body) = send(
            &app,
            "GET",
            &format!("{PREFIX}/inventory/low-stock/all"),
            Some(&admin()),
            None,
        )
        .await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["shopkeeper_name"], "Pedro Gómez");

        let (status, _) = send(
            &app,
            "DELETE",
            &format!("{PREFIX}/inventory/{id}"),
            Some(&admin()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(
            &app,
            "DELETE",
            &format!("{PREFIX}/inventory/{id}"),
            Some(&admin()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn available_products_follow_the_catalog() {
        let (app, catalog) = setup_with_catalog();
        catalog.add(1, "Arroz Diana 500g", "Granos");
        catalog.add(2, "Leche Alquería 1L", "Lácteos");

        let (status, body) = send(
            &app,
            "GET",
            &format!("{PREFIX}/inventory/products/available?category=Granos"),
            Some(&seller()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 1);
        assert_eq!(body["products"][0]["name"], "Arroz Diana 500g");

        catalog.set_unavailable(true);
        let (status, _) = send(
            &app,
            "GET",
            &format!("{PREFIX}/inventory/products/available"),
            Some(&seller()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn sellers_see_their_low_stock_shopkeepers() {
        let (app, catalog) = setup_with_catalog();
        catalog.add(1, "Arroz Diana 500g", "Granos");
        let seller_id = create_seller(&app, SELLER_EMAIL).await;
        let shopkeeper = create_shopkeeper(&app, "Pedro Gómez").await;
        let (status, _) = assign(&app, seller_id, shopkeeper).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, _) = add_item(&app, shopkeeper, 1, 2.0).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = send(
            &app,
            "GET",
            &format!("{PREFIX}/visits/shopkeepers/low-stock"),
            Some(&seller()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body[0]["shopkeeper_id"], shopkeeper);
        assert_eq!(body[0]["low_stock_count"], 1);

        let (status, body) = send(
            &app,
            "GET",
            &format!("{PREFIX}/visits/shopkeepers/{shopkeeper}/inventory-summary"),
            Some(&seller()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["low_stock_products"][0]["product_id"], 1);

        let tendero = token("tienda@correo.com", "TENDERO");
        let (status, _) = send(
            &app,
            "GET",
            &format!("{PREFIX}/visits/shopkeepers/low-stock"),
            Some(&tendero),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}
