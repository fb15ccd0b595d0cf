//! HTTP surface of the user management service.
//!
//! Serves sellers, shopkeepers, their assignments, visits, seller incidents,
//! shopkeeper inventories and route plans under a configurable prefix, with bearer token auth, structured
//! logging (tracing) and Prometheus metrics. Also hosts the container health
//! probe used by the `healthcheck` and `monitor` commands.

pub mod auth;
pub mod clients;
pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod probe;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::http::HeaderValue;
use axum::routing::{get, patch, post};
use metrics_exporter_prometheus::PrometheusHandle;
use store::UserStore;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use state::AppState;

/// Creates the application router.
///
/// Business routes live under `config.api_prefix`; `/health` and `/metrics`
/// stay at the root.
pub fn create_app<S: UserStore + 'static>(
    state: Arc<AppState<S>>,
    config: &Config,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::scrape))
        .with_state(metrics_handle);

    let api = Router::new()
        .route("/health", get(routes::health::ready::<S>))
        .route(
            "/sellers",
            post(routes::sellers::create::<S>).get(routes::sellers::list::<S>),
        )
        .route(
            "/sellers/{id}",
            get(routes::sellers::get::<S>)
                .put(routes::sellers::update::<S>)
                .delete(routes::sellers::deactivate::<S>),
        )
        .route(
            "/sellers/{id}/change-zone",
            post(routes::sellers::change_zone::<S>),
        )
        .route(
            "/sellers/{id}/optimized-route",
            get(routes::planning::optimized_route::<S>),
        )
        .route(
            "/routes/compare-algorithms",
            get(routes::planning::compare_algorithms::<S>),
        )
        .route(
            "/shopkeepers",
            post(routes::shopkeepers::create::<S>).get(routes::shopkeepers::list::<S>),
        )
        .route(
            "/shopkeepers/unassigned",
            get(routes::shopkeepers::unassigned::<S>),
        )
        .route(
            "/shopkeepers/{id}",
            get(routes::shopkeepers::get::<S>)
                .put(routes::shopkeepers::update::<S>)
                .delete(routes::shopkeepers::deactivate::<S>),
        )
        .route("/assign", post(routes::assignments::assign::<S>))
        .route("/reassign", post(routes::assignments::reassign::<S>))
        .route("/assignments", get(routes::assignments::list::<S>))
        .route(
            "/assignments/history/{shopkeeper_id}",
            get(routes::assignments::history::<S>),
        )
        .route(
            "/assignments/{id}",
            axum::routing::delete(routes::assignments::unassign::<S>),
        )
        .route(
            "/visits",
            get(routes::visits::list::<S>).post(routes::visits::schedule::<S>),
        )
        .route(
            "/visits/shopkeepers/low-stock",
            get(routes::visits::low_stock_shopkeepers::<S>),
        )
        .route(
            "/visits/shopkeepers/{id}/inventory-summary",
            get(routes::visits::restock_summary::<S>),
        )
        .route(
            "/visits/{id}",
            get(routes::visits::get::<S>).put(routes::visits::update::<S>),
        )
        .route("/visits/{id}/cancel", patch(routes::visits::cancel::<S>))
        .route(
            "/visits/{id}/complete",
            patch(routes::visits::complete::<S>),
        )
        .route(
            "/visits/{id}/incidents",
            get(routes::visits::incidents::<S>),
        )
        .route(
            "/seller-incidents",
            get(routes::incidents::list::<S>).post(routes::incidents::record::<S>),
        )
        .route(
            "/seller-incidents/{id}",
            get(routes::incidents::get::<S>)
                .put(routes::incidents::update::<S>)
                .delete(routes::incidents::delete::<S>),
        )
        .route("/inventory", post(routes::inventory::add::<S>))
        .route(
            "/inventory/products/available",
            get(routes::inventory::available_products::<S>),
        )
        .route(
            "/inventory/low-stock/all",
            get(routes::inventory::low_stock_all::<S>),
        )
        .route(
            "/inventory/{id}",
            get(routes::inventory::list::<S>)
                .put(routes::inventory::update::<S>)
                .delete(routes::inventory::delete::<S>),
        )
        .route(
            "/inventory/{id}/summary",
            get(routes::inventory::summary::<S>),
        )
        .route(
            "/inventory/{id}/adjust-stock",
            post(routes::inventory::adjust_stock::<S>),
        );

    Router::new()
        .route("/health", get(routes::health::live::<S>))
        .nest(&config.api_prefix, api)
        .with_state(state)
        .merge(metrics_router)
        .layer(cors_layer(&config.cors_origins))
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(middleware::request_id_layer))
}

/// Credentialed CORS for the configured origins. A `*` entry echoes any origin.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|origin| origin == "*") {
        AllowOrigin::mirror_request()
    } else {
        AllowOrigin::list(origins.iter().filter_map(|origin| {
            HeaderValue::from_str(origin)
                .inspect_err(|_| tracing::warn!(%origin, "ignoring invalid CORS origin"))
                .ok()
        }))
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}
