//! Shared application state.

use std::sync::Arc;

use domain::{
    AssignmentService, IncidentService, InventoryService, ProductCatalog, RouteService,
    SellerService, ShopkeeperService, VisitService, ZoneDirectory,
};
use store::UserStore;

use crate::auth::JwtVerifier;
use crate::config::Config;

/// Shared application state accessible from all handlers.
pub struct AppState<S: UserStore> {
    pub store: Arc<S>,
    pub sellers: SellerService<S>,
    pub shopkeepers: ShopkeeperService<S>,
    pub assignments: AssignmentService<S>,
    pub visits: VisitService<S>,
    pub incidents: IncidentService<S>,
    pub inventory: InventoryService<S>,
    pub routes: RouteService<S>,
    pub jwt: JwtVerifier,
    pub app_name: String,
    pub app_version: String,
}

impl<S: UserStore> AppState<S> {
    /// Wires every service over one store and the two remote services.
    pub fn new(
        store: Arc<S>,
        zones: Arc<dyn ZoneDirectory>,
        products: Arc<dyn ProductCatalog>,
        config: &Config,
    ) -> Self {
        Self {
            sellers: SellerService::new(store.clone(), zones),
            shopkeepers: ShopkeeperService::new(store.clone()),
            assignments: AssignmentService::new(store.clone(), config.max_shopkeepers_per_seller),
            visits: VisitService::new(store.clone()),
            incidents: IncidentService::new(store.clone()),
            inventory: InventoryService::new(store.clone(), products),
            routes: RouteService::new(store.clone()),
            jwt: JwtVerifier::new(&config.secret_key, config.algorithm),
            app_name: config.app_name.clone(),
            app_version: config.app_version.clone(),
            store,
        }
    }
}
