//! Visit route planning over a seller's assigned shopkeepers.
//!
//! Routes are built with the nearest-neighbour heuristic: from the current
//! point, always drive to the closest shopkeeper not yet visited. Distances
//! are great-circle distances, which is close enough at city scale.

use std::sync::Arc;

use common::{SellerId, ShopkeeperId};
use serde::{Deserialize, Serialize};
use store::{Shopkeeper, UserStore, UserStoreExt};

use crate::error::DomainError;

/// Mean earth radius used by [`haversine_km`].
pub const EARTH_RADIUS_KM: f64 = 6371.0;
/// Average urban driving speed used for travel time estimates.
pub const AVERAGE_SPEED_KMH: f64 = 25.0;
/// Time spent at each shopkeeper.
pub const MINUTES_PER_VISIT: f64 = 10.0;

pub const NEAREST_NEIGHBOR: &str = "nearest_neighbor";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    fn of(shopkeeper: &Shopkeeper) -> Self {
        Self::new(shopkeeper.latitude, shopkeeper.longitude)
    }
}

/// Great-circle distance between two points, in kilometres.
pub fn haversine_km(from: Coordinates, to: Coordinates) -> f64 {
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let dlat = lat2 - lat1;
    let dlon = (to.longitude - from.longitude).to_radians();

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().atan2((1.0 - a).sqrt())
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// One stop on a planned route.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteStop {
    pub shopkeeper_id: ShopkeeperId,
    pub shopkeeper_name: String,
    pub business_name: Option<String>,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    /// 1-based position in the route.
    pub order: usize,
    pub distance_from_previous_km: f64,
    pub cumulative_distance_km: f64,
}

impl RouteStop {
    fn new(shopkeeper: Shopkeeper, order: usize, from_previous: f64, cumulative: f64) -> Self {
        Self {
            shopkeeper_id: shopkeeper.id,
            shopkeeper_name: shopkeeper.name,
            business_name: shopkeeper.business_name,
            address: shopkeeper.address,
            latitude: shopkeeper.latitude,
            longitude: shopkeeper.longitude,
            order,
            distance_from_previous_km: round2(from_previous),
            cumulative_distance_km: round2(cumulative),
        }
    }
}

/// Orders shopkeepers with the nearest-neighbour heuristic.
///
/// With a start point the first leg is measured from it. Without one the
/// first shopkeeper in the input is the first stop, at distance zero. Ties
/// go to the shopkeeper that comes first in the input.
pub fn nearest_neighbor(
    shopkeepers: Vec<Shopkeeper>,
    start: Option<Coordinates>,
) -> Vec<RouteStop> {
    let mut unvisited = shopkeepers;
    let mut stops = Vec::with_capacity(unvisited.len());

    let mut current = match start {
        Some(point) => point,
        None if unvisited.is_empty() => return stops,
        None => {
            let first = unvisited.remove(0);
            let point = Coordinates::of(&first);
            stops.push(RouteStop::new(first, 1, 0.0, 0.0));
            point
        }
    };

    let mut cumulative = 0.0;
    while let Some((index, distance)) = unvisited
        .iter()
        .map(|s| haversine_km(current, Coordinates::of(s)))
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(&b.1))
    {
        let next = unvisited.remove(index);
        current = Coordinates::of(&next);
        cumulative += distance;
        stops.push(RouteStop::new(next, stops.len() + 1, distance, cumulative));
    }
    stops
}

/// Length of a route that visits the shopkeepers in the given order.
pub fn in_order_distance_km(shopkeepers: &[Shopkeeper]) -> f64 {
    shopkeepers
        .windows(2)
        .map(|pair| haversine_km(Coordinates::of(&pair[0]), Coordinates::of(&pair[1])))
        .sum()
}

/// Distance and time estimates for a planned route, rounded to 2 decimals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteStatistics {
    pub total_shopkeepers: usize,
    pub total_distance_km: f64,
    pub estimated_travel_time_hours: f64,
    pub estimated_visit_time_hours: f64,
    pub estimated_total_time_hours: f64,
    pub average_distance_between_stops_km: f64,
}

impl RouteStatistics {
    pub fn from_stops(stops: &[RouteStop]) -> Self {
        let count = stops.len();
        let total = stops.last().map_or(0.0, |s| s.cumulative_distance_km);
        let travel = total / AVERAGE_SPEED_KMH;
        let visiting = count as f64 * MINUTES_PER_VISIT / 60.0;
        let average = if count == 0 { 0.0 } else { total / count as f64 };

        Self {
            total_shopkeepers: count,
            total_distance_km: round2(total),
            estimated_travel_time_hours: round2(travel),
            estimated_visit_time_hours: round2(visiting),
            estimated_total_time_hours: round2(travel + visiting),
            average_distance_between_stops_km: round2(average),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizedRoute {
    pub seller_id: SellerId,
    pub seller_name: String,
    pub route_points: Vec<RouteStop>,
    pub statistics: RouteStatistics,
    pub algorithm_used: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlgorithmResult {
    pub num_stops: usize,
    pub total_distance_km: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlgorithmResults {
    pub nearest_neighbor: AlgorithmResult,
    /// The shopkeepers in the order the store returns them.
    pub original_order: AlgorithmResult,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlgorithmComparison {
    pub seller_id: SellerId,
    pub seller_name: String,
    pub algorithms: AlgorithmResults,
}

/// Service for planning a seller's visit route.
pub struct RouteService<S: UserStore> {
    store: Arc<S>,
}

impl<S: UserStore> RouteService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Active shopkeepers the seller is currently assigned.
    async fn stops_for(&self, seller_id: SellerId) -> Result<Vec<Shopkeeper>, DomainError> {
        let mut shopkeepers = self.store.assigned_shopkeepers(seller_id).await?;
        shopkeepers.retain(|s| s.is_active);
        Ok(shopkeepers)
    }

    /// Plans the seller's route over their active shopkeepers.
    ///
    /// Fails with `NotFound` if the seller does not exist or has no active
    /// shopkeepers to visit.
    #[tracing::instrument(skip(self))]
    pub async fn optimized_route(
        &self,
        seller_id: SellerId,
        start: Option<Coordinates>,
    ) -> Result<OptimizedRoute, DomainError> {
        let seller = self.store.require_seller(seller_id).await?;
        let shopkeepers = self.stops_for(seller.id).await?;
        if shopkeepers.is_empty() {
            return Err(DomainError::NotFound {
                entity: "assigned shopkeepers for seller",
                id: seller.id.get(),
            });
        }

        let route_points = nearest_neighbor(shopkeepers, start);
        let statistics = RouteStatistics::from_stops(&route_points);
        tracing::debug!(
            stops = route_points.len(),
            total_km = statistics.total_distance_km,
            "route planned"
        );

        Ok(OptimizedRoute {
            seller_id: seller.id,
            seller_name: seller.name,
            route_points,
            statistics,
            algorithm_used: NEAREST_NEIGHBOR,
        })
    }

    /// Compares the planned route against visiting in stored order. A seller
    /// without shopkeepers yields zero stops rather than an error.
    #[tracing::instrument(skip(self))]
    pub async fn compare(&self, seller_id: SellerId) -> Result<AlgorithmComparison, DomainError> {
        let seller = self.store.require_seller(seller_id).await?;
        let shopkeepers = self.stops_for(seller.id).await?;

        let original_order = AlgorithmResult {
            num_stops: shopkeepers.len(),
            total_distance_km: round2(in_order_distance_km(&shopkeepers)),
        };
        let planned = nearest_neighbor(shopkeepers, None);

        Ok(AlgorithmComparison {
            seller_id: seller.id,
            seller_name: seller.name,
            algorithms: AlgorithmResults {
                nearest_neighbor: AlgorithmResult {
                    num_stops: planned.len(),
                    total_distance_km: planned.last().map_or(0.0, |s| s.cumulative_distance_km),
                },
                original_order,
            },
        })
    }
}
