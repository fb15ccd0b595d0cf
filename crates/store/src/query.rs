use chrono::{DateTime, Utc};
use common::{IncidentKind, SellerId, ShopkeeperId, VisitId, VisitStatus, ZoneId};

/// Offset pagination window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// Number of rows to skip.
    pub skip: i64,
    /// Maximum number of rows to return.
    pub limit: i64,
}

impl Page {
    pub const MAX_LIMIT: i64 = 100;

    pub fn new(skip: i64, limit: i64) -> Self {
        Self { skip, limit }
    }

    /// A window covering every row, for internal reads that must not truncate.
    pub fn all() -> Self {
        Self {
            skip: 0,
            limit: i64::MAX,
        }
    }

    /// Applies the window to an already filtered and ordered iterator.
    pub fn apply<T>(&self, items: impl IntoIterator<Item = T>) -> Vec<T> {
        items
            .into_iter()
            .skip(self.skip.max(0) as usize)
            .take(self.limit.max(0) as usize)
            .collect()
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: Self::MAX_LIMIT,
        }
    }
}

/// Filters for listing sellers.
#[derive(Debug, Clone, Default)]
pub struct SellerQuery {
    pub zone_id: Option<ZoneId>,
    pub is_active: Option<bool>,
    pub page: Page,
}

impl SellerQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn zone(mut self, zone_id: ZoneId) -> Self {
        self.zone_id = Some(zone_id);
        self
    }

    pub fn active(mut self, is_active: bool) -> Self {
        self.is_active = Some(is_active);
        self
    }

    pub fn page(mut self, page: Page) -> Self {
        self.page = page;
        self
    }
}

/// Filters for listing shopkeepers.
///
/// `seller_id` and `unassigned` look at the shopkeeper's active assignment and
/// are evaluated before pagination.
#[derive(Debug, Clone, Default)]
pub struct ShopkeeperQuery {
    pub is_active: Option<bool>,
    pub seller_id: Option<SellerId>,
    pub unassigned: bool,
    pub page: Page,
}

impl ShopkeeperQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(mut self, is_active: bool) -> Self {
        self.is_active = Some(is_active);
        self
    }

    pub fn assigned_to(mut self, seller_id: SellerId) -> Self {
        self.seller_id = Some(seller_id);
        self
    }

    pub fn unassigned_only(mut self) -> Self {
        self.unassigned = true;
        self
    }

    pub fn page(mut self, page: Page) -> Self {
        self.page = page;
        self
    }
}

/// Filters for listing assignments.
#[derive(Debug, Clone, Default)]
pub struct AssignmentQuery {
    pub is_active: Option<bool>,
    pub seller_id: Option<SellerId>,
    pub shopkeeper_id: Option<ShopkeeperId>,
    pub page: Page,
}

impl AssignmentQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(mut self, is_active: bool) -> Self {
        self.is_active = Some(is_active);
        self
    }

    pub fn seller(mut self, seller_id: SellerId) -> Self {
        self.seller_id = Some(seller_id);
        self
    }

    pub fn shopkeeper(mut self, shopkeeper_id: ShopkeeperId) -> Self {
        self.shopkeeper_id = Some(shopkeeper_id);
        self
    }

    pub fn page(mut self, page: Page) -> Self {
        self.page = page;
        self
    }
}

/// Filters for listing visits. Results are ordered by `scheduled_date` ascending.
#[derive(Debug, Clone, Default)]
pub struct VisitQuery {
    pub seller_id: Option<SellerId>,
    pub shopkeeper_id: Option<ShopkeeperId>,
    pub status: Option<VisitStatus>,
    /// Inclusive lower bound on `scheduled_date`.
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `scheduled_date`.
    pub to: Option<DateTime<Utc>>,
    pub page: Page,
}

impl VisitQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seller(mut self, seller_id: SellerId) -> Self {
        self.seller_id = Some(seller_id);
        self
    }

    pub fn shopkeeper(mut self, shopkeeper_id: ShopkeeperId) -> Self {
        self.shopkeeper_id = Some(shopkeeper_id);
        self
    }

    pub fn status(mut self, status: VisitStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn between(mut self, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        self.from = from;
        self.to = to;
        self
    }

    pub fn page(mut self, page: Page) -> Self {
        self.page = page;
        self
    }
}

/// Per-status totals for a visit query, ignoring pagination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VisitCounts {
    pub total: i64,
    pub pending: i64,
    pub completed: i64,
    pub cancelled: i64,
}

impl VisitCounts {
    pub(crate) fn record(&mut self, status: VisitStatus) {
        self.total += 1;
        match status {
            VisitStatus::Pending => self.pending += 1,
            VisitStatus::Completed => self.completed += 1,
            VisitStatus::Cancelled => self.cancelled += 1,
        }
    }
}

/// Filters for listing incidents. Results are ordered newest first.
#[derive(Debug, Clone, Default)]
pub struct IncidentQuery {
    pub seller_id: Option<SellerId>,
    pub shopkeeper_id: Option<ShopkeeperId>,
    pub visit_id: Option<VisitId>,
    pub kind: Option<IncidentKind>,
}

impl IncidentQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_visit(visit_id: VisitId) -> Self {
        Self {
            visit_id: Some(visit_id),
            ..Default::default()
        }
    }
}

/// Filters for listing inventory rows. Results are ordered by id.
#[derive(Debug, Clone, Default)]
pub struct InventoryQuery {
    pub shopkeeper_id: Option<ShopkeeperId>,
    pub is_active: Option<bool>,
    /// Keep only rows whose stock is below their minimum.
    pub low_stock_only: bool,
}

impl InventoryQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shopkeeper(mut self, shopkeeper_id: ShopkeeperId) -> Self {
        self.shopkeeper_id = Some(shopkeeper_id);
        self
    }

    pub fn active(mut self, is_active: bool) -> Self {
        self.is_active = Some(is_active);
        self
    }

    pub fn low_stock(mut self, low_stock_only: bool) -> Self {
        self.low_stock_only = low_stock_only;
        self
    }
}
