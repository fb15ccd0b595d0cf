//! Visits a seller schedules to the shopkeepers assigned to them.

pub mod restock;
pub mod schedule;
pub mod service;
pub mod state;

pub use restock::{LowStockProduct, RestockSummary, ShopkeeperLowStock};
pub use schedule::{
    SCHEDULE_TOLERANCE_SECS, WORKDAY_END_MINUTES, WORKDAY_START_MINUTES, validate_schedule,
};
pub use service::{
    CancelVisit, ScheduleVisit, UpdateVisit, VisitFilter, VisitList, VisitService, VisitView,
};
pub use state::{VisitTransition, can_edit};
