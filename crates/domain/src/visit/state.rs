//! Visit state machine.
//!
//! ```text
//! Pending ──┬──► Completed
//!           └──► Cancelled
//! ```
//!
//! Only pending visits may be edited; both targets are terminal.

use common::VisitStatus;

use crate::error::DomainError;

/// A status change requested on a visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitTransition {
    Complete,
    Cancel,
}

impl VisitTransition {
    /// Status the visit ends up in.
    pub fn target(self) -> VisitStatus {
        match self {
            VisitTransition::Complete => VisitStatus::Completed,
            VisitTransition::Cancel => VisitStatus::Cancelled,
        }
    }

    pub fn action(self) -> &'static str {
        match self {
            VisitTransition::Complete => "complete",
            VisitTransition::Cancel => "cancel",
        }
    }

    /// Returns the target status if the transition is allowed from `current`.
    pub fn apply(self, current: VisitStatus) -> Result<VisitStatus, DomainError> {
        if current == VisitStatus::Pending {
            Ok(self.target())
        } else {
            Err(DomainError::InvalidTransition {
                current,
                action: self.action(),
            })
        }
    }
}

/// Returns true if the visit's date, reason and notes may still change.
pub fn can_edit(status: VisitStatus) -> bool {
    matches!(status, VisitStatus::Pending)
}
