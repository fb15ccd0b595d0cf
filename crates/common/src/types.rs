use serde::{Deserialize, Serialize};

/// Defines a newtype over the `i64` primary keys handed out by the store.
///
/// Each entity gets its own type so a seller id can never be passed where a
/// shopkeeper id is expected.
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Creates an identifier from its raw value.
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            /// Returns the raw value.
            pub const fn get(&self) -> i64 {
                self.0
            }

            /// Returns true if the value can name a stored row (ids start at 1).
            pub const fn is_valid(&self) -> bool {
                self.0 > 0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(
    /// Identifier of a seller (field sales representative).
    SellerId
);
define_id!(
    /// Identifier of a shopkeeper (store).
    ShopkeeperId
);
define_id!(
    /// Identifier of a seller/shopkeeper assignment.
    AssignmentId
);
define_id!(
    /// Identifier of a scheduled visit.
    VisitId
);
define_id!(
    /// Identifier of a seller incident.
    IncidentId
);
define_id!(
    /// Identifier of a zone owned by the geo service.
    ZoneId
);
define_id!(
    /// Identifier of an account owned by the auth service.
    UserId
);
define_id!(
    /// Identifier of a row in a shopkeeper's inventory.
    InventoryId
);
define_id!(
    /// Identifier of a product owned by the product catalog service.
    ProductId
);
