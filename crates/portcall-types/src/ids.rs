//! Type-safe identifier wrappers around [`Uuid`].
//!
//! Ports, vessels, allocations and operations each get their own ID type so
//! an allocation ID can never be passed where an operation ID is expected.
//! All IDs use UUID v7 (time-ordered), so ordering a map by ID also orders it
//! by creation time.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for a port registered with the engine.
    PortId
}

define_id! {
    /// Unique identifier for a vessel, supplied by the fleet registry.
    VesselId
}

define_id! {
    /// Unique identifier for a berth allocation (and its schedule entry).
    AllocationId
}

define_id! {
    /// Unique identifier for a cargo or service operation at a berth.
    OperationId
}
