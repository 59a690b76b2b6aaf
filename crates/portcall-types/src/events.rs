//! The closed set of events the engine emits.
//!
//! Registration, allocation, lifecycle and condition changes each announce
//! themselves with one [`PortEvent`]; any of them that moves the port's
//! utilization is followed by a `UtilizationChanged`. Host-recorded delays
//! are not announced. Events are in-process values; the presentation layer
//! decides how to render or persist them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{Commodity, OperationType, PortStatus, WeatherCondition};
use crate::ids::{AllocationId, OperationId, PortId, VesselId};
use crate::structs::Utilization;

/// A state transition observed at a port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum PortEvent {
    /// A port was registered.
    PortInitialized {
        /// The new port.
        port_id: PortId,
        /// When it was registered.
        at: DateTime<Utc>,
        /// Display name.
        name: String,
        /// Number of berths.
        max_berths: u32,
        /// Starting weather.
        weather: WeatherCondition,
    },

    /// A berth was reserved for a vessel.
    BerthAllocated {
        /// The port.
        port_id: PortId,
        /// When the reservation was made.
        at: DateTime<Utc>,
        /// The new allocation.
        allocation_id: AllocationId,
        /// The vessel.
        vessel_id: VesselId,
        /// Berth assigned.
        berth_number: u32,
        /// Planned arrival.
        arrival: DateTime<Utc>,
        /// Planned departure.
        departure: DateTime<Utc>,
        /// Estimated charges.
        #[ts(as = "String")]
        estimated_cost: Decimal,
    },

    /// A reservation was withdrawn before arrival.
    AllocationCancelled {
        /// The port.
        port_id: PortId,
        /// When it was cancelled.
        at: DateTime<Utc>,
        /// The cancelled allocation.
        allocation_id: AllocationId,
        /// Berth released.
        berth_number: u32,
    },

    /// A vessel came alongside.
    VesselArrived {
        /// The port.
        port_id: PortId,
        /// Actual arrival time.
        at: DateTime<Utc>,
        /// The allocation being served.
        allocation_id: AllocationId,
        /// The vessel.
        vessel_id: VesselId,
        /// Berth occupied.
        berth_number: u32,
        /// Minutes late (zero when on time or early).
        delay_minutes: i64,
        /// Operations queued for the stay.
        operations_created: u32,
        /// Position in the port's operation queue.
        queue_position: u32,
    },

    /// A vessel left its berth.
    VesselDeparted {
        /// The port.
        port_id: PortId,
        /// Actual departure time.
        at: DateTime<Utc>,
        /// The allocation that ended.
        allocation_id: AllocationId,
        /// The vessel.
        vessel_id: VesselId,
        /// Berth released.
        berth_number: u32,
        /// Minutes alongside.
        total_port_time_minutes: i64,
        /// Charges for the actual stay.
        #[ts(as = "String")]
        total_cost: Decimal,
        /// Waiting operations dropped at departure.
        cancelled_operations: u32,
    },

    /// Work began on an operation.
    OperationStarted {
        /// The port.
        port_id: PortId,
        /// Start time.
        at: DateTime<Utc>,
        /// The operation.
        operation_id: OperationId,
        /// The allocation it serves.
        allocation_id: AllocationId,
        /// Kind of work.
        operation_type: OperationType,
    },

    /// Work on an operation finished.
    OperationCompleted {
        /// The port.
        port_id: PortId,
        /// End time.
        at: DateTime<Utc>,
        /// The operation.
        operation_id: OperationId,
        /// The allocation it serves.
        allocation_id: AllocationId,
        /// Kind of work.
        operation_type: OperationType,
        /// Cargo involved.
        commodity: Commodity,
        /// Quantity actually handled.
        #[ts(as = "String")]
        quantity: Decimal,
        /// Estimated over actual duration.
        #[ts(as = "String")]
        efficiency: Decimal,
    },

    /// Utilization was recomputed and changed.
    UtilizationChanged {
        /// The port.
        port_id: PortId,
        /// When it changed.
        at: DateTime<Utc>,
        /// Values before the change.
        previous: Utilization,
        /// Values after the change.
        current: Utilization,
    },

    /// Weather or operational status was updated by the host.
    PortConditionsChanged {
        /// The port.
        port_id: PortId,
        /// When the update was applied.
        at: DateTime<Utc>,
        /// Current weather.
        weather: WeatherCondition,
        /// Current operational status.
        status: PortStatus,
    },
}

impl PortEvent {
    /// The port the event belongs to.
    pub const fn port_id(&self) -> PortId {
        match self {
            Self::PortInitialized { port_id, .. }
            | Self::BerthAllocated { port_id, .. }
            | Self::AllocationCancelled { port_id, .. }
            | Self::VesselArrived { port_id, .. }
            | Self::VesselDeparted { port_id, .. }
            | Self::OperationStarted { port_id, .. }
            | Self::OperationCompleted { port_id, .. }
            | Self::UtilizationChanged { port_id, .. }
            | Self::PortConditionsChanged { port_id, .. } => *port_id,
        }
    }

    /// When the transition happened.
    pub const fn at(&self) -> DateTime<Utc> {
        match self {
            Self::PortInitialized { at, .. }
            | Self::BerthAllocated { at, .. }
            | Self::AllocationCancelled { at, .. }
            | Self::VesselArrived { at, .. }
            | Self::VesselDeparted { at, .. }
            | Self::OperationStarted { at, .. }
            | Self::OperationCompleted { at, .. }
            | Self::UtilizationChanged { at, .. }
            | Self::PortConditionsChanged { at, .. } => *at,
        }
    }

    /// Stable variant name, used as a log field.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::PortInitialized { .. } => "PortInitialized",
            Self::BerthAllocated { .. } => "BerthAllocated",
            Self::AllocationCancelled { .. } => "AllocationCancelled",
            Self::VesselArrived { .. } => "VesselArrived",
            Self::VesselDeparted { .. } => "VesselDeparted",
            Self::OperationStarted { .. } => "OperationStarted",
            Self::OperationCompleted { .. } => "OperationCompleted",
            Self::UtilizationChanged { .. } => "UtilizationChanged",
            Self::PortConditionsChanged { .. } => "PortConditionsChanged",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_cover_payload() {
        let port_id = PortId::new();
        let at = Utc::now();
        let event = PortEvent::PortConditionsChanged {
            port_id,
            at,
            weather: WeatherCondition::Severe,
            status: PortStatus::Limited,
        };
        assert_eq!(event.port_id(), port_id);
        assert_eq!(event.at(), at);
        assert_eq!(event.kind(), "PortConditionsChanged");
    }

    #[test]
    fn event_json_is_externally_tagged() {
        let event = PortEvent::AllocationCancelled {
            port_id: PortId::new(),
            at: Utc::now(),
            allocation_id: AllocationId::new(),
            berth_number: 2,
        };
        let value = serde_json::to_value(&event).unwrap_or_default();
        assert!(value.get("AllocationCancelled").is_some());
        assert_eq!(
            value
                .get("AllocationCancelled")
                .and_then(|v| v.get("berth_number"))
                .and_then(serde_json::Value::as_u64),
            Some(2)
        );
    }
}
