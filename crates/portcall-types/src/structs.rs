//! Core entity structs for the Portcall engine.
//!
//! Static port configuration ([`Port`]), the mutable per-port view
//! ([`PortState`]), the scheduling records ([`BerthAllocation`],
//! [`VesselScheduleEntry`], [`PortOperation`]) and the values returned by
//! lifecycle and analytics calls.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{
    AllocationStatus, Commodity, DelayType, Facility, OperationStatus, OperationType, PortStatus,
    VesselType, WeatherCondition,
};
use crate::ids::{AllocationId, OperationId, PortId, VesselId};

// ---------------------------------------------------------------------------
// Port configuration
// ---------------------------------------------------------------------------

/// Physical infrastructure of a port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Infrastructure {
    /// Depth alongside the berths, in metres. Caps vessel draft.
    #[ts(as = "String")]
    pub water_depth: Decimal,
    /// Longest vessel a berth can take, in metres.
    #[ts(as = "String")]
    pub max_berth_length: Decimal,
    /// Number of cranes; caps concurrently running operations.
    pub crane_count: u32,
    /// Facilities available at the port.
    pub facilities: BTreeSet<Facility>,
    /// Cargo storage capacity across all commodities.
    #[ts(as = "String")]
    pub storage_capacity: Decimal,
    /// Throughput multiplier applied to operation duration estimates.
    #[ts(as = "String")]
    pub efficiency_factor: Decimal,
}

/// Immutable configuration of a port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Port {
    /// Unique port identifier.
    pub id: PortId,
    /// Display name.
    pub name: String,
    /// Number of berths, numbered `1..=max_berths`.
    pub max_berths: u32,
    /// Physical infrastructure.
    pub infrastructure: Infrastructure,
    /// Handling cost per unit of cargo, by commodity.
    #[ts(as = "BTreeMap<Commodity, String>")]
    pub handling_costs: BTreeMap<Commodity, Decimal>,
    /// Berthing fee per 24 hours alongside.
    #[ts(as = "String")]
    pub berthing_fee: Decimal,
    /// Average weather by calendar month (1 = January).
    pub weather_profile: BTreeMap<u32, WeatherCondition>,
}

// ---------------------------------------------------------------------------
// Port state
// ---------------------------------------------------------------------------

/// Utilization percentages of a port, each in `[0, 100]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Utilization {
    /// Vessels alongside as a share of berths.
    #[ts(as = "String")]
    pub berth: Decimal,
    /// Running operations as a share of cranes.
    #[ts(as = "String")]
    pub crane: Decimal,
    /// Stored cargo as a share of storage capacity.
    #[ts(as = "String")]
    pub storage: Decimal,
    /// Mean of berth and crane utilization.
    #[ts(as = "String")]
    pub overall: Decimal,
}

/// Mutable state of a registered port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PortState {
    /// The port this state belongs to.
    pub port_id: PortId,
    /// Current utilization.
    pub utilization: Utilization,
    /// Current weather.
    pub weather: WeatherCondition,
    /// Current operational status.
    pub status: PortStatus,
    /// When any field last changed.
    pub last_updated: DateTime<Utc>,
}

/// Overall utilization observed at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct UtilizationSample {
    /// When the sample was taken.
    pub at: DateTime<Utc>,
    /// Overall utilization at that moment.
    #[ts(as = "String")]
    pub overall: Decimal,
}

/// Cargo held in a port's storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CargoInventory {
    /// The port holding the cargo.
    pub port_id: PortId,
    /// Quantity on hand by commodity. Never negative.
    #[ts(as = "BTreeMap<Commodity, String>")]
    pub quantities: BTreeMap<Commodity, Decimal>,
}

impl CargoInventory {
    /// Quantity on hand for one commodity (zero when absent).
    pub fn quantity(&self, commodity: Commodity) -> Decimal {
        self.quantities
            .get(&commodity)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }
}

// ---------------------------------------------------------------------------
// Vessels and allocations
// ---------------------------------------------------------------------------

/// The parts of a vessel that matter for berth compatibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Vessel {
    /// Vessel identifier from the fleet registry.
    pub id: VesselId,
    /// Display name.
    pub name: String,
    /// Vessel class.
    pub vessel_type: VesselType,
    /// Draft in metres.
    #[ts(as = "String")]
    pub draft: Decimal,
    /// Length overall in metres.
    #[ts(as = "String")]
    pub length: Decimal,
}

/// An operation requested as part of a berth allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PlannedOperation {
    /// Kind of work.
    pub operation_type: OperationType,
    /// Cargo involved.
    pub commodity: Commodity,
    /// Planned quantity.
    #[ts(as = "String")]
    pub quantity: Decimal,
}

/// A reservation of one berth for one vessel over a time window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct BerthAllocation {
    /// Unique allocation identifier.
    pub id: AllocationId,
    /// The port the berth belongs to.
    pub port_id: PortId,
    /// The vessel holding the reservation.
    pub vessel: Vessel,
    /// Berth number, `1..=max_berths`.
    pub berth_number: u32,
    /// Planned arrival (inclusive).
    pub arrival: DateTime<Utc>,
    /// Planned departure (exclusive).
    pub departure: DateTime<Utc>,
    /// Work to perform while alongside.
    pub planned_operations: Vec<PlannedOperation>,
    /// Lifecycle status.
    pub status: AllocationStatus,
    /// Estimated port charges for the planned stay.
    #[ts(as = "String")]
    pub estimated_cost: Decimal,
}

/// A delay recorded against a vessel's schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Delay {
    /// Category of the delay.
    pub delay_type: DelayType,
    /// Length of the delay in minutes.
    pub duration_minutes: i64,
    /// Human-readable cause.
    pub reason: String,
    /// When the delay was recorded.
    pub recorded_at: DateTime<Utc>,
}

/// A berth allocation together with what actually happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct VesselScheduleEntry {
    /// The reservation.
    pub allocation: BerthAllocation,
    /// Actual arrival, once the vessel is alongside.
    pub actual_arrival: Option<DateTime<Utc>>,
    /// Actual departure, once the vessel has left.
    pub actual_departure: Option<DateTime<Utc>>,
    /// Delays in the order they were recorded.
    pub delays: Vec<Delay>,
}

impl VesselScheduleEntry {
    /// Wrap a fresh allocation with no actuals and no delays.
    pub const fn new(allocation: BerthAllocation) -> Self {
        Self {
            allocation,
            actual_arrival: None,
            actual_departure: None,
            delays: Vec::new(),
        }
    }

    /// Sum of all recorded delay minutes.
    pub fn total_delay_minutes(&self) -> i64 {
        self.delays
            .iter()
            .fold(0_i64, |acc, d| acc.saturating_add(d.duration_minutes))
    }
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// A unit of work performed for a berthed vessel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PortOperation {
    /// Unique operation identifier.
    pub id: OperationId,
    /// The allocation this operation serves.
    pub allocation_id: AllocationId,
    /// The port where the work happens.
    pub port_id: PortId,
    /// Kind of work.
    pub operation_type: OperationType,
    /// Cargo involved.
    pub commodity: Commodity,
    /// Planned quantity, replaced by the actual quantity on completion.
    #[ts(as = "String")]
    pub quantity: Decimal,
    /// Lifecycle status.
    pub status: OperationStatus,
    /// Earliest planned start.
    pub scheduled_start: DateTime<Utc>,
    /// Estimated duration in minutes.
    pub estimated_duration_minutes: i64,
    /// When work began.
    pub actual_start: Option<DateTime<Utc>>,
    /// When work ended (or was cut off by departure).
    pub actual_end: Option<DateTime<Utc>>,
    /// Estimated over actual duration, clamped to `[0.1, 2.0]`.
    #[ts(as = "String")]
    pub efficiency: Decimal,
}

// ---------------------------------------------------------------------------
// Lifecycle results
// ---------------------------------------------------------------------------

/// Outcome of processing a vessel arrival.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct VesselArrivalResult {
    /// The allocation, now in progress.
    pub allocation: BerthAllocation,
    /// Operations created for the stay, all waiting.
    pub operations: Vec<PortOperation>,
    /// The arrival delay, if the vessel was late.
    pub arrival_delay: Option<Delay>,
    /// Position in the port's operation queue (1 = next).
    pub queue_position: u32,
    /// Heuristic wait before the first operation can start.
    pub estimated_wait_minutes: i64,
}

/// Outcome of processing a vessel departure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct VesselDepartureResult {
    /// The allocation, now completed.
    pub allocation: BerthAllocation,
    /// The departure delay, if the vessel left late.
    pub departure_delay: Option<Delay>,
    /// Minutes between actual arrival and actual departure.
    pub total_port_time_minutes: i64,
    /// Estimated cost scaled by the actual time alongside.
    #[ts(as = "String")]
    pub total_cost: Decimal,
    /// Running operations that were closed out as completed.
    pub force_completed: Vec<OperationId>,
    /// Waiting operations that were cancelled.
    pub cancelled: Vec<OperationId>,
}

// ---------------------------------------------------------------------------
// Analytics
// ---------------------------------------------------------------------------

/// Half-open reporting window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AnalyticsPeriod {
    /// First instant included.
    pub start: DateTime<Utc>,
    /// First instant excluded.
    pub end: DateTime<Utc>,
}

impl AnalyticsPeriod {
    /// Whether `at` falls inside the window.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at < self.end
    }
}

/// Performance of one port over a reporting period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PortPerformanceMetrics {
    /// The port measured.
    pub port_id: PortId,
    /// The reporting window.
    pub period: AnalyticsPeriod,
    /// Vessels that arrived in the window.
    pub total_arrivals: u32,
    /// Arrivals within the on-time grace of their plan.
    pub on_time_arrivals: u32,
    /// Mean minutes alongside for arrivals that have also departed.
    #[ts(as = "String")]
    pub average_turnaround_minutes: Decimal,
    /// Cargo handled by operations started in the window.
    #[ts(as = "String")]
    pub total_cargo_handled: Decimal,
    /// Operations started in the window.
    pub total_operations: u32,
    /// Of those, how many completed.
    pub completed_operations: u32,
    /// Completed over total operations, as a percentage.
    #[ts(as = "String")]
    pub operational_efficiency: Decimal,
    /// Mean efficiency of completed operations (1.0 when none).
    #[ts(as = "String")]
    pub average_efficiency: Decimal,
    /// Estimated cost of the allocations that arrived in the window.
    #[ts(as = "String")]
    pub revenue_generated: Decimal,
    /// Mean overall utilization sampled in the window.
    #[ts(as = "String")]
    pub utilization_rate: Decimal,
    /// Total delay minutes recorded for arrivals in the window.
    pub total_delay_minutes: i64,
    /// Delay minutes broken down by category.
    pub delays_by_type: BTreeMap<DelayType, i64>,
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    use super::*;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, hour, 0, 0)
            .single()
            .unwrap_or_default()
    }

    #[test]
    fn period_is_half_open() {
        let period = AnalyticsPeriod {
            start: at(8),
            end: at(12),
        };
        assert!(period.contains(at(8)));
        assert!(period.contains(at(11)));
        assert!(!period.contains(at(12)));
        assert!(!period.contains(at(7)));
    }

    #[test]
    fn schedule_entry_sums_delays() {
        let allocation = BerthAllocation {
            id: AllocationId::new(),
            port_id: PortId::new(),
            vessel: Vessel {
                id: VesselId::new(),
                name: String::from("Aurora"),
                vessel_type: VesselType::GeneralCargo,
                draft: dec!(9.5),
                length: dec!(180),
            },
            berth_number: 1,
            arrival: at(10),
            departure: at(10) + Duration::hours(10),
            planned_operations: Vec::new(),
            status: AllocationStatus::Confirmed,
            estimated_cost: dec!(1000),
        };
        let mut entry = VesselScheduleEntry::new(allocation);
        assert_eq!(entry.total_delay_minutes(), 0);

        for (delay_type, minutes) in [(DelayType::Arrival, 45), (DelayType::Weather, 30)] {
            entry.delays.push(Delay {
                delay_type,
                duration_minutes: minutes,
                reason: String::from("test"),
                recorded_at: at(11),
            });
        }
        assert_eq!(entry.total_delay_minutes(), 75);
    }

    #[test]
    fn inventory_quantity_defaults_to_zero() {
        let inventory = CargoInventory {
            port_id: PortId::new(),
            quantities: BTreeMap::from([(Commodity::Grain, dec!(500))]),
        };
        assert_eq!(inventory.quantity(Commodity::Grain), dec!(500));
        assert_eq!(inventory.quantity(Commodity::Coal), Decimal::ZERO);
    }
}
