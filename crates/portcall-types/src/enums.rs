//! Enumeration types for the Portcall engine.
//!
//! Vessel classes and port facilities drive the compatibility gate; the
//! status enums encode the allocation and operation state machines.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Vessels and facilities
// ---------------------------------------------------------------------------

/// The class of a vessel, which decides which port facilities it needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum VesselType {
    /// Cellular container ship.
    ContainerShip,
    /// Dry bulk carrier (grain, coal, ore).
    BulkCarrier,
    /// Liquid bulk tanker (crude, refined products).
    Tanker,
    /// Liquefied natural gas carrier.
    LngCarrier,
    /// Roll-on/roll-off vehicle carrier.
    RoRo,
    /// Refrigerated cargo ship.
    Reefer,
    /// Break-bulk general cargo ship.
    GeneralCargo,
}

impl VesselType {
    /// Return the facilities a port must offer to berth this vessel class.
    pub fn required_facilities(self) -> BTreeSet<Facility> {
        let needed: &[Facility] = match self {
            Self::ContainerShip => &[Facility::ContainerTerminal, Facility::HeavyLiftCranes],
            Self::BulkCarrier => &[Facility::BulkHandling],
            Self::Tanker => &[Facility::LiquidBulkTerminal],
            Self::LngCarrier => &[Facility::LngTerminal, Facility::LiquidBulkTerminal],
            Self::RoRo => &[Facility::RoRoRamp],
            Self::Reefer => &[Facility::RefrigeratedStorage],
            Self::GeneralCargo => &[],
        };
        needed.iter().copied().collect()
    }
}

/// A piece of port infrastructure that some vessel classes depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum Facility {
    /// Container stacking yard with ship-to-shore gantries.
    ContainerTerminal,
    /// Cranes rated for heavy container and project lifts.
    HeavyLiftCranes,
    /// Grab cranes and conveyors for dry bulk.
    BulkHandling,
    /// Pipelines and manifolds for liquid bulk.
    LiquidBulkTerminal,
    /// Cryogenic LNG loading arms and storage.
    LngTerminal,
    /// Ramp for roll-on/roll-off traffic.
    RoRoRamp,
    /// Cold storage for perishable cargo.
    RefrigeratedStorage,
    /// Fuel delivery to berthed vessels.
    BunkeringStation,
    /// Dry dock for hull maintenance.
    DryDock,
    /// On-site customs and inspection office.
    CustomsOffice,
}

/// A traded commodity that moves through the port's cargo inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum Commodity {
    /// Containerised manufactured goods (TEU).
    Containers,
    /// Grain (tonnes).
    Grain,
    /// Thermal or coking coal (tonnes).
    Coal,
    /// Iron ore (tonnes).
    IronOre,
    /// Crude oil (tonnes).
    CrudeOil,
    /// Refined fuel products (tonnes).
    RefinedFuel,
    /// Liquefied natural gas (tonnes).
    Lng,
    /// Finished vehicles (units).
    Vehicles,
    /// Steel products (tonnes).
    Steel,
    /// Timber and logs (tonnes).
    Timber,
    /// Perishable refrigerated goods (tonnes).
    Perishables,
    /// Break-bulk cargo not covered elsewhere (tonnes).
    GeneralCargo,
}

// ---------------------------------------------------------------------------
// Port conditions
// ---------------------------------------------------------------------------

/// Prevailing weather at a port, coarse enough to gate operations.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export, export_to = "bindings/")]
pub enum WeatherCondition {
    /// Calm seas, no restrictions.
    #[default]
    Calm,
    /// Moderate wind and swell.
    Moderate,
    /// Rough conditions; operations slow but continue.
    Rough,
    /// Severe weather; no operation may start.
    Severe,
}

/// Operational status of a port as a whole.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export, export_to = "bindings/")]
pub enum PortStatus {
    /// Fully open.
    #[default]
    Operational,
    /// Open with reduced capacity.
    Limited,
    /// Temporarily suspended.
    Suspended,
    /// Only emergency traffic accepted.
    EmergencyOnly,
    /// Closed.
    Closed,
}

// ---------------------------------------------------------------------------
// Lifecycle states
// ---------------------------------------------------------------------------

/// Status of a berth allocation.
///
/// `Requested -> Confirmed -> InProgress -> Completed`, with `Cancelled`
/// reachable from any state before `InProgress`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum AllocationStatus {
    /// Requested but not yet confirmed.
    Requested,
    /// Berth reserved for the window.
    Confirmed,
    /// Vessel is alongside.
    InProgress,
    /// Vessel has departed.
    Completed,
    /// Reservation withdrawn before arrival.
    Cancelled,
}

impl AllocationStatus {
    /// Whether no further transition is possible.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Whether the allocation may still be cancelled.
    pub const fn is_cancellable(self) -> bool {
        matches!(self, Self::Requested | Self::Confirmed)
    }
}

/// The kind of work performed during a port operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum OperationType {
    /// Cargo from port storage onto the vessel.
    Loading,
    /// Cargo from the vessel into port storage.
    Unloading,
    /// Ship-to-ship transfer that bypasses port storage.
    Transshipment,
    /// Fuel delivery.
    Bunkering,
    /// Vessel maintenance while berthed.
    Maintenance,
    /// Customs, safety or cargo inspection.
    Inspection,
}

/// Status of a port operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum OperationStatus {
    /// Queued, not started.
    Waiting,
    /// Work underway.
    InProgress,
    /// Finished.
    Completed,
    /// Dropped without starting.
    Cancelled,
    /// Held by the host; never assigned by the engine.
    Delayed,
}

impl OperationStatus {
    /// Whether the operation still needs work (waiting or running).
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Waiting | Self::InProgress)
    }

    /// Whether no further transition is possible.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

/// Category of a recorded schedule delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum DelayType {
    /// Vessel arrived after its planned arrival.
    Arrival,
    /// Vessel departed after its planned departure.
    Departure,
    /// An operation overran or stalled.
    Operation,
    /// Weather held the vessel or its operations.
    Weather,
    /// Equipment failure.
    Equipment,
    /// Paperwork, customs or authority hold.
    Bureaucratic,
}
