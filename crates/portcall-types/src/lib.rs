//! Shared type definitions for the Portcall berth scheduling engine.
//!
//! This crate is the single source of truth for the data model consumed by
//! the engine and by presentation layers. Types flow downstream to
//! `TypeScript` via `ts-rs`.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for ports, vessels, allocations and
//!   operations
//! - [`enums`] -- Vessel classes, facilities, commodities, weather and the
//!   lifecycle status enums
//! - [`structs`] -- Port configuration, port state, allocations, schedule
//!   entries, operations and analytics results
//! - [`events`] -- The [`PortEvent`] stream emitted on every transition

pub mod enums;
pub mod events;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{
    AllocationStatus, Commodity, DelayType, Facility, OperationStatus, OperationType, PortStatus,
    VesselType, WeatherCondition,
};
pub use events::PortEvent;
pub use ids::{AllocationId, OperationId, PortId, VesselId};
pub use structs::{
    AnalyticsPeriod, BerthAllocation, CargoInventory, Delay, Infrastructure, PlannedOperation,
    Port, PortOperation, PortPerformanceMetrics, PortState, Utilization, UtilizationSample,
    Vessel, VesselArrivalResult, VesselDepartureResult, VesselScheduleEntry,
};
