//! Shared fixtures for the engine integration tests.

#![allow(dead_code, clippy::unwrap_used)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use portcall_core::{EngineConfig, ManualClock, PortEngine, PortProfileWeather, StaticPricing};
use portcall_types::{
    Commodity, Facility, Infrastructure, OperationType, PlannedOperation, Port, PortId, Vessel,
    VesselId, VesselType,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// `hours` after midnight on the test day.
pub fn t(hours: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap() + Duration::hours(hours)
}

/// `minutes` after midnight on the test day.
pub fn tm(minutes: i64) -> DateTime<Utc> {
    t(0) + Duration::minutes(minutes)
}

/// A general-purpose port: 15 m of water, 300 m berths, bulk and container
/// facilities, grain priced at 2 per unit and a 2400/day berthing fee.
pub fn harbour(max_berths: u32, crane_count: u32) -> Port {
    Port {
        id: PortId::new(),
        name: String::from("Saltmarsh"),
        max_berths,
        infrastructure: Infrastructure {
            water_depth: dec!(15),
            max_berth_length: dec!(300),
            crane_count,
            facilities: BTreeSet::from([
                Facility::BulkHandling,
                Facility::ContainerTerminal,
                Facility::HeavyLiftCranes,
            ]),
            storage_capacity: dec!(100000),
            efficiency_factor: Decimal::ONE,
        },
        handling_costs: BTreeMap::from([(Commodity::Grain, dec!(2))]),
        berthing_fee: dec!(2400),
        weather_profile: BTreeMap::new(),
    }
}

pub fn vessel(name: &str, vessel_type: VesselType) -> Vessel {
    Vessel {
        id: VesselId::new(),
        name: String::from(name),
        vessel_type,
        draft: dec!(10),
        length: dec!(200),
    }
}

pub fn bulker(name: &str) -> Vessel {
    vessel(name, VesselType::BulkCarrier)
}

pub fn planned(
    operation_type: OperationType,
    commodity: Commodity,
    quantity: Decimal,
) -> PlannedOperation {
    PlannedOperation {
        operation_type,
        commodity,
        quantity,
    }
}

pub fn unload_grain(quantity: Decimal) -> PlannedOperation {
    planned(OperationType::Unloading, Commodity::Grain, quantity)
}

/// Engine on a manual clock reading `t(0)`, with containers priced by the
/// market at 10 per unit.
pub fn engine() -> (Arc<PortEngine>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(t(0)));
    let engine = PortEngine::new(
        EngineConfig::default(),
        Arc::new(StaticPricing::new([(Commodity::Containers, dec!(10))])),
        Arc::new(PortProfileWeather),
        clock.clone(),
    );
    (Arc::new(engine), clock)
}

/// Engine with one registered [`harbour`].
pub async fn engine_with_port(
    max_berths: u32,
    crane_count: u32,
) -> (Arc<PortEngine>, Arc<ManualClock>, PortId) {
    let (engine, clock) = engine();
    let port = harbour(max_berths, crane_count);
    let port_id = port.id;
    engine.initialize_port(port).await.unwrap();
    (engine, clock, port_id)
}
