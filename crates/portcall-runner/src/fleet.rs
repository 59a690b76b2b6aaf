//! The demo port and the fleet that calls at it during a simulated day.
//!
//! The fleet is deliberately a little oversubscribed: one vessel needs an
//! LNG terminal the port does not have, and the busiest window asks for more
//! berths than exist, so a run exercises rejections as well as full calls.

use std::collections::{BTreeMap, BTreeSet};

use portcall_types::{
    Commodity, Facility, Infrastructure, OperationType, PlannedOperation, Port, PortId, Vessel,
    VesselId, VesselType, WeatherCondition,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// A vessel's request for a berth.
#[derive(Debug, Clone)]
pub struct Booking {
    /// The calling vessel.
    pub vessel: Vessel,
    /// Planned arrival, in hours after the start of the day.
    pub arrival_hour: i64,
    /// Planned stay in hours.
    pub stay_hours: i64,
    /// Work to do alongside.
    pub operations: Vec<PlannedOperation>,
}

/// A mid-sized mixed-cargo port with three berths and four cranes.
pub fn demo_port() -> Port {
    Port {
        id: PortId::new(),
        name: String::from("Saltmarsh Harbour"),
        max_berths: 3,
        infrastructure: Infrastructure {
            water_depth: dec!(14.5),
            max_berth_length: dec!(320),
            crane_count: 4,
            facilities: BTreeSet::from([
                Facility::ContainerTerminal,
                Facility::HeavyLiftCranes,
                Facility::BulkHandling,
                Facility::LiquidBulkTerminal,
                Facility::RoRoRamp,
                Facility::BunkeringStation,
                Facility::CustomsOffice,
            ]),
            storage_capacity: dec!(250000),
            efficiency_factor: dec!(1.2),
        },
        handling_costs: BTreeMap::from([
            (Commodity::Containers, dec!(85)),
            (Commodity::Grain, dec!(4.5)),
            (Commodity::Coal, dec!(3.8)),
            (Commodity::CrudeOil, dec!(2.1)),
        ]),
        berthing_fee: dec!(3600),
        weather_profile: (1..=12)
            .map(|month| {
                let condition = match month {
                    12 | 1 | 2 => WeatherCondition::Rough,
                    3 | 10 | 11 => WeatherCondition::Moderate,
                    _ => WeatherCondition::Calm,
                };
                (month, condition)
            })
            .collect(),
    }
}

/// The day's bookings, in the order the agents file them.
pub fn demo_fleet() -> Vec<Booking> {
    vec![
        booking(
            "Northern Lark",
            VesselType::ContainerShip,
            (dec!(12.8), dec!(294)),
            (1, 10),
            vec![
                op(OperationType::Unloading, Commodity::Containers, dec!(420)),
                op(OperationType::Loading, Commodity::Containers, dec!(380)),
            ],
        ),
        booking(
            "Cape Warden",
            VesselType::BulkCarrier,
            (dec!(11.2), dec!(225)),
            (2, 16),
            vec![op(OperationType::Unloading, Commodity::Grain, dec!(1800))],
        ),
        booking(
            "Sea Thrift",
            VesselType::Tanker,
            (dec!(13.9), dec!(250)),
            (4, 12),
            vec![
                op(OperationType::Unloading, Commodity::CrudeOil, dec!(2400)),
                op(OperationType::Bunkering, Commodity::RefinedFuel, dec!(300)),
            ],
        ),
        booking(
            "Polar Ember",
            VesselType::LngCarrier,
            (dec!(11.5), dec!(290)),
            (5, 14),
            vec![op(OperationType::Unloading, Commodity::Lng, dec!(3000))],
        ),
        booking(
            "Kestrel Bay",
            VesselType::GeneralCargo,
            (dec!(8.4), dec!(140)),
            (6, 6),
            vec![
                op(OperationType::Unloading, Commodity::Steel, dec!(260)),
                op(OperationType::Inspection, Commodity::Steel, dec!(60)),
            ],
        ),
        booking(
            "Merrow",
            VesselType::RoRo,
            (dec!(7.9), dec!(190)),
            (12, 6),
            vec![op(OperationType::Loading, Commodity::Vehicles, dec!(500))],
        ),
        booking(
            "Ironside",
            VesselType::BulkCarrier,
            (dec!(12.1), dec!(240)),
            (18, 6),
            vec![op(OperationType::Loading, Commodity::Grain, dec!(900))],
        ),
    ]
}

fn booking(
    name: &str,
    vessel_type: VesselType,
    (draft, length): (Decimal, Decimal),
    (arrival_hour, stay_hours): (i64, i64),
    operations: Vec<PlannedOperation>,
) -> Booking {
    Booking {
        vessel: Vessel {
            id: VesselId::new(),
            name: String::from(name),
            vessel_type,
            draft,
            length,
        },
        arrival_hour,
        stay_hours,
        operations,
    }
}

const fn op(operation_type: OperationType, commodity: Commodity, quantity: Decimal) -> PlannedOperation {
    PlannedOperation {
        operation_type,
        commodity,
        quantity,
    }
}
