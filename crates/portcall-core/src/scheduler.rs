//! Berth allocation: compatibility, conflict detection and cost.
//!
//! # Occupancy
//!
//! A berth is blocked by an allocation over its *occupancy window*, a
//! half-open interval `[start, end)`:
//!
//! | Status | Window |
//! |--------|--------|
//! | Confirmed | planned `[arrival, departure)` |
//! | InProgress | `[min(planned, actual arrival), planned departure)` |
//! | Completed | actual `[arrival, departure)` |
//! | Requested, Cancelled | none |
//!
//! Using the actual window for completed stays is what frees the rest of a
//! berth's slot when a vessel leaves early. An early arrival widens its own
//! window, so it is accepted only while the berth is clear back to the
//! actual arrival time ([`can_occupy`]).
//!
//! # Search
//!
//! Berths are scanned from 1 upwards and the first free one wins. The
//! search is deterministic so identical request sequences always produce
//! identical berth assignments.

use chrono::{DateTime, Utc};
use portcall_types::{
    AllocationId, AllocationStatus, PlannedOperation, Port, Vessel, VesselScheduleEntry,
};
use rust_decimal::Decimal;
use tracing::warn;

use crate::config::FeeConfig;
use crate::error::PortError;
use crate::registry::PortRecord;
use crate::sources::PricingSource;

/// Minutes in a day, the unit the berthing fee is quoted for.
const MINUTES_PER_DAY: Decimal = Decimal::from_parts(1_440, 0, 0, false, 0);

/// Reject windows that do not move forward and negative planned quantities.
///
/// # Errors
///
/// Returns [`PortError::InvalidTimeWindow`] or [`PortError::InvalidQuantity`].
pub fn validate_request(
    arrival: DateTime<Utc>,
    departure: DateTime<Utc>,
    planned: &[PlannedOperation],
) -> Result<(), PortError> {
    if departure <= arrival {
        return Err(PortError::InvalidTimeWindow);
    }
    if let Some(bad) = planned.iter().find(|op| op.quantity.is_sign_negative()) {
        return Err(PortError::InvalidQuantity(format!(
            "{:?} of {:?} planned at {}",
            bad.operation_type, bad.commodity, bad.quantity
        )));
    }
    Ok(())
}

/// Check a vessel against a port's physical limits and facilities.
///
/// Returns every failed check; an empty list means the vessel fits.
pub fn check_compatibility(port: &Port, vessel: &Vessel) -> Vec<String> {
    let infra = &port.infrastructure;
    let mut issues = Vec::new();

    if vessel.draft > infra.water_depth {
        issues.push(format!(
            "draft {}m exceeds water depth {}m",
            vessel.draft, infra.water_depth
        ));
    }
    if vessel.length > infra.max_berth_length {
        issues.push(format!(
            "length {}m exceeds max berth length {}m",
            vessel.length, infra.max_berth_length
        ));
    }
    for facility in vessel.vessel_type.required_facilities() {
        if !infra.facilities.contains(&facility) {
            issues.push(format!(
                "{:?} requires facility {facility:?}",
                vessel.vessel_type
            ));
        }
    }
    issues
}

/// The interval during which `entry` blocks its berth, if any.
pub fn occupancy_window(entry: &VesselScheduleEntry) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let allocation = &entry.allocation;
    match allocation.status {
        AllocationStatus::Requested | AllocationStatus::Cancelled => None,
        AllocationStatus::Confirmed => Some((allocation.arrival, allocation.departure)),
        AllocationStatus::InProgress => {
            let start = entry
                .actual_arrival
                .map_or(allocation.arrival, |actual| actual.min(allocation.arrival));
            Some((start, allocation.departure))
        }
        AllocationStatus::Completed => match (entry.actual_arrival, entry.actual_departure) {
            (Some(start), Some(end)) => Some((start, end)),
            _ => Some((allocation.arrival, allocation.departure)),
        },
    }
}

/// Whether two half-open intervals intersect.
pub fn overlaps(
    a: (DateTime<Utc>, DateTime<Utc>),
    b: (DateTime<Utc>, DateTime<Utc>),
) -> bool {
    a.0 < b.1 && b.0 < a.1
}

/// Whether `berth` is free over `[arrival, departure)`.
pub fn is_berth_free(
    record: &PortRecord,
    berth: u32,
    arrival: DateTime<Utc>,
    departure: DateTime<Utc>,
) -> bool {
    !is_blocked(record, berth, (arrival, departure), None)
}

/// Whether `allocation` can widen its own stay on `berth` to
/// `[arrival, departure)` without running into another occupant.
pub fn can_occupy(
    record: &PortRecord,
    allocation: AllocationId,
    berth: u32,
    arrival: DateTime<Utc>,
    departure: DateTime<Utc>,
) -> bool {
    !is_blocked(record, berth, (arrival, departure), Some(allocation))
}

fn is_blocked(
    record: &PortRecord,
    berth: u32,
    window: (DateTime<Utc>, DateTime<Utc>),
    except: Option<AllocationId>,
) -> bool {
    record
        .schedule
        .values()
        .filter(|e| e.allocation.berth_number == berth && Some(e.allocation.id) != except)
        .filter_map(occupancy_window)
        .any(|occupied| overlaps(occupied, window))
}

/// First berth (ascending from 1) that is free for the whole window.
pub fn find_free_berth(
    record: &PortRecord,
    arrival: DateTime<Utc>,
    departure: DateTime<Utc>,
) -> Option<u32> {
    (1..=record.port.max_berths).find(|&berth| is_berth_free(record, berth, arrival, departure))
}

/// Handling price per unit: the port's own table first, then the market.
pub fn handling_price(
    port: &Port,
    pricing: &dyn PricingSource,
    op: &PlannedOperation,
) -> Option<Decimal> {
    port.handling_costs
        .get(&op.commodity)
        .copied()
        .or_else(|| pricing.handling_cost(op.commodity))
}

/// Estimate the charges for a stay.
///
/// `berthing_fee * (hours / 24) + sum(handling * quantity) + flat fees`.
/// A commodity with no price contributes nothing and logs a warning.
///
/// # Errors
///
/// Returns [`PortError::Internal`] on arithmetic overflow.
pub fn estimate_cost(
    port: &Port,
    pricing: &dyn PricingSource,
    fees: &FeeConfig,
    arrival: DateTime<Utc>,
    departure: DateTime<Utc>,
    planned: &[PlannedOperation],
) -> Result<Decimal, PortError> {
    let minutes = Decimal::from(departure.signed_duration_since(arrival).num_minutes());
    let berthing = port
        .berthing_fee
        .checked_mul(minutes)
        .and_then(|v| v.checked_div(MINUTES_PER_DAY))
        .ok_or_else(|| PortError::overflow("berthing fee"))?;

    let mut handling = Decimal::ZERO;
    for op in planned {
        let Some(price) = handling_price(port, pricing, op) else {
            warn!(
                port_id = %port.id,
                commodity = ?op.commodity,
                "No handling price for commodity; costed at zero"
            );
            continue;
        };
        let line = price
            .checked_mul(op.quantity)
            .ok_or_else(|| PortError::overflow("handling cost"))?;
        handling = handling
            .checked_add(line)
            .ok_or_else(|| PortError::overflow("handling cost"))?;
    }

    berthing
        .checked_add(handling)
        .and_then(|v| v.checked_add(fees.total()))
        .ok_or_else(|| PortError::overflow("cost estimate"))
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use chrono::{Duration, TimeZone};
    use portcall_types::{
        AllocationId, BerthAllocation, Commodity, Facility, Infrastructure, OperationType,
        PortId, VesselId, VesselType, WeatherCondition,
    };
    use rust_decimal_macros::dec;

    use super::*;
    use crate::sources::{NoPricing, StaticPricing};

    fn t(hour: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 10, 0, 0, 0)
            .single()
            .unwrap_or_default()
            + Duration::hours(hour)
    }

    fn port(max_berths: u32) -> Port {
        Port {
            id: PortId::new(),
            name: String::from("Grey Haven"),
            max_berths,
            infrastructure: Infrastructure {
                water_depth: dec!(12),
                max_berth_length: dec!(250),
                crane_count: 3,
                facilities: BTreeSet::from([Facility::BulkHandling]),
                storage_capacity: dec!(50000),
                efficiency_factor: Decimal::ONE,
            },
            handling_costs: BTreeMap::from([(Commodity::Grain, dec!(2))]),
            berthing_fee: dec!(2400),
            weather_profile: BTreeMap::new(),
        }
    }

    fn vessel(vessel_type: VesselType, draft: Decimal, length: Decimal) -> Vessel {
        Vessel {
            id: VesselId::new(),
            name: String::from("Petrel"),
            vessel_type,
            draft,
            length,
        }
    }

    fn entry(
        port_id: PortId,
        berth: u32,
        window: (i64, i64),
        status: AllocationStatus,
    ) -> VesselScheduleEntry {
        VesselScheduleEntry::new(BerthAllocation {
            id: AllocationId::new(),
            port_id,
            vessel: vessel(VesselType::BulkCarrier, dec!(10), dec!(200)),
            berth_number: berth,
            arrival: t(window.0),
            departure: t(window.1),
            planned_operations: Vec::new(),
            status,
            estimated_cost: Decimal::ZERO,
        })
    }

    fn record_with(entries: Vec<VesselScheduleEntry>, max_berths: u32) -> PortRecord {
        let mut rec = PortRecord::new(port(max_berths), WeatherCondition::Calm, t(0));
        for e in entries {
            rec.schedule.insert(e.allocation.id, e);
        }
        rec
    }

    #[test]
    fn compatible_vessel_has_no_issues() {
        let issues = check_compatibility(
            &port(1),
            &vessel(VesselType::BulkCarrier, dec!(11.9), dec!(250)),
        );
        assert!(issues.is_empty());
    }

    #[test]
    fn every_failed_check_is_reported() {
        let issues = check_compatibility(
            &port(1),
            &vessel(VesselType::ContainerShip, dec!(14), dec!(300)),
        );
        // draft, length, container terminal, heavy-lift cranes
        assert_eq!(issues.len(), 4);
        assert!(issues.iter().any(|i| i.contains("draft")));
        assert!(issues.iter().any(|i| i.contains("ContainerTerminal")));
    }

    #[test]
    fn half_open_windows_touching_do_not_overlap() {
        assert!(!overlaps((t(10), t(20)), (t(20), t(30))));
        assert!(overlaps((t(10), t(20)), (t(19), t(30))));
        assert!(overlaps((t(10), t(20)), (t(12), t(13))));
    }

    #[test]
    fn first_fit_picks_lowest_free_berth() {
        let mut rec = record_with(Vec::new(), 3);
        let port_id = rec.id();
        assert_eq!(find_free_berth(&rec, t(10), t(20)), Some(1));

        let e = entry(port_id, 1, (10, 20), AllocationStatus::Confirmed);
        rec.schedule.insert(e.allocation.id, e);
        assert_eq!(find_free_berth(&rec, t(10), t(20)), Some(2));
        // Back-to-back on berth 1 is fine.
        assert_eq!(find_free_berth(&rec, t(20), t(30)), Some(1));
    }

    #[test]
    fn cancelled_and_requested_do_not_block() {
        let port_id = PortId::new();
        let rec = record_with(
            vec![
                entry(port_id, 1, (0, 48), AllocationStatus::Cancelled),
                entry(port_id, 1, (0, 48), AllocationStatus::Requested),
            ],
            1,
        );
        assert_eq!(find_free_berth(&rec, t(10), t(20)), Some(1));
    }

    #[test]
    fn completed_stay_blocks_only_actual_window() {
        let port_id = PortId::new();
        let mut done = entry(port_id, 1, (10, 30), AllocationStatus::Completed);
        done.actual_arrival = Some(t(10));
        done.actual_departure = Some(t(15));
        let rec = record_with(vec![done], 1);

        assert_eq!(find_free_berth(&rec, t(16), t(30)), Some(1));
        assert_eq!(find_free_berth(&rec, t(12), t(30)), None);
    }

    #[test]
    fn early_arrival_extends_in_progress_window() {
        let port_id = PortId::new();
        let mut alongside = entry(port_id, 1, (10, 20), AllocationStatus::InProgress);
        alongside.actual_arrival = Some(t(8));
        let rec = record_with(vec![alongside], 1);
        assert_eq!(find_free_berth(&rec, t(6), t(9)), None);
        assert_eq!(find_free_berth(&rec, t(6), t(8)), Some(1));
    }

    #[test]
    fn early_arrival_may_not_cut_into_the_previous_stay() {
        let port_id = PortId::new();
        let mut alongside = entry(port_id, 1, (10, 20), AllocationStatus::InProgress);
        alongside.actual_arrival = Some(t(10));
        let next = entry(port_id, 1, (20, 30), AllocationStatus::Confirmed);
        let next_id = next.allocation.id;
        let rec = record_with(vec![alongside, next], 1);

        // Its own planned window never blocks it.
        assert!(can_occupy(&rec, next_id, 1, t(20), t(30)));
        assert!(!can_occupy(&rec, next_id, 1, t(15), t(30)));
        assert!(!is_berth_free(&rec, 1, t(20), t(30)));
    }

    #[test]
    fn cost_includes_berthing_handling_and_fees() {
        let p = port(1);
        let planned = vec![PlannedOperation {
            operation_type: OperationType::Unloading,
            commodity: Commodity::Grain,
            quantity: dec!(1000),
        }];
        let fees = FeeConfig::default();
        // 12 hours at 2400/day = 1200; 1000 * 2 = 2000; fees 4800.
        let cost = estimate_cost(&p, &NoPricing, &fees, t(0), t(12), &planned).ok();
        assert_eq!(cost, Some(dec!(8000)));
    }

    #[test]
    fn market_price_fills_gaps_in_port_table() {
        let p = port(1);
        let planned = vec![PlannedOperation {
            operation_type: OperationType::Loading,
            commodity: Commodity::Coal,
            quantity: dec!(100),
        }];
        let fees = FeeConfig {
            pilotage: Decimal::ZERO,
            towage: Decimal::ZERO,
            agency: Decimal::ZERO,
        };
        let market = StaticPricing::new([(Commodity::Coal, dec!(3))]);
        assert_eq!(
            estimate_cost(&p, &market, &fees, t(0), t(24), &planned).ok(),
            Some(dec!(2700))
        );
        // Unpriced commodities cost nothing.
        assert_eq!(
            estimate_cost(&p, &NoPricing, &fees, t(0), t(24), &planned).ok(),
            Some(dec!(2400))
        );
    }

    #[test]
    fn request_validation() {
        assert_eq!(
            validate_request(t(10), t(10), &[]),
            Err(PortError::InvalidTimeWindow)
        );
        let negative = [PlannedOperation {
            operation_type: OperationType::Loading,
            commodity: Commodity::Grain,
            quantity: dec!(-1),
        }];
        assert!(matches!(
            validate_request(t(10), t(11), &negative),
            Err(PortError::InvalidQuantity(_))
        ));
        assert!(validate_request(t(10), t(11), &[]).is_ok());
    }
}
