//! Vessel lifecycle rules: delays, operation estimates, start
//! preconditions, efficiency and final charges.
//!
//! These are the pure calculations behind arrival, operation and departure
//! processing. The engine applies them to a [`PortRecord`] while holding the
//! port's lock.

use chrono::{DateTime, Utc};
use portcall_types::{
    BerthAllocation, Delay, DelayType, OperationId, OperationStatus, OperationType, Port,
    PortOperation, PortStatus, WeatherCondition,
};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::config::OperationsConfig;
use crate::error::PortError;
use crate::registry::PortRecord;

/// Lowest efficiency an operation can score.
pub const MIN_EFFICIENCY: Decimal = Decimal::from_parts(1, 0, 0, false, 1);

/// Highest efficiency an operation can score.
pub const MAX_EFFICIENCY: Decimal = Decimal::TWO;

const SECONDS_PER_MINUTE: Decimal = Decimal::from_parts(60, 0, 0, false, 0);
const MINUTES_PER_DAY: Decimal = Decimal::from_parts(1_440, 0, 0, false, 0);

/// Whole minutes by which `actual` is later than `planned` (zero if not late).
pub fn lateness_minutes(planned: DateTime<Utc>, actual: DateTime<Utc>) -> i64 {
    actual.signed_duration_since(planned).num_minutes().max(0)
}

/// Build a delay record when `actual` is later than `planned`.
pub fn delay_if_late(
    delay_type: DelayType,
    planned: DateTime<Utc>,
    actual: DateTime<Utc>,
) -> Option<Delay> {
    let minutes = lateness_minutes(planned, actual);
    (minutes > 0).then(|| Delay {
        delay_type,
        duration_minutes: minutes,
        reason: format!("{delay_type:?} {minutes} min behind plan"),
        recorded_at: actual,
    })
}

/// Estimated minutes for an operation.
///
/// `ceil(base_minutes_per_unit * quantity / efficiency_factor)`, never less
/// than one minute. A non-positive efficiency factor is treated as 1.
///
/// # Errors
///
/// Returns [`PortError::Internal`] on arithmetic overflow.
pub fn estimate_duration_minutes(
    config: &OperationsConfig,
    port: &Port,
    operation_type: OperationType,
    quantity: Decimal,
) -> Result<i64, PortError> {
    let factor = if port.infrastructure.efficiency_factor > Decimal::ZERO {
        port.infrastructure.efficiency_factor
    } else {
        Decimal::ONE
    };
    config
        .minutes_per_unit(operation_type)
        .checked_mul(quantity)
        .and_then(|v| v.checked_div(factor))
        .and_then(|v| v.ceil().to_i64())
        .map(|minutes| minutes.max(1))
        .ok_or_else(|| PortError::overflow("operation duration estimate"))
}

/// Create the waiting operations for an allocation that just arrived.
///
/// # Errors
///
/// Returns [`PortError::Internal`] on arithmetic overflow.
pub fn create_operations(
    config: &OperationsConfig,
    port: &Port,
    allocation: &BerthAllocation,
    scheduled_start: DateTime<Utc>,
) -> Result<Vec<PortOperation>, PortError> {
    allocation
        .planned_operations
        .iter()
        .map(|planned| {
            Ok(PortOperation {
                id: OperationId::new(),
                allocation_id: allocation.id,
                port_id: port.id,
                operation_type: planned.operation_type,
                commodity: planned.commodity,
                quantity: planned.quantity,
                status: OperationStatus::Waiting,
                scheduled_start,
                estimated_duration_minutes: estimate_duration_minutes(
                    config,
                    port,
                    planned.operation_type,
                    planned.quantity,
                )?,
                actual_start: None,
                actual_end: None,
                efficiency: Decimal::ONE,
            })
        })
        .collect()
}

/// Queue position for a new arrival: one behind every waiting operation.
pub fn queue_position(waiting_ahead: usize) -> u32 {
    u32::try_from(waiting_ahead)
        .unwrap_or(u32::MAX)
        .saturating_add(1)
}

/// Heuristic wait estimate: a fixed number of minutes per queue slot.
pub fn estimated_wait_minutes(queue_position: u32, minutes_per_slot: i64) -> i64 {
    i64::from(queue_position).saturating_mul(minutes_per_slot)
}

/// Every reason the port cannot start another operation right now.
pub fn start_issues(record: &PortRecord) -> Vec<String> {
    let mut issues = Vec::new();
    if record.state.weather == WeatherCondition::Severe {
        issues.push(String::from("weather is severe"));
    }
    if record.state.status != PortStatus::Operational {
        issues.push(format!("port status is {:?}", record.state.status));
    }
    let running = record.operations_in(OperationStatus::InProgress);
    let cranes = usize::try_from(record.port.infrastructure.crane_count).unwrap_or(usize::MAX);
    if running >= cranes {
        issues.push(format!("all {cranes} cranes are busy ({running} operations running)"));
    }
    issues
}

/// Efficiency of a finished operation: estimated over actual minutes,
/// clamped to `[0.1, 2.0]`. A run with no measurable duration scores the
/// maximum.
pub fn compute_efficiency(
    estimated_minutes: i64,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Decimal {
    let actual_minutes = Decimal::from(end.signed_duration_since(start).num_seconds())
        .checked_div(SECONDS_PER_MINUTE)
        .unwrap_or(Decimal::ZERO);
    if actual_minutes <= Decimal::ZERO {
        return MAX_EFFICIENCY;
    }
    Decimal::from(estimated_minutes)
        .checked_div(actual_minutes)
        .unwrap_or(MAX_EFFICIENCY)
        .clamp(MIN_EFFICIENCY, MAX_EFFICIENCY)
}

/// Close an in-progress operation at `end`, recording its final quantity
/// and efficiency.
pub fn finish_operation(op: &mut PortOperation, end: DateTime<Utc>, quantity: Decimal) {
    let start = op.actual_start.unwrap_or(end);
    op.actual_end = Some(end);
    op.quantity = quantity;
    op.efficiency = compute_efficiency(op.estimated_duration_minutes, start, end);
    op.status = OperationStatus::Completed;
}

/// Charges for the stay actually taken: `estimated_cost * (hours / 24)`.
///
/// # Errors
///
/// Returns [`PortError::Internal`] on arithmetic overflow.
pub fn total_cost(estimated_cost: Decimal, port_time_minutes: i64) -> Result<Decimal, PortError> {
    estimated_cost
        .checked_mul(Decimal::from(port_time_minutes.max(0)))
        .and_then(|v| v.checked_div(MINUTES_PER_DAY))
        .ok_or_else(|| PortError::overflow("total cost"))
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use chrono::{Duration, TimeZone};
    use portcall_types::{
        AllocationId, AllocationStatus, Commodity, Infrastructure, PlannedOperation, PortId,
        Vessel, VesselId, VesselType,
    };
    use rust_decimal_macros::dec;

    use super::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 4, 10, 0, 0)
            .single()
            .unwrap_or_default()
    }

    fn port(cranes: u32, factor: Decimal) -> Port {
        Port {
            id: PortId::new(),
            name: String::from("Osprey Point"),
            max_berths: 2,
            infrastructure: Infrastructure {
                water_depth: dec!(16),
                max_berth_length: dec!(400),
                crane_count: cranes,
                facilities: BTreeSet::new(),
                storage_capacity: dec!(100000),
                efficiency_factor: factor,
            },
            handling_costs: BTreeMap::new(),
            berthing_fee: dec!(1000),
            weather_profile: BTreeMap::new(),
        }
    }

    #[test]
    fn arrival_45_minutes_late_records_45_minute_delay() {
        let delay = delay_if_late(DelayType::Arrival, t0(), t0() + Duration::minutes(45));
        assert_eq!(delay.as_ref().map(|d| d.duration_minutes), Some(45));
        assert_eq!(delay.map(|d| d.delay_type), Some(DelayType::Arrival));
    }

    #[test]
    fn early_or_on_time_records_no_delay() {
        assert!(delay_if_late(DelayType::Arrival, t0(), t0()).is_none());
        assert!(delay_if_late(DelayType::Departure, t0(), t0() - Duration::hours(1)).is_none());
    }

    #[test]
    fn efficiency_is_capped_at_two() {
        let e = compute_efficiency(120, t0(), t0() + Duration::minutes(60));
        assert_eq!(e, dec!(2.0));
    }

    #[test]
    fn slow_operation_scores_ratio() {
        let e = compute_efficiency(100, t0(), t0() + Duration::minutes(500));
        assert_eq!(e, dec!(0.2));
    }

    #[test]
    fn efficiency_is_floored_at_one_tenth() {
        let e = compute_efficiency(10, t0(), t0() + Duration::minutes(1000));
        assert_eq!(e, dec!(0.1));
    }

    #[test]
    fn instant_operation_scores_maximum() {
        assert_eq!(compute_efficiency(30, t0(), t0()), MAX_EFFICIENCY);
    }

    #[test]
    fn duration_scales_with_quantity_and_factor() {
        let config = OperationsConfig::default();
        let normal = estimate_duration_minutes(
            &config,
            &port(2, Decimal::ONE),
            OperationType::Loading,
            dec!(1000),
        );
        assert_eq!(normal.ok(), Some(500));

        let fast = estimate_duration_minutes(
            &config,
            &port(2, dec!(2)),
            OperationType::Loading,
            dec!(1000),
        );
        assert_eq!(fast.ok(), Some(250));

        // Zero factor falls back to 1, tiny quantities still take a minute.
        let tiny = estimate_duration_minutes(
            &config,
            &port(2, Decimal::ZERO),
            OperationType::Bunkering,
            dec!(0.1),
        );
        assert_eq!(tiny.ok(), Some(1));
    }

    #[test]
    fn operations_created_waiting_per_plan() {
        let p = port(2, Decimal::ONE);
        let allocation = BerthAllocation {
            id: AllocationId::new(),
            port_id: p.id,
            vessel: Vessel {
                id: VesselId::new(),
                name: String::from("Tern"),
                vessel_type: VesselType::GeneralCargo,
                draft: dec!(7),
                length: dec!(140),
            },
            berth_number: 1,
            arrival: t0(),
            departure: t0() + Duration::hours(12),
            planned_operations: vec![
                PlannedOperation {
                    operation_type: OperationType::Unloading,
                    commodity: Commodity::Steel,
                    quantity: dec!(200),
                },
                PlannedOperation {
                    operation_type: OperationType::Inspection,
                    commodity: Commodity::Steel,
                    quantity: dec!(30),
                },
            ],
            status: AllocationStatus::InProgress,
            estimated_cost: dec!(5000),
        };
        let ops = create_operations(&OperationsConfig::default(), &p, &allocation, t0());
        let ops = ops.unwrap_or_default();
        assert_eq!(ops.len(), 2);
        assert!(ops.iter().all(|op| op.status == OperationStatus::Waiting));
        assert!(ops.iter().all(|op| op.allocation_id == allocation.id));
        assert_eq!(ops.first().map(|op| op.estimated_duration_minutes), Some(100));
        assert_eq!(ops.get(1).map(|op| op.estimated_duration_minutes), Some(30));
    }

    #[test]
    fn queue_and_wait_heuristic() {
        assert_eq!(queue_position(0), 1);
        assert_eq!(queue_position(3), 4);
        assert_eq!(estimated_wait_minutes(4, 30), 120);
    }

    #[test]
    fn total_cost_scales_by_days_alongside() {
        assert_eq!(total_cost(dec!(4800), 720).ok(), Some(dec!(2400)));
        assert_eq!(total_cost(dec!(4800), 2880).ok(), Some(dec!(9600)));
    }

    #[test]
    fn start_issues_collects_every_failure() {
        let mut rec = PortRecord::new(port(0, Decimal::ONE), WeatherCondition::Severe, t0());
        rec.state.status = PortStatus::Suspended;
        let issues = start_issues(&rec);
        assert_eq!(issues.len(), 3);

        let ok = PortRecord::new(port(1, Decimal::ONE), WeatherCondition::Rough, t0());
        assert!(start_issues(&ok).is_empty());
    }
}
