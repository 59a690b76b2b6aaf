//! Per-period performance metrics for a port.
//!
//! Arrivals are attributed to the period containing their *actual* arrival,
//! operations to the period containing their *actual* start. Allocations
//! that never arrived and operations that never started are invisible here.

use std::collections::BTreeMap;

use chrono::Duration;
use portcall_types::{AnalyticsPeriod, OperationStatus, PortPerformanceMetrics};
use rust_decimal::Decimal;

use crate::registry::{PortRecord, count_to_decimal, percent};

/// Compute metrics for `record` over `period`.
///
/// An arrival counts as on time when it is no later than the planned arrival
/// plus `on_time_grace_minutes`. The utilization rate is the mean of the
/// utilization samples taken inside the period, or the current value when
/// none were taken.
pub fn compute_performance(
    record: &PortRecord,
    period: AnalyticsPeriod,
    on_time_grace_minutes: i64,
) -> PortPerformanceMetrics {
    let grace = Duration::minutes(on_time_grace_minutes);

    let arrivals: Vec<_> = record
        .schedule
        .values()
        .filter(|e| e.actual_arrival.is_some_and(|at| period.contains(at)))
        .collect();

    let on_time_arrivals = arrivals
        .iter()
        .filter(|e| {
            let deadline = e
                .allocation
                .arrival
                .checked_add_signed(grace)
                .unwrap_or(e.allocation.arrival);
            e.actual_arrival.is_some_and(|at| at <= deadline)
        })
        .count();

    let turnarounds: Vec<i64> = arrivals
        .iter()
        .filter_map(|e| match (e.actual_arrival, e.actual_departure) {
            (Some(arrived), Some(departed)) => {
                Some(departed.signed_duration_since(arrived).num_minutes())
            }
            _ => None,
        })
        .collect();
    let average_turnaround_minutes = mean(turnarounds.iter().map(|m| Decimal::from(*m)))
        .unwrap_or(Decimal::ZERO);

    let revenue_generated = arrivals.iter().fold(Decimal::ZERO, |acc, e| {
        acc.saturating_add(e.allocation.estimated_cost)
    });

    let mut delays_by_type = BTreeMap::new();
    for delay in arrivals.iter().flat_map(|e| e.delays.iter()) {
        let total = delays_by_type.entry(delay.delay_type).or_insert(0_i64);
        *total = total.saturating_add(delay.duration_minutes);
    }
    let total_delay_minutes = delays_by_type
        .values()
        .fold(0_i64, |acc, m| acc.saturating_add(*m));

    let operations: Vec<_> = record
        .operations
        .values()
        .filter(|op| op.actual_start.is_some_and(|at| period.contains(at)))
        .collect();
    let completed: Vec<_> = operations
        .iter()
        .filter(|op| op.status == OperationStatus::Completed)
        .collect();

    let total_cargo_handled = operations
        .iter()
        .fold(Decimal::ZERO, |acc, op| acc.saturating_add(op.quantity));

    let operational_efficiency = if operations.is_empty() {
        Decimal::ONE_HUNDRED
    } else {
        percent(
            count_to_decimal(completed.len()),
            count_to_decimal(operations.len()),
        )
    };
    let average_efficiency =
        mean(completed.iter().map(|op| op.efficiency)).unwrap_or(Decimal::ONE);

    let utilization_rate = mean(
        record
            .utilization_history
            .iter()
            .filter(|s| period.contains(s.at))
            .map(|s| s.overall),
    )
    .unwrap_or(record.state.utilization.overall);

    PortPerformanceMetrics {
        port_id: record.id(),
        period,
        total_arrivals: saturating_u32(arrivals.len()),
        on_time_arrivals: saturating_u32(on_time_arrivals),
        average_turnaround_minutes,
        total_cargo_handled,
        total_operations: saturating_u32(operations.len()),
        completed_operations: saturating_u32(completed.len()),
        operational_efficiency,
        average_efficiency,
        revenue_generated,
        utilization_rate,
        total_delay_minutes,
        delays_by_type,
    }
}

/// Arithmetic mean, or `None` for an empty sequence.
fn mean(values: impl Iterator<Item = Decimal>) -> Option<Decimal> {
    let (sum, count) = values.fold((Decimal::ZERO, 0_usize), |(sum, count), v| {
        (sum.saturating_add(v), count.saturating_add(1))
    });
    if count == 0 {
        return None;
    }
    sum.checked_div(count_to_decimal(count))
}

fn saturating_u32(count: usize) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::{DateTime, TimeZone, Utc};
    use portcall_types::{
        AllocationId, AllocationStatus, BerthAllocation, Commodity, Delay, DelayType,
        Infrastructure, OperationId, OperationType, Port, PortId, PortOperation,
        UtilizationSample, Vessel, VesselId, VesselScheduleEntry, VesselType, WeatherCondition,
    };
    use rust_decimal_macros::dec;

    use super::*;

    fn t(hour: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, 1, 0, 0, 0)
            .single()
            .unwrap_or_default()
            + Duration::hours(hour)
    }

    fn record() -> PortRecord {
        let port = Port {
            id: PortId::new(),
            name: String::from("Lowmoor"),
            max_berths: 2,
            infrastructure: Infrastructure {
                water_depth: dec!(14),
                max_berth_length: dec!(300),
                crane_count: 2,
                facilities: BTreeSet::new(),
                storage_capacity: dec!(10000),
                efficiency_factor: Decimal::ONE,
            },
            handling_costs: BTreeMap::new(),
            berthing_fee: dec!(1000),
            weather_profile: BTreeMap::new(),
        };
        PortRecord::new(port, WeatherCondition::Calm, t(0))
    }

    fn visit(
        rec: &mut PortRecord,
        planned: i64,
        arrived_min: i64,
        departed: Option<i64>,
        cost: Decimal,
    ) -> AllocationId {
        let mut entry = VesselScheduleEntry::new(BerthAllocation {
            id: AllocationId::new(),
            port_id: rec.id(),
            vessel: Vessel {
                id: VesselId::new(),
                name: String::from("Gannet"),
                vessel_type: VesselType::GeneralCargo,
                draft: dec!(8),
                length: dec!(150),
            },
            berth_number: 1,
            arrival: t(planned),
            departure: t(planned + 10),
            planned_operations: Vec::new(),
            status: AllocationStatus::InProgress,
            estimated_cost: cost,
        });
        let arrived = t(planned) + Duration::minutes(arrived_min);
        entry.actual_arrival = Some(arrived);
        entry.actual_departure = departed.map(t);
        if arrived_min > 0 {
            entry.delays.push(Delay {
                delay_type: DelayType::Arrival,
                duration_minutes: arrived_min,
                reason: String::from("late"),
                recorded_at: arrived,
            });
        }
        let id = entry.allocation.id;
        rec.schedule.insert(id, entry);
        id
    }

    fn op(rec: &mut PortRecord, allocation_id: AllocationId, start: Option<i64>, status: OperationStatus, qty: Decimal, eff: Decimal) {
        let operation = PortOperation {
            id: OperationId::new(),
            allocation_id,
            port_id: rec.id(),
            operation_type: OperationType::Unloading,
            commodity: Commodity::Grain,
            quantity: qty,
            status,
            scheduled_start: t(0),
            estimated_duration_minutes: 60,
            actual_start: start.map(t),
            actual_end: None,
            efficiency: eff,
        };
        rec.operations.insert(operation.id, operation);
    }

    #[test]
    fn empty_period_reports_neutral_values() {
        let rec = record();
        let m = compute_performance(&rec, AnalyticsPeriod { start: t(0), end: t(24) }, 30);
        assert_eq!(m.total_arrivals, 0);
        assert_eq!(m.operational_efficiency, dec!(100));
        assert_eq!(m.average_turnaround_minutes, Decimal::ZERO);
        assert_eq!(m.average_efficiency, Decimal::ONE);
    }

    #[test]
    fn arrivals_turnaround_revenue_and_punctuality() {
        let mut rec = record();
        // On time within grace (20 min late), stayed 10h.
        let _ = visit(&mut rec, 2, 20, Some(12), dec!(1000));
        // 45 minutes late, still alongside.
        let _ = visit(&mut rec, 4, 45, None, dec!(3000));
        // Arrived outside the period.
        let _ = visit(&mut rec, 30, 0, Some(40), dec!(9999));

        let m = compute_performance(&rec, AnalyticsPeriod { start: t(0), end: t(24) }, 30);
        assert_eq!(m.total_arrivals, 2);
        assert_eq!(m.on_time_arrivals, 1);
        // 2:20 -> 12:00 = 580 minutes.
        assert_eq!(m.average_turnaround_minutes, dec!(580));
        assert_eq!(m.revenue_generated, dec!(4000));
        assert_eq!(m.total_delay_minutes, 65);
        assert_eq!(m.delays_by_type.get(&DelayType::Arrival), Some(&65));
    }

    #[test]
    fn operations_filtered_by_actual_start() {
        let mut rec = record();
        let a = visit(&mut rec, 1, 0, None, dec!(100));
        op(&mut rec, a, Some(2), OperationStatus::Completed, dec!(300), dec!(1.5));
        op(&mut rec, a, Some(3), OperationStatus::InProgress, dec!(200), Decimal::ONE);
        op(&mut rec, a, Some(5), OperationStatus::Completed, dec!(100), dec!(0.5));
        op(&mut rec, a, None, OperationStatus::Waiting, dec!(999), Decimal::ONE);
        op(&mut rec, a, Some(50), OperationStatus::Completed, dec!(999), Decimal::ONE);

        let m = compute_performance(&rec, AnalyticsPeriod { start: t(0), end: t(24) }, 30);
        assert_eq!(m.total_operations, 3);
        assert_eq!(m.completed_operations, 2);
        assert_eq!(m.total_cargo_handled, dec!(600));
        assert_eq!(m.operational_efficiency.round_dp(2), dec!(66.67));
        assert_eq!(m.average_efficiency, dec!(1.0));
    }

    #[test]
    fn utilization_rate_averages_samples_in_period() {
        let mut rec = record();
        rec.utilization_history.clear();
        for (hour, overall) in [(1, dec!(20)), (2, dec!(40)), (30, dec!(90))] {
            rec.utilization_history.push_back(UtilizationSample {
                at: t(hour),
                overall,
            });
        }
        let m = compute_performance(&rec, AnalyticsPeriod { start: t(0), end: t(24) }, 30);
        assert_eq!(m.utilization_rate, dec!(30));

        // No samples in range: fall back to the current value.
        rec.state.utilization.overall = dec!(55);
        let later = compute_performance(&rec, AnalyticsPeriod { start: t(100), end: t(124) }, 30);
        assert_eq!(later.utilization_rate, dec!(55));
    }
}
