//! Per-port state owned by the engine.
//!
//! A [`PortRecord`] holds everything the engine knows about one port: the
//! immutable [`Port`] configuration, the mutable [`PortState`], the schedule
//! of allocations, the operations created at arrival, the cargo inventory
//! and a bounded history of utilization samples. Each record sits behind its
//! own mutex in the engine, so every method here runs inside that port's
//! critical section.

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use portcall_types::{
    AllocationId, AllocationStatus, Commodity, OperationId, OperationStatus, Port, PortId,
    PortState, PortStatus, PortOperation, Utilization, UtilizationSample, VesselScheduleEntry,
    WeatherCondition,
};
use rust_decimal::Decimal;

use crate::error::PortError;
use crate::inventory;

/// One hundred, the upper bound of every utilization percentage.
const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Everything the engine tracks for one port.
#[derive(Debug, Clone)]
pub struct PortRecord {
    /// Static configuration.
    pub port: Port,
    /// Mutable state served by `get_port_state`.
    pub state: PortState,
    /// Schedule entries (each wrapping its allocation) keyed by allocation.
    pub schedule: BTreeMap<AllocationId, VesselScheduleEntry>,
    /// Operations created at arrival, keyed by operation.
    pub operations: BTreeMap<OperationId, PortOperation>,
    /// Cargo in storage.
    pub inventory: BTreeMap<Commodity, Decimal>,
    /// Overall utilization samples, oldest first.
    pub utilization_history: VecDeque<UtilizationSample>,
}

impl PortRecord {
    /// Create the record for a newly registered port.
    ///
    /// The port starts operational with zero utilization.
    pub fn new(port: Port, weather: WeatherCondition, now: DateTime<Utc>) -> Self {
        let state = PortState {
            port_id: port.id,
            utilization: Utilization::default(),
            weather,
            status: PortStatus::Operational,
            last_updated: now,
        };
        let mut utilization_history = VecDeque::new();
        utilization_history.push_back(UtilizationSample {
            at: now,
            overall: Decimal::ZERO,
        });
        Self {
            port,
            state,
            schedule: BTreeMap::new(),
            operations: BTreeMap::new(),
            inventory: BTreeMap::new(),
            utilization_history,
        }
    }

    /// The port's identifier.
    pub const fn id(&self) -> PortId {
        self.port.id
    }

    /// Look up a schedule entry.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::AllocationNotFound`] when absent.
    pub fn entry(&self, allocation: AllocationId) -> Result<&VesselScheduleEntry, PortError> {
        self.schedule
            .get(&allocation)
            .ok_or(PortError::AllocationNotFound(allocation))
    }

    /// Look up a schedule entry for mutation.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::AllocationNotFound`] when absent.
    pub fn entry_mut(
        &mut self,
        allocation: AllocationId,
    ) -> Result<&mut VesselScheduleEntry, PortError> {
        self.schedule
            .get_mut(&allocation)
            .ok_or(PortError::AllocationNotFound(allocation))
    }

    /// Look up an operation.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::OperationNotFound`] when absent.
    pub fn operation(&self, operation: OperationId) -> Result<&PortOperation, PortError> {
        self.operations
            .get(&operation)
            .ok_or(PortError::OperationNotFound(operation))
    }

    /// Look up an operation for mutation.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::OperationNotFound`] when absent.
    pub fn operation_mut(&mut self, operation: OperationId) -> Result<&mut PortOperation, PortError> {
        self.operations
            .get_mut(&operation)
            .ok_or(PortError::OperationNotFound(operation))
    }

    /// Vessels currently alongside.
    pub fn vessels_in_port(&self) -> usize {
        self.schedule
            .values()
            .filter(|e| e.allocation.status == AllocationStatus::InProgress)
            .count()
    }

    /// Operations in the given status.
    pub fn operations_in(&self, status: OperationStatus) -> usize {
        self.operations
            .values()
            .filter(|op| op.status == status)
            .count()
    }

    /// Compute utilization from the current schedule, operations and
    /// inventory. Every component is clamped to `[0, 100]`.
    pub fn compute_utilization(&self) -> Utilization {
        let berth = percent(
            count_to_decimal(self.vessels_in_port()),
            Decimal::from(self.port.max_berths),
        );
        let crane = percent(
            count_to_decimal(self.operations_in(OperationStatus::InProgress)),
            Decimal::from(self.port.infrastructure.crane_count),
        );
        let storage = percent(
            inventory::total(&self.inventory),
            self.port.infrastructure.storage_capacity,
        );
        let overall = berth
            .saturating_add(crane)
            .checked_div(Decimal::TWO)
            .unwrap_or(Decimal::ZERO)
            .clamp(Decimal::ZERO, HUNDRED);

        Utilization {
            berth,
            crane,
            storage,
            overall,
        }
    }

    /// Recompute utilization, store it, and append a history sample.
    ///
    /// Returns `(previous, current)` when any component changed so the
    /// caller can emit a `UtilizationChanged` event.
    pub fn refresh_utilization(
        &mut self,
        now: DateTime<Utc>,
        history_limit: usize,
    ) -> Option<(Utilization, Utilization)> {
        let previous = self.state.utilization;
        let current = self.compute_utilization();
        if current == previous {
            return None;
        }

        self.state.utilization = current;
        self.state.last_updated = now;
        self.utilization_history.push_back(UtilizationSample {
            at: now,
            overall: current.overall,
        });
        while self.utilization_history.len() > history_limit.max(1) {
            self.utilization_history.pop_front();
        }
        Some((previous, current))
    }

    /// Apply new weather and status, stamping `last_updated`.
    ///
    /// Returns `true` if anything changed.
    pub fn set_conditions(
        &mut self,
        weather: WeatherCondition,
        status: PortStatus,
        now: DateTime<Utc>,
    ) -> bool {
        if self.state.weather == weather && self.state.status == status {
            return false;
        }
        self.state.weather = weather;
        self.state.status = status;
        self.state.last_updated = now;
        true
    }
}

/// `part / whole * 100`, clamped to `[0, 100]`. Zero when `whole` is not
/// positive.
pub fn percent(part: Decimal, whole: Decimal) -> Decimal {
    if whole <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    part.checked_mul(HUNDRED)
        .and_then(|scaled| scaled.checked_div(whole))
        .unwrap_or(HUNDRED)
        .clamp(Decimal::ZERO, HUNDRED)
}

/// Convert a collection length to [`Decimal`], saturating at `u32::MAX`.
pub fn count_to_decimal(count: usize) -> Decimal {
    Decimal::from(u32::try_from(count).unwrap_or(u32::MAX))
}
