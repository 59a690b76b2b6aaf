//! The port engine: registry, scheduler, vessel lifecycle and analytics
//! behind one async API.
//!
//! # Locking
//!
//! Ports live in a `RwLock<BTreeMap<PortId, Arc<Mutex<PortRecord>>>>`. The
//! outer map is write-locked only to register a port. Every other call takes
//! the read lock long enough to clone the port's `Arc`, then holds that
//! port's mutex for the whole check-then-act sequence. Two requests for the
//! same berth therefore serialize, while different ports proceed in
//! parallel.
//!
//! Events are emitted while the port's mutex is held, so subscribers see a
//! port's events in the order its transitions happened.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use portcall_types::{
    AllocationId, AllocationStatus, AnalyticsPeriod, BerthAllocation, CargoInventory, Delay,
    DelayType, OperationId, OperationStatus, PlannedOperation, Port, PortEvent, PortId,
    PortOperation, PortPerformanceMetrics, PortState, PortStatus, Utilization, Vessel,
    VesselArrivalResult, VesselDepartureResult, VesselScheduleEntry, WeatherCondition,
};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, RwLock, broadcast};
use tracing::{debug, error, info};

use crate::analytics;
use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::error::PortError;
use crate::inventory::{self, CargoMovement};
use crate::lifecycle;
use crate::notifier::EventNotifier;
use crate::registry::PortRecord;
use crate::scheduler;
use crate::sources::{NoPricing, PortProfileWeather, PricingSource, WeatherSource};

type SharedRecord = Arc<Mutex<PortRecord>>;

/// Berth scheduling and vessel operations engine for a set of ports.
///
/// Share it between tasks with `Arc<PortEngine>`.
pub struct PortEngine {
    config: EngineConfig,
    ports: RwLock<BTreeMap<PortId, SharedRecord>>,
    pricing: Arc<dyn PricingSource>,
    weather: Arc<dyn WeatherSource>,
    clock: Arc<dyn Clock>,
    notifier: EventNotifier,
}

impl std::fmt::Debug for PortEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortEngine")
            .field("config", &self.config)
            .field("notifier", &self.notifier)
            .finish_non_exhaustive()
    }
}

impl PortEngine {
    /// Create an engine with explicit collaborators.
    pub fn new(
        config: EngineConfig,
        pricing: Arc<dyn PricingSource>,
        weather: Arc<dyn WeatherSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let notifier = EventNotifier::new(config.events.broadcast_capacity);
        Self {
            config,
            ports: RwLock::new(BTreeMap::new()),
            pricing,
            weather,
            clock,
            notifier,
        }
    }

    /// Create an engine on wall-clock time with no market pricing and
    /// weather taken from each port's own profile.
    pub fn with_defaults(config: EngineConfig) -> Self {
        Self::new(
            config,
            Arc::new(NoPricing),
            Arc::new(PortProfileWeather),
            Arc::new(SystemClock),
        )
    }

    /// The configuration the engine was built with.
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Subscribe to every event emitted from now on, across all ports.
    pub fn subscribe(&self) -> broadcast::Receiver<PortEvent> {
        self.notifier.subscribe()
    }

    // -----------------------------------------------------------------------
    // Port state registry
    // -----------------------------------------------------------------------

    /// Register a port.
    ///
    /// The port starts operational with zero utilization and the weather
    /// the [`WeatherSource`] expects for the current month.
    ///
    /// # Errors
    ///
    /// [`PortError::PortAlreadyExists`] if the id is taken,
    /// [`PortError::InvalidPortConfig`] if the port has no berths.
    pub async fn initialize_port(&self, port: Port) -> Result<PortState, PortError> {
        let port_id = port.id;
        let result = self.register(port).await;
        log_failure("initialize_port", port_id, result)
    }

    async fn register(&self, port: Port) -> Result<PortState, PortError> {
        if port.max_berths == 0 {
            return Err(PortError::InvalidPortConfig {
                port: port.id,
                reason: String::from("port must have at least one berth"),
            });
        }

        let mut ports = self.ports.write().await;
        if ports.contains_key(&port.id) {
            return Err(PortError::PortAlreadyExists(port.id));
        }

        let now = self.clock.now();
        let weather = self.weather.average_condition(&port, now.month());
        let event = PortEvent::PortInitialized {
            port_id: port.id,
            at: now,
            name: port.name.clone(),
            max_berths: port.max_berths,
            weather,
        };
        let record = PortRecord::new(port, weather, now);
        let state = record.state.clone();
        info!(
            port_id = %state.port_id,
            name = %record.port.name,
            max_berths = record.port.max_berths,
            weather = ?weather,
            "Port initialized"
        );
        ports.insert(state.port_id, Arc::new(Mutex::new(record)));
        let _ = self.notifier.emit(event);
        Ok(state)
    }

    /// Current state of a port.
    pub async fn get_port_state(&self, port_id: PortId) -> Option<PortState> {
        let record = self.record(port_id).await.ok()?;
        let guard = record.lock().await;
        Some(guard.state.clone())
    }

    /// Current state of every port, ordered by port id.
    pub async fn get_all_port_states(&self) -> Vec<PortState> {
        let records: Vec<SharedRecord> = self.ports.read().await.values().cloned().collect();
        let mut states = Vec::with_capacity(records.len());
        for record in records {
            states.push(record.lock().await.state.clone());
        }
        states
    }

    /// Static configuration of a port.
    pub async fn get_port(&self, port_id: PortId) -> Option<Port> {
        let record = self.record(port_id).await.ok()?;
        let guard = record.lock().await;
        Some(guard.port.clone())
    }

    /// Recompute a port's utilization from its schedule and operations.
    ///
    /// Every mutating call already does this; hosts only need it after
    /// changing nothing but the clock.
    ///
    /// # Errors
    ///
    /// [`PortError::PortNotFound`] for an unknown port.
    pub async fn update_port_utilization(&self, port_id: PortId) -> Result<Utilization, PortError> {
        let result = self.recompute(port_id).await;
        log_failure("update_port_utilization", port_id, result)
    }

    async fn recompute(&self, port_id: PortId) -> Result<Utilization, PortError> {
        let record = self.record(port_id).await?;
        let mut rec = record.lock().await;
        self.refresh_utilization(&mut rec);
        Ok(rec.state.utilization)
    }

    /// Set the current weather at a port.
    ///
    /// # Errors
    ///
    /// [`PortError::PortNotFound`] for an unknown port.
    pub async fn update_weather(
        &self,
        port_id: PortId,
        weather: WeatherCondition,
    ) -> Result<PortState, PortError> {
        let result = self
            .change_conditions(port_id, |state| (weather, state.status))
            .await;
        log_failure("update_weather", port_id, result)
    }

    /// Set a port's operational status.
    ///
    /// # Errors
    ///
    /// [`PortError::PortNotFound`] for an unknown port.
    pub async fn set_operational_status(
        &self,
        port_id: PortId,
        status: PortStatus,
    ) -> Result<PortState, PortError> {
        let result = self
            .change_conditions(port_id, |state| (state.weather, status))
            .await;
        log_failure("set_operational_status", port_id, result)
    }

    async fn change_conditions(
        &self,
        port_id: PortId,
        next: impl FnOnce(&PortState) -> (WeatherCondition, PortStatus),
    ) -> Result<PortState, PortError> {
        let record = self.record(port_id).await?;
        let mut rec = record.lock().await;
        let (weather, status) = next(&rec.state);
        let now = self.clock.now();
        if rec.set_conditions(weather, status, now) {
            info!(port_id = %port_id, weather = ?weather, status = ?status, "Port conditions changed");
            let _ = self.notifier.emit(PortEvent::PortConditionsChanged {
                port_id,
                at: now,
                weather,
                status,
            });
        }
        Ok(rec.state.clone())
    }

    // -----------------------------------------------------------------------
    // Berth allocation
    // -----------------------------------------------------------------------

    /// Reserve a berth for `vessel` over `[arrival, departure)`.
    ///
    /// Checks compatibility, takes the lowest-numbered free berth, prices the
    /// stay, and records a confirmed allocation.
    ///
    /// # Errors
    ///
    /// [`PortError::InvalidTimeWindow`], [`PortError::InvalidQuantity`],
    /// [`PortError::IncompatibleVessel`] listing every failed check, or
    /// [`PortError::NoAvailableBerth`].
    pub async fn request_berth_allocation(
        &self,
        port_id: PortId,
        vessel: Vessel,
        arrival: DateTime<Utc>,
        departure: DateTime<Utc>,
        planned_operations: Vec<PlannedOperation>,
    ) -> Result<BerthAllocation, PortError> {
        let result = self
            .allocate(port_id, vessel, arrival, departure, planned_operations)
            .await;
        log_failure("request_berth_allocation", port_id, result)
    }

    async fn allocate(
        &self,
        port_id: PortId,
        vessel: Vessel,
        arrival: DateTime<Utc>,
        departure: DateTime<Utc>,
        planned_operations: Vec<PlannedOperation>,
    ) -> Result<BerthAllocation, PortError> {
        let record = self.record(port_id).await?;
        scheduler::validate_request(arrival, departure, &planned_operations)?;

        let mut rec = record.lock().await;
        let issues = scheduler::check_compatibility(&rec.port, &vessel);
        if !issues.is_empty() {
            return Err(PortError::IncompatibleVessel { issues });
        }

        let berth_number = scheduler::find_free_berth(&rec, arrival, departure)
            .ok_or(PortError::NoAvailableBerth { port: port_id })?;

        let estimated_cost = scheduler::estimate_cost(
            &rec.port,
            self.pricing.as_ref(),
            &self.config.fees,
            arrival,
            departure,
            &planned_operations,
        )?;

        let allocation = BerthAllocation {
            id: AllocationId::new(),
            port_id,
            vessel,
            berth_number,
            arrival,
            departure,
            planned_operations,
            status: AllocationStatus::Confirmed,
            estimated_cost,
        };
        rec.schedule
            .insert(allocation.id, VesselScheduleEntry::new(allocation.clone()));

        info!(
            port_id = %port_id,
            allocation_id = %allocation.id,
            vessel = %allocation.vessel.name,
            berth_number,
            estimated_cost = %estimated_cost,
            "Berth allocated"
        );
        let _ = self.notifier.emit(PortEvent::BerthAllocated {
            port_id,
            at: self.clock.now(),
            allocation_id: allocation.id,
            vessel_id: allocation.vessel.id,
            berth_number,
            arrival,
            departure,
            estimated_cost,
        });
        self.refresh_utilization(&mut rec);
        Ok(allocation)
    }

    /// Withdraw a reservation before the vessel arrives.
    ///
    /// # Errors
    ///
    /// [`PortError::AllocationNotFound`], or
    /// [`PortError::InvalidAllocationState`] once the vessel has arrived.
    pub async fn cancel_allocation(
        &self,
        port_id: PortId,
        allocation_id: AllocationId,
    ) -> Result<BerthAllocation, PortError> {
        let result = self.cancel(port_id, allocation_id).await;
        log_failure("cancel_allocation", port_id, result)
    }

    async fn cancel(
        &self,
        port_id: PortId,
        allocation_id: AllocationId,
    ) -> Result<BerthAllocation, PortError> {
        let record = self.record(port_id).await?;
        let mut rec = record.lock().await;
        let entry = rec.entry_mut(allocation_id)?;
        if !entry.allocation.status.is_cancellable() {
            return Err(PortError::InvalidAllocationState {
                allocation: allocation_id,
                status: entry.allocation.status,
                expected: "Requested or Confirmed",
            });
        }
        entry.allocation.status = AllocationStatus::Cancelled;
        let allocation = entry.allocation.clone();

        info!(port_id = %port_id, allocation_id = %allocation_id, "Allocation cancelled");
        let _ = self.notifier.emit(PortEvent::AllocationCancelled {
            port_id,
            at: self.clock.now(),
            allocation_id,
            berth_number: allocation.berth_number,
        });
        self.refresh_utilization(&mut rec);
        Ok(allocation)
    }

    // -----------------------------------------------------------------------
    // Vessel lifecycle
    // -----------------------------------------------------------------------

    /// Record a vessel coming alongside.
    ///
    /// Creates one waiting operation per planned operation and reports the
    /// vessel's place in the port's operation queue.
    ///
    /// # Errors
    ///
    /// [`PortError::AllocationNotFound`],
    /// [`PortError::InvalidAllocationState`] unless the allocation is
    /// confirmed, or [`PortError::NoAvailableBerth`] if the vessel is early
    /// and its berth is still occupied.
    pub async fn process_vessel_arrival(
        &self,
        port_id: PortId,
        allocation_id: AllocationId,
        actual_arrival: DateTime<Utc>,
    ) -> Result<VesselArrivalResult, PortError> {
        let result = self.arrive(port_id, allocation_id, actual_arrival).await;
        log_failure("process_vessel_arrival", port_id, result)
    }

    async fn arrive(
        &self,
        port_id: PortId,
        allocation_id: AllocationId,
        actual_arrival: DateTime<Utc>,
    ) -> Result<VesselArrivalResult, PortError> {
        let record = self.record(port_id).await?;
        let mut rec = record.lock().await;

        let planned = rec.entry(allocation_id)?.allocation.clone();
        if planned.status != AllocationStatus::Confirmed {
            return Err(PortError::InvalidAllocationState {
                allocation: allocation_id,
                status: planned.status,
                expected: "Confirmed",
            });
        }
        // Arriving early pulls the stay forward; the berth must be clear for it.
        let window_start = actual_arrival.min(planned.arrival);
        if !scheduler::can_occupy(
            &rec,
            allocation_id,
            planned.berth_number,
            window_start,
            planned.departure,
        ) {
            return Err(PortError::NoAvailableBerth { port: port_id });
        }

        let queue_position = lifecycle::queue_position(rec.operations_in(OperationStatus::Waiting));
        let estimated_wait_minutes = lifecycle::estimated_wait_minutes(
            queue_position,
            self.config.scheduling.wait_minutes_per_queue_slot,
        );
        let operations =
            lifecycle::create_operations(&self.config.operations, &rec.port, &planned, actual_arrival)?;
        let arrival_delay = lifecycle::delay_if_late(DelayType::Arrival, planned.arrival, actual_arrival);

        let entry = rec.entry_mut(allocation_id)?;
        entry.allocation.status = AllocationStatus::InProgress;
        entry.actual_arrival = Some(actual_arrival);
        if let Some(delay) = &arrival_delay {
            entry.delays.push(delay.clone());
        }
        let allocation = entry.allocation.clone();
        for op in &operations {
            rec.operations.insert(op.id, op.clone());
        }

        let delay_minutes = arrival_delay.as_ref().map_or(0, |d| d.duration_minutes);
        info!(
            port_id = %port_id,
            allocation_id = %allocation_id,
            vessel = %allocation.vessel.name,
            berth_number = allocation.berth_number,
            delay_minutes,
            operations = operations.len(),
            queue_position,
            "Vessel arrived"
        );
        let _ = self.notifier.emit(PortEvent::VesselArrived {
            port_id,
            at: actual_arrival,
            allocation_id,
            vessel_id: allocation.vessel.id,
            berth_number: allocation.berth_number,
            delay_minutes,
            operations_created: u32::try_from(operations.len()).unwrap_or(u32::MAX),
            queue_position,
        });
        self.refresh_utilization(&mut rec);

        Ok(VesselArrivalResult {
            allocation,
            operations,
            arrival_delay,
            queue_position,
            estimated_wait_minutes,
        })
    }

    /// Start a waiting operation now.
    ///
    /// # Errors
    ///
    /// [`PortError::OperationNotFound`], [`PortError::InvalidOperationState`]
    /// unless waiting, or [`PortError::OperationCannotStart`] listing every
    /// failed precondition (severe weather, port not operational, no free
    /// crane).
    pub async fn start_operation(
        &self,
        port_id: PortId,
        operation_id: OperationId,
    ) -> Result<PortOperation, PortError> {
        let result = self.start(port_id, operation_id).await;
        log_failure("start_operation", port_id, result)
    }

    async fn start(
        &self,
        port_id: PortId,
        operation_id: OperationId,
    ) -> Result<PortOperation, PortError> {
        let record = self.record(port_id).await?;
        let mut rec = record.lock().await;

        let status = rec.operation(operation_id)?.status;
        if status != OperationStatus::Waiting {
            return Err(PortError::InvalidOperationState {
                operation: operation_id,
                status,
                expected: "Waiting",
            });
        }
        let issues = lifecycle::start_issues(&rec);
        if !issues.is_empty() {
            return Err(PortError::OperationCannotStart {
                operation: operation_id,
                issues,
            });
        }

        let now = self.clock.now();
        let op = rec.operation_mut(operation_id)?;
        op.status = OperationStatus::InProgress;
        op.actual_start = Some(now);
        let op = op.clone();

        info!(
            port_id = %port_id,
            operation_id = %operation_id,
            operation_type = ?op.operation_type,
            "Operation started"
        );
        let _ = self.notifier.emit(PortEvent::OperationStarted {
            port_id,
            at: now,
            operation_id,
            allocation_id: op.allocation_id,
            operation_type: op.operation_type,
        });
        self.refresh_utilization(&mut rec);
        Ok(op)
    }

    /// Finish an in-progress operation now.
    ///
    /// `actual_quantity` defaults to the planned quantity. Loading draws
    /// from storage (floored at zero) and unloading adds to it.
    ///
    /// # Errors
    ///
    /// [`PortError::OperationNotFound`], [`PortError::InvalidOperationState`]
    /// unless in progress, or [`PortError::InvalidQuantity`] for a negative
    /// quantity.
    pub async fn complete_operation(
        &self,
        port_id: PortId,
        operation_id: OperationId,
        actual_quantity: Option<Decimal>,
    ) -> Result<PortOperation, PortError> {
        let result = self.complete(port_id, operation_id, actual_quantity).await;
        log_failure("complete_operation", port_id, result)
    }

    async fn complete(
        &self,
        port_id: PortId,
        operation_id: OperationId,
        actual_quantity: Option<Decimal>,
    ) -> Result<PortOperation, PortError> {
        let record = self.record(port_id).await?;
        let mut rec = record.lock().await;

        let op = rec.operation(operation_id)?;
        if op.status != OperationStatus::InProgress {
            return Err(PortError::InvalidOperationState {
                operation: operation_id,
                status: op.status,
                expected: "InProgress",
            });
        }
        let quantity = actual_quantity.unwrap_or(op.quantity);
        if quantity.is_sign_negative() {
            return Err(PortError::InvalidQuantity(format!(
                "completed quantity {quantity} for operation {operation_id}"
            )));
        }

        let now = self.clock.now();
        let op = self.finish(&mut rec, operation_id, now, quantity)?;
        self.refresh_utilization(&mut rec);
        Ok(op)
    }

    /// Close an operation at `end`, move its cargo and announce it.
    fn finish(
        &self,
        rec: &mut PortRecord,
        operation_id: OperationId,
        end: DateTime<Utc>,
        quantity: Decimal,
    ) -> Result<PortOperation, PortError> {
        let port_id = rec.id();
        let (operation_type, commodity) = {
            let op = rec.operation(operation_id)?;
            (op.operation_type, op.commodity)
        };

        let movement = inventory::apply_completion(&mut rec.inventory, operation_type, commodity, quantity)?;
        match movement {
            CargoMovement::Drawn(drawn) if drawn < quantity => debug!(
                port_id = %port_id,
                operation_id = %operation_id,
                commodity = ?commodity,
                requested = %quantity,
                drawn = %drawn,
                "Storage short for loading; floored at zero"
            ),
            CargoMovement::Drawn(_) | CargoMovement::Added(_) | CargoMovement::None => {}
        }

        let op = rec.operation_mut(operation_id)?;
        lifecycle::finish_operation(op, end, quantity);
        let op = op.clone();

        info!(
            port_id = %port_id,
            operation_id = %operation_id,
            operation_type = ?op.operation_type,
            quantity = %op.quantity,
            efficiency = %op.efficiency,
            "Operation completed"
        );
        let _ = self.notifier.emit(PortEvent::OperationCompleted {
            port_id,
            at: end,
            operation_id,
            allocation_id: op.allocation_id,
            operation_type: op.operation_type,
            commodity: op.commodity,
            quantity: op.quantity,
            efficiency: op.efficiency,
        });
        Ok(op)
    }

    /// Record a vessel leaving its berth.
    ///
    /// Operations still running are completed at `actual_departure`;
    /// operations never started are cancelled. The berth is free again from
    /// `actual_departure` onwards.
    ///
    /// # Errors
    ///
    /// [`PortError::AllocationNotFound`],
    /// [`PortError::InvalidAllocationState`] unless the vessel is alongside,
    /// or [`PortError::InvalidTimeWindow`] if it departs before it arrived
    /// or before one of its running operations started.
    pub async fn process_vessel_departure(
        &self,
        port_id: PortId,
        allocation_id: AllocationId,
        actual_departure: DateTime<Utc>,
    ) -> Result<VesselDepartureResult, PortError> {
        let result = self.depart(port_id, allocation_id, actual_departure).await;
        log_failure("process_vessel_departure", port_id, result)
    }

    async fn depart(
        &self,
        port_id: PortId,
        allocation_id: AllocationId,
        actual_departure: DateTime<Utc>,
    ) -> Result<VesselDepartureResult, PortError> {
        let record = self.record(port_id).await?;
        let mut rec = record.lock().await;

        let entry = rec.entry(allocation_id)?;
        if entry.allocation.status != AllocationStatus::InProgress {
            return Err(PortError::InvalidAllocationState {
                allocation: allocation_id,
                status: entry.allocation.status,
                expected: "InProgress",
            });
        }
        let arrived = entry.actual_arrival.unwrap_or(entry.allocation.arrival);
        if actual_departure < arrived {
            return Err(PortError::InvalidTimeWindow);
        }
        let total_port_time_minutes = actual_departure.signed_duration_since(arrived).num_minutes();
        let total_cost = lifecycle::total_cost(entry.allocation.estimated_cost, total_port_time_minutes)?;
        let departure_delay =
            lifecycle::delay_if_late(DelayType::Departure, entry.allocation.departure, actual_departure);

        let open: Vec<(OperationId, OperationStatus, Decimal)> = rec
            .operations
            .values()
            .filter(|op| op.allocation_id == allocation_id && op.status.is_open())
            .map(|op| (op.id, op.status, op.quantity))
            .collect();
        // A running operation cannot end before it started.
        let started_after_departure = rec.operations.values().any(|op| {
            op.allocation_id == allocation_id
                && op.status == OperationStatus::InProgress
                && op.actual_start.is_some_and(|start| start > actual_departure)
        });
        if started_after_departure {
            return Err(PortError::InvalidTimeWindow);
        }

        let mut force_completed = Vec::new();
        let mut cancelled = Vec::new();
        for (operation_id, status, quantity) in open {
            if status == OperationStatus::InProgress {
                let _ = self.finish(&mut rec, operation_id, actual_departure, quantity)?;
                force_completed.push(operation_id);
            } else {
                let op = rec.operation_mut(operation_id)?;
                op.status = OperationStatus::Cancelled;
                op.actual_end = Some(actual_departure);
                cancelled.push(operation_id);
            }
        }

        let entry = rec.entry_mut(allocation_id)?;
        entry.actual_departure = Some(actual_departure);
        if let Some(delay) = &departure_delay {
            entry.delays.push(delay.clone());
        }
        entry.allocation.status = AllocationStatus::Completed;
        let allocation = entry.allocation.clone();

        info!(
            port_id = %port_id,
            allocation_id = %allocation_id,
            vessel = %allocation.vessel.name,
            berth_number = allocation.berth_number,
            total_port_time_minutes,
            total_cost = %total_cost,
            force_completed = force_completed.len(),
            cancelled = cancelled.len(),
            "Vessel departed"
        );
        let _ = self.notifier.emit(PortEvent::VesselDeparted {
            port_id,
            at: actual_departure,
            allocation_id,
            vessel_id: allocation.vessel.id,
            berth_number: allocation.berth_number,
            total_port_time_minutes,
            total_cost,
            cancelled_operations: u32::try_from(cancelled.len()).unwrap_or(u32::MAX),
        });
        self.refresh_utilization(&mut rec);

        Ok(VesselDepartureResult {
            allocation,
            departure_delay,
            total_port_time_minutes,
            total_cost,
            force_completed,
            cancelled,
        })
    }

    /// Attach a host-observed delay (weather hold, crane failure, customs)
    /// to an allocation.
    ///
    /// # Errors
    ///
    /// [`PortError::AllocationNotFound`], [`PortError::InvalidQuantity`] for
    /// negative minutes, or [`PortError::InvalidAllocationState`] for a
    /// cancelled allocation.
    pub async fn record_delay(
        &self,
        port_id: PortId,
        allocation_id: AllocationId,
        delay_type: DelayType,
        duration_minutes: i64,
        reason: String,
    ) -> Result<Delay, PortError> {
        let result = self.append_delay(port_id, allocation_id, delay_type, duration_minutes, reason).await;
        log_failure("record_delay", port_id, result)
    }

    async fn append_delay(
        &self,
        port_id: PortId,
        allocation_id: AllocationId,
        delay_type: DelayType,
        duration_minutes: i64,
        reason: String,
    ) -> Result<Delay, PortError> {
        if duration_minutes < 0 {
            return Err(PortError::InvalidQuantity(format!(
                "delay of {duration_minutes} minutes"
            )));
        }
        let record = self.record(port_id).await?;
        let mut rec = record.lock().await;
        let recorded_at = self.clock.now();
        let entry = rec.entry_mut(allocation_id)?;
        if entry.allocation.status == AllocationStatus::Cancelled {
            return Err(PortError::InvalidAllocationState {
                allocation: allocation_id,
                status: entry.allocation.status,
                expected: "not Cancelled",
            });
        }
        let delay = Delay {
            delay_type,
            duration_minutes,
            reason,
            recorded_at,
        };
        entry.delays.push(delay.clone());
        info!(
            port_id = %port_id,
            allocation_id = %allocation_id,
            delay_type = ?delay_type,
            duration_minutes,
            "Delay recorded"
        );
        Ok(delay)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Cargo currently in a port's storage.
    ///
    /// # Errors
    ///
    /// [`PortError::PortNotFound`] for an unknown port.
    pub async fn get_cargo_inventory(&self, port_id: PortId) -> Result<CargoInventory, PortError> {
        let record = self.record(port_id).await?;
        let rec = record.lock().await;
        Ok(CargoInventory {
            port_id,
            quantities: rec.inventory.clone(),
        })
    }

    /// Every schedule entry at a port, ordered by planned arrival.
    ///
    /// # Errors
    ///
    /// [`PortError::PortNotFound`] for an unknown port.
    pub async fn get_vessel_schedule(
        &self,
        port_id: PortId,
    ) -> Result<Vec<VesselScheduleEntry>, PortError> {
        let record = self.record(port_id).await?;
        let rec = record.lock().await;
        let mut entries: Vec<VesselScheduleEntry> = rec.schedule.values().cloned().collect();
        entries.sort_by_key(|e| (e.allocation.arrival, e.allocation.berth_number, e.allocation.id));
        Ok(entries)
    }

    /// Waiting and in-progress operations, ordered by scheduled start.
    ///
    /// # Errors
    ///
    /// [`PortError::PortNotFound`] for an unknown port.
    pub async fn get_active_operations(&self, port_id: PortId) -> Result<Vec<PortOperation>, PortError> {
        let record = self.record(port_id).await?;
        let rec = record.lock().await;
        let mut ops: Vec<PortOperation> = rec
            .operations
            .values()
            .filter(|op| op.status.is_open())
            .cloned()
            .collect();
        ops.sort_by_key(|op| (op.scheduled_start, op.id));
        Ok(ops)
    }

    /// One operation.
    ///
    /// # Errors
    ///
    /// [`PortError::PortNotFound`] or [`PortError::OperationNotFound`].
    pub async fn get_operation(
        &self,
        port_id: PortId,
        operation_id: OperationId,
    ) -> Result<PortOperation, PortError> {
        let record = self.record(port_id).await?;
        let rec = record.lock().await;
        rec.operation(operation_id).cloned()
    }

    /// One allocation.
    ///
    /// # Errors
    ///
    /// [`PortError::PortNotFound`] or [`PortError::AllocationNotFound`].
    pub async fn get_allocation(
        &self,
        port_id: PortId,
        allocation_id: AllocationId,
    ) -> Result<BerthAllocation, PortError> {
        let record = self.record(port_id).await?;
        let rec = record.lock().await;
        Ok(rec.entry(allocation_id)?.allocation.clone())
    }

    /// Performance of a port over `[period.start, period.end)`.
    ///
    /// # Errors
    ///
    /// [`PortError::PortNotFound`], or [`PortError::InvalidTimeWindow`] if
    /// the period is empty.
    pub async fn get_port_performance(
        &self,
        port_id: PortId,
        period: AnalyticsPeriod,
    ) -> Result<PortPerformanceMetrics, PortError> {
        let result = self.measure(port_id, period).await;
        log_failure("get_port_performance", port_id, result)
    }

    async fn measure(
        &self,
        port_id: PortId,
        period: AnalyticsPeriod,
    ) -> Result<PortPerformanceMetrics, PortError> {
        if period.end <= period.start {
            return Err(PortError::InvalidTimeWindow);
        }
        let record = self.record(port_id).await?;
        let rec = record.lock().await;
        Ok(analytics::compute_performance(
            &rec,
            period,
            self.config.scheduling.on_time_grace_minutes,
        ))
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    async fn record(&self, port_id: PortId) -> Result<SharedRecord, PortError> {
        self.ports
            .read()
            .await
            .get(&port_id)
            .cloned()
            .ok_or(PortError::PortNotFound(port_id))
    }

    /// Recompute utilization and announce it if anything moved.
    fn refresh_utilization(&self, rec: &mut PortRecord) {
        let now = self.clock.now();
        let limit = self.config.analytics.utilization_history_limit;
        if let Some((previous, current)) = rec.refresh_utilization(now, limit) {
            debug!(
                port_id = %rec.id(),
                overall = %current.overall,
                berth = %current.berth,
                crane = %current.crane,
                "Utilization changed"
            );
            let _ = self.notifier.emit(PortEvent::UtilizationChanged {
                port_id: rec.id(),
                at: now,
                previous,
                current,
            });
        }
    }
}

/// Log a failed call: expected rejections at debug, faults at error.
fn log_failure<T>(
    operation: &'static str,
    port_id: PortId,
    result: Result<T, PortError>,
) -> Result<T, PortError> {
    if let Err(err) = &result {
        if err.is_domain_rejection() {
            debug!(port_id = %port_id, operation, %err, "Request rejected");
        } else {
            error!(port_id = %port_id, operation, %err, "Engine fault");
        }
    }
    result
}
