//! A scripted day at one port, driven on a manual clock.
//!
//! Bookings are filed up front. Everything after that runs off a
//! time-ordered agenda: arrivals with random lateness, operations that start
//! when a crane is free and run for a jittered multiple of their estimate,
//! departures, and a passing squall that stops work for a while. The clock
//! jumps from one agenda entry to the next, so a full day runs instantly.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use portcall_core::{ManualClock, PortEngine, PortError};
use portcall_types::{
    AllocationId, AnalyticsPeriod, OperationId, PortId, PortPerformanceMetrics, WeatherCondition,
};
use rand::Rng;
use rand::rngs::StdRng;
use tracing::{info, warn};

use crate::error::RunnerError;
use crate::fleet::Booking;

/// Minutes to wait before retrying an operation that could not start.
const START_RETRY_MINUTES: i64 = 30;

/// Late departures can spill past midnight, so the report covers two days.
const REPORT_WINDOW_MINUTES: i64 = 2 * 24 * 60;

/// One thing that happens at a scheduled instant.
#[derive(Debug, Clone, Copy)]
enum Step {
    Arrive {
        allocation: AllocationId,
        planned_arrival: DateTime<Utc>,
        planned_departure: DateTime<Utc>,
    },
    Start {
        operation: OperationId,
        give_up_at: DateTime<Utc>,
    },
    Complete {
        operation: OperationId,
    },
    Depart {
        allocation: AllocationId,
    },
    Weather(WeatherCondition),
}

/// A simulated day at one port.
pub struct PortDay {
    engine: Arc<PortEngine>,
    clock: Arc<ManualClock>,
    rng: StdRng,
    port_id: PortId,
    day_start: DateTime<Utc>,
    agenda: BTreeMap<(DateTime<Utc>, u64), Step>,
    next_seq: u64,
}

impl PortDay {
    /// Prepare a day starting at `day_start` for an already registered port.
    pub const fn new(
        engine: Arc<PortEngine>,
        clock: Arc<ManualClock>,
        rng: StdRng,
        port_id: PortId,
        day_start: DateTime<Utc>,
    ) -> Self {
        Self {
            engine,
            clock,
            rng,
            port_id,
            day_start,
            agenda: BTreeMap::new(),
            next_seq: 0,
        }
    }

    /// File every booking and plan each confirmed vessel's arrival.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Engine`] if the engine reports an internal
    /// fault. Rejected bookings are logged and skipped.
    pub async fn book(&mut self, fleet: Vec<Booking>) -> Result<usize, RunnerError> {
        let mut confirmed = 0_usize;
        for booking in fleet {
            let arrival = at_minutes(self.day_start, booking.arrival_hour.saturating_mul(60));
            let departure = at_minutes(arrival, booking.stay_hours.saturating_mul(60));
            let name = booking.vessel.name.clone();

            let result = self
                .engine
                .request_berth_allocation(
                    self.port_id,
                    booking.vessel,
                    arrival,
                    departure,
                    booking.operations,
                )
                .await;
            let Some(allocation) = tolerate(result)? else {
                warn!(vessel = %name, "Booking refused");
                continue;
            };
            confirmed = confirmed.saturating_add(1);

            // Most vessels run a little late; a few turn up early.
            let lateness = self.rng.random_range(-30..=90);
            self.schedule(
                at_minutes(arrival, lateness),
                Step::Arrive {
                    allocation: allocation.id,
                    planned_arrival: arrival,
                    planned_departure: departure,
                },
            );
        }
        Ok(confirmed)
    }

    /// Blow a squall through between `from_hour` and `to_hour`.
    pub fn squall(&mut self, from_hour: i64, to_hour: i64) {
        let from = at_minutes(self.day_start, from_hour.saturating_mul(60));
        let to = at_minutes(self.day_start, to_hour.saturating_mul(60));
        self.schedule(from, Step::Weather(WeatherCondition::Severe));
        self.schedule(to, Step::Weather(WeatherCondition::Moderate));
    }

    /// Run the agenda to exhaustion and report the day's performance.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Engine`] if the engine reports an internal
    /// fault.
    pub async fn run(mut self) -> Result<PortPerformanceMetrics, RunnerError> {
        while let Some(((at, _), step)) = self.agenda.pop_first() {
            self.clock.set(at);
            self.execute(at, step).await?;
        }

        let end = at_minutes(self.day_start, REPORT_WINDOW_MINUTES);
        let period = AnalyticsPeriod {
            start: self.day_start,
            end,
        };
        Ok(self.engine.get_port_performance(self.port_id, period).await?)
    }

    async fn execute(&mut self, at: DateTime<Utc>, step: Step) -> Result<(), RunnerError> {
        let port = self.port_id;
        match step {
            Step::Arrive {
                allocation,
                planned_arrival,
                planned_departure,
            } => {
                let result = match self.engine.process_vessel_arrival(port, allocation, at).await {
                    // Early, and the berth is still busy: anchor until the booked slot.
                    Err(PortError::NoAvailableBerth { .. }) if at < planned_arrival => {
                        info!(allocation_id = %allocation, "Berth occupied, waiting at anchor");
                        self.schedule(planned_arrival, step);
                        return Ok(());
                    }
                    other => other,
                };
                let Some(arrival) = tolerate(result)? else {
                    return Ok(());
                };
                for op in &arrival.operations {
                    self.schedule(
                        at,
                        Step::Start {
                            operation: op.id,
                            give_up_at: planned_departure,
                        },
                    );
                }
                let overstay = self.rng.random_range(-60..=60);
                let departure = at_minutes(planned_departure, overstay).max(at_minutes(at, 1));
                self.schedule(departure, Step::Depart { allocation });
            }
            Step::Start {
                operation,
                give_up_at,
            } => match self.engine.start_operation(port, operation).await {
                Ok(op) => {
                    let pace = self.rng.random_range(70..=140_i64);
                    let minutes = op
                        .estimated_duration_minutes
                        .saturating_mul(pace)
                        .checked_div(100)
                        .unwrap_or(op.estimated_duration_minutes);
                    self.schedule(at_minutes(at, minutes.max(1)), Step::Complete { operation });
                }
                Err(PortError::OperationCannotStart { issues, .. }) => {
                    let retry = at_minutes(at, START_RETRY_MINUTES);
                    if retry < give_up_at {
                        info!(
                            operation_id = %operation,
                            issues = %issues.join("; "),
                            "Operation held, retrying"
                        );
                        self.schedule(retry, Step::Start { operation, give_up_at });
                    }
                }
                Err(err) => {
                    tolerate::<()>(Err(err))?;
                }
            },
            Step::Complete { operation } => {
                let _ = tolerate(self.engine.complete_operation(port, operation, None).await)?;
            }
            Step::Depart { allocation } => {
                let _ = tolerate(self.engine.process_vessel_departure(port, allocation, at).await)?;
            }
            Step::Weather(condition) => {
                let _ = self.engine.update_weather(port, condition).await?;
            }
        }
        Ok(())
    }

    fn schedule(&mut self, at: DateTime<Utc>, step: Step) {
        self.agenda.insert((at, self.next_seq), step);
        self.next_seq = self.next_seq.saturating_add(1);
    }
}

/// Domain rejections are part of the simulation; only faults stop the run.
fn tolerate<T>(result: Result<T, PortError>) -> Result<Option<T>, RunnerError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_domain_rejection() => {
            warn!(%err, "Engine rejected request");
            Ok(None)
        }
        Err(err) => Err(err.into()),
    }
}

fn at_minutes(base: DateTime<Utc>, minutes: i64) -> DateTime<Utc> {
    base.checked_add_signed(Duration::minutes(minutes))
        .unwrap_or(base)
}
