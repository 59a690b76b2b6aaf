//! Berth allocation, vessel lifecycle, and port analytics for Portcall.
//!
//! This crate owns the [`PortEngine`]: per-port state, conflict-free berth
//! scheduling, the arrival-to-departure lifecycle of each port call, cargo
//! inventory, performance metrics, and the [`PortEvent`] stream.
//!
//! # Modules
//!
//! - [`analytics`] -- Per-period performance metrics.
//! - [`clock`] -- [`Clock`] trait with wall-clock and host-driven clocks.
//! - [`config`] -- Configuration loading from `portcall-config.yaml` into
//!   strongly-typed structs.
//! - [`engine`] -- The async [`PortEngine`] API.
//! - [`error`] -- [`PortError`].
//! - [`inventory`] -- Cargo storage bookkeeping.
//! - [`lifecycle`] -- Delays, operation estimates, start preconditions,
//!   efficiency and final charges.
//! - [`notifier`] -- Broadcast fan-out of events.
//! - [`registry`] -- Per-port record and utilization.
//! - [`scheduler`] -- Compatibility, occupancy windows, berth search and
//!   cost estimates.
//! - [`sources`] -- [`PricingSource`] and [`WeatherSource`] seams.
//!
//! [`PortEvent`]: portcall_types::PortEvent

pub mod analytics;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod inventory;
pub mod lifecycle;
pub mod notifier;
pub mod registry;
pub mod scheduler;
pub mod sources;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, EngineConfig};
pub use engine::PortEngine;
pub use error::PortError;
pub use sources::{NoPricing, PortProfileWeather, PricingSource, StaticPricing, WeatherSource};
