//! Collaborator seams: market prices and weather outlooks.
//!
//! The engine does not model commodity markets or meteorology. It asks a
//! [`PricingSource`] for handling prices the port's own cost table does not
//! cover, and a [`WeatherSource`] for the expected conditions when a port is
//! registered.

use std::collections::BTreeMap;

use portcall_types::{Commodity, Port, WeatherCondition};
use rust_decimal::Decimal;

/// Supplies per-unit handling prices from the market.
pub trait PricingSource: Send + Sync {
    /// Price per unit for handling `commodity`, if the market quotes one.
    fn handling_cost(&self, commodity: Commodity) -> Option<Decimal>;
}

/// A pricing source that never quotes. Ports must carry full cost tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPricing;

impl PricingSource for NoPricing {
    fn handling_cost(&self, _commodity: Commodity) -> Option<Decimal> {
        None
    }
}

/// A fixed price list.
#[derive(Debug, Clone, Default)]
pub struct StaticPricing {
    prices: BTreeMap<Commodity, Decimal>,
}

impl StaticPricing {
    /// Create a price list from `(commodity, price)` pairs.
    pub fn new(prices: impl IntoIterator<Item = (Commodity, Decimal)>) -> Self {
        Self {
            prices: prices.into_iter().collect(),
        }
    }
}

impl PricingSource for StaticPricing {
    fn handling_cost(&self, commodity: Commodity) -> Option<Decimal> {
        self.prices.get(&commodity).copied()
    }
}

/// Supplies expected weather for a port.
pub trait WeatherSource: Send + Sync {
    /// Average condition at `port` in calendar `month` (1 = January).
    fn average_condition(&self, port: &Port, month: u32) -> WeatherCondition;
}

/// Reads the port's own monthly weather table, defaulting to calm for
/// months the table omits.
#[derive(Debug, Clone, Copy, Default)]
pub struct PortProfileWeather;

impl WeatherSource for PortProfileWeather {
    fn average_condition(&self, port: &Port, month: u32) -> WeatherCondition {
        port.weather_profile
            .get(&month)
            .copied()
            .unwrap_or_default()
    }
}
