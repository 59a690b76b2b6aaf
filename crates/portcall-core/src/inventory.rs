//! Cargo inventory bookkeeping for a port's storage.
//!
//! Only completed loading and unloading operations move cargo. Loading
//! draws from storage onto the vessel and is floored at zero: a shortfall
//! is numeric drift the simulation absorbs rather than a reason to fail the
//! completion. Unloading adds to storage.

use std::collections::BTreeMap;

use portcall_types::{Commodity, OperationType};
use rust_decimal::Decimal;

use crate::error::PortError;

/// Net cargo change applied by a completed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CargoMovement {
    /// Storage went down by the given amount (possibly less than requested).
    Drawn(Decimal),
    /// Storage went up by the given amount.
    Added(Decimal),
    /// The operation type does not touch storage.
    None,
}

/// Quantity on hand for `commodity`.
pub fn quantity(inventory: &BTreeMap<Commodity, Decimal>, commodity: Commodity) -> Decimal {
    inventory.get(&commodity).copied().unwrap_or(Decimal::ZERO)
}

/// Total cargo across all commodities.
pub fn total(inventory: &BTreeMap<Commodity, Decimal>) -> Decimal {
    inventory
        .values()
        .fold(Decimal::ZERO, |acc, q| acc.saturating_add(*q))
}

/// Add `amount` of `commodity` to storage.
///
/// # Errors
///
/// Returns [`PortError::Internal`] if the addition overflows.
pub fn add_cargo(
    inventory: &mut BTreeMap<Commodity, Decimal>,
    commodity: Commodity,
    amount: Decimal,
) -> Result<(), PortError> {
    let entry = inventory.entry(commodity).or_insert(Decimal::ZERO);
    *entry = entry
        .checked_add(amount)
        .ok_or_else(|| PortError::overflow("add_cargo"))?;
    Ok(())
}

/// Draw up to `amount` of `commodity` from storage, flooring at zero.
///
/// Returns the quantity actually drawn. Removes the key when storage for
/// the commodity reaches zero.
pub fn draw_cargo(
    inventory: &mut BTreeMap<Commodity, Decimal>,
    commodity: Commodity,
    amount: Decimal,
) -> Decimal {
    let current = quantity(inventory, commodity);
    let drawn = amount.min(current).max(Decimal::ZERO);
    let remaining = current.saturating_sub(drawn).max(Decimal::ZERO);

    if remaining.is_zero() {
        inventory.remove(&commodity);
    } else {
        inventory.insert(commodity, remaining);
    }
    drawn
}

/// Apply the storage effect of a completed operation.
///
/// # Errors
///
/// Returns [`PortError::Internal`] if an unloading addition overflows.
pub fn apply_completion(
    inventory: &mut BTreeMap<Commodity, Decimal>,
    operation_type: OperationType,
    commodity: Commodity,
    amount: Decimal,
) -> Result<CargoMovement, PortError> {
    match operation_type {
        OperationType::Loading => Ok(CargoMovement::Drawn(draw_cargo(
            inventory, commodity, amount,
        ))),
        OperationType::Unloading => {
            add_cargo(inventory, commodity, amount)?;
            Ok(CargoMovement::Added(amount))
        }
        OperationType::Transshipment
        | OperationType::Bunkering
        | OperationType::Maintenance
        | OperationType::Inspection => Ok(CargoMovement::None),
    }
}
