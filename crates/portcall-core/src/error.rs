//! Error types for the `portcall-core` crate.
//!
//! Every public engine call returns [`PortError`]. Most variants are domain
//! rejections the caller is expected to handle (try another window, wait for
//! the weather); [`PortError::Internal`] is the only one that signals a bug.

use portcall_types::{AllocationId, AllocationStatus, OperationId, OperationStatus, PortId};

/// Errors returned by the port engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    /// No port is registered under this id.
    #[error("port not found: {0}")]
    PortNotFound(PortId),

    /// The port id is already registered.
    #[error("port already exists: {0}")]
    PortAlreadyExists(PortId),

    /// The port configuration cannot be scheduled against.
    #[error("invalid port configuration for {port}: {reason}")]
    InvalidPortConfig {
        /// The rejected port.
        port: PortId,
        /// What is wrong with it.
        reason: String,
    },

    /// No allocation with this id exists at the port.
    #[error("allocation not found: {0}")]
    AllocationNotFound(AllocationId),

    /// No operation with this id exists at the port.
    #[error("operation not found: {0}")]
    OperationNotFound(OperationId),

    /// The vessel cannot berth at this port.
    #[error("vessel incompatible with port: {}", issues.join("; "))]
    IncompatibleVessel {
        /// Every failed compatibility check.
        issues: Vec<String>,
    },

    /// Every berth is occupied for some part of the requested window.
    #[error("no berth available at {port} for the requested window")]
    NoAvailableBerth {
        /// The port that was searched.
        port: PortId,
    },

    /// One or more start preconditions failed.
    #[error("operation {operation} cannot start: {}", issues.join("; "))]
    OperationCannotStart {
        /// The operation that was refused.
        operation: OperationId,
        /// Every failed precondition.
        issues: Vec<String>,
    },

    /// The window ends at or before it starts.
    #[error("invalid time window: end must be after start")]
    InvalidTimeWindow,

    /// A cargo quantity was negative.
    #[error("invalid quantity: {0}")]
    InvalidQuantity(String),

    /// The allocation is not in a state that allows this transition.
    #[error("allocation {allocation} is {status:?}, expected {expected}")]
    InvalidAllocationState {
        /// The allocation.
        allocation: AllocationId,
        /// Its current status.
        status: AllocationStatus,
        /// The status(es) the transition requires.
        expected: &'static str,
    },

    /// The operation is not in a state that allows this transition.
    #[error("operation {operation} is {status:?}, expected {expected}")]
    InvalidOperationState {
        /// The operation.
        operation: OperationId,
        /// Its current status.
        status: OperationStatus,
        /// The status the transition requires.
        expected: &'static str,
    },

    /// An unexpected internal fault (arithmetic overflow, dangling reference).
    #[error("internal engine error: {0}")]
    Internal(String),
}

impl PortError {
    /// Whether this is an expected domain outcome rather than an internal
    /// fault. Domain rejections are not logged as errors.
    pub const fn is_domain_rejection(&self) -> bool {
        !matches!(self, Self::Internal(_))
    }

    /// Shorthand for an [`PortError::Internal`] caused by checked arithmetic.
    pub fn overflow(context: &str) -> Self {
        Self::Internal(format!("arithmetic overflow in {context}"))
    }
}
