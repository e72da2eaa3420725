// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! Error types for vault operations.
//!
//! Every mutating entry point returns a [`VaultError`]. Whatever the variant,
//! the operation that produced it has already been rolled back in full by
//! the time the caller sees it: there is no partial success to clean up.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::external::ConversionError;
use crate::types::{Amount, AssetId};

/// Errors that can occur during vault operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VaultError {
    /// A deposit or withdrawal of zero units was requested.
    #[error("zero-amount operations are not permitted")]
    ZeroAmount,

    /// An identity argument was empty or the all-zero address.
    #[error("zero address supplied for {role}")]
    ZeroAddress {
        /// Which argument was invalid (caller, asset, feed, ...).
        role: &'static str,
    },

    /// The conversion service has no direct pairing between the asset and
    /// the settlement asset.
    #[error("no direct conversion route from {asset} to the settlement asset")]
    NoRouteFound {
        /// The asset that could not be routed.
        asset: AssetId,
    },

    /// Crediting the amount would push the vault above its capacity limit.
    ///
    /// Raised both before the conversion (against the quote) and after it
    /// (against the amount actually delivered).
    #[error(
        "capacity exceeded: adding {attempted} would bring the vault to {projected_total}, limit is {limit}"
    )]
    CapacityExceeded {
        /// The amount the operation tried to add.
        attempted: Amount,
        /// What the vault total would have become.
        projected_total: Amount,
        /// The immutable capacity limit.
        limit: Amount,
    },

    /// Attempted to withdraw more than the caller's ledger balance.
    #[error("insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance {
        /// The amount that was requested.
        requested: Amount,
        /// The caller's current settlement balance.
        available: Amount,
    },

    /// An asset transfer errored or reported failure without erroring.
    #[error("transfer of {asset} failed: {reason}")]
    TransferFailed {
        /// The asset being moved.
        asset: AssetId,
        /// What the custody layer said (or didn't).
        reason: String,
    },

    /// The conversion would settle (or did settle) below the acceptable floor.
    #[error("slippage violated: minimum output {minimum}, conversion offered {actual}")]
    SlippageViolated {
        /// The floor handed to the conversion service.
        minimum: Amount,
        /// The output that was quoted or delivered.
        actual: Amount,
    },

    /// The conversion could not settle before its deadline.
    #[error("conversion deadline {deadline} expired")]
    DeadlineExpired {
        /// The deadline that was attached to the request.
        deadline: DateTime<Utc>,
    },

    /// Any other failure reported by the conversion service.
    #[error("conversion failed: {0}")]
    Conversion(ConversionError),

    /// Checked arithmetic failed. Capacity checks should make this
    /// unreachable; if you see it, something upstream is lying.
    #[error("arithmetic overflow in {context}")]
    Overflow {
        /// Where the overflow was detected.
        context: &'static str,
    },

    /// A mutating entry point was called while another one was in flight.
    #[error("reentrant call rejected: another vault operation is in flight")]
    Reentrancy,

    /// The caller is not allowed to perform an administrative operation.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The vault was constructed with invalid parameters.
    #[error("invalid vault configuration: {0}")]
    InvalidConfig(String),
}

impl VaultError {
    /// Stable snake_case label for the variant, for metrics and API bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            VaultError::ZeroAmount => "zero_amount",
            VaultError::ZeroAddress { .. } => "zero_address",
            VaultError::NoRouteFound { .. } => "no_route_found",
            VaultError::CapacityExceeded { .. } => "capacity_exceeded",
            VaultError::InsufficientBalance { .. } => "insufficient_balance",
            VaultError::TransferFailed { .. } => "transfer_failed",
            VaultError::SlippageViolated { .. } => "slippage_violated",
            VaultError::DeadlineExpired { .. } => "deadline_expired",
            VaultError::Conversion(_) => "conversion_failed",
            VaultError::Overflow { .. } => "overflow",
            VaultError::Reentrancy => "reentrancy",
            VaultError::Unauthorized(_) => "unauthorized",
            VaultError::InvalidConfig(_) => "invalid_config",
        }
    }
}

impl From<ConversionError> for VaultError {
    fn from(err: ConversionError) -> Self {
        match err {
            ConversionError::SlippageExceeded { minimum, actual } => {
                VaultError::SlippageViolated { minimum, actual }
            }
            ConversionError::DeadlineExpired { deadline } => VaultError::DeadlineExpired { deadline },
            other => VaultError::Conversion(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_slippage_surfaces_as_slippage_violation() {
        let err: VaultError = ConversionError::SlippageExceeded {
            minimum: 950,
            actual: 900,
        }
        .into();
        assert_eq!(
            err,
            VaultError::SlippageViolated {
                minimum: 950,
                actual: 900
            }
        );
    }

    #[test]
    fn other_conversion_failures_are_wrapped() {
        let err: VaultError = ConversionError::InsufficientLiquidity.into();
        assert!(matches!(err, VaultError::Conversion(ConversionError::InsufficientLiquidity)));
    }

    #[test]
    fn capacity_message_names_all_figures() {
        let err = VaultError::CapacityExceeded {
            attempted: 10,
            projected_total: 110,
            limit: 100,
        };
        let msg = err.to_string();
        assert!(msg.contains("10"));
        assert!(msg.contains("110"));
        assert!(msg.contains("100"));
    }

    #[test]
    fn kinds_are_snake_case_labels() {
        assert_eq!(VaultError::Reentrancy.kind(), "reentrancy");
        assert_eq!(
            VaultError::ZeroAddress { role: "caller" }.kind(),
            "zero_address"
        );
    }
}
