// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! Capacity guard.
//!
//! The vault's aggregate exposure may never exceed a limit fixed at
//! construction. Conversion-bearing deposits run the check twice: with the
//! quoted output before the external conversion, and with the delivered
//! output after it. A conversion that pays out *more* than quoted must not
//! sneak past the cap on the strength of the smaller estimate.

use crate::error::VaultError;
use crate::types::Amount;

/// Stateless comparison against the immutable capacity limit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CapacityGuard {
    limit: Amount,
}

impl CapacityGuard {
    /// Creates a guard for `limit`.
    pub fn new(limit: Amount) -> Self {
        Self { limit }
    }

    /// The capacity limit.
    pub fn limit(&self) -> Amount {
        self.limit
    }

    /// Headroom left above `current_total`.
    pub fn remaining(&self, current_total: Amount) -> Amount {
        self.limit.saturating_sub(current_total)
    }

    /// Checks that adding `attempted` to `current_total` stays within the
    /// limit, and returns the projected total.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::CapacityExceeded`] if the projected total is
    /// above the limit, or [`VaultError::Overflow`] if it isn't representable.
    pub fn check(&self, current_total: Amount, attempted: Amount) -> Result<Amount, VaultError> {
        let projected_total = current_total
            .checked_add(attempted)
            .ok_or(VaultError::Overflow {
                context: "projected vault total",
            })?;

        if projected_total > self.limit {
            return Err(VaultError::CapacityExceeded {
                attempted,
                projected_total,
                limit: self.limit,
            });
        }

        Ok(projected_total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exactly_at_limit_is_allowed() {
        let guard = CapacityGuard::new(1_000);
        assert_eq!(guard.check(400, 600), Ok(1_000));
    }

    #[test]
    fn one_over_limit_is_rejected() {
        let guard = CapacityGuard::new(1_000);
        assert_eq!(
            guard.check(400, 601),
            Err(VaultError::CapacityExceeded {
                attempted: 601,
                projected_total: 1_001,
                limit: 1_000,
            })
        );
    }

    #[test]
    fn overflowing_projection_rejected() {
        let guard = CapacityGuard::new(Amount::MAX);
        assert!(matches!(
            guard.check(Amount::MAX, 1),
            Err(VaultError::Overflow { .. })
        ));
    }

    #[test]
    fn remaining_saturates() {
        let guard = CapacityGuard::new(100);
        assert_eq!(guard.remaining(30), 70);
        assert_eq!(guard.remaining(150), 0);
    }
}
