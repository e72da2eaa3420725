// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Reentrancy Gate
//!
//! One flag per vault, held for the whole of every mutating entry point.
//! External code we call mid-operation (asset transfer hooks, the conversion
//! service) can try to call straight back in; those nested calls are
//! rejected on the spot.
//!
//! The flag sits behind a re-entrant mutex. Other threads queue on the mutex
//! and run one after another, which gives the total ordering of operations.
//! The owning thread gets through the mutex again, finds the flag raised,
//! and is turned away with [`VaultError::Reentrancy`] instead of
//! deadlocking.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};

use crate::error::VaultError;

/// Process-wide exclusive flag for one vault.
#[derive(Debug, Default)]
pub struct ReentrancyGate {
    order: ReentrantMutex<()>,
    entered: AtomicBool,
}

impl ReentrancyGate {
    /// Creates an open gate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enters the gate for `operation`. The returned guard keeps it closed
    /// until dropped, on every exit path.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Reentrancy`] if this thread is already inside
    /// an operation on the same vault.
    pub fn enter(&self, operation: &'static str) -> Result<GateGuard<'_>, VaultError> {
        let order = self.order.lock();
        if self.entered.swap(true, Ordering::AcqRel) {
            tracing::warn!(operation, "reentrant call rejected");
            return Err(VaultError::Reentrancy);
        }
        Ok(GateGuard {
            entered: &self.entered,
            _order: order,
        })
    }

    /// Returns `true` while an operation holds the gate.
    pub fn is_entered(&self) -> bool {
        self.entered.load(Ordering::Acquire)
    }
}

/// Scoped hold on a [`ReentrancyGate`]. Dropping it reopens the gate.
#[derive(Debug)]
pub struct GateGuard<'a> {
    entered: &'a AtomicBool,
    _order: ReentrantMutexGuard<'a, ()>,
}

impl Drop for GateGuard<'_> {
    fn drop(&mut self) {
        // Runs before `_order` is released, so the next thread in line always
        // finds the flag lowered.
        self.entered.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn nested_entry_rejected() {
        let gate = ReentrancyGate::new();
        let _outer = gate.enter("deposit").unwrap();
        assert!(gate.is_entered());
        assert_eq!(gate.enter("withdraw").unwrap_err(), VaultError::Reentrancy);
        // The failed attempt must not have lowered the flag.
        assert!(gate.is_entered());
    }

    #[test]
    fn guard_releases_on_drop() {
        let gate = ReentrancyGate::new();
        {
            let _guard = gate.enter("deposit").unwrap();
        }
        assert!(!gate.is_entered());
        assert!(gate.enter("deposit").is_ok());
    }

    #[test]
    fn guard_releases_on_early_return() {
        fn failing(gate: &ReentrancyGate) -> Result<(), VaultError> {
            let _guard = gate.enter("withdraw")?;
            Err(VaultError::ZeroAmount)
        }

        let gate = ReentrancyGate::new();
        assert_eq!(failing(&gate), Err(VaultError::ZeroAmount));
        assert!(!gate.is_entered());
    }

    #[test]
    fn other_threads_wait_instead_of_failing() {
        let gate = Arc::new(ReentrancyGate::new());
        let guard = gate.enter("deposit").unwrap();

        let contender = {
            let gate = Arc::clone(&gate);
            std::thread::spawn(move || gate.enter("withdraw").map(|_| ()))
        };

        std::thread::sleep(std::time::Duration::from_millis(20));
        drop(guard);

        assert!(contender.join().unwrap().is_ok());
    }
}
