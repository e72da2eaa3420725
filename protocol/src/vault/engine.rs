// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # The Vault
//!
//! [`Vault`] owns the ledger and the capacity limit, holds handles to the
//! external collaborators, and runs every mutating entry point through
//! [`Vault::atomically`]: gate, then host transaction and ledger journal,
//! then the body, then commit or roll back everything.
//!
//! The deposit and withdrawal bodies live in `deposit.rs` and `withdraw.rs`;
//! this file is wiring, read-only accessors, and the safe-transfer
//! discipline they share.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, MutexGuard};
use tokio::sync::broadcast;

use crate::clock::{Clock, SystemClock};
use crate::config::{VaultConfig, EVENT_CHANNEL_CAPACITY};
use crate::error::VaultError;
use crate::external::{AssetCustody, ConversionService, CustodyError, TransactionHost};
use crate::types::{AccountId, Amount, AssetId};

use super::capacity::CapacityGuard;
use super::events::VaultEvent;
use super::gate::ReentrancyGate;
use super::ledger::{Account, Ledger, VaultStats};
use super::price_feed::PriceFeedRegistry;

/// A capacity-bounded settlement vault.
///
/// `Vault` is `Send + Sync`; share it behind an `Arc`. Mutating entry points
/// are serialized by the reentrancy gate, read-only accessors never block on
/// an in-flight operation for longer than a ledger lookup.
///
/// Reads are not isolated from an operation in flight. A `balance_of` or
/// `total_vault_balance` taken while a withdrawal waits on its transfer sees
/// the debit even if the transfer then fails and the debit is rolled back.
/// Only values read while [`is_locked`](Self::is_locked) is `false` are
/// settled.
pub struct Vault {
    config: VaultConfig,
    capacity: CapacityGuard,
    pub(super) custody: Arc<dyn AssetCustody>,
    pub(super) converter: Arc<dyn ConversionService>,
    host: Arc<dyn TransactionHost>,
    clock: Arc<dyn Clock>,
    gate: ReentrancyGate,
    ledger: Mutex<Ledger>,
    price_feeds: Mutex<PriceFeedRegistry>,
    pending_events: Mutex<Vec<VaultEvent>>,
    events: broadcast::Sender<VaultEvent>,
}

impl Vault {
    /// Creates a vault from `config` and its external collaborators.
    ///
    /// # Errors
    ///
    /// Returns whatever [`VaultConfig::validate`] rejects.
    pub fn new(
        config: VaultConfig,
        custody: Arc<dyn AssetCustody>,
        converter: Arc<dyn ConversionService>,
        host: Arc<dyn TransactionHost>,
    ) -> Result<Self, VaultError> {
        config.validate()?;
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        tracing::info!(
            capacity_limit = %config.capacity_limit,
            settlement_asset = %config.settlement_asset,
            conversion_service = %config.conversion_service,
            "vault initialized"
        );

        Ok(Self {
            capacity: CapacityGuard::new(config.capacity_limit),
            config,
            custody,
            converter,
            host,
            clock: Arc::new(SystemClock),
            gate: ReentrancyGate::new(),
            ledger: Mutex::new(Ledger::new()),
            price_feeds: Mutex::new(PriceFeedRegistry::new()),
            pending_events: Mutex::new(Vec::new()),
            events,
        })
    }

    /// Replaces the wall clock used to compute conversion deadlines.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    // -----------------------------------------------------------------------
    // Atomic execution
    // -----------------------------------------------------------------------

    /// Runs `body` as one all-or-nothing operation.
    ///
    /// The gate is taken before anything is read, then an [`OperationScope`]
    /// opens the host transaction and the ledger journal. Unless the scope
    /// is committed it rolls both back and discards buffered events when
    /// dropped, so an error and a panic unwinding out of `body` end the
    /// same way. The gate guard is dropped last, on every path.
    pub(super) fn atomically<T>(
        &self,
        operation: &'static str,
        body: impl FnOnce() -> Result<T, VaultError>,
    ) -> Result<T, VaultError> {
        let _gate = self.gate.enter(operation)?;
        let scope = OperationScope::open(self, operation);

        match body() {
            Ok(value) => {
                scope.commit();
                Ok(value)
            }
            Err(err) => {
                tracing::warn!(operation, error = %err, "operation rolled back");
                Err(err)
            }
        }
    }

    pub(super) fn ledger(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock()
    }

    pub(super) fn capacity(&self) -> &CapacityGuard {
        &self.capacity
    }

    pub(super) fn emit(&self, event: VaultEvent) {
        self.pending_events.lock().push(event);
    }

    pub(super) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // -----------------------------------------------------------------------
    // Safe transfers
    // -----------------------------------------------------------------------

    /// Pulls `amount` of `asset` from `from`. Any answer other than
    /// `Ok(true)` fails the operation.
    pub(super) fn safe_transfer_in(
        &self,
        asset: &AssetId,
        from: &AccountId,
        amount: Amount,
    ) -> Result<(), VaultError> {
        checked_transfer(asset, self.custody.transfer_in(asset, from, amount))
    }

    /// Pays `amount` of `asset` to `to`. Any answer other than `Ok(true)`
    /// fails the operation.
    pub(super) fn safe_transfer_out(
        &self,
        asset: &AssetId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), VaultError> {
        checked_transfer(asset, self.custody.transfer_out(asset, to, amount))
    }

    // -----------------------------------------------------------------------
    // Administration
    // -----------------------------------------------------------------------

    /// Registers a legacy price feed for `asset`. Owner only.
    ///
    /// The deposit flow never reads these feeds.
    ///
    /// # Errors
    ///
    /// [`VaultError::Unauthorized`] if `caller` is not the owner,
    /// [`VaultError::ZeroAddress`] for a zero asset or blank feed,
    /// [`VaultError::Reentrancy`] if called from inside another operation.
    pub fn register_price_feed(
        &self,
        caller: &AccountId,
        asset: &AssetId,
        feed: &str,
    ) -> Result<(), VaultError> {
        self.atomically("register_price_feed", || {
            if caller != &self.config.owner {
                return Err(VaultError::Unauthorized(format!(
                    "{} is not the vault owner",
                    caller
                )));
            }
            if asset.is_zero() {
                return Err(VaultError::ZeroAddress { role: "asset" });
            }
            if feed.trim().is_empty() {
                return Err(VaultError::ZeroAddress { role: "price feed" });
            }

            self.price_feeds
                .lock()
                .register(asset.clone(), feed.to_string());
            self.emit(VaultEvent::PriceFeedRegistered {
                asset: asset.clone(),
                feed: feed.to_string(),
                at: self.now(),
            });
            tracing::info!(%asset, feed, "price feed registered");
            Ok(())
        })
    }

    // -----------------------------------------------------------------------
    // Read-only accessors
    // -----------------------------------------------------------------------

    /// Settlement balance owed to `account`.
    pub fn balance_of(&self, account: &AccountId) -> Amount {
        self.ledger.lock().balance_of(account)
    }

    /// Aggregate settlement balance owed across every account.
    pub fn total_vault_balance(&self) -> Amount {
        self.ledger.lock().total()
    }

    /// The immutable capacity limit.
    pub fn capacity_limit(&self) -> Amount {
        self.capacity.limit()
    }

    /// Settlement units that can still be credited before hitting the cap.
    pub fn remaining_capacity(&self) -> Amount {
        self.capacity.remaining(self.total_vault_balance())
    }

    /// Ledger entry (balance and counters) for `account`.
    pub fn account_stats(&self, account: &AccountId) -> Option<Account> {
        self.ledger.lock().account(account).cloned()
    }

    /// Vault-wide counters.
    pub fn vault_stats(&self) -> VaultStats {
        self.ledger.lock().stats().clone()
    }

    /// The asset every balance is denominated in.
    pub fn settlement_asset(&self) -> &AssetId {
        &self.config.settlement_asset
    }

    /// Identity of the conversion service endpoint.
    pub fn conversion_service(&self) -> &str {
        &self.config.conversion_service
    }

    /// Account holding the vault's custody of every asset.
    pub fn holding_account(&self) -> &AccountId {
        &self.config.holding_account
    }

    /// The vault administrator.
    pub fn owner(&self) -> &AccountId {
        &self.config.owner
    }

    /// The full construction-time configuration.
    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    /// Feed registered for `asset`, if any.
    pub fn price_feed(&self, asset: &AssetId) -> Option<String> {
        self.price_feeds.lock().get(asset).map(str::to_string)
    }

    /// Returns `true` while a mutating operation is in flight.
    pub fn is_locked(&self) -> bool {
        self.gate.is_entered()
    }

    /// Checks `Σ balances == total <= capacity`. Only meaningful at rest.
    pub fn invariant_holds(&self) -> bool {
        let ledger = self.ledger.lock();
        ledger.is_balanced() && ledger.total() <= self.capacity.limit()
    }

    /// Subscribes to events published after each committed operation.
    pub fn subscribe(&self) -> broadcast::Receiver<VaultEvent> {
        self.events.subscribe()
    }
}

/// An open host transaction plus ledger journal for one operation.
///
/// Rolls both back on drop unless [`commit`](Self::commit) ran first.
struct OperationScope<'a> {
    vault: &'a Vault,
    operation: &'static str,
    committed: bool,
}

impl<'a> OperationScope<'a> {
    fn open(vault: &'a Vault, operation: &'static str) -> Self {
        vault.host.begin();
        vault.ledger.lock().begin();
        Self {
            vault,
            operation,
            committed: false,
        }
    }

    /// Commits the journal, then the host, then publishes buffered events.
    fn commit(mut self) {
        self.committed = true;
        self.vault.ledger.lock().commit();
        self.vault.host.commit();
        let events = std::mem::take(&mut *self.vault.pending_events.lock());
        for event in events {
            // No subscribers is not an error.
            let _ = self.vault.events.send(event);
        }
    }
}

impl Drop for OperationScope<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        self.vault.ledger.lock().rollback();
        self.vault.host.rollback();
        self.vault.pending_events.lock().clear();
        if std::thread::panicking() {
            tracing::error!(operation = self.operation, "operation unwound, rolled back");
        }
    }
}

fn checked_transfer(
    asset: &AssetId,
    outcome: Result<bool, CustodyError>,
) -> Result<(), VaultError> {
    match outcome {
        Ok(true) => Ok(()),
        Ok(false) => Err(VaultError::TransferFailed {
            asset: asset.clone(),
            reason: "transfer reported failure".into(),
        }),
        Err(err) => Err(VaultError::TransferFailed {
            asset: asset.clone(),
            reason: err.to_string(),
        }),
    }
}
