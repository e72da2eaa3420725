// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Token Ledger
//!
//! A multi-asset balance book: every fungible asset the vault can touch is
//! registered here, minted here, and moved here.
//!
//! ## Behaviour worth knowing about
//!
//! - **Silent failure**: an asset can be flagged so that `transfer` reports
//!   `Ok(false)` without moving anything, the way some real tokens do. The
//!   vault must treat that as a failure.
//! - **Transfer hooks**: an asset can carry a hook that runs after every
//!   successful transfer of that asset, with no ledger lock held. Hooks may
//!   call anything, including the vault that initiated the transfer.
//! - **Snapshots**: the ledger is a [`TransactionHost`]. `begin` pushes a
//!   snapshot, `rollback` restores it. Snapshots nest.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use capvault_protocol::external::TransactionHost;
use capvault_protocol::{AccountId, Amount, AssetId};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during token ledger operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// The referenced asset has not been registered.
    #[error("asset not found: {0}")]
    AssetNotFound(AssetId),

    /// An asset with this identifier is already registered.
    #[error("duplicate asset: {0} is already registered")]
    DuplicateAsset(AssetId),

    /// A supply or balance overflow would occur.
    #[error("supply overflow: minting {amount} would exceed the maximum supply")]
    SupplyOverflow {
        /// The amount that was attempted.
        amount: Amount,
    },

    /// The sender does not hold enough of the asset.
    #[error("insufficient balance: {account} has {balance} {asset}, tried to move {amount}")]
    InsufficientBalance {
        /// The asset being moved.
        asset: AssetId,
        /// The account being debited.
        account: AccountId,
        /// Its current balance.
        balance: Amount,
        /// The amount requested.
        amount: Amount,
    },
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Metadata and supply information for a registered asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    /// Asset identifier (e.g., "USDC").
    pub asset: AssetId,
    /// Human-readable name.
    pub name: String,
    /// Number of decimal places, for display only.
    pub decimals: u8,
    /// Current total supply in the smallest denomination.
    pub total_supply: Amount,
    /// When the asset was registered.
    pub created_at: DateTime<Utc>,
}

/// One completed transfer, as seen by a [`TransferHook`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRecord {
    /// The asset moved.
    pub asset: AssetId,
    /// The debited account.
    pub from: AccountId,
    /// The credited account.
    pub to: AccountId,
    /// Units moved.
    pub amount: Amount,
}

/// Callback run after a successful transfer of a hooked asset.
pub type TransferHook = Arc<dyn Fn(&TransferRecord) + Send + Sync>;

#[derive(Debug, Clone, Default)]
struct Book {
    tokens: HashMap<AssetId, TokenInfo>,
    balances: HashMap<AssetId, HashMap<AccountId, Amount>>,
}

/// The token ledger.
///
/// Interior-mutable so one instance can be shared (behind an `Arc`) by the
/// custody adapter, the exchange, and the node.
#[derive(Default)]
pub struct TokenLedger {
    book: Mutex<Book>,
    snapshots: Mutex<Vec<Book>>,
    silent: Mutex<HashSet<AssetId>>,
    hooks: Mutex<HashMap<AssetId, TransferHook>>,
}

impl TokenLedger {
    /// Creates a new, empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new asset with zero supply.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::DuplicateAsset`] if `asset` is already known.
    pub fn register_asset(
        &self,
        asset: AssetId,
        name: impl Into<String>,
        decimals: u8,
    ) -> Result<(), TokenError> {
        let mut book = self.book.lock();
        if book.tokens.contains_key(&asset) {
            return Err(TokenError::DuplicateAsset(asset));
        }

        let info = TokenInfo {
            asset: asset.clone(),
            name: name.into(),
            decimals,
            total_supply: 0,
            created_at: Utc::now(),
        };
        book.tokens.insert(asset.clone(), info);
        book.balances.insert(asset.clone(), HashMap::new());
        tracing::debug!(%asset, "asset registered");
        Ok(())
    }

    /// Mints `amount` of `asset` to `to`.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::AssetNotFound`] if the asset is not registered.
    /// Returns [`TokenError::SupplyOverflow`] if the supply would overflow.
    pub fn mint(&self, asset: &AssetId, to: &AccountId, amount: Amount) -> Result<(), TokenError> {
        let mut book = self.book.lock();
        let info = book
            .tokens
            .get_mut(asset)
            .ok_or_else(|| TokenError::AssetNotFound(asset.clone()))?;
        let new_supply = info
            .total_supply
            .checked_add(amount)
            .ok_or(TokenError::SupplyOverflow { amount })?;
        info.total_supply = new_supply;

        // Every balance is bounded by the supply, so this cannot overflow.
        let balance = book
            .balances
            .entry(asset.clone())
            .or_default()
            .entry(to.clone())
            .or_insert(0);
        *balance += amount;
        Ok(())
    }

    /// Moves `amount` of `asset` from `from` to `to`.
    ///
    /// Returns `Ok(false)` without moving anything if the asset is flagged
    /// for silent failure. Runs the asset's hook, if any, after the move and
    /// after the ledger lock is released.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::AssetNotFound`] if the asset is not registered.
    /// Returns [`TokenError::InsufficientBalance`] if `from` can't cover it.
    pub fn transfer(
        &self,
        asset: &AssetId,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<bool, TokenError> {
        if self.silent.lock().contains(asset) {
            tracing::debug!(%asset, %from, %to, %amount, "transfer silently refused");
            return Ok(false);
        }

        {
            let mut book = self.book.lock();
            let balances = book
                .balances
                .get_mut(asset)
                .ok_or_else(|| TokenError::AssetNotFound(asset.clone()))?;

            let balance = balances.get(from).copied().unwrap_or(0);
            if balance < amount {
                return Err(TokenError::InsufficientBalance {
                    asset: asset.clone(),
                    account: from.clone(),
                    balance,
                    amount,
                });
            }
            balances.insert(from.clone(), balance - amount);
            *balances.entry(to.clone()).or_insert(0) += amount;
        }

        let hook = self.hooks.lock().get(asset).cloned();
        if let Some(hook) = hook {
            hook(&TransferRecord {
                asset: asset.clone(),
                from: from.clone(),
                to: to.clone(),
                amount,
            });
        }
        Ok(true)
    }

    /// Makes every transfer of `asset` report `Ok(false)` (or stops doing
    /// so when `enabled` is `false`).
    pub fn set_silent_failure(&self, asset: &AssetId, enabled: bool) {
        let mut silent = self.silent.lock();
        if enabled {
            silent.insert(asset.clone());
        } else {
            silent.remove(asset);
        }
    }

    /// Installs `hook` for `asset`, replacing any previous one.
    pub fn set_transfer_hook(&self, asset: &AssetId, hook: TransferHook) {
        self.hooks.lock().insert(asset.clone(), hook);
    }

    /// Removes the hook for `asset`.
    pub fn clear_transfer_hook(&self, asset: &AssetId) {
        self.hooks.lock().remove(asset);
    }

    /// Returns the balance of `account` in `asset`, or 0.
    pub fn balance_of(&self, asset: &AssetId, account: &AccountId) -> Amount {
        self.book
            .lock()
            .balances
            .get(asset)
            .and_then(|b| b.get(account))
            .copied()
            .unwrap_or(0)
    }

    /// Returns the total supply of `asset`, or 0 if it does not exist.
    pub fn total_supply(&self, asset: &AssetId) -> Amount {
        self.book
            .lock()
            .tokens
            .get(asset)
            .map(|t| t.total_supply)
            .unwrap_or(0)
    }

    /// Returns metadata for `asset`, or `None` if it does not exist.
    pub fn token_info(&self, asset: &AssetId) -> Option<TokenInfo> {
        self.book.lock().tokens.get(asset).cloned()
    }

    /// Returns `true` if `asset` is registered.
    pub fn is_registered(&self, asset: &AssetId) -> bool {
        self.book.lock().tokens.contains_key(asset)
    }

    /// Every registered asset, sorted by identifier.
    pub fn assets(&self) -> Vec<AssetId> {
        let mut assets: Vec<AssetId> = self.book.lock().tokens.keys().cloned().collect();
        assets.sort();
        assets
    }

    /// Returns the number of registered assets.
    pub fn asset_count(&self) -> usize {
        self.book.lock().tokens.len()
    }
}

impl TransactionHost for TokenLedger {
    fn begin(&self) {
        let snapshot = self.book.lock().clone();
        self.snapshots.lock().push(snapshot);
    }

    fn commit(&self) {
        self.snapshots.lock().pop();
    }

    fn rollback(&self) {
        if let Some(snapshot) = self.snapshots.lock().pop() {
            *self.book.lock() = snapshot;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn usdc() -> AssetId {
        AssetId::new("USDC")
    }

    fn alice() -> AccountId {
        AccountId::new("alice")
    }

    fn bob() -> AccountId {
        AccountId::new("bob")
    }

    fn ledger_with_usdc() -> TokenLedger {
        let ledger = TokenLedger::new();
        ledger.register_asset(usdc(), "USD Coin", 6).unwrap();
        ledger
    }

    #[test]
    fn duplicate_asset_rejected() {
        let ledger = ledger_with_usdc();
        assert_eq!(
            ledger.register_asset(usdc(), "Again", 6),
            Err(TokenError::DuplicateAsset(usdc()))
        );
        assert_eq!(ledger.asset_count(), 1);
        assert_eq!(ledger.assets(), vec![usdc()]);
    }

    #[test]
    fn mint_increases_supply_and_balance() {
        let ledger = ledger_with_usdc();
        ledger.mint(&usdc(), &alice(), 1_000_000).unwrap();
        assert_eq!(ledger.total_supply(&usdc()), 1_000_000);
        assert_eq!(ledger.balance_of(&usdc(), &alice()), 1_000_000);
    }

    #[test]
    fn mint_unknown_asset_rejected() {
        let ledger = TokenLedger::new();
        assert!(ledger.mint(&usdc(), &alice(), 1).is_err());
    }

    #[test]
    fn mint_overflow_rejected() {
        let ledger = ledger_with_usdc();
        ledger.mint(&usdc(), &alice(), Amount::MAX).unwrap();
        assert_eq!(
            ledger.mint(&usdc(), &bob(), 1),
            Err(TokenError::SupplyOverflow { amount: 1 })
        );
        assert_eq!(ledger.balance_of(&usdc(), &bob()), 0);
    }

    #[test]
    fn transfer_moves_balance() {
        let ledger = ledger_with_usdc();
        ledger.mint(&usdc(), &alice(), 500).unwrap();

        assert_eq!(ledger.transfer(&usdc(), &alice(), &bob(), 200), Ok(true));
        assert_eq!(ledger.balance_of(&usdc(), &alice()), 300);
        assert_eq!(ledger.balance_of(&usdc(), &bob()), 200);
        assert_eq!(ledger.total_supply(&usdc()), 500);
    }

    #[test]
    fn transfer_more_than_balance_rejected() {
        let ledger = ledger_with_usdc();
        ledger.mint(&usdc(), &alice(), 100).unwrap();
        assert!(matches!(
            ledger.transfer(&usdc(), &alice(), &bob(), 101),
            Err(TokenError::InsufficientBalance { balance: 100, amount: 101, .. })
        ));
    }

    #[test]
    fn silent_failure_moves_nothing() {
        let ledger = ledger_with_usdc();
        ledger.mint(&usdc(), &alice(), 100).unwrap();
        ledger.set_silent_failure(&usdc(), true);

        assert_eq!(ledger.transfer(&usdc(), &alice(), &bob(), 50), Ok(false));
        assert_eq!(ledger.balance_of(&usdc(), &alice()), 100);

        ledger.set_silent_failure(&usdc(), false);
        assert_eq!(ledger.transfer(&usdc(), &alice(), &bob(), 50), Ok(true));
    }

    #[test]
    fn hook_runs_after_transfer_without_lock() {
        let ledger = Arc::new(ledger_with_usdc());
        ledger.mint(&usdc(), &alice(), 100).unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let weak = Arc::downgrade(&ledger);
        ledger.set_transfer_hook(
            &usdc(),
            Arc::new(move |record: &TransferRecord| {
                // Reading the ledger from inside the hook must not deadlock.
                if let Some(ledger) = weak.upgrade() {
                    assert_eq!(ledger.balance_of(&record.asset, &record.to), 40);
                }
                seen.fetch_add(1, Ordering::SeqCst);
            }),
        );

        ledger.transfer(&usdc(), &alice(), &bob(), 40).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        ledger.clear_transfer_hook(&usdc());
        ledger.transfer(&usdc(), &alice(), &bob(), 1).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn nested_snapshots_roll_back_independently() {
        let ledger = ledger_with_usdc();
        ledger.mint(&usdc(), &alice(), 100).unwrap();

        ledger.begin();
        ledger.transfer(&usdc(), &alice(), &bob(), 10).unwrap();
        ledger.begin();
        ledger.transfer(&usdc(), &alice(), &bob(), 20).unwrap();
        ledger.rollback();
        assert_eq!(ledger.balance_of(&usdc(), &bob()), 10);
        ledger.commit();

        ledger.begin();
        ledger.mint(&usdc(), &bob(), 5).unwrap();
        ledger.rollback();
        assert_eq!(ledger.balance_of(&usdc(), &bob()), 10);
        assert_eq!(ledger.total_supply(&usdc()), 100);
    }
}
