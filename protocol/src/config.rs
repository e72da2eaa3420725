// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Vault Configuration & Constants
//!
//! Every magic number in CAPVAULT lives here. If you're hardcoding a
//! tolerance or a deadline somewhere else, you're doing it wrong.
//!
//! [`VaultConfig`] carries the parameters supplied once at construction.
//! None of them can change for the lifetime of a vault.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::VaultError;
use crate::types::{AccountId, Amount, AssetId};

// ---------------------------------------------------------------------------
// Protocol Version
// ---------------------------------------------------------------------------

/// The full version string.
pub const PROTOCOL_VERSION: &str = "0.1.0";

// ---------------------------------------------------------------------------
// Slippage
// ---------------------------------------------------------------------------

/// Basis-point denominator. 10,000 bps = 100%.
pub const BPS_DENOMINATOR: Amount = 10_000;

/// Maximum accepted shortfall between the quote and the delivered output:
/// 500 bps, i.e. 5%. Fixed for every deposit.
pub const SLIPPAGE_TOLERANCE_BPS: Amount = 500;

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------

/// How long a conversion request stays executable, in seconds. Fifteen
/// minutes is long enough for a congested relayer, short enough that a
/// stale request can't be replayed at tomorrow's prices.
pub const CONVERSION_DEADLINE_SECS: i64 = 15 * 60;

/// [`CONVERSION_DEADLINE_SECS`] as a `chrono::Duration`.
pub fn conversion_deadline_window() -> Duration {
    Duration::seconds(CONVERSION_DEADLINE_SECS)
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Broadcast channel capacity for vault events. Slow subscribers that fall
/// further behind than this lose the oldest events, not the vault's time.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

// ---------------------------------------------------------------------------
// VaultConfig
// ---------------------------------------------------------------------------

/// Parameters fixed at vault creation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Upper bound on `total_vault_balance`, in settlement units.
    pub capacity_limit: Amount,
    /// The single asset every ledger balance is denominated in.
    pub settlement_asset: AssetId,
    /// Identity of the conversion service endpoint (router address, URL...).
    pub conversion_service: String,
    /// Account that holds the vault's custody of every asset.
    pub holding_account: AccountId,
    /// Administrator allowed to register legacy price feeds.
    pub owner: AccountId,
}

impl VaultConfig {
    /// Checks that every parameter is usable.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::InvalidConfig`] for a zero capacity or a blank
    /// service endpoint, and [`VaultError::ZeroAddress`] for zero identities.
    pub fn validate(&self) -> Result<(), VaultError> {
        if self.capacity_limit == 0 {
            return Err(VaultError::InvalidConfig(
                "capacity limit must be greater than zero".into(),
            ));
        }
        if self.settlement_asset.is_zero() {
            return Err(VaultError::ZeroAddress {
                role: "settlement asset",
            });
        }
        if self.conversion_service.trim().is_empty() {
            return Err(VaultError::InvalidConfig(
                "conversion service endpoint must be set".into(),
            ));
        }
        if self.holding_account.is_zero() {
            return Err(VaultError::ZeroAddress {
                role: "holding account",
            });
        }
        if self.owner.is_zero() {
            return Err(VaultError::ZeroAddress { role: "owner" });
        }
        Ok(())
    }
}
