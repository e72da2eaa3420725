// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # External Collaborators
//!
//! The vault talks to three things it does not own:
//!
//! - [`AssetCustody`] moves assets between users and the vault's holding
//!   account. Transfers may call back into the vault.
//! - [`ConversionService`] is a liquidity-pool exchange that reports direct
//!   pairs, quotes outputs, and executes conversions against a floor and a
//!   deadline.
//! - [`TransactionHost`] provides all-or-nothing semantics across every
//!   external effect of one vault operation.
//!
//! All three are trait objects so tests can inject arbitrary behaviour:
//! lying about amounts, failing silently, or re-entering mid-call.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{AccountId, Amount, AssetId};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors reported by an asset custody implementation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CustodyError {
    /// The sending side does not hold enough of the asset.
    #[error("insufficient {asset} for {account}: available {available}, requested {requested}")]
    InsufficientFunds {
        /// The asset being moved.
        asset: AssetId,
        /// The account being debited.
        account: AccountId,
        /// Its current holding.
        available: Amount,
        /// The amount requested.
        requested: Amount,
    },

    /// The asset is not known to the custody layer.
    #[error("unknown asset {0}")]
    UnknownAsset(AssetId),

    /// The transfer was refused for any other reason.
    #[error("transfer rejected: {0}")]
    Rejected(String),
}

/// Errors reported by a conversion service.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConversionError {
    /// No pool exists for the requested pair.
    #[error("no pool for {asset_in} -> {asset_out}")]
    NoPool {
        /// Input side of the requested pair.
        asset_in: AssetId,
        /// Output side of the requested pair.
        asset_out: AssetId,
    },

    /// The conversion would have delivered less than the caller's floor.
    #[error("output {actual} is below the minimum {minimum}")]
    SlippageExceeded {
        /// The floor supplied with the request.
        minimum: Amount,
        /// What the pool would have delivered.
        actual: Amount,
    },

    /// The request reached the service after its deadline.
    #[error("deadline {deadline} has passed")]
    DeadlineExpired {
        /// The deadline supplied with the request.
        deadline: DateTime<Utc>,
    },

    /// The pool cannot serve the requested size.
    #[error("insufficient liquidity")]
    InsufficientLiquidity,

    /// Anything else: the service reverted.
    #[error("conversion reverted: {0}")]
    Reverted(String),
}

// ---------------------------------------------------------------------------
// Asset custody
// ---------------------------------------------------------------------------

/// Moves assets in and out of the vault's holding account.
///
/// Implementations return `Ok(true)` on success. `Ok(false)` is the
/// "transfer returned false" case some assets produce instead of failing;
/// the vault treats it exactly like an error.
pub trait AssetCustody: Send + Sync {
    /// Pulls `amount` of `asset` from `from` into the vault.
    fn transfer_in(&self, asset: &AssetId, from: &AccountId, amount: Amount)
        -> Result<bool, CustodyError>;

    /// Pays `amount` of `asset` out of the vault to `to`.
    fn transfer_out(&self, asset: &AssetId, to: &AccountId, amount: Amount)
        -> Result<bool, CustodyError>;
}

// ---------------------------------------------------------------------------
// Conversion service
// ---------------------------------------------------------------------------

/// A direct, single-hop conversion path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionPath {
    /// The asset being sold.
    pub asset_in: AssetId,
    /// The asset being bought.
    pub asset_out: AssetId,
}

impl ConversionPath {
    /// Builds a path from `asset_in` to `asset_out`.
    pub fn new(asset_in: AssetId, asset_out: AssetId) -> Self {
        Self {
            asset_in,
            asset_out,
        }
    }
}

/// Everything the conversion service needs to execute one conversion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionRequest {
    /// Exact input amount to sell.
    pub amount_in: Amount,
    /// The service must refuse to settle below this output.
    pub min_output: Amount,
    /// Direct pair to trade through.
    pub path: ConversionPath,
    /// Account the input is taken from.
    pub sender: AccountId,
    /// Account that receives the output.
    pub recipient: AccountId,
    /// Latest instant at which the request may still execute.
    pub deadline: DateTime<Utc>,
}

/// An external liquidity-pool exchange.
pub trait ConversionService: Send + Sync {
    /// Returns `true` if a direct pool exists between the two assets.
    fn has_pair(&self, asset_a: &AssetId, asset_b: &AssetId) -> bool;

    /// Returns the output `amount_in` would buy right now.
    fn quote(&self, amount_in: Amount, path: &ConversionPath) -> Result<Amount, ConversionError>;

    /// Executes the conversion and returns the output actually delivered.
    ///
    /// Must either deliver at least `request.min_output` before
    /// `request.deadline`, or fail with no effect.
    fn convert(&self, request: &ConversionRequest) -> Result<Amount, ConversionError>;
}

// ---------------------------------------------------------------------------
// Transaction host
// ---------------------------------------------------------------------------

/// Provides all-or-nothing semantics across external effects.
///
/// Calls nest: each `begin` must be matched by exactly one `commit` or
/// `rollback`, innermost first.
pub trait TransactionHost: Send + Sync {
    /// Opens a new (possibly nested) transaction.
    fn begin(&self);
    /// Keeps every effect since the matching `begin`.
    fn commit(&self);
    /// Discards every effect since the matching `begin`.
    fn rollback(&self);
}

/// Fans one transaction out to several transactional collaborators.
///
/// Commits and rollbacks run in reverse registration order.
#[derive(Default, Clone)]
pub struct HostGroup {
    members: Vec<Arc<dyn TransactionHost>>,
}

impl HostGroup {
    /// Creates an empty group.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a member and returns the group.
    pub fn with(mut self, member: Arc<dyn TransactionHost>) -> Self {
        self.members.push(member);
        self
    }

    /// Number of registered members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns `true` if no members are registered.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl TransactionHost for HostGroup {
    fn begin(&self) {
        for member in &self.members {
            member.begin();
        }
    }

    fn commit(&self) {
        for member in self.members.iter().rev() {
            member.commit();
        }
    }

    fn rollback(&self) {
        for member in self.members.iter().rev() {
            member.rollback();
        }
    }
}
