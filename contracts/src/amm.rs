// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Constant-Product Exchange
//!
//! A minimal `x * y = k` pool exchange with a flat swap fee, acting as the
//! vault's [`ConversionService`]. Pools are keyed by unordered asset pair;
//! all reserves sit in a single pool account on the shared [`TokenLedger`].
//!
//! ## Pricing
//!
//! ```text
//! in_with_fee = amount_in * (10_000 - fee_bps)
//! amount_out  = in_with_fee * reserve_out / (reserve_in * 10_000 + in_with_fee)
//! ```
//!
//! Integer division rounds down, so the pool never pays out more than the
//! curve allows. Quotes and executions use the same formula against the
//! same reserves, so a quote is exact until someone else trades.
//!
//! ## Atomicity
//!
//! A conversion updates reserves first, then moves tokens. Both sides are
//! snapshotted for the duration; a failed transfer restores the pool and the
//! ledger together. The exchange is also a [`TransactionHost`] so an outer
//! transaction (the vault's) can undo a conversion that already succeeded.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use capvault_protocol::clock::{Clock, SystemClock};
use capvault_protocol::config::BPS_DENOMINATOR;
use capvault_protocol::external::{
    ConversionError, ConversionPath, ConversionRequest, ConversionService, TransactionHost,
};
use capvault_protocol::{AccountId, Amount, AssetId};

use crate::token_ledger::{TokenError, TokenLedger};

/// Swap fee charged by default: 30 bps (0.3%).
pub const DEFAULT_FEE_BPS: Amount = 30;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from pool administration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AmmError {
    /// Both sides of the pair are the same asset.
    #[error("a pool needs two distinct assets, got {0} twice")]
    IdenticalAssets(AssetId),

    /// A pool for this pair already exists.
    #[error("pool {0}/{1} already exists")]
    DuplicatePool(AssetId, AssetId),

    /// No pool exists for this pair.
    #[error("no pool for {0}/{1}")]
    UnknownPool(AssetId, AssetId),

    /// Liquidity must be added to both sides.
    #[error("liquidity amounts must be non-zero")]
    ZeroLiquidity,

    /// The fee must be below 100%.
    #[error("fee of {0} bps is not below 10000")]
    InvalidFee(Amount),

    /// A reserve would overflow.
    #[error("reserve overflow")]
    ReserveOverflow,

    /// The provider's tokens could not be moved into the pool.
    #[error("token ledger: {0}")]
    Token(#[from] TokenError),

    /// The ledger silently refused the liquidity transfer.
    #[error("liquidity transfer of {0} was refused")]
    TransferRefused(AssetId),
}

// ---------------------------------------------------------------------------
// Pools
// ---------------------------------------------------------------------------

/// One liquidity pool. `asset_a < asset_b` by identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    /// Lower-ordered asset of the pair.
    pub asset_a: AssetId,
    /// Higher-ordered asset of the pair.
    pub asset_b: AssetId,
    /// Reserve of `asset_a`.
    pub reserve_a: Amount,
    /// Reserve of `asset_b`.
    pub reserve_b: Amount,
}

impl Pool {
    /// Returns `(reserve_in, reserve_out)` for a swap selling `asset_in`.
    pub fn reserves_for(&self, asset_in: &AssetId) -> (Amount, Amount) {
        if asset_in == &self.asset_a {
            (self.reserve_a, self.reserve_b)
        } else {
            (self.reserve_b, self.reserve_a)
        }
    }

    fn deposit(&mut self, asset: &AssetId, amount: Amount) -> Option<()> {
        let reserve = if asset == &self.asset_a {
            &mut self.reserve_a
        } else {
            &mut self.reserve_b
        };
        *reserve = reserve.checked_add(amount)?;
        Some(())
    }

    fn swap(&mut self, asset_in: &AssetId, amount_in: Amount, amount_out: Amount) -> Option<()> {
        let (reserve_in, reserve_out) = if asset_in == &self.asset_a {
            (&mut self.reserve_a, &mut self.reserve_b)
        } else {
            (&mut self.reserve_b, &mut self.reserve_a)
        };
        *reserve_in = reserve_in.checked_add(amount_in)?;
        *reserve_out = reserve_out.checked_sub(amount_out)?;
        Some(())
    }
}

type PairKey = (AssetId, AssetId);

fn pair_key(a: &AssetId, b: &AssetId) -> PairKey {
    if a <= b {
        (a.clone(), b.clone())
    } else {
        (b.clone(), a.clone())
    }
}

/// Output of a constant-product swap of `amount_in` against the given
/// reserves, after a `fee_bps` fee on the input.
///
/// # Errors
///
/// Returns [`ConversionError::InsufficientLiquidity`] if either reserve is
/// empty, [`ConversionError::Reverted`] if the arithmetic overflows.
pub fn get_amount_out(
    amount_in: Amount,
    reserve_in: Amount,
    reserve_out: Amount,
    fee_bps: Amount,
) -> Result<Amount, ConversionError> {
    if reserve_in == 0 || reserve_out == 0 {
        return Err(ConversionError::InsufficientLiquidity);
    }
    let overflow = || ConversionError::Reverted("swap arithmetic overflow".into());

    let in_with_fee = amount_in
        .checked_mul(BPS_DENOMINATOR - fee_bps)
        .ok_or_else(overflow)?;
    let numerator = in_with_fee.checked_mul(reserve_out).ok_or_else(overflow)?;
    let denominator = reserve_in
        .checked_mul(BPS_DENOMINATOR)
        .and_then(|r| r.checked_add(in_with_fee))
        .ok_or_else(overflow)?;
    Ok(numerator / denominator)
}

// ---------------------------------------------------------------------------
// ConstantProductAmm
// ---------------------------------------------------------------------------

/// The exchange.
pub struct ConstantProductAmm {
    ledger: Arc<TokenLedger>,
    pool_account: AccountId,
    fee_bps: Amount,
    clock: Arc<dyn Clock>,
    pools: Mutex<HashMap<PairKey, Pool>>,
    snapshots: Mutex<Vec<HashMap<PairKey, Pool>>>,
}

impl ConstantProductAmm {
    /// Creates an exchange holding reserves in `pool_account` on `ledger`,
    /// charging [`DEFAULT_FEE_BPS`].
    pub fn new(ledger: Arc<TokenLedger>, pool_account: AccountId) -> Self {
        Self {
            ledger,
            pool_account,
            fee_bps: DEFAULT_FEE_BPS,
            clock: Arc::new(SystemClock),
            pools: Mutex::new(HashMap::new()),
            snapshots: Mutex::new(Vec::new()),
        }
    }

    /// Overrides the swap fee.
    ///
    /// # Errors
    ///
    /// Returns [`AmmError::InvalidFee`] unless `fee_bps < 10_000`.
    pub fn with_fee_bps(mut self, fee_bps: Amount) -> Result<Self, AmmError> {
        if fee_bps >= BPS_DENOMINATOR {
            return Err(AmmError::InvalidFee(fee_bps));
        }
        self.fee_bps = fee_bps;
        Ok(self)
    }

    /// Replaces the clock deadlines are checked against.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The swap fee in basis points.
    pub fn fee_bps(&self) -> Amount {
        self.fee_bps
    }

    /// The account holding every pool's reserves.
    pub fn pool_account(&self) -> &AccountId {
        &self.pool_account
    }

    /// Creates an empty pool for `a`/`b`.
    ///
    /// # Errors
    ///
    /// [`AmmError::IdenticalAssets`], [`AmmError::DuplicatePool`], or
    /// [`AmmError::Token`] if either asset is not on the ledger.
    pub fn create_pool(&self, a: &AssetId, b: &AssetId) -> Result<(), AmmError> {
        if a == b {
            return Err(AmmError::IdenticalAssets(a.clone()));
        }
        for asset in [a, b] {
            if !self.ledger.is_registered(asset) {
                return Err(TokenError::AssetNotFound(asset.clone()).into());
            }
        }

        let key = pair_key(a, b);
        let mut pools = self.pools.lock();
        if pools.contains_key(&key) {
            return Err(AmmError::DuplicatePool(key.0, key.1));
        }
        pools.insert(
            key.clone(),
            Pool {
                asset_a: key.0.clone(),
                asset_b: key.1.clone(),
                reserve_a: 0,
                reserve_b: 0,
            },
        );
        tracing::info!(asset_a = %key.0, asset_b = %key.1, "pool created");
        Ok(())
    }

    /// Moves `amount_a` of `a` and `amount_b` of `b` from `provider` into
    /// the pool. No LP shares are issued.
    ///
    /// # Errors
    ///
    /// [`AmmError::ZeroLiquidity`], [`AmmError::UnknownPool`], or a ledger
    /// failure. Nothing changes on error.
    pub fn add_liquidity(
        &self,
        provider: &AccountId,
        a: &AssetId,
        amount_a: Amount,
        b: &AssetId,
        amount_b: Amount,
    ) -> Result<(), AmmError> {
        if amount_a == 0 || amount_b == 0 {
            return Err(AmmError::ZeroLiquidity);
        }
        let key = pair_key(a, b);
        if !self.pools.lock().contains_key(&key) {
            return Err(AmmError::UnknownPool(key.0, key.1));
        }

        let scope = SwapScope::open(self);
        self.fund_pool(provider, a, amount_a, b, amount_b, &key)?;
        scope.commit();
        tracing::info!(%provider, %a, %amount_a, %b, %amount_b, "liquidity added");
        Ok(())
    }

    fn fund_pool(
        &self,
        provider: &AccountId,
        a: &AssetId,
        amount_a: Amount,
        b: &AssetId,
        amount_b: Amount,
        key: &PairKey,
    ) -> Result<(), AmmError> {
        for (asset, amount) in [(a, amount_a), (b, amount_b)] {
            if !self
                .ledger
                .transfer(asset, provider, &self.pool_account, amount)?
            {
                return Err(AmmError::TransferRefused(asset.clone()));
            }
        }

        let mut pools = self.pools.lock();
        let pool = pools
            .get_mut(key)
            .ok_or_else(|| AmmError::UnknownPool(key.0.clone(), key.1.clone()))?;
        let mut updated = pool.clone();
        updated
            .deposit(a, amount_a)
            .and_then(|()| updated.deposit(b, amount_b))
            .ok_or(AmmError::ReserveOverflow)?;
        *pool = updated;
        Ok(())
    }

    /// Current pool for `a`/`b`, if any.
    pub fn pool(&self, a: &AssetId, b: &AssetId) -> Option<Pool> {
        self.pools.lock().get(&pair_key(a, b)).cloned()
    }

    /// Every pool, in no particular order.
    pub fn pools(&self) -> Vec<Pool> {
        self.pools.lock().values().cloned().collect()
    }

    fn quote_against_pool(
        &self,
        amount_in: Amount,
        path: &ConversionPath,
    ) -> Result<Amount, ConversionError> {
        let pool = self.pool(&path.asset_in, &path.asset_out).ok_or_else(|| {
            ConversionError::NoPool {
                asset_in: path.asset_in.clone(),
                asset_out: path.asset_out.clone(),
            }
        })?;
        let (reserve_in, reserve_out) = pool.reserves_for(&path.asset_in);
        get_amount_out(amount_in, reserve_in, reserve_out, self.fee_bps)
    }

    fn execute(&self, request: &ConversionRequest) -> Result<Amount, ConversionError> {
        let path = &request.path;
        let key = pair_key(&path.asset_in, &path.asset_out);

        let amount_out = {
            let mut pools = self.pools.lock();
            let pool = pools.get_mut(&key).ok_or_else(|| ConversionError::NoPool {
                asset_in: path.asset_in.clone(),
                asset_out: path.asset_out.clone(),
            })?;
            let (reserve_in, reserve_out) = pool.reserves_for(&path.asset_in);
            let amount_out =
                get_amount_out(request.amount_in, reserve_in, reserve_out, self.fee_bps)?;
            if amount_out < request.min_output {
                return Err(ConversionError::SlippageExceeded {
                    minimum: request.min_output,
                    actual: amount_out,
                });
            }
            pool.swap(&path.asset_in, request.amount_in, amount_out)
                .ok_or_else(|| ConversionError::Reverted("reserve overflow".into()))?;
            amount_out
        };

        self.pay(&path.asset_in, &request.sender, &self.pool_account, request.amount_in)?;
        self.pay(&path.asset_out, &self.pool_account, &request.recipient, amount_out)?;
        Ok(amount_out)
    }

    fn pay(
        &self,
        asset: &AssetId,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), ConversionError> {
        match self.ledger.transfer(asset, from, to, amount) {
            Ok(true) => Ok(()),
            Ok(false) => Err(ConversionError::Reverted(format!(
                "transfer of {} was refused",
                asset
            ))),
            Err(err) => Err(ConversionError::Reverted(err.to_string())),
        }
    }
}

impl ConversionService for ConstantProductAmm {
    fn has_pair(&self, a: &AssetId, b: &AssetId) -> bool {
        self.pools.lock().contains_key(&pair_key(a, b))
    }

    fn quote(&self, amount_in: Amount, path: &ConversionPath) -> Result<Amount, ConversionError> {
        self.quote_against_pool(amount_in, path)
    }

    fn convert(&self, request: &ConversionRequest) -> Result<Amount, ConversionError> {
        if self.clock.now() > request.deadline {
            return Err(ConversionError::DeadlineExpired {
                deadline: request.deadline,
            });
        }

        let scope = SwapScope::open(self);
        let amount_out = self.execute(request)?;
        scope.commit();
        tracing::debug!(
            asset_in = %request.path.asset_in,
            asset_out = %request.path.asset_out,
            amount_in = %request.amount_in,
            %amount_out,
            "swap executed"
        );
        Ok(amount_out)
    }
}

impl TransactionHost for ConstantProductAmm {
    fn begin(&self) {
        let snapshot = self.pools.lock().clone();
        self.snapshots.lock().push(snapshot);
    }

    fn commit(&self) {
        self.snapshots.lock().pop();
    }

    fn rollback(&self) {
        if let Some(snapshot) = self.snapshots.lock().pop() {
            *self.pools.lock() = snapshot;
        }
    }
}

/// Ledger and pool snapshots for one exchange call. Dropping it without
/// [`commit`](Self::commit) restores both, including when a transfer hook
/// unwinds through the call.
struct SwapScope<'a> {
    amm: &'a ConstantProductAmm,
    committed: bool,
}

impl<'a> SwapScope<'a> {
    fn open(amm: &'a ConstantProductAmm) -> Self {
        amm.ledger.begin();
        amm.begin();
        Self {
            amm,
            committed: false,
        }
    }

    fn commit(mut self) {
        self.committed = true;
        self.amm.commit();
        self.amm.ledger.commit();
    }
}

impl Drop for SwapScope<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.amm.rollback();
            self.amm.ledger.rollback();
        }
    }
}
