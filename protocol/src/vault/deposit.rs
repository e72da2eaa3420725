// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Deposit Orchestration
//!
//! A deposit walks a fixed sequence of stages:
//!
//! ```text
//! Idle → Received → RouteChecked → Quoted → PreCapacityOk
//!      → Converting → PostCapacityOk → Committed
//! ```
//!
//! Any failure drops back to `Idle` through a full rollback (see
//! [`Vault::atomically`]), so nothing between `Idle` and `Committed` is ever
//! observable from outside.
//!
//! Depositing the settlement asset itself skips routing, quoting, and
//! conversion: after custody is taken it goes straight to a capacity check
//! and the credit.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::conversion_deadline_window;
use crate::error::VaultError;
use crate::external::ConversionRequest;
use crate::types::{AccountId, Amount, AssetId};

use super::engine::Vault;
use super::events::VaultEvent;
use super::quote::Quote;
use super::route::RouteVerifier;

/// Where a deposit currently is in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DepositStage {
    /// Nothing has happened yet.
    Idle,
    /// The vault holds the deposited asset.
    Received,
    /// A direct pool to the settlement asset exists.
    RouteChecked,
    /// Expected output and floor are known.
    Quoted,
    /// The quoted output fits under the cap.
    PreCapacityOk,
    /// The external conversion is running.
    Converting,
    /// The delivered output fits under the cap.
    PostCapacityOk,
    /// The ledger has been credited.
    Committed,
}

impl std::fmt::Display for DepositStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DepositStage::Idle => "Idle",
            DepositStage::Received => "Received",
            DepositStage::RouteChecked => "RouteChecked",
            DepositStage::Quoted => "Quoted",
            DepositStage::PreCapacityOk => "PreCapacityOk",
            DepositStage::Converting => "Converting",
            DepositStage::PostCapacityOk => "PostCapacityOk",
            DepositStage::Committed => "Committed",
        };
        f.write_str(name)
    }
}

/// What a successful deposit did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositReceipt {
    /// Unique identifier for this operation.
    pub operation_id: Uuid,
    /// The credited account.
    pub account: AccountId,
    /// The deposited asset.
    pub asset: AssetId,
    /// Units of `asset` taken into custody.
    pub amount_in: Amount,
    /// Settlement units credited to the account.
    pub credited: Amount,
    /// Quoted output (conversion path only).
    pub expected_output: Option<Amount>,
    /// Floor handed to the conversion service (conversion path only).
    pub minimum_output: Option<Amount>,
    /// `false` for the settlement-asset fast path.
    pub converted: bool,
    /// The account's balance after the credit.
    pub new_balance: Amount,
    /// The vault total after the credit.
    pub total_vault_balance: Amount,
}

/// What a deposit would do right now, without doing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositPreview {
    /// The asset that would be deposited.
    pub asset: AssetId,
    /// Units of `asset` that would be taken into custody.
    pub amount_in: Amount,
    /// Settlement units the deposit is expected to credit.
    pub expected_output: Amount,
    /// Least the deposit would accept before failing.
    pub minimum_output: Amount,
    /// `false` for the settlement asset itself.
    pub converted: bool,
    /// Whether `expected_output` currently fits under the cap.
    pub fits_capacity: bool,
}

/// Stage tracker for one deposit. Transitions only move forward.
struct DepositFlow {
    operation_id: Uuid,
    stage: DepositStage,
}

impl DepositFlow {
    fn start() -> Self {
        Self {
            operation_id: Uuid::new_v4(),
            stage: DepositStage::Idle,
        }
    }

    fn advance(&mut self, next: DepositStage) {
        debug_assert!(next > self.stage, "deposit stage went backwards");
        tracing::debug!(
            operation_id = %self.operation_id,
            from = %self.stage,
            to = %next,
            "deposit stage"
        );
        self.stage = next;
    }
}

impl Vault {
    /// Deposits `amount` of `asset` on behalf of `caller`.
    ///
    /// The settlement asset is credited one-for-one. Any other asset is
    /// converted through the conversion service and the delivered output is
    /// credited.
    ///
    /// # Errors
    ///
    /// [`VaultError::ZeroAmount`], [`VaultError::ZeroAddress`],
    /// [`VaultError::TransferFailed`], [`VaultError::NoRouteFound`],
    /// [`VaultError::CapacityExceeded`] (before or after the conversion),
    /// [`VaultError::SlippageViolated`], [`VaultError::DeadlineExpired`],
    /// [`VaultError::Conversion`], [`VaultError::Reentrancy`]. In every case
    /// nothing has changed.
    pub fn deposit(
        &self,
        caller: &AccountId,
        asset: &AssetId,
        amount: Amount,
    ) -> Result<DepositReceipt, VaultError> {
        self.deposit_with_min_output(caller, asset, amount, 0)
    }

    /// Like [`deposit`](Self::deposit), with a caller-supplied output floor.
    ///
    /// The floor sent to the conversion service is the larger of
    /// `min_output` and the vault's own slippage floor. A `min_output`
    /// above the quote fails before anything is converted. Ignored on the
    /// settlement-asset fast path, where the output is the input.
    pub fn deposit_with_min_output(
        &self,
        caller: &AccountId,
        asset: &AssetId,
        amount: Amount,
        min_output: Amount,
    ) -> Result<DepositReceipt, VaultError> {
        self.atomically("deposit", || {
            self.run_deposit(caller, asset, amount, min_output)
        })
    }

    /// Quotes a deposit of `amount` of `asset` without touching any state.
    ///
    /// Takes no lock beyond a ledger read, so the answer can be stale by the
    /// time a real deposit runs.
    ///
    /// # Errors
    ///
    /// [`VaultError::ZeroAmount`], [`VaultError::ZeroAddress`],
    /// [`VaultError::NoRouteFound`], or the conversion service's quote
    /// failure.
    pub fn preview_deposit(
        &self,
        asset: &AssetId,
        amount: Amount,
    ) -> Result<DepositPreview, VaultError> {
        if amount == 0 {
            return Err(VaultError::ZeroAmount);
        }
        if asset.is_zero() {
            return Err(VaultError::ZeroAddress { role: "asset" });
        }

        let (expected_output, minimum_output, converted) = if asset == self.settlement_asset() {
            (amount, amount, false)
        } else {
            let path = RouteVerifier::new(self.converter.as_ref(), self.settlement_asset())
                .require(asset)?;
            let quote = Quote::fetch(self.converter.as_ref(), path, amount)?;
            (quote.expected_output, quote.minimum_output, true)
        };

        let fits_capacity = self
            .capacity()
            .check(self.total_vault_balance(), expected_output)
            .is_ok();

        Ok(DepositPreview {
            asset: asset.clone(),
            amount_in: amount,
            expected_output,
            minimum_output,
            converted,
            fits_capacity,
        })
    }

    fn run_deposit(
        &self,
        caller: &AccountId,
        asset: &AssetId,
        amount: Amount,
        min_output: Amount,
    ) -> Result<DepositReceipt, VaultError> {
        if amount == 0 {
            return Err(VaultError::ZeroAmount);
        }
        if caller.is_zero() {
            return Err(VaultError::ZeroAddress { role: "caller" });
        }
        if asset.is_zero() {
            return Err(VaultError::ZeroAddress { role: "asset" });
        }

        let mut flow = DepositFlow::start();

        self.safe_transfer_in(asset, caller, amount)?;
        flow.advance(DepositStage::Received);

        if asset == self.settlement_asset() {
            return self.commit_deposit(flow, caller, asset, amount, amount, None);
        }

        let path = RouteVerifier::new(self.converter.as_ref(), self.settlement_asset())
            .require(asset)?;
        flow.advance(DepositStage::RouteChecked);

        let quote = Quote::fetch(self.converter.as_ref(), path, amount)?;
        if min_output > quote.expected_output {
            return Err(VaultError::SlippageViolated {
                minimum: min_output,
                actual: quote.expected_output,
            });
        }
        let floor = quote.minimum_output.max(min_output);
        flow.advance(DepositStage::Quoted);

        let total = self.ledger().total();
        self.capacity().check(total, quote.expected_output)?;
        flow.advance(DepositStage::PreCapacityOk);

        let request = ConversionRequest {
            amount_in: amount,
            min_output: floor,
            path: quote.path.clone(),
            sender: self.holding_account().clone(),
            recipient: self.holding_account().clone(),
            deadline: self.now() + conversion_deadline_window(),
        };
        flow.advance(DepositStage::Converting);
        let actual_output = self.converter.convert(&request)?;

        // The service promised to enforce the floor. Hold it to that.
        if actual_output < floor {
            return Err(VaultError::SlippageViolated {
                minimum: floor,
                actual: actual_output,
            });
        }

        let total = self.ledger().total();
        self.capacity().check(total, actual_output)?;
        flow.advance(DepositStage::PostCapacityOk);

        self.commit_deposit(
            flow,
            caller,
            asset,
            amount,
            actual_output,
            Some((quote.expected_output, floor)),
        )
    }

    fn commit_deposit(
        &self,
        mut flow: DepositFlow,
        caller: &AccountId,
        asset: &AssetId,
        amount_in: Amount,
        credited: Amount,
        quoted: Option<(Amount, Amount)>,
    ) -> Result<DepositReceipt, VaultError> {
        let (new_balance, total_vault_balance) = {
            let mut ledger = self.ledger();
            // Fast path: this is its only capacity check. Conversion path:
            // repeats the post-conversion check under the same lock.
            self.capacity().check(ledger.total(), credited)?;
            let new_balance = ledger.credit(caller, credited)?;
            (new_balance, ledger.total())
        };
        flow.advance(DepositStage::Committed);

        let converted = quoted.is_some();
        self.emit(VaultEvent::Deposited {
            operation_id: flow.operation_id,
            account: caller.clone(),
            asset: asset.clone(),
            amount_in,
            credited,
            converted,
            at: self.now(),
        });

        tracing::info!(
            operation_id = %flow.operation_id,
            account = %caller,
            %asset,
            amount_in = %amount_in,
            credited = %credited,
            converted,
            "deposit committed"
        );

        Ok(DepositReceipt {
            operation_id: flow.operation_id,
            account: caller.clone(),
            asset: asset.clone(),
            amount_in,
            credited,
            expected_output: quoted.map(|(expected, _)| expected),
            minimum_output: quoted.map(|(_, floor)| floor),
            converted,
            new_balance,
            total_vault_balance,
        })
    }
}
