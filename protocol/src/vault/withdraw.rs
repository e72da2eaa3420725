// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! Withdrawal path.
//!
//! Validate, debit the ledger, then pay out. By the time the custody layer
//! runs (and possibly calls back into us) the ledger already reflects the
//! withdrawal. If the payout fails, the debit is rolled back with the rest
//! of the operation.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::VaultError;
use crate::types::{AccountId, Amount};

use super::engine::Vault;
use super::events::VaultEvent;

/// What a successful withdrawal did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalReceipt {
    /// Unique identifier for this operation.
    pub operation_id: Uuid,
    /// The debited account.
    pub account: AccountId,
    /// Settlement units paid out.
    pub amount: Amount,
    /// The account's balance after the debit.
    pub remaining_balance: Amount,
    /// The vault total after the debit.
    pub total_vault_balance: Amount,
}

impl Vault {
    /// Pays `amount` of the settlement asset out to `caller`.
    ///
    /// # Errors
    ///
    /// [`VaultError::ZeroAmount`], [`VaultError::ZeroAddress`],
    /// [`VaultError::InsufficientBalance`], [`VaultError::TransferFailed`],
    /// [`VaultError::Reentrancy`]. In every case nothing has changed.
    pub fn withdraw(
        &self,
        caller: &AccountId,
        amount: Amount,
    ) -> Result<WithdrawalReceipt, VaultError> {
        self.atomically("withdraw", || {
            if amount == 0 {
                return Err(VaultError::ZeroAmount);
            }
            if caller.is_zero() {
                return Err(VaultError::ZeroAddress { role: "caller" });
            }

            let (remaining_balance, total_vault_balance) = {
                let mut ledger = self.ledger();
                let remaining = ledger.debit(caller, amount)?;
                (remaining, ledger.total())
            };

            let settlement = self.settlement_asset().clone();
            self.safe_transfer_out(&settlement, caller, amount)?;

            let operation_id = Uuid::new_v4();
            self.emit(VaultEvent::Withdrawn {
                operation_id,
                account: caller.clone(),
                amount,
                at: self.now(),
            });
            tracing::info!(
                %operation_id,
                account = %caller,
                amount = %amount,
                "withdrawal committed"
            );

            Ok(WithdrawalReceipt {
                operation_id,
                account: caller.clone(),
                amount,
                remaining_balance,
                total_vault_balance,
            })
        })
    }
}
