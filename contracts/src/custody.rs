// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! Vault custody backed by the token ledger.
//!
//! Every asset the vault holds sits in one account on the [`TokenLedger`]:
//! the holding account. Deposits move funds from the user into it,
//! withdrawals move them out.

use std::sync::Arc;

use capvault_protocol::external::{AssetCustody, CustodyError};
use capvault_protocol::{AccountId, Amount, AssetId};

use crate::token_ledger::{TokenError, TokenLedger};

impl From<TokenError> for CustodyError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::AssetNotFound(asset) => CustodyError::UnknownAsset(asset),
            TokenError::InsufficientBalance {
                asset,
                account,
                balance,
                amount,
            } => CustodyError::InsufficientFunds {
                asset,
                account,
                available: balance,
                requested: amount,
            },
            other => CustodyError::Rejected(other.to_string()),
        }
    }
}

/// [`AssetCustody`] over a shared [`TokenLedger`].
#[derive(Clone)]
pub struct VaultCustody {
    ledger: Arc<TokenLedger>,
    holder: AccountId,
}

impl VaultCustody {
    /// Custody of everything held by `holder` on `ledger`.
    pub fn new(ledger: Arc<TokenLedger>, holder: AccountId) -> Self {
        Self { ledger, holder }
    }

    /// The holding account.
    pub fn holder(&self) -> &AccountId {
        &self.holder
    }

    /// What the holding account has of `asset`.
    pub fn holdings(&self, asset: &AssetId) -> Amount {
        self.ledger.balance_of(asset, &self.holder)
    }
}

impl AssetCustody for VaultCustody {
    fn transfer_in(
        &self,
        asset: &AssetId,
        from: &AccountId,
        amount: Amount,
    ) -> Result<bool, CustodyError> {
        Ok(self.ledger.transfer(asset, from, &self.holder, amount)?)
    }

    fn transfer_out(
        &self,
        asset: &AssetId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<bool, CustodyError> {
        Ok(self.ledger.transfer(asset, &self.holder, to, amount)?)
    }
}
