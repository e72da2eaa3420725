// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Settlement Ledger
//!
//! Tracks how much the vault owes each account, in settlement units, and
//! the aggregate across all accounts. The ledger is the source of truth for
//! "how much value the vault owes".
//!
//! Every mutation made while a journal is open is recorded in an undo log,
//! so a failed operation can put the ledger back exactly where it found it.
//! Nothing outside the vault engine ever gets a `&mut Ledger`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::VaultError;
use crate::types::{AccountId, Amount};

// ---------------------------------------------------------------------------
// Account
// ---------------------------------------------------------------------------

/// Ledger entry for one depositor.
///
/// Created implicitly on first credit and never removed; a fully withdrawn
/// account simply sits at zero.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// What the vault owes this account, in settlement units.
    pub settlement_balance: Amount,
    /// Number of successful deposits.
    pub deposits: u64,
    /// Number of successful withdrawals.
    pub withdrawals: u64,
    /// Lifetime settlement units credited.
    pub total_deposited: Amount,
    /// Lifetime settlement units paid out.
    pub total_withdrawn: Amount,
}

/// Vault-wide operation counters.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultStats {
    /// Number of successful deposits across all accounts.
    pub deposits: u64,
    /// Number of successful withdrawals across all accounts.
    pub withdrawals: u64,
    /// Lifetime settlement units credited.
    pub total_deposited: Amount,
    /// Lifetime settlement units paid out.
    pub total_withdrawn: Amount,
    /// Number of distinct accounts ever credited.
    pub accounts: u64,
}

// ---------------------------------------------------------------------------
// Journal
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum Undo {
    Account {
        id: AccountId,
        previous: Option<Account>,
    },
    Totals {
        total: Amount,
        stats: VaultStats,
    },
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Per-account and aggregate settlement balances.
#[derive(Debug, Default)]
pub struct Ledger {
    accounts: HashMap<AccountId, Account>,
    total: Amount,
    stats: VaultStats,
    journal: Option<Vec<Undo>>,
}

impl Ledger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a journal. Every mutation until [`commit`](Self::commit) or
    /// [`rollback`](Self::rollback) is recorded.
    pub fn begin(&mut self) {
        debug_assert!(self.journal.is_none(), "ledger journal already open");
        self.journal = Some(Vec::new());
    }

    /// Keeps every mutation since [`begin`](Self::begin).
    pub fn commit(&mut self) {
        self.journal = None;
    }

    /// Reverts every mutation since [`begin`](Self::begin).
    pub fn rollback(&mut self) {
        let Some(journal) = self.journal.take() else {
            return;
        };
        for entry in journal.into_iter().rev() {
            match entry {
                Undo::Account { id, previous } => match previous {
                    Some(account) => {
                        self.accounts.insert(id, account);
                    }
                    None => {
                        self.accounts.remove(&id);
                    }
                },
                Undo::Totals { total, stats } => {
                    self.total = total;
                    self.stats = stats;
                }
            }
        }
    }

    /// Returns `true` while a journal is open.
    pub fn in_transaction(&self) -> bool {
        self.journal.is_some()
    }

    fn record(&mut self, id: &AccountId) {
        if let Some(journal) = self.journal.as_mut() {
            journal.push(Undo::Account {
                id: id.clone(),
                previous: self.accounts.get(id).cloned(),
            });
            journal.push(Undo::Totals {
                total: self.total,
                stats: self.stats.clone(),
            });
        }
    }

    /// Credits `amount` to `account` and to the vault total, and counts one
    /// deposit. Returns the account's new balance.
    ///
    /// The caller must already have checked the post-credit capacity.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Overflow`] if either the account balance or the
    /// total would exceed `Amount::MAX`. Nothing is mutated in that case.
    pub fn credit(&mut self, account: &AccountId, amount: Amount) -> Result<Amount, VaultError> {
        let current = self.balance_of(account);
        let new_balance = current.checked_add(amount).ok_or(VaultError::Overflow {
            context: "account balance",
        })?;
        let new_total = self.total.checked_add(amount).ok_or(VaultError::Overflow {
            context: "vault total",
        })?;

        self.record(account);

        let is_new = !self.accounts.contains_key(account);
        let entry = self.accounts.entry(account.clone()).or_default();
        entry.settlement_balance = new_balance;
        entry.deposits = entry.deposits.saturating_add(1);
        entry.total_deposited = entry.total_deposited.saturating_add(amount);

        self.total = new_total;
        self.stats.deposits = self.stats.deposits.saturating_add(1);
        self.stats.total_deposited = self.stats.total_deposited.saturating_add(amount);
        if is_new {
            self.stats.accounts = self.stats.accounts.saturating_add(1);
        }

        Ok(new_balance)
    }

    /// Debits `amount` from `account` and from the vault total, and counts
    /// one withdrawal. Returns the account's new balance.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::InsufficientBalance`] if `amount` exceeds the
    /// account's balance (an unknown account has a balance of zero).
    pub fn debit(&mut self, account: &AccountId, amount: Amount) -> Result<Amount, VaultError> {
        let available = self.balance_of(account);
        if amount > available {
            return Err(VaultError::InsufficientBalance {
                requested: amount,
                available,
            });
        }
        // Σ balances == total, so the total cannot underflow if the account didn't.
        let new_total = self.total.checked_sub(amount).ok_or(VaultError::Overflow {
            context: "vault total",
        })?;

        self.record(account);

        let entry = self.accounts.entry(account.clone()).or_default();
        entry.settlement_balance = available - amount;
        entry.withdrawals = entry.withdrawals.saturating_add(1);
        entry.total_withdrawn = entry.total_withdrawn.saturating_add(amount);

        self.total = new_total;
        self.stats.withdrawals = self.stats.withdrawals.saturating_add(1);
        self.stats.total_withdrawn = self.stats.total_withdrawn.saturating_add(amount);

        Ok(entry.settlement_balance)
    }

    /// Returns the settlement balance of `account` (zero if never credited).
    pub fn balance_of(&self, account: &AccountId) -> Amount {
        self.accounts
            .get(account)
            .map(|a| a.settlement_balance)
            .unwrap_or(0)
    }

    /// Returns the full ledger entry for `account`, if it exists.
    pub fn account(&self, account: &AccountId) -> Option<&Account> {
        self.accounts.get(account)
    }

    /// Returns the aggregate balance owed across every account.
    pub fn total(&self) -> Amount {
        self.total
    }

    /// Returns the vault-wide counters.
    pub fn stats(&self) -> &VaultStats {
        &self.stats
    }

    /// Number of accounts with a ledger entry (including zero balances).
    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    /// Returns `true` if the per-account balances sum to the total.
    pub fn is_balanced(&self) -> bool {
        self.accounts
            .values()
            .try_fold(0 as Amount, |acc, a| acc.checked_add(a.settlement_balance))
            == Some(self.total)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> AccountId {
        AccountId::new("alice")
    }

    fn bob() -> AccountId {
        AccountId::new("bob")
    }

    #[test]
    fn credit_creates_account_and_updates_total() {
        let mut ledger = Ledger::new();
        let balance = ledger.credit(&alice(), 1_000).unwrap();

        assert_eq!(balance, 1_000);
        assert_eq!(ledger.balance_of(&alice()), 1_000);
        assert_eq!(ledger.total(), 1_000);
        assert_eq!(ledger.stats().accounts, 1);
        assert_eq!(ledger.account(&alice()).unwrap().deposits, 1);
    }

    #[test]
    fn credits_accumulate_across_accounts() {
        let mut ledger = Ledger::new();
        ledger.credit(&alice(), 500).unwrap();
        ledger.credit(&bob(), 300).unwrap();
        ledger.credit(&alice(), 200).unwrap();

        assert_eq!(ledger.balance_of(&alice()), 700);
        assert_eq!(ledger.balance_of(&bob()), 300);
        assert_eq!(ledger.total(), 1_000);
        assert_eq!(ledger.stats().deposits, 3);
        assert_eq!(ledger.stats().accounts, 2);
        assert!(ledger.is_balanced());
    }

    #[test]
    fn credit_overflow_rejected_without_mutation() {
        let mut ledger = Ledger::new();
        ledger.credit(&alice(), Amount::MAX).unwrap();

        let result = ledger.credit(&bob(), 1);
        assert!(matches!(result, Err(VaultError::Overflow { .. })));
        assert_eq!(ledger.balance_of(&bob()), 0);
        assert!(ledger.account(&bob()).is_none());
        assert_eq!(ledger.total(), Amount::MAX);
    }

    #[test]
    fn debit_to_zero_keeps_account() {
        let mut ledger = Ledger::new();
        ledger.credit(&alice(), 500).unwrap();
        let remaining = ledger.debit(&alice(), 500).unwrap();

        assert_eq!(remaining, 0);
        assert_eq!(ledger.total(), 0);
        assert!(ledger.account(&alice()).is_some());
        assert_eq!(ledger.account(&alice()).unwrap().withdrawals, 1);
    }

    #[test]
    fn debit_insufficient_balance_rejected() {
        let mut ledger = Ledger::new();
        ledger.credit(&alice(), 100).unwrap();

        let result = ledger.debit(&alice(), 200);
        assert_eq!(
            result,
            Err(VaultError::InsufficientBalance {
                requested: 200,
                available: 100
            })
        );
        assert_eq!(ledger.balance_of(&alice()), 100);
    }

    #[test]
    fn debit_unknown_account_reports_zero_available() {
        let mut ledger = Ledger::new();
        let result = ledger.debit(&bob(), 1);
        assert_eq!(
            result,
            Err(VaultError::InsufficientBalance {
                requested: 1,
                available: 0
            })
        );
    }

    #[test]
    fn rollback_restores_balances_counters_and_new_accounts() {
        let mut ledger = Ledger::new();
        ledger.credit(&alice(), 1_000).unwrap();
        let before_stats = ledger.stats().clone();

        ledger.begin();
        ledger.credit(&bob(), 250).unwrap();
        ledger.debit(&alice(), 400).unwrap();
        ledger.credit(&alice(), 10).unwrap();
        ledger.rollback();

        assert!(!ledger.in_transaction());
        assert_eq!(ledger.balance_of(&alice()), 1_000);
        assert!(ledger.account(&bob()).is_none());
        assert_eq!(ledger.total(), 1_000);
        assert_eq!(ledger.stats(), &before_stats);
        assert!(ledger.is_balanced());
    }

    #[test]
    fn commit_keeps_mutations() {
        let mut ledger = Ledger::new();
        ledger.begin();
        ledger.credit(&alice(), 42).unwrap();
        ledger.commit();
        ledger.rollback();

        assert_eq!(ledger.balance_of(&alice()), 42);
        assert_eq!(ledger.total(), 42);
    }
}
