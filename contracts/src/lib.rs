// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # CAPVAULT Collaborators
//!
//! Concrete implementations of everything the vault talks to but does not
//! own. The vault only ever sees traits; these are the real things behind
//! them in the node and in the integration tests:
//!
//! - **Token Ledger**: multi-asset balances with snapshot rollback, plus the
//!   two behaviours hostile tokens exhibit: silent `false` returns and
//!   transfer callbacks.
//! - **Vault Custody**: [`AssetCustody`](capvault_protocol::external::AssetCustody)
//!   over the token ledger, anchored on one holding account.
//! - **Constant-Product Exchange**: the
//!   [`ConversionService`](capvault_protocol::external::ConversionService),
//!   with direct pools, fee-adjusted quotes, floors, and deadlines.
//!
//! ## Design Principles
//!
//! 1. All monetary operations check for overflow. Wrapping arithmetic and
//!    money do not mix.
//! 2. No lock is held while a transfer hook runs. Hooks are untrusted code.
//! 3. Every stateful component is a `TransactionHost`, so one vault
//!    operation can be undone across all of them.

pub mod amm;
pub mod custody;
pub mod token_ledger;

pub use amm::{get_amount_out, AmmError, ConstantProductAmm, Pool, DEFAULT_FEE_BPS};
pub use custody::VaultCustody;
pub use token_ledger::{TokenError, TokenInfo, TokenLedger, TransferHook, TransferRecord};
