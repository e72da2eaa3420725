// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # CAPVAULT Protocol: Core Library
//!
//! A custodial settlement vault. Users deposit whatever asset they hold, the
//! vault swaps it into a single settlement asset through an external
//! conversion service, and the user's ledger balance is credited in that
//! unit. Withdrawals only ever pay out the settlement asset, and a global
//! capacity limit bounds how much the vault may owe at any point.
//!
//! ## Architecture
//!
//! - **types**: Identifiers and the `Amount` unit.
//! - **error**: The single error taxonomy every entry point returns.
//! - **config**: Constants (tolerance, deadline window) and `VaultConfig`.
//! - **external**: Traits for the things we don't control: asset custody,
//!   the conversion service, and the transaction host.
//! - **clock**: Wall-clock abstraction so deadlines are testable.
//! - **vault**: Ledger, capacity guard, route verifier, quoting, the
//!   deposit orchestrator, the withdrawal path, and the reentrancy gate.
//!
//! ## Design Philosophy
//!
//! 1. The capacity invariant is checked against the quote *and* against what
//!    the conversion actually delivered. Surprises in either direction are
//!    someone else's problem until they hit the ledger.
//! 2. Every external call is untrusted. It can lie about amounts, fail
//!    silently, or call straight back into us.
//! 3. An operation either lands completely or leaves no trace.
//! 4. If it touches money, it has tests. Plural.

pub mod clock;
pub mod config;
pub mod error;
pub mod external;
pub mod types;
pub mod vault;

pub use error::VaultError;
pub use types::{AccountId, Amount, AssetId};
pub use vault::Vault;
