// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Vault Module: Conversion Pipeline & Ledger Invariants
//!
//! This is where money lives. Deposits come in as any routable asset, get
//! converted into the settlement asset, and land on the ledger. Withdrawals
//! leave as the settlement asset only.
//!
//! ## Architecture
//!
//! ```text
//! ledger.rs      Per-account and aggregate balances, journaled for rollback
//! capacity.rs    The global cap, checked against projected totals
//! route.rs       Direct-pair route verification
//! quote.rs       Fresh quotes and the 5% slippage floor
//! gate.rs        Reentrancy gate (scoped guard, total ordering)
//! engine.rs      The `Vault` itself: wiring, accessors, atomic execution
//! deposit.rs     Deposit orchestration state machine
//! withdraw.rs    Withdrawal path (checks → effects → interactions)
//! events.rs      Events published after commit
//! price_feed.rs  Legacy price-feed registry (stored, never consulted)
//! ```
//!
//! ## Invariants
//!
//! 1. **At rest, Σ account balances == total vault balance <= capacity.**
//!    Mid-operation states are never observable after a failure.
//!
//! 2. **Capacity is checked twice per conversion.** Once against the quote
//!    before the external call, once against the delivered output after it.
//!
//! 3. **Exactly one credit per successful deposit.** The credit is the last
//!    thing a deposit does, after every check has passed.
//!
//! 4. **One operation in flight.** Every mutating entry point holds the
//!    reentrancy gate from entry to exit, including across external calls.

pub mod capacity;
pub mod deposit;
pub mod engine;
pub mod events;
pub mod gate;
pub mod ledger;
pub mod price_feed;
pub mod quote;
pub mod route;
pub mod withdraw;

pub use capacity::CapacityGuard;
pub use deposit::{DepositPreview, DepositReceipt, DepositStage};
pub use engine::Vault;
pub use events::VaultEvent;
pub use gate::{GateGuard, ReentrancyGate};
pub use ledger::{Account, Ledger, VaultStats};
pub use price_feed::PriceFeedRegistry;
pub use quote::{slippage_floor, Quote};
pub use route::RouteVerifier;
pub use withdraw::WithdrawalReceipt;
