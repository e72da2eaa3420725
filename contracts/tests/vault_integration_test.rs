// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! Integration tests: the vault wired to the real token ledger and the
//! constant-product exchange.
//!
//! These cover what only shows up with real collaborators: fee-adjusted
//! quotes, pool reserves restored on rollback, and transfer hooks firing
//! from inside the exchange.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use capvault_contracts::{ConstantProductAmm, TokenLedger, TransferRecord, VaultCustody};
use capvault_protocol::config::VaultConfig;
use capvault_protocol::external::{
    ConversionError, ConversionPath, ConversionRequest, ConversionService, HostGroup,
    TransactionHost,
};
use capvault_protocol::{AccountId, Amount, AssetId, Vault, VaultError};

struct World {
    ledger: Arc<TokenLedger>,
    amm: Arc<ConstantProductAmm>,
    vault: Arc<Vault>,
}

fn usdc() -> AssetId {
    AssetId::new("USDC")
}

fn weth() -> AssetId {
    AssetId::new("WETH")
}

fn wbtc() -> AssetId {
    AssetId::new("WBTC")
}

fn alice() -> AccountId {
    AccountId::new("alice")
}

fn holder() -> AccountId {
    AccountId::new("vault")
}

/// Helper: a vault over USDC with one WETH/USDC pool at 1 WETH = 2 USDC.
/// WBTC is registered but has no pool.
fn world(capacity_limit: Amount) -> World {
    world_with(capacity_limit, |amm| amm as Arc<dyn ConversionService>)
}

/// Like [`world`], with the vault talking to the exchange through `front`.
fn world_with(
    capacity_limit: Amount,
    front: impl FnOnce(Arc<ConstantProductAmm>) -> Arc<dyn ConversionService>,
) -> World {
    let ledger = Arc::new(TokenLedger::new());
    ledger.register_asset(usdc(), "USD Coin", 6).unwrap();
    ledger.register_asset(weth(), "Wrapped Ether", 18).unwrap();
    ledger.register_asset(wbtc(), "Wrapped Bitcoin", 8).unwrap();

    let lp = AccountId::new("lp");
    for asset in [usdc(), weth(), wbtc()] {
        ledger.mint(&asset, &lp, 100_000_000_000).unwrap();
        ledger.mint(&asset, &alice(), 1_000_000_000).unwrap();
    }

    let amm = Arc::new(ConstantProductAmm::new(
        Arc::clone(&ledger),
        AccountId::new("pool"),
    ));
    amm.create_pool(&weth(), &usdc()).unwrap();
    amm.add_liquidity(&lp, &weth(), 1_000_000_000, &usdc(), 2_000_000_000)
        .unwrap();

    let custody = Arc::new(VaultCustody::new(Arc::clone(&ledger), holder()));
    let host = HostGroup::new()
        .with(ledger.clone() as Arc<dyn TransactionHost>)
        .with(amm.clone() as Arc<dyn TransactionHost>);

    let vault = Vault::new(
        VaultConfig {
            capacity_limit,
            settlement_asset: usdc(),
            conversion_service: "amm:weth-usdc".into(),
            holding_account: holder(),
            owner: AccountId::new("admin"),
        },
        custody,
        front(amm.clone()),
        Arc::new(host),
    )
    .unwrap();

    World {
        ledger,
        amm,
        vault: Arc::new(vault),
    }
}

// ---------------------------------------------------------------------------
// Deposits
// ---------------------------------------------------------------------------

#[test]
fn weth_deposit_credits_fee_adjusted_output() {
    let w = world(1_000_000_000);
    let quoted = w
        .amm
        .quote(1_000_000, &ConversionPath::new(weth(), usdc()))
        .unwrap();

    let receipt = w.vault.deposit(&alice(), &weth(), 1_000_000).unwrap();

    // 0.3% fee plus price impact: a bit under 2,000,000.
    assert!(quoted < 2_000_000 && quoted > 1_990_000);
    assert_eq!(receipt.credited, quoted);
    assert_eq!(w.vault.balance_of(&alice()), quoted);
    assert_eq!(w.ledger.balance_of(&usdc(), &holder()), quoted);
    assert_eq!(w.ledger.balance_of(&weth(), &holder()), 0);
    assert!(w.vault.invariant_holds());
}

#[test]
fn usdc_deposit_bypasses_the_exchange() {
    let w = world(1_000_000_000);
    let pool_before = w.amm.pool(&weth(), &usdc()).unwrap();

    w.vault.deposit(&alice(), &usdc(), 5_000).unwrap();

    assert_eq!(w.amm.pool(&weth(), &usdc()).unwrap(), pool_before);
    assert_eq!(w.ledger.balance_of(&usdc(), &holder()), 5_000);
}

#[test]
fn asset_without_pool_is_rejected_and_refunded() {
    let w = world(1_000_000_000);

    let err = w.vault.deposit(&alice(), &wbtc(), 10_000).unwrap_err();

    assert_eq!(err, VaultError::NoRouteFound { asset: wbtc() });
    assert_eq!(w.ledger.balance_of(&wbtc(), &alice()), 1_000_000_000);
    assert_eq!(w.ledger.balance_of(&wbtc(), &holder()), 0);
}

#[test]
fn unregistered_asset_fails_at_custody() {
    let w = world(1_000_000_000);

    let err = w
        .vault
        .deposit(&alice(), &AssetId::new("SHIB"), 10)
        .unwrap_err();

    assert!(matches!(err, VaultError::TransferFailed { .. }));
}

#[test]
fn quote_over_remaining_capacity_leaves_pool_untouched() {
    let w = world(1_000_000_000);
    let path = ConversionPath::new(weth(), usdc());
    let quoted = w.amm.quote(1_000_000, &path).unwrap();

    // Fill the vault so the quote exactly fits.
    w.vault
        .deposit(&alice(), &usdc(), 1_000_000_000 - quoted)
        .unwrap();
    let pool_before = w.amm.pool(&weth(), &usdc()).unwrap();

    // One more unit of WETH quotes at least one unit of USDC more.
    let err = w.vault.deposit(&alice(), &weth(), 1_000_001).unwrap_err();

    assert!(matches!(err, VaultError::CapacityExceeded { .. }));
    assert_eq!(w.amm.pool(&weth(), &usdc()).unwrap(), pool_before);
    assert_eq!(w.ledger.balance_of(&weth(), &alice()), 1_000_000_000);
    assert_eq!(w.vault.remaining_capacity(), quoted);
}

#[test]
fn caller_floor_above_pool_output_fails() {
    let w = world(1_000_000_000);
    let quoted = w
        .amm
        .quote(1_000, &ConversionPath::new(weth(), usdc()))
        .unwrap();

    let err = w
        .vault
        .deposit_with_min_output(&alice(), &weth(), 1_000, quoted + 1)
        .unwrap_err();

    assert_eq!(
        err,
        VaultError::SlippageViolated {
            minimum: quoted + 1,
            actual: quoted
        }
    );
}

// ---------------------------------------------------------------------------
// Withdrawals
// ---------------------------------------------------------------------------

#[test]
fn deposit_then_withdraw_everything() {
    let w = world(1_000_000_000);
    let receipt = w.vault.deposit(&alice(), &weth(), 250_000).unwrap();

    w.vault.withdraw(&alice(), receipt.credited).unwrap();

    assert_eq!(w.vault.total_vault_balance(), 0);
    assert_eq!(
        w.ledger.balance_of(&usdc(), &alice()),
        1_000_000_000 + receipt.credited
    );
    assert_eq!(w.ledger.balance_of(&usdc(), &holder()), 0);
}

#[test]
fn silently_failing_settlement_asset_blocks_withdrawal() {
    let w = world(1_000_000_000);
    w.vault.deposit(&alice(), &usdc(), 1_000).unwrap();
    w.ledger.set_silent_failure(&usdc(), true);

    let err = w.vault.withdraw(&alice(), 1_000).unwrap_err();

    assert!(matches!(err, VaultError::TransferFailed { .. }));
    assert_eq!(w.vault.balance_of(&alice()), 1_000);
    assert_eq!(w.ledger.balance_of(&usdc(), &holder()), 1_000);
}

// ---------------------------------------------------------------------------
// Hostile transfer hooks
// ---------------------------------------------------------------------------

/// Helper: hooks `asset` so every transfer tries `attempt` against the
/// vault, and returns what the vault answered.
fn hook_reentry(
    w: &World,
    asset: &AssetId,
    attempt: impl Fn(&Vault) -> Result<(), VaultError> + Send + Sync + 'static,
) -> Arc<Mutex<Vec<Result<(), VaultError>>>> {
    let answers = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&answers);
    let vault: Weak<Vault> = Arc::downgrade(&w.vault);
    w.ledger.set_transfer_hook(
        asset,
        Arc::new(move |_record: &TransferRecord| {
            if let Some(vault) = vault.upgrade() {
                recorded.lock().push(attempt(&vault));
            }
        }),
    );
    answers
}

#[test]
fn usdc_hook_cannot_reenter_during_conversion() {
    let w = world(1_000_000_000);
    let answers = hook_reentry(&w, &usdc(), |vault| {
        vault.withdraw(&alice(), 1).map(|_| ())
    });

    let receipt = w.vault.deposit(&alice(), &weth(), 10_000).unwrap();

    // The pool paying USDC to the vault fired the hook exactly once.
    assert_eq!(*answers.lock(), vec![Err(VaultError::Reentrancy)]);
    assert_eq!(w.vault.balance_of(&alice()), receipt.credited);
}

#[test]
fn weth_hook_cannot_reenter_deposit() {
    let w = world(1_000_000_000);
    let answers = hook_reentry(&w, &weth(), |vault| {
        vault.deposit(&alice(), &usdc(), 1).map(|_| ())
    });

    w.vault.deposit(&alice(), &weth(), 10_000).unwrap();

    // WETH moved twice: user → vault, vault → pool.
    let answers = answers.lock();
    assert_eq!(answers.len(), 2);
    assert!(answers.iter().all(|a| a == &Err(VaultError::Reentrancy)));
    assert_eq!(w.vault.vault_stats().deposits, 1);
}

#[test]
fn hook_outside_a_vault_operation_is_not_blocked() {
    let w = world(1_000_000_000);
    let answers = hook_reentry(&w, &weth(), |vault| {
        vault.deposit(&alice(), &usdc(), 1).map(|_| ())
    });

    // A plain ledger transfer, not initiated by the vault.
    w.ledger
        .transfer(&weth(), &alice(), &AccountId::new("bob"), 1)
        .unwrap();

    assert_eq!(*answers.lock(), vec![Ok(())]);
    assert_eq!(w.vault.balance_of(&alice()), 1);
}

// ---------------------------------------------------------------------------
// Undoing completed swaps
// ---------------------------------------------------------------------------

/// Quotes half of what the exchange will actually deliver.
struct HalfQuotes(Arc<ConstantProductAmm>);

impl ConversionService for HalfQuotes {
    fn has_pair(&self, a: &AssetId, b: &AssetId) -> bool {
        self.0.has_pair(a, b)
    }

    fn quote(&self, amount_in: Amount, path: &ConversionPath) -> Result<Amount, ConversionError> {
        Ok(self.0.quote(amount_in, path)? / 2)
    }

    fn convert(&self, request: &ConversionRequest) -> Result<Amount, ConversionError> {
        self.0.convert(request)
    }
}

/// Every balance the tests below care about.
fn balances(w: &World) -> Vec<Amount> {
    let pool = AccountId::new("pool");
    let mut out = Vec::new();
    for asset in [weth(), usdc()] {
        for account in [alice(), holder(), pool.clone()] {
            out.push(w.ledger.balance_of(&asset, &account));
        }
    }
    out
}

#[test]
fn delivered_output_over_capacity_undoes_the_swap() {
    let w = world_with(1_500_000, |amm| {
        Arc::new(HalfQuotes(amm)) as Arc<dyn ConversionService>
    });
    let real_quote = w
        .amm
        .quote(1_000_000, &ConversionPath::new(weth(), usdc()))
        .unwrap();
    assert!(real_quote / 2 <= 1_500_000 && real_quote > 1_500_000);

    let pool_before = w.amm.pool(&weth(), &usdc()).unwrap();
    let balances_before = balances(&w);

    let err = w.vault.deposit(&alice(), &weth(), 1_000_000).unwrap_err();

    assert_eq!(
        err,
        VaultError::CapacityExceeded {
            attempted: real_quote,
            projected_total: real_quote,
            limit: 1_500_000,
        }
    );
    assert_eq!(w.amm.pool(&weth(), &usdc()).unwrap(), pool_before);
    assert_eq!(balances(&w), balances_before);
    assert_eq!(w.vault.total_vault_balance(), 0);
    assert_eq!(w.vault.vault_stats().deposits, 0);
    assert!(w.vault.account_stats(&alice()).is_none());

    // Snapshot stacks are balanced: the next operation commits normally.
    w.vault.deposit(&alice(), &usdc(), 1_000).unwrap();
    assert_eq!(w.ledger.balance_of(&usdc(), &holder()), 1_000);
    assert!(w.vault.invariant_holds());
}

#[test]
fn panic_after_the_pool_pays_out_undoes_the_swap() {
    let w = world(1_000_000_000);
    let pool_before = w.amm.pool(&weth(), &usdc()).unwrap();
    let balances_before = balances(&w);
    w.ledger.set_transfer_hook(
        &usdc(),
        Arc::new(|_: &TransferRecord| panic!("hostile token")),
    );

    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        w.vault.deposit(&alice(), &weth(), 10_000)
    }));

    assert!(outcome.is_err());
    assert_eq!(w.amm.pool(&weth(), &usdc()).unwrap(), pool_before);
    assert_eq!(balances(&w), balances_before);
    assert_eq!(w.vault.total_vault_balance(), 0);
    assert!(!w.vault.is_locked());

    w.ledger.clear_transfer_hook(&usdc());
    let quoted = w
        .amm
        .quote(10_000, &ConversionPath::new(weth(), usdc()))
        .unwrap();
    let receipt = w.vault.deposit(&alice(), &weth(), 10_000).unwrap();
    assert_eq!(receipt.credited, quoted);
    assert!(w.vault.invariant_holds());
}
