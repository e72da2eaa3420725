// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

// Deposit pipeline benchmarks for CAPVAULT.
//
// Covers the settlement-asset fast path, the full convert-and-credit path
// through a constant-product pool, and raw swap pricing.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use capvault_contracts::{get_amount_out, ConstantProductAmm, TokenLedger, VaultCustody};
use capvault_protocol::config::VaultConfig;
use capvault_protocol::external::{HostGroup, TransactionHost};
use capvault_protocol::{AccountId, Amount, AssetId, Vault};

fn build_vault() -> Vault {
    let usdc = AssetId::new("USDC");
    let weth = AssetId::new("WETH");
    let ledger = Arc::new(TokenLedger::new());
    ledger.register_asset(usdc.clone(), "USD Coin", 6).unwrap();
    ledger.register_asset(weth.clone(), "Wrapped Ether", 18).unwrap();

    let lp = AccountId::new("lp");
    let user = AccountId::new("bench-user");
    for account in [&lp, &user] {
        ledger.mint(&usdc, account, Amount::MAX / 8).unwrap();
        ledger.mint(&weth, account, Amount::MAX / 8).unwrap();
    }

    let amm = Arc::new(ConstantProductAmm::new(Arc::clone(&ledger), AccountId::new("pool")));
    amm.create_pool(&weth, &usdc).unwrap();
    amm.add_liquidity(&lp, &weth, 1_000_000_000_000, &usdc, 2_000_000_000_000)
        .unwrap();

    let holder = AccountId::new("vault");
    let custody = Arc::new(VaultCustody::new(Arc::clone(&ledger), holder.clone()));
    let host = HostGroup::new()
        .with(ledger.clone() as Arc<dyn TransactionHost>)
        .with(amm.clone() as Arc<dyn TransactionHost>);

    Vault::new(
        VaultConfig {
            capacity_limit: Amount::MAX / 4,
            settlement_asset: usdc,
            conversion_service: "amm:bench".into(),
            holding_account: holder,
            owner: AccountId::new("admin"),
        },
        custody,
        amm,
        Arc::new(host),
    )
    .unwrap()
}

fn bench_fast_path_deposit(c: &mut Criterion) {
    let vault = build_vault();
    let user = AccountId::new("bench-user");
    let usdc = AssetId::new("USDC");

    c.bench_function("vault/deposit_settlement_asset", |b| {
        b.iter(|| vault.deposit(&user, &usdc, black_box(1_000)).unwrap());
    });
}

fn bench_converted_deposit(c: &mut Criterion) {
    let vault = build_vault();
    let user = AccountId::new("bench-user");
    let weth = AssetId::new("WETH");

    c.bench_function("vault/deposit_with_conversion", |b| {
        b.iter(|| vault.deposit(&user, &weth, black_box(1_000)).unwrap());
    });
}

fn bench_amount_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("amm/get_amount_out");

    for amount_in in [1_u128, 1_000_000, 1_000_000_000_000] {
        group.bench_with_input(
            BenchmarkId::from_parameter(amount_in),
            &amount_in,
            |b, &amount_in| {
                b.iter(|| get_amount_out(black_box(amount_in), 5_000_000_000_000, 10_000_000_000_000, 30));
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_fast_path_deposit,
    bench_converted_deposit,
    bench_amount_out
);
criterion_main!(benches);
