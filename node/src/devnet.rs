// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Devnet Wiring
//!
//! Stands up the whole system in-process from a [`NodeConfig`]: a token
//! ledger with the configured assets, an exchange with seeded pools, and a
//! vault whose custody, conversion, and transaction host are those two.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use parking_lot::Mutex;

use capvault_contracts::{ConstantProductAmm, TokenLedger, VaultCustody};
use capvault_protocol::external::{HostGroup, TransactionHost};
use capvault_protocol::{AccountId, Amount, AssetId, Vault};

use crate::config::NodeConfig;

/// Everything the API serves.
pub struct Devnet {
    /// Multi-asset balances for every account.
    pub ledger: Arc<TokenLedger>,
    /// The conversion service.
    pub amm: Arc<ConstantProductAmm>,
    /// The vault.
    pub vault: Arc<Vault>,
    faucet_limit: Amount,
    // Ledger snapshots taken by a vault operation would swallow a mint that
    // lands mid-operation, so faucet mints and vault writes take turns.
    writes: Mutex<()>,
}

impl Devnet {
    /// Builds the devnet described by `config`.
    pub fn build(config: &NodeConfig) -> Result<Self> {
        config.validate()?;

        let ledger = Arc::new(TokenLedger::new());
        for asset in &config.assets {
            ledger
                .register_asset(asset.id.clone(), asset.name.clone(), asset.decimals)
                .with_context(|| format!("failed to register asset {}", asset.id))?;
        }

        let amm = Arc::new(
            ConstantProductAmm::new(Arc::clone(&ledger), config.pool_account.clone())
                .with_fee_bps(config.fee_bps)?,
        );
        for pool in &config.pools {
            ledger.mint(&pool.asset_a, &config.liquidity_provider, pool.reserve_a)?;
            ledger.mint(&pool.asset_b, &config.liquidity_provider, pool.reserve_b)?;
            amm.create_pool(&pool.asset_a, &pool.asset_b)?;
            amm.add_liquidity(
                &config.liquidity_provider,
                &pool.asset_a,
                pool.reserve_a,
                &pool.asset_b,
                pool.reserve_b,
            )
            .with_context(|| {
                format!("failed to seed pool {}/{}", pool.asset_a, pool.asset_b)
            })?;
        }

        let custody = Arc::new(VaultCustody::new(
            Arc::clone(&ledger),
            config.vault.holding_account.clone(),
        ));
        let host = HostGroup::new()
            .with(ledger.clone() as Arc<dyn TransactionHost>)
            .with(amm.clone() as Arc<dyn TransactionHost>);
        let vault = Vault::new(config.vault.clone(), custody, amm.clone(), Arc::new(host))
            .context("failed to construct vault")?;

        tracing::info!(
            assets = config.assets.len(),
            pools = config.pools.len(),
            "devnet ready"
        );

        Ok(Self {
            ledger,
            amm,
            vault: Arc::new(vault),
            faucet_limit: config.faucet_limit,
            writes: Mutex::new(()),
        })
    }

    /// Runs a vault write with faucet mints held off.
    pub fn write<T>(&self, op: impl FnOnce(&Vault) -> T) -> T {
        let _turn = self.writes.lock();
        op(&self.vault)
    }

    /// Mints `amount` of `asset` to `account`. Returns the new balance.
    pub fn faucet(&self, account: &AccountId, asset: &AssetId, amount: Amount) -> Result<Amount> {
        if amount == 0 || amount > self.faucet_limit {
            bail!(
                "faucet amount must be between 1 and {}",
                self.faucet_limit
            );
        }
        if account.is_zero() {
            bail!("faucet recipient must be set");
        }

        let _turn = self.writes.lock();
        self.ledger.mint(asset, account, amount)?;
        tracing::info!(%account, %asset, %amount, "faucet mint");
        Ok(self.ledger.balance_of(asset, account))
    }

    /// Largest single faucet mint.
    pub fn faucet_limit(&self) -> Amount {
        self.faucet_limit
    }
}
