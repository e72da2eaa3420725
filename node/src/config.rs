// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Node Configuration
//!
//! A single JSON file describing the devnet the node stands up: the vault's
//! construction parameters, the assets registered on the token ledger, the
//! pools seeded on the exchange, and the faucet limit.
//!
//! `capvault-node init` writes [`NodeConfig::default`] to
//! `<data-dir>/config.json`; `run` reads it back.

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use capvault_protocol::config::VaultConfig;
use capvault_protocol::{AccountId, Amount, AssetId};

/// File name looked up inside the data directory when `--config` is absent.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// One asset to register on the token ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetSpec {
    /// Asset identifier, e.g. "USDC".
    pub id: AssetId,
    /// Human-readable name.
    pub name: String,
    /// Display decimals.
    pub decimals: u8,
}

/// One pool to create and seed on the exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSpec {
    /// First asset of the pair.
    pub asset_a: AssetId,
    /// Initial reserve of `asset_a`.
    pub reserve_a: Amount,
    /// Second asset of the pair.
    pub asset_b: AssetId,
    /// Initial reserve of `asset_b`.
    pub reserve_b: Amount,
}

/// Full node configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Network label reported by the API.
    pub network: String,
    /// Vault construction parameters.
    pub vault: VaultConfig,
    /// Account the exchange keeps its reserves in.
    pub pool_account: AccountId,
    /// Account that seeds pool liquidity.
    pub liquidity_provider: AccountId,
    /// Swap fee in basis points.
    pub fee_bps: Amount,
    /// Largest single faucet mint.
    pub faucet_limit: Amount,
    /// Assets to register.
    pub assets: Vec<AssetSpec>,
    /// Pools to create and seed.
    pub pools: Vec<PoolSpec>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        let asset = |id: &str, name: &str, decimals| AssetSpec {
            id: AssetId::new(id),
            name: name.into(),
            decimals,
        };

        Self {
            network: "devnet".into(),
            vault: VaultConfig {
                capacity_limit: 10_000_000_000_000,
                settlement_asset: AssetId::new("USDC"),
                conversion_service: "capvault:amm".into(),
                holding_account: AccountId::new("capvault:vault"),
                owner: AccountId::new("capvault:admin"),
            },
            pool_account: AccountId::new("capvault:pool"),
            liquidity_provider: AccountId::new("capvault:lp"),
            fee_bps: capvault_contracts::DEFAULT_FEE_BPS,
            faucet_limit: 1_000_000_000_000,
            assets: vec![
                asset("USDC", "USD Coin", 6),
                asset("WETH", "Wrapped Ether", 18),
                asset("WBTC", "Wrapped Bitcoin", 8),
                asset("DAI", "Dai Stablecoin", 18),
            ],
            pools: vec![
                PoolSpec {
                    asset_a: AssetId::new("WETH"),
                    reserve_a: 1_000_000_000_000,
                    asset_b: AssetId::new("USDC"),
                    reserve_b: 3_000_000_000_000,
                },
                PoolSpec {
                    asset_a: AssetId::new("WBTC"),
                    reserve_a: 100_000_000_000,
                    asset_b: AssetId::new("USDC"),
                    reserve_b: 6_000_000_000_000,
                },
            ],
        }
    }
}

impl NodeConfig {
    /// Reads and validates a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: NodeConfig = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Writes the configuration as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let raw = serde_json::to_string_pretty(self).context("failed to serialize config")?;
        std::fs::write(path, raw)
            .with_context(|| format!("failed to write config file {}", path.display()))
    }

    /// Checks everything the vault and the devnet wiring rely on.
    pub fn validate(&self) -> Result<()> {
        self.vault.validate().context("invalid vault section")?;

        let known = |id: &AssetId| self.assets.iter().any(|a| &a.id == id);
        if !known(&self.vault.settlement_asset) {
            bail!(
                "settlement asset {} is not listed under assets",
                self.vault.settlement_asset
            );
        }
        for pool in &self.pools {
            for id in [&pool.asset_a, &pool.asset_b] {
                if !known(id) {
                    bail!("pool asset {} is not listed under assets", id);
                }
            }
        }
        if self.faucet_limit == 0 {
            bail!("faucet_limit must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        NodeConfig::default().validate().unwrap();
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        let config = NodeConfig::default();

        config.save(&path).unwrap();
        assert_eq!(NodeConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn unknown_pool_asset_rejected() {
        let mut config = NodeConfig::default();
        config.pools[0].asset_a = AssetId::new("DOGE");
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("DOGE"));
    }

    #[test]
    fn zero_capacity_rejected() {
        let mut config = NodeConfig::default();
        config.vault.capacity_limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = NodeConfig::load(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("broken.json"));
    }
}
