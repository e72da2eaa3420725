// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! Route verification.
//!
//! A route exists iff the conversion service reports a direct pool between
//! the deposited asset and the settlement asset. There is no multi-hop
//! search, and no caching: pools can appear or disappear between calls, so
//! every deposit asks again.

use crate::error::VaultError;
use crate::external::{ConversionPath, ConversionService};
use crate::types::AssetId;

/// Checks direct pairings against the settlement asset.
pub struct RouteVerifier<'a> {
    service: &'a dyn ConversionService,
    settlement_asset: &'a AssetId,
}

impl<'a> RouteVerifier<'a> {
    /// Creates a verifier bound to `service` and `settlement_asset`.
    pub fn new(service: &'a dyn ConversionService, settlement_asset: &'a AssetId) -> Self {
        Self {
            service,
            settlement_asset,
        }
    }

    /// Returns `true` if `asset` can be converted into the settlement asset
    /// in one hop. The settlement asset itself never has a "route".
    pub fn has_route(&self, asset: &AssetId) -> bool {
        asset != self.settlement_asset && self.service.has_pair(asset, self.settlement_asset)
    }

    /// Returns the direct path for `asset`.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::NoRouteFound`] if no direct pool exists.
    pub fn require(&self, asset: &AssetId) -> Result<ConversionPath, VaultError> {
        if !self.has_route(asset) {
            return Err(VaultError::NoRouteFound {
                asset: asset.clone(),
            });
        }
        Ok(ConversionPath::new(
            asset.clone(),
            self.settlement_asset.clone(),
        ))
    }
}
