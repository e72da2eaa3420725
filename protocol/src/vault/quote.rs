// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Quotes & the Slippage Floor
//!
//! A quote is the output the conversion service says an input would buy
//! *right now*. It's never stored: by the time a cached quote is used the
//! pool has moved, and stale prices are how vaults get drained.
//!
//! The slippage floor is the least the vault will accept for a quoted
//! conversion: 95% of the quote, truncated toward zero. The floor is handed
//! to the conversion service, which must refuse to settle below it; the
//! vault can't intervene while the external call is running.

use serde::{Deserialize, Serialize};

use crate::config::{BPS_DENOMINATOR, SLIPPAGE_TOLERANCE_BPS};
use crate::error::VaultError;
use crate::external::{ConversionPath, ConversionService};
use crate::types::Amount;

/// Minimum acceptable output for `expected_output`:
/// `expected_output * (10000 - 500) / 10000`, truncated.
///
/// Computed as `q * 9500 + r * 9500 / 10000` with `q, r = divmod(e, 10000)`
/// so that it is exact for the full `Amount` range without overflowing.
pub fn slippage_floor(expected_output: Amount) -> Amount {
    let keep_bps = BPS_DENOMINATOR - SLIPPAGE_TOLERANCE_BPS;
    let whole = expected_output / BPS_DENOMINATOR;
    let rest = expected_output % BPS_DENOMINATOR;
    whole * keep_bps + rest * keep_bps / BPS_DENOMINATOR
}

/// A fresh quote and the floor derived from it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    /// Direct path the quote was taken on.
    pub path: ConversionPath,
    /// Input amount being sold.
    pub amount_in: Amount,
    /// Output the service expects to deliver.
    pub expected_output: Amount,
    /// Least output the vault will accept.
    pub minimum_output: Amount,
}

impl Quote {
    /// Asks `service` for a quote on `path` right now.
    ///
    /// # Errors
    ///
    /// Propagates the service's failure as a [`VaultError`].
    pub fn fetch(
        service: &dyn ConversionService,
        path: ConversionPath,
        amount_in: Amount,
    ) -> Result<Self, VaultError> {
        let expected_output = service.quote(amount_in, &path)?;
        Ok(Self {
            minimum_output: slippage_floor(expected_output),
            path,
            amount_in,
            expected_output,
        })
    }
}
