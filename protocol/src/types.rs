// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! Identifier newtypes and the amount unit shared by every module.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Quantity in the smallest unit of an asset. The settlement ledger, quotes,
/// and capacity figures all use this type. No floating point, ever.
pub type Amount = u128;

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps a raw identifier string.
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Returns `true` for the "zero address": an empty identifier or
            /// one made only of zeros (with or without a `0x` prefix).
            pub fn is_zero(&self) -> bool {
                let trimmed = self.0.trim();
                let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
                digits.chars().all(|c| c == '0')
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self::new(raw)
            }
        }

        impl From<String> for $name {
            fn from(raw: String) -> Self {
                Self(raw)
            }
        }
    };
}

identifier!(
    /// Identity of a depositor, of the vault's holding account, or of any
    /// other party known to the custody layer.
    AccountId
);

identifier!(
    /// Identity of an asset type (the settlement asset included).
    AssetId
);
