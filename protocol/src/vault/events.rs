// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! Vault events.
//!
//! Events are buffered while an operation runs and published only after it
//! commits. A rolled-back operation emits nothing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{AccountId, Amount, AssetId};

/// Something observable happened to the vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VaultEvent {
    /// A deposit was credited.
    Deposited {
        operation_id: Uuid,
        account: AccountId,
        asset: AssetId,
        amount_in: Amount,
        credited: Amount,
        converted: bool,
        at: DateTime<Utc>,
    },
    /// A withdrawal was paid out.
    Withdrawn {
        operation_id: Uuid,
        account: AccountId,
        amount: Amount,
        at: DateTime<Utc>,
    },
    /// A legacy price feed was registered.
    PriceFeedRegistered {
        asset: AssetId,
        feed: String,
        at: DateTime<Utc>,
    },
}

impl VaultEvent {
    /// The account the event concerns, if any.
    pub fn account(&self) -> Option<&AccountId> {
        match self {
            VaultEvent::Deposited { account, .. } | VaultEvent::Withdrawn { account, .. } => {
                Some(account)
            }
            VaultEvent::PriceFeedRegistered { .. } => None,
        }
    }
}
