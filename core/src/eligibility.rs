//! Refund/claim eligibility of a settlement-layer HTLC.
//!
//! The classification is advisory: the chain itself enforces the locktime.
//! It is recomputed from a fresh balance snapshot on every refresh.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Balance snapshot of an HTLC, in satoshis.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Amounts {
    /// Still locked and spendable by either path.
    pub spendable: u64,
    /// Already spent (claimed or refunded).
    pub spent: u64,
    /// Swept into a recoverable output by the server.
    pub recoverable: u64,
}

impl Amounts {
    pub const fn is_empty(&self) -> bool {
        self.spendable == 0 && self.spent == 0 && self.recoverable == 0
    }
}

/// Where a swap stands with respect to a unilateral refund.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EligibilityState {
    /// Nothing was ever locked.
    NotFunded,
    /// Funds are locked and the refund locktime has not passed yet.
    RefundWindowPending,
    /// Funds are locked and the refund locktime has passed.
    RefundReady,
    /// Nothing left to spend.
    FullySpent,
}

impl EligibilityState {
    /// Only [`EligibilityState::RefundReady`] allows a refund.
    pub const fn permits_refund(&self) -> bool {
        matches!(self, Self::RefundReady)
    }
}

impl std::fmt::Display for EligibilityState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NotFunded => "not funded",
            Self::RefundWindowPending => "refund window pending",
            Self::RefundReady => "refund ready",
            Self::FullySpent => "fully spent",
        };
        f.write_str(s)
    }
}

/// Classifies a balance snapshot against the refund locktime.
///
/// `refund_locktime` and `now` are whole-second Unix timestamps. Any
/// remaining spendable amount keeps the swap refundable, even when part of
/// it was already spent.
pub fn evaluate(amounts: &Amounts, refund_locktime: u64, now: u64) -> EligibilityState {
    if amounts.is_empty() {
        EligibilityState::NotFunded
    } else if amounts.spendable == 0 {
        EligibilityState::FullySpent
    } else if now < refund_locktime {
        EligibilityState::RefundWindowPending
    } else {
        EligibilityState::RefundReady
    }
}

/// Current wall-clock time in whole seconds since the Unix epoch.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
