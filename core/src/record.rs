//! Persisted per-swap state.

use serde::{Deserialize, Serialize};
use serde_with::hex::Hex;
use serde_with::serde_as;

use crate::error::RecordError;
use crate::{eligibility, Amounts, ContractSwapId, EligibilityState, HashLock, Result, Secret};

/// Length of a compressed secp256k1 public key.
pub const COMPRESSED_PK_LEN: usize = 33;

/// Everything needed to resume, claim or refund a swap after a restart.
///
/// Records are never deleted automatically: refund locktimes can be weeks out.
#[serde_as]
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SwapRecord {
    /// Settlement-leg swap identifier, as known to the wallet module.
    pub swap_id: String,

    /// Identifier assigned by the EVM contract once the counterparty HTLC is seen.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evm_swap_id: Option<ContractSwapId>,

    pub hash_lock: HashLock,

    pub secret: Secret,

    /// Initiator's own secret key.
    #[serde_as(as = "Hex")]
    pub own_sk: [u8; 32],

    #[serde_as(as = "Hex")]
    pub counterparty_pk: Vec<u8>,

    #[serde_as(as = "Hex")]
    pub server_pk: Vec<u8>,

    /// Absolute refund locktime, seconds since the Unix epoch.
    pub refund_locktime: u64,

    pub unilateral_claim_delay: u64,

    pub unilateral_refund_delay: u64,

    pub unilateral_refund_without_receiver_delay: u64,

    pub network: Network,

    /// Settlement-layer HTLC address.
    pub htlc_address: String,
}

impl SwapRecord {
    /// Checks the record is complete and internally consistent.
    ///
    /// # Errors
    ///
    /// Returns [`SwapError::InvalidRecord`](crate::SwapError::InvalidRecord)
    /// describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.swap_id.trim().is_empty() {
            return Err(RecordError::EmptySwapId.into());
        }
        if self.htlc_address.trim().is_empty() {
            return Err(RecordError::EmptyHtlcAddress.into());
        }
        if self.hash_lock.ensure_matches(&self.secret).is_err() {
            return Err(RecordError::SecretMismatch.into());
        }
        check_pk_len("counterparty_pk", &self.counterparty_pk)?;
        check_pk_len("server_pk", &self.server_pk)?;
        if self.refund_locktime == 0 {
            return Err(RecordError::ZeroLocktime.into());
        }
        Ok(())
    }

    /// Parses and validates a JSON-encoded record.
    pub fn from_json(json: &str) -> Result<Self> {
        let record: Self = serde_json::from_str(json).map_err(RecordError::from)?;
        record.validate()?;
        Ok(record)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Refund eligibility of this swap for the given balances at `now`.
    pub fn eligibility(&self, amounts: &Amounts, now: u64) -> EligibilityState {
        eligibility::evaluate(amounts, self.refund_locktime, now)
    }
}

fn check_pk_len(field: &'static str, pk: &[u8]) -> Result<()> {
    if pk.len() != COMPRESSED_PK_LEN {
        return Err(RecordError::PublicKeyLength {
            field,
            expected: COMPRESSED_PK_LEN,
            actual: pk.len(),
        }
        .into());
    }
    Ok(())
}

impl std::fmt::Debug for SwapRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwapRecord")
            .field("swap_id", &self.swap_id)
            .field("evm_swap_id", &self.evm_swap_id)
            .field("hash_lock", &self.hash_lock)
            .field("secret", &self.secret)
            .field("own_sk", &"<redacted>")
            .field("counterparty_pk", &hex::encode(&self.counterparty_pk))
            .field("server_pk", &hex::encode(&self.server_pk))
            .field("refund_locktime", &self.refund_locktime)
            .field("unilateral_claim_delay", &self.unilateral_claim_delay)
            .field("unilateral_refund_delay", &self.unilateral_refund_delay)
            .field(
                "unilateral_refund_without_receiver_delay",
                &self.unilateral_refund_without_receiver_delay,
            )
            .field("network", &self.network)
            .field("htlc_address", &self.htlc_address)
            .finish()
    }
}

/// Settlement-layer networks.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Bitcoin,
    Testnet,
    Signet,
    Regtest,
    Mutinynet,
}

impl std::str::FromStr for Network {
    type Err = RecordError;

    /// Parses a network name (case-insensitive). `mainnet` is an alias of `bitcoin`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bitcoin" | "mainnet" => Ok(Self::Bitcoin),
            "testnet" => Ok(Self::Testnet),
            "signet" => Ok(Self::Signet),
            "regtest" => Ok(Self::Regtest),
            "mutinynet" => Ok(Self::Mutinynet),
            other => Err(RecordError::Malformed(format!("unknown network `{other}`"))),
        }
    }
}
