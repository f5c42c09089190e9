//! Chain-agnostic view of the EVM HTLC creation event.

use ethers::types::{Address, H256, U256};
use hashswap_core::{ContractSwapId, HashLock};

/// Log query for `SwapCreated` events carrying one hash-lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogQuery {
    /// HTLC contract emitting the event.
    pub contract: Address,
    /// `topic0` of the event.
    pub event_signature: H256,
    /// Indexed hash-lock (`topic1`) to match.
    pub hash_lock: HashLock,
    pub from_block: u64,
    /// `None` means "up to the latest block".
    pub to_block: Option<u64>,
}

/// A decoded `SwapCreated` log. Read from the chain, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedEvent {
    pub swap_id: ContractSwapId,
    pub recipient: Address,
    pub token_in: Address,
    pub token_out: Address,
    pub amount_in: U256,
    pub hash_lock: HashLock,
    pub timelock: U256,
    pub pool_fee: u32,
    pub block_number: Option<u64>,
    pub transaction_hash: Option<H256>,
}

/// What a watch session reports when it finds the counterparty HTLC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub swap_id: ContractSwapId,
    /// Chain head at the time of the poll that found the event.
    pub head: u64,
    pub event: ObservedEvent,
}
