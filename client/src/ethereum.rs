use ethers::abi::RawLog;
use ethers::contract::{EthEvent, EthLogDecode};
use ethers::providers::{Http, Middleware, Provider};
use ethers::types::{Address, Filter, Log, H256, U256};
use hashswap_core::{ContractSwapId, HashLock};
use tracing::{debug, instrument, trace, warn};
use url::Url;

use crate::error::Result;
use crate::event::{LogQuery, ObservedEvent};
use crate::ChainReader;

/// ABI for the `SwapCreated` event of the EVM HTLC contract
#[derive(Clone, Debug, EthEvent)]
#[ethevent(
    name = "SwapCreated",
    abi = "SwapCreated(
    bytes32 swapId,
    address recipient,
    address tokenIn,
    address tokenOut,
    uint256 amountIn,
    bytes32 indexed hashLock,
    uint256 timelock,
    uint24 poolFee)"
)]
pub struct SwapCreatedEvent {
    pub swap_id: [u8; 32],
    pub recipient: Address,
    pub token_in: Address,
    pub token_out: Address,
    pub amount_in: U256,
    #[ethevent(indexed)]
    pub hash_lock: [u8; 32],
    pub timelock: U256,
    pub pool_fee: u32,
}

impl SwapCreatedEvent {
    /// `topic0` of every `SwapCreated` log.
    pub fn topic() -> H256 {
        <Self as EthEvent>::signature()
    }
}

/// Decodes a raw log into an [`ObservedEvent`], or `None` if it is not a `SwapCreated` log.
pub fn decode_swap_created(log: &Log) -> Option<ObservedEvent> {
    let raw = RawLog {
        topics: log.topics.clone(),
        data: log.data.to_vec(),
    };
    let ev = match <SwapCreatedEvent as EthLogDecode>::decode_log(&raw) {
        Ok(ev) => ev,
        Err(e) => {
            warn!(error = %e, topics = ?log.topics, "Skipping undecodable log");
            return None;
        }
    };
    Some(ObservedEvent {
        swap_id: ContractSwapId::from_bytes(ev.swap_id),
        recipient: ev.recipient,
        token_in: ev.token_in,
        token_out: ev.token_out,
        amount_in: ev.amount_in,
        hash_lock: HashLock::from_bytes(ev.hash_lock),
        timelock: ev.timelock,
        pool_fee: ev.pool_fee,
        block_number: log.block_number.map(|n| n.as_u64()),
        transaction_hash: log.transaction_hash,
    })
}

/// Read-only access to an EVM chain over JSON-RPC
pub struct EthereumReader {
    provider: Provider<Http>,
}

impl EthereumReader {
    pub fn new(rpc_url: &Url) -> Result<Self> {
        let provider = Provider::<Http>::try_from(rpc_url.as_str())?;
        debug!(%rpc_url, "Ethereum reader configured");
        Ok(Self { provider })
    }
}

#[async_trait::async_trait]
impl ChainReader for EthereumReader {
    async fn block_number(&self) -> Result<u64> {
        Ok(self.provider.get_block_number().await?.as_u64())
    }

    #[instrument(skip(self, query), fields(
        contract = ?query.contract,
        hash_lock = %query.hash_lock,
        from = query.from_block,
        to = ?query.to_block
    ))]
    async fn swap_created_logs(&self, query: &LogQuery) -> Result<Vec<ObservedEvent>> {
        let mut filter = Filter::new()
            .address(query.contract)
            .topic0(query.event_signature)
            .topic1(H256::from(*query.hash_lock.as_bytes()))
            .from_block(query.from_block);
        if let Some(to) = query.to_block {
            filter = filter.to_block(to);
        }

        let logs = self.provider.get_logs(&filter).await?;
        trace!(count = logs.len(), "Fetched logs");
        Ok(logs.iter().filter_map(decode_swap_created).collect())
    }
}
