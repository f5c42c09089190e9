#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use ethers::types::{Address, U256};
use hashswap_client::error::{ClientError, Result};
use hashswap_client::event::{LogQuery, ObservedEvent};
use hashswap_client::{ChainReader, WalletModule};
use hashswap_core::{Amounts, ContractSwapId, HashLock};
use url::Url;

pub fn observed(swap_id: ContractSwapId, hash_lock: HashLock) -> ObservedEvent {
    ObservedEvent {
        swap_id,
        recipient: Address::repeat_byte(0x0a),
        token_in: Address::repeat_byte(0x0b),
        token_out: Address::repeat_byte(0x0c),
        amount_in: U256::from(50_000u64),
        hash_lock,
        timelock: U256::from(1_800_000_000u64),
        pool_fee: 3_000,
        block_number: Some(1_234),
        transaction_hash: None,
    }
}

/// Chain reader scripted per poll cycle.
pub struct MockReader {
    pub head: AtomicU64,
    /// `swap_created_logs` calls seen so far.
    pub polls: AtomicUsize,
    /// Poll number (1-based) from which the event is reported; 0 = never.
    pub reveal_on: usize,
    pub event: Option<ObservedEvent>,
    pub fail: AtomicBool,
    /// Artificial latency of each log query.
    pub delay: Option<Duration>,
    pub queries: Mutex<Vec<LogQuery>>,
}

impl MockReader {
    pub fn empty(head: u64) -> Self {
        Self {
            head: AtomicU64::new(head),
            polls: AtomicUsize::new(0),
            reveal_on: 0,
            event: None,
            fail: AtomicBool::new(false),
            delay: None,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn revealing(head: u64, reveal_on: usize, event: ObservedEvent) -> Self {
        Self {
            reveal_on,
            event: Some(event),
            ..Self::empty(head)
        }
    }

    pub fn failing(head: u64) -> Self {
        let reader = Self::empty(head);
        reader.fail.store(true, Ordering::SeqCst);
        reader
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ChainReader for MockReader {
    async fn block_number(&self) -> Result<u64> {
        if self.fail.load(Ordering::SeqCst) {
            self.polls.fetch_add(1, Ordering::SeqCst);
            return Err(ClientError::ChainQuery("connection refused".into()));
        }
        Ok(self.head.load(Ordering::SeqCst))
    }

    async fn swap_created_logs(&self, query: &LogQuery) -> Result<Vec<ObservedEvent>> {
        let poll = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
        self.queries.lock().unwrap().push(query.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.event {
            Some(ev) if self.reveal_on != 0 && poll >= self.reveal_on && ev.hash_lock == query.hash_lock => {
                Ok(vec![ev.clone()])
            }
            _ => Ok(vec![]),
        }
    }
}

/// Wallet module recording every call.
pub struct MockWallet {
    pub amounts: Mutex<Amounts>,
    pub init_calls: AtomicUsize,
    pub fail_init: AtomicBool,
    pub refund_calls: AtomicUsize,
    pub claim_calls: AtomicUsize,
    /// When set, refund/claim fail with this message.
    pub remote_failure: Mutex<Option<String>>,
}

impl MockWallet {
    pub fn with_amounts(amounts: Amounts) -> Self {
        Self {
            amounts: Mutex::new(amounts),
            init_calls: AtomicUsize::new(0),
            fail_init: AtomicBool::new(false),
            refund_calls: AtomicUsize::new(0),
            claim_calls: AtomicUsize::new(0),
            remote_failure: Mutex::new(None),
        }
    }

    fn remote_result(&self, txid: &str) -> Result<String> {
        match self.remote_failure.lock().unwrap().clone() {
            Some(msg) => Err(ClientError::RemoteAction(msg)),
            None => Ok(txid.to_string()),
        }
    }
}

#[async_trait::async_trait]
impl WalletModule for MockWallet {
    async fn initialize(&self) -> Result<()> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_init.load(Ordering::SeqCst) {
            return Err(ClientError::WalletInit("wasm module missing".into()));
        }
        Ok(())
    }

    async fn get_amounts(&self, _server_url: &Url, _swap_id: &str) -> Result<Amounts> {
        Ok(*self.amounts.lock().unwrap())
    }

    async fn refund(&self, _server_url: &Url, _swap_id: &str, _refund_address: &str) -> Result<String> {
        self.refund_calls.fetch_add(1, Ordering::SeqCst);
        self.remote_result("refund-txid")
    }

    async fn claim(&self, _server_url: &Url, _swap_id: &str, _claim_address: &str) -> Result<String> {
        self.claim_calls.fetch_add(1, Ordering::SeqCst);
        self.remote_result("claim-txid")
    }
}
