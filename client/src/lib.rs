use std::sync::Arc;

use error::{ClientError, Result};
use event::{LogQuery, ObservedEvent};
use hashswap_core::Amounts;
use tokio::sync::OnceCell;
use tracing::debug;
use url::Url;

pub mod config;
pub mod coordinator;
pub mod error;
pub mod ethereum;
pub mod event;
pub mod watcher;

pub use config::ClientConfig;
pub use coordinator::SwapCoordinator;
pub use ethereum::EthereumReader;
pub use event::Detection;
pub use watcher::{ChainEventWatcher, WatchHandle, WatcherConfig};

/// Read access to the EVM chain the counterparty locks funds on.
///
/// Implementors must be callable concurrently from several watch sessions.
#[async_trait::async_trait]
pub trait ChainReader: Send + Sync {
    /// Current chain head.
    async fn block_number(&self) -> Result<u64>;

    /// `SwapCreated` logs emitted by `query.contract` whose indexed hash-lock
    /// equals `query.hash_lock`, in the requested block range.
    async fn swap_created_logs(&self, query: &LogQuery) -> Result<Vec<ObservedEvent>>;
}

/// Settlement-layer wallet that owns keys and broadcasts transactions.
///
/// Refund and claim move funds: callers must not retry them blindly.
#[async_trait::async_trait]
pub trait WalletModule: Send + Sync {
    /// One-time setup (loading the signing backend, opening connections, ...).
    async fn initialize(&self) -> Result<()>;

    /// Balance snapshot of the swap's HTLC, in satoshis.
    async fn get_amounts(&self, server_url: &Url, swap_id: &str) -> Result<Amounts>;

    /// Broadcasts a refund to `refund_address`, returning the txid.
    async fn refund(&self, server_url: &Url, swap_id: &str, refund_address: &str)
        -> Result<String>;

    /// Broadcasts a claim to `claim_address`, returning the txid.
    async fn claim(&self, server_url: &Url, swap_id: &str, claim_address: &str) -> Result<String>;
}

/// Caller-owned handle guaranteeing a [`WalletModule`] is initialized once.
///
/// Clones share the same initialization state; separately constructed
/// sessions are independent.
pub struct WalletSession<W> {
    wallet: Arc<W>,
    ready: Arc<OnceCell<()>>,
}

impl<W> Clone for WalletSession<W> {
    fn clone(&self) -> Self {
        Self {
            wallet: Arc::clone(&self.wallet),
            ready: Arc::clone(&self.ready),
        }
    }
}

impl<W: WalletModule> WalletSession<W> {
    pub fn new(wallet: Arc<W>) -> Self {
        Self {
            wallet,
            ready: Arc::new(OnceCell::new()),
        }
    }

    /// Runs [`WalletModule::initialize`] unless it already succeeded.
    ///
    /// Concurrent callers wait on the same attempt. A failed attempt is not
    /// cached, so the next call retries.
    pub async fn initialize(&self) -> Result<&W> {
        self.ready
            .get_or_try_init(|| async {
                debug!("Initializing wallet module");
                self.wallet
                    .initialize()
                    .await
                    .map_err(|e| match e {
                        ClientError::WalletInit(_) => e,
                        other => ClientError::WalletInit(other.to_string()),
                    })
            })
            .await?;
        Ok(self.wallet.as_ref())
    }

    pub fn is_ready(&self) -> bool {
        self.ready.initialized()
    }
}
