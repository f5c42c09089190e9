//! Per-swap orchestration of the watcher, the evaluator and the wallet module.

use std::sync::{Arc, OnceLock};

use hashswap_core::{
    evaluate, unix_now, ContractSwapId, EligibilityState, HashLock, SwapRecord, SwapStore,
};
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::error::{ClientError, Result};
use crate::watcher::{ChainEventWatcher, WatchHandle};
use crate::{ChainReader, WalletModule, WalletSession};

/// Drives one swap: watches for the counterparty HTLC and gates refund/claim.
///
/// It never signs or broadcasts anything itself; fund-moving calls go to the
/// [`WalletModule`] exactly once per request.
pub struct SwapCoordinator<R, W> {
    record: SwapRecord,
    watcher: ChainEventWatcher<R>,
    wallet: WalletSession<W>,
    server_url: Url,
    active: Option<WatchHandle>,
    // Set once the counterparty HTLC is seen; doubles as the claim-readiness flag.
    detected: Arc<OnceLock<ContractSwapId>>,
}

impl<R, W> SwapCoordinator<R, W>
where
    R: ChainReader + 'static,
    W: WalletModule,
{
    /// # Errors
    ///
    /// Returns [`ClientError::Core`] wrapping `InvalidRecord` if `record` fails validation.
    pub fn new(
        record: SwapRecord,
        watcher: ChainEventWatcher<R>,
        wallet: WalletSession<W>,
        server_url: Url,
    ) -> Result<Self> {
        record.validate()?;
        let detected = Arc::new(OnceLock::new());
        if let Some(id) = record.evm_swap_id {
            let _ = detected.set(id);
        }
        Ok(Self {
            record,
            watcher,
            wallet,
            server_url,
            active: None,
            detected,
        })
    }

    pub fn swap_id(&self) -> &str {
        &self.record.swap_id
    }

    pub fn hash_lock(&self) -> HashLock {
        self.record.hash_lock
    }

    /// Current record, including the contract swap id once detected.
    pub fn record(&self) -> SwapRecord {
        let mut record = self.record.clone();
        if let Some(id) = self.detected.get() {
            record.evm_swap_id = Some(*id);
        }
        record
    }

    /// Writes [`SwapCoordinator::record`] to `store`.
    pub fn persist<S: SwapStore + ?Sized>(&self, store: &S) -> Result<()> {
        store.put(&self.record())?;
        Ok(())
    }

    /// Starts watching for the counterparty HTLC, replacing any running watch.
    ///
    /// Returns `false` without starting anything if the HTLC was already seen.
    pub fn start_watching<D, E>(&mut self, on_detected: D, on_error: E) -> bool
    where
        D: FnOnce(ContractSwapId) + Send + 'static,
        E: Fn(&ClientError) + Send + Sync + 'static,
    {
        if let Some(id) = self.detected.get() {
            debug!(swap_id = %self.record.swap_id, evm_swap_id = %id, "HTLC already detected");
            return false;
        }
        self.stop_watching();

        let detected = Arc::clone(&self.detected);
        let swap_id = self.record.swap_id.clone();
        let handle = self.watcher.start(
            self.record.hash_lock,
            move |detection| {
                if detected.set(detection.swap_id).is_ok() {
                    info!(%swap_id, evm_swap_id = %detection.swap_id, "Swap is ready to claim");
                }
                on_detected(detection.swap_id);
            },
            on_error,
        );
        self.active = Some(handle);
        true
    }

    /// Stops the running watch, if any. Idempotent.
    pub fn stop_watching(&mut self) {
        if let Some(handle) = self.active.take() {
            handle.stop();
        }
    }

    pub fn is_watching(&self) -> bool {
        self.active.as_ref().is_some_and(WatchHandle::is_active)
    }

    pub fn is_claim_ready(&self) -> bool {
        self.detected.get().is_some()
    }

    pub fn detected_swap_id(&self) -> Option<ContractSwapId> {
        self.detected.get().copied()
    }

    /// Eligibility from a fresh balance snapshot at the current wall-clock time.
    pub async fn current_eligibility(&self) -> Result<EligibilityState> {
        self.eligibility_at(unix_now()).await
    }

    #[instrument(skip(self), fields(swap_id = %self.record.swap_id))]
    pub async fn eligibility_at(&self, now: u64) -> Result<EligibilityState> {
        let wallet = self.wallet.initialize().await?;
        let amounts = wallet
            .get_amounts(&self.server_url, &self.record.swap_id)
            .await?;
        let state = evaluate(&amounts, self.record.refund_locktime, now);
        debug!(?amounts, %state, "Evaluated refund eligibility");
        Ok(state)
    }

    /// Refunds the settlement-leg HTLC to `refund_address`.
    ///
    /// # Errors
    ///
    /// - [`ClientError::RefundNotReady`] unless the swap is `RefundReady`.
    /// - [`ClientError::RemoteAction`] with the wallet's message if the refund fails.
    ///   It is not retried.
    pub async fn refund(&self, refund_address: &str) -> Result<String> {
        let state = self.current_eligibility().await?;
        if !state.permits_refund() {
            return Err(ClientError::RefundNotReady(state));
        }
        info!(swap_id = %self.record.swap_id, "Requesting refund");
        let wallet = self.wallet.initialize().await?;
        let txid = wallet
            .refund(&self.server_url, &self.record.swap_id, refund_address)
            .await
            .map_err(remote_failure)?;
        info!(swap_id = %self.record.swap_id, %txid, "Refund broadcast");
        Ok(txid)
    }

    /// Claims the settlement-leg HTLC to `claim_address`.
    ///
    /// # Errors
    ///
    /// - [`ClientError::ClaimNotReady`] until the counterparty HTLC is detected.
    /// - `HashMismatch` if the held secret no longer opens the hash-lock.
    /// - [`ClientError::RemoteAction`] with the wallet's message if the claim fails.
    pub async fn claim(&self, claim_address: &str) -> Result<String> {
        if !self.is_claim_ready() {
            return Err(ClientError::ClaimNotReady);
        }
        self.record.hash_lock.ensure_matches(&self.record.secret)?;
        info!(swap_id = %self.record.swap_id, "Requesting claim");
        let wallet = self.wallet.initialize().await?;
        let txid = wallet
            .claim(&self.server_url, &self.record.swap_id, claim_address)
            .await
            .map_err(remote_failure)?;
        info!(swap_id = %self.record.swap_id, %txid, "Claim broadcast");
        Ok(txid)
    }
}

fn remote_failure(error: ClientError) -> ClientError {
    warn!(%error, "Wallet action failed");
    match error {
        ClientError::RemoteAction(_) => error,
        other => ClientError::RemoteAction(other.to_string()),
    }
}
