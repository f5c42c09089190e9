//! Polling watcher for the counterparty's `SwapCreated` event.
//!
//! Each session ticks every `poll_interval` and spawns one independent poll
//! cycle per tick, so a hung RPC call only delays its own cycle. At most
//! `max_in_flight` cycles run at once; stopping the session aborts them. The
//! first matching log ends the session.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use ethers::types::Address;
use hashswap_core::HashLock;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use crate::error::{ClientError, Result};
use crate::ethereum::SwapCreatedEvent;
use crate::event::{Detection, LogQuery};
use crate::ChainReader;

/// Default delay between poll cycles.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default number of blocks behind the head each cycle searches.
pub const DEFAULT_LOOKBACK_BLOCKS: u64 = 1_000;

/// Default cap on poll cycles awaiting the RPC at the same time.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatcherConfig {
    /// HTLC contract emitting `SwapCreated`.
    pub contract: Address,
    pub poll_interval: Duration,
    pub lookback_blocks: u64,
    /// Lowest block ever queried.
    pub earliest_block: u64,
    /// Ticks are skipped while this many cycles are still pending.
    pub max_in_flight: usize,
}

impl WatcherConfig {
    pub fn new(contract: Address) -> Self {
        Self {
            contract,
            poll_interval: DEFAULT_POLL_INTERVAL,
            lookback_blocks: DEFAULT_LOOKBACK_BLOCKS,
            earliest_block: 0,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }

    /// Rejects settings a session cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(ClientError::Config(
                "poll_interval must be greater than zero".into(),
            ));
        }
        if self.max_in_flight == 0 {
            return Err(ClientError::Config(
                "max_in_flight must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Block range `(from, to)` searched when the chain head is `head`.
    pub fn block_range(&self, head: u64) -> (u64, u64) {
        let from = head
            .saturating_sub(self.lookback_blocks)
            .max(self.earliest_block);
        (from, head)
    }
}

type DetectedCallback = Box<dyn FnOnce(Detection) + Send>;
type ErrorCallback = Box<dyn Fn(&ClientError) + Send + Sync>;

/// State shared by a session's loop, its in-flight cycles and its handle.
struct Session {
    hash_lock: HashLock,
    stop: watch::Sender<bool>,
    // Taken exactly once, which is what makes detection at-most-once.
    on_detected: Mutex<Option<DetectedCallback>>,
    on_error: ErrorCallback,
}

impl Session {
    fn is_stopped(&self) -> bool {
        *self.stop.borrow()
    }

    /// Returns `true` if this call is the one that stopped the session.
    ///
    /// The detection callback is dropped under its lock, so a detection
    /// racing with this call either ran first or never runs.
    fn stop(&self) -> bool {
        let mut slot = self
            .on_detected
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        slot.take();
        !self.stop.send_replace(true)
    }

    fn detected(&self, detection: Detection) {
        let callback = {
            let mut slot = self
                .on_detected
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if self.is_stopped() {
                None
            } else {
                self.stop.send_replace(true);
                slot.take()
            }
        };
        let Some(callback) = callback else {
            debug!(swap_id = %detection.swap_id, "Discarding detection from stopped session");
            return;
        };
        info!(
            hash_lock = %self.hash_lock,
            swap_id = %detection.swap_id,
            block = ?detection.event.block_number,
            "Counterparty HTLC detected"
        );
        callback(detection);
    }

    fn failed(&self, error: ClientError) {
        if self.is_stopped() {
            debug!(%error, "Discarding error from stopped session");
            return;
        }
        warn!(hash_lock = %self.hash_lock, %error, "Poll cycle failed; retrying next interval");
        (self.on_error)(&error);
    }
}

/// Watches an EVM chain for the HTLC matching a hash-lock.
pub struct ChainEventWatcher<R> {
    reader: Arc<R>,
    config: WatcherConfig,
}

impl<R> Clone for ChainEventWatcher<R> {
    fn clone(&self) -> Self {
        Self {
            reader: Arc::clone(&self.reader),
            config: self.config,
        }
    }
}

impl<R: ChainReader + 'static> ChainEventWatcher<R> {
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] if `config` fails [`WatcherConfig::validate`].
    pub fn new(reader: Arc<R>, config: WatcherConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { reader, config })
    }

    /// Starts a watch session on the current tokio runtime.
    ///
    /// `on_detected` runs at most once, with the first matching event.
    /// `on_error` runs for every failed cycle; failures never end the session.
    /// Neither runs once the returned handle is stopped or dropped.
    pub fn start<D, E>(&self, hash_lock: HashLock, on_detected: D, on_error: E) -> WatchHandle
    where
        D: FnOnce(Detection) + Send + 'static,
        E: Fn(&ClientError) + Send + Sync + 'static,
    {
        let (stop, mut stopped) = watch::channel(false);
        let session = Arc::new(Session {
            hash_lock,
            stop,
            on_detected: Mutex::new(Some(Box::new(on_detected))),
            on_error: Box::new(on_error),
        });

        let watcher = self.clone();
        let loop_session = Arc::clone(&session);
        debug!(
            %hash_lock,
            contract = ?self.config.contract,
            interval = ?self.config.poll_interval,
            lookback = self.config.lookback_blocks,
            "Starting watch session"
        );
        tokio::spawn(async move {
            let mut ticker = time::interval(watcher.config.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // Aborts every pending cycle when dropped.
            let mut cycles = JoinSet::new();
            loop {
                tokio::select! {
                    biased;
                    _ = stopped.wait_for(|s| *s) => break,
                    Some(res) = cycles.join_next(), if !cycles.is_empty() => {
                        if let Err(e) = res {
                            warn!(%hash_lock, error = %e, "Poll cycle task failed");
                        }
                    }
                    _ = ticker.tick() => {
                        if cycles.len() >= watcher.config.max_in_flight {
                            warn!(%hash_lock, in_flight = cycles.len(), "Skipping poll; earlier cycles still pending");
                            continue;
                        }
                        cycles.spawn(watcher.clone().cycle(Arc::clone(&loop_session)));
                    }
                }
            }
            debug!(%hash_lock, aborted = cycles.len(), "Watch session ended");
        });

        WatchHandle { session }
    }

    async fn cycle(self, session: Arc<Session>) {
        if session.is_stopped() {
            return;
        }
        match self.poll_once(&session.hash_lock).await {
            Ok(Some(detection)) => session.detected(detection),
            Ok(None) => trace!(hash_lock = %session.hash_lock, "No matching event yet"),
            Err(e) => session.failed(e),
        }
    }

    /// Runs a single poll: read the head, then search the lookback window.
    ///
    /// Returns the first matching event, if any.
    pub async fn poll_once(&self, hash_lock: &HashLock) -> Result<Option<Detection>> {
        let head = self.reader.block_number().await?;
        let (from_block, to_block) = self.config.block_range(head);
        let query = LogQuery {
            contract: self.config.contract,
            event_signature: SwapCreatedEvent::topic(),
            hash_lock: *hash_lock,
            from_block,
            to_block: Some(to_block),
        };
        let events = self.reader.swap_created_logs(&query).await?;
        Ok(events
            .into_iter()
            .find(|ev| ev.hash_lock == *hash_lock)
            .map(|event| Detection {
                swap_id: event.swap_id,
                head,
                event,
            }))
    }
}

/// Handle to a running watch session. Dropping it stops the session.
pub struct WatchHandle {
    session: Arc<Session>,
}

impl WatchHandle {
    /// Cancels the session. Safe to call repeatedly and after detection.
    ///
    /// Cycles still in flight are aborted; a result that lands first is discarded.
    pub fn stop(&self) {
        if self.session.stop() {
            debug!(hash_lock = %self.session.hash_lock, "Watch session stopped");
        }
    }

    /// `false` once stopped or after a detection.
    pub fn is_active(&self) -> bool {
        !self.session.is_stopped()
    }

    pub fn hash_lock(&self) -> HashLock {
        self.session.hash_lock
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
