mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::{observed, MockReader};
use ethers::types::Address;
use hashswap_client::ethereum::SwapCreatedEvent;
use hashswap_client::error::ClientError;
use hashswap_client::{ChainEventWatcher, Detection, WatcherConfig};
use hashswap_core::{ContractSwapId, HashLock, SecretVault};
use tokio::time::sleep;

const CONTRACT: Address = Address::repeat_byte(0x42);

fn hash_lock() -> HashLock {
    SecretVault::generate().unwrap().1
}

fn watcher(reader: &Arc<MockReader>) -> ChainEventWatcher<MockReader> {
    ChainEventWatcher::new(Arc::clone(reader), WatcherConfig::new(CONTRACT)).unwrap()
}

#[derive(Default, Clone)]
struct Recorder {
    detections: Arc<Mutex<Vec<Detection>>>,
    errors: Arc<AtomicUsize>,
}

impl Recorder {
    fn on_detected(&self) -> impl FnOnce(Detection) + Send + 'static {
        let detections = Arc::clone(&self.detections);
        move |d| detections.lock().unwrap().push(d)
    }

    fn on_error(&self) -> impl Fn(&ClientError) + Send + Sync + 'static {
        let errors = Arc::clone(&self.errors);
        move |_| {
            errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn detections(&self) -> Vec<Detection> {
        self.detections.lock().unwrap().clone()
    }

    fn errors(&self) -> usize {
        self.errors.load(Ordering::SeqCst)
    }
}

#[tokio::test(start_paused = true)]
async fn detects_once_after_empty_cycles() {
    let lock = hash_lock();
    let swap_id = ContractSwapId::from_bytes([0x5a; 32]);
    let reader = Arc::new(MockReader::revealing(10_000, 4, observed(swap_id, lock)));
    let rec = Recorder::default();

    let handle = watcher(&reader).start(lock, rec.on_detected(), rec.on_error());
    sleep(Duration::from_secs(60)).await;

    let detections = rec.detections();
    assert_eq!(detections.len(), 1);
    assert_eq!(detections[0].swap_id, swap_id);
    assert_eq!(detections[0].head, 10_000);
    assert_eq!(reader.polls(), 4, "polling must stop after detection");
    assert_eq!(rec.errors(), 0);
    assert!(!handle.is_active());

    // stopping after detection is a no-op
    handle.stop();
    handle.stop();
    sleep(Duration::from_secs(60)).await;
    assert_eq!(reader.polls(), 4);
    assert_eq!(rec.detections().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn errors_do_not_end_the_session() {
    let reader = Arc::new(MockReader::failing(10_000));
    let rec = Recorder::default();

    let handle = watcher(&reader).start(hash_lock(), rec.on_detected(), rec.on_error());
    sleep(Duration::from_secs(22)).await;

    // cycles at t = 0, 5, 10, 15, 20
    assert_eq!(rec.errors(), 5);
    assert_eq!(rec.errors(), reader.polls());
    assert!(handle.is_active());
    assert!(rec.detections().is_empty());

    handle.stop();
    let seen = rec.errors();
    sleep(Duration::from_secs(30)).await;
    assert_eq!(rec.errors(), seen);
    assert_eq!(reader.polls(), seen);
    assert!(!handle.is_active());
}

#[tokio::test(start_paused = true)]
async fn recovers_after_transient_errors() {
    let lock = hash_lock();
    let swap_id = ContractSwapId::from_bytes([0x01; 32]);
    let reader = Arc::new(MockReader::revealing(500, 1, observed(swap_id, lock)));
    reader.fail.store(true, Ordering::SeqCst);
    let rec = Recorder::default();

    let _handle = watcher(&reader).start(lock, rec.on_detected(), rec.on_error());
    sleep(Duration::from_secs(12)).await;
    assert_eq!(rec.errors(), 3);
    assert!(rec.detections().is_empty());

    reader.fail.store(false, Ordering::SeqCst);
    sleep(Duration::from_secs(5)).await;
    assert_eq!(rec.detections().len(), 1);
    assert_eq!(rec.detections()[0].swap_id, swap_id);
}

#[tokio::test(start_paused = true)]
async fn late_result_after_stop_is_discarded() {
    let lock = hash_lock();
    let reader = Arc::new(MockReader {
        delay: Some(Duration::from_secs(30)),
        ..MockReader::revealing(10_000, 1, observed(ContractSwapId::from_bytes([9; 32]), lock))
    });
    let rec = Recorder::default();

    let handle = watcher(&reader).start(lock, rec.on_detected(), rec.on_error());
    sleep(Duration::from_secs(1)).await;
    handle.stop();

    // the in-flight query completes at t = 30 with a match
    sleep(Duration::from_secs(60)).await;
    assert_eq!(reader.polls(), 1);
    assert!(rec.detections().is_empty());
}

#[tokio::test(start_paused = true)]
async fn dropping_the_handle_stops_polling() {
    let reader = Arc::new(MockReader::empty(10_000));
    let rec = Recorder::default();

    let handle = watcher(&reader).start(hash_lock(), rec.on_detected(), rec.on_error());
    sleep(Duration::from_secs(12)).await;
    assert_eq!(reader.polls(), 3);

    drop(handle);
    sleep(Duration::from_secs(30)).await;
    assert_eq!(reader.polls(), 3);
}

#[tokio::test(start_paused = true)]
async fn queries_lookback_window() {
    let lock = hash_lock();
    let reader = Arc::new(MockReader::empty(300));
    let watcher = watcher(&reader);

    assert!(watcher.poll_once(&lock).await.unwrap().is_none());
    reader.head.store(5_000, Ordering::SeqCst);
    assert!(watcher.poll_once(&lock).await.unwrap().is_none());
    // a reorg to a lower head is simply accepted
    reader.head.store(4_990, Ordering::SeqCst);
    assert!(watcher.poll_once(&lock).await.unwrap().is_none());

    let queries = reader.queries.lock().unwrap().clone();
    let ranges: Vec<_> = queries.iter().map(|q| (q.from_block, q.to_block)).collect();
    assert_eq!(
        ranges,
        vec![(0, Some(300)), (4_000, Some(5_000)), (3_990, Some(4_990))]
    );
    for q in &queries {
        assert_eq!(q.contract, CONTRACT);
        assert_eq!(q.event_signature, SwapCreatedEvent::topic());
        assert_eq!(q.hash_lock, lock);
    }
}

#[tokio::test(start_paused = true)]
async fn ignores_events_for_other_hash_locks() {
    let ours = hash_lock();
    let theirs = hash_lock();
    let reader = Arc::new(MockReader {
        event: Some(observed(ContractSwapId::from_bytes([7; 32]), theirs)),
        reveal_on: 1,
        ..MockReader::empty(100)
    });
    let watcher = watcher(&reader);

    assert!(watcher.poll_once(&ours).await.unwrap().is_none());
    assert!(watcher.poll_once(&theirs).await.unwrap().is_some());
}

#[tokio::test(start_paused = true)]
async fn sessions_are_independent() {
    let found = hash_lock();
    let missing = hash_lock();
    let swap_id = ContractSwapId::from_bytes([0x33; 32]);
    let reader = Arc::new(MockReader::revealing(10_000, 1, observed(swap_id, found)));
    let watcher = watcher(&reader);
    let a = Recorder::default();
    let b = Recorder::default();

    let handle_a = watcher.start(found, a.on_detected(), a.on_error());
    let handle_b = watcher.start(missing, b.on_detected(), b.on_error());
    sleep(Duration::from_secs(11)).await;

    assert_eq!(a.detections().len(), 1);
    assert!(b.detections().is_empty());
    assert!(!handle_a.is_active());
    assert!(handle_b.is_active());
    assert_eq!(handle_b.hash_lock(), missing);
    handle_b.stop();
}

#[tokio::test(start_paused = true)]
async fn zero_interval_is_rejected_up_front() {
    let reader = Arc::new(MockReader::failing(10_000));
    let config = WatcherConfig {
        poll_interval: Duration::ZERO,
        ..WatcherConfig::new(CONTRACT)
    };
    assert!(matches!(
        ChainEventWatcher::new(Arc::clone(&reader), config),
        Err(ClientError::Config(_))
    ));

    let config = WatcherConfig {
        max_in_flight: 0,
        ..WatcherConfig::new(CONTRACT)
    };
    assert!(matches!(
        ChainEventWatcher::new(Arc::clone(&reader), config),
        Err(ClientError::Config(_))
    ));
    assert_eq!(reader.polls(), 0);
}

#[tokio::test(start_paused = true)]
async fn hung_queries_are_capped_and_aborted_on_stop() {
    let reader = Arc::new(MockReader {
        delay: Some(Duration::from_secs(3_600)),
        ..MockReader::empty(10_000)
    });
    let config = WatcherConfig {
        max_in_flight: 2,
        ..WatcherConfig::new(CONTRACT)
    };
    let watcher = ChainEventWatcher::new(Arc::clone(&reader), config).unwrap();
    let rec = Recorder::default();

    let handle = watcher.start(hash_lock(), rec.on_detected(), rec.on_error());
    // ticks at t = 0, 5, 10, 15, 20; only the first two get a cycle
    sleep(Duration::from_secs(22)).await;
    assert_eq!(reader.polls(), 2);
    assert!(handle.is_active());

    handle.stop();
    sleep(Duration::from_secs(7_200)).await;
    assert_eq!(reader.polls(), 2);
    assert!(rec.detections().is_empty());
    assert_eq!(rec.errors(), 0);
    // aborted cycles release their hold on the reader
    assert_eq!(Arc::strong_count(&reader), 2);
}
