use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use catalog_domain::{
    HandlerError, HandlerRegistry, KindHandler, OutboxError, OutboxKind, OutboxMessage,
    OutboxStore, TransactionError, Transactor, TxSession,
};

use super::dispatcher::{DispatcherSettings, OutboxDispatcher};

struct DetachedTransactor;

#[async_trait]
impl Transactor for DetachedTransactor {
    async fn begin(&self) -> Result<TxSession, TransactionError> {
        Ok(TxSession::detached())
    }
}

struct FakeRow {
    key: String,
    kind: OutboxKind,
    payload: Vec<u8>,
    in_progress_at: Option<Instant>,
    processed: bool,
    attempts: i32,
    ack_transitions: usize,
}

#[derive(Default)]
struct StoreState {
    rows: Vec<FakeRow>,
    lease_calls: usize,
}

/// In-memory outbox with real leasing semantics: eligibility, TTL expiry,
/// batch limits, and idempotent acknowledgement. Failure injection is a
/// deterministic alternation so the tests themselves cannot flake.
#[derive(Default)]
struct FakeStore {
    state: Mutex<StoreState>,
    fail_every_other_lease: bool,
    fail_every_other_ack: bool,
    lease_counter: AtomicUsize,
    ack_counter: AtomicUsize,
}

impl FakeStore {
    fn flaky() -> Self {
        Self {
            fail_every_other_lease: true,
            fail_every_other_ack: true,
            ..Self::default()
        }
    }

    fn seed(&self, key: &str, kind: OutboxKind, payload: Vec<u8>) {
        self.state.lock().unwrap().rows.push(FakeRow {
            key: key.to_string(),
            kind,
            payload,
            in_progress_at: None,
            processed: false,
            attempts: 0,
            ack_transitions: 0,
        });
    }

    fn processed_keys(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .rows
            .iter()
            .filter(|row| row.processed)
            .map(|row| row.key.clone())
            .collect()
    }

    fn all_processed(&self) -> bool {
        self.state.lock().unwrap().rows.iter().all(|row| row.processed)
    }

    fn attempts_of(&self, key: &str) -> i32 {
        self.state
            .lock()
            .unwrap()
            .rows
            .iter()
            .find(|row| row.key == key)
            .map(|row| row.attempts)
            .unwrap_or(0)
    }

    fn lease_calls(&self) -> usize {
        self.state.lock().unwrap().lease_calls
    }

    fn max_ack_transitions(&self) -> usize {
        self.state
            .lock()
            .unwrap()
            .rows
            .iter()
            .map(|row| row.ack_transitions)
            .max()
            .unwrap_or(0)
    }
}

#[async_trait]
impl OutboxStore for FakeStore {
    async fn enqueue(
        &self,
        _session: &mut TxSession,
        idempotency_key: &str,
        kind: OutboxKind,
        payload: &[u8],
    ) -> Result<(), OutboxError> {
        if kind == OutboxKind::Undefined {
            return Err(OutboxError::UnsupportedKind(kind));
        }
        let state = self.state.lock().unwrap();
        if state.rows.iter().any(|row| row.key == idempotency_key) {
            return Ok(());
        }
        drop(state);
        self.seed(idempotency_key, kind, payload.to_vec());
        Ok(())
    }

    async fn lease(
        &self,
        _session: &mut TxSession,
        batch_size: usize,
        in_progress_ttl: Duration,
    ) -> Result<Vec<OutboxMessage>, OutboxError> {
        if self.fail_every_other_lease
            && self.lease_counter.fetch_add(1, Ordering::SeqCst) % 2 == 1
        {
            return Err(OutboxError::Store {
                message: "injected lease failure".to_string(),
            });
        }

        let now = Instant::now();
        let mut state = self.state.lock().unwrap();
        state.lease_calls += 1;

        let mut leased = Vec::new();
        for row in state.rows.iter_mut() {
            if leased.len() >= batch_size {
                break;
            }
            let expired = row
                .in_progress_at
                .map_or(true, |at| now.duration_since(at) > in_progress_ttl);
            if row.processed || !expired {
                continue;
            }
            row.in_progress_at = Some(now);
            row.attempts += 1;
            leased.push(OutboxMessage {
                idempotency_key: row.key.clone(),
                kind: row.kind,
                payload: row.payload.clone(),
                attempts: row.attempts,
            });
        }

        Ok(leased)
    }

    async fn acknowledge(
        &self,
        _session: &mut TxSession,
        idempotency_keys: &[String],
    ) -> Result<(), OutboxError> {
        if idempotency_keys.is_empty() {
            return Ok(());
        }
        if self.fail_every_other_ack && self.ack_counter.fetch_add(1, Ordering::SeqCst) % 2 == 1 {
            return Err(OutboxError::Store {
                message: "injected acknowledge failure".to_string(),
            });
        }

        let mut state = self.state.lock().unwrap();
        for key in idempotency_keys {
            if let Some(row) = state.rows.iter_mut().find(|row| &row.key == key) {
                if !row.processed {
                    row.processed = true;
                    row.ack_transitions += 1;
                }
            }
        }
        Ok(())
    }
}

#[derive(Default)]
struct RecordingHandler {
    seen: Mutex<Vec<Vec<u8>>>,
    calls: AtomicUsize,
    failures: AtomicUsize,
    fail_on_empty: bool,
    delay: Option<Duration>,
}

impl RecordingHandler {
    fn failing_on_empty() -> Self {
        Self {
            fail_on_empty: true,
            ..Self::default()
        }
    }

    fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    fn distinct_seen(&self) -> Vec<Vec<u8>> {
        let mut seen = self.seen.lock().unwrap().clone();
        seen.sort();
        seen.dedup();
        seen
    }
}

#[async_trait]
impl KindHandler for RecordingHandler {
    async fn handle(&self, payload: &[u8]) -> Result<(), HandlerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_on_empty && payload.is_empty() {
            self.failures.fetch_add(1, Ordering::SeqCst);
            return Err(HandlerError::Sink {
                message: "empty payload".to_string(),
            });
        }
        self.seen.lock().unwrap().push(payload.to_vec());
        Ok(())
    }
}

struct TestRegistry {
    book: Arc<RecordingHandler>,
    author: Arc<RecordingHandler>,
}

impl HandlerRegistry for TestRegistry {
    fn resolve(&self, kind: OutboxKind) -> Result<Arc<dyn KindHandler>, OutboxError> {
        match kind {
            OutboxKind::Book => Ok(self.book.clone()),
            OutboxKind::Author => Ok(self.author.clone()),
            OutboxKind::Undefined => Err(OutboxError::UnsupportedKind(kind)),
        }
    }
}

struct Harness {
    store: Arc<FakeStore>,
    book: Arc<RecordingHandler>,
    dispatcher: OutboxDispatcher,
}

fn harness(settings: DispatcherSettings, store: FakeStore, book: RecordingHandler) -> Harness {
    let store = Arc::new(store);
    let book = Arc::new(book);
    let registry = Arc::new(TestRegistry {
        book: book.clone(),
        author: Arc::new(RecordingHandler::default()),
    });
    let dispatcher = OutboxDispatcher::new(
        Arc::new(DetachedTransactor),
        store.clone(),
        registry,
        settings,
    );
    Harness {
        store,
        book,
        dispatcher,
    }
}

fn settings(workers: usize, batch_size: usize) -> DispatcherSettings {
    DispatcherSettings {
        enabled: true,
        workers,
        batch_size,
        wait_time: Duration::from_millis(1),
        in_progress_ttl: Duration::from_millis(1),
    }
}

async fn wait_until(timeout: Duration, mut pred: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if pred() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    pred()
}

#[tokio::test]
async fn delivers_every_event_exactly_once_with_one_worker() {
    let store = FakeStore::default();
    for i in 0..10u8 {
        store.seed(&i.to_string(), OutboxKind::Book, vec![i]);
    }
    let h = harness(settings(1, 1), store, RecordingHandler::default());

    let shutdown = CancellationToken::new();
    let dispatcher = h.dispatcher.clone();
    let token = shutdown.clone();
    let running = tokio::spawn(async move { dispatcher.start(token).await });

    let store = h.store.clone();
    assert!(wait_until(Duration::from_secs(1), move || store.all_processed()).await);
    shutdown.cancel();
    running.await.unwrap();

    assert_eq!(h.store.processed_keys().len(), 10);
    assert_eq!(h.store.max_ack_transitions(), 1);

    let seen = h.book.distinct_seen();
    assert_eq!(seen, (0..10u8).map(|i| vec![i]).collect::<Vec<_>>());
    assert_eq!(h.book.calls.load(Ordering::SeqCst), 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn many_workers_drain_large_batches_without_loss() {
    let store = FakeStore::default();
    for i in 0..100u8 {
        store.seed(&format!("key-{i}"), OutboxKind::Book, vec![i]);
    }
    let mut cfg = settings(10, 5);
    // Wide enough that an in-flight batch is never re-leased mid-run.
    cfg.in_progress_ttl = Duration::from_millis(250);
    let h = harness(cfg, store, RecordingHandler::default());

    let shutdown = CancellationToken::new();
    let dispatcher = h.dispatcher.clone();
    let token = shutdown.clone();
    let running = tokio::spawn(async move { dispatcher.start(token).await });

    let store = h.store.clone();
    assert!(wait_until(Duration::from_secs(1), move || store.all_processed()).await);
    shutdown.cancel();
    running.await.unwrap();

    assert_eq!(h.store.processed_keys().len(), 100);
    assert_eq!(h.store.max_ack_transitions(), 1);
    assert_eq!(h.book.distinct_seen().len(), 100);
}

#[tokio::test]
async fn flaky_store_still_completes_via_lease_expiry() {
    let store = FakeStore::flaky();
    for i in 0..10u8 {
        store.seed(&i.to_string(), OutboxKind::Book, vec![i]);
    }
    let h = harness(settings(1, 2), store, RecordingHandler::default());

    let shutdown = CancellationToken::new();
    let dispatcher = h.dispatcher.clone();
    let token = shutdown.clone();
    let running = tokio::spawn(async move { dispatcher.start(token).await });

    let store = h.store.clone();
    assert!(wait_until(Duration::from_secs(1), move || store.all_processed()).await);
    shutdown.cancel();
    running.await.unwrap();

    // A failed acknowledge replays its records, so handlers may fire more
    // than once, but every payload arrives and no row is acked twice.
    assert_eq!(h.book.distinct_seen().len(), 10);
    assert_eq!(h.store.max_ack_transitions(), 1);
}

#[tokio::test]
async fn poison_kind_is_re_leased_without_blocking_the_batch() {
    let store = FakeStore::default();
    for i in 0..3u8 {
        store.seed(&i.to_string(), OutboxKind::Book, vec![i]);
    }
    store.seed("poison", OutboxKind::Undefined, vec![0]);

    let mut cfg = settings(1, 4);
    cfg.in_progress_ttl = Duration::from_millis(5);
    let h = harness(cfg, store, RecordingHandler::default());

    let shutdown = CancellationToken::new();
    let dispatcher = h.dispatcher.clone();
    let token = shutdown.clone();
    let running = tokio::spawn(async move { dispatcher.start(token).await });

    let store = h.store.clone();
    assert!(
        wait_until(Duration::from_secs(1), move || {
            store.processed_keys().len() == 3 && store.attempts_of("poison") > 1
        })
        .await
    );
    shutdown.cancel();
    running.await.unwrap();

    // The healthy records in the same batch were acknowledged; the poison
    // record keeps being re-leased and never completes.
    assert!(!h.store.processed_keys().contains(&"poison".to_string()));
    assert!(h.store.attempts_of("poison") > 1);
    assert_eq!(h.book.distinct_seen().len(), 3);
}

#[tokio::test]
async fn poison_payload_is_reinvoked_after_ttl_and_never_acked() {
    let store = FakeStore::default();
    store.seed("healthy-0", OutboxKind::Book, vec![7]);
    store.seed("poison", OutboxKind::Book, Vec::new());
    store.seed("healthy-1", OutboxKind::Book, vec![9]);

    let mut cfg = settings(1, 3);
    cfg.in_progress_ttl = Duration::from_millis(5);
    let h = harness(cfg, store, RecordingHandler::failing_on_empty());

    let shutdown = CancellationToken::new();
    let dispatcher = h.dispatcher.clone();
    let token = shutdown.clone();
    let running = tokio::spawn(async move { dispatcher.start(token).await });

    let book = h.book.clone();
    let store = h.store.clone();
    assert!(
        wait_until(Duration::from_secs(1), move || {
            store.processed_keys().len() == 2 && book.failures.load(Ordering::SeqCst) >= 2
        })
        .await
    );
    shutdown.cancel();
    running.await.unwrap();

    assert!(!h.store.processed_keys().contains(&"poison".to_string()));
    assert!(h.book.failures.load(Ordering::SeqCst) >= 2);
    assert_eq!(h.book.distinct_seen(), vec![vec![7], vec![9]]);
}

#[tokio::test]
async fn disabled_dispatcher_returns_immediately() {
    let store = FakeStore::default();
    store.seed("pending", OutboxKind::Book, vec![1]);

    let mut cfg = settings(1, 1);
    cfg.enabled = false;
    let h = harness(cfg, store, RecordingHandler::default());

    tokio::time::timeout(Duration::from_millis(50), h.dispatcher.start(CancellationToken::new()))
        .await
        .expect("disabled dispatcher must return immediately");

    assert_eq!(h.store.lease_calls(), 0);
    assert_eq!(h.book.calls.load(Ordering::SeqCst), 0);
    assert!(h.store.processed_keys().is_empty());
}

#[tokio::test]
async fn cancellation_aborts_midhandler_and_stops_leasing() {
    let store = FakeStore::default();
    for i in 0..5u8 {
        store.seed(&i.to_string(), OutboxKind::Book, vec![i]);
    }

    let mut cfg = settings(1, 1);
    cfg.in_progress_ttl = Duration::from_secs(1);
    let h = harness(cfg, store, RecordingHandler::slow(Duration::from_millis(50)));

    let shutdown = CancellationToken::new();
    let dispatcher = h.dispatcher.clone();
    let token = shutdown.clone();
    let running = tokio::spawn(async move { dispatcher.start(token).await });

    let book = h.book.clone();
    assert!(
        wait_until(Duration::from_secs(1), move || {
            book.calls.load(Ordering::SeqCst) >= 1
        })
        .await
    );
    shutdown.cancel();

    tokio::time::timeout(Duration::from_millis(200), running)
        .await
        .expect("worker must exit within one handler delay")
        .unwrap();

    let leases_at_shutdown = h.store.lease_calls();
    let calls_at_shutdown = h.book.calls.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(150)).await;

    assert_eq!(h.store.lease_calls(), leases_at_shutdown);
    assert_eq!(h.book.calls.load(Ordering::SeqCst), calls_at_shutdown);
    // Leased-but-unacked records stay pending and recover through the TTL.
    assert!(h.store.processed_keys().len() < 5);
}

#[tokio::test]
async fn abandoned_leases_recover_after_ttl() {
    let store = FakeStore::default();
    for i in 0..4u8 {
        store.seed(&i.to_string(), OutboxKind::Book, vec![i]);
    }

    // A leaser that dies without acknowledging: lease directly, then
    // start the dispatcher and watch the batch come back.
    let mut session = TxSession::detached();
    let abandoned = store
        .lease(&mut session, 4, Duration::from_millis(20))
        .await
        .unwrap();
    assert_eq!(abandoned.len(), 4);

    let mut cfg = settings(1, 2);
    cfg.in_progress_ttl = Duration::from_millis(20);
    let h = harness(cfg, store, RecordingHandler::default());

    let shutdown = CancellationToken::new();
    let dispatcher = h.dispatcher.clone();
    let token = shutdown.clone();
    let running = tokio::spawn(async move { dispatcher.start(token).await });

    let store = h.store.clone();
    assert!(wait_until(Duration::from_secs(1), move || store.all_processed()).await);
    shutdown.cancel();
    running.await.unwrap();

    assert!(h.store.processed_keys().len() == 4);
    assert!((0..4).all(|i| h.store.attempts_of(&i.to_string()) >= 2));
}
