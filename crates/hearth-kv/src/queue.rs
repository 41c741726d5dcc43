//! # Write Queue
//!
//! Serializes persistence per key so the last action issued is the last
//! write applied.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Per-Key Write Serialization                          │
//! │                                                                         │
//! │  store action ──► enqueue_set("localNotifications", json)               │
//! │                        │                                                │
//! │                        ▼                                                │
//! │  ┌──────────────────────────────────────┐                               │
//! │  │ workers: key ──► mpsc::UnboundedSender│  (spawned on first write)    │
//! │  └───────────────────┬──────────────────┘                               │
//! │                      │ WriteOp { value, acks: Vec<oneshot::Sender> }     │
//! │                      ▼                                                  │
//! │  worker task: while let Some(op) = rx.recv() { store.set(..).await }    │
//! │                      │                                                  │
//! │                      ▼                                                  │
//! │  PersistHandle (oneshot::Receiver) resolves to KvResult<()>             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Dropping a [`PersistHandle`] does not cancel its write.
//!
//! ## Holding a Key
//! A store holds its keys until it has read them. Writes issued during the
//! hold are parked, not applied; [`WriteQueue::release`] then writes the
//! merged value once and resolves every parked handle with that result.
//! ```text
//! hold(k) ─► enqueue(k, v1) ─► enqueue(k, v2)    parked, disk untouched
//!         ─► load(k) ─► merge ─► release(k, v*)  one write, both handles
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::error::{KvError, KvResult};
use crate::store::KvStore;

// =============================================================================
// Operations
// =============================================================================

enum WriteOp {
    Set {
        value: String,
        acks: Vec<oneshot::Sender<KvResult<()>>>,
    },
    Remove {
        ack: oneshot::Sender<KvResult<()>>,
    },
    /// Resolves once every earlier op for the key has been applied.
    Barrier { ack: oneshot::Sender<KvResult<()>> },
}

// =============================================================================
// Persist Handle
// =============================================================================

/// Awaitable completion of one queued write.
#[must_use = "await the handle to observe the write result, or drop it to fire and forget"]
#[derive(Debug)]
pub struct PersistHandle {
    inner: HandleState,
}

#[derive(Debug)]
enum HandleState {
    Pending {
        key: String,
        rx: oneshot::Receiver<KvResult<()>>,
    },
    Done {
        result: Option<KvResult<()>>,
        skipped: bool,
    },
}

impl PersistHandle {
    /// A handle that already holds its result.
    pub fn ready(result: KvResult<()>) -> Self {
        PersistHandle {
            inner: HandleState::Done {
                result: Some(result),
                skipped: false,
            },
        }
    }

    /// A handle for an action that changed nothing and wrote nothing.
    pub fn skipped() -> Self {
        PersistHandle {
            inner: HandleState::Done {
                result: Some(Ok(())),
                skipped: true,
            },
        }
    }

    /// True when no write was enqueued for this action.
    pub fn is_skipped(&self) -> bool {
        matches!(self.inner, HandleState::Done { skipped: true, .. })
    }

    fn pending(key: &str, rx: oneshot::Receiver<KvResult<()>>) -> Self {
        PersistHandle {
            inner: HandleState::Pending {
                key: key.to_string(),
                rx,
            },
        }
    }
}

impl Future for PersistHandle {
    type Output = KvResult<()>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match &mut this.inner {
            HandleState::Pending { key, rx } => match Pin::new(rx).poll(cx) {
                Poll::Ready(Ok(result)) => Poll::Ready(result),
                Poll::Ready(Err(_)) => Poll::Ready(Err(KvError::WorkerStopped(key.clone()))),
                Poll::Pending => Poll::Pending,
            },
            HandleState::Done { result, .. } => {
                Poll::Ready(result.take().unwrap_or(Ok(())))
            }
        }
    }
}

// =============================================================================
// Write Queue
// =============================================================================

/// One FIFO worker per key over a shared [`KvStore`].
pub struct WriteQueue {
    store: Arc<dyn KvStore>,
    workers: Mutex<HashMap<String, mpsc::UnboundedSender<WriteOp>>>,
    /// Held keys and the acks of writes parked on them.
    held: Mutex<HashMap<String, Vec<oneshot::Sender<KvResult<()>>>>>,
}

impl WriteQueue {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        WriteQueue {
            store,
            workers: Mutex::new(HashMap::new()),
            held: Mutex::new(HashMap::new()),
        }
    }

    /// Queues a raw string write.
    pub fn enqueue_set(&self, key: &str, value: String) -> PersistHandle {
        if let Some(parked) = self.park(key) {
            return parked;
        }
        let (ack, rx) = oneshot::channel();
        match self.submit(key, WriteOp::Set { value, acks: vec![ack] }) {
            Ok(()) => PersistHandle::pending(key, rx),
            Err(e) => PersistHandle::ready(Err(e)),
        }
    }

    /// Serializes `value` now and queues the write.
    ///
    /// Serializing at enqueue time captures the state the action produced,
    /// not whatever the state is by the time the worker runs.
    pub fn enqueue_json<T>(&self, key: &str, value: &T) -> PersistHandle
    where
        T: Serialize + ?Sized,
    {
        match serde_json::to_string(value) {
            Ok(raw) => self.enqueue_set(key, raw),
            Err(e) => {
                warn!(key, error = %e, "Failed to serialize value for persistence");
                PersistHandle::ready(Err(e.into()))
            }
        }
    }

    pub fn enqueue_remove(&self, key: &str) -> PersistHandle {
        if let Some(parked) = self.park(key) {
            return parked;
        }
        let (ack, rx) = oneshot::channel();
        match self.submit(key, WriteOp::Remove { ack }) {
            Ok(()) => PersistHandle::pending(key, rx),
            Err(e) => PersistHandle::ready(Err(e)),
        }
    }

    /// Parks writes to `key` until [`WriteQueue::release`]. Holding a held
    /// key again is a no-op.
    pub fn hold(&self, key: &str) {
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key.to_string())
            .or_default();
    }

    pub fn is_held(&self, key: &str) -> bool {
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    /// True when writes are waiting on a held key.
    pub fn has_parked(&self, key: &str) -> bool {
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .is_some_and(|acks| !acks.is_empty())
    }

    /// Ends the hold on `key`.
    ///
    /// With parked writes, `value` is written once and every parked handle
    /// resolves to that write's result. With none, nothing is written and
    /// the returned handle is skipped.
    pub fn release(&self, key: &str, value: String) -> PersistHandle {
        let mut acks = self
            .held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
            .unwrap_or_default();
        if acks.is_empty() {
            return PersistHandle::skipped();
        }

        debug!(key, parked = acks.len(), "Releasing held key");
        let (ack, rx) = oneshot::channel();
        acks.push(ack);
        // On failure the acks drop with the op and parked handles report it
        match self.submit(key, WriteOp::Set { value, acks }) {
            Ok(()) => PersistHandle::pending(key, rx),
            Err(e) => PersistHandle::ready(Err(e)),
        }
    }

    /// [`WriteQueue::release`] with a JSON value.
    pub fn release_json<T>(&self, key: &str, value: &T) -> PersistHandle
    where
        T: Serialize + ?Sized,
    {
        match serde_json::to_string(value) {
            Ok(raw) => self.release(key, raw),
            Err(e) => {
                warn!(key, error = %e, "Failed to serialize value for persistence");
                let err = KvError::from(e);
                let acks = self
                    .held
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .remove(key)
                    .unwrap_or_default();
                for ack in acks {
                    let _ = ack.send(Err(err.clone()));
                }
                PersistHandle::ready(Err(err))
            }
        }
    }

    /// Waits until every write queued for `key` before this call has been
    /// applied. Parked writes are not waited for.
    pub async fn flush_key(&self, key: &str) -> KvResult<()> {
        let running = self
            .workers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key);
        if !running {
            return Ok(());
        }

        let (ack, rx) = oneshot::channel();
        self.submit(key, WriteOp::Barrier { ack })?;
        PersistHandle::pending(key, rx).await
    }

    /// Reads `key` after its queued writes have landed.
    pub async fn load(&self, key: &str) -> KvResult<Option<String>> {
        self.flush_key(key).await?;
        self.store.get(key).await
    }

    /// Waits until every write queued before this call has been applied.
    /// Parked writes are not waited for.
    ///
    /// Returns the first worker failure, if any.
    pub async fn flush(&self) -> KvResult<()> {
        let keys: Vec<String> = self
            .workers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();

        let mut barriers = Vec::with_capacity(keys.len());
        for key in &keys {
            let (ack, rx) = oneshot::channel();
            self.submit(key, WriteOp::Barrier { ack })?;
            barriers.push(PersistHandle::pending(key, rx));
        }

        for barrier in barriers {
            barrier.await?;
        }
        Ok(())
    }

    fn park(&self, key: &str) -> Option<PersistHandle> {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        let acks = held.get_mut(key)?;
        let (ack, rx) = oneshot::channel();
        acks.push(ack);
        Some(PersistHandle::pending(key, rx))
    }

    fn submit(&self, key: &str, op: WriteOp) -> KvResult<()> {
        let mut workers = self.workers.lock().unwrap_or_else(PoisonError::into_inner);

        let op = match workers.get(key) {
            Some(tx) => match tx.send(op) {
                Ok(()) => return Ok(()),
                // Worker is gone; respawn below with the same op
                Err(mpsc::error::SendError(op)) => op,
            },
            None => op,
        };

        let runtime = Handle::try_current().map_err(|_| KvError::NoRuntime)?;
        let (tx, rx) = mpsc::unbounded_channel();
        runtime.spawn(run_worker(key.to_string(), self.store.clone(), rx));
        debug!(key, "Started write worker");

        tx.send(op)
            .map_err(|_| KvError::WorkerStopped(key.to_string()))?;
        workers.insert(key.to_string(), tx);
        Ok(())
    }
}

impl std::fmt::Debug for WriteQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let workers = self
            .workers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        let held = self.held.lock().unwrap_or_else(PoisonError::into_inner).len();
        f.debug_struct("WriteQueue")
            .field("workers", &workers)
            .field("held", &held)
            .finish()
    }
}

async fn run_worker(
    key: String,
    store: Arc<dyn KvStore>,
    mut rx: mpsc::UnboundedReceiver<WriteOp>,
) {
    while let Some(op) = rx.recv().await {
        match op {
            WriteOp::Set { value, acks } => {
                let result = store.set(&key, &value).await;
                if let Err(e) = &result {
                    warn!(key = %key, error = %e, "Persist write failed");
                }
                // Receivers may have been dropped (fire and forget)
                for ack in acks {
                    let _ = ack.send(result.clone());
                }
            }
            WriteOp::Remove { ack } => {
                let result = store.remove(&key).await;
                if let Err(e) = &result {
                    warn!(key = %key, error = %e, "Persist remove failed");
                }
                let _ = ack.send(result);
            }
            WriteOp::Barrier { ack } => {
                let _ = ack.send(Ok(()));
            }
        }
    }
    debug!(key = %key, "Write worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryKvStore;
    use async_trait::async_trait;
    use std::time::Duration;

    /// Records the order in which writes land; a value of "slow" sleeps first.
    #[derive(Default)]
    struct RecordingStore {
        applied: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl KvStore for RecordingStore {
        async fn get(&self, _key: &str) -> KvResult<Option<String>> {
            Ok(self.applied.lock().unwrap().last().cloned())
        }

        async fn set(&self, _key: &str, value: &str) -> KvResult<()> {
            if value == "slow" {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            self.applied.lock().unwrap().push(value.to_string());
            Ok(())
        }

        async fn remove(&self, _key: &str) -> KvResult<()> {
            self.applied.lock().unwrap().push("<removed>".to_string());
            Ok(())
        }

        async fn keys(&self) -> KvResult<Vec<String>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_writes_to_one_key_apply_in_issue_order() {
        let store = Arc::new(RecordingStore::default());
        let queue = WriteQueue::new(store.clone());

        let first = queue.enqueue_set("theme", "slow".to_string());
        let second = queue.enqueue_set("theme", "fast".to_string());
        let third = queue.enqueue_remove("theme");

        second.await.unwrap();
        first.await.unwrap();
        third.await.unwrap();

        let applied = store.applied.lock().unwrap().clone();
        assert_eq!(applied, vec!["slow", "fast", "<removed>"]);
    }

    #[tokio::test]
    async fn test_last_write_wins_with_dropped_handles() {
        let store = Arc::new(MemoryKvStore::new());
        let queue = WriteQueue::new(store.clone());

        for i in 0..50 {
            drop(queue.enqueue_json("counter", &i));
        }
        queue.flush().await.unwrap();

        assert_eq!(store.raw("counter").as_deref(), Some("49"));
    }

    #[tokio::test]
    async fn test_failed_write_is_reported() {
        let store = Arc::new(MemoryKvStore::new());
        store.fail_writes(true);
        let queue = WriteQueue::new(store.clone());

        let result = queue.enqueue_set("k", "v".to_string()).await;
        assert!(matches!(result, Err(KvError::Storage(_))));

        store.fail_writes(false);
        queue.enqueue_set("k", "v".to_string()).await.unwrap();
        assert_eq!(store.raw("k").as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn test_held_key_parks_until_release() {
        let recording = Arc::new(RecordingStore::default());
        let queue = WriteQueue::new(recording.clone());
        queue.hold("k");

        let first = queue.enqueue_set("k", "early-1".to_string());
        let second = queue.enqueue_remove("k");
        assert!(queue.has_parked("k"));
        queue.flush().await.unwrap();
        assert!(recording.applied.lock().unwrap().is_empty());

        let released = queue.release("k", "merged".to_string());
        released.await.unwrap();
        first.await.unwrap();
        second.await.unwrap();
        assert_eq!(*recording.applied.lock().unwrap(), vec!["merged".to_string()]);
        assert!(!queue.is_held("k"));

        // After release writes go straight through
        queue.enqueue_set("k", "later".to_string()).await.unwrap();
        assert_eq!(recording.applied.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_release_without_parked_writes_skips() {
        let recording = Arc::new(RecordingStore::default());
        let queue = WriteQueue::new(recording.clone());
        queue.hold("k");

        let released = queue.release_json("k", &vec![1, 2]);
        assert!(released.is_skipped());
        queue.flush().await.unwrap();
        assert!(recording.applied.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_load_waits_for_queued_writes() {
        let recording = Arc::new(RecordingStore::default());
        let queue = WriteQueue::new(recording.clone());

        let _ = queue.enqueue_set("k", "slow".to_string());
        assert_eq!(queue.load("k").await.unwrap().as_deref(), Some("slow"));
        // Nothing queued for this key, so nothing to wait for
        queue.flush_key("other").await.unwrap();
    }

    #[tokio::test]
    async fn test_skipped_handle() {
        let handle = PersistHandle::skipped();
        assert!(handle.is_skipped());
        handle.await.unwrap();
    }

    #[test]
    fn test_enqueue_outside_runtime() {
        let queue = WriteQueue::new(Arc::new(MemoryKvStore::new()));
        let handle = queue.enqueue_set("k", "v".to_string());

        let runtime = tokio::runtime::Runtime::new().unwrap();
        let result = runtime.block_on(handle);
        assert!(matches!(result, Err(KvError::NoRuntime)));
    }
}
