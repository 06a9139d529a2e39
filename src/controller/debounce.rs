//! Latest-value debouncing and request generations

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::task::JoinHandle;

/// Monotonic counter used to drop responses to superseded requests.
///
/// A request takes a ticket with [`Generation::advance`] when it is issued and
/// checks [`Generation::is_current`] when its response arrives.
#[derive(Debug, Default)]
pub struct Generation(AtomicU64);

impl Generation {
    pub fn advance(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    pub fn is_current(&self, ticket: u64) -> bool {
        self.current() == ticket
    }
}

/// Send function of a debouncer; resolves to `true` when the value reached the server
pub type SendFn<T> = Arc<dyn Fn(T) -> BoxFuture<'static, bool> + Send + Sync>;

struct DebounceSlot<T> {
    seq: u64,
    pending: Option<JoinHandle<()>>,
    last_sent: Option<T>,
}

/// Coalesces bursts of values: each `schedule` cancels the previous timer and
/// only the last value of a quiet `window` is sent.
pub struct LatestValueDebouncer<T> {
    window: Duration,
    send: SendFn<T>,
    dedupe: bool,
    slot: Arc<Mutex<DebounceSlot<T>>>,
}

fn lock<T>(slot: &Mutex<DebounceSlot<T>>) -> MutexGuard<'_, DebounceSlot<T>> {
    slot.lock().unwrap_or_else(|e| e.into_inner())
}

impl<T> LatestValueDebouncer<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    pub fn new<F>(window: Duration, send: F) -> Self
    where
        F: Fn(T) -> BoxFuture<'static, bool> + Send + Sync + 'static,
    {
        Self {
            window,
            send: Arc::new(send),
            dedupe: false,
            slot: Arc::new(Mutex::new(DebounceSlot {
                seq: 0,
                pending: None,
                last_sent: None,
            })),
        }
    }

    /// Skip sends whose value equals the last value that reached the server
    pub fn deduplicated(mut self) -> Self {
        self.dedupe = true;
        self
    }

    pub fn schedule(&self, value: T) {
        let mut slot = lock(&self.slot);
        if let Some(previous) = slot.pending.take() {
            previous.abort();
        }
        slot.seq += 1;
        let seq = slot.seq;

        let shared = Arc::clone(&self.slot);
        let send = Arc::clone(&self.send);
        let window = self.window;
        let dedupe = self.dedupe;

        slot.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(window).await;
            {
                let mut slot = lock(&shared);
                if slot.seq != seq {
                    return;
                }
                slot.pending = None;
                if dedupe && slot.last_sent.as_ref() == Some(&value) {
                    tracing::trace!("Debounced value unchanged, skipping send");
                    return;
                }
            }
            if send(value.clone()).await {
                lock(&shared).last_sent = Some(value);
            }
        }));
    }

    /// Drop the pending value, if any; a send already under way is not affected
    pub fn cancel(&self) {
        let mut slot = lock(&self.slot);
        slot.seq += 1;
        if let Some(pending) = slot.pending.take() {
            pending.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        lock(&self.slot)
            .pending
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Record a value known to be on the server already (dedupe baseline)
    pub fn mark_sent(&self, value: T) {
        lock(&self.slot).last_sent = Some(value);
    }
}

impl<T> Drop for LatestValueDebouncer<T> {
    fn drop(&mut self) {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(pending) = slot.pending.take() {
            pending.abort();
        }
    }
}
