//! Tracked fire-and-forget tasks.
//!
//! Every notification send runs as its own tokio task registered here, so
//! shutdown can cancel and await whatever is still in flight. A task leaves
//! the set as soon as it finishes, fails, or is cancelled.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

enum Slot {
    /// Reserved; the handle is being registered.
    Spawning,
    Running(JoinHandle<()>),
}

#[derive(Default)]
struct Slots {
    map: HashMap<u64, Slot>,
    /// Set by `cancel_all`; no new task is accepted afterwards.
    closed: bool,
}

#[derive(Default)]
struct Inner {
    next_id: AtomicU64,
    slots: Mutex<Slots>,
}

/// Set of unfinished background tasks. Clones share the same set.
#[derive(Clone, Default)]
pub struct TaskSet {
    inner: Arc<Inner>,
}

/// Removes its task's slot when the task's future is dropped, which covers
/// completion, panics and cancellation alike.
struct SlotGuard {
    id: u64,
    inner: Weak<Inner>,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.slots.lock().map.remove(&self.id);
        }
    }
}

impl TaskSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `fut` on the current runtime and track it. Returns `false` if
    /// there is no runtime to spawn on or the set was already cancelled.
    pub fn spawn<F>(&self, label: &str, fut: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("No async runtime; dropping task {label}");
            return false;
        };

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        {
            let mut slots = self.inner.slots.lock();
            if slots.closed {
                debug!("Task set closed; dropping task {label}");
                return false;
            }
            slots.map.insert(id, Slot::Spawning);
        }

        let guard = SlotGuard {
            id,
            inner: Arc::downgrade(&self.inner),
        };
        let handle = runtime.spawn(async move {
            let _guard = guard;
            fut.await;
        });

        // `cancel_all` never drops a reserved slot, so a missing one means
        // the task already finished and removed itself.
        if let Some(slot) = self.inner.slots.lock().map.get_mut(&id) {
            *slot = Slot::Running(handle);
        }
        debug!("Spawned task {label} (#{id})");
        true
    }

    /// Number of unfinished tasks.
    pub fn len(&self) -> usize {
        self.inner.slots.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Abort every tracked task and wait for each to finish, then refuse any
    /// further spawns. Cancellation counts as a normal outcome; other
    /// failures are logged. Returns how many tasks were awaited.
    pub async fn cancel_all(&self) -> usize {
        let mut total = 0;
        let mut failures = 0;
        loop {
            let (handles, registering) = {
                let mut slots = self.inner.slots.lock();
                slots.closed = true;
                let running: Vec<u64> = slots
                    .map
                    .iter()
                    .filter(|(_, slot)| matches!(slot, Slot::Running(_)))
                    .map(|(id, _)| *id)
                    .collect();
                let handles: Vec<JoinHandle<()>> = running
                    .into_iter()
                    .filter_map(|id| match slots.map.remove(&id) {
                        Some(Slot::Running(handle)) => Some(handle),
                        _ => None,
                    })
                    .collect();
                (handles, slots.map.len())
            };

            if handles.is_empty() {
                if registering == 0 {
                    break;
                }
                // A spawn is between reserving its slot and storing its handle.
                tokio::task::yield_now().await;
                continue;
            }

            for handle in &handles {
                handle.abort();
            }
            total += handles.len();
            for handle in handles {
                match handle.await {
                    Ok(()) => {}
                    Err(e) if e.is_cancelled() => {}
                    Err(e) => {
                        failures += 1;
                        debug!("Task failed during shutdown: {e}");
                    }
                }
            }
        }

        if total > 0 {
            debug!("Cancelled {total} pending task(s), {failures} failed");
        }
        total
    }

    /// Forget every tracked task without aborting it.
    pub fn clear(&self) {
        self.inner.slots.lock().map.clear();
    }
}
