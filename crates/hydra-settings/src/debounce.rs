//! Cancellable per-key scheduled tasks.
//!
//! Scheduling a key aborts the task already pending for that key before
//! arming a new one, so at most one task per key is ever outstanding.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::error::{Error, Result};

struct Pending {
    generation: u64,
    handle: JoinHandle<()>,
}

/// Trailing-edge debouncer keyed by `K`.
pub struct Debouncer<K> {
    delay: Duration,
    runtime: Handle,
    state: Arc<Mutex<State<K>>>,
}

struct State<K> {
    next_generation: u64,
    pending: HashMap<K, Pending>,
}

impl<K> Debouncer<K>
where
    K: Eq + Hash + Clone + Send + 'static,
{
    /// Create a debouncer bound to the current tokio runtime.
    pub fn new(delay: Duration) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|error| {
            Error::Runtime(format!("debouncer requires a tokio runtime: {error}"))
        })?;
        Ok(Self {
            delay,
            runtime,
            state: Arc::new(Mutex::new(State {
                next_generation: 0,
                pending: HashMap::new(),
            })),
        })
    }

    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `task` after the quiet period unless `key` is scheduled again first.
    pub fn schedule<F>(&self, key: K, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.next_generation += 1;
        let generation = state.next_generation;

        let delay = self.delay;
        let shared = Arc::downgrade(&self.state);
        let task_key = key.clone();
        let handle = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(shared) = shared.upgrade() else {
                return;
            };
            {
                let mut state = shared.lock().unwrap_or_else(PoisonError::into_inner);
                match state.pending.get(&task_key) {
                    Some(pending) if pending.generation == generation => {
                        state.pending.remove(&task_key);
                    }
                    _ => return,
                }
            }
            task.await;
        });

        if let Some(previous) = state.pending.insert(key, Pending { generation, handle }) {
            previous.handle.abort();
        }
    }

    /// Cancel the task pending for `key`. Returns whether one was pending.
    pub fn cancel(&self, key: &K) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.pending.remove(key).is_some_and(|pending| {
            pending.handle.abort();
            true
        })
    }

    /// Cancel every pending task, returning the keys that were pending.
    pub fn cancel_all(&self) -> Vec<K> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state
            .pending
            .drain()
            .map(|(key, pending)| {
                pending.handle.abort();
                key
            })
            .collect()
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pending
            .contains_key(key)
    }

    pub fn pending_count(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pending
            .len()
    }
}

impl<K> Drop for Debouncer<K> {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        for (_, pending) in state.pending.drain() {
            pending.handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn settle(duration: Duration) {
        tokio::time::sleep(duration).await;
        tokio::task::yield_now().await;
    }

    #[tokio::test(start_paused = true)]
    async fn rescheduling_coalesces_into_one_run() {
        let debouncer = Debouncer::new(Duration::from_millis(500)).unwrap();
        let runs = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let counter = Arc::clone(&runs);
            debouncer.schedule("alice", async move {
                counter.fetch_add(1, Ordering::SeqCst);
            });
            settle(Duration::from_millis(200)).await;
        }
        assert_eq!(runs.load(Ordering::SeqCst), 0);

        settle(Duration::from_millis(600)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(!debouncer.is_pending(&"alice"));
    }

    #[tokio::test(start_paused = true)]
    async fn keys_are_independent() {
        let debouncer = Debouncer::new(Duration::from_millis(100)).unwrap();
        let runs = Arc::new(AtomicUsize::new(0));
        for key in ["alice", "bob"] {
            let counter = Arc::clone(&runs);
            debouncer.schedule(key, async move {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(debouncer.pending_count(), 2);

        settle(Duration::from_millis(150)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_all_prevents_runs() {
        let debouncer = Debouncer::new(Duration::from_millis(100)).unwrap();
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        debouncer.schedule((), async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(debouncer.cancel_all(), vec![()]);
        settle(Duration::from_millis(200)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert!(!debouncer.cancel(&()));
    }

    #[test]
    fn new_outside_runtime_fails() {
        assert!(matches!(
            Debouncer::<()>::new(Duration::from_millis(1)),
            Err(Error::Runtime(_))
        ));
    }
}
