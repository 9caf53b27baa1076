//! Single-flight lazy value with a bounded wait for concurrent callers.
//!
//! A [`LoadCell`] moves through `NotLoaded → Loading → Loaded`. The first
//! caller to find it `NotLoaded` claims it and runs the fetch; everyone who
//! arrives while it is `Loading` awaits a [`watch`] channel whose sender is
//! dropped once the fetch settles, on success, failure, or panic alike.
//!
//! Waiters give up after a ceiling. Giving up moves the cell back to
//! `NotLoaded` so the next caller starts a fresh fetch, but it never cancels
//! the fetch that is already running: that fetch owns its own task and may
//! still publish a value after the waiters have left. A generation counter
//! keeps such a late fetch from clobbering the state of a newer one.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{trace, warn};

/// Observable state of a [`LoadCell`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// Nothing fetched, nothing in flight.
    NotLoaded,
    /// A fetch is running.
    Loading,
    /// A value is published.
    Loaded,
}

enum Slot {
    NotLoaded,
    /// A fetch tagged `generation` is running. Waiters clone `done` and wait
    /// for the sender to drop.
    Loading {
        generation: u64,
        done: watch::Receiver<()>,
    },
    Loaded,
}

struct Inner<V> {
    slot: Slot,
    value: Option<V>,
    next_generation: u64,
}

enum Claim<V> {
    Ready(V),
    Fetch(LoadTicket<V>),
    Wait {
        generation: u64,
        done: watch::Receiver<()>,
    },
}

/// Proof that the holder owns the current fetch. Settling (or dropping) the
/// ticket wakes every waiter.
struct LoadTicket<V> {
    inner: Arc<Mutex<Inner<V>>>,
    generation: u64,
    settled: bool,
    _done: watch::Sender<()>,
}

impl<V> LoadTicket<V> {
    fn settle(mut self, value: Option<V>) {
        self.apply(value);
        self.settled = true;
    }

    fn apply(&self, value: Option<V>) {
        let mut inner = self.inner.lock();
        let owns_slot = match inner.slot {
            Slot::Loading { generation, .. } => generation == self.generation,
            Slot::NotLoaded => true,
            Slot::Loaded => false,
        };
        match value {
            Some(value) => {
                inner.value = Some(value);
                if owns_slot {
                    inner.slot = Slot::Loaded;
                }
            }
            None if owns_slot => inner.slot = Slot::NotLoaded,
            None => {}
        }
    }
}

impl<V> Drop for LoadTicket<V> {
    fn drop(&mut self) {
        if !self.settled {
            self.apply(None);
        }
    }
}

/// A lazily loaded value guarded by a single-flight state machine.
pub struct LoadCell<V> {
    inner: Arc<Mutex<Inner<V>>>,
}

impl<V> Default for LoadCell<V> {
    fn default() -> Self {
        Self::with_slot(Slot::NotLoaded, None)
    }
}

impl<V: Clone + Send + 'static> LoadCell<V> {
    /// A cell that starts out `Loaded` with `value`; it never fetches.
    #[must_use]
    pub fn loaded(value: V) -> Self {
        Self::with_slot(Slot::Loaded, Some(value))
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> LoadState {
        match self.inner.lock().slot {
            Slot::NotLoaded => LoadState::NotLoaded,
            Slot::Loading { .. } => LoadState::Loading,
            Slot::Loaded => LoadState::Loaded,
        }
    }

    /// Whatever is materialized right now, regardless of state.
    #[must_use]
    pub fn value(&self) -> Option<V> {
        self.inner.lock().value.clone()
    }

    /// Return the loaded value, running `fetch` if nobody has loaded it yet.
    ///
    /// - `Loaded`: returns the value without calling `fetch`.
    /// - `NotLoaded`: claims the cell and runs `fetch` on its own task. The
    ///   result is returned to this caller; only successes are stored.
    /// - `Loading`: waits up to `ceiling` for the running fetch, then returns
    ///   the materialized value, which is `None` if that fetch failed or is
    ///   still running.
    ///
    /// # Panics
    ///
    /// Re-raises a panic from `fetch` in the claiming caller.
    pub async fn get_or_load<F, Fut, E>(&self, ceiling: Duration, fetch: F) -> Result<Option<V>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
        E: Send + 'static,
    {
        match self.claim() {
            Claim::Ready(value) => Ok(Some(value)),
            Claim::Fetch(ticket) => {
                let generation = ticket.generation;
                trace!(generation, "fetch claimed");
                let fut = fetch();
                let task = tokio::spawn(async move {
                    let result = fut.await;
                    ticket.settle(result.as_ref().ok().cloned());
                    result
                });
                match task.await {
                    Ok(result) => result.map(Some),
                    Err(join) if join.is_panic() => std::panic::resume_unwind(join.into_panic()),
                    // Runtime shutting down.
                    Err(_) => Ok(self.value()),
                }
            }
            Claim::Wait {
                generation,
                mut done,
            } => {
                trace!(generation, "waiting for in-flight fetch");
                if tokio::time::timeout(ceiling, done.changed()).await.is_err() {
                    warn!(
                        generation,
                        ceiling_ms = ceiling.as_millis(),
                        "in-flight fetch exceeded wait ceiling, giving up"
                    );
                    self.abandon(generation);
                }
                Ok(self.value())
            }
        }
    }

    fn claim(&self) -> Claim<V> {
        let mut inner = self.inner.lock();
        match &inner.slot {
            Slot::Loaded => {
                if let Some(value) = &inner.value {
                    return Claim::Ready(value.clone());
                }
            }
            Slot::Loading { generation, done } => {
                return Claim::Wait {
                    generation: *generation,
                    done: done.clone(),
                };
            }
            Slot::NotLoaded => {}
        }

        let generation = inner.next_generation;
        inner.next_generation += 1;
        let (tx, rx) = watch::channel(());
        inner.slot = Slot::Loading {
            generation,
            done: rx,
        };
        Claim::Fetch(LoadTicket {
            inner: Arc::clone(&self.inner),
            generation,
            settled: false,
            _done: tx,
        })
    }

    /// `Loading → NotLoaded`, unless a newer fetch has taken over since.
    fn abandon(&self, generation: u64) {
        let mut inner = self.inner.lock();
        if let Slot::Loading { generation: current, .. } = inner.slot
            && current == generation
        {
            inner.slot = Slot::NotLoaded;
        }
    }
}

impl<V> LoadCell<V> {
    fn with_slot(slot: Slot, value: Option<V>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                slot,
                value,
                next_generation: 0,
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::sync::Notify;

    use super::*;

    const CEILING: Duration = Duration::from_secs(10);

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrent_callers_share_one_fetch() {
        let cell = Arc::new(LoadCell::<u32>::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(Notify::new());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cell = Arc::clone(&cell);
            let calls = Arc::clone(&calls);
            let gate = Arc::clone(&gate);
            handles.push(tokio::spawn(async move {
                cell.get_or_load(CEILING, move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    gate.notified().await;
                    Ok::<_, ()>(7)
                })
                .await
            }));
        }

        while cell.state() != LoadState::Loading {
            tokio::task::yield_now().await;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        gate.notify_one();

        for handle in handles {
            assert_eq!(handle.await.unwrap(), Ok(Some(7)));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1, "fetch must run exactly once");
        assert_eq!(cell.state(), LoadState::Loaded);
    }

    #[tokio::test]
    async fn loaded_cell_does_not_fetch() {
        let cell = LoadCell::loaded(3_u32);
        let got = cell
            .get_or_load(CEILING, || async { Err::<u32, _>("must not run") })
            .await;
        assert_eq!(got, Ok(Some(3)));
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let cell = LoadCell::<u32>::default();
        let first = cell.get_or_load(CEILING, || async { Err::<u32, _>("boom") }).await;
        assert_eq!(first, Err("boom"));
        assert_eq!(cell.state(), LoadState::NotLoaded);

        let second = cell.get_or_load(CEILING, || async { Ok::<_, &str>(5) }).await;
        assert_eq!(second, Ok(Some(5)));
        assert_eq!(cell.state(), LoadState::Loaded);
    }

    #[tokio::test(start_paused = true)]
    async fn waiter_gives_up_after_ceiling_and_late_fetch_still_lands() {
        let cell = Arc::new(LoadCell::<u32>::default());
        let release = Arc::new(Notify::new());

        let owner = {
            let cell = Arc::clone(&cell);
            let release = Arc::clone(&release);
            tokio::spawn(async move {
                cell.get_or_load(CEILING, move || async move {
                    release.notified().await;
                    Ok::<_, ()>(9)
                })
                .await
            })
        };
        while cell.state() != LoadState::Loading {
            tokio::task::yield_now().await;
        }

        let waited = cell
            .get_or_load(CEILING, || async { Ok::<_, ()>(0) })
            .await;
        assert_eq!(waited, Ok(None), "waiter returns what is materialized");
        assert_eq!(cell.state(), LoadState::NotLoaded, "timeout resets the state");

        release.notify_one();
        assert_eq!(owner.await.unwrap(), Ok(Some(9)));
        assert_eq!(cell.value(), Some(9));
        assert_eq!(cell.state(), LoadState::Loaded);
    }

    #[tokio::test]
    async fn waiter_sees_empty_value_when_fetch_fails() {
        let cell = Arc::new(LoadCell::<u32>::default());
        let release = Arc::new(Notify::new());

        let owner = {
            let cell = Arc::clone(&cell);
            let release = Arc::clone(&release);
            tokio::spawn(async move {
                cell.get_or_load(CEILING, move || async move {
                    release.notified().await;
                    Err::<u32, _>("remote down")
                })
                .await
            })
        };
        while cell.state() != LoadState::Loading {
            tokio::task::yield_now().await;
        }

        let (waited, ()) = tokio::join!(
            cell.get_or_load(CEILING, || async { Ok::<_, &str>(1) }),
            async {
                tokio::task::yield_now().await;
                release.notify_one();
            }
        );

        assert_eq!(waited, Ok(None), "waiter must not start a second fetch");
        assert_eq!(owner.await.unwrap(), Err("remote down"));
        assert_eq!(cell.state(), LoadState::NotLoaded);
    }

    #[tokio::test]
    async fn dropped_caller_does_not_cancel_fetch() {
        let cell = Arc::new(LoadCell::<u32>::default());
        let release = Arc::new(Notify::new());

        let owner = {
            let cell = Arc::clone(&cell);
            let release = Arc::clone(&release);
            tokio::spawn(async move {
                cell.get_or_load(CEILING, move || async move {
                    release.notified().await;
                    Ok::<_, ()>(4)
                })
                .await
            })
        };
        while cell.state() != LoadState::Loading {
            tokio::task::yield_now().await;
        }
        owner.abort();
        let _ = owner.await;

        release.notify_one();
        let got = cell
            .get_or_load(CEILING, || async { Ok::<_, ()>(0) })
            .await;
        assert_eq!(got, Ok(Some(4)), "the detached fetch still publishes");
    }
}
