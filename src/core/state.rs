use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::UNKNOWN_ERROR;

#[derive(Debug, Clone, PartialEq)]
pub enum AsyncState<T> {
    Idle,
    Loading,
    /// Completed with a value the call site classifies as empty.
    Empty,
    Success(T),
    Error(String),
}

impl<T> AsyncState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, AsyncState::Loading)
    }

    pub fn is_settled(&self) -> bool {
        !self.is_loading()
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            AsyncState::Success(v) => Some(v),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            AsyncState::Error(m) => Some(m),
            _ => None,
        }
    }
}

struct Shared<T> {
    tx: watch::Sender<AsyncState<T>>,
    generation: AtomicU64,
}

impl<T> Shared<T> {
    fn begin(&self) -> u64 {
        let mut generation = 0;
        self.tx.send_modify(|state| {
            generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            *state = AsyncState::Loading;
        });
        generation
    }

    fn reset(&self) {
        self.tx.send_if_modified(|state| {
            self.generation.fetch_add(1, Ordering::SeqCst);
            if matches!(state, AsyncState::Idle) {
                return false;
            }
            *state = AsyncState::Idle;
            true
        });
    }

    /// The generation check runs under the channel lock, so it cannot
    /// interleave with a concurrent `begin` or `reset`.
    fn complete(&self, generation: u64, next: AsyncState<T>) -> bool {
        let mut applied = false;
        self.tx.send_if_modified(|state| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            *state = next;
            applied = true;
            true
        });
        applied
    }
}

/// Projects one logical operation onto an observable [`AsyncState`].
///
/// Every `run` and `reset` starts a new generation and aborts the operation
/// still in flight, so at most one task per projector does work at any time.
/// A completion from an older generation is dropped.
pub struct StateProjector<T> {
    name: &'static str,
    shared: Arc<Shared<T>>,
    empty_when: Option<fn(&T) -> bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<T> StateProjector<T>
where
    T: Send + Sync + 'static,
{
    pub fn new(name: &'static str) -> Self {
        let (tx, _) = watch::channel(AsyncState::Idle);
        Self {
            name,
            shared: Arc::new(Shared { tx, generation: AtomicU64::new(0) }),
            empty_when: None,
            task: Mutex::new(None),
        }
    }

    /// Values matching `pred` settle as `Empty` instead of `Success`.
    #[must_use]
    pub fn with_empty_when(mut self, pred: fn(&T) -> bool) -> Self {
        self.empty_when = Some(pred);
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<AsyncState<T>> {
        self.shared.tx.subscribe()
    }

    /// Starts `producer` on the runtime, aborting the previous operation if
    /// it is still running. The state is already `Loading` when this returns.
    /// The producer only starts once the aborted task has unwound. Must be
    /// called from within a tokio runtime.
    pub fn run<F, E>(&self, producer: F)
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let mut slot = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        let generation = self.shared.begin();
        let shared = self.shared.clone();
        let empty_when = self.empty_when;
        let name = self.name;

        let previous = slot.take();
        if let Some(prev) = previous.as_ref().filter(|h| !h.is_finished()) {
            tracing::debug!(projector = name, generation, "superseding in-flight operation");
            prev.abort();
        }

        *slot = Some(tokio::spawn(async move {
            if let Some(prev) = previous {
                let _ = prev.await;
            }
            let next = match producer.await {
                Ok(value) if empty_when.is_some_and(|is_empty| is_empty(&value)) => AsyncState::Empty,
                Ok(value) => AsyncState::Success(value),
                Err(e) => {
                    let message = error_message(&e);
                    tracing::debug!(projector = name, generation, error = %message, "operation failed");
                    AsyncState::Error(message)
                }
            };
            if !shared.complete(generation, next) {
                tracing::warn!(projector = name, generation, "discarding result of superseded operation");
            }
        }));
    }

    /// Back to `Idle`, aborting anything still in flight.
    pub fn reset(&self) {
        let slot = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        self.shared.reset();
        if let Some(handle) = slot.as_ref() {
            handle.abort();
        }
    }

    /// Number of tasks of this projector still running: 0 or 1.
    pub fn in_flight(&self) -> usize {
        let slot = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        usize::from(slot.as_ref().is_some_and(|h| !h.is_finished()))
    }
}

impl<T> StateProjector<T>
where
    T: Clone,
{
    pub fn current(&self) -> AsyncState<T> {
        self.shared.tx.borrow().clone()
    }

    /// Waits until the state is no longer `Loading` and returns it.
    pub async fn settled(&self) -> AsyncState<T> {
        let mut rx = self.shared.tx.subscribe();
        let settled = rx.wait_for(AsyncState::is_settled).await.map(|s| (*s).clone());
        settled.unwrap_or_else(|_| self.current())
    }
}

impl<T> Drop for StateProjector<T> {
    fn drop(&mut self) {
        let slot = self.task.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = slot.take() {
            handle.abort();
        }
    }
}

fn error_message(e: &impl Display) -> String {
    let message = e.to_string();
    if message.trim().is_empty() {
        UNKNOWN_ERROR.to_string()
    } else {
        message
    }
}
