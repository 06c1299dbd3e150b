//! Lifecycle model shared by every screen controller.
//!
//! An [`Operation`] wraps one asynchronous collaborator call and publishes its
//! [`OperationState`] through a `watch` channel: a single writer (the running
//! invocation) and any number of readers. Late subscribers always see the most
//! recent state.

use std::future::Future;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use tokio::{sync::watch, task::JoinHandle};
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, warn};

use crate::error::ServiceError;

#[derive(Debug, Clone, PartialEq)]
pub enum OperationState<T> {
    NotStarted,
    InProgress,
    Completed(T),
    Failed(String),
}

impl<T> Default for OperationState<T> {
    fn default() -> Self {
        Self::NotStarted
    }
}

impl<T> OperationState<T> {
    pub fn is_in_progress(&self) -> bool {
        matches!(self, Self::InProgress)
    }

    /// True once the operation reached `Completed` or `Failed`.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::Failed(_))
    }

    pub fn completed(&self) -> Option<&T> {
        match self {
            Self::Completed(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_completed(self) -> Option<T> {
        match self {
            Self::Completed(value) => Some(value),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&str> {
        match self {
            Self::Failed(reason) => Some(reason),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::Completed(_) => "completed",
            Self::Failed(_) => "failed",
        }
    }

    fn from_result(result: Result<T, ServiceError>) -> Self {
        match result {
            Ok(value) => Self::Completed(value),
            Err(err) => Self::Failed(err.to_string()),
        }
    }
}

struct OperationShared<T> {
    name: &'static str,
    state: watch::Sender<OperationState<T>>,
    generation: AtomicU64,
}

/// One named asynchronous operation owned by a controller.
///
/// Cloning yields another handle to the same state.
pub struct Operation<T> {
    shared: Arc<OperationShared<T>>,
}

impl<T> Clone for Operation<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Operation<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(name: &'static str) -> Self {
        let (state, _) = watch::channel(OperationState::NotStarted);
        Self {
            shared: Arc::new(OperationShared {
                name,
                state,
                generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.shared.name
    }

    pub fn subscribe(&self) -> watch::Receiver<OperationState<T>> {
        self.shared.state.subscribe()
    }

    /// Stream of states starting with the current one.
    pub fn stream(&self) -> WatchStream<OperationState<T>> {
        WatchStream::new(self.subscribe())
    }

    pub fn snapshot(&self) -> OperationState<T> {
        self.shared.state.borrow().clone()
    }

    /// Completed value, if the last invocation succeeded.
    pub fn value(&self) -> Option<T> {
        self.shared.state.borrow().completed().cloned()
    }

    /// Marks a new invocation as in progress and hands back the slot its
    /// result must be published through.
    pub fn start(&self) -> InFlight<T> {
        let mut generation = 0;
        // Bumping the generation under the channel lock keeps it ordered with
        // the generation check in `InFlight::complete`.
        self.shared.state.send_modify(|state| {
            generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
            *state = OperationState::InProgress;
        });
        debug!(operation = self.shared.name, generation, "operation started");
        InFlight {
            shared: Arc::clone(&self.shared),
            generation,
        }
    }

    /// Runs `call` inline, publishing `InProgress` before it is first polled.
    pub async fn run<F>(&self, call: F) -> OperationState<T>
    where
        F: Future<Output = Result<T, ServiceError>>,
    {
        let flight = self.start();
        flight.complete(call.await)
    }

    /// Spawns `call` onto the runtime. The state is `InProgress` by the time
    /// this returns.
    pub fn launch<F>(&self, call: F) -> JoinHandle<OperationState<T>>
    where
        F: Future<Output = Result<T, ServiceError>> + Send + 'static,
    {
        let flight = self.start();
        tokio::spawn(async move { flight.complete(call.await) })
    }

    /// Records a failure that was detected before any collaborator call.
    pub fn reject(&self, err: ServiceError) -> OperationState<T> {
        self.start().complete(Err(err))
    }

    /// Back to `NotStarted`; any invocation still in flight is superseded.
    pub fn reset(&self) {
        self.shared.state.send_modify(|state| {
            self.shared.generation.fetch_add(1, Ordering::SeqCst);
            *state = OperationState::NotStarted;
        });
    }

    /// Waits until the current invocation settles and returns its state.
    /// Returns immediately when nothing is in progress.
    pub async fn settled(&self) -> OperationState<T> {
        let mut rx = self.subscribe();
        let settled = match rx.wait_for(|state| !state.is_in_progress()).await {
            Ok(state) => state.clone(),
            Err(_) => self.snapshot(),
        };
        settled
    }
}

/// A started invocation that has not published its outcome yet.
pub struct InFlight<T> {
    shared: Arc<OperationShared<T>>,
    generation: u64,
}

impl<T> InFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Publishes the outcome unless a newer invocation of the same operation
    /// has started since; the resulting state is returned either way.
    pub fn complete(self, result: Result<T, ServiceError>) -> OperationState<T> {
        let name = self.shared.name;
        if let Err(err) = &result {
            warn!(operation = name, generation = self.generation, %err, "operation failed");
        }
        let state = OperationState::from_result(result);

        let generation = self.generation;
        let shared = &self.shared;
        let published = shared.state.send_if_modified(|current| {
            if shared.generation.load(Ordering::SeqCst) == generation {
                *current = state.clone();
                true
            } else {
                false
            }
        });

        if published {
            debug!(
                operation = name,
                generation = self.generation,
                state = state.label(),
                "operation settled"
            );
        } else {
            debug!(
                operation = name,
                generation = self.generation,
                "discarding result of superseded invocation"
            );
        }
        state
    }
}

#[cfg(test)]
#[path = "tests/state_tests.rs"]
mod tests;
