//! A [`Transport`] backed by a spawned tokio task.
//!
//! [`spawn_request`] runs a future on the current tokio runtime and returns a
//! transport controlling it plus a [`RequestCompletion`] to await its output.
//!
//! - `suspend()` closes a gate; the task stops polling the future until the
//!   gate reopens. Work already handed to the OS (a socket write in flight)
//!   is not interrupted.
//! - `resume()` reopens the gate.
//! - `cancel()` aborts the task at its next yield point.
//!
//! Dropping the transport releases the gate: the task then runs to completion
//! unsupervised. Dropping the completion detaches the task.
//!
//! # Example
//!
//! ```rust
//! use request_lifecycle_core::{LifecycleState, Transport};
//! use request_lifecycle_runtime::error::RequestError;
//! use request_lifecycle_runtime::task::spawn_request;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let (transport, completion) = spawn_request(std::future::pending::<()>());
//! transport.cancel();
//!
//! assert!(matches!(completion.await, Err(RequestError::Cancelled)));
//! # }
//! ```

use crate::error::RequestError;
use crate::metrics::LifecycleMetrics;
use request_lifecycle_core::{LifecycleState, Transport};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinHandle};

/// Whether the spawned future may be polled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gate {
    Open,
    Closed,
}

/// Transport controlling a spawned tokio task.
#[derive(Debug)]
pub struct TaskTransport {
    gate: watch::Sender<Gate>,
    abort: AbortHandle,
}

impl TaskTransport {
    /// Whether the gate is currently closed
    #[must_use]
    pub fn is_suspended(&self) -> bool {
        *self.gate.borrow() == Gate::Closed
    }
}

impl Transport for TaskTransport {
    fn resume(&self) {
        self.gate.send_replace(Gate::Open);
    }

    fn suspend(&self) {
        self.gate.send_replace(Gate::Closed);
    }

    fn cancel(&self) {
        tracing::debug!("Aborting spawned request");
        self.abort.abort();
    }
}

/// Completion of a spawned request.
///
/// Resolves to the future's output, or to [`RequestError::Cancelled`] if the
/// task was aborted before finishing. A request that finished before
/// `cancel()` reached it still resolves to its output.
#[derive(Debug)]
pub struct RequestCompletion<T> {
    join: JoinHandle<T>,
}

impl<T> RequestCompletion<T> {
    /// Whether the task has finished (successfully, by abort, or by panic)
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

impl<T> Future for RequestCompletion<T> {
    type Output = Result<T, RequestError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.join)
            .poll(cx)
            .map(|joined| joined.map_err(RequestError::from))
    }
}

/// Spawn `future` on the current tokio runtime behind a [`TaskTransport`].
///
/// The request starts running immediately.
///
/// # Panics
///
/// Panics if called outside of a tokio runtime.
pub fn spawn_request<F>(future: F) -> (TaskTransport, RequestCompletion<F::Output>)
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    spawn_request_in(future, LifecycleState::Resumed)
}

/// Spawn `future` behind a [`TaskTransport`] that starts out in `initial`.
///
/// - `Resumed`: the request starts running immediately.
/// - `Suspended`: the gate starts closed; the future is not polled until
///   `resume()`.
/// - `Cancelled`: the task is aborted before the future is ever polled and
///   the completion resolves to [`RequestError::Cancelled`].
///
/// The gate is set before the task is scheduled, so no worker thread can poll
/// the future ahead of the requested state.
///
/// # Panics
///
/// Panics if called outside of a tokio runtime.
pub fn spawn_request_in<F>(
    future: F,
    initial: LifecycleState,
) -> (TaskTransport, RequestCompletion<F::Output>)
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    let start = if initial == LifecycleState::Resumed {
        Gate::Open
    } else {
        Gate::Closed
    };
    let (gate, gate_rx) = watch::channel(start);
    let join = tokio::spawn(gated(future, gate_rx));

    LifecycleMetrics::record_task_spawned();
    tracing::trace!(initial = %initial, "Spawned request");

    let transport = TaskTransport {
        gate,
        abort: join.abort_handle(),
    };
    if initial == LifecycleState::Cancelled {
        transport.abort.abort();
    }
    (transport, RequestCompletion { join })
}

/// Poll `future` only while the gate is open.
async fn gated<F: Future>(future: F, mut gate: watch::Receiver<Gate>) -> F::Output {
    let mut future = std::pin::pin!(future);

    loop {
        loop {
            let closed = *gate.borrow_and_update() == Gate::Closed;
            if !closed {
                break;
            }
            if gate.changed().await.is_err() {
                // Transport dropped while suspended; nobody can resume us
                return future.await;
            }
        }

        tokio::select! {
            biased;
            changed = gate.changed() => {
                if changed.is_err() {
                    return future.await;
                }
            }
            output = &mut future => return output,
        }
    }
}
