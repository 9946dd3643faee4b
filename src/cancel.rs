//! Cooperative cancellation. A `CancellationToken` is a cheap, cloneable
//! `Arc<AtomicBool>` flag threaded through every store call per §5 ("every
//! store call must accept a cancellation context and honor it");
//! `with_deadline` additionally races a closure against a wall-clock limit.
//!
//! This crate's in-memory collaborators are, in practice, fast enough that
//! cancellation rarely fires; the mechanism exists so callers that wrap a
//! real network-backed `RelationalStore` have somewhere to plug in.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::CoreError;

/// A request-scoped cancellation flag, shareable across threads.
#[derive(Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        CancellationToken { cancelled: Arc::new(AtomicBool::new(false)) }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// A handle a caller can stash and invoke from another thread.
    pub fn handle(&self) -> CancelHandle {
        CancelHandle { cancelled: self.cancelled.clone() }
    }
}

/// A detached handle that can cancel the token it was derived from without
/// holding onto the token itself.
#[derive(Clone)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

/// Run `f`, returning `CoreError::Timeout` if `deadline` elapses or the
/// token is cancelled before `f` returns. `f` itself is not preempted —
/// this only measures elapsed wall-clock time around a call that is
/// expected to poll `token.is_cancelled()` internally for long-running
/// work; cancellation here is cooperative, never preemptive.
pub fn with_deadline<T>(
    token: &CancellationToken,
    deadline: Duration,
    f: impl FnOnce() -> Result<T, CoreError>,
) -> Result<T, CoreError> {
    if token.is_cancelled() {
        return Err(CoreError::Timeout { limit: deadline, elapsed: Duration::ZERO });
    }
    let started = Instant::now();
    let result = f();
    let elapsed = started.elapsed();
    if elapsed > deadline {
        return Err(CoreError::Timeout { limit: deadline, elapsed });
    }
    if token.is_cancelled() {
        return Err(CoreError::Timeout { limit: deadline, elapsed });
    }
    result
}
