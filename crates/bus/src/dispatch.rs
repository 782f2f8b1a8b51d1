//! Completion handles for fire-and-forget dispatch.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Handle on the handler tasks started by one `tell`/`emit`.
///
/// Dropping it detaches the tasks (they keep running). Production call sites
/// ignore it; tests and drivers may [`wait`](Dispatch::wait) on it.
#[derive(Debug)]
pub struct Dispatch {
    kind: &'static str,
    tasks: Vec<JoinHandle<bool>>,
}

/// Outcome of the handlers reached by one dispatch.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct DispatchReport {
    /// Handlers that completed successfully.
    pub delivered: usize,
    /// Handlers that returned an error or panicked.
    pub failed: usize,
}

impl Dispatch {
    pub(crate) fn new(kind: &'static str, tasks: Vec<JoinHandle<bool>>) -> Self {
        Self { kind, tasks }
    }

    /// Kind name of the dispatched message.
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Number of handlers the message was handed to.
    pub fn handlers(&self) -> usize {
        self.tasks.len()
    }

    /// Wait for the directly reached handlers to finish.
    ///
    /// Messages those handlers dispatch in turn are not awaited; use
    /// `Bus::idle` for whole cascades.
    pub async fn wait(self) -> DispatchReport {
        let mut report = DispatchReport::default();
        for task in self.tasks {
            match task.await {
                Ok(true) => report.delivered += 1,
                Ok(false) | Err(_) => report.failed += 1,
            }
        }
        report
    }
}

/// Counts handler tasks that are still running.
///
/// A task registers before it is spawned, so a cascade dispatched from inside
/// a handler is counted before its parent finishes; the count only drops to
/// zero once the whole cascade has settled.
#[derive(Debug, Default)]
pub(crate) struct InFlight {
    count: AtomicUsize,
    drained: Notify,
}

impl InFlight {
    pub(crate) fn enter(self: &Arc<Self>) -> InFlightGuard {
        self.count.fetch_add(1, Ordering::SeqCst);
        InFlightGuard(Arc::clone(self))
    }

    pub(crate) fn current(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    pub(crate) async fn drained(&self) {
        loop {
            // Registered before the check so a concurrent drain is not missed.
            let notified = self.drained.notified();
            if self.current() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Marks one running handler task; released on drop (including unwinding).
#[derive(Debug)]
pub(crate) struct InFlightGuard(Arc<InFlight>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.0.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.drained.notify_waiters();
        }
    }
}
