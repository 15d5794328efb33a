// ── Open-operation counter ──
//
// Each in-flight request holds an `OperationGuard`. Dropping the last one
// fires a single `OperationComplete`. Instance-scoped: two SDKs never share
// a counter.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::broadcast;
use tracing::trace;

use crate::event::SdkEvent;

pub(crate) struct OperationCounter {
    open: Mutex<usize>,
    events: broadcast::Sender<SdkEvent>,
}

impl OperationCounter {
    pub(crate) fn new(events: broadcast::Sender<SdkEvent>) -> Arc<Self> {
        Arc::new(Self {
            open: Mutex::new(0),
            events,
        })
    }

    /// Register one more open operation.
    pub(crate) fn begin(self: &Arc<Self>) -> OperationGuard {
        let mut open = self.open.lock().unwrap_or_else(PoisonError::into_inner);
        *open += 1;
        trace!(open = *open, "operation started");
        OperationGuard {
            counter: Arc::clone(self),
        }
    }

    pub(crate) fn open(&self) -> usize {
        *self.open.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn finish(&self) {
        let reached_zero = {
            let mut open = self.open.lock().unwrap_or_else(PoisonError::into_inner);
            let was = *open;
            *open = was.saturating_sub(1);
            trace!(open = *open, "operation finished");
            was == 1
        };
        if reached_zero {
            let _ = self.events.send(SdkEvent::OperationComplete);
        }
    }
}

/// Keeps one slot of the counter open until dropped.
pub(crate) struct OperationGuard {
    counter: Arc<OperationCounter>,
}

impl Drop for OperationGuard {
    fn drop(&mut self) {
        self.counter.finish();
    }
}
