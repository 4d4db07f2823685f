//! "Latest request wins" bookkeeping.
//!
//! Every submit takes a ticket from the gate. A result may only be committed
//! while its ticket is still the newest one; anything slower than a later
//! submit is discarded.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

#[derive(Debug, Default)]
pub struct RequestGate {
    epoch: AtomicU64,
}

impl RequestGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new request, superseding every earlier ticket.
    pub fn begin(&self) -> Ticket {
        Ticket(self.epoch.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.epoch.load(Ordering::SeqCst) == ticket.0
    }
}

/// Displayed value guarded by a `RequestGate`.
#[derive(Debug)]
pub struct Latest<T> {
    gate: Arc<RequestGate>,
    value: Mutex<Option<T>>,
}

impl<T: Clone> Latest<T> {
    pub fn new(gate: Arc<RequestGate>) -> Self {
        Self {
            gate,
            value: Mutex::new(None),
        }
    }

    /// Begin a request and clear what is displayed.
    pub fn begin(&self) -> Ticket {
        let ticket = self.gate.begin();
        if let Ok(mut value) = self.value.lock() {
            *value = None;
        }
        ticket
    }

    /// Store `value` if `ticket` is still current. Returns whether it was kept.
    pub fn commit(&self, ticket: Ticket, value: T) -> bool {
        let Ok(mut slot) = self.value.lock() else {
            return false;
        };
        // checked under the lock so a newer begin() can't interleave
        if !self.gate.is_current(ticket) {
            tracing::debug!("Discarding stale result for ticket {:?}", ticket);
            return false;
        }
        *slot = Some(value);
        true
    }

    pub fn get(&self) -> Option<T> {
        self.value.lock().ok().and_then(|v| v.clone())
    }
}
