//! Connection limiter
//!
//! Caps the number of live connection workers. Each permit occupies one slot
//! of a bounded channel; dropping the permit frees the slot.

use crossbeam::channel::{self, Receiver, Sender, TrySendError};

/// Counting limiter for concurrent connections
#[derive(Debug)]
pub struct ConnectionLimiter {
    slots: Sender<()>,
    returns: Receiver<()>,
    capacity: usize,
}

/// Proof of an occupied slot, released on drop
#[derive(Debug)]
pub struct ConnectionPermit {
    returns: Receiver<()>,
}

impl ConnectionLimiter {
    /// Create a limiter admitting at most `capacity` connections
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (slots, returns) = channel::bounded(capacity);
        Self {
            slots,
            returns,
            capacity,
        }
    }

    /// Take a slot without waiting; `None` when all slots are in use
    pub fn try_acquire(&self) -> Option<ConnectionPermit> {
        match self.slots.try_send(()) {
            Ok(()) => Some(ConnectionPermit {
                returns: self.returns.clone(),
            }),
            Err(TrySendError::Full(())) | Err(TrySendError::Disconnected(())) => None,
        }
    }

    /// Number of slots currently held
    pub fn active(&self) -> usize {
        self.slots.len()
    }

    /// Maximum number of concurrent connections
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Drop for ConnectionPermit {
    fn drop(&mut self) {
        let _ = self.returns.try_recv();
    }
}
