use crate::geo::Bounds;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Pending {
    bounds: Bounds,
    deadline: Instant,
}

/// Single-slot debouncer for viewport changes.
///
/// Every `notify` replaces the pending bounds and restarts the delay, so only
/// the last viewport of a burst is ever released by `poll`.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    pending: Option<Pending>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn notify(&mut self, bounds: Bounds, now: Instant) {
        self.pending = Some(Pending {
            bounds,
            deadline: now + self.delay,
        });
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.map(|p| p.deadline)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Releases the pending bounds once the deadline has passed.
    pub fn poll(&mut self, now: Instant) -> Option<Bounds> {
        match self.pending {
            Some(p) if now >= p.deadline => {
                self.pending = None;
                Some(p.bounds)
            }
            _ => None,
        }
    }

    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }
}
