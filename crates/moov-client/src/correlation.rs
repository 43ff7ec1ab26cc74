//! Pairs outbound status requests with their inbound replies.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use moov_frame::{RequestId, StatusReply};
use tracing::{debug, warn};

/// Abandoned ids remembered for discarding late replies; the oldest are forgotten first.
const ABANDONED_CAPACITY: usize = 1024;

/// Why a wait on the table ended without a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WaitError {
    #[error("request cancelled")]
    Cancelled,
    #[error("timed out waiting for reply")]
    TimedOut,
    #[error("reply source closed")]
    Closed,
}

#[derive(Debug, Default)]
struct TableState {
    replies: HashMap<RequestId, StatusReply>,
    pending: HashSet<RequestId>,
    cancelled: HashSet<RequestId>,
    abandoned: HashSet<RequestId>,
    abandoned_order: VecDeque<RequestId>,
    closed: bool,
}

impl TableState {
    /// Stop tracking `id`; a reply that shows up later is discarded.
    fn abandon(&mut self, id: RequestId) {
        self.pending.remove(&id);
        self.cancelled.remove(&id);
        if self.replies.remove(&id).is_some() || self.closed {
            return;
        }
        if self.abandoned.insert(id) {
            self.abandoned_order.push_back(id);
        }
        while self.abandoned_order.len() > ABANDONED_CAPACITY {
            if let Some(oldest) = self.abandoned_order.pop_front() {
                self.abandoned.remove(&oldest);
            }
        }
    }

    /// Returns `true` if `id` was abandoned.
    fn forget_abandoned(&mut self, id: RequestId) -> bool {
        if !self.abandoned.remove(&id) {
            return false;
        }
        self.abandoned_order.retain(|&abandoned| abandoned != id);
        true
    }
}

/// Mutex-guarded map from request id to reply, with blocking take.
///
/// Holds at most one reply per id. Waiters sleep on a condition variable and
/// are woken by every insert, cancellation and close.
#[derive(Debug, Default)]
pub struct CorrelationTable {
    state: Mutex<TableState>,
    arrived: Condvar,
}

impl CorrelationTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, TableState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mark `id` as outstanding so it can be cancelled before anyone waits on it.
    ///
    /// An id reused after wrap-around is no longer treated as abandoned.
    pub fn register(&self, id: RequestId) {
        let mut state = self.lock();
        state.forget_abandoned(id);
        state.pending.insert(id);
    }

    /// Store a reply. Returns `true` if it overwrote a reply with the same id.
    pub fn put(&self, reply: StatusReply) -> bool {
        let id = reply.request_id;
        let mut state = self.lock();
        if state.forget_abandoned(id) {
            debug!(request_id = id, "discarding reply for abandoned request");
            return false;
        }
        let duplicate = state.replies.insert(id, reply).is_some();
        drop(state);

        if duplicate {
            warn!(
                request_id = id,
                "protocol violation: duplicate status reply, overwriting"
            );
        }
        self.arrived.notify_all();
        duplicate
    }

    /// Block until the reply for `id` exists, then remove and return it.
    ///
    /// With `timeout: None` this waits until the reply arrives, the request is
    /// cancelled, or the table is closed. On timeout or cancellation the id is
    /// abandoned so a late reply does not linger.
    pub fn take_blocking(
        &self,
        id: RequestId,
        timeout: Option<Duration>,
    ) -> Result<StatusReply, WaitError> {
        let deadline = timeout.and_then(|timeout| Instant::now().checked_add(timeout));
        let mut state = self.lock();
        state.pending.insert(id);

        loop {
            if let Some(reply) = state.replies.remove(&id) {
                state.pending.remove(&id);
                state.cancelled.remove(&id);
                return Ok(reply);
            }
            if state.cancelled.contains(&id) {
                state.abandon(id);
                return Err(WaitError::Cancelled);
            }
            if state.closed {
                state.pending.remove(&id);
                return Err(WaitError::Closed);
            }

            state = match deadline {
                None => self
                    .arrived
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        state.abandon(id);
                        return Err(WaitError::TimedOut);
                    }
                    self.arrived
                        .wait_timeout(state, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
            };
        }
    }

    /// Cancel an outstanding request, waking its waiter.
    pub fn cancel(&self, id: RequestId) {
        let mut state = self.lock();
        if !state.pending.contains(&id) {
            return;
        }
        state.cancelled.insert(id);
        drop(state);
        self.arrived.notify_all();
    }

    /// Give up on `id` without waiting.
    pub fn abandon(&self, id: RequestId) {
        self.lock().abandon(id);
    }

    /// No more replies will arrive; release every waiter.
    pub fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
        state.abandoned.clear();
        state.abandoned_order.clear();
        drop(state);
        self.arrived.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Number of stored, not yet taken replies.
    pub fn len(&self) -> usize {
        self.lock().replies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
