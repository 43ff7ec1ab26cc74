use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::warn;

/// FIFO of unsolicited engine messages, drained by the caller.
///
/// Unbounded unless a capacity is given; when full, the oldest entry is
/// dropped to make room.
#[derive(Debug)]
pub struct EventQueue<T> {
    name: &'static str,
    items: Mutex<VecDeque<T>>,
    capacity: Option<usize>,
}

impl<T> EventQueue<T> {
    pub fn new(name: &'static str, capacity: Option<usize>) -> Self {
        Self {
            name,
            items: Mutex::new(VecDeque::new()),
            capacity: capacity.map(|cap| cap.max(1)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append an item in arrival order.
    pub fn push(&self, item: T) {
        let mut items = self.lock();
        let dropped = match self.capacity {
            Some(capacity) if items.len() >= capacity => items.pop_front().is_some(),
            _ => false,
        };
        items.push_back(item);
        drop(items);

        if dropped {
            warn!(queue = self.name, capacity = ?self.capacity, "queue full, dropped oldest entry");
        }
    }

    /// Remove and return everything queued, oldest first. Never blocks on arrivals.
    pub fn drain(&self) -> Vec<T> {
        Vec::from(std::mem::take(&mut *self.lock()))
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
