//! Thread-safe FIFO bridge from background workers to the update tick.

use std::collections::VecDeque;
use std::sync::Mutex;

/// Multi-producer, single-consumer FIFO queue.
///
/// Workers `push` under one queue-wide lock; the update tick `drain`s
/// everything queued so far and handles each item, in enqueue order, on its
/// own thread. The lock covers only the enqueue and the swap-out, never the
/// handlers, so producers are never blocked behind item processing.
#[derive(Debug)]
pub struct DispatchQueue<T> {
    items: Mutex<VecDeque<T>>,
}

impl<T> DispatchQueue<T> {
    pub fn new() -> Self {
        Self { items: Mutex::new(VecDeque::new()) }
    }

    /// Append an item. Callable from any thread.
    pub fn push(&self, item: T) {
        self.items.lock().expect("dispatch queue lock poisoned").push_back(item);
    }

    /// Take everything queued so far and run `handler` over it in FIFO
    /// order on the calling thread. Items pushed while handlers run are
    /// left for the next drain. Returns the number of items handled.
    pub fn drain(&self, mut handler: impl FnMut(T)) -> usize {
        let drained = {
            let mut items = self.items.lock().expect("dispatch queue lock poisoned");
            std::mem::take(&mut *items)
        };
        let count = drained.len();
        for item in drained {
            handler(item);
        }
        count
    }

    pub fn len(&self) -> usize {
        self.items.lock().expect("dispatch queue lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for DispatchQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
