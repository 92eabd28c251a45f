//! Bounded drop-oldest queue between connection handlers and the poller.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError};

/// How long a poll may block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    /// Block until an item arrives.
    Forever,
    /// Check once without blocking.
    NoWait,
    /// Block up to the given duration.
    Up(Duration),
}

impl Wait {
    /// Negative blocks forever, zero polls once, positive waits that many ms.
    pub fn from_millis(timeout_ms: i64) -> Self {
        match timeout_ms {
            t if t < 0 => Wait::Forever,
            0 => Wait::NoWait,
            t => Wait::Up(Duration::from_millis(t as u64)),
        }
    }
}

/// Fixed capacity FIFO. When full, a push evicts the oldest pending item so
/// producers never block.
pub struct RequestQueue<T> {
    tx: Sender<T>,
    rx: Receiver<T>,
    capacity: usize,
    dropped: AtomicU64,
}

impl<T> RequestQueue<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = bounded(capacity);
        Self {
            tx,
            rx,
            capacity,
            dropped: AtomicU64::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Pending items.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Items evicted so far.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Append `item`, evicting the oldest pending item if the queue is full.
    pub fn push(&self, item: T) {
        let mut item = item;
        loop {
            match self.tx.try_send(item) {
                Ok(()) => return,
                Err(TrySendError::Full(back)) => {
                    if self.rx.try_recv().is_ok() {
                        let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                        tracing::debug!(capacity = self.capacity, total, "queue full, dropped oldest");
                    }
                    item = back;
                }
                // both ends live in self
                Err(TrySendError::Disconnected(_)) => return,
            }
        }
    }

    /// Take the oldest item, waiting as `wait` allows.
    pub fn poll(&self, wait: Wait) -> Option<T> {
        match wait {
            Wait::Forever => self.rx.recv().ok(),
            Wait::NoWait => match self.rx.try_recv() {
                Ok(item) => Some(item),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
            },
            Wait::Up(timeout) => match self.rx.recv_timeout(timeout) {
                Ok(item) => Some(item),
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
            },
        }
    }
}
