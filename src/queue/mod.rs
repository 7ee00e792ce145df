use std::{
    collections::VecDeque,
    sync::{Condvar, Mutex, MutexGuard},
    time::{Duration, Instant},
};

use crate::address::Address;

/// A data payload the socket accepted, still padded to the package size
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ReceivedPackage {
    pub source: Address,
    pub payload: Vec<u8>,
}

impl ReceivedPackage {
    /// The payload read as text up to its padding
    pub fn text(&self) -> String {
        crate::packet::payload_text(&self.payload)
    }
}

/// Whatever consumes the packages the [socket](crate::socket::ReliableSocket) accepts. It is
/// called in sequence order for each peer, never while the connection table is locked
pub trait PackageSink: Send + Sync {
    fn accept(&self, package: ReceivedPackage);
}

/// FIFO of accepted packages, drained by the application
#[derive(Default)]
pub struct InboundQueue {
    packages: Mutex<VecDeque<ReceivedPackage>>,
    available: Condvar,
}

impl InboundQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&self, package: ReceivedPackage) {
        self.lock().push_back(package);
        self.available.notify_one();
    }

    pub fn has_pending(&self) -> bool {
        !self.lock().is_empty()
    }

    /// Pops the oldest package, if any
    pub fn dequeue(&self) -> Option<ReceivedPackage> {
        self.lock().pop_front()
    }

    /// Pops the oldest package, waiting up to `timeout` for one to arrive
    pub fn dequeue_timeout(&self, timeout: Duration) -> Option<ReceivedPackage> {
        let deadline = Instant::now() + timeout;
        let mut packages = self.lock();

        loop {
            if let Some(package) = packages.pop_front() {
                return Some(package);
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return None;
            }

            packages = match self.available.wait_timeout(packages, remaining) {
                Ok((packages, _)) => packages,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panicking consumer must not take the queue down with it
    fn lock(&self) -> MutexGuard<'_, VecDeque<ReceivedPackage>> {
        self.packages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PackageSink for InboundQueue {
    fn accept(&self, package: ReceivedPackage) {
        self.enqueue(package);
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use super::*;

    fn package(text: &str) -> ReceivedPackage {
        ReceivedPackage {
            source: Address::new("127.0.0.1", 1),
            payload: crate::packet::pad(text.as_bytes(), 16),
        }
    }

    #[test]
    fn test_fifo_order() {
        let queue = InboundQueue::new();
        assert!(!queue.has_pending());
        assert_eq!(queue.dequeue(), None);

        queue.enqueue(package("first"));
        queue.accept(package("second"));
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.dequeue().unwrap().text(), "first");
        assert_eq!(queue.dequeue().unwrap().text(), "second");
        assert!(queue.is_empty());
    }

    #[test]
    fn test_dequeue_timeout_wakes_on_enqueue() {
        let queue = Arc::new(InboundQueue::new());
        assert_eq!(queue.dequeue_timeout(Duration::from_millis(20)), None);

        let producer = Arc::clone(&queue);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            producer.enqueue(package("late"));
        });

        let received = queue.dequeue_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(received.text(), "late");
        handle.join().unwrap();
    }
}
