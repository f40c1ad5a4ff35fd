//! Time-ordered store of pending automatic removals.
//!
//! Every entry's deadline is `insertion time + timeout` with a timeout that
//! is fixed for the life of the process, so insertion order and deadline
//! order coincide: the queue is a plain FIFO and draining never has to scan
//! past the first still-pending entry. If the timeout ever became
//! configurable per message this would need a priority ordering instead.

use pftabled_wire::TableName;
use std::collections::VecDeque;
use std::net::Ipv4Addr;

/// A scheduled removal: which entry to take out of which table, and when
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryEntry {
    /// Table the entry was added to
    pub table: TableName,
    /// Address as it was handed to the backend (host bits cleared)
    pub addr: Ipv4Addr,
    /// CIDR prefix length
    pub mask: u8,
    /// Deadline, seconds since the Unix epoch
    pub expires_at: u64,
}

/// Insertion-ordered queue of [`ExpiryEntry`] values.
///
/// Owned by the daemon loop and passed by reference; there are no ambient
/// globals and no internal locking.
#[derive(Debug, Default)]
pub struct ExpiryQueue {
    entries: VecDeque<ExpiryEntry>,
}

impl ExpiryQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pending entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no removals are pending
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert an entry at the most-recent end
    pub fn schedule(&mut self, entry: ExpiryEntry) {
        self.entries.push_back(entry);
    }

    /// Remove and return every entry whose deadline is at or before `now`.
    ///
    /// Stops at the first entry still in the future; by the insertion-order
    /// invariant nothing behind it can be due yet.
    pub fn drain(&mut self, now: u64) -> Vec<ExpiryEntry> {
        let mut expired = Vec::new();
        while let Some(front) = self.entries.front() {
            if front.expires_at > now {
                break;
            }
            // front exists, pop cannot fail
            if let Some(entry) = self.entries.pop_front() {
                expired.push(entry);
            }
        }
        expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(at: u64) -> ExpiryEntry {
        ExpiryEntry {
            table: TableName::new("blocked").unwrap(),
            addr: Ipv4Addr::new(10, 0, 0, 1),
            mask: 32,
            expires_at: at,
        }
    }

    #[test]
    fn test_drains_in_schedule_order() {
        let mut queue = ExpiryQueue::new();
        queue.schedule(entry(100));
        queue.schedule(entry(200));
        queue.schedule(entry(300));

        let drained = queue.drain(1000);
        let deadlines: Vec<u64> = drained.iter().map(|e| e.expires_at).collect();
        assert_eq!(deadlines, vec![100, 200, 300]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_nothing_before_earliest_deadline() {
        let mut queue = ExpiryQueue::new();
        queue.schedule(entry(100));
        queue.schedule(entry(200));

        assert!(queue.drain(99).is_empty());
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_stops_at_first_future_entry() {
        let mut queue = ExpiryQueue::new();
        queue.schedule(entry(100));
        queue.schedule(entry(200));
        queue.schedule(entry(300));

        let drained = queue.drain(200);
        assert_eq!(drained.len(), 2);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_deadline_boundary_inclusive() {
        let mut queue = ExpiryQueue::new();
        queue.schedule(entry(100));
        assert_eq!(queue.drain(100).len(), 1);
    }
}
