//! Thread-safe counter for Socket.IO acknowledgment ids.
//!
//! # Why acknowledgment ids? (for beginners)
//!
//! Several calls may be in flight on the same channel at once, and the
//! service is free to answer them in any order.  Each outbound call therefore
//! carries a unique number (`42<id>[...]`) and the service echoes that number
//! in its acknowledgment (`43<id>[...]`).  The transport uses the number to
//! hand each acknowledgment to the call that is waiting for it.
//!
//! The counter is an `AtomicU64` so concurrent callers never receive the same
//! id and no lock is needed.

use std::sync::atomic::{AtomicU64, Ordering};

/// A monotonically increasing source of acknowledgment ids.
///
/// Ids start at 0 and wrap around at `u64::MAX` without panicking.
///
/// # Examples
///
/// ```rust
/// use portal_core::protocol::SequenceCounter;
///
/// let counter = SequenceCounter::new();
/// assert_eq!(counter.next(), 0);
/// assert_eq!(counter.next(), 1);
/// ```
#[derive(Debug)]
pub struct SequenceCounter {
    inner: AtomicU64,
}

impl SequenceCounter {
    /// Creates a new counter starting at 0.
    pub fn new() -> Self {
        Self {
            inner: AtomicU64::new(0),
        }
    }

    /// Returns the next id and atomically advances the counter.
    ///
    /// `Relaxed` ordering is enough: ids only need to be unique, they are not
    /// used to publish other memory.
    pub fn next(&self) -> u64 {
        self.inner.fetch_add(1, Ordering::Relaxed)
    }

    /// Returns the id the next call to [`next`](Self::next) would hand out.
    pub fn current(&self) -> u64 {
        self.inner.load(Ordering::Relaxed)
    }
}

impl Default for SequenceCounter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_sequence_counter_starts_at_zero() {
        let counter = SequenceCounter::new();
        assert_eq!(counter.next(), 0);
    }

    #[test]
    fn test_sequence_counter_wraps_at_u64_max() {
        // Arrange – start the counter one step before overflow
        let counter = SequenceCounter {
            inner: AtomicU64::new(u64::MAX),
        };

        // Act
        let before_wrap = counter.next();
        let after_wrap = counter.next();

        // Assert
        assert_eq!(before_wrap, u64::MAX);
        assert_eq!(after_wrap, 0);
    }

    #[test]
    fn test_ids_are_unique_across_threads() {
        // Arrange
        let counter = Arc::new(SequenceCounter::new());

        // Act – many threads draw ids concurrently, as concurrent calls do
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let c = Arc::clone(&counter);
                thread::spawn(move || (0..500).map(|_| c.next()).collect::<Vec<_>>())
            })
            .collect();
        let mut ids: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().expect("thread panicked"))
            .collect();

        // Assert
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 8 * 500, "every acknowledgment id must be unique");
    }

    #[test]
    fn test_current_does_not_advance() {
        let counter = SequenceCounter::new();
        counter.next();

        assert_eq!(counter.current(), 1);
        assert_eq!(counter.next(), 1);
    }
}
