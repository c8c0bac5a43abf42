//! Monotonic visitation stamps for block-graph traversal.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counter handing out strictly increasing stamps. Never reset.
#[derive(Debug)]
pub struct IndexAllocator {
    current: AtomicU64,
}

impl IndexAllocator {
    pub const fn new() -> Self {
        Self {
            current: AtomicU64::new(0),
        }
    }

    /// Last stamp handed out (0 before the first call to [`next`](Self::next)).
    #[inline]
    pub fn current(&self) -> u64 {
        self.current.load(Ordering::Relaxed)
    }

    /// Pre-increment and return the new stamp.
    #[inline]
    pub fn next(&self) -> u64 {
        self.current.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl Default for IndexAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Process-wide stamp source shared by every block arena.
pub static BLOCK_INDEX: IndexAllocator = IndexAllocator::new();

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_does_not_advance() {
        let alloc = IndexAllocator::new();
        assert_eq!(alloc.current(), 0);
        assert_eq!(alloc.current(), 0);
    }

    #[test]
    fn test_next_pre_increments() {
        let alloc = IndexAllocator::new();
        assert_eq!(alloc.next(), 1);
        assert_eq!(alloc.next(), 2);
        assert_eq!(alloc.current(), 2);
    }

    #[test]
    fn test_global_is_monotonic() {
        let base = BLOCK_INDEX.current();
        let a = BLOCK_INDEX.next();
        let b = BLOCK_INDEX.next();
        assert!(a > base);
        assert!(b > a);
    }
}
