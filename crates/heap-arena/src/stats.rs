//! Arena usage statistics.

use core::fmt;

use crate::arena::Arena;

/// Snapshot of the two registries of an arena.
///
/// Allocated figures include the per-block header overhead.
///
/// The [`Display`](fmt::Display) implementation renders one labeled line per
/// field:
///
/// ```
/// use heap_arena::{Arena, ArenaConfig};
///
/// let mut arena = Arena::new(ArenaConfig::new(128)).unwrap();
/// arena.allocate(24).unwrap();
///
/// let expected = "\
/// Allocated size = 32
/// Allocated chunks = 1
/// Free size = 96
/// Free chunks = 1
/// Largest free chunk size = 96
/// Smallest free chunk size = 96
/// ";
/// assert_eq!(arena.statistics().to_string(), expected);
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Statistics {
    pub allocated_bytes: usize,
    pub allocated_count: usize,
    pub free_bytes: usize,
    pub free_count: usize,
    /// Size of the largest free block, 0 if there is none.
    pub largest_free: usize,
    /// Size of the smallest free block, 0 if there is none.
    pub smallest_free: usize,
}

impl Statistics {
    /// Returns the share of free bytes that lie outside the largest free
    /// block.
    ///
    /// 0.0 means all free space is contiguous; values close to 1.0 mean free
    /// space is scattered over many small blocks. Returns 0.0 when nothing is
    /// free.
    #[must_use]
    #[expect(clippy::cast_precision_loss)]
    pub fn fragmentation(&self) -> f64 {
        if self.free_bytes == 0 {
            return 0.0;
        }
        1.0 - self.largest_free as f64 / self.free_bytes as f64
    }
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Allocated size = {}", self.allocated_bytes)?;
        writeln!(f, "Allocated chunks = {}", self.allocated_count)?;
        writeln!(f, "Free size = {}", self.free_bytes)?;
        writeln!(f, "Free chunks = {}", self.free_count)?;
        writeln!(f, "Largest free chunk size = {}", self.largest_free)?;
        writeln!(f, "Smallest free chunk size = {}", self.smallest_free)
    }
}

impl Arena {
    /// Aggregates both registries into a [`Statistics`] snapshot.
    #[must_use]
    pub fn statistics(&self) -> Statistics {
        Statistics {
            allocated_bytes: self.allocated.total_size(),
            allocated_count: self.allocated.len(),
            free_bytes: self.free.total_size(),
            free_count: self.free.len(),
            largest_free: self.free.largest().unwrap_or(0),
            smallest_free: self.free.smallest().unwrap_or(0),
        }
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ArenaConfig;

    #[test]
    fn test_fresh_arena() {
        let arena = Arena::new(ArenaConfig::new(200)).unwrap();
        assert_eq!(
            arena.statistics(),
            Statistics {
                allocated_bytes: 0,
                allocated_count: 0,
                free_bytes: 256,
                free_count: 1,
                largest_free: 256,
                smallest_free: 256,
            }
        );
        assert!(arena.statistics().fragmentation().abs() < f64::EPSILON);
    }

    #[test]
    fn test_full_arena_reports_zero_extremes() {
        let mut arena = Arena::new(ArenaConfig::new(64)).unwrap();
        arena.allocate(56).unwrap();
        let stats = arena.statistics();
        assert_eq!(stats.free_count, 0);
        assert_eq!(stats.largest_free, 0);
        assert_eq!(stats.smallest_free, 0);
        assert_eq!(stats.allocated_bytes, 64);
        assert!(stats.fragmentation().abs() < f64::EPSILON);
    }

    #[test]
    fn test_fragmented_arena() {
        let mut arena = Arena::new(ArenaConfig::new(128)).unwrap();
        let a = arena.allocate(24).unwrap();
        let _b = arena.allocate(8).unwrap();
        arena.deallocate(a);
        // free: [(48, 80), (0, 32)]
        let stats = arena.statistics();
        assert_eq!(stats.allocated_bytes, 16);
        assert_eq!(stats.allocated_count, 1);
        assert_eq!(stats.free_bytes, 112);
        assert_eq!(stats.free_count, 2);
        assert_eq!(stats.largest_free, 80);
        assert_eq!(stats.smallest_free, 32);
        assert!((stats.fragmentation() - 32.0 / 112.0).abs() < 1e-9);
    }
}
