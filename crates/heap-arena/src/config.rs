//! Arena configuration.

use alloc::string::{String, ToString as _};
use core::str::FromStr;

use derive_more::{Display, IsVariant};
use snafu::Snafu;

/// Bookkeeping overhead charged to every allocated block, in bytes.
///
/// Allocated descriptors record `requested + HEADER_SIZE` bytes; free
/// descriptors record raw bytes.
pub const HEADER_SIZE: usize = 8;

/// Arena capacities are rounded up to a multiple of this many bytes.
pub const ARENA_QUANTUM: usize = 64;

/// Placement policy used to pick a free block for an allocation request.
#[derive(Debug, Default, Display, Clone, Copy, PartialEq, Eq, Hash, IsVariant)]
pub enum FitStrategy {
    /// First free block, in registry order, that is large enough.
    #[default]
    #[display("first-fit")]
    FirstFit,
    /// Large-enough block leaving the smallest leftover.
    #[display("best-fit")]
    BestFit,
    /// Large-enough block leaving the largest leftover.
    #[display("worst-fit")]
    WorstFit,
}

/// Error returned when parsing an unknown [`FitStrategy`] name.
#[derive(Debug, Snafu)]
#[snafu(display("unknown fit strategy `{input}`, expected first-fit, best-fit or worst-fit"))]
pub struct ParseStrategyError {
    input: String,
}

impl FromStr for FitStrategy {
    type Err = ParseStrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first-fit" | "first" => Ok(Self::FirstFit),
            "best-fit" | "best" => Ok(Self::BestFit),
            "worst-fit" | "worst" => Ok(Self::WorstFit),
            _ => Err(ParseStrategyError {
                input: s.to_string(),
            }),
        }
    }
}

/// How a freed block is merged with adjacent free blocks.
#[derive(Debug, Default, Display, Clone, Copy, PartialEq, Eq, Hash, IsVariant)]
pub enum CoalescePolicy {
    /// Merge with the predecessor if one exists, otherwise with the successor.
    ///
    /// At most one merge happens per deallocation, so a block freed between
    /// two free neighbours leaves two free blocks behind.
    #[default]
    #[display("single-neighbor")]
    SingleNeighbor,
    /// Merge with the predecessor and then with the successor.
    #[display("bidirectional")]
    Bidirectional,
}

/// Parameters fixed when an arena is created.
///
/// # Examples
///
/// ```
/// use heap_arena::{ArenaConfig, CoalescePolicy, FitStrategy};
///
/// let config = ArenaConfig::new(1000)
///     .with_strategy(FitStrategy::BestFit)
///     .with_coalesce(CoalescePolicy::Bidirectional);
/// assert_eq!(config.rounded_capacity(), Some(1024));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArenaConfig {
    /// Requested capacity in bytes, before rounding.
    pub capacity: usize,
    /// Placement policy.
    pub strategy: FitStrategy,
    /// Merge policy applied on deallocation.
    pub coalesce: CoalescePolicy,
}

impl ArenaConfig {
    /// Creates a configuration with the default strategy and coalescing
    /// policy.
    #[must_use]
    pub const fn new(capacity: usize) -> Self {
        Self {
            capacity,
            strategy: FitStrategy::FirstFit,
            coalesce: CoalescePolicy::SingleNeighbor,
        }
    }

    #[must_use]
    pub const fn with_strategy(mut self, strategy: FitStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    #[must_use]
    pub const fn with_coalesce(mut self, coalesce: CoalescePolicy) -> Self {
        self.coalesce = coalesce;
        self
    }

    /// Returns the capacity rounded up to [`ARENA_QUANTUM`].
    ///
    /// Returns `None` if rounding overflows `usize`.
    #[must_use]
    pub const fn rounded_capacity(&self) -> Option<usize> {
        self.capacity.checked_next_multiple_of(ARENA_QUANTUM)
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rounded_capacity() {
        assert_eq!(ArenaConfig::new(1).rounded_capacity(), Some(64));
        assert_eq!(ArenaConfig::new(64).rounded_capacity(), Some(64));
        assert_eq!(ArenaConfig::new(65).rounded_capacity(), Some(128));
        assert_eq!(ArenaConfig::new(0).rounded_capacity(), Some(0));
        assert_eq!(ArenaConfig::new(usize::MAX).rounded_capacity(), None);
    }

    #[test]
    fn test_defaults() {
        let config = ArenaConfig::new(128);
        assert!(config.strategy.is_first_fit());
        assert!(config.coalesce.is_single_neighbor());
    }

    #[test]
    fn test_strategy_from_str() {
        assert_eq!("best-fit".parse::<FitStrategy>().unwrap(), FitStrategy::BestFit);
        assert_eq!("worst".parse::<FitStrategy>().unwrap(), FitStrategy::WorstFit);
        let err = "next-fit".parse::<FitStrategy>().unwrap_err();
        assert!(err.to_string().contains("`next-fit`"));
    }

    #[test]
    fn test_strategy_display() {
        assert_eq!(FitStrategy::WorstFit.to_string(), "worst-fit");
        assert_eq!(CoalescePolicy::Bidirectional.to_string(), "bidirectional");
    }
}
