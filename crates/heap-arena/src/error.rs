//! Error types and the fatal error path.
//!
//! Rejected requests are ordinary values: `allocate` and `deallocate` return
//! sentinels, and their `try_` variants return one of the enums below so the
//! caller can see why. Only two situations are fatal: the backing buffer
//! cannot be obtained by [`global::initialize`](crate::global::initialize),
//! and a registry invariant is found broken in a debug build. Both go through
//! [`report`].

use alloc::collections::TryReserveError;
use core::{error::Error, fmt};

use block_registry::Block;
use snafu::{GenerateImplicitData, Snafu};

use crate::arena::BlockAddr;

/// Source location captured when an error is constructed.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Location(&'static core::panic::Location<'static>);

impl Default for Location {
    #[track_caller]
    fn default() -> Self {
        Self(core::panic::Location::caller())
    }
}

impl GenerateImplicitData for Location {
    #[track_caller]
    fn generate() -> Self {
        Self::default()
    }
}

impl fmt::Debug for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Errors that carry the location they were raised at.
pub trait Located {
    fn location(&self) -> Location;
}

/// Failure to create an arena.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum InitError {
    #[snafu(display("arena capacity must be greater than zero"))]
    ZeroCapacity {
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("arena capacity {capacity} overflows when rounded to the arena quantum"))]
    CapacityOverflow {
        capacity: usize,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("arena is already initialized"))]
    AlreadyInitialized {
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("failed to obtain a {capacity} byte backing buffer: {source}"))]
    BufferUnavailable {
        capacity: usize,
        #[snafu(implicit)]
        location: Location,
        #[snafu(source)]
        source: TryReserveError,
    },
}

/// Reason an allocation request was rejected.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum AllocError {
    #[snafu(display("requested size must be greater than zero"))]
    InvalidSize {
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("{required} bytes exceed the arena capacity of {capacity} bytes"))]
    ExceedsCapacity {
        required: usize,
        capacity: usize,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("{required} bytes requested but only {available} bytes are free"))]
    InsufficientMemory {
        required: usize,
        available: usize,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("no free block holds {required} bytes (largest is {largest} bytes)"))]
    NoFittingBlock {
        required: usize,
        largest: usize,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("arena is not initialized"))]
    AllocUninitialized {
        #[snafu(implicit)]
        location: Location,
    },
}

/// Reason a deallocation request was ignored.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DeallocError {
    #[snafu(display("null address"))]
    NullAddress {
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("no allocated block starts at {addr}"))]
    UnknownAddress {
        addr: BlockAddr,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("arena is not initialized"))]
    DeallocUninitialized {
        #[snafu(implicit)]
        location: Location,
    },
}

/// A broken registry invariant.
///
/// These never arise from caller input; they indicate a bookkeeping bug.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CorruptionError {
    #[snafu(display(
        "registries cover {free} free + {allocated} allocated bytes, expected {capacity}"
    ))]
    PartitionMismatch {
        free: usize,
        allocated: usize,
        capacity: usize,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("blocks {first:?} and {second:?} overlap"))]
    Overlap {
        first: Block,
        second: Block,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("block {block:?} extends past the arena end at {capacity}"))]
    OutOfBounds {
        block: Block,
        capacity: usize,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("free block {block:?} is empty"))]
    EmptyFreeBlock {
        block: Block,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("allocated block {block:?} is smaller than its header"))]
    UndersizedAllocation {
        block: Block,
        #[snafu(implicit)]
        location: Location,
    },
}

macro_rules! impl_located {
    ($ty:ty { $($variant:ident),* $(,)? }) => {
        impl Located for $ty {
            fn location(&self) -> Location {
                match self {
                    $(Self::$variant { location, .. })|* => *location,
                }
            }
        }
    };
}

impl_located!(InitError {
    ZeroCapacity,
    CapacityOverflow,
    AlreadyInitialized,
    BufferUnavailable,
});
impl_located!(AllocError {
    InvalidSize,
    ExceedsCapacity,
    InsufficientMemory,
    NoFittingBlock,
    AllocUninitialized,
});
impl_located!(DeallocError {
    NullAddress,
    UnknownAddress,
    DeallocUninitialized,
});
impl_located!(CorruptionError {
    PartitionMismatch,
    Overlap,
    OutOfBounds,
    EmptyFreeBlock,
    UndersizedAllocation,
});

/// Renders an error with its location and source chain.
pub struct Report<E> {
    error: E,
}

impl<E> Report<E> {
    pub fn new(error: E) -> Self {
        Self { error }
    }
}

impl<E> fmt::Debug for Report<E>
where
    E: Error + Located,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl<E> fmt::Display for Report<E>
where
    E: Error + Located,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Error: {}", self.error)?;
        writeln!(f, "  at {}", self.error.location())?;
        let mut source = self.error.source();
        if source.is_some() {
            writeln!(f)?;
            writeln!(f, "Caused by:")?;
        }
        let mut index = 0;
        while let Some(s) = source {
            writeln!(f, "{index:4}: {s}")?;
            source = s.source();
            index += 1;
        }
        Ok(())
    }
}

/// Aborts with a rendered report of `err`.
#[track_caller]
pub fn report<E>(err: E) -> !
where
    E: Error + Located,
{
    tracing::error!(error = %err, "critical arena error");
    panic!("Critical arena error occurred\n\n{}", Report::new(err));
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use snafu::IntoError as _;

    use super::*;

    #[test]
    fn test_report_includes_location() {
        let err = ZeroCapacitySnafu.build();
        let rendered = Report::new(err).to_string();
        assert!(rendered.starts_with("Error: arena capacity must be greater than zero\n"));
        assert!(rendered.contains("error.rs"));
        assert!(!rendered.contains("Caused by:"));
    }

    #[test]
    fn test_report_includes_source_chain() {
        let mut buf = Vec::<u8>::new();
        let source = buf.try_reserve_exact(usize::MAX).unwrap_err();
        let err = BufferUnavailableSnafu { capacity: 64usize }.into_error(source);
        let rendered = Report::new(err).to_string();
        assert!(rendered.contains("failed to obtain a 64 byte backing buffer"));
        assert!(rendered.contains("Caused by:"));
    }

    #[test]
    #[should_panic(expected = "Critical arena error occurred")]
    fn test_report_panics() {
        report(InvalidSizeSnafu.build());
    }
}
