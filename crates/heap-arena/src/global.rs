//! Process-wide arena.
//!
//! These functions operate on a single arena stored in a `static`
//! [`SharedArena`]. They exist for callers that want one heap per process and
//! do not want to pass a handle around; everything else should own an
//! [`Arena`](crate::Arena) or a [`SharedArena`] directly.
//!
//! ```
//! use heap_arena::{FitStrategy, global};
//!
//! global::initialize(4096, FitStrategy::FirstFit);
//! let addr = global::allocate(100).unwrap();
//! assert_eq!(global::available_memory(), 4096 - 108);
//! global::deallocate(addr);
//! print!("{}", global::statistics());
//! global::shutdown();
//! ```

use crate::{
    arena::BlockAddr,
    compact::Compaction,
    config::{ArenaConfig, FitStrategy},
    error,
    shared::SharedArena,
    stats::Statistics,
};

static ARENA: SharedArena = SharedArena::uninit();

/// Creates the process-wide arena.
///
/// # Panics
///
/// Panics with a rendered error report if `capacity` is zero, the arena is
/// already initialized, or the backing buffer cannot be obtained. With
/// `panic = "abort"` this terminates the process.
#[track_caller]
pub fn initialize(capacity: usize, strategy: FitStrategy) {
    let config = ArenaConfig::new(capacity).with_strategy(strategy);
    if let Err(err) = ARENA.initialize(config) {
        error::report(err);
    }
}

/// Releases the process-wide arena.
pub fn shutdown() {
    ARENA.shutdown();
}

pub fn allocate(size: usize) -> Option<BlockAddr> {
    ARENA.allocate(size)
}

pub fn deallocate(addr: impl Into<Option<BlockAddr>>) {
    ARENA.deallocate(addr);
}

#[must_use]
pub fn available_memory() -> usize {
    ARENA.available_memory()
}

pub fn compact() -> Compaction {
    ARENA.compact()
}

#[must_use]
pub fn statistics() -> Statistics {
    ARENA.statistics()
}

/// Returns the process-wide handle itself, for block access and the `try_`
/// operations.
#[must_use]
pub fn handle() -> &'static SharedArena {
    &ARENA
}
