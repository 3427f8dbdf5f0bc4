//! A lock-protected arena handle.
//!
//! [`SharedArena`] serializes every operation behind one spin lock. Each
//! public method takes the lock once, runs to completion on the inner
//! [`Arena`] and releases it before returning; nothing inside takes the lock
//! again. The handle starts out empty when created with
//! [`SharedArena::uninit`], which makes it usable as a `static`.

use spin::Mutex;
use tracing::debug;

use crate::{
    arena::{Arena, BlockAddr},
    compact::Compaction,
    config::ArenaConfig,
    error::{
        AllocError, AllocUninitializedSnafu, AlreadyInitializedSnafu, DeallocError,
        DeallocUninitializedSnafu, InitError,
    },
    stats::Statistics,
};

/// An [`Arena`] behind a mutual-exclusion lock.
///
/// Operations on a handle that has not been initialized, or has been shut
/// down, are treated as rejected requests.
///
/// # Examples
///
/// ```
/// use heap_arena::{ArenaConfig, SharedArena};
///
/// static ARENA: SharedArena = SharedArena::uninit();
///
/// ARENA.initialize(ArenaConfig::new(256)).unwrap();
/// let addr = ARENA.allocate(32).unwrap();
/// ARENA.with_block_mut(addr, |bytes| bytes.fill(1));
/// assert_eq!(ARENA.with_block(addr, |bytes| bytes.iter().map(|&b| usize::from(b)).sum::<usize>()), Some(32));
/// ARENA.deallocate(addr);
/// ARENA.shutdown();
/// assert_eq!(ARENA.allocate(32), None);
/// ```
#[derive(Debug)]
pub struct SharedArena {
    inner: Mutex<Option<Arena>>,
}

impl Default for SharedArena {
    fn default() -> Self {
        Self::uninit()
    }
}

impl SharedArena {
    /// Creates a handle with no arena behind it.
    #[must_use]
    pub const fn uninit() -> Self {
        Self {
            inner: Mutex::new(None),
        }
    }

    /// Creates a handle around a new arena.
    pub fn new(config: ArenaConfig) -> Result<Self, InitError> {
        let arena = Arena::new(config)?;
        Ok(Self {
            inner: Mutex::new(Some(arena)),
        })
    }

    /// Creates the arena behind an uninitialized handle.
    pub fn initialize(&self, config: ArenaConfig) -> Result<(), InitError> {
        let mut inner = self.inner.lock();
        if inner.is_some() {
            return AlreadyInitializedSnafu.fail();
        }
        *inner = Some(Arena::new(config)?);
        Ok(())
    }

    /// Releases the arena; the handle can be initialized again afterwards.
    pub fn shutdown(&self) {
        let arena = self.inner.lock().take();
        match arena {
            Some(arena) => arena.shutdown(),
            None => debug!("shutdown of an uninitialized arena ignored"),
        }
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.inner.lock().is_some()
    }

    pub fn allocate(&self, size: usize) -> Option<BlockAddr> {
        self.inner.lock().as_mut()?.allocate(size)
    }

    pub fn try_allocate(&self, size: usize) -> Result<BlockAddr, AllocError> {
        match self.inner.lock().as_mut() {
            Some(arena) => arena.try_allocate(size),
            None => AllocUninitializedSnafu.fail(),
        }
    }

    pub fn deallocate(&self, addr: impl Into<Option<BlockAddr>>) {
        if let Some(arena) = self.inner.lock().as_mut() {
            arena.deallocate(addr);
        }
    }

    pub fn try_deallocate(
        &self,
        addr: impl Into<Option<BlockAddr>>,
    ) -> Result<usize, DeallocError> {
        match self.inner.lock().as_mut() {
            Some(arena) => arena.try_deallocate(addr),
            None => DeallocUninitializedSnafu.fail(),
        }
    }

    /// Returns the number of free bytes, 0 if uninitialized.
    #[must_use]
    pub fn available_memory(&self) -> usize {
        self.inner.lock().as_ref().map_or(0, Arena::available_memory)
    }

    /// Compacts the arena; reports a capacity of 0 if uninitialized.
    pub fn compact(&self) -> Compaction {
        self.inner
            .lock()
            .as_mut()
            .map_or(Compaction::Skipped { capacity: 0 }, Arena::compact)
    }

    /// Returns usage statistics, all zero if uninitialized.
    #[must_use]
    pub fn statistics(&self) -> Statistics {
        self.inner
            .lock()
            .as_ref()
            .map(Arena::statistics)
            .unwrap_or_default()
    }

    /// Runs `f` over the usable bytes of the allocation at `addr`.
    pub fn with_block<F, R>(&self, addr: BlockAddr, f: F) -> Option<R>
    where
        F: FnOnce(&[u8]) -> R,
    {
        let inner = self.inner.lock();
        inner.as_ref()?.block(addr).map(f)
    }

    /// Runs `f` over the usable bytes of the allocation at `addr` for
    /// writing.
    pub fn with_block_mut<F, R>(&self, addr: BlockAddr, f: F) -> Option<R>
    where
        F: FnOnce(&mut [u8]) -> R,
    {
        let mut inner = self.inner.lock();
        inner.as_mut()?.block_mut(addr).map(f)
    }

    /// Runs `f` with exclusive access to the arena.
    pub fn with_arena<F, R>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&mut Arena) -> R,
    {
        self.inner.lock().as_mut().map(f)
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use super::*;

    #[test]
    fn test_uninitialized_rejects_everything() {
        let shared = SharedArena::uninit();
        assert!(!shared.is_initialized());
        assert_eq!(shared.allocate(8), None);
        assert!(matches!(
            shared.try_allocate(8),
            Err(AllocError::AllocUninitialized { .. })
        ));
        assert!(matches!(
            shared.try_deallocate(BlockAddr::new(0)),
            Err(DeallocError::DeallocUninitialized { .. })
        ));
        shared.deallocate(BlockAddr::new(0));
        assert_eq!(shared.available_memory(), 0);
        assert_eq!(shared.compact(), Compaction::Skipped { capacity: 0 });
        assert_eq!(shared.statistics(), Statistics::default());
        shared.shutdown();
    }

    #[test]
    fn test_initialize_twice_fails() {
        let shared = SharedArena::uninit();
        shared.initialize(ArenaConfig::new(64)).unwrap();
        assert!(matches!(
            shared.initialize(ArenaConfig::new(64)),
            Err(InitError::AlreadyInitialized { .. })
        ));
        shared.shutdown();
        shared.initialize(ArenaConfig::new(128)).unwrap();
        assert_eq!(shared.available_memory(), 128);
    }

    #[test]
    fn test_block_access_under_lock() {
        let shared = SharedArena::new(ArenaConfig::new(64)).unwrap();
        let addr = shared.allocate(4).unwrap();
        shared.with_block_mut(addr, |bytes| bytes.copy_from_slice(b"abcd"));
        assert_eq!(shared.with_block(addr, <[u8]>::to_vec), Some(b"abcd".to_vec()));
        assert_eq!(shared.with_block(BlockAddr::new(1), <[u8]>::len), None);
        assert_eq!(shared.with_arena(|arena| arena.capacity()), Some(64));
    }

    #[test]
    fn test_concurrent_allocations_stay_consistent() {
        let shared = Arc::new(SharedArena::new(ArenaConfig::new(64 * 1024)).unwrap());

        let handles = (0..8u8)
            .map(|id| {
                let shared = Arc::clone(&shared);
                thread::spawn(move || {
                    let mut live = Vec::new();
                    for round in 0..200usize {
                        let size = 1 + (round * 7 + usize::from(id) * 13) % 96;
                        if let Some(addr) = shared.allocate(size) {
                            shared.with_block_mut(addr, |bytes| bytes.fill(id));
                            live.push(addr);
                        }
                        if round % 3 == 0
                            && let Some(addr) = live.pop()
                        {
                            let intact =
                                shared.with_block(addr, |bytes| bytes.iter().all(|&b| b == id));
                            assert_eq!(intact, Some(true));
                            shared.deallocate(addr);
                        }
                    }
                    for addr in live {
                        shared.deallocate(addr);
                    }
                })
            })
            .collect::<Vec<_>>();

        for handle in handles {
            handle.join().unwrap();
        }

        let stats = shared.statistics();
        assert_eq!(stats.allocated_count, 0);
        assert_eq!(stats.free_bytes, 64 * 1024);
        shared.with_arena(|arena| arena.verify().unwrap()).unwrap();
    }
}
