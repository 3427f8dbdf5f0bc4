//! The arena and its allocation and deallocation engines.
//!
//! An [`Arena`] owns one zero-initialized byte buffer and two
//! [`BlockRegistry`] instances that partition it: the free registry and the
//! allocated registry. Between operations every byte of the buffer belongs to
//! exactly one block of one registry.
//!
//! # Block accounting
//!
//! ```text
//! Allocated block (descriptor size = requested + HEADER_SIZE):
//! ┌──────────────────────────────────┬──────────────────┐
//! │ Usable bytes (requested)         │ Header (8 bytes) │
//! └──────────────────────────────────┴──────────────────┘
//! ▲
//! └── BlockAddr returned to the caller (= descriptor origin)
//!
//! Free block (descriptor size = raw bytes):
//! ┌─────────────────────────────────────────────────────┐
//! │ Raw bytes                                           │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Allocation
//!
//! A request for `n` bytes needs `n + HEADER_SIZE` bytes. The request is
//! rejected up front if that exceeds the arena capacity or the total number
//! of free bytes. Otherwise the configured [`FitStrategy`] picks a free
//! block; an exact fit moves the block to the allocated registry as is, a
//! larger block is split and its tail appended to the free registry.
//!
//! # Deallocation
//!
//! The freed block is merged with the free block ending at its origin if
//! there is one, otherwise with the free block starting at its end, otherwise
//! appended to the free registry. With [`CoalescePolicy::Bidirectional`] a
//! predecessor merge is followed by a successor merge.

use alloc::vec::Vec;

use block_registry::{Block, BlockRegistry};
use derive_more::Display;
use snafu::{OptionExt as _, ResultExt as _, ensure};
use tracing::{debug, info, trace};

use crate::{
    config::{ArenaConfig, CoalescePolicy, FitStrategy, HEADER_SIZE},
    error::{
        self, AllocError, BufferUnavailableSnafu, CapacityOverflowSnafu, CorruptionError,
        DeallocError, EmptyFreeBlockSnafu, ExceedsCapacitySnafu, InitError,
        InsufficientMemorySnafu, InvalidSizeSnafu, NoFittingBlockSnafu, NullAddressSnafu,
        OutOfBoundsSnafu, OverlapSnafu, PartitionMismatchSnafu, UndersizedAllocationSnafu,
        UnknownAddressSnafu, ZeroCapacitySnafu,
    },
    fit,
};

/// Address of an allocation, expressed as a byte offset into its arena.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[display("{_0:#x}")]
pub struct BlockAddr(pub(crate) usize);

impl BlockAddr {
    /// Creates an address from a raw arena offset.
    #[must_use]
    pub const fn new(offset: usize) -> Self {
        Self(offset)
    }

    /// Returns the arena offset this address refers to.
    #[must_use]
    pub const fn offset(self) -> usize {
        self.0
    }
}

/// A fixed-capacity heap with explicit placement, coalescing and compaction.
///
/// `Arena` is not synchronized; wrap it in a
/// [`SharedArena`](crate::SharedArena) to share it between threads.
///
/// # Examples
///
/// ```
/// use heap_arena::{Arena, ArenaConfig, FitStrategy};
///
/// let mut arena = Arena::new(ArenaConfig::new(100).with_strategy(FitStrategy::BestFit)).unwrap();
/// assert_eq!(arena.capacity(), 128);
///
/// let addr = arena.allocate(24).unwrap();
/// arena.block_mut(addr).unwrap().copy_from_slice(&[7; 24]);
/// assert_eq!(arena.available_memory(), 128 - 32);
///
/// arena.deallocate(addr);
/// assert_eq!(arena.available_memory(), 128);
/// ```
#[derive(Debug)]
pub struct Arena {
    pub(crate) memory: Vec<u8>,
    capacity: usize,
    strategy: FitStrategy,
    coalesce: CoalescePolicy,
    pub(crate) free: BlockRegistry,
    pub(crate) allocated: BlockRegistry,
}

impl Arena {
    /// Creates an arena of `config.capacity` bytes rounded up to
    /// [`ARENA_QUANTUM`](crate::ARENA_QUANTUM).
    ///
    /// The buffer is zero-filled and the free registry starts with a single
    /// block spanning the whole arena.
    pub fn new(config: ArenaConfig) -> Result<Self, InitError> {
        ensure!(config.capacity > 0, ZeroCapacitySnafu);
        let capacity = config.rounded_capacity().context(CapacityOverflowSnafu {
            capacity: config.capacity,
        })?;

        let mut memory = Vec::new();
        memory
            .try_reserve_exact(capacity)
            .context(BufferUnavailableSnafu { capacity })?;
        memory.resize(capacity, 0);

        let mut free = BlockRegistry::new();
        free.push(Block::new(0, capacity));

        info!(
            requested = config.capacity,
            capacity,
            strategy = %config.strategy,
            coalesce = %config.coalesce,
            "arena initialized"
        );

        Ok(Self {
            memory,
            capacity,
            strategy: config.strategy,
            coalesce: config.coalesce,
            free,
            allocated: BlockRegistry::new(),
        })
    }

    /// Releases the backing buffer and both registries.
    pub fn shutdown(self) {
        info!(
            capacity = self.capacity,
            live_blocks = self.allocated.len(),
            "arena shut down"
        );
        drop(self);
    }

    /// Returns the rounded capacity in bytes.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn strategy(&self) -> FitStrategy {
        self.strategy
    }

    #[must_use]
    pub fn coalesce_policy(&self) -> CoalescePolicy {
        self.coalesce
    }

    /// Returns the number of free bytes, summed over all free blocks.
    #[must_use]
    pub fn available_memory(&self) -> usize {
        self.free.total_size()
    }

    /// Returns the free registry in registry order.
    #[must_use]
    pub fn free_blocks(&self) -> &[Block] {
        self.free.as_slice()
    }

    /// Returns the allocated registry in registry order.
    ///
    /// Allocated sizes include [`HEADER_SIZE`].
    #[must_use]
    pub fn allocated_blocks(&self) -> &[Block] {
        self.allocated.as_slice()
    }

    /// Allocates `size` usable bytes, returning `None` if the request is
    /// rejected.
    pub fn allocate(&mut self, size: usize) -> Option<BlockAddr> {
        self.try_allocate(size).ok()
    }

    /// Allocates `size` usable bytes, returning why the request was rejected
    /// on failure.
    ///
    /// A rejected request leaves the arena untouched.
    pub fn try_allocate(&mut self, size: usize) -> Result<BlockAddr, AllocError> {
        self.allocate_block(size)
            .inspect_err(|err| debug!(size, %err, "allocation rejected"))
    }

    fn allocate_block(&mut self, size: usize) -> Result<BlockAddr, AllocError> {
        ensure!(size > 0, InvalidSizeSnafu);

        let required = size.saturating_add(HEADER_SIZE);
        ensure!(
            required <= self.capacity,
            ExceedsCapacitySnafu {
                required,
                capacity: self.capacity,
            }
        );
        let available = self.available_memory();
        ensure!(
            required <= available,
            InsufficientMemorySnafu {
                required,
                available,
            }
        );

        let Some(index) = fit::select(self.strategy, &self.free, required) else {
            return NoFittingBlockSnafu {
                required,
                largest: self.free.largest().unwrap_or(0),
            }
            .fail();
        };

        let candidate = self.free.remove(index);
        let leftover = candidate.size - required;
        if leftover > 0 {
            let rest = Block::new(candidate.origin + required, leftover);
            self.free.push(rest);
            trace!(
                origin = candidate.origin,
                size = required,
                rest_origin = rest.origin,
                rest_size = rest.size,
                "split free block"
            );
        } else {
            trace!(
                origin = candidate.origin,
                size = required,
                "free block reused whole"
            );
        }
        self.allocated.push(Block::new(candidate.origin, required));

        self.debug_verify();
        Ok(BlockAddr(candidate.origin))
    }

    /// Returns an allocation to the free registry.
    ///
    /// `None` and addresses that do not start a live allocation are ignored.
    pub fn deallocate(&mut self, addr: impl Into<Option<BlockAddr>>) {
        if let Err(err) = self.try_deallocate(addr) {
            debug!(%err, "deallocation ignored");
        }
    }

    /// Returns an allocation to the free registry, reporting ignored
    /// requests as errors.
    ///
    /// On success returns the number of bytes handed back, header included.
    pub fn try_deallocate(
        &mut self,
        addr: impl Into<Option<BlockAddr>>,
    ) -> Result<usize, DeallocError> {
        let addr = addr.into().context(NullAddressSnafu)?;
        let index = self
            .allocated
            .position(|b| b.origin == addr.0)
            .context(UnknownAddressSnafu { addr })?;

        let freed = self.allocated.remove(index);
        self.release(freed);

        self.debug_verify();
        Ok(freed.size)
    }

    fn release(&mut self, freed: Block) {
        if let Some(pred) = self.free.position(|p| p.is_followed_by(&freed)) {
            self.free[pred].size += freed.size;
            let merged = self.free[pred];
            trace!(
                origin = merged.origin,
                size = merged.size,
                "merged with previous block"
            );

            if self.coalesce.is_bidirectional()
                && let Some(succ) = self.free.position(|s| merged.is_followed_by(s))
            {
                let successor = self.free.remove(succ);
                let pred = if succ < pred { pred - 1 } else { pred };
                self.free[pred].size += successor.size;
                trace!(
                    origin = merged.origin,
                    size = self.free[pred].size,
                    "merged with next block"
                );
            }
            return;
        }

        if let Some(succ) = self.free.position(|s| freed.is_followed_by(s)) {
            let merged = Block::new(freed.origin, freed.size + self.free[succ].size);
            self.free.replace(succ, merged);
            trace!(
                origin = merged.origin,
                size = merged.size,
                "merged with next block"
            );
            return;
        }

        self.free.push(freed);
        trace!(
            origin = freed.origin,
            size = freed.size,
            "added to free list without merging"
        );
    }

    /// Returns the usable bytes of the allocation starting at `addr`.
    #[must_use]
    pub fn block(&self, addr: BlockAddr) -> Option<&[u8]> {
        let block = self.allocated.find(|b| b.origin == addr.0)?;
        self.memory.get(block.origin..block.end() - HEADER_SIZE)
    }

    /// Returns the usable bytes of the allocation starting at `addr` for
    /// writing.
    pub fn block_mut(&mut self, addr: BlockAddr) -> Option<&mut [u8]> {
        let block = *self.allocated.find(|b| b.origin == addr.0)?;
        self.memory.get_mut(block.origin..block.end() - HEADER_SIZE)
    }

    /// Checks that the two registries exactly partition the arena.
    ///
    /// Every free block must be non-empty, every allocated block must be
    /// larger than its header, no block may extend past the arena end, no
    /// two blocks may overlap, and the sizes must add up to the capacity.
    pub fn verify(&self) -> Result<(), CorruptionError> {
        for block in &self.free {
            ensure!(block.size > 0, EmptyFreeBlockSnafu { block: *block });
        }
        for block in &self.allocated {
            ensure!(
                block.size > HEADER_SIZE,
                UndersizedAllocationSnafu { block: *block }
            );
        }

        let mut blocks = self
            .free
            .iter()
            .chain(&self.allocated)
            .copied()
            .collect::<Vec<_>>();
        for block in &blocks {
            ensure!(
                block.origin <= self.capacity && block.size <= self.capacity - block.origin,
                OutOfBoundsSnafu {
                    block: *block,
                    capacity: self.capacity,
                }
            );
        }
        blocks.sort_unstable_by_key(|b| b.origin);
        for pair in blocks.windows(2) {
            if let [first, second] = pair {
                ensure!(
                    !first.overlaps(second),
                    OverlapSnafu {
                        first: *first,
                        second: *second,
                    }
                );
            }
        }

        let free = self.free.total_size();
        let allocated = self.allocated.total_size();
        ensure!(
            free + allocated == self.capacity,
            PartitionMismatchSnafu {
                free,
                allocated,
                capacity: self.capacity,
            }
        );
        Ok(())
    }

    pub(crate) fn debug_verify(&self) {
        if cfg!(debug_assertions)
            && let Err(err) = self.verify()
        {
            error::report(err);
        }
    }
}
