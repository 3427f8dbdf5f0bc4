//! Compaction of live allocations.
//!
//! Compaction slides every allocated block towards the start of the arena so
//! that all free space ends up in one block at the end. The allocated
//! registry is first put in address order, then walked once: each block that
//! does not start where the previous one ended (or at offset 0 for the first
//! block) is moved down, header included.
//!
//! Moving a block changes its address. The returned [`Compaction`] lists
//! every move so callers can fix up the addresses they hold.

use alloc::vec::Vec;

use block_registry::Block;
use derive_more::IsVariant;
use tracing::{debug, trace};

use crate::arena::{Arena, BlockAddr};

/// One block moved by compaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Relocation {
    /// Address before compaction.
    pub from: BlockAddr,
    /// Address after compaction.
    pub to: BlockAddr,
}

/// Outcome of [`Arena::compact`].
#[derive(Debug, Clone, PartialEq, Eq, IsVariant)]
pub enum Compaction {
    /// There was no free space to gather; carries the arena capacity.
    Skipped { capacity: usize },
    /// Blocks were moved, in the order listed.
    Compacted(Vec<Relocation>),
}

impl Compaction {
    /// Returns the relocations performed, empty if compaction was skipped.
    #[must_use]
    pub fn relocations(&self) -> &[Relocation] {
        match self {
            Self::Skipped { .. } => &[],
            Self::Compacted(relocations) => relocations,
        }
    }

    /// Returns the number of blocks moved.
    #[must_use]
    pub fn count(&self) -> usize {
        self.relocations().len()
    }

    /// Maps an address obtained before compaction to its current value.
    ///
    /// Addresses of blocks that did not move are returned unchanged.
    ///
    /// # Examples
    ///
    /// ```
    /// use heap_arena::{Arena, ArenaConfig};
    ///
    /// let mut arena = Arena::new(ArenaConfig::new(128)).unwrap();
    /// let a = arena.allocate(24).unwrap();
    /// let b = arena.allocate(24).unwrap();
    /// arena.deallocate(a);
    ///
    /// let compaction = arena.compact();
    /// let b = compaction.translate(b);
    /// assert_eq!(b.offset(), 0);
    /// assert!(arena.block(b).is_some());
    /// ```
    #[must_use]
    pub fn translate(&self, addr: BlockAddr) -> BlockAddr {
        self.relocations()
            .iter()
            .find(|r| r.from == addr)
            .map_or(addr, |r| r.to)
    }
}

impl Arena {
    /// Moves all allocated blocks to the start of the arena.
    ///
    /// Returns [`Compaction::Skipped`] without touching anything if no byte
    /// is free. Otherwise every gap is closed, the free registry is replaced
    /// by a single block running from the end of the last allocated block to
    /// the end of the arena, and the moves are returned in address order.
    ///
    /// Addresses handed out before this call must be passed through
    /// [`Compaction::translate`] before they are used again.
    pub fn compact(&mut self) -> Compaction {
        if self.available_memory() == 0 || self.free.is_empty() {
            debug!(capacity = self.capacity(), "compaction skipped, nothing free");
            return Compaction::Skipped {
                capacity: self.capacity(),
            };
        }

        // Registry order is allocation order; gaps are only meaningful between
        // address neighbours.
        self.allocated.sort_by_origin();

        let mut relocations = Vec::new();
        let mut cursor = 0;
        for block in self.allocated.iter_mut() {
            if block.origin > cursor {
                self.memory.copy_within(block.range(), cursor);
                let relocation = Relocation {
                    from: BlockAddr::new(block.origin),
                    to: BlockAddr::new(cursor),
                };
                trace!(
                    from = %relocation.from,
                    to = %relocation.to,
                    size = block.size,
                    "relocated block"
                );
                relocations.push(relocation);
                block.origin = cursor;
            }
            cursor = block.end();
        }

        let capacity = self.capacity();
        self.free.clear();
        self.free.push(Block::new(cursor, capacity - cursor));

        debug!(
            moved = relocations.len(),
            free_origin = cursor,
            free_size = capacity - cursor,
            "compaction finished"
        );
        self.debug_verify();
        Compaction::Compacted(relocations)
    }
}
