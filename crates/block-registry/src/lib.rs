//! An insertion-ordered collection of block descriptors.
//!
//! `BlockRegistry` stores [`Block`] values (an origin offset plus a byte
//! count) in the order they were appended. It is the container behind the
//! free and allocated lists of an arena allocator: appends go to the end,
//! lookups are linear scans, and removal preserves the relative order of the
//! remaining blocks.
//!
//! Unlike an address-ordered free list, the registry never reorders or merges
//! blocks on its own. Callers that need address order ask for it explicitly
//! with [`BlockRegistry::sort_by_origin`].
//!
//! # Examples
//!
//! ```
//! use block_registry::{Block, BlockRegistry};
//!
//! let mut registry = BlockRegistry::new();
//! registry.push(Block::new(64, 32));
//! registry.push(Block::new(0, 64));
//!
//! assert_eq!(registry.len(), 2);
//! assert_eq!(registry.total_size(), 96);
//!
//! // Order is insertion order, not address order.
//! assert_eq!(registry.as_slice()[0].origin, 64);
//!
//! let index = registry.position(|b| b.origin == 0).unwrap();
//! let removed = registry.remove(index);
//! assert_eq!(removed, Block::new(0, 64));
//! ```
//!
//! # Performance
//!
//! - Append: amortized O(1)
//! - Search, remove, sum: O(n) where n is the number of blocks

#![cfg_attr(not(test), no_std)]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

extern crate alloc;

use alloc::vec::{self, Vec};
use core::{
    ops::{Index, IndexMut, Range},
    slice,
};

/// A span of arena bytes: `size` bytes starting at offset `origin`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Block {
    /// Offset of the first byte of the span.
    pub origin: usize,
    /// Number of bytes in the span.
    pub size: usize,
}

impl Block {
    /// Creates a new block descriptor.
    #[must_use]
    pub const fn new(origin: usize, size: usize) -> Self {
        Self { origin, size }
    }

    /// Returns the offset one past the last byte of the span.
    #[must_use]
    pub const fn end(&self) -> usize {
        self.origin + self.size
    }

    /// Returns the span as a half-open range.
    #[must_use]
    pub const fn range(&self) -> Range<usize> {
        self.origin..self.end()
    }

    /// Returns `true` if `next` starts exactly where this block ends.
    ///
    /// # Examples
    ///
    /// ```
    /// use block_registry::Block;
    ///
    /// let a = Block::new(0, 16);
    /// let b = Block::new(16, 8);
    /// assert!(a.is_followed_by(&b));
    /// assert!(!b.is_followed_by(&a));
    /// ```
    #[must_use]
    pub const fn is_followed_by(&self, next: &Self) -> bool {
        self.end() == next.origin
    }

    /// Returns `true` if the two spans share at least one byte.
    ///
    /// Empty spans never overlap anything.
    #[must_use]
    pub const fn overlaps(&self, other: &Self) -> bool {
        self.size > 0 && other.size > 0 && self.origin < other.end() && other.origin < self.end()
    }
}

/// An ordered collection of [`Block`] descriptors.
///
/// Blocks are kept in the order they were appended. Removal and replacement
/// keep the positions of all other blocks unchanged.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct BlockRegistry {
    blocks: Vec<Block>,
}

impl BlockRegistry {
    /// Creates a new empty `BlockRegistry`.
    ///
    /// # Examples
    ///
    /// ```
    /// use block_registry::BlockRegistry;
    ///
    /// let registry = BlockRegistry::new();
    /// assert!(registry.is_empty());
    /// ```
    #[must_use]
    pub const fn new() -> Self {
        Self { blocks: Vec::new() }
    }

    /// Returns the number of blocks in the registry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Returns `true` if the registry contains no blocks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Returns an iterator over the blocks in registry order.
    pub fn iter(&self) -> slice::Iter<'_, Block> {
        self.blocks.iter()
    }

    /// Returns a mutable iterator over the blocks in registry order.
    pub fn iter_mut(&mut self) -> slice::IterMut<'_, Block> {
        self.blocks.iter_mut()
    }

    /// Returns a slice containing all blocks in registry order.
    #[must_use]
    pub fn as_slice(&self) -> &[Block] {
        self.blocks.as_slice()
    }

    /// Appends a block at the end of the registry.
    pub fn push(&mut self, block: Block) {
        self.blocks.push(block);
    }

    /// Returns the index of the first block matching `pred`.
    pub fn position<P>(&self, pred: P) -> Option<usize>
    where
        P: FnMut(&Block) -> bool,
    {
        self.blocks.iter().position(pred)
    }

    /// Returns the first block matching `pred`.
    ///
    /// # Examples
    ///
    /// ```
    /// use block_registry::{Block, BlockRegistry};
    ///
    /// let registry: BlockRegistry = [Block::new(0, 8), Block::new(8, 32)].into_iter().collect();
    /// assert_eq!(registry.find(|b| b.size > 16), Some(&Block::new(8, 32)));
    /// assert_eq!(registry.find(|b| b.size > 64), None);
    /// ```
    pub fn find<P>(&self, mut pred: P) -> Option<&Block>
    where
        P: FnMut(&Block) -> bool,
    {
        self.blocks.iter().find(|b| pred(b))
    }

    /// Returns the block at `index`, if any.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index)
    }

    /// Returns a mutable reference to the block at `index`, if any.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Block> {
        self.blocks.get_mut(index)
    }

    /// Removes and returns the block at `index`.
    ///
    /// The relative order of the remaining blocks is preserved.
    ///
    /// # Panics
    ///
    /// Panics if the registry is empty or `index` is out of bounds.
    pub fn remove(&mut self, index: usize) -> Block {
        assert!(!self.blocks.is_empty(), "Cannot remove from an empty registry");
        assert!(
            index < self.blocks.len(),
            "Block index out of bounds: {index} >= {}",
            self.blocks.len()
        );
        self.blocks.remove(index)
    }

    /// Replaces the block at `index` with `block`, returning the old block.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    ///
    /// # Examples
    ///
    /// ```
    /// use block_registry::{Block, BlockRegistry};
    ///
    /// let mut registry: BlockRegistry = [Block::new(0, 8), Block::new(8, 8)].into_iter().collect();
    /// let old = registry.replace(0, Block::new(0, 16));
    /// assert_eq!(old, Block::new(0, 8));
    /// assert_eq!(registry.as_slice(), &[Block::new(0, 16), Block::new(8, 8)]);
    /// ```
    pub fn replace(&mut self, index: usize, block: Block) -> Block {
        let len = self.blocks.len();
        let Some(slot) = self.blocks.get_mut(index) else {
            panic!("Block index out of bounds: {index} >= {len}");
        };
        core::mem::replace(slot, block)
    }

    /// Removes every block from the registry.
    pub fn clear(&mut self) {
        self.blocks.clear();
    }

    /// Returns the sum of the sizes of all blocks.
    #[must_use]
    pub fn total_size(&self) -> usize {
        self.blocks.iter().map(|b| b.size).sum()
    }

    /// Returns the largest block size, or `None` if the registry is empty.
    #[must_use]
    pub fn largest(&self) -> Option<usize> {
        self.blocks.iter().map(|b| b.size).max()
    }

    /// Returns the smallest block size, or `None` if the registry is empty.
    #[must_use]
    pub fn smallest(&self) -> Option<usize> {
        self.blocks.iter().map(|b| b.size).min()
    }

    /// Stably sorts the blocks by ascending origin.
    ///
    /// # Examples
    ///
    /// ```
    /// use block_registry::{Block, BlockRegistry};
    ///
    /// let mut registry: BlockRegistry =
    ///     [Block::new(32, 8), Block::new(0, 8), Block::new(16, 8)].into_iter().collect();
    /// registry.sort_by_origin();
    ///
    /// let origins: Vec<_> = registry.iter().map(|b| b.origin).collect();
    /// assert_eq!(origins, vec![0, 16, 32]);
    /// ```
    pub fn sort_by_origin(&mut self) {
        self.blocks.sort_by_key(|b| b.origin);
    }
}

impl Index<usize> for BlockRegistry {
    type Output = Block;

    fn index(&self, index: usize) -> &Self::Output {
        &self.blocks[index]
    }
}

impl IndexMut<usize> for BlockRegistry {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.blocks[index]
    }
}

impl FromIterator<Block> for BlockRegistry {
    fn from_iter<T: IntoIterator<Item = Block>>(iter: T) -> Self {
        let mut this = Self::new();
        this.extend(iter);
        this
    }
}

impl Extend<Block> for BlockRegistry {
    fn extend<T: IntoIterator<Item = Block>>(&mut self, iter: T) {
        for block in iter {
            self.push(block);
        }
    }
}

impl IntoIterator for BlockRegistry {
    type Item = Block;
    type IntoIter = vec::IntoIter<Block>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.into_iter()
    }
}

impl<'a> IntoIterator for &'a BlockRegistry {
    type Item = &'a Block;
    type IntoIter = slice::Iter<'a, Block>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.iter()
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use super::*;

    fn registry(blocks: &[(usize, usize)]) -> BlockRegistry {
        blocks.iter().map(|&(o, s)| Block::new(o, s)).collect()
    }

    #[test]
    fn test_push_keeps_insertion_order() {
        let mut reg = BlockRegistry::new();
        reg.push(Block::new(128, 8));
        reg.push(Block::new(0, 8));
        reg.push(Block::new(64, 8));
        let origins: Vec<_> = reg.iter().map(|b| b.origin).collect();
        assert_eq!(origins, vec![128, 0, 64]);
    }

    #[test]
    fn test_remove_preserves_order() {
        let mut reg = registry(&[(0, 8), (8, 8), (16, 8), (24, 8)]);
        let removed = reg.remove(1);
        assert_eq!(removed, Block::new(8, 8));
        assert_eq!(
            reg.as_slice(),
            &[Block::new(0, 8), Block::new(16, 8), Block::new(24, 8)]
        );
    }

    #[test]
    #[should_panic(expected = "Cannot remove from an empty registry")]
    fn test_remove_from_empty() {
        let mut reg = BlockRegistry::new();
        reg.remove(0);
    }

    #[test]
    #[should_panic(expected = "Block index out of bounds: 3 >= 2")]
    fn test_remove_out_of_bounds() {
        let mut reg = registry(&[(0, 8), (8, 8)]);
        reg.remove(3);
    }

    #[test]
    #[should_panic(expected = "Block index out of bounds: 5 >= 1")]
    fn test_replace_out_of_bounds() {
        let mut reg = registry(&[(0, 8)]);
        reg.replace(5, Block::new(0, 16));
    }

    #[test]
    fn test_position_and_find() {
        let reg = registry(&[(0, 40), (40, 100), (140, 64)]);
        assert_eq!(reg.position(|b| b.size >= 72), Some(1));
        assert_eq!(reg.find(|b| b.origin == 140), Some(&Block::new(140, 64)));
        assert_eq!(reg.position(|b| b.size > 1000), None);
    }

    #[test]
    fn test_total_size_and_extremes() {
        let reg = registry(&[(0, 40), (40, 100), (140, 64)]);
        assert_eq!(reg.total_size(), 204);
        assert_eq!(reg.largest(), Some(100));
        assert_eq!(reg.smallest(), Some(40));

        let empty = BlockRegistry::new();
        assert_eq!(empty.total_size(), 0);
        assert_eq!(empty.largest(), None);
        assert_eq!(empty.smallest(), None);
    }

    #[test]
    fn test_get_mut_updates_in_place() {
        let mut reg = registry(&[(0, 8), (8, 8)]);
        reg.get_mut(0).unwrap().size += 8;
        assert_eq!(reg.get(0), Some(&Block::new(0, 16)));
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn test_sort_by_origin_is_stable() {
        let mut reg = registry(&[(16, 8), (0, 0), (0, 8), (8, 8)]);
        reg.sort_by_origin();
        assert_eq!(
            reg.as_slice(),
            &[
                Block::new(0, 0),
                Block::new(0, 8),
                Block::new(8, 8),
                Block::new(16, 8)
            ]
        );
    }

    #[test]
    fn test_index_mut() {
        let mut reg = registry(&[(0, 8), (8, 8)]);
        reg[1].size = 24;
        assert_eq!(reg[1], Block::new(8, 24));
    }

    #[test]
    fn test_clear() {
        let mut reg = registry(&[(0, 8), (8, 8)]);
        reg.clear();
        assert!(reg.is_empty());
        assert_eq!(reg.len(), 0);
    }

    #[test]
    fn test_block_adjacency_and_overlap() {
        let a = Block::new(0, 16);
        let b = Block::new(16, 16);
        let c = Block::new(8, 16);
        assert!(a.is_followed_by(&b));
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
        assert!(c.overlaps(&b));
        assert!(!Block::new(4, 0).overlaps(&a));
        assert_eq!(a.range(), 0..16);
    }

    #[test]
    fn test_into_iter() {
        let reg = registry(&[(0, 8), (8, 16)]);
        let blocks: Vec<_> = reg.into_iter().collect();
        assert_eq!(blocks, vec![Block::new(0, 8), Block::new(8, 16)]);
    }
}
