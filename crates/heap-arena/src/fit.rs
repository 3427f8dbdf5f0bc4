//! Free block selection.

use core::cmp::Reverse;

use block_registry::BlockRegistry;

use crate::config::FitStrategy;

/// Picks the free block that should serve a request of `required` bytes.
///
/// `required` already includes [`HEADER_SIZE`](crate::HEADER_SIZE). Returns
/// the index of the chosen block in `free`, or `None` if no block is large
/// enough. Ties are broken in favour of the block that comes first in
/// registry order.
#[must_use]
pub fn select(strategy: FitStrategy, free: &BlockRegistry, required: usize) -> Option<usize> {
    let mut candidates = free
        .iter()
        .enumerate()
        .filter(|(_, block)| block.size >= required)
        .map(|(index, block)| (index, block.size - required));

    let chosen = match strategy {
        FitStrategy::FirstFit => candidates.next(),
        FitStrategy::BestFit => candidates.min_by_key(|&(_, leftover)| leftover),
        FitStrategy::WorstFit => candidates.min_by_key(|&(_, leftover)| Reverse(leftover)),
    };
    chosen.map(|(index, _)| index)
}
