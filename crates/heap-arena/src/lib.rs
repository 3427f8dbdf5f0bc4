//! A fixed-capacity heap with selectable placement and explicit compaction.
//!
//! This crate manages one contiguous byte buffer, the *arena*, independently
//! of the platform allocator. Every byte of the arena is tracked by exactly
//! one block descriptor in one of two registries: the free registry and the
//! allocated registry. The crate is `no_std` and only needs `alloc` for the
//! buffer and the registries.
//!
//! # Overview
//!
//! ```text
//!   Arena (capacity rounded up to 64 bytes):
//!
//!   ┌────────┬────────┬──────────┬────────┬──────────────────────────┐
//!   │ alloc  │  free  │  alloc   │  free  │          free            │
//!   └────────┴────────┴──────────┴────────┴──────────────────────────┘
//!
//!   after compact():
//!
//!   ┌────────┬──────────┬──────────────────────────────────────────────┐
//!   │ alloc  │  alloc   │                  free                        │
//!   └────────┴──────────┴──────────────────────────────────────────────┘
//! ```
//!
//! - **Placement**: [`FitStrategy::FirstFit`], [`FitStrategy::BestFit`] or
//!   [`FitStrategy::WorstFit`] picks the free block that serves a request.
//! - **Splitting**: the unused tail of a chosen block goes back to the free
//!   registry.
//! - **Coalescing**: a freed block is merged with an adjacent free block.
//! - **Compaction**: [`Arena::compact`] slides live blocks down and reports
//!   every address change as a [`Relocation`].
//!
//! Each allocation is charged [`HEADER_SIZE`] bytes of overhead on top of
//! the requested size.
//!
//! # Usage
//!
//! ```rust
//! use heap_arena::{Arena, ArenaConfig, FitStrategy};
//!
//! let mut arena = Arena::new(ArenaConfig::new(1024).with_strategy(FitStrategy::BestFit)).unwrap();
//!
//! let a = arena.allocate(100).unwrap();
//! let b = arena.allocate(200).unwrap();
//! arena.block_mut(b).unwrap().fill(0xff);
//!
//! arena.deallocate(a);
//! let compaction = arena.compact();
//! let b = compaction.translate(b);
//! assert!(arena.block(b).unwrap().iter().all(|&x| x == 0xff));
//!
//! println!("{}", arena.statistics());
//! ```
//!
//! # Rejected requests
//!
//! Allocation and deallocation never fail loudly. [`Arena::allocate`]
//! returns `None` and [`Arena::deallocate`] ignores null or unknown
//! addresses; [`Arena::try_allocate`] and [`Arena::try_deallocate`] return
//! the reason instead.
//!
//! # Thread Safety
//!
//! [`Arena`] is `Send` but needs `&mut` access for every mutation.
//! [`SharedArena`] wraps it in a spin lock, and [`global`] exposes one
//! process-wide `SharedArena` through free functions.

#![cfg_attr(not(test), no_std)]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

extern crate alloc;

mod arena;
mod compact;
mod config;
pub mod error;
mod fit;
pub mod global;
mod shared;
mod stats;

pub use block_registry::Block;

pub use self::{
    arena::{Arena, BlockAddr},
    compact::{Compaction, Relocation},
    config::{
        ARENA_QUANTUM, ArenaConfig, CoalescePolicy, FitStrategy, HEADER_SIZE, ParseStrategyError,
    },
    error::{AllocError, CorruptionError, DeallocError, InitError},
    shared::SharedArena,
    stats::Statistics,
};
