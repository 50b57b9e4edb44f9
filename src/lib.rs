//! # rheap - A Bare-Metal Heap
//!
//! This crate provides the dynamic memory manager for firmware that runs
//! without an operating system: one fixed arena, handed over once at start-up,
//! served by a **bump cursor** and a small set of **size-class free lists**.
//!
//! ## Overview
//!
//! ```text
//!   Arena (supplied by the linker, never grown):
//!
//!   heap_low                                                        heap_top
//!   ┌──────┬──────┬──────────────┬──────┬─────────────────────────────────┐
//!   │ H|64 │ H|64 │   H|1024     │ H|64 │          never used             │
//!   └──────┴──────┴──────────────┴──────┴─────────────────────────────────┘
//!                                       ▲
//!                                       └── bump cursor (only moves right)
//!
//!   Size classes:   0x40 ──► [blk] ──► [blk] ──► null
//!                   0x400 ─► null
//!                   0x1000 ► null
//!                   ...
//!                   oversized (exact size) ──► [blk] ──► null
//! ```
//!
//! Every request is rounded up to the first size class that covers it. A
//! released block goes to the front of its class's list and is the next one
//! handed out for that class. Requests above the largest class are carved with
//! their exact size and, once released, only serve a later request of that
//! same size.
//!
//! ## Crate Structure
//!
//! ```text
//!   rheap
//!   ├── align      - Alignment macros (align!, align_up!)
//!   ├── arena      - Fixed region and bump cursor (internal)
//!   ├── block      - Block header and tags (internal)
//!   ├── class      - Size-class table (internal)
//!   ├── error      - HeapError, AllocError
//!   ├── heap       - Heap: allocate / release / zero_allocate / resize
//!   ├── global     - GlobalHeap: once-initialized, GlobalAlloc
//!   ├── host       - HostArena: mmap-backed region (feature "std")
//!   ├── trace      - Allocation trace and state dump (feature "mem-debug")
//!   └── ffi        - malloc / free / calloc / realloc (feature "c-api")
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rheap::{Heap, HostArena};
//!
//! fn main() {
//!     let arena = HostArena::new(1 << 20).unwrap();
//!     let mut heap = unsafe { Heap::new(arena.low(), arena.high()) }.unwrap();
//!
//!     let p = heap.allocate(100);       // served from the 0x400 class
//!     assert!(!p.is_null());
//!
//!     unsafe { heap.release(p) };
//!     assert_eq!(heap.allocate(200), p); // same class, same block
//! }
//! ```
//!
//! ## Failure Modes
//!
//! - **Exhaustion**: the cursor cannot advance within the arena. The call
//!   returns null and the cursor does not move.
//! - **Invalid pointer**: a pointer outside the carved region, or whose header
//!   tag is not the live tag (corruption, double release). Release ignores
//!   it; resize treats its capacity as 0.
//!
//! Nothing here panics or logs unless the `mem-debug` feature is enabled.
//!
//! ## Safety
//!
//! [`Heap`] is not synchronized. Share it through [`GlobalHeap`] or serialize
//! access yourself; neither is safe to call from an interrupt handler that
//! may preempt another allocation.

#![cfg_attr(not(any(test, feature = "std")), no_std)]

pub mod align;
mod arena;
mod block;
mod class;
mod error;
#[cfg(feature = "c-api")]
mod ffi;
mod global;
mod heap;
#[cfg(all(feature = "std", unix))]
mod host;
#[cfg(feature = "mem-debug")]
mod trace;

pub use block::HEADER_SIZE;
pub use class::{DEFAULT_CLASSES, MAX_CLASSES};
pub use error::{AllocError, HeapError};
pub use global::GlobalHeap;
pub use heap::{Heap, HeapSnapshot};
#[cfg(all(feature = "std", unix))]
pub use host::HostArena;
#[cfg(feature = "mem-debug")]
pub use trace::{ClassState, HeapState};

/// Alignment of every block header and every payload.
pub const BLOCK_ALIGN: usize = core::mem::align_of::<block::BlockHeader>();

const _: () = assert!(BLOCK_ALIGN >= core::mem::align_of::<u128>() && BLOCK_ALIGN >= core::mem::align_of::<f64>());
