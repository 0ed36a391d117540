//! # brkalloc - A Free-List Memory Allocator Library
//!
//! This crate provides a **free-list heap allocator** that manages a single
//! contiguous region obtained from the operating system by moving the
//! program break with the `sbrk` system call.
//!
//! ## Overview
//!
//! The heap is covered end to end by blocks, each carrying an in-band
//! header linked to its address-order neighbors:
//!
//! ```text
//!   Program Memory Layout:
//!
//!   High Address ┌─────────────────────┐
//!                │       Stack         │ ↓ grows down
//!                │         │           │
//!                │         ▼           │
//!                │                     │
//!                │         ▲           │
//!                │         │           │
//!                │       Heap          │ ↑ grows up (sbrk)
//!                ├─────────────────────┤ ← Program Break
//!                │   Uninitialized     │
//!                │       Data          │
//!                ├─────────────────────┤
//!                │   Initialized       │
//!                │       Data          │
//!                ├─────────────────────┤
//!                │       Text          │
//!   Low Address  └─────────────────────┘
//!
//!   Single Block:
//!   ┌───────────────────────┬────────────────────────────────┐
//!   │    Block Header       │         User Data              │
//!   │  ┌─────────────────┐  │                                │
//!   │  │ size: N         │  │  ┌──────────────────────────┐  │
//!   │  │ free: false     │  │  │                          │  │
//!   │  │ prev: null/ptr  │  │  │     N bytes usable       │  │
//!   │  │ next: null/ptr  │  │  │                          │  │
//!   │  └─────────────────┘  │  └──────────────────────────┘  │
//!   └───────────────────────┴────────────────────────────────┘
//!                           ▲
//!                           └── Pointer returned to user
//! ```
//!
//! Allocation is **first fit**: the first free block large enough for the
//! request is split or consumed in place; only when no block fits does the
//! heap grow, by whole pages. Released blocks merge with free neighbors,
//! and whole pages at the top of the heap flow back to the OS.
//!
//! ## Crate Structure
//!
//! ```text
//!   brkalloc
//!   ├── align      - Rounding macros (pad_to!, round_to!)
//!   ├── block      - Block header layout (internal)
//!   ├── brk        - Program-break drivers (OsBreak, BufferBreak)
//!   └── freelist   - FreeListAllocator implementation
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use brkalloc::FreeListAllocator;
//!
//! fn main() {
//!   let mut allocator = FreeListAllocator::new();
//!
//!   // Allocate 64 bytes
//!   let ptr = allocator.allocate(64);
//!   assert!(!ptr.is_null());
//!
//!   unsafe {
//!     // Use the memory
//!     ptr.write(42);
//!
//!     // Hand the block back
//!     allocator.deallocate(ptr);
//!   }
//! }
//! ```
//!
//! ## Configuration
//!
//! Two compile-time knobs, validated with `static_assertions`:
//! [`ALIGNMENT_WIDTH`] (the boundary every payload lands on) and
//! [`PAGE_SIZE`] (the granularity the break moves by).
//!
//! ## Limitations
//!
//! - **Single-threaded only**: every operation takes `&mut self` and no
//!   synchronization is performed
//! - **Unix-only production driver**: [`OsBreak`] requires `sbrk` from
//!   `libc`; [`BufferBreak`] works anywhere
//! - **No realloc/calloc**: the surface is allocate and deallocate
//!
//! ## Safety
//!
//! Allocating is safe; using the returned memory and handing it back are
//! not. The raw pointers this crate deals in carry no lifetimes, so callers
//! uphold the usual contracts: no use after release, release through the
//! allocator that performed the allocation.

pub mod align;
mod block;
mod brk;
mod freelist;

use static_assertions::const_assert;

use crate::block::Header;

/// Boundary every payload address lands on.
///
/// Requests are padded so that header plus payload stay a multiple of this
/// width; it must be a power of two.
pub const ALIGNMENT_WIDTH: usize = 16;

/// Granularity of heap growth and contraction.
///
/// The break only ever moves by whole multiples of this, so contraction
/// can hand complete pages back to the OS. Must be a multiple of
/// [`ALIGNMENT_WIDTH`] and of the platform's effective page granularity.
pub const PAGE_SIZE: usize = 4096;

/// Byte footprint of the in-band block header, including the compiler's
/// natural padding.
pub const HEADER_FOOTPRINT: usize = Header::FOOTPRINT;

const_assert!(ALIGNMENT_WIDTH.is_power_of_two());
const_assert!(PAGE_SIZE % ALIGNMENT_WIDTH == 0);
// Keeps every payload on an alignment boundary.
const_assert!(HEADER_FOOTPRINT % ALIGNMENT_WIDTH == 0);

pub use brk::{BreakDriver, BufferBreak, OsBreak};
pub use freelist::{FreeListAllocator, print_alloc};
