//! # Free-List Allocator
//!
//! The heap manager at the core of this crate. It owns a single contiguous
//! region below the program break and threads a **doubly-linked list of
//! block headers** through it, in address order, covering every byte of the
//! region:
//!
//! ```text
//!   head                                                        tail
//!    │                                                            │
//!    ▼                                                            ▼
//!  ┌────────┬─────────┬────────┬─────────┬────────┬─────────┬─ ── ──┐
//!  │ Header │ payload │ Header │ payload │ Header │ payload │  ...  │
//!  │ in-use │         │ free   │         │ in-use │         │       │
//!  └────────┴─────────┴────────┴─────────┴────────┴─────────┴─ ── ──┘
//!    │  ▲  next │  ▲  next │                                        │
//!    └──┼───────┘──┼───────┘                              program break
//!       └─ prev ───┘
//!
//!   Each header records its payload size, so the successor of a block
//!   always starts exactly footprint + size bytes after the header.
//! ```
//!
//! ## Allocation
//!
//! A request is padded so that header plus payload land on an alignment
//! boundary, then served by the **first free block** large enough to hold
//! it. A match with enough surplus is split, leaving a smaller free block
//! behind; a tight match is consumed whole. When nothing fits, the heap
//! grows through the boundary driver by a whole number of pages, with a
//! free block at the top counted as credit against the growth:
//!
//! ```text
//!   before:  ┌──────┬──────┬────────────┐
//!            │ used │ used │ free (too  │← break
//!            │      │      │   small)   │
//!            └──────┴──────┴────────────┘
//!
//!   after:   ┌──────┬──────┬──────────────────────┬─────────────┐
//!            │ used │ used │ new block (absorbed  │ tail slack, │← break
//!            │      │      │  the old free tail)  │    free     │
//!            └──────┴──────┴──────────────────────┴─────────────┘
//! ```
//!
//! ## Release
//!
//! Releasing a block marks it free and merges it with free neighbors, so
//! no two adjacent blocks are ever both free. When the merged block ends
//! at the break and spans at least a page, the whole pages are handed back
//! to the OS and the break moves down; sub-page slack is folded into the
//! predecessor. Releasing the sole block empties the heap entirely.
//!
//! ## Assumptions
//!
//! The driver's initial break is taken as the base of the first block, so
//! it must sit on an alignment boundary; both provided drivers hand out
//! page-aligned bases. All calls must come from a single thread.

use std::ptr;

use libc::sbrk;
use tracing::{debug, trace};

use crate::{ALIGNMENT_WIDTH, PAGE_SIZE, pad_to, round_to};
use crate::block::Header;
use crate::brk::{BreakDriver, OsBreak};

/// Debug helper that prints allocation information.
///
/// Outputs the requested size, the address handed to the caller, and the
/// live program break, which is what the demonstration driver tabulates.
pub fn print_alloc(
  size: usize,
  addr: *mut u8,
) {
  println!(
    "Allocated {} bytes, address = {:?}, program break = {:?}",
    size,
    addr,
    unsafe { sbrk(0) },
  );
}

/// A first-fit free-list allocator over a program-break region.
///
/// The allocator owns every header in the region; callers own the payload
/// bytes of their live blocks and nothing else. Payload contents are not
/// preserved across a release.
///
/// # Fields
///
/// * `head` - lowest-addressed header, null while the heap is empty
/// * `tail` - highest-addressed header, null while the heap is empty
/// * `brk` - boundary driver the heap grows and shrinks through
///
/// # Thread Safety
///
/// This allocator is **NOT** thread-safe; it holds raw pointers and takes
/// `&mut self` on every operation.
pub struct FreeListAllocator<B: BreakDriver = OsBreak> {
  head: *mut Header,
  tail: *mut Header,
  brk: B,
}

impl FreeListAllocator<OsBreak> {
  /// Creates an allocator backed by the process program break.
  pub fn new() -> Self {
    Self::with_driver(OsBreak)
  }
}

impl<B: BreakDriver> FreeListAllocator<B> {
  /// Creates an allocator over any boundary driver, e.g. a
  /// [`BufferBreak`](crate::BufferBreak) region in tests.
  pub fn with_driver(brk: B) -> Self {
    Self {
      head: ptr::null_mut(),
      tail: ptr::null_mut(),
      brk,
    }
  }

  /// Allocates `size` bytes of uninitialized payload.
  ///
  /// Returns a pointer aligned to [`ALIGNMENT_WIDTH`], or null when `size`
  /// is zero or the heap cannot grow. A failed allocation leaves the heap
  /// exactly as it was.
  ///
  /// The request is padded so the block's total footprint stays a multiple
  /// of the alignment width; the recorded block size may therefore exceed
  /// the request by the padding, and by any slack too small to carry a
  /// header of its own.
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> *mut u8 {
    // Oversized requests would wrap the padding arithmetic below.
    if size == 0 || size > isize::MAX as usize - 2 * PAGE_SIZE {
      return ptr::null_mut();
    }

    let size = pad_to!(size, Header::FOOTPRINT, ALIGNMENT_WIDTH);
    let mut heap_empty = false;
    let mut additional_space = 0;

    if self.head.is_null() {
      // Bootstrap: the current break doubles as the base of the heap and
      // the slot of its first header.
      let Some(base) = self.brk.current() else {
        return ptr::null_mut();
      };

      self.head = base as *mut Header;
      self.tail = self.head;
      heap_empty = true;
    } else {
      unsafe {
        let mut current = self.head;

        while !current.is_null() {
          if (*current).free && (*current).size >= size + Header::FOOTPRINT {
            return self.place_in(current, size);
          }

          current = (*current).next;
        }

        // A free block at the top of the heap counts as credit against
        // the growth: the new block will absorb it.
        if (*self.tail).free {
          additional_space = (*self.tail).size + Header::FOOTPRINT;
        }
      }
    }

    // A free tail larger than the request (but too small for first fit)
    // drives the subtraction past zero; saturation turns the move into a
    // query and the leftover below hands the whole tail to the caller.
    let grow = round_to!(
      (size + Header::FOOTPRINT).saturating_sub(additional_space),
      PAGE_SIZE
    );

    if self.brk.move_by(grow as isize).is_none() {
      if heap_empty {
        self.head = ptr::null_mut();
        self.tail = ptr::null_mut();
      }

      return ptr::null_mut();
    }

    debug!(bytes = grow, reclaimed = additional_space, "heap extended");

    unsafe {
      if heap_empty {
        (*self.tail).prev = ptr::null_mut();
      } else if !(*self.tail).free {
        // Install a fresh header at the old break, after the previous tail.
        let fresh = Header::successor_slot(self.tail);
        (*self.tail).next = fresh;
        (*fresh).prev = self.tail;
        self.tail = fresh;
      }

      (*self.tail).next = ptr::null_mut();
      (*self.tail).free = false;
      (*self.tail).size = size;

      let payload = Header::payload(self.tail);

      // Space left below the new break becomes a free tail block, or rides
      // along in the returned block when too small to carry a header.
      let leftover = grow + additional_space - (size + Header::FOOTPRINT);

      if leftover > Header::FOOTPRINT {
        let slack = Header::successor_slot(self.tail);
        (*self.tail).next = slack;
        (*slack).prev = self.tail;
        self.tail = slack;
        (*self.tail).free = true;
        (*self.tail).next = ptr::null_mut();
        (*self.tail).size = leftover - Header::FOOTPRINT;

        trace!(size = (*self.tail).size, "kept tail slack as a free block");
      } else {
        (*self.tail).size += leftover;
      }

      payload
    }
  }

  /// Serves a request from a free block found by the first-fit walk.
  ///
  /// Splits the surplus off the back of the block when it can hold a free
  /// block of its own; otherwise the block is consumed whole and the slack
  /// rides along in its recorded size.
  ///
  /// # Safety
  ///
  /// `block` must be a live free header whose size can hold `size` plus
  /// another header.
  unsafe fn place_in(
    &mut self,
    block: *mut Header,
    size: usize,
  ) -> *mut u8 {
    unsafe {
      let available = (*block).size;

      if available > size + 2 * Header::FOOTPRINT {
        (*block).size = size;

        let remainder = Header::successor_slot(block);
        (*remainder).size = available - (size + Header::FOOTPRINT);
        (*remainder).free = true;
        (*remainder).prev = block;
        (*remainder).next = (*block).next;

        if !(*remainder).next.is_null() {
          (*(*remainder).next).prev = remainder;
        }

        (*block).next = remainder;

        trace!(request = size, remainder = (*remainder).size, "split free block");
      }

      (*block).free = false;

      if self.tail == block && !(*block).next.is_null() {
        self.tail = (*block).next;
      }

      Header::payload(block)
    }
  }

  /// Returns a block to the allocator.
  ///
  /// The block is marked free and merged with free neighbors; when the
  /// merged block ends at the break and spans at least a page, whole pages
  /// are handed back through the boundary driver. Null pointers and blocks
  /// that are already free are ignored.
  ///
  /// # Safety
  ///
  /// `address` must be null or a pointer previously returned by
  /// [`allocate`](Self::allocate) on this allocator and not invalidated by
  /// a later release; anything else is undefined behavior.
  pub unsafe fn deallocate(
    &mut self,
    address: *mut u8,
  ) {
    if address.is_null() {
      return;
    }

    unsafe {
      let mut block = Header::from_payload(address);

      // A free header means the block already belongs to the allocator:
      // tolerate the double free.
      if (*block).free {
        return;
      }

      (*block).free = true;

      if !(*block).next.is_null() && (*(*block).next).free {
        self.absorb_next(block);
      }

      if !(*block).prev.is_null() && (*(*block).prev).free {
        block = (*block).prev;
        self.absorb_next(block);
      }

      if (*block).next.is_null() && (*block).size + Header::FOOTPRINT >= PAGE_SIZE {
        self.contract_tail(block);
      }
    }
  }

  /// Merges a block with its address-order successor.
  ///
  /// # Safety
  ///
  /// `block` and its successor must both be live headers.
  unsafe fn absorb_next(
    &mut self,
    block: *mut Header,
  ) {
    unsafe {
      let absorbed = (*block).next;

      (*block).size += (*absorbed).size + Header::FOOTPRINT;
      (*block).next = (*absorbed).next;

      if !(*block).next.is_null() {
        (*(*block).next).prev = block;
      }

      if self.tail == absorbed {
        self.tail = block;
      }

      trace!(merged = (*block).size, "coalesced adjacent free blocks");
    }
  }

  /// Hands the whole pages of the last block back through the driver.
  ///
  /// Sub-page slack stays mapped, folded into the predecessor's recorded
  /// size. With no predecessor there is no slack to fold: a sole block
  /// always spans the full heap, which only ever grows and shrinks in
  /// whole pages, so the heap is simply emptied.
  ///
  /// # Safety
  ///
  /// `block` must be the live, free, last header, spanning at least one
  /// page including its footprint.
  unsafe fn contract_tail(
    &mut self,
    block: *mut Header,
  ) {
    unsafe {
      let leftover = ((*block).size + Header::FOOTPRINT) % PAGE_SIZE;
      let excess = (*block).size + Header::FOOTPRINT - leftover;

      if self.brk.move_by(-(excess as isize)).is_none() {
        // The block stays linked as an ordinary free tail.
        debug!(bytes = excess, "break refused to contract");
        return;
      }

      if (*block).prev.is_null() {
        self.head = ptr::null_mut();
        self.tail = ptr::null_mut();
      } else {
        let previous = (*block).prev;
        (*previous).size += leftover;
        (*previous).next = ptr::null_mut();
        self.tail = previous;
      }

      debug!(bytes = excess, "returned pages to the OS");
    }
  }
}
