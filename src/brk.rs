//! # Program-Break Drivers
//!
//! The allocator never talks to the operating system directly; every move
//! of the heap boundary goes through a [`BreakDriver`]. Production uses
//! [`OsBreak`], a thin wrapper over `sbrk(2)`. Tests (and anything that
//! wants several independent heaps) use [`BufferBreak`], which emulates the
//! break with the high-water mark of a private in-memory region.
//!
//! ```text
//!   OsBreak                          BufferBreak
//!
//!   ├── data segment ──┤             ├── page-aligned buffer ──┤
//!                      ▲                      ▲           ▲
//!                      │                      │           │
//!               program break               mark      capacity
//!             (moved by sbrk)        (moved by move_by)
//! ```

use std::alloc::{self, Layout};
use std::ptr::NonNull;

use libc::{c_void, intptr_t, sbrk};

use crate::{PAGE_SIZE, round_to};

/// Boundary primitive for a single contiguous, growable and shrinkable
/// memory region.
///
/// The contract mirrors `sbrk(2)`: moving the break by a signed delta
/// returns the break position *prior* to the move, and a move by zero is a
/// pure query. `None` stands in for the `(void *) -1` sentinel and is
/// treated by the allocator as out of memory. A failed move must leave the
/// break where it was.
pub trait BreakDriver {
  /// Moves the break by `delta` bytes and returns the previous break.
  fn move_by(&mut self, delta: isize) -> Option<*mut u8>;

  /// Current break position.
  fn current(&mut self) -> Option<*mut u8> {
    self.move_by(0)
  }
}

/// Production driver wired to the process program break.
///
/// Unix-only: requires `sbrk` semantics from libc. There is one program
/// break per process, so all [`OsBreak`] instances share the same region.
pub struct OsBreak;

impl BreakDriver for OsBreak {
  fn move_by(&mut self, delta: isize) -> Option<*mut u8> {
    // sbrk returns (void *) -1 on failure.
    let previous = unsafe { sbrk(delta as intptr_t) };

    if previous == usize::MAX as *mut c_void {
      return None;
    }

    Some(previous as *mut u8)
  }
}

/// In-memory break emulation: a fixed page-aligned region whose high-water
/// mark plays the role of the program break.
///
/// Every instance owns an independent region, so any number of allocators
/// can run side by side without touching the real break. The region is
/// zero-filled up front, the way the kernel hands out fresh pages.
pub struct BufferBreak {
  base: NonNull<u8>,
  layout: Layout,
  mark: usize,
}

impl BufferBreak {
  /// Creates a region able to grow to `capacity` bytes, rounded up to a
  /// whole number of pages.
  ///
  /// # Panics
  ///
  /// Panics if `capacity` is zero or too large for a [`Layout`].
  pub fn with_capacity(capacity: usize) -> Self {
    assert!(capacity > 0, "break region needs at least one page");

    let capacity = round_to!(capacity, PAGE_SIZE);
    let layout = Layout::from_size_align(capacity, PAGE_SIZE)
      .expect("break region capacity overflows a layout");

    let base = unsafe { alloc::alloc_zeroed(layout) };
    let base = NonNull::new(base).unwrap_or_else(|| alloc::handle_alloc_error(layout));

    Self { base, layout, mark: 0 }
  }

  /// Bytes currently between the region base and the simulated break.
  pub fn in_use(&self) -> usize {
    self.mark
  }
}

impl BreakDriver for BufferBreak {
  fn move_by(&mut self, delta: isize) -> Option<*mut u8> {
    // Layout caps the capacity at isize::MAX, so the mark fits an isize.
    let moved = (self.mark as isize).checked_add(delta)?;

    if moved < 0 || moved as usize > self.layout.size() {
      return None;
    }

    let previous = self.mark;
    self.mark = moved as usize;

    Some(unsafe { self.base.as_ptr().add(previous) })
  }
}

impl Drop for BufferBreak {
  fn drop(&mut self) {
    unsafe { alloc::dealloc(self.base.as_ptr(), self.layout) };
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn query_leaves_the_break_alone() {
    let mut brk = BufferBreak::with_capacity(PAGE_SIZE);

    let first = brk.current().unwrap();
    let second = brk.current().unwrap();

    assert_eq!(first, second);
    assert_eq!(brk.in_use(), 0);
  }

  #[test]
  fn base_is_page_aligned() {
    let mut brk = BufferBreak::with_capacity(PAGE_SIZE);

    assert_eq!(brk.current().unwrap() as usize % PAGE_SIZE, 0);
  }

  #[test]
  fn move_returns_the_previous_break() {
    let mut brk = BufferBreak::with_capacity(4 * PAGE_SIZE);
    let base = brk.current().unwrap();

    let previous = brk.move_by(PAGE_SIZE as isize).unwrap();

    assert_eq!(previous, base);
    assert_eq!(brk.current().unwrap(), unsafe { base.add(PAGE_SIZE) });
    assert_eq!(brk.in_use(), PAGE_SIZE);
  }

  #[test]
  fn refuses_to_leave_the_region() {
    let mut brk = BufferBreak::with_capacity(PAGE_SIZE);

    assert!(brk.move_by(-1).is_none());
    assert!(brk.move_by((PAGE_SIZE + 1) as isize).is_none());

    // Failed moves must not disturb the mark.
    assert_eq!(brk.in_use(), 0);
    assert!(brk.move_by(PAGE_SIZE as isize).is_some());
    assert_eq!(brk.in_use(), PAGE_SIZE);
  }

  #[test]
  fn capacity_rounds_up_to_whole_pages() {
    let mut brk = BufferBreak::with_capacity(1);

    assert!(brk.move_by(PAGE_SIZE as isize).is_some());
    assert!(brk.move_by(1).is_none());
  }
}
