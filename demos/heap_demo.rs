use std::ptr;

use brkalloc::{FreeListAllocator, PAGE_SIZE, print_alloc};
use libc::sbrk;

/// Request sizes exercised by the driver: two sub-page blocks, one that is
/// served in place from tail slack, and one spanning multiple pages.
const ALLOC_SIZES: [usize; 4] = [312, 4234, 40, 33333];

/// Reads the live program break.
/// The break is the upper boundary of the heap managed via brk/sbrk;
/// watching it move is the whole point of this driver.
unsafe fn program_break() -> *mut u8 {
  unsafe { sbrk(0) as *mut u8 }
}

fn main() {
  // RUST_LOG=brkalloc=trace narrates every split, merge and break move.
  tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .init();

  let mut allocator = FreeListAllocator::new();

  let mut blocks = [ptr::null_mut::<u8>(); 4];
  let mut breaks = [ptr::null_mut::<u8>(); 6];

  unsafe {
    breaks[0] = program_break();

    for (i, &size) in ALLOC_SIZES.iter().enumerate() {
      blocks[i] = allocator.allocate(size);

      if blocks[i].is_null() {
        eprintln!("Error: Could not allocate memory!");
        std::process::exit(1);
      }

      print_alloc(size, blocks[i]);
      breaks[i + 1] = program_break();
    }

    // Prove every payload byte is writable.
    for (block, &size) in blocks.iter().zip(ALLOC_SIZES.iter()) {
      ptr::write_bytes(*block, b'A', size);
    }

    // Release out of allocation order: middle blocks first, then the top
    // of the heap, then the hole left behind.
    allocator.deallocate(blocks[1]);
    allocator.deallocate(blocks[0]);
    allocator.deallocate(blocks[3]);
    allocator.deallocate(blocks[2]);

    breaks[5] = program_break();
  }

  let total_allocated = breaks[4] as usize - breaks[0] as usize;
  let excess_pages = (breaks[5] as usize - breaks[0] as usize) / PAGE_SIZE;

  println!("\n\tHeap Break Positions\n");
  println!("Initial break:\t\t{:?}", breaks[0]);

  for (i, position) in breaks.iter().enumerate().take(5).skip(1) {
    println!("Break {}:\t\t{:?}", i, position);
  }

  println!("Post-free break:\t{:?}\n", breaks[5]);

  for (i, block) in blocks.iter().enumerate() {
    println!("Block {}:\t\t{:?}", i, block);
  }

  println!();

  if excess_pages != 0 {
    println!("Error: {} pages were not free'd", excess_pages);
  } else {
    println!("All allocated pages free'd");
  }

  println!(
    "Allocated {} bytes ({} pages)",
    total_allocated,
    total_allocated / PAGE_SIZE
  );
}
