use std::mem;

/// In-band metadata preceding every payload, threaded through the heap in
/// address order.
#[repr(C)]
pub struct Header {
  pub size: usize,
  pub free: bool,
  pub prev: *mut Header,
  pub next: *mut Header,
}

impl Header {
  /// Byte footprint of a header, including the compiler's natural padding.
  pub const FOOTPRINT: usize = mem::size_of::<Header>();

  /// Address of the payload that follows a header.
  ///
  /// # Safety
  ///
  /// `header` must point to a live header inside the managed heap.
  pub unsafe fn payload(header: *mut Header) -> *mut u8 {
    unsafe { (header as *mut u8).add(Self::FOOTPRINT) }
  }

  /// Recovers the header sitting directly before a payload pointer.
  ///
  /// # Safety
  ///
  /// `payload` must have been produced by [`Header::payload`] for a block
  /// that is still inside the managed heap.
  pub unsafe fn from_payload(payload: *mut u8) -> *mut Header {
    unsafe { payload.sub(Self::FOOTPRINT) as *mut Header }
  }

  /// Position directly after a block, where its address-order successor
  /// begins. Distances are byte counts: footprint plus recorded size.
  ///
  /// # Safety
  ///
  /// `header` must point to a live header whose `size` is accurate.
  pub unsafe fn successor_slot(header: *mut Header) -> *mut Header {
    unsafe { (header as *mut u8).add(Self::FOOTPRINT + (*header).size) as *mut Header }
  }
}
