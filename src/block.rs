use core::{mem, ptr};

/// Tag carried by the header of every block that is live in the caller's hands.
pub const LIVE_TAG: u32 = 0x424C_4D43;

/// Tag carried by the header of every block parked on a free list.
pub const FREE_TAG: u32 = 0x464C_4D43;

/// Metadata stored immediately in front of every payload.
///
/// ```text
///   ┌─────────┬──────────┬──────────┬───────────────────────┐
///   │ tag u32 │ cap u32  │ link ptr │ payload (cap bytes)   │
///   └─────────┴──────────┴──────────┴───────────────────────┘
///                                   ▲
///                                   └── pointer handed to the caller
/// ```
///
/// The header is padded to 16 bytes so payloads suit any primitive type,
/// `u128` and `f64` included, on both 32- and 64-bit targets.
#[repr(C, align(16))]
pub struct BlockHeader {
  pub tag: u32,
  pub capacity: u32,
  pub link: *mut BlockHeader,
}

pub const HEADER_SIZE: usize = mem::size_of::<BlockHeader>();

impl BlockHeader {
  /// Writes a fresh live header at `at`.
  ///
  /// # Safety
  ///
  /// `at` must be valid for writes of [`HEADER_SIZE`] bytes and aligned to
  /// [`crate::BLOCK_ALIGN`].
  pub unsafe fn write(
    at: *mut u8,
    capacity: u32,
  ) -> *mut BlockHeader {
    let header = at as *mut BlockHeader;
    unsafe {
      header.write(BlockHeader {
        tag: LIVE_TAG,
        capacity,
        link: ptr::null_mut(),
      });
    }
    header
  }

  /// Payload address of the block owning `header`.
  ///
  /// # Safety
  ///
  /// `header` must point at a header inside the arena.
  pub unsafe fn payload(header: *mut BlockHeader) -> *mut u8 {
    unsafe { (header as *mut u8).add(HEADER_SIZE) }
  }

  pub fn is_live(&self) -> bool {
    self.tag == LIVE_TAG
  }

  pub fn is_free(&self) -> bool {
    self.tag == FREE_TAG
  }

  pub fn capacity(&self) -> usize {
    self.capacity as usize
  }

  /// Marks the block as handed out and detaches it from any list.
  pub fn mark_live(&mut self) {
    self.tag = LIVE_TAG;
    self.link = ptr::null_mut();
  }

  /// Marks the block as free and links it in front of `next`.
  pub fn mark_free(
    &mut self,
    next: *mut BlockHeader,
  ) {
    self.tag = FREE_TAG;
    self.link = next;
  }
}
