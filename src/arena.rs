use core::ptr::NonNull;

use crate::{BLOCK_ALIGN, HeapError, block::HEADER_SIZE};

/// The fixed backing region `[base, base + len)` and its bump cursor.
///
/// The cursor is an offset from `base`; it only ever moves forward.
pub struct Arena {
  base: NonNull<u8>,
  len: usize,
  cursor: usize,
}

impl Arena {
  /// Takes over the region between `low` (inclusive) and `high` (exclusive).
  ///
  /// `low` is rounded up to [`BLOCK_ALIGN`]; the bytes skipped are never used.
  ///
  /// # Safety
  ///
  /// The region must be valid for reads and writes, must not be used by
  /// anything else for as long as the arena (or any block carved from it)
  /// lives.
  pub unsafe fn new(
    low: *mut u8,
    high: *mut u8,
  ) -> Result<Self, HeapError> {
    let (low_addr, high_addr) = (low as usize, high as usize);

    if low_addr > high_addr {
      return Err(HeapError::InvertedBounds {
        low: low_addr,
        high: high_addr,
      });
    }

    let low = NonNull::new(low).ok_or(HeapError::NullBase)?;
    let skip = low.align_offset(BLOCK_ALIGN);
    let len = (high_addr - low_addr).saturating_sub(skip);

    if len < HEADER_SIZE + BLOCK_ALIGN {
      return Err(HeapError::ArenaTooSmall { len });
    }

    // `skip < len + skip <= high - low`, so the pointer stays in the region.
    let base = unsafe { low.add(skip) };

    Ok(Self { base, len, cursor: 0 })
  }

  /// Reserves `bytes` at the cursor; `None` leaves the cursor untouched.
  pub fn carve(
    &mut self,
    bytes: usize,
  ) -> Option<NonNull<u8>> {
    let next = self.cursor.checked_add(bytes)?;

    if next > self.len {
      return None;
    }

    let start = unsafe { self.base.add(self.cursor) };
    self.cursor = next;

    Some(start)
  }

  /// Offset of `addr` from the base when it lies inside the carved part.
  pub fn carved_offset(
    &self,
    addr: *const u8,
  ) -> Option<usize> {
    let offset = (addr as usize).checked_sub(self.base.as_ptr() as usize)?;
    (offset < self.cursor).then_some(offset)
  }

  pub fn base(&self) -> NonNull<u8> {
    self.base
  }

  pub fn len(&self) -> usize {
    self.len
  }

  pub fn used(&self) -> usize {
    self.cursor
  }

  pub fn remaining(&self) -> usize {
    self.len - self.cursor
  }
}
