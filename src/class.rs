use core::ptr;

use crate::{BLOCK_ALIGN, HeapError, block::BlockHeader};

/// Upper bound on the number of size classes a table can hold.
pub const MAX_CLASSES: usize = 8;

/// Bucket sizes used when no table is supplied.
pub const DEFAULT_CLASSES: [usize; 6] = [0x40, 0x400, 0x1000, 0x4000, 0x40000, 0x80000];

/// One bucket: the request ceiling it serves and the blocks parked on it.
pub struct SizeClass {
  pub size: usize,
  pub free_list: *mut BlockHeader,
  #[cfg(feature = "mem-debug")]
  pub count: usize,
  #[cfg(feature = "mem-debug")]
  pub peak: usize,
}

impl SizeClass {
  const EMPTY: SizeClass = SizeClass {
    size: 0,
    free_list: ptr::null_mut(),
    #[cfg(feature = "mem-debug")]
    count: 0,
    #[cfg(feature = "mem-debug")]
    peak: 0,
  };

  /// Number of blocks reachable from the free-list head.
  pub fn free_len(&self) -> usize {
    let mut len = 0;
    let mut current = self.free_list;

    while !current.is_null() {
      len += 1;
      current = unsafe { (*current).link };
    }

    len
  }

  #[cfg(feature = "mem-debug")]
  pub fn record_alloc(&mut self) {
    self.count += 1;
    if self.count > self.peak {
      self.peak = self.count;
    }
  }

  #[cfg(feature = "mem-debug")]
  pub fn record_release(&mut self) {
    self.count = self.count.saturating_sub(1);
  }
}

/// Ascending table of size classes.
pub struct SizeClassTable {
  classes: [SizeClass; MAX_CLASSES],
  len: usize,
}

impl SizeClassTable {
  pub fn new(sizes: &[usize]) -> Result<Self, HeapError> {
    if sizes.is_empty() || sizes.len() > MAX_CLASSES {
      return Err(HeapError::ClassCount {
        got: sizes.len(),
        max: MAX_CLASSES,
      });
    }

    let mut classes = [SizeClass::EMPTY; MAX_CLASSES];
    let mut previous = 0;

    for (slot, &size) in classes.iter_mut().zip(sizes) {
      if size <= previous || size % BLOCK_ALIGN != 0 || u32::try_from(size).is_err() {
        return Err(HeapError::InvalidClass {
          size,
          align: BLOCK_ALIGN,
        });
      }
      slot.size = size;
      previous = size;
    }

    Ok(Self {
      classes,
      len: sizes.len(),
    })
  }

  /// First class whose size covers `size`; `None` means oversized.
  pub fn classify(
    &mut self,
    size: usize,
  ) -> Option<&mut SizeClass> {
    self.as_mut_slice().iter_mut().find(|class| class.size >= size)
  }

  /// The class whose size is exactly `capacity`.
  pub fn exact(
    &mut self,
    capacity: usize,
  ) -> Option<&mut SizeClass> {
    self.as_mut_slice().iter_mut().find(|class| class.size == capacity)
  }

  pub fn largest(&self) -> usize {
    self.classes[self.len - 1].size
  }

  pub fn as_slice(&self) -> &[SizeClass] {
    &self.classes[..self.len]
  }

  fn as_mut_slice(&mut self) -> &mut [SizeClass] {
    &mut self.classes[..self.len]
  }
}
