use core::ptr::{self, NonNull};

use crate::{
  AllocError, BLOCK_ALIGN, HeapError,
  align::checked_align,
  arena::Arena,
  block::{BlockHeader, HEADER_SIZE},
  class::{DEFAULT_CLASSES, MAX_CLASSES, SizeClass, SizeClassTable},
};
#[cfg(feature = "mem-debug")]
use crate::trace::{ClassState, Event, HeapState, Pending, TraceLog};

/// Point-in-time view of the heap's bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapSnapshot {
  /// Bytes carved by the bump cursor so far.
  pub used: usize,
  /// Bytes the bump cursor can still hand out.
  pub remaining: usize,
  /// Free-list length per size class, in table order; unused slots are 0.
  pub free: [usize; MAX_CLASSES],
  /// Released oversized blocks waiting for an exact-size request.
  pub oversized_free: usize,
}

/// Bump region plus size-class free lists over one fixed arena.
///
/// The heap is not synchronized. Callers sharing it between execution
/// contexts must serialize access themselves, see [`crate::GlobalHeap`].
pub struct Heap {
  arena: Arena,
  classes: SizeClassTable,
  oversized: *mut BlockHeader,
  #[cfg(feature = "mem-debug")]
  trace: TraceLog,
}

/// Outcome of popping a free list.
enum Pop {
  Block(*mut BlockHeader),
  Empty,
  Corrupt,
}

// Every raw pointer held by the heap points into the arena it exclusively owns.
unsafe impl Send for Heap {}

impl Heap {
  /// Builds a heap over `[low, high)` with [`DEFAULT_CLASSES`].
  ///
  /// # Safety
  ///
  /// See [`Heap::with_classes`].
  pub unsafe fn new(
    low: *mut u8,
    high: *mut u8,
  ) -> Result<Self, HeapError> {
    unsafe { Self::with_classes(low, high, &DEFAULT_CLASSES) }
  }

  /// Builds a heap over `[low, high)` with a custom ascending size-class table.
  ///
  /// # Safety
  ///
  /// The region must be valid for reads and writes and must not be touched by
  /// anything but this heap and the holders of its blocks while they live.
  pub unsafe fn with_classes(
    low: *mut u8,
    high: *mut u8,
    sizes: &[usize],
  ) -> Result<Self, HeapError> {
    let classes = SizeClassTable::new(sizes)?;
    let arena = unsafe { Arena::new(low, high) }?;

    Ok(Self {
      arena,
      classes,
      oversized: ptr::null_mut(),
      #[cfg(feature = "mem-debug")]
      trace: TraceLog::new(),
    })
  }

  /// Returns a block of at least `size` bytes, or null.
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> *mut u8 {
    self.try_allocate(size).map_or(ptr::null_mut(), NonNull::as_ptr)
  }

  /// Like [`Heap::allocate`] but reports why no block was produced.
  pub fn try_allocate(
    &mut self,
    size: usize,
  ) -> Result<NonNull<u8>, AllocError> {
    if size == 0 {
      return Err(AllocError::ZeroSize);
    }

    let header = match self.classes.classify(size) {
      Some(class) => {
        let header = match Self::pop(class) {
          Pop::Block(header) => header,
          Pop::Empty => Self::carve(&mut self.arena, class.size)?,
          Pop::Corrupt => {
            #[cfg(feature = "mem-debug")]
            self.trace.record(Event::CorruptList { class: class.size });
            Self::carve(&mut self.arena, class.size)?
          }
        };
        #[cfg(feature = "mem-debug")]
        class.record_alloc();
        header
      }
      None => match self.pop_oversized(size) {
        Some(header) => header,
        None => Self::carve(&mut self.arena, size)?,
      },
    };

    let payload = unsafe { BlockHeader::payload(header) };

    #[cfg(feature = "mem-debug")]
    self.trace.record(Event::Allocate {
      header,
      payload,
      capacity: unsafe { (*header).capacity() },
    });

    // The payload sits past a header inside the arena, so it is never null.
    Ok(unsafe { NonNull::new_unchecked(payload) })
  }

  /// Hands a block back. Null, foreign or already released pointers are ignored.
  ///
  /// # Safety
  ///
  /// `ptr` must be null or a pointer obtained from this heap, and the caller
  /// must not use the block afterwards.
  pub unsafe fn release(
    &mut self,
    ptr: *mut u8,
  ) {
    let Some(header) = (unsafe { self.live_header(ptr) }) else {
      return;
    };

    let capacity = unsafe { (*header).capacity() };

    #[cfg(feature = "mem-debug")]
    self.trace.record(Event::Release {
      header,
      payload: ptr,
      capacity,
    });

    if let Some(class) = self.classes.exact(capacity) {
      unsafe { (*header).mark_free(class.free_list) };
      class.free_list = header;
      #[cfg(feature = "mem-debug")]
      class.record_release();
    } else if capacity > self.classes.largest() {
      unsafe { (*header).mark_free(self.oversized) };
      self.oversized = header;
    }
  }

  /// Returns a block of `count * element_size` zeroed bytes, or null.
  pub fn zero_allocate(
    &mut self,
    count: usize,
    element_size: usize,
  ) -> *mut u8 {
    self
      .try_zero_allocate(count, element_size)
      .map_or(ptr::null_mut(), NonNull::as_ptr)
  }

  /// Like [`Heap::zero_allocate`]; a product that overflows `usize` is refused.
  pub fn try_zero_allocate(
    &mut self,
    count: usize,
    element_size: usize,
  ) -> Result<NonNull<u8>, AllocError> {
    if count == 0 || element_size == 0 {
      return Err(AllocError::ZeroSize);
    }

    let total = count.checked_mul(element_size).ok_or(AllocError::Overflow)?;
    let payload = self.try_allocate(total)?;

    unsafe { payload.as_ptr().write_bytes(0, total) };

    Ok(payload)
  }

  /// Grows `ptr` to hold `new_size` bytes.
  ///
  /// A block that already fits is returned as is. Otherwise the contents move
  /// to a fresh block and the old one is released; on failure the old block
  /// is left intact and null is returned.
  ///
  /// # Safety
  ///
  /// Same contract as [`Heap::release`].
  pub unsafe fn resize(
    &mut self,
    ptr: *mut u8,
    new_size: usize,
  ) -> *mut u8 {
    if ptr.is_null() {
      return self.allocate(new_size);
    }

    if new_size == 0 {
      unsafe { self.release(ptr) };
      return ptr::null_mut();
    }

    let capacity = unsafe { self.capacity_of(ptr) };

    if capacity >= new_size {
      return ptr;
    }

    let fresh = self.allocate(new_size);

    if !fresh.is_null() {
      // capacity < new_size here, so only the old payload is read.
      unsafe {
        ptr::copy_nonoverlapping(ptr, fresh, capacity);
        self.release(ptr);
      }
    }

    fresh
  }

  /// Usable bytes behind `ptr`; 0 when the pointer is null, foreign or released.
  ///
  /// # Safety
  ///
  /// `ptr` must be null or a pointer obtained from this heap.
  pub unsafe fn capacity_of(
    &self,
    ptr: *mut u8,
  ) -> usize {
    unsafe { self.live_header(ptr) }.map_or(0, |header| unsafe { (*header).capacity() })
  }

  pub fn snapshot(&self) -> HeapSnapshot {
    let mut free = [0; MAX_CLASSES];

    for (slot, class) in free.iter_mut().zip(self.classes.as_slice()) {
      *slot = class.free_len();
    }

    let mut oversized_free = 0;
    let mut current = self.oversized;
    while !current.is_null() {
      oversized_free += 1;
      current = unsafe { (*current).link };
    }

    HeapSnapshot {
      used: self.arena.used(),
      remaining: self.arena.remaining(),
      free,
      oversized_free,
    }
  }

  pub fn size_classes(&self) -> impl Iterator<Item = usize> + '_ {
    self.classes.as_slice().iter().map(|class| class.size)
  }

  pub fn arena_len(&self) -> usize {
    self.arena.len()
  }

  pub fn used(&self) -> usize {
    self.arena.used()
  }

  pub fn remaining(&self) -> usize {
    self.arena.remaining()
  }

  /// Copies the bump cursor, per-class counters and free-list lengths.
  #[cfg(feature = "mem-debug")]
  pub fn state(&self) -> HeapState {
    let snapshot = self.snapshot();
    let mut classes = [ClassState::default(); MAX_CLASSES];

    for ((slot, class), free) in classes.iter_mut().zip(self.classes.as_slice()).zip(snapshot.free) {
      *slot = ClassState {
        size: class.size,
        count: class.count,
        peak: class.peak,
        free,
      };
    }

    HeapState {
      next_block: unsafe { self.arena.base().as_ptr().add(self.arena.used()) },
      used: snapshot.used,
      len: self.arena.len(),
      classes,
      class_count: self.classes.as_slice().len(),
      oversized_free: snapshot.oversized_free,
    }
  }

  /// Logs [`Heap::state`] followed by every block on every free list.
  #[cfg(feature = "mem-debug")]
  pub fn dump_state(&self) {
    self.state().emit();

    for class in self.classes.as_slice() {
      log::debug!("malloc({:#x}): free list {:p}", class.size, class.free_list);
      Self::dump_list(class.free_list);
    }

    log::debug!("oversized: free list {:p}", self.oversized);
    Self::dump_list(self.oversized);
  }

  /// Queue trace events instead of logging them from inside the operation.
  #[cfg(feature = "mem-debug")]
  pub(crate) fn defer_trace(&mut self) {
    self.trace.defer();
  }

  #[cfg(feature = "mem-debug")]
  pub(crate) fn take_trace(&mut self) -> Pending {
    self.trace.take()
  }

  #[cfg(feature = "mem-debug")]
  fn dump_list(mut header: *mut BlockHeader) {
    while !header.is_null() {
      unsafe {
        log::debug!(
          "\t{:p}:{:p} size {} ({:p})",
          header,
          BlockHeader::payload(header),
          (*header).capacity(),
          (*header).link
        );
        header = (*header).link;
      }
    }
  }

  /// Pops the head of `class`'s free list. A head without the free tag means
  /// the list is corrupt; it is dropped and the caller falls back to carving.
  fn pop(class: &mut SizeClass) -> Pop {
    let head = class.free_list;

    if head.is_null() {
      return Pop::Empty;
    }

    let header = unsafe { &mut *head };

    if !header.is_free() {
      class.free_list = ptr::null_mut();
      return Pop::Corrupt;
    }

    class.free_list = header.link;
    header.mark_live();

    Pop::Block(head)
  }

  /// Unlinks the first released oversized block whose capacity is exactly `size`.
  fn pop_oversized(
    &mut self,
    size: usize,
  ) -> Option<*mut BlockHeader> {
    let mut slot: *mut *mut BlockHeader = &raw mut self.oversized;

    unsafe {
      while !(*slot).is_null() {
        let header = *slot;

        if !(*header).is_free() {
          *slot = ptr::null_mut();
          return None;
        }

        if (*header).capacity() == size {
          *slot = (*header).link;
          (*header).mark_live();
          return Some(header);
        }

        slot = &raw mut (*header).link;
      }
    }

    None
  }

  /// Carves a fresh header plus `capacity` payload bytes from the bump cursor.
  fn carve(
    arena: &mut Arena,
    capacity: usize,
  ) -> Result<*mut BlockHeader, AllocError> {
    let stamped = u32::try_from(capacity).map_err(|_| AllocError::TooLarge { size: capacity })?;

    let bytes = checked_align(capacity)
      .and_then(|payload| payload.checked_add(HEADER_SIZE))
      .ok_or(AllocError::Overflow)?;

    let remaining = arena.remaining();
    let start = arena.carve(bytes).ok_or(AllocError::Exhausted {
      requested: bytes,
      remaining,
    })?;

    Ok(unsafe { BlockHeader::write(start.as_ptr(), stamped) })
  }

  /// Header of `ptr` when it is the payload of a live block carved from this
  /// arena. The header is addressed from the arena base, never from `ptr`.
  unsafe fn live_header(
    &self,
    ptr: *mut u8,
  ) -> Option<*mut BlockHeader> {
    let offset = self.arena.carved_offset(ptr)?;

    if offset < HEADER_SIZE || (offset - HEADER_SIZE) % BLOCK_ALIGN != 0 {
      return None;
    }

    let header = unsafe { self.arena.base().as_ptr().add(offset - HEADER_SIZE) } as *mut BlockHeader;

    unsafe { (*header).is_live() }.then_some(header)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    block::LIVE_TAG,
    testing::{self, Chunk, backing},
  };

  fn heap_over(
    chunks: &mut [Chunk],
    sizes: &[usize],
  ) -> Heap {
    let (low, high) = testing::bounds(chunks);
    unsafe { Heap::with_classes(low, high, sizes) }.unwrap()
  }

  #[test]
  fn test_allocate_zero_is_null() {
    let mut words = backing(4096);
    let mut heap = heap_over(&mut words, &DEFAULT_CLASSES);

    assert!(heap.allocate(0).is_null());
    assert_eq!(heap.try_allocate(0), Err(AllocError::ZeroSize));
    assert_eq!(heap.used(), 0);

    heap.allocate(8);
    let before = heap.snapshot();
    assert!(heap.allocate(0).is_null());
    assert_eq!(heap.snapshot(), before);
  }

  #[test]
  fn test_rounds_up_to_class() {
    let mut words = backing(8192);
    let mut heap = heap_over(&mut words, &DEFAULT_CLASSES);

    let small = heap.allocate(1);
    assert_eq!(unsafe { heap.capacity_of(small) }, 0x40);
    assert_eq!(heap.used(), HEADER_SIZE + 0x40);

    let medium = heap.allocate(0x41);
    assert_eq!(unsafe { heap.capacity_of(medium) }, 0x400);
    assert_eq!(medium as usize - small as usize, HEADER_SIZE + 0x40);
    assert_eq!(medium as usize % BLOCK_ALIGN, 0);
  }

  #[test]
  fn test_release_then_allocate_reuses_block() {
    let mut words = backing(4096);
    let mut heap = heap_over(&mut words, &DEFAULT_CLASSES);

    for size in [1, 7, 0x20, 0x40] {
      let first = heap.allocate(size);
      unsafe { heap.release(first) };
      let second = heap.allocate(size);
      assert_eq!(first, second);
      unsafe { heap.release(second) };
    }

    assert_eq!(heap.used(), HEADER_SIZE + 0x40);
  }

  #[test]
  fn test_free_list_is_lifo() {
    let mut words = backing(4096);
    let mut heap = heap_over(&mut words, &DEFAULT_CLASSES);

    let a = heap.allocate(16);
    let b = heap.allocate(16);
    let c = heap.allocate(16);

    unsafe {
      heap.release(a);
      heap.release(c);
      heap.release(b);
    }
    assert_eq!(heap.snapshot().free[0], 3);

    assert_eq!(heap.allocate(32), b);
    assert_eq!(heap.allocate(48), c);
    assert_eq!(heap.allocate(64), a);
    assert_eq!(heap.snapshot().free[0], 0);
  }

  #[test]
  fn test_block_contents_survive_neighbours() {
    let mut words = backing(4096);
    let mut heap = heap_over(&mut words, &DEFAULT_CLASSES);

    let first = heap.allocate(0x40) as *mut u64;
    let second = heap.allocate(0x40) as *mut u64;

    unsafe {
      for i in 0..8 {
        first.add(i).write(i as u64);
        second.add(i).write(u64::MAX - i as u64);
      }

      for i in 0..8 {
        assert_eq!(first.add(i).read(), i as u64);
        assert_eq!(second.add(i).read(), u64::MAX - i as u64);
      }
    }
  }

  #[test]
  fn test_release_null_is_noop() {
    let mut words = backing(4096);
    let mut heap = heap_over(&mut words, &DEFAULT_CLASSES);

    let p = heap.allocate(10);
    unsafe { heap.release(p) };
    let before = heap.snapshot();

    unsafe { heap.release(ptr::null_mut()) };

    assert_eq!(heap.snapshot(), before);
  }

  #[test]
  fn test_release_with_bad_tag_is_noop() {
    let mut words = backing(4096);
    let mut heap = heap_over(&mut words, &DEFAULT_CLASSES);

    let victim = heap.allocate(0x40);
    let other = heap.allocate(0x40);
    unsafe { heap.release(other) };

    unsafe {
      let header = victim.sub(HEADER_SIZE) as *mut BlockHeader;
      (*header).tag = 0xDEAD_BEEF;
    }

    let before = heap.snapshot();
    unsafe { heap.release(victim) };
    assert_eq!(heap.snapshot(), before);
    assert_eq!(unsafe { heap.capacity_of(victim) }, 0);
  }

  #[test]
  fn test_release_foreign_pointer_is_noop() {
    let mut words = backing(4096);
    let mut heap = heap_over(&mut words, &DEFAULT_CLASSES);
    let p = heap.allocate(0x40);

    let mut outside = [0u64; 8];
    let before = heap.snapshot();

    unsafe {
      heap.release(outside.as_mut_ptr().add(4) as *mut u8);
      heap.release(p.add(8));
      heap.release(p.add(3));
    }

    let fresh = heap.allocate(1);
    unsafe { heap.release(fresh.add(0x100)) };

    let after = heap.snapshot();
    assert_eq!(after.free, before.free);
    assert_eq!(after.oversized_free, before.oversized_free);
  }

  #[test]
  fn test_double_release_is_noop() {
    let mut words = backing(4096);
    let mut heap = heap_over(&mut words, &DEFAULT_CLASSES);

    let p = heap.allocate(0x10);
    unsafe {
      heap.release(p);
      heap.release(p);
    }

    assert_eq!(heap.snapshot().free[0], 1);
    assert_eq!(heap.allocate(0x10), p);
    assert_ne!(heap.allocate(0x10), p);
  }

  #[test]
  fn test_corrupt_free_list_head_falls_back_to_cursor() {
    let mut words = backing(4096);
    let mut heap = heap_over(&mut words, &DEFAULT_CLASSES);

    let p = heap.allocate(0x40);
    unsafe {
      heap.release(p);
      let header = p.sub(HEADER_SIZE) as *mut BlockHeader;
      (*header).tag = 0;
    }

    let used = heap.used();
    let q = heap.allocate(0x40);

    assert_ne!(q, p);
    assert_eq!(heap.used(), used + HEADER_SIZE + 0x40);
    assert_eq!(heap.snapshot().free[0], 0);
  }

  #[test]
  fn test_zero_allocate_clears_reused_block() {
    let mut words = backing(4096);
    let mut heap = heap_over(&mut words, &DEFAULT_CLASSES);

    let dirty = heap.allocate(0x40);
    unsafe {
      dirty.write_bytes(0xAB, 0x40);
      heap.release(dirty);
    }

    let clean = heap.zero_allocate(6, 10);
    assert_eq!(clean, dirty);

    let bytes = unsafe { core::slice::from_raw_parts(clean, 60) };
    assert!(bytes.iter().all(|&b| b == 0));
  }

  #[test]
  fn test_zero_allocate_edge_cases() {
    let mut words = backing(4096);
    let mut heap = heap_over(&mut words, &DEFAULT_CLASSES);

    assert!(heap.zero_allocate(0, 8).is_null());
    assert!(heap.zero_allocate(8, 0).is_null());
    assert_eq!(heap.try_zero_allocate(usize::MAX, 2), Err(AllocError::Overflow));
    assert_eq!(heap.used(), 0);
  }

  #[test]
  fn test_resize_shrink_keeps_pointer() {
    let mut words = backing(4096);
    let mut heap = heap_over(&mut words, &DEFAULT_CLASSES);

    let p = heap.allocate(10);
    let before = heap.snapshot();

    unsafe {
      assert_eq!(heap.resize(p, 10), p);
      assert_eq!(heap.resize(p, 1), p);
      assert_eq!(heap.resize(p, 0x40), p);
    }

    assert_eq!(heap.snapshot(), before);
  }

  #[test]
  fn test_resize_grow_copies_old_capacity() {
    let mut words = backing(8192);
    let mut heap = heap_over(&mut words, &DEFAULT_CLASSES);

    let p = heap.allocate(0x40);
    unsafe { p.write_bytes(0x5A, 0x40) };

    let q = unsafe { heap.resize(p, 0x100) };
    assert_ne!(q, p);
    assert_eq!(unsafe { heap.capacity_of(q) }, 0x400);

    let moved = unsafe { core::slice::from_raw_parts(q, 0x40) };
    assert!(moved.iter().all(|&b| b == 0x5A));

    assert_eq!(unsafe { heap.capacity_of(p) }, 0);
    assert_eq!(heap.snapshot().free[0], 1);
  }

  #[test]
  fn test_resize_null_and_zero() {
    let mut words = backing(4096);
    let mut heap = heap_over(&mut words, &DEFAULT_CLASSES);

    let p = unsafe { heap.resize(ptr::null_mut(), 24) };
    assert!(!p.is_null());
    assert_eq!(unsafe { heap.capacity_of(p) }, 0x40);

    assert!(unsafe { heap.resize(p, 0) }.is_null());
    assert_eq!(heap.snapshot().free[0], 1);
    assert_eq!(heap.allocate(24), p);

    assert!(unsafe { heap.resize(ptr::null_mut(), 0) }.is_null());
  }

  #[test]
  fn test_resize_failure_keeps_old_block() {
    let mut words = backing(HEADER_SIZE + 0x40);
    let mut heap = heap_over(&mut words, &[0x40, 0x80]);

    let p = heap.allocate(0x40);
    unsafe { p.write_bytes(0x11, 0x40) };

    assert!(unsafe { heap.resize(p, 0x80) }.is_null());
    assert_eq!(unsafe { heap.capacity_of(p) }, 0x40);
    assert_eq!(unsafe { *p.add(0x3F) }, 0x11);
  }

  #[test]
  fn test_exhaustion_leaves_cursor_unchanged() {
    let mut words = backing(HEADER_SIZE + 0x80);
    let mut heap = heap_over(&mut words, &[0x40, 0x80]);

    let big = heap.allocate(0x80);
    assert!(!big.is_null());

    let used = heap.used();
    let remaining = heap.remaining();
    assert!(heap.allocate(1).is_null());
    assert!(heap.allocate(0x80).is_null());
    assert!(heap.allocate(0x1000).is_null());
    assert_eq!(heap.used(), used);

    assert_eq!(
      heap.try_allocate(0x40),
      Err(AllocError::Exhausted {
        requested: HEADER_SIZE + 0x40,
        remaining,
      })
    );

    unsafe { heap.release(big) };
    assert_eq!(heap.allocate(0x41), big);
  }

  #[test]
  fn test_exhaustion_with_default_classes() {
    let mut words = backing(HEADER_SIZE + 0x80000);
    let mut heap = heap_over(&mut words, &DEFAULT_CLASSES);

    assert!(!heap.allocate(0x80000).is_null());

    let before = heap.snapshot();
    assert!(heap.allocate(1).is_null());
    assert_eq!(heap.snapshot(), before);
  }

  #[test]
  fn test_oversized_uses_exact_size() {
    let mut words = backing(4096);
    let mut heap = heap_over(&mut words, &[0x40, 0x80]);

    let big = heap.allocate(0x101);
    assert_eq!(unsafe { heap.capacity_of(big) }, 0x101);
    assert_eq!(heap.used(), HEADER_SIZE + crate::align!(0x101));

    let next = heap.allocate(1);
    assert_eq!(next as usize % BLOCK_ALIGN, 0);
  }

  #[test]
  fn test_oversized_release_is_recycled_by_exact_size() {
    let mut words = backing(4096);
    let mut heap = heap_over(&mut words, &[0x40, 0x80]);

    let a = heap.allocate(0x200);
    let b = heap.allocate(0x300);
    unsafe {
      heap.release(a);
      heap.release(b);
    }
    assert_eq!(heap.snapshot().oversized_free, 2);
    assert_eq!(heap.snapshot().free, [0; MAX_CLASSES]);

    let used = heap.used();
    assert_eq!(heap.allocate(0x200), a);
    assert_eq!(heap.snapshot().oversized_free, 1);

    let c = heap.allocate(0x280);
    assert_ne!(c, b);
    assert!(heap.used() > used);

    assert_eq!(heap.allocate(0x300), b);
    assert_eq!(heap.snapshot().oversized_free, 0);
  }

  #[test]
  fn test_resize_oversized_uses_header_capacity() {
    let mut words = backing(4096);
    let mut heap = heap_over(&mut words, &[0x40, 0x80]);

    let big = heap.allocate(0x200);
    unsafe {
      assert_eq!(heap.resize(big, 0x1F0), big);
      assert_eq!(heap.resize(big, 0x200), big);
    }
  }

  #[cfg(target_pointer_width = "64")]
  #[test]
  fn test_too_large_for_header() {
    let mut words = backing(4096);
    let mut heap = heap_over(&mut words, &DEFAULT_CLASSES);

    let size = u32::MAX as usize + 1;
    assert_eq!(heap.try_allocate(size), Err(AllocError::TooLarge { size }));
    assert_eq!(heap.try_allocate(usize::MAX), Err(AllocError::TooLarge { size: usize::MAX }));
    assert_eq!(heap.used(), 0);
  }

  #[test]
  fn test_live_header_is_stamped() {
    let mut words = backing(4096);
    let mut heap = heap_over(&mut words, &DEFAULT_CLASSES);

    let p = heap.allocate(5);
    let header = unsafe { &*(p.sub(HEADER_SIZE) as *const BlockHeader) };

    assert_eq!(header.tag, LIVE_TAG);
    assert_eq!(header.capacity(), 0x40);
    assert!(header.link.is_null());
  }

  #[test]
  fn test_size_classes_and_totals() {
    let mut words = backing(1024);
    let heap = heap_over(&mut words, &[0x20, 0x40]);

    assert_eq!(heap.size_classes().collect::<Vec<_>>(), vec![0x20, 0x40]);
    assert_eq!(heap.arena_len(), 1024);
    assert_eq!(heap.remaining(), 1024);
  }

  #[cfg(feature = "mem-debug")]
  #[test]
  fn test_counters_track_peak() {
    let mut words = backing(4096);
    let mut heap = heap_over(&mut words, &DEFAULT_CLASSES);

    let a = heap.allocate(1);
    let b = heap.allocate(1);
    unsafe {
      heap.release(a);
      heap.release(b);
    }
    heap.allocate(1);

    let class = &heap.classes.as_slice()[0];
    assert_eq!(class.count, 1);
    assert_eq!(class.peak, 2);

    heap.dump_state();
  }

  #[cfg(feature = "mem-debug")]
  #[test]
  fn test_deferred_trace_collects_events() {
    let mut words = backing(4096);
    let mut heap = heap_over(&mut words, &DEFAULT_CLASSES);
    heap.defer_trace();

    let p = heap.allocate(1);
    unsafe { heap.release(p) };

    let pending = heap.take_trace();
    let events: Vec<_> = pending.events().collect();
    assert!(matches!(events[0], Event::Allocate { payload, capacity: 0x40, .. } if *payload == p));
    assert!(matches!(events[1], Event::Release { payload, .. } if *payload == p));
    assert!(heap.take_trace().is_empty());

    let state = heap.state();
    assert_eq!(state.classes[0].free, 1);
    assert_eq!(state.used, HEADER_SIZE + 0x40);
  }
}
