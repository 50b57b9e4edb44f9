use core::{
  alloc::{GlobalAlloc, Layout},
  ptr,
};
#[cfg(feature = "mem-debug")]
use core::sync::atomic::{AtomicBool, Ordering};

use spin::{Mutex, Once};

use crate::{BLOCK_ALIGN, Heap, HeapError};

/// A process-wide [`Heap`], set up once and usable as a `#[global_allocator]`.
///
/// ```rust,ignore
/// #[global_allocator]
/// static HEAP: rheap::GlobalHeap = rheap::GlobalHeap::new();
///
/// unsafe extern "C" {
///   static mut heap_low: u8;
///   static mut heap_top: u8;
/// }
///
/// fn main() {
///   unsafe { HEAP.init(&raw mut heap_low, &raw mut heap_top) }.ok();
/// }
/// ```
///
/// Until [`GlobalHeap::init`] succeeds every allocation yields null. The spin
/// lock only serializes callers; it does not make the heap interrupt-safe.
///
/// With `mem-debug`, trace lines are logged after the lock is released, so
/// the logger may itself allocate from this heap. Allocations made while a
/// trace is being logged are not traced.
pub struct GlobalHeap {
  heap: Once<Mutex<Heap>>,
  #[cfg(feature = "mem-debug")]
  logging: AtomicBool,
}

impl GlobalHeap {
  pub const fn new() -> Self {
    Self {
      heap: Once::new(),
      #[cfg(feature = "mem-debug")]
      logging: AtomicBool::new(false),
    }
  }

  /// Builds the heap over `[low, high)` with the default size classes.
  ///
  /// # Safety
  ///
  /// Same contract as [`Heap::new`]; the region must stay reserved for the
  /// rest of the program.
  pub unsafe fn init(
    &self,
    low: *mut u8,
    high: *mut u8,
  ) -> Result<(), HeapError> {
    if self.is_initialized() {
      return Err(HeapError::AlreadyInitialized);
    }

    self.install(unsafe { Heap::new(low, high) }?)
  }

  /// Installs an already built heap. Only the first call wins.
  pub fn install(
    &self,
    heap: Heap,
  ) -> Result<(), HeapError> {
    #[cfg(feature = "mem-debug")]
    let heap = {
      let mut heap = heap;
      heap.defer_trace();
      heap
    };

    let mut installed = false;

    self.heap.call_once(|| {
      installed = true;
      Mutex::new(heap)
    });

    if installed { Ok(()) } else { Err(HeapError::AlreadyInitialized) }
  }

  pub fn is_initialized(&self) -> bool {
    self.heap.is_completed()
  }

  /// Runs `f` with exclusive access to the heap; `None` before initialization.
  pub fn with<R>(
    &self,
    f: impl FnOnce(&mut Heap) -> R,
  ) -> Option<R> {
    let heap = self.heap.get()?;

    let mut guard = heap.lock();
    let result = f(&mut *guard);
    #[cfg(feature = "mem-debug")]
    let pending = guard.take_trace();
    drop(guard);

    #[cfg(feature = "mem-debug")]
    if !pending.is_empty() && !self.logging.swap(true, Ordering::Acquire) {
      pending.emit();
      self.logging.store(false, Ordering::Release);
    }

    Some(result)
  }

  /// Logs the heap's counters and free-list lengths. The state is copied under
  /// the lock and logged after it is released.
  #[cfg(feature = "mem-debug")]
  pub fn dump_state(&self) {
    if let Some(state) = self.with(|heap| heap.state()) {
      state.emit();
    }
  }
}

impl Default for GlobalHeap {
  fn default() -> Self {
    Self::new()
  }
}

unsafe impl GlobalAlloc for GlobalHeap {
  unsafe fn alloc(
    &self,
    layout: Layout,
  ) -> *mut u8 {
    if layout.align() > BLOCK_ALIGN {
      return ptr::null_mut();
    }

    self.with(|heap| heap.allocate(layout.size())).unwrap_or(ptr::null_mut())
  }

  unsafe fn dealloc(
    &self,
    ptr: *mut u8,
    _layout: Layout,
  ) {
    self.with(|heap| unsafe { heap.release(ptr) });
  }

  unsafe fn alloc_zeroed(
    &self,
    layout: Layout,
  ) -> *mut u8 {
    if layout.align() > BLOCK_ALIGN {
      return ptr::null_mut();
    }

    self.with(|heap| heap.zero_allocate(1, layout.size())).unwrap_or(ptr::null_mut())
  }

  unsafe fn realloc(
    &self,
    ptr: *mut u8,
    layout: Layout,
    new_size: usize,
  ) -> *mut u8 {
    if layout.align() > BLOCK_ALIGN {
      return ptr::null_mut();
    }

    self.with(|heap| unsafe { heap.resize(ptr, new_size) }).unwrap_or(ptr::null_mut())
  }
}
