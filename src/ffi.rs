//! C allocation entry points for firmware linked against C code.
//!
//! The heap spans the linker symbols `heap_low` (inclusive) and `heap_top`
//! (exclusive) and is brought up on the first call. Enabling this module on a
//! hosted target shadows the system allocator's symbols.

use core::ptr;

use libc::{c_void, size_t};

use crate::GlobalHeap;

unsafe extern "C" {
  static mut heap_low: u8;
  static mut heap_top: u8;
}

static HEAP: GlobalHeap = GlobalHeap::new();

fn heap() -> &'static GlobalHeap {
  if !HEAP.is_initialized() {
    if let Err(err) = unsafe { HEAP.init(&raw mut heap_low, &raw mut heap_top) } {
      log::error!("heap bring-up failed: {err}");
    }
  }

  &HEAP
}

#[unsafe(no_mangle)]
pub extern "C" fn malloc(size: size_t) -> *mut c_void {
  heap().with(|heap| heap.allocate(size)).unwrap_or(ptr::null_mut()) as *mut c_void
}

/// # Safety
///
/// `p` must be null or come from this module's allocation functions.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn free(p: *mut c_void) {
  heap().with(|heap| unsafe { heap.release(p as *mut u8) });
}

#[unsafe(no_mangle)]
pub extern "C" fn calloc(
  n: size_t,
  size: size_t,
) -> *mut c_void {
  heap().with(|heap| heap.zero_allocate(n, size)).unwrap_or(ptr::null_mut()) as *mut c_void
}

/// # Safety
///
/// `p` must be null or come from this module's allocation functions.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn realloc(
  p: *mut c_void,
  size: size_t,
) -> *mut c_void {
  heap()
    .with(|heap| unsafe { heap.resize(p as *mut u8, size) })
    .unwrap_or(ptr::null_mut()) as *mut c_void
}

#[unsafe(no_mangle)]
pub extern "C" fn mem_info() {
  #[cfg(feature = "mem-debug")]
  heap().dump_state();
}
