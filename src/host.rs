use core::ptr::{self, NonNull};
use std::io;

use libc::{MAP_ANONYMOUS, MAP_FAILED, MAP_PRIVATE, PROT_READ, PROT_WRITE, c_void, mmap, munmap};

/// An anonymous private mapping standing in for the linker-provided heap
/// region when running on a hosted system.
pub struct HostArena {
  base: NonNull<u8>,
  len: usize,
}

impl HostArena {
  pub fn new(len: usize) -> io::Result<Self> {
    if len == 0 {
      return Err(io::Error::new(io::ErrorKind::InvalidInput, "arena length must be non-zero"));
    }

    let address = unsafe {
      mmap(
        ptr::null_mut(),
        len,
        PROT_READ | PROT_WRITE,
        MAP_PRIVATE | MAP_ANONYMOUS,
        -1,
        0,
      )
    };

    if address == MAP_FAILED {
      return Err(io::Error::last_os_error());
    }

    let base = NonNull::new(address as *mut u8).ok_or_else(io::Error::last_os_error)?;

    Ok(Self { base, len })
  }

  /// Inclusive start of the region.
  pub fn low(&self) -> *mut u8 {
    self.base.as_ptr()
  }

  /// Exclusive end of the region.
  pub fn high(&self) -> *mut u8 {
    unsafe { self.base.as_ptr().add(self.len) }
  }

  pub fn len(&self) -> usize {
    self.len
  }
}

impl Drop for HostArena {
  fn drop(&mut self) {
    unsafe {
      munmap(self.base.as_ptr() as *mut c_void, self.len);
    }
  }
}
