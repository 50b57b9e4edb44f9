/// Rounds `value` up to the next multiple of `align`, which must be a power of two.
///
/// # Examples
///
/// ```rust
/// use rheap::align_up;
///
/// assert_eq!(align_up!(13, 8), 16);
/// assert_eq!(align_up!(64, 16), 64);
/// ```
#[macro_export]
macro_rules! align_up {
  ($value:expr, $align:expr) => {
    ($value + $align - 1) & !($align - 1)
  };
}

/// Rounds `value` up to the block alignment, i.e. the alignment of a block header.
///
/// Every payload handed out by the heap starts on this boundary.
#[macro_export]
macro_rules! align {
  ($value:expr) => {
    $crate::align_up!($value, $crate::BLOCK_ALIGN)
  };
}

/// Checked variant of [`align!`]; `None` when rounding would overflow `usize`.
pub(crate) const fn checked_align(value: usize) -> Option<usize> {
  match value.checked_add(crate::BLOCK_ALIGN - 1) {
    Some(bumped) => Some(bumped & !(crate::BLOCK_ALIGN - 1)),
    None => None,
  }
}
