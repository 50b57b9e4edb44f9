use thiserror::Error;

/// Failures while bringing a heap up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HeapError {
  #[error("arena bounds are inverted: low {low:#x} lies above high {high:#x}")]
  InvertedBounds { low: usize, high: usize },

  #[error("arena starts at address zero, which cannot back a payload pointer")]
  NullBase,

  #[error("arena of {len} bytes cannot hold a single block header")]
  ArenaTooSmall { len: usize },

  #[error("size-class table must hold between 1 and {max} classes, got {got}")]
  ClassCount { got: usize, max: usize },

  #[error("size class {size:#x} must be non-zero, ascending, a multiple of {align} and fit 32 bits")]
  InvalidClass { size: usize, align: usize },

  #[error("heap is already initialized")]
  AlreadyInitialized,
}

/// Why a checked allocation produced no block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AllocError {
  #[error("zero-sized request")]
  ZeroSize,

  #[error("request size overflows the address space")]
  Overflow,

  #[error("request of {size} bytes exceeds the largest representable block")]
  TooLarge { size: usize },

  #[error("arena exhausted: {requested} bytes requested, {remaining} remaining")]
  Exhausted { requested: usize, remaining: usize },
}
