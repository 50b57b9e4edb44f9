//! Allocation trace for the `mem-debug` configuration.
//!
//! A heap owned directly logs each event as it happens. A heap behind
//! [`crate::GlobalHeap`] queues them instead; the queue is drained once the
//! lock is released, so a logger that allocates never re-enters a held lock.

use crate::{MAX_CLASSES, block::BlockHeader};

const QUEUE_LEN: usize = 4;

#[derive(Debug, Clone, Copy)]
pub enum Event {
  Allocate {
    header: *mut BlockHeader,
    payload: *mut u8,
    capacity: usize,
  },
  Release {
    header: *mut BlockHeader,
    payload: *mut u8,
    capacity: usize,
  },
  CorruptList {
    class: usize,
  },
}

impl Event {
  pub fn emit(&self) {
    match *self {
      Event::Allocate {
        header,
        payload,
        capacity,
      } => log::trace!("allocate: header = {:p}, payload = {:p}, size = {}", header, payload, capacity),
      Event::Release {
        header,
        payload,
        capacity,
      } => log::trace!("release: header = {:p}, payload = {:p}, size = {}", header, payload, capacity),
      Event::CorruptList { class } => log::warn!("free list {:#x}: corrupt head, discarding list", class),
    }
  }
}

/// Events produced by one heap operation, waiting to be logged.
#[derive(Debug, Clone, Copy)]
pub struct Pending {
  events: [Option<Event>; QUEUE_LEN],
  dropped: usize,
}

impl Pending {
  const EMPTY: Pending = Pending {
    events: [None; QUEUE_LEN],
    dropped: 0,
  };

  pub fn is_empty(&self) -> bool {
    self.dropped == 0 && self.events.iter().all(Option::is_none)
  }

  pub fn events(&self) -> impl Iterator<Item = &Event> {
    self.events.iter().flatten()
  }

  pub fn emit(&self) {
    self.events().for_each(Event::emit);
    if self.dropped > 0 {
      log::trace!("{} trace events dropped", self.dropped);
    }
  }
}

pub struct TraceLog {
  deferred: bool,
  pending: Pending,
}

impl TraceLog {
  pub const fn new() -> Self {
    Self {
      deferred: false,
      pending: Pending::EMPTY,
    }
  }

  pub fn defer(&mut self) {
    self.deferred = true;
  }

  pub fn record(
    &mut self,
    event: Event,
  ) {
    if !self.deferred {
      event.emit();
      return;
    }

    match self.pending.events.iter_mut().find(|slot| slot.is_none()) {
      Some(slot) => *slot = Some(event),
      None => self.pending.dropped += 1,
    }
  }

  pub fn take(&mut self) -> Pending {
    core::mem::replace(&mut self.pending, Pending::EMPTY)
  }
}

/// Per-class counters and free-list summary.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassState {
  pub size: usize,
  pub count: usize,
  pub peak: usize,
  pub free: usize,
}

/// Copy of the heap's bookkeeping that can be logged without holding the heap.
#[derive(Debug, Clone, Copy)]
pub struct HeapState {
  pub next_block: *const u8,
  pub used: usize,
  pub len: usize,
  pub classes: [ClassState; MAX_CLASSES],
  pub class_count: usize,
  pub oversized_free: usize,
}

impl HeapState {
  pub fn emit(&self) {
    log::debug!("next block = {:p}, used {} of {} bytes", self.next_block, self.used, self.len);

    for class in &self.classes[..self.class_count] {
      log::debug!(
        "malloc({:#x}): {} blocks (max {}), {} free",
        class.size,
        class.count,
        class.peak,
        class.free
      );
    }

    log::debug!("oversized: {} free", self.oversized_free);
  }
}
