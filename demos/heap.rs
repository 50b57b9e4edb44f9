use std::io::Read;

use rheap::{Heap, HostArena};

/// Waits for ENTER when the demo runs with `--step`, so the mapping can be
/// inspected with `pmap` or `gdb` between steps.
fn pause(step: bool) {
  if step {
    println!("\n>>> Press ENTER to continue...");
    let _ = std::io::stdin().bytes().next();
  }
}

fn report(
  heap: &Heap,
  label: &str,
  addr: *mut u8,
) {
  let capacity = unsafe { heap.capacity_of(addr) };
  println!(
    "[{}] address = {:?}, capacity = {}, used = {} / {} bytes",
    label,
    addr,
    capacity,
    heap.used(),
    heap.arena_len()
  );
}

fn main() -> std::io::Result<()> {
  let step = std::env::args().any(|arg| arg == "--step");

  // 1 MiB plays the part of the linker's heap_low..heap_top.
  let arena = HostArena::new(1 << 20)?;
  let mut heap = unsafe { Heap::new(arena.low(), arena.high()) }.map_err(std::io::Error::other)?;

  println!(
    "PID = {}, arena = {:?}..{:?}, classes = {:x?}",
    std::process::id(),
    arena.low(),
    arena.high(),
    heap.size_classes().collect::<Vec<_>>()
  );
  pause(step);

  // --------------------------------------------------------------------
  // 1) A u32 lands in the smallest class.
  // --------------------------------------------------------------------
  let first = heap.allocate(size_of::<u32>());
  report(&heap, "1 allocate u32", first);
  unsafe {
    (first as *mut u32).write(0xDEADBEEF);
    println!("[1] value = 0x{:X}", (first as *mut u32).read());
  }
  pause(step);

  // --------------------------------------------------------------------
  // 2) 100 bytes are rounded up to the 0x400 class.
  // --------------------------------------------------------------------
  let second = heap.allocate(100);
  report(&heap, "2 allocate 100 bytes", second);
  pause(step);

  // --------------------------------------------------------------------
  // 3) Release the first block and ask for 2 bytes: same class, same block.
  // --------------------------------------------------------------------
  unsafe { heap.release(first) };
  let third = heap.allocate(2);
  report(&heap, "3 allocate 2 bytes", third);
  println!("[3] reused first block? {}", third == first);
  pause(step);

  // --------------------------------------------------------------------
  // 4) Zeroed array of 16 u16.
  // --------------------------------------------------------------------
  let zeroed = heap.zero_allocate(16, size_of::<u16>());
  report(&heap, "4 zero_allocate [u16; 16]", zeroed);
  let all_zero = unsafe { std::slice::from_raw_parts(zeroed, 32) }.iter().all(|&b| b == 0);
  println!("[4] all zero? {}", all_zero);
  pause(step);

  // --------------------------------------------------------------------
  // 5) Resize within capacity keeps the pointer; beyond it moves the data.
  // --------------------------------------------------------------------
  let same = unsafe { heap.resize(second, 0x200) };
  println!("[5] resize to 0x200 kept pointer? {}", same == second);
  let moved = unsafe { heap.resize(second, 0x800) };
  report(&heap, "5 resize to 0x800", moved);
  pause(step);

  // --------------------------------------------------------------------
  // 6) Drain the arena with oversized requests until it refuses.
  // --------------------------------------------------------------------
  let mut count = 0;
  loop {
    match heap.try_allocate(0x90000) {
      Ok(_) => count += 1,
      Err(err) => {
        println!("[6] {} oversized blocks, then: {}", count, err);
        break;
      }
    }
  }
  println!("[6] remaining = {} bytes", heap.remaining());
  pause(step);

  println!("\n[7] End of demo. The mapping is released when the arena drops.");

  Ok(())
}
