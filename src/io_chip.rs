// IOChip protocol - common contract for VIC and VIA style chips
//
// The master tick loop advances the CPU one instruction at a time and is
// responsible for calling `update` on every chip at or before the cycle
// the chip asked for via `next_update`. A chip may return an earlier
// cycle from `next_update` to be re-expedited, or `IDLE` to sleep until
// a register access wakes it up.

/// Deadline value meaning "no update needed"
pub const IDLE: u64 = u64::MAX;

/// Contract between the master scheduler and a memory-mapped chip.
///
/// Ordering rule: `read_register` must reflect chip state as of the most
/// recent `update` call. A bus that has advanced the cycle counter since
/// the last update is expected to call `update` before reading.
pub trait IoChip {
    /// Read one of the chip's registers (may have side effects)
    fn read_register(&mut self, register: u8) -> u8;

    /// Write one of the chip's registers
    fn write_register(&mut self, register: u8, data: u8);

    /// Absolute cycle at which the chip next needs an `update` call,
    /// or [`IDLE`] if it has no pending deadline
    fn next_update(&self) -> u64;

    /// Bring the chip's state up to `current_cycles`
    fn update(&mut self, current_cycles: u64);

    /// Return the chip to its power-on state
    fn reset(&mut self);
}
