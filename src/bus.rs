// Bus module - C64-side memory bus
//
// Routes the main CPU's accesses between the shared 64KB RAM and the
// VIC register window. KERNAL/BASIC banking, the CIAs, SID and the
// color RAM belong to the host shell; programs here run from RAM.
//
// # C64 Memory Map (subset modeled)
//
// ```text
// $0000-$CFFF: RAM
// $D000-$D3FF: VIC-II registers (mirrored every 64 bytes)
// $D400-$DFFF: other I/O (SID, CIAs, color RAM) - reads 0 here
// $E000-$FFFF: RAM (KERNAL banking not modeled)
// ```

use crate::cpu::CpuBus;
use crate::io_chip::IoChip;
use crate::memory::SharedRam;
use crate::vic::Vic;

/// The C64 main bus: shared RAM plus the VIC window
pub struct C64Bus {
    /// 64KB main memory, shared with the sprite engines
    pub ram: SharedRam,

    /// The video chip
    pub vic: Vic,

    /// CPU cycle stamp; the VIC is brought up to it before register
    /// access so reads reflect the most recent update
    pub clock: u64,
}

impl C64Bus {
    /// Build the bus around an existing shared memory
    pub fn new(ram: SharedRam) -> Self {
        let vic = Vic::new(ram.clone());
        C64Bus {
            ram,
            vic,
            clock: 0,
        }
    }

    /// Advance the bus clock (called by the master loop each step)
    pub fn set_clock(&mut self, cycles: u64) {
        self.clock = cycles;
    }
}

impl CpuBus for C64Bus {
    fn read(&mut self, addr: u16) -> u8 {
        match addr {
            0xD000..=0xD3FF => {
                self.vic.update(self.clock);
                self.vic.read_register((addr & 0x3F) as u8)
            }
            // Unmodeled I/O space
            0xD400..=0xDFFF => 0,
            _ => self.ram.borrow()[addr as usize],
        }
    }

    fn write(&mut self, addr: u16, data: u8) {
        match addr {
            0xD000..=0xD3FF => {
                self.vic.update(self.clock);
                self.vic.write_register((addr & 0x3F) as u8, data);
            }
            0xD400..=0xDFFF => {}
            _ => self.ram.borrow_mut()[addr as usize] = data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::new_shared_ram;

    #[test]
    fn test_ram_read_write() {
        let mut bus = C64Bus::new(new_shared_ram());
        bus.write(0x1234, 0x42);
        assert_eq!(bus.read(0x1234), 0x42);

        // High RAM is plain RAM here
        bus.write(0xE000, 0x99);
        assert_eq!(bus.read(0xE000), 0x99);
    }

    #[test]
    fn test_vic_window_mirrors_every_64_bytes() {
        let mut bus = C64Bus::new(new_shared_ram());
        bus.write(0xD015, 0x0F); // sprite enable
        assert_eq!(bus.read(0xD015), 0x0F);
        assert_eq!(bus.read(0xD055), 0x0F, "Window repeats every $40");
        assert!(bus.vic.sprites[3].is_enabled());
    }

    #[test]
    fn test_unmodeled_io_reads_zero() {
        let mut bus = C64Bus::new(new_shared_ram());
        bus.write(0xD400, 0xFF);
        assert_eq!(bus.read(0xD400), 0);
    }

    #[test]
    fn test_shared_ram_is_visible_to_sprites() {
        let ram = new_shared_ram();
        let mut bus = C64Bus::new(ram.clone());
        bus.write(0x2000, 0xAB);
        assert_eq!(ram.borrow()[0x2000], 0xAB);
    }
}
