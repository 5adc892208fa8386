// Drive module - the 1541 floppy drive
//
// The drive owns everything on its side of the serial cable: the 6502
// core, the backing memory, both VIAs and the disk controller. The CPU
// and chips never hold references back - each bus operation borrows a
// view of the components, so no ownership cycle exists.

pub mod controller;
pub mod cpu;
pub mod disk;
pub mod rom;

pub use controller::DiskController;
pub use cpu::{ext, ROM_TRAPS};
pub use disk::{DiskBackend, DiskError, MemoryDisk, BLOCK_SIZE, SECTORS_PER_TRACK};
pub use rom::{RomError, FLOPPY_ROM_RESOURCE};

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use crate::cpu::{Cpu, InterruptSource};
use crate::drive::cpu::DriveBus;
use crate::emulator::snapshot::{self, SnapshotError, SnapshotReader, SnapshotWriter};
use crate::io_chip::IoChip;
use crate::memory::DriveMemory;
use crate::via::Via;

/// Fatal emulation errors.
///
/// Everything the emulated firmware can express is reported through
/// status bytes instead; these abort the run.
#[derive(Debug)]
pub enum EmulationError {
    /// An operation with undefined semantics was requested
    Unimplemented(String),

    /// A disk backend failure the job protocol cannot express
    Disk(DiskError),
}

impl fmt::Display for EmulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmulationError::Unimplemented(what) => write!(f, "Unimplemented: {}", what),
            EmulationError::Disk(e) => write!(f, "Fatal disk error: {}", e),
        }
    }
}

impl std::error::Error for EmulationError {}

impl From<DiskError> for EmulationError {
    fn from(e: DiskError) -> Self {
        EmulationError::Disk(e)
    }
}

/// The 1541 floppy drive
pub struct FloppyDrive {
    /// The drive's 6502
    pub cpu: Cpu,

    /// 2KB RAM + 16KB patched ROM
    pub memory: DriveMemory,

    /// VIA 0 at $1800: serial bus controller
    pub via_bus: Via,

    /// VIA 1 at $1C00: disk controller interface
    pub via_disk: Via,

    /// Job dispatcher, rotation timing, backend
    pub controller: DiskController,

    /// Trap side table: ROM address -> extension opcode
    pub(crate) traps: HashMap<u16, u16>,

    /// Use the firmware's own controller routine instead of the native
    /// dispatcher when the 0x100 trap fires
    pub(crate) emulate_controller: bool,

    /// Set by the STOP_DRIVE trap; the master loop skips a stopped drive
    pub(crate) stopped: bool,
}

impl FloppyDrive {
    /// Create a drive with no ROM loaded. Both VIAs hang off the CPU's
    /// IRQ line.
    pub fn new() -> Self {
        let mut cpu = Cpu::new();
        cpu.irq_sources = vec![
            InterruptSource::BusController,
            InterruptSource::DiskController,
        ];

        FloppyDrive {
            cpu,
            memory: DriveMemory::new(),
            via_bus: Via::new(),
            via_disk: Via::new(),
            controller: DiskController::new(),
            traps: HashMap::new(),
            emulate_controller: false,
            stopped: false,
        }
    }

    /// Load the 16KB floppy ROM, install the trap patches and reset
    pub fn load_rom(&mut self, image: &[u8]) -> Result<(), RomError> {
        rom::validate_image(image)?;
        self.memory.load_rom(image);
        self.install_traps();
        self.reset();
        Ok(())
    }

    /// Load the floppy ROM from a file
    pub fn load_rom_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), RomError> {
        let image = rom::load_image(path)?;
        self.load_rom(&image)
    }

    /// Overwrite the trap cells with extension opcodes.
    ///
    /// The 8-bit backing cells keep their original firmware bytes; the
    /// widened opcodes live only in the side table the fetch consults.
    fn install_traps(&mut self) {
        self.traps.clear();
        for (address, opcode) in ROM_TRAPS {
            self.traps.insert(address, opcode);
        }
    }

    /// Mount a disk backend on the controller
    pub fn attach_disk(&mut self, backend: Box<dyn DiskBackend>) {
        self.controller.attach(backend);
    }

    /// Reset: clear RAM, reset the chips, reload PC from the reset
    /// vector in ROM.
    pub fn reset(&mut self) {
        self.memory.clear_ram();
        self.via_bus.reset();
        self.via_disk.reset();
        self.controller.reset();
        self.stopped = false;

        let FloppyDrive {
            cpu,
            memory,
            via_bus,
            via_disk,
            traps,
            ..
        } = self;
        let mut bus = DriveBus {
            memory,
            via_bus,
            via_disk,
            traps,
            clock: cpu.cycles,
        };
        cpu.reset(&mut bus);
    }

    /// Whether the drive executes instructions
    pub fn is_running(&self) -> bool {
        !self.stopped
    }

    /// Restart a stopped drive
    pub fn start(&mut self) {
        self.stopped = false;
    }

    /// Park the drive; the master loop skips it until restarted
    pub fn stop(&mut self) {
        self.stopped = true;
    }

    /// Select firmware-level controller emulation (true) or the native
    /// job dispatcher (false, the default).
    pub fn set_controller_emulation(&mut self, emulate: bool) {
        self.emulate_controller = emulate;
    }

    /// The PC as reported to external observers: ROM addresses carry
    /// the backing-array projection.
    pub fn projected_pc(&self) -> u32 {
        DriveMemory::project_pc(self.cpu.pc)
    }

    /// Run the drive until its cycle counter reaches `target_cycles`
    /// (the drive clock tracks the C64 clock one-to-one here).
    pub fn run_until(
        &mut self,
        target_cycles: u64,
        logger: &mut crate::debug::Logger,
    ) -> Result<(), EmulationError> {
        while !self.stopped && self.cpu.cycles < target_cycles {
            self.step(logger)?;
        }
        Ok(())
    }

    /// Serialize the drive: CPU (base state + interrupt source tags),
    /// RAM, both VIAs, controller and lifecycle flags. ROM and traps
    /// are reinstalled from the resource, not stored.
    pub fn save_state(&self, w: &mut SnapshotWriter) {
        snapshot::save_cpu(&self.cpu, w);
        w.write_bytes(self.memory.ram());
        self.via_bus.save_state(w);
        self.via_disk.save_state(w);
        self.controller.save_state(w);
        w.write_bool(self.stopped);
        w.write_bool(self.emulate_controller);
    }

    /// Restore state written by [`save_state`](Self::save_state)
    pub fn restore_state(&mut self, r: &mut SnapshotReader) -> Result<(), SnapshotError> {
        snapshot::restore_cpu(&mut self.cpu, r)?;
        let ram = r.read_bytes()?;
        self.memory.restore_ram(&ram);
        self.via_bus.restore_state(r)?;
        self.via_disk.restore_state(r)?;
        self.controller.restore_state(r)?;
        self.stopped = r.read_bool()?;
        self.emulate_controller = r.read_bool()?;
        Ok(())
    }
}

impl Default for FloppyDrive {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debug::Logger;
    use crate::memory::DRIVE_ROM_SIZE;

    /// Minimal firmware: NOP sled with the reset vector pointing into it
    fn test_rom(reset_target: u16) -> Vec<u8> {
        let mut image = vec![0xEA; DRIVE_ROM_SIZE];
        // Vector cells live at the top of the ROM
        image[DRIVE_ROM_SIZE - 4] = (reset_target & 0xFF) as u8;
        image[DRIVE_ROM_SIZE - 3] = (reset_target >> 8) as u8;
        image
    }

    #[test]
    fn test_load_rom_installs_traps_and_resets() {
        let mut drive = FloppyDrive::new();
        drive.load_rom(&test_rom(0xC000)).unwrap();

        assert_eq!(drive.cpu.pc, 0xC000, "PC from the reset vector");
        assert_eq!(drive.traps.len(), ROM_TRAPS.len());
        assert!(drive.is_running());
    }

    #[test]
    fn test_load_rom_rejects_bad_length() {
        let mut drive = FloppyDrive::new();
        assert!(drive.load_rom(&[0u8; 100]).is_err());
    }

    #[test]
    fn test_stepping_executes_rom_nops() {
        let mut drive = FloppyDrive::new();
        drive.load_rom(&test_rom(0xC000)).unwrap();
        let mut logger = Logger::new();

        let cycles = drive.step(&mut logger).unwrap();
        assert_eq!(cycles, 2, "NOP costs two cycles");
        assert_eq!(drive.cpu.pc, 0xC001);
    }

    #[test]
    fn test_stopped_drive_consumes_nothing() {
        let mut drive = FloppyDrive::new();
        drive.load_rom(&test_rom(0xC000)).unwrap();
        drive.stop();
        let mut logger = Logger::new();

        assert_eq!(drive.step(&mut logger).unwrap(), 0);
        assert_eq!(drive.cpu.pc, 0xC000, "No instruction ran");

        drive.start();
        assert_eq!(drive.step(&mut logger).unwrap(), 2);
    }

    #[test]
    fn test_pc_projection_for_observers() {
        let mut drive = FloppyDrive::new();
        drive.load_rom(&test_rom(0xEAC0)).unwrap();
        assert_eq!(
            drive.projected_pc(),
            DriveMemory::project_pc(0xEAC0),
            "ROM addresses are projected into the backing array"
        );

        drive.cpu.pc = 0x0123;
        assert_eq!(drive.projected_pc(), 0x0123, "RAM addresses pass through");
    }

    #[test]
    fn test_ram_io_rom_decode() {
        let mut drive = FloppyDrive::new();
        drive.load_rom(&test_rom(0xC000)).unwrap();

        let FloppyDrive {
            cpu,
            memory,
            via_bus,
            via_disk,
            traps,
            ..
        } = &mut drive;
        let mut bus = DriveBus {
            memory,
            via_bus,
            via_disk,
            traps,
            clock: cpu.cycles,
        };
        use crate::cpu::CpuBus;

        // RAM mirror
        bus.write(0x0000, 0x42);
        assert_eq!(bus.read(0x0800), 0x42);

        // ROM reads, write dropped
        assert_eq!(bus.read(0xC000), 0xEA);
        bus.write(0xC000, 0x00);
        assert_eq!(bus.read(0xC000), 0xEA);

        // VIA window: DDR register holds its value
        bus.write(0x1803, 0x55);
        assert_eq!(bus.read(0x1803), 0x55);
        bus.write(0x1C03, 0xAA);
        assert_eq!(bus.read(0x1C03), 0xAA);

        // Unmapped I/O sub-range and open address space
        assert_eq!(bus.read(0x1400), 0);
        assert_eq!(bus.read(0x5000), 0);
        bus.write(0x5000, 0xFF);
        assert_eq!(bus.read(0x5000), 0);
    }

    #[test]
    fn test_drive_snapshot_roundtrip() {
        let mut drive = FloppyDrive::new();
        drive.load_rom(&test_rom(0xC000)).unwrap();
        let mut logger = Logger::new();
        drive.memory.write_ram(0x0040, 0x99);
        for _ in 0..5 {
            drive.step(&mut logger).unwrap();
        }

        let mut w = SnapshotWriter::new();
        drive.save_state(&mut w);
        let bytes = w.into_bytes();

        let mut restored = FloppyDrive::new();
        restored.load_rom(&test_rom(0xC000)).unwrap();
        let mut r = SnapshotReader::new(&bytes);
        restored.restore_state(&mut r).unwrap();

        assert_eq!(restored.cpu.pc, drive.cpu.pc);
        assert_eq!(restored.cpu.cycles, drive.cpu.cycles);
        assert_eq!(restored.memory.read_ram(0x0040), 0x99);
        assert_eq!(restored.cpu.irq_sources, drive.cpu.irq_sources);
    }
}
