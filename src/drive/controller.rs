// Disk controller - job-queue dispatcher, rotation timing and sync ops
//
// The 1541 firmware posts work for the disk controller into a five-slot
// job queue in low RAM. When controller emulation is off, the 0x100 trap
// routes the firmware's IRQ routine here instead: the dispatcher walks
// the slots, performs the I/O against the backend and writes status
// bytes back where the firmware expects them.
//
// # Job queue layout (drive RAM)
//
// | Address        | Meaning                              |
// |----------------|--------------------------------------|
// | $00-$04        | Command/status byte for slot 0-4     |
// | $06+2n / $07+2n| Track / sector for slot n            |
// | $0300 + $100*n | 256-byte data buffer for slot n      |
// | $3F            | Slot currently being serviced        |
// | $22            | Current track (SEARCH)               |
// | $43            | Sectors on current track (SEARCH)    |
// | $4C            | Sector of the last READ/WRITE        |
// | $4D            | Sector to search for (SEARCH)        |

use crate::drive::disk::{DiskBackend, DiskError, BLOCK_SIZE, SECTORS_PER_TRACK};
use crate::drive::EmulationError;
use crate::emulator::snapshot::{SnapshotError, SnapshotReader, SnapshotWriter};
use crate::memory::DriveMemory;
use crate::via::Via;

/// Job command codes (high nibble of the slot byte; bit 7 = pending)
pub mod job {
    pub const READ: u8 = 0x80;
    pub const WRITE: u8 = 0x90;
    pub const VERIFY: u8 = 0xA0;
    pub const SEARCH: u8 = 0xB0;
    pub const BUMP: u8 = 0xC0;
    pub const EXECUTE: u8 = 0xD0;
    pub const EXECUTE_WITH_STARTUP: u8 = 0xE0;
}

/// Status codes written back into the slot byte
pub mod status {
    pub const OK: u8 = 0x01;
    pub const NOT_FOUND: u8 = 0x04;
    pub const WRITE_PROTECT: u8 = 0x08;
    pub const NO_DISK: u8 = 0x0F;
}

/// Number of job slots
pub const JOB_SLOTS: usize = 5;

/// Base of the per-slot data buffers
const JOB_BUFFER_BASE: usize = 0x0300;

/// RAM cell holding the slot being serviced
const CURRENT_SLOT: usize = 0x3F;

/// RAM cells updated by SEARCH
const CURRENT_TRACK: usize = 0x22;
const SECTOR_COUNT: usize = 0x43;
const SEARCH_SECTOR: usize = 0x4D;

/// RAM cell holding the sector of the last READ/WRITE
const LAST_SECTOR: usize = 0x4C;

/// VIA 1 register whose read acknowledges the controller IRQ (T1C-L)
const IRQ_ACK_REGISTER: u8 = 0x4;

/// CPU cycles between BYTE READY pulses while the motor runs.
/// GCR-level timing is out of scope; the firmware only needs a
/// plausible cadence.
pub const BYTE_READY_PERIOD: u64 = 26;

/// The disk controller half of the 1541
pub struct DiskController {
    backend: Option<Box<dyn DiskBackend>>,

    /// The drive LED: lit while any slot carried a command
    active: bool,

    /// Spindle motor state (driven from VIA 1 port B)
    motor_on: bool,

    /// BYTE READY line; consumed by the CPU's overflow-flag fold
    byte_ready: bool,

    /// Cycle at which the next byte comes off the disk
    next_byte_at: u64,

    /// Cycle stamp of the last `update`
    last_update: u64,

    /// Sync marks written since power-on
    syncs_written: u64,
}

impl DiskController {
    pub fn new() -> Self {
        DiskController {
            backend: None,
            active: false,
            motor_on: false,
            byte_ready: false,
            next_byte_at: BYTE_READY_PERIOD,
            last_update: 0,
            syncs_written: 0,
        }
    }

    /// Mount a disk backend
    pub fn attach(&mut self, backend: Box<dyn DiskBackend>) {
        self.backend = Some(backend);
    }

    /// Unmount the backend, returning it to the caller
    pub fn detach(&mut self) -> Option<Box<dyn DiskBackend>> {
        self.backend.take()
    }

    pub fn has_backend(&self) -> bool {
        self.backend.is_some()
    }

    /// Drive LED state
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_motor_on(&self) -> bool {
        self.motor_on
    }

    /// Spindle motor control; a stopped motor produces no bytes
    pub fn set_motor(&mut self, on: bool) {
        if self.motor_on != on {
            self.motor_on = on;
            self.byte_ready = false;
            self.next_byte_at = self.last_update + BYTE_READY_PERIOD;
        }
    }

    /// Consume the BYTE READY line. The CPU folds this into the
    /// overflow flag before each instruction; reading it re-arms the
    /// pulse for the next byte cell.
    pub fn is_byte_ready(&mut self) -> bool {
        let ready = self.byte_ready;
        self.byte_ready = false;
        ready
    }

    /// Advance rotation to `current_cycles`
    pub fn update(&mut self, current_cycles: u64) {
        self.last_update = current_cycles;
        if self.motor_on && current_cycles >= self.next_byte_at {
            self.byte_ready = true;
            self.next_byte_at = current_cycles + BYTE_READY_PERIOD;
        }
    }

    /// Cycle of the next BYTE READY pulse
    pub fn next_update(&self) -> u64 {
        if self.motor_on {
            self.next_byte_at
        } else {
            crate::io_chip::IDLE
        }
    }

    /// Skip ahead to the next sync mark on the track: the pending byte
    /// is discarded and the rotation phase realigns.
    pub fn proceed_to_next_sync(&mut self) {
        self.byte_ready = false;
        self.next_byte_at = self.last_update + BYTE_READY_PERIOD;
    }

    /// Emit a sync mark at the current rotation position
    pub fn write_sync(&mut self) {
        self.byte_ready = false;
        self.next_byte_at = self.last_update + BYTE_READY_PERIOD;
        self.syncs_written += 1;
    }

    /// Sync marks written since power-on
    pub fn syncs_written(&self) -> u64 {
        self.syncs_written
    }

    /// The firmware's disk-controller IRQ routine, natively.
    ///
    /// Walks all five job slots; a slot byte with bit 7 set is a pending
    /// command. Backend errors become status codes in the slot byte;
    /// anything the protocol cannot express is fatal.
    pub fn execute_jobs(
        &mut self,
        memory: &mut DriveMemory,
        via_disk: &mut Via,
    ) -> Result<(), EmulationError> {
        use crate::io_chip::IoChip;

        // Reading T1C-L clears the pending controller IRQ
        via_disk.read_register(IRQ_ACK_REGISTER);

        for slot in 0..JOB_SLOTS {
            let command = memory.get(slot) & 0xF0;
            let track = memory.get(0x06 + 2 * slot);
            let sector = memory.get(0x07 + 2 * slot);
            let buffer = JOB_BUFFER_BASE + 0x100 * slot;

            if command > 0 {
                self.active = true;
            }
            memory.set(CURRENT_SLOT, slot as u8);

            if command & 0x80 == 0 {
                continue;
            }

            let outcome = self.run_job(memory, command, track, sector, buffer);
            match outcome {
                Ok(code) => memory.set(slot, code),
                Err(EmulationError::Disk(err)) => match err {
                    DiskError::NotFound => memory.set(slot, status::NOT_FOUND),
                    DiskError::WriteProtected => memory.set(slot, status::WRITE_PROTECT),
                    DiskError::NoDisk => memory.set(slot, status::NO_DISK),
                    fatal @ DiskError::Io(_) => return Err(EmulationError::Disk(fatal)),
                },
                Err(other) => return Err(other),
            }
        }

        Ok(())
    }

    fn backend(&mut self) -> Result<&mut dyn DiskBackend, EmulationError> {
        match self.backend.as_deref_mut() {
            Some(backend) => Ok(backend),
            None => Err(EmulationError::Disk(DiskError::NoDisk)),
        }
    }

    fn run_job(
        &mut self,
        memory: &mut DriveMemory,
        command: u8,
        track: u8,
        sector: u8,
        buffer: usize,
    ) -> Result<u8, EmulationError> {
        match command {
            job::READ => {
                let backend = self.backend()?;
                backend.goto_block(track, sector).map_err(EmulationError::Disk)?;
                let block = backend.read_block().map_err(EmulationError::Disk)?;
                memory.copy_in(buffer, &block);
                memory.set(LAST_SECTOR, sector);
                Ok(status::OK)
            }
            job::WRITE => {
                let mut block = [0u8; BLOCK_SIZE];
                memory.copy_out(buffer, &mut block);
                let backend = self.backend()?;
                backend.goto_block(track, sector).map_err(EmulationError::Disk)?;
                backend.write_block(&block).map_err(EmulationError::Disk)?;
                memory.set(LAST_SECTOR, sector);
                Ok(status::OK)
            }
            job::VERIFY | job::BUMP => Ok(status::OK),
            job::SEARCH => {
                memory.set(CURRENT_TRACK, track);
                let sectors = SECTORS_PER_TRACK
                    .get(usize::from(track))
                    .copied()
                    .unwrap_or(0);
                memory.set(SECTOR_COUNT, sectors);
                memory.set(SEARCH_SECTOR, sector);
                Ok(status::OK)
            }
            job::EXECUTE | job::EXECUTE_WITH_STARTUP => Err(EmulationError::Unimplemented(
                format!("job command ${:02X} (execute buffer program)", command),
            )),
            _ => Err(EmulationError::Unimplemented(format!(
                "job command ${:02X}",
                command
            ))),
        }
    }

    /// Serialize rotation and LED state (the backend itself is external)
    pub fn save_state(&self, w: &mut SnapshotWriter) {
        w.write_bool(self.active);
        w.write_bool(self.motor_on);
        w.write_bool(self.byte_ready);
        w.write_u64(self.next_byte_at);
        w.write_u64(self.last_update);
        w.write_u64(self.syncs_written);
    }

    /// Restore state written by [`save_state`](Self::save_state)
    pub fn restore_state(&mut self, r: &mut SnapshotReader) -> Result<(), SnapshotError> {
        self.active = r.read_bool()?;
        self.motor_on = r.read_bool()?;
        self.byte_ready = r.read_bool()?;
        self.next_byte_at = r.read_u64()?;
        self.last_update = r.read_u64()?;
        self.syncs_written = r.read_u64()?;
        Ok(())
    }

    /// Power-on state; keeps the attached backend
    pub fn reset(&mut self) {
        self.active = false;
        self.motor_on = false;
        self.byte_ready = false;
        self.next_byte_at = BYTE_READY_PERIOD;
        self.last_update = 0;
        self.syncs_written = 0;
    }
}

impl Default for DiskController {
    fn default() -> Self {
        Self::new()
    }
}
