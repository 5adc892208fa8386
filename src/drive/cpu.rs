// Drive CPU - address decode, ROM traps and extended instruction dispatch
//
// The drive CPU is the shared 6502 core behind a bus that decodes the
// 1541 memory map and consults a trap side table at fetch time. A cell
// patched as a trap makes `Cpu::step` return `StepResult::Extended`,
// and the handlers below run native code in place of the firmware
// sequence the trap replaced.
//
// # Address decode (by `address & 0xF000`)
//
// | Block           | Target                                     |
// |-----------------|--------------------------------------------|
// | $0000           | 2KB RAM, mirrored (`address & 0x07FF`)     |
// | $1000           | I/O: $18xx VIA 0, $1Cxx VIA 1 (reg = a&$F) |
// | $C000-$F000     | 16KB ROM (writes silently dropped)         |
// | anything else   | reads 0, writes ignored                    |

use std::collections::HashMap;

use crate::cpu::{flags, CpuBus, StepResult};
use crate::debug::{LogLevel, Logger};
use crate::drive::{EmulationError, FloppyDrive};
use crate::io_chip::IoChip;
use crate::memory::{DriveMemory, DRIVE_ROM_BASE};
use crate::via::Via;

/// Synthetic extension opcodes installed over the floppy ROM
pub mod ext {
    /// $F2B0: disk-controller IRQ routine (native job dispatcher)
    pub const JOB_DISPATCH: u16 = 0x100;
    /// $EAC9: skip the ROM self-test
    pub const SKIP_SELF_TEST: u16 = 0x101;
    /// $EBFF: idle loop reached - stop the drive
    pub const STOP_DRIVE: u16 = 0x102;
    /// $D7B4: log the filename being opened
    pub const LOG_FILENAME: u16 = 0x103;
    /// $F58C: wait for the next sync mark
    pub const NEXT_SYNC: u16 = 0x104;
    /// $F5A3: write a sync mark
    pub const WRITE_SYNC: u16 = 0x105;
    /// $FCB1/$FCDC: write a sync mark inside the format loop
    pub const WRITE_SYNC_SKIP: u16 = 0x106;
}

/// ROM cells patched with extension opcodes at initialization
pub const ROM_TRAPS: [(u16, u16); 8] = [
    (0xF2B0, ext::JOB_DISPATCH),
    (0xEAC9, ext::SKIP_SELF_TEST),
    (0xEBFF, ext::STOP_DRIVE),
    (0xD7B4, ext::LOG_FILENAME),
    (0xF58C, ext::NEXT_SYNC),
    (0xF5A3, ext::WRITE_SYNC),
    (0xFCB1, ext::WRITE_SYNC_SKIP),
    (0xFCDC, ext::WRITE_SYNC_SKIP),
];

/// Return address into the firmware's main IRQ handler after the native
/// job dispatcher ran
const JOB_DISPATCH_RETURN: u16 = 0xFAC6;

/// Resume addresses for the sync traps
const NEXT_SYNC_RETURN: u16 = 0xF594;
const WRITE_SYNC_RETURN: u16 = 0xF5B1;

/// PC advance applied by the format-loop sync trap
const WRITE_SYNC_SKIP_BYTES: u16 = 11;

/// Nominal cycle cost of a native trap handler
const TRAP_CYCLES: u8 = 2;

/// Drive RAM range holding the null-terminated filename logged by the
/// LOG_FILENAME trap
const FILENAME_START: u16 = 0x0200;
const FILENAME_END: u16 = 0x020F;

/// VIA 1 port B bit wired to the spindle motor
const MOTOR_BIT: u8 = 0x04;

/// Borrowed view of the drive's bus components for one CPU operation
pub(crate) struct DriveBus<'a> {
    pub memory: &'a mut DriveMemory,
    pub via_bus: &'a mut Via,
    pub via_disk: &'a mut Via,
    pub traps: &'a HashMap<u16, u16>,
    /// CPU cycle stamp; chips are updated to it before register reads
    pub clock: u64,
}

impl CpuBus for DriveBus<'_> {
    fn read(&mut self, addr: u16) -> u8 {
        match addr & 0xF000 {
            0x0000 => self.memory.read_ram(addr),
            0x1000 => match addr & 0xFF00 {
                0x1800 => {
                    self.via_bus.update(self.clock);
                    self.via_bus.read_register((addr & 0xF) as u8)
                }
                0x1C00 => {
                    self.via_disk.update(self.clock);
                    self.via_disk.read_register((addr & 0xF) as u8)
                }
                _ => 0,
            },
            0xC000 | 0xD000 | 0xE000 | 0xF000 => self.memory.read_rom(addr),
            _ => 0,
        }
    }

    fn write(&mut self, addr: u16, data: u8) {
        match addr & 0xF000 {
            0x0000 => self.memory.write_ram(addr, data),
            0x1000 => match addr & 0xFF00 {
                0x1800 => {
                    self.via_bus.update(self.clock);
                    self.via_bus.write_register((addr & 0xF) as u8, data)
                }
                0x1C00 => {
                    self.via_disk.update(self.clock);
                    self.via_disk.write_register((addr & 0xF) as u8, data)
                }
                _ => {}
            },
            // ROM writes and unmapped windows are silently dropped
            _ => {}
        }
    }

    fn fetch(&mut self, addr: u16) -> u16 {
        if addr >= DRIVE_ROM_BASE {
            if let Some(&opcode) = self.traps.get(&addr) {
                return opcode;
            }
        }
        u16::from(self.read(addr))
    }
}

/// Builds the bus view out of split borrows of the drive's fields
macro_rules! drive_bus {
    ($drive:expr, $cpu:ident, $bus:ident) => {
        let FloppyDrive {
            cpu: $cpu,
            memory,
            via_bus,
            via_disk,
            traps,
            ..
        } = $drive;
        let mut $bus = DriveBus {
            memory,
            via_bus,
            via_disk,
            traps,
            clock: $cpu.cycles,
        };
    };
}

impl FloppyDrive {
    /// Execute one drive instruction (or the native handler a trap
    /// replaced it with). Returns the cycles consumed; a stopped drive
    /// consumes none.
    pub fn step(&mut self, logger: &mut Logger) -> Result<u8, EmulationError> {
        if self.stopped {
            return Ok(0);
        }

        // The spindle motor follows VIA 1's port B output
        self.controller
            .set_motor(self.via_disk.port_b_output() & MOTOR_BIT != 0);

        // Chips catch up to the CPU clock before the instruction
        let clock = self.cpu.cycles;
        if clock >= self.via_bus.next_update() {
            self.via_bus.update(clock);
        }
        if clock >= self.via_disk.next_update() {
            self.via_disk.update(clock);
        }
        self.controller.update(clock);

        // BYTE READY is wired to the SO pin: OR it into the overflow
        // flag so BVC/BVS can poll it
        if self.controller.is_byte_ready() {
            self.cpu.set_flag(flags::OVERFLOW);
        }

        // VIA IRQ lines into the CPU
        if self.via_bus.irq_asserted() || self.via_disk.irq_asserted() {
            drive_bus!(self, cpu, bus);
            cpu.irq(&mut bus);
        }

        let result = {
            drive_bus!(self, cpu, bus);
            cpu.step(&mut bus)
        };

        match result {
            StepResult::Completed(cycles) => Ok(cycles),
            StepResult::Extended(opcode) => self.emulate_extended_instruction(opcode, logger),
        }
    }

    /// Run the original 8-bit opcode a trap replaced
    fn run_original(&mut self, opcode: u8) -> u8 {
        drive_bus!(self, cpu, bus);
        cpu.execute_fetched(opcode, &mut bus)
    }

    /// Dispatch a synthetic extension opcode to its native handler.
    ///
    /// The instruction table is never mutated by any of these; handlers
    /// either run the replaced original through the normal dispatch or
    /// redirect the PC.
    pub(crate) fn emulate_extended_instruction(
        &mut self,
        opcode: u16,
        logger: &mut Logger,
    ) -> Result<u8, EmulationError> {
        match opcode {
            ext::JOB_DISPATCH => {
                if self.emulate_controller {
                    // Firmware-level controller emulation selected: run
                    // the TSX this trap replaced and continue in ROM.
                    Ok(self.run_original(0xBA))
                } else {
                    {
                        let FloppyDrive {
                            memory,
                            via_disk,
                            controller,
                            ..
                        } = self;
                        controller.execute_jobs(memory, via_disk)?;
                    }
                    self.cpu.pc = JOB_DISPATCH_RETURN;
                    self.cpu.cycles = self.cpu.cycles.wrapping_add(u64::from(TRAP_CYCLES));
                    Ok(TRAP_CYCLES)
                }
            }
            ext::SKIP_SELF_TEST => {
                self.cpu.pc = 0xEAEA;
                self.cpu.cycles = self.cpu.cycles.wrapping_add(u64::from(TRAP_CYCLES));
                Ok(TRAP_CYCLES)
            }
            ext::STOP_DRIVE => {
                // Run the CLI this trap replaced, then park the drive
                let cycles = self.run_original(0x58);
                self.stopped = true;
                logger.log_message(LogLevel::Debug, "Drive reached idle, stopping".to_string());
                Ok(cycles)
            }
            ext::LOG_FILENAME => {
                let cycles = self.run_original(0xA5);
                let filename = self.read_filename();
                logger.log_message(
                    LogLevel::Info,
                    format!("Drive opening file \"{}\"", filename),
                );
                Ok(cycles)
            }
            ext::NEXT_SYNC => {
                self.controller.proceed_to_next_sync();
                self.cpu.pc = NEXT_SYNC_RETURN;
                self.cpu.cycles = self.cpu.cycles.wrapping_add(u64::from(TRAP_CYCLES));
                Ok(TRAP_CYCLES)
            }
            ext::WRITE_SYNC => {
                self.controller.write_sync();
                self.cpu.pc = WRITE_SYNC_RETURN;
                self.cpu.cycles = self.cpu.cycles.wrapping_add(u64::from(TRAP_CYCLES));
                Ok(TRAP_CYCLES)
            }
            ext::WRITE_SYNC_SKIP => {
                self.controller.write_sync();
                self.cpu.pc = self.cpu.pc.wrapping_add(WRITE_SYNC_SKIP_BYTES);
                self.cpu.cycles = self.cpu.cycles.wrapping_add(u64::from(TRAP_CYCLES));
                Ok(TRAP_CYCLES)
            }
            _ => Err(EmulationError::Unimplemented(format!(
                "extension opcode ${:03X}",
                opcode
            ))),
        }
    }

    /// Read the null-terminated filename at $0200-$020F in drive RAM
    fn read_filename(&self) -> String {
        let mut name = String::new();
        for addr in FILENAME_START..=FILENAME_END {
            let byte = self.memory.read_ram(addr);
            if byte == 0 {
                break;
            }
            // PETSCII letters and digits coincide with ASCII closely
            // enough for a log line
            if byte.is_ascii_graphic() || byte == b' ' {
                name.push(byte as char);
            } else {
                name.push('?');
            }
        }
        name
    }
}
