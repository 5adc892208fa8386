// VIA module - MOS 6522 Versatile Interface Adapter
//
// The 1541 carries two of these: VIA 0 at $1800 handles the serial bus,
// VIA 1 at $1C00 handles the disk controller. Both are the same register
// file; the drive wires their ports differently. Timer interrupts are
// what the firmware's job loop runs on - reading T1C-L acknowledges the
// timer IRQ, which is exactly what the job dispatcher's register read of
// $1C04 relies on.

use crate::emulator::snapshot::{SnapshotError, SnapshotReader, SnapshotWriter};
use crate::io_chip::{IoChip, IDLE};

/// Register numbers within the 16-byte window
pub mod registers {
    pub const ORB: u8 = 0x0; // Port B data
    pub const ORA: u8 = 0x1; // Port A data (with handshake)
    pub const DDRB: u8 = 0x2; // Port B data direction
    pub const DDRA: u8 = 0x3; // Port A data direction
    pub const T1C_L: u8 = 0x4; // Timer 1 counter low (read clears T1 IRQ)
    pub const T1C_H: u8 = 0x5; // Timer 1 counter high (write starts T1)
    pub const T1L_L: u8 = 0x6; // Timer 1 latch low
    pub const T1L_H: u8 = 0x7; // Timer 1 latch high
    pub const T2C_L: u8 = 0x8; // Timer 2 counter low (read clears T2 IRQ)
    pub const T2C_H: u8 = 0x9; // Timer 2 counter high (write starts T2)
    pub const SR: u8 = 0xA; // Shift register
    pub const ACR: u8 = 0xB; // Auxiliary control
    pub const PCR: u8 = 0xC; // Peripheral control
    pub const IFR: u8 = 0xD; // Interrupt flags
    pub const IER: u8 = 0xE; // Interrupt enable
    pub const ORA_NH: u8 = 0xF; // Port A data, no handshake
}

/// Interrupt flag bits (IFR/IER)
pub mod interrupts {
    pub const CA2: u8 = 0x01;
    pub const CA1: u8 = 0x02;
    pub const SHIFT: u8 = 0x04;
    pub const CB2: u8 = 0x08;
    pub const CB1: u8 = 0x10;
    pub const TIMER2: u8 = 0x20;
    pub const TIMER1: u8 = 0x40;
    /// IFR bit 7 mirrors "any enabled flag set"; never stored
    pub const ANY: u8 = 0x80;
}

/// ACR bit 6: Timer 1 free-run mode
const ACR_T1_FREE_RUN: u8 = 0x40;

/// One 6522 register file
pub struct Via {
    // Ports
    orb: u8,
    ora: u8,
    ddrb: u8,
    ddra: u8,
    /// External input lines, set by the owning machine
    irb: u8,
    ira: u8,

    // Timers
    t1_counter: u16,
    t1_latch: u16,
    t1_running: bool,
    t2_counter: u16,
    t2_latch_lo: u8,
    t2_running: bool,

    // Control
    sr: u8,
    acr: u8,
    pcr: u8,
    ifr: u8,
    ier: u8,

    /// Cycle stamp of the last `update` call
    last_update: u64,
}

impl Via {
    pub fn new() -> Self {
        Via {
            orb: 0,
            ora: 0,
            ddrb: 0,
            ddra: 0,
            irb: 0xFF,
            ira: 0xFF,
            t1_counter: 0,
            t1_latch: 0,
            t1_running: false,
            t2_counter: 0,
            t2_latch_lo: 0,
            t2_running: false,
            sr: 0,
            acr: 0,
            pcr: 0,
            ifr: 0,
            ier: 0,
            last_update: 0,
        }
    }

    /// Drive the external port A input lines
    pub fn set_port_a_input(&mut self, value: u8) {
        self.ira = value;
    }

    /// Drive the external port B input lines
    pub fn set_port_b_input(&mut self, value: u8) {
        self.irb = value;
    }

    /// Port A as seen by the peripheral (output bits only)
    pub fn port_a_output(&self) -> u8 {
        self.ora & self.ddra
    }

    /// Port B as seen by the peripheral (output bits only)
    pub fn port_b_output(&self) -> u8 {
        self.orb & self.ddrb
    }

    /// Signal an active CA1 edge (sets the CA1 interrupt flag)
    pub fn signal_ca1(&mut self) {
        self.ifr |= interrupts::CA1;
    }

    /// True while any enabled interrupt flag is set; this is the chip's
    /// IRQ line to the CPU.
    pub fn irq_asserted(&self) -> bool {
        (self.ifr & self.ier & 0x7F) != 0
    }

    #[inline]
    fn mix_port(output: u8, input: u8, ddr: u8) -> u8 {
        (output & ddr) | (input & !ddr)
    }

    fn run_timer(
        counter: &mut u16,
        running: &mut bool,
        delta: u64,
        free_run: bool,
        latch: u16,
    ) -> bool {
        if !*running || delta == 0 {
            return false;
        }
        let remaining = u64::from(*counter);
        if delta <= remaining {
            *counter = (remaining - delta) as u16;
            return false;
        }
        // Expired inside this slice
        if free_run {
            let period = u64::from(latch) + 2;
            let past = (delta - remaining - 1) % period;
            *counter = (period - 1 - past) as u16;
        } else {
            *counter = 0;
            *running = false;
        }
        true
    }
}

impl IoChip for Via {
    fn read_register(&mut self, register: u8) -> u8 {
        match register & 0xF {
            r if r == registers::ORB => {
                self.ifr &= !(interrupts::CB1 | interrupts::CB2);
                Self::mix_port(self.orb, self.irb, self.ddrb)
            }
            r if r == registers::ORA => {
                self.ifr &= !(interrupts::CA1 | interrupts::CA2);
                Self::mix_port(self.ora, self.ira, self.ddra)
            }
            r if r == registers::DDRB => self.ddrb,
            r if r == registers::DDRA => self.ddra,
            r if r == registers::T1C_L => {
                // Acknowledges the T1 interrupt
                self.ifr &= !interrupts::TIMER1;
                (self.t1_counter & 0xFF) as u8
            }
            r if r == registers::T1C_H => (self.t1_counter >> 8) as u8,
            r if r == registers::T1L_L => (self.t1_latch & 0xFF) as u8,
            r if r == registers::T1L_H => (self.t1_latch >> 8) as u8,
            r if r == registers::T2C_L => {
                self.ifr &= !interrupts::TIMER2;
                (self.t2_counter & 0xFF) as u8
            }
            r if r == registers::T2C_H => (self.t2_counter >> 8) as u8,
            r if r == registers::SR => {
                self.ifr &= !interrupts::SHIFT;
                self.sr
            }
            r if r == registers::ACR => self.acr,
            r if r == registers::PCR => self.pcr,
            r if r == registers::IFR => {
                let active = u8::from(self.irq_asserted()) * interrupts::ANY;
                self.ifr | active
            }
            r if r == registers::IER => self.ier | 0x80,
            _ => Self::mix_port(self.ora, self.ira, self.ddra),
        }
    }

    fn write_register(&mut self, register: u8, data: u8) {
        match register & 0xF {
            r if r == registers::ORB => {
                self.ifr &= !(interrupts::CB1 | interrupts::CB2);
                self.orb = data;
            }
            r if r == registers::ORA => {
                self.ifr &= !(interrupts::CA1 | interrupts::CA2);
                self.ora = data;
            }
            r if r == registers::DDRB => self.ddrb = data,
            r if r == registers::DDRA => self.ddra = data,
            r if r == registers::T1C_L => {
                self.t1_latch = (self.t1_latch & 0xFF00) | u16::from(data);
            }
            r if r == registers::T1C_H => {
                // Loading the high counter arms the timer and clears T1
                self.t1_latch = (self.t1_latch & 0x00FF) | (u16::from(data) << 8);
                self.t1_counter = self.t1_latch;
                self.ifr &= !interrupts::TIMER1;
                self.t1_running = true;
            }
            r if r == registers::T1L_L => {
                self.t1_latch = (self.t1_latch & 0xFF00) | u16::from(data);
            }
            r if r == registers::T1L_H => {
                self.t1_latch = (self.t1_latch & 0x00FF) | (u16::from(data) << 8);
                self.ifr &= !interrupts::TIMER1;
            }
            r if r == registers::T2C_L => self.t2_latch_lo = data,
            r if r == registers::T2C_H => {
                self.t2_counter = (u16::from(data) << 8) | u16::from(self.t2_latch_lo);
                self.ifr &= !interrupts::TIMER2;
                self.t2_running = true;
            }
            r if r == registers::SR => {
                self.ifr &= !interrupts::SHIFT;
                self.sr = data;
            }
            r if r == registers::ACR => self.acr = data,
            r if r == registers::PCR => self.pcr = data,
            r if r == registers::IFR => {
                // Writing ones clears the corresponding flags
                self.ifr &= !(data & 0x7F);
            }
            r if r == registers::IER => {
                if data & 0x80 != 0 {
                    self.ier |= data & 0x7F;
                } else {
                    self.ier &= !(data & 0x7F);
                }
            }
            _ => self.ora = data,
        }
    }

    fn next_update(&self) -> u64 {
        let mut deadline = IDLE;
        if self.t1_running {
            deadline = deadline.min(self.last_update + u64::from(self.t1_counter) + 1);
        }
        if self.t2_running {
            deadline = deadline.min(self.last_update + u64::from(self.t2_counter) + 1);
        }
        deadline
    }

    fn update(&mut self, current_cycles: u64) {
        let delta = current_cycles.saturating_sub(self.last_update);
        self.last_update = current_cycles;

        let free_run = self.acr & ACR_T1_FREE_RUN != 0;
        if Self::run_timer(
            &mut self.t1_counter,
            &mut self.t1_running,
            delta,
            free_run,
            self.t1_latch,
        ) {
            self.ifr |= interrupts::TIMER1;
        }
        if Self::run_timer(
            &mut self.t2_counter,
            &mut self.t2_running,
            delta,
            false,
            0,
        ) {
            self.ifr |= interrupts::TIMER2;
        }
    }

    fn reset(&mut self) {
        *self = Via::new();
    }
}

impl Default for Via {
    fn default() -> Self {
        Self::new()
    }
}

impl Via {
    /// Serialize the full register file in fixed field order
    pub fn save_state(&self, w: &mut SnapshotWriter) {
        w.write_u32(u32::from(self.orb));
        w.write_u32(u32::from(self.ora));
        w.write_u32(u32::from(self.ddrb));
        w.write_u32(u32::from(self.ddra));
        w.write_u32(u32::from(self.irb));
        w.write_u32(u32::from(self.ira));
        w.write_u32(u32::from(self.t1_counter));
        w.write_u32(u32::from(self.t1_latch));
        w.write_bool(self.t1_running);
        w.write_u32(u32::from(self.t2_counter));
        w.write_u32(u32::from(self.t2_latch_lo));
        w.write_bool(self.t2_running);
        w.write_u32(u32::from(self.sr));
        w.write_u32(u32::from(self.acr));
        w.write_u32(u32::from(self.pcr));
        w.write_u32(u32::from(self.ifr));
        w.write_u32(u32::from(self.ier));
        w.write_u64(self.last_update);
    }

    /// Restore state written by [`save_state`](Self::save_state)
    pub fn restore_state(&mut self, r: &mut SnapshotReader) -> Result<(), SnapshotError> {
        self.orb = r.read_u32()? as u8;
        self.ora = r.read_u32()? as u8;
        self.ddrb = r.read_u32()? as u8;
        self.ddra = r.read_u32()? as u8;
        self.irb = r.read_u32()? as u8;
        self.ira = r.read_u32()? as u8;
        self.t1_counter = r.read_u32()? as u16;
        self.t1_latch = r.read_u32()? as u16;
        self.t1_running = r.read_bool()?;
        self.t2_counter = r.read_u32()? as u16;
        self.t2_latch_lo = r.read_u32()? as u8;
        self.t2_running = r.read_bool()?;
        self.sr = r.read_u32()? as u8;
        self.acr = r.read_u32()? as u8;
        self.pcr = r.read_u32()? as u8;
        self.ifr = r.read_u32()? as u8;
        self.ier = r.read_u32()? as u8;
        self.last_update = r.read_u64()?;
        Ok(())
    }
}
