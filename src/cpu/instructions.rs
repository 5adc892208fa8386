// Instructions module for 6502 CPU
//
// Implements the complete official instruction set. Handlers take the
// resolved addressing result from `execute.rs`; branch and jump handlers
// return extra cycles so the dispatcher can account for taken branches.
// ADC/SBC honor the decimal flag - both the 6510 and the drive's 6502
// carry working BCD hardware.

use crate::cpu::addressing::AddressingResult;
use crate::cpu::{flags, vectors, Cpu, CpuBus};

impl Cpu {
    /// Resolve the operand value for a read instruction
    #[inline]
    fn operand<B: CpuBus>(&mut self, bus: &mut B, r: &AddressingResult) -> u8 {
        match r.value {
            Some(value) => value,
            None => bus.read(r.address),
        }
    }

    // ========================================
    // Load/Store
    // ========================================

    pub(crate) fn lda<B: CpuBus>(&mut self, bus: &mut B, r: &AddressingResult) {
        self.a = self.operand(bus, r);
        self.update_zero_and_negative_flags(self.a);
    }

    pub(crate) fn ldx<B: CpuBus>(&mut self, bus: &mut B, r: &AddressingResult) {
        self.x = self.operand(bus, r);
        self.update_zero_and_negative_flags(self.x);
    }

    pub(crate) fn ldy<B: CpuBus>(&mut self, bus: &mut B, r: &AddressingResult) {
        self.y = self.operand(bus, r);
        self.update_zero_and_negative_flags(self.y);
    }

    pub(crate) fn sta<B: CpuBus>(&mut self, bus: &mut B, r: &AddressingResult) {
        bus.write(r.address, self.a);
    }

    pub(crate) fn stx<B: CpuBus>(&mut self, bus: &mut B, r: &AddressingResult) {
        bus.write(r.address, self.x);
    }

    pub(crate) fn sty<B: CpuBus>(&mut self, bus: &mut B, r: &AddressingResult) {
        bus.write(r.address, self.y);
    }

    // ========================================
    // Arithmetic
    // ========================================

    pub(crate) fn adc<B: CpuBus>(&mut self, bus: &mut B, r: &AddressingResult) {
        let value = self.operand(bus, r);
        let carry_in = u16::from(self.get_carry());
        let a = self.a;

        let binary = u16::from(a) + u16::from(value) + carry_in;
        self.set_overflow((a ^ binary as u8) & (value ^ binary as u8) & 0x80 != 0);

        if self.get_decimal() {
            let mut lo = u16::from(a & 0x0F) + u16::from(value & 0x0F) + carry_in;
            let mut hi = u16::from(a >> 4) + u16::from(value >> 4);
            if lo > 9 {
                lo += 6;
            }
            if lo > 0x0F {
                hi += 1;
            }
            let carry_out = hi > 9;
            if carry_out {
                hi += 6;
            }
            self.a = (((hi & 0x0F) << 4) | (lo & 0x0F)) as u8;
            self.set_carry(carry_out);
        } else {
            self.a = binary as u8;
            self.set_carry(binary > 0xFF);
        }

        self.update_zero_and_negative_flags(self.a);
    }

    pub(crate) fn sbc<B: CpuBus>(&mut self, bus: &mut B, r: &AddressingResult) {
        let value = self.operand(bus, r);
        let borrow = i16::from(!self.get_carry());
        let a = self.a;

        let binary = i16::from(a) - i16::from(value) - borrow;
        let result = binary as u8;
        self.set_carry(binary >= 0);
        self.set_overflow((a ^ value) & (a ^ result) & 0x80 != 0);

        if self.get_decimal() {
            let mut lo = i16::from(a & 0x0F) - i16::from(value & 0x0F) - borrow;
            let mut hi = i16::from(a >> 4) - i16::from(value >> 4);
            if lo < 0 {
                lo += 10;
                hi -= 1;
            }
            if hi < 0 {
                hi += 10;
            }
            self.a = (((hi as u8) & 0x0F) << 4) | ((lo as u8) & 0x0F);
        } else {
            self.a = result;
        }

        // N and Z track the binary difference on the NMOS 6502
        self.update_zero_and_negative_flags(result);
    }

    pub(crate) fn inc<B: CpuBus>(&mut self, bus: &mut B, r: &AddressingResult) {
        let value = bus.read(r.address).wrapping_add(1);
        bus.write(r.address, value);
        self.update_zero_and_negative_flags(value);
    }

    pub(crate) fn dec<B: CpuBus>(&mut self, bus: &mut B, r: &AddressingResult) {
        let value = bus.read(r.address).wrapping_sub(1);
        bus.write(r.address, value);
        self.update_zero_and_negative_flags(value);
    }

    pub(crate) fn inx(&mut self) {
        self.x = self.x.wrapping_add(1);
        self.update_zero_and_negative_flags(self.x);
    }

    pub(crate) fn iny(&mut self) {
        self.y = self.y.wrapping_add(1);
        self.update_zero_and_negative_flags(self.y);
    }

    pub(crate) fn dex(&mut self) {
        self.x = self.x.wrapping_sub(1);
        self.update_zero_and_negative_flags(self.x);
    }

    pub(crate) fn dey(&mut self) {
        self.y = self.y.wrapping_sub(1);
        self.update_zero_and_negative_flags(self.y);
    }

    // ========================================
    // Logic
    // ========================================

    pub(crate) fn and<B: CpuBus>(&mut self, bus: &mut B, r: &AddressingResult) {
        self.a &= self.operand(bus, r);
        self.update_zero_and_negative_flags(self.a);
    }

    pub(crate) fn ora<B: CpuBus>(&mut self, bus: &mut B, r: &AddressingResult) {
        self.a |= self.operand(bus, r);
        self.update_zero_and_negative_flags(self.a);
    }

    pub(crate) fn eor<B: CpuBus>(&mut self, bus: &mut B, r: &AddressingResult) {
        self.a ^= self.operand(bus, r);
        self.update_zero_and_negative_flags(self.a);
    }

    /// BIT: Z from A & M, N and V copied from the memory operand
    pub(crate) fn bit<B: CpuBus>(&mut self, bus: &mut B, r: &AddressingResult) {
        let value = bus.read(r.address);
        self.set_zero(self.a & value == 0);
        self.set_negative(value & 0x80 != 0);
        self.set_overflow(value & 0x40 != 0);
    }

    // ========================================
    // Shift/Rotate
    // ========================================

    /// Read-modify-write plumbing shared by the shift family
    fn modify<B: CpuBus>(
        &mut self,
        bus: &mut B,
        r: &AddressingResult,
        accumulator: bool,
        f: impl FnOnce(&mut Self, u8) -> u8,
    ) {
        let input = if accumulator {
            self.a
        } else {
            bus.read(r.address)
        };
        let output = f(self, input);
        if accumulator {
            self.a = output;
        } else {
            bus.write(r.address, output);
        }
        self.update_zero_and_negative_flags(output);
    }

    pub(crate) fn asl<B: CpuBus>(&mut self, bus: &mut B, r: &AddressingResult, acc: bool) {
        self.modify(bus, r, acc, |cpu, v| {
            cpu.set_carry(v & 0x80 != 0);
            v << 1
        });
    }

    pub(crate) fn lsr<B: CpuBus>(&mut self, bus: &mut B, r: &AddressingResult, acc: bool) {
        self.modify(bus, r, acc, |cpu, v| {
            cpu.set_carry(v & 0x01 != 0);
            v >> 1
        });
    }

    pub(crate) fn rol<B: CpuBus>(&mut self, bus: &mut B, r: &AddressingResult, acc: bool) {
        self.modify(bus, r, acc, |cpu, v| {
            let carry_in = u8::from(cpu.get_carry());
            cpu.set_carry(v & 0x80 != 0);
            (v << 1) | carry_in
        });
    }

    pub(crate) fn ror<B: CpuBus>(&mut self, bus: &mut B, r: &AddressingResult, acc: bool) {
        self.modify(bus, r, acc, |cpu, v| {
            let carry_in = u8::from(cpu.get_carry()) << 7;
            cpu.set_carry(v & 0x01 != 0);
            (v >> 1) | carry_in
        });
    }

    // ========================================
    // Compare
    // ========================================

    fn compare<B: CpuBus>(&mut self, bus: &mut B, r: &AddressingResult, register: u8) {
        let value = self.operand(bus, r);
        let result = register.wrapping_sub(value);
        self.set_carry(register >= value);
        self.update_zero_and_negative_flags(result);
    }

    pub(crate) fn cmp<B: CpuBus>(&mut self, bus: &mut B, r: &AddressingResult) {
        let a = self.a;
        self.compare(bus, r, a);
    }

    pub(crate) fn cpx<B: CpuBus>(&mut self, bus: &mut B, r: &AddressingResult) {
        let x = self.x;
        self.compare(bus, r, x);
    }

    pub(crate) fn cpy<B: CpuBus>(&mut self, bus: &mut B, r: &AddressingResult) {
        let y = self.y;
        self.compare(bus, r, y);
    }

    // ========================================
    // Branches
    // ========================================

    /// Take the branch if the condition holds. A taken branch costs one
    /// extra cycle, two if the target lies in a different page.
    fn branch_if(&mut self, r: &AddressingResult, condition: bool) -> u8 {
        if condition {
            self.pc = r.address;
            1 + u8::from(r.page_crossed)
        } else {
            0
        }
    }

    pub(crate) fn bcc(&mut self, r: &AddressingResult) -> u8 {
        let c = !self.get_carry();
        self.branch_if(r, c)
    }

    pub(crate) fn bcs(&mut self, r: &AddressingResult) -> u8 {
        let c = self.get_carry();
        self.branch_if(r, c)
    }

    pub(crate) fn beq(&mut self, r: &AddressingResult) -> u8 {
        let c = self.get_zero();
        self.branch_if(r, c)
    }

    pub(crate) fn bne(&mut self, r: &AddressingResult) -> u8 {
        let c = !self.get_zero();
        self.branch_if(r, c)
    }

    pub(crate) fn bmi(&mut self, r: &AddressingResult) -> u8 {
        let c = self.get_negative();
        self.branch_if(r, c)
    }

    pub(crate) fn bpl(&mut self, r: &AddressingResult) -> u8 {
        let c = !self.get_negative();
        self.branch_if(r, c)
    }

    pub(crate) fn bvc(&mut self, r: &AddressingResult) -> u8 {
        let c = !self.get_overflow();
        self.branch_if(r, c)
    }

    pub(crate) fn bvs(&mut self, r: &AddressingResult) -> u8 {
        let c = self.get_overflow();
        self.branch_if(r, c)
    }

    // ========================================
    // Jumps/Subroutines
    // ========================================

    pub(crate) fn jmp(&mut self, r: &AddressingResult) {
        self.pc = r.address;
    }

    pub(crate) fn jsr<B: CpuBus>(&mut self, bus: &mut B, r: &AddressingResult) {
        // PC currently points past the operand; the 6502 pushes the
        // address of the operand's last byte.
        let return_addr = self.pc.wrapping_sub(1);
        self.stack_push_u16(bus, return_addr);
        self.pc = r.address;
    }

    pub(crate) fn rts<B: CpuBus>(&mut self, bus: &mut B) {
        self.pc = self.stack_pop_u16(bus).wrapping_add(1);
    }

    // ========================================
    // Stack
    // ========================================

    pub(crate) fn pha<B: CpuBus>(&mut self, bus: &mut B) {
        let a = self.a;
        self.stack_push(bus, a);
    }

    pub(crate) fn pla<B: CpuBus>(&mut self, bus: &mut B) {
        self.a = self.stack_pop(bus);
        self.update_zero_and_negative_flags(self.a);
    }

    pub(crate) fn php<B: CpuBus>(&mut self, bus: &mut B) {
        // PHP pushes B and UNUSED set
        let status = self.status | flags::BREAK | flags::UNUSED;
        self.stack_push(bus, status);
    }

    pub(crate) fn plp<B: CpuBus>(&mut self, bus: &mut B) {
        let status = self.stack_pop(bus);
        self.status = (status & !flags::BREAK) | flags::UNUSED;
    }

    pub(crate) fn txs(&mut self) {
        self.sp = self.x;
    }

    pub(crate) fn tsx(&mut self) {
        self.x = self.sp;
        self.update_zero_and_negative_flags(self.x);
    }

    // ========================================
    // Transfers
    // ========================================

    pub(crate) fn tax(&mut self) {
        self.x = self.a;
        self.update_zero_and_negative_flags(self.x);
    }

    pub(crate) fn tay(&mut self) {
        self.y = self.a;
        self.update_zero_and_negative_flags(self.y);
    }

    pub(crate) fn txa(&mut self) {
        self.a = self.x;
        self.update_zero_and_negative_flags(self.a);
    }

    pub(crate) fn tya(&mut self) {
        self.a = self.y;
        self.update_zero_and_negative_flags(self.a);
    }

    // ========================================
    // Miscellaneous
    // ========================================

    /// BRK: software interrupt through the IRQ vector with B set
    pub(crate) fn brk<B: CpuBus>(&mut self, bus: &mut B) {
        let return_addr = self.pc.wrapping_add(1);
        self.stack_push_u16(bus, return_addr);

        let status = self.status | flags::BREAK | flags::UNUSED;
        self.stack_push(bus, status);

        self.set_interrupt_disable(true);

        let lo = bus.read(vectors::IRQ) as u16;
        let hi = bus.read(vectors::IRQ.wrapping_add(1)) as u16;
        self.pc = (hi << 8) | lo;
    }

    pub(crate) fn rti<B: CpuBus>(&mut self, bus: &mut B) {
        let status = self.stack_pop(bus);
        self.status = (status & !flags::BREAK) | flags::UNUSED;
        self.pc = self.stack_pop_u16(bus);
    }
}
