//! Control flow: NOP, the four conditional families (JP/JR/CALL/RET), RST,
//! DI/EI, HALT/STOP, flag-twiddling misc ops, and the CB-prefix dispatcher.
//! Conditional handlers return the *extra* cycles charged when the branch
//! is taken, matching the baseline-plus-delta accounting `Cpu::step`
//! expects.

use super::constants::*;
use super::instruction::CB_INSTRUCTIONS;
use super::{Cpu, CpuResult};
use crate::bus::Bus;
use crate::memory_map::{IF_ADDR, INTERRUPT_ENABLE_REGISTER};
use crate::system::Peripherals;

impl Cpu {
    pub fn op_nop(&mut self, _bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        Ok(0)
    }

    fn conditional_jp_a16(&mut self, condition: bool, bus: &mut dyn Bus) -> CpuResult<u16> {
        let addr = self.read_d16(bus);
        if condition {
            self.regs.pc = addr;
            Ok(4)
        } else {
            Ok(0)
        }
    }
    pub fn op_jp_a16(&mut self, bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.regs.pc = self.read_d16(bus);
        Ok(0)
    }
    pub fn op_jp_hl(&mut self, _bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.regs.pc = self.regs.hl();
        Ok(0)
    }
    pub fn op_jp_nz_a16(&mut self, bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.conditional_jp_a16(!self.regs.z(), bus)
    }
    pub fn op_jp_z_a16(&mut self, bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.conditional_jp_a16(self.regs.z(), bus)
    }
    pub fn op_jp_nc_a16(&mut self, bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.conditional_jp_a16(!self.regs.c(), bus)
    }
    pub fn op_jp_c_a16(&mut self, bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.conditional_jp_a16(self.regs.c(), bus)
    }

    fn conditional_jr(&mut self, condition: bool, bus: &mut dyn Bus) -> CpuResult<u16> {
        let offset = self.read_r8(bus);
        if condition {
            self.regs.pc = self.regs.pc.wrapping_add(offset as i16 as u16);
            Ok(4)
        } else {
            Ok(0)
        }
    }
    pub fn op_jr_r8(&mut self, bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        let offset = self.read_r8(bus);
        self.regs.pc = self.regs.pc.wrapping_add(offset as i16 as u16);
        Ok(0)
    }
    pub fn op_jr_nz_r8(&mut self, bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.conditional_jr(!self.regs.z(), bus)
    }
    pub fn op_jr_z_r8(&mut self, bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.conditional_jr(self.regs.z(), bus)
    }
    pub fn op_jr_nc_r8(&mut self, bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.conditional_jr(!self.regs.c(), bus)
    }
    pub fn op_jr_c_r8(&mut self, bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.conditional_jr(self.regs.c(), bus)
    }

    fn conditional_call_a16(&mut self, condition: bool, bus: &mut dyn Bus) -> CpuResult<u16> {
        let addr = self.read_d16(bus);
        if condition {
            self.push_word(self.regs.pc, bus);
            self.regs.pc = addr;
            Ok(12)
        } else {
            Ok(0)
        }
    }
    pub fn op_call_a16(&mut self, bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        let addr = self.read_d16(bus);
        self.push_word(self.regs.pc, bus);
        self.regs.pc = addr;
        Ok(0)
    }
    pub fn op_call_nz_a16(&mut self, bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.conditional_call_a16(!self.regs.z(), bus)
    }
    pub fn op_call_z_a16(&mut self, bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.conditional_call_a16(self.regs.z(), bus)
    }
    pub fn op_call_nc_a16(&mut self, bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.conditional_call_a16(!self.regs.c(), bus)
    }
    pub fn op_call_c_a16(&mut self, bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.conditional_call_a16(self.regs.c(), bus)
    }

    fn conditional_ret(&mut self, condition: bool, bus: &mut dyn Bus) -> CpuResult<u16> {
        if condition {
            self.regs.pc = self.pop_word(bus);
            Ok(12)
        } else {
            Ok(0)
        }
    }
    pub fn op_ret(&mut self, bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.regs.pc = self.pop_word(bus);
        Ok(0)
    }
    pub fn op_ret_nz(&mut self, bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.conditional_ret(!self.regs.z(), bus)
    }
    pub fn op_ret_z(&mut self, bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.conditional_ret(self.regs.z(), bus)
    }
    pub fn op_ret_nc(&mut self, bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.conditional_ret(!self.regs.c(), bus)
    }
    pub fn op_ret_c(&mut self, bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.conditional_ret(self.regs.c(), bus)
    }
    pub fn op_reti(&mut self, bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.regs.pc = self.pop_word(bus);
        self.ime = true;
        self.ime_scheduled = false;
        Ok(0)
    }

    fn rst(&mut self, vector: u16, bus: &mut dyn Bus) -> CpuResult<u16> {
        self.push_word(self.regs.pc, bus);
        self.regs.pc = vector;
        Ok(0)
    }
    pub fn op_rst_00h(&mut self, bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.rst(0x0000, bus)
    }
    pub fn op_rst_08h(&mut self, bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.rst(0x0008, bus)
    }
    pub fn op_rst_10h(&mut self, bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.rst(0x0010, bus)
    }
    pub fn op_rst_18h(&mut self, bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.rst(0x0018, bus)
    }
    pub fn op_rst_20h(&mut self, bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.rst(0x0020, bus)
    }
    pub fn op_rst_28h(&mut self, bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.rst(0x0028, bus)
    }
    pub fn op_rst_30h(&mut self, bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.rst(0x0030, bus)
    }
    pub fn op_rst_38h(&mut self, bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.rst(0x0038, bus)
    }

    pub fn op_di(&mut self, _bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.ime = false;
        self.ime_scheduled = false;
        Ok(0)
    }
    pub fn op_ei(&mut self, _bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.ime_scheduled = true;
        Ok(0)
    }

    /// Entering HALT with IME=0 and an interrupt already pending triggers the
    /// well-known HALT bug: the CPU never actually stops, it just fails to
    /// advance PC past this instruction once, so the following byte is
    /// fetched and executed twice. Not modeled here — flagged as a known gap
    /// rather than silently wrong, since the DMG's own behavior here is a
    /// documented hardware quirk, not part of this core's invariant set.
    pub fn op_halt(&mut self, bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        let ie = bus.read(INTERRUPT_ENABLE_REGISTER);
        let iflags = bus.read(IF_ADDR);
        if !self.ime && (ie & iflags & 0x1F) != 0 {
            log::warn!(
                "HALT with IME=0 and a pending interrupt at pc={:#06x}; not entering halt",
                self.instruction_pc
            );
        } else {
            self.mode = super::CpuMode::Halted;
        }
        Ok(0)
    }

    pub fn op_stop(&mut self, _bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.mode = super::CpuMode::Stopped;
        log::warn!("STOP at pc={:#06x}", self.instruction_pc);
        Ok(0)
    }

    pub fn op_scf(&mut self, _bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.regs.set_flag(FLAG_N | FLAG_H, false);
        self.regs.set_flag(FLAG_C, true);
        Ok(0)
    }
    pub fn op_ccf(&mut self, _bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        let current_c = self.regs.c();
        self.regs.set_flag(FLAG_N | FLAG_H, false);
        self.regs.set_flag(FLAG_C, !current_c);
        Ok(0)
    }
    pub fn op_cpl(&mut self, _bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.regs.a = !self.regs.a;
        self.regs.set_flag(FLAG_N | FLAG_H, true);
        Ok(0)
    }
    pub fn op_daa(&mut self, _bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.daa();
        Ok(0)
    }

    /// Fetches the CB-page opcode and dispatches it. The 4-cycle base cost
    /// of the CB prefix byte itself is charged by `Cpu::step`; this returns
    /// only the specific CB operation's own declared cost.
    pub fn op_prefix_cb(&mut self, bus: &mut dyn Bus, peripherals: &mut Peripherals) -> CpuResult<u16> {
        let cb_opcode = bus.read(self.instruction_pc.wrapping_add(1));
        let cb_instr = &CB_INSTRUCTIONS[cb_opcode as usize];
        (cb_instr.execute)(self, bus, peripherals)?;
        Ok(cb_instr.cycles as u16)
    }

    pub fn handle_invalid_opcode(
        &mut self,
        _bus: &mut dyn Bus,
        _peripherals: &mut Peripherals,
    ) -> CpuResult<u16> {
        // self.regs.pc has already been advanced by the instruction's width
        // (a fixed 1 byte for every invalid-opcode slot) by the time this
        // handler runs, so it's the post-advance PC the error wants.
        Err(crate::error::CoreError::InvalidOpcode {
            pc: self.regs.pc,
            opcode: self.fetched_opcode,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::bus::SimpleBus;
    use crate::cpu::Cpu;
    use crate::system::Peripherals;

    #[test]
    fn call_then_ret_round_trips_pc() {
        let mut cpu = Cpu::new(true);
        let mut bus = SimpleBus::new();
        let mut peripherals = Peripherals::new();
        bus.load(0x0100, &[0xCD, 0x00, 0x02]); // CALL 0x0200
        bus.load(0x0200, &[0xC9]); // RET
        cpu.step(&mut bus, &mut peripherals).unwrap();
        assert_eq!(cpu.pc(), 0x0200);
        assert_eq!(cpu.sp(), 0xFFFC);
        cpu.step(&mut bus, &mut peripherals).unwrap();
        assert_eq!(cpu.pc(), 0x0103);
        assert_eq!(cpu.sp(), 0xFFFE);
    }

    #[test]
    fn invalid_opcode_reports_pc_and_opcode() {
        let mut cpu = Cpu::new(true);
        let mut bus = SimpleBus::new();
        let mut peripherals = Peripherals::new();
        bus.load(0x0100, &[0xD3]);
        let err = cpu.step(&mut bus, &mut peripherals).unwrap_err();
        match err {
            crate::error::CoreError::InvalidOpcode { pc, opcode } => {
                assert_eq!(pc, 0x0101);
                assert_eq!(opcode, 0xD3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
