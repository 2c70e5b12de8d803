//! 8/16-bit arithmetic handlers: ADD/ADC/SUB/SBC/AND/XOR/OR/CP against A,
//! INC/DEC for every register and (HL), and the 16-bit ADD HL/INC/DEC rr
//! family, built on the ALU helpers (`add_a`, `sub_a`, `inc_u8`, `add_hl`,
//! ...) in `cpu/mod.rs`.

use super::constants::*;
use super::{Cpu, CpuResult};
use crate::bus::Bus;
use crate::system::Peripherals;

impl Cpu {
    alu_a_r!(op_add_a_b, add_a, b);
    alu_a_r!(op_add_a_c, add_a, c);
    alu_a_r!(op_add_a_d, add_a, d);
    alu_a_r!(op_add_a_e, add_a, e);
    alu_a_r!(op_add_a_h, add_a, h);
    alu_a_r!(op_add_a_l, add_a, l);
    alu_a_hlp!(op_add_a_hlp, add_a);
    alu_a_r!(op_add_a_a, add_a, a);
    pub fn op_add_a_d8(&mut self, bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.add_a(self.read_d8(bus), false);
        Ok(0)
    }

    alu_a_r!(op_adc_a_b, add_a, b, carry);
    alu_a_r!(op_adc_a_c, add_a, c, carry);
    alu_a_r!(op_adc_a_d, add_a, d, carry);
    alu_a_r!(op_adc_a_e, add_a, e, carry);
    alu_a_r!(op_adc_a_h, add_a, h, carry);
    alu_a_r!(op_adc_a_l, add_a, l, carry);
    alu_a_hlp!(op_adc_a_hlp, add_a, carry);
    alu_a_r!(op_adc_a_a, add_a, a, carry);
    pub fn op_adc_a_d8(&mut self, bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.add_a(self.read_d8(bus), true);
        Ok(0)
    }

    alu_a_r!(op_sub_a_b, sub_a, b);
    alu_a_r!(op_sub_a_c, sub_a, c);
    alu_a_r!(op_sub_a_d, sub_a, d);
    alu_a_r!(op_sub_a_e, sub_a, e);
    alu_a_r!(op_sub_a_h, sub_a, h);
    alu_a_r!(op_sub_a_l, sub_a, l);
    alu_a_hlp!(op_sub_a_hlp, sub_a);
    alu_a_r!(op_sub_a_a, sub_a, a);
    pub fn op_sub_a_d8(&mut self, bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.sub_a(self.read_d8(bus), false);
        Ok(0)
    }

    alu_a_r!(op_sbc_a_b, sub_a, b, carry);
    alu_a_r!(op_sbc_a_c, sub_a, c, carry);
    alu_a_r!(op_sbc_a_d, sub_a, d, carry);
    alu_a_r!(op_sbc_a_e, sub_a, e, carry);
    alu_a_r!(op_sbc_a_h, sub_a, h, carry);
    alu_a_r!(op_sbc_a_l, sub_a, l, carry);
    alu_a_hlp!(op_sbc_a_hlp, sub_a, carry);
    alu_a_r!(op_sbc_a_a, sub_a, a, carry);
    pub fn op_sbc_a_d8(&mut self, bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.sub_a(self.read_d8(bus), true);
        Ok(0)
    }

    alu_a_r!(op_and_a_b, and_a, b);
    alu_a_r!(op_and_a_c, and_a, c);
    alu_a_r!(op_and_a_d, and_a, d);
    alu_a_r!(op_and_a_e, and_a, e);
    alu_a_r!(op_and_a_h, and_a, h);
    alu_a_r!(op_and_a_l, and_a, l);
    alu_a_hlp!(op_and_a_hlp, and_a);
    alu_a_r!(op_and_a_a, and_a, a);
    pub fn op_and_a_d8(&mut self, bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.and_a(self.read_d8(bus), false);
        Ok(0)
    }

    alu_a_r!(op_xor_a_b, xor_a, b);
    alu_a_r!(op_xor_a_c, xor_a, c);
    alu_a_r!(op_xor_a_d, xor_a, d);
    alu_a_r!(op_xor_a_e, xor_a, e);
    alu_a_r!(op_xor_a_h, xor_a, h);
    alu_a_r!(op_xor_a_l, xor_a, l);
    alu_a_hlp!(op_xor_a_hlp, xor_a);
    alu_a_r!(op_xor_a_a, xor_a, a);
    pub fn op_xor_a_d8(&mut self, bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.xor_a(self.read_d8(bus), false);
        Ok(0)
    }

    alu_a_r!(op_or_a_b, or_a, b);
    alu_a_r!(op_or_a_c, or_a, c);
    alu_a_r!(op_or_a_d, or_a, d);
    alu_a_r!(op_or_a_e, or_a, e);
    alu_a_r!(op_or_a_h, or_a, h);
    alu_a_r!(op_or_a_l, or_a, l);
    alu_a_hlp!(op_or_a_hlp, or_a);
    alu_a_r!(op_or_a_a, or_a, a);
    pub fn op_or_a_d8(&mut self, bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.or_a(self.read_d8(bus), false);
        Ok(0)
    }

    alu_a_r!(op_cp_a_b, cp_a, b);
    alu_a_r!(op_cp_a_c, cp_a, c);
    alu_a_r!(op_cp_a_d, cp_a, d);
    alu_a_r!(op_cp_a_e, cp_a, e);
    alu_a_r!(op_cp_a_h, cp_a, h);
    alu_a_r!(op_cp_a_l, cp_a, l);
    alu_a_hlp!(op_cp_a_hlp, cp_a);
    alu_a_r!(op_cp_a_a, cp_a, a);
    pub fn op_cp_a_d8(&mut self, bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.cp_a(self.read_d8(bus), false);
        Ok(0)
    }

    pub fn op_inc_b(&mut self, _bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.regs.b = self.inc_u8(self.regs.b);
        Ok(0)
    }
    pub fn op_inc_c(&mut self, _bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.regs.c = self.inc_u8(self.regs.c);
        Ok(0)
    }
    pub fn op_inc_d(&mut self, _bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.regs.d = self.inc_u8(self.regs.d);
        Ok(0)
    }
    pub fn op_inc_e(&mut self, _bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.regs.e = self.inc_u8(self.regs.e);
        Ok(0)
    }
    pub fn op_inc_h(&mut self, _bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.regs.h = self.inc_u8(self.regs.h);
        Ok(0)
    }
    pub fn op_inc_l(&mut self, _bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.regs.l = self.inc_u8(self.regs.l);
        Ok(0)
    }
    pub fn op_inc_a(&mut self, _bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.regs.a = self.inc_u8(self.regs.a);
        Ok(0)
    }
    pub fn op_inc_hlp(&mut self, bus: &mut dyn Bus, peripherals: &mut Peripherals) -> CpuResult<u16> {
        let addr = self.regs.hl();
        let value = bus.read(addr);
        let result = self.inc_u8(value);
        self.credit_tick(bus, peripherals, 8);
        bus.write(addr, result);
        Ok(0)
    }

    pub fn op_dec_b(&mut self, _bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.regs.b = self.dec_u8(self.regs.b);
        Ok(0)
    }
    pub fn op_dec_c(&mut self, _bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.regs.c = self.dec_u8(self.regs.c);
        Ok(0)
    }
    pub fn op_dec_d(&mut self, _bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.regs.d = self.dec_u8(self.regs.d);
        Ok(0)
    }
    pub fn op_dec_e(&mut self, _bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.regs.e = self.dec_u8(self.regs.e);
        Ok(0)
    }
    pub fn op_dec_h(&mut self, _bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.regs.h = self.dec_u8(self.regs.h);
        Ok(0)
    }
    pub fn op_dec_l(&mut self, _bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.regs.l = self.dec_u8(self.regs.l);
        Ok(0)
    }
    pub fn op_dec_a(&mut self, _bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.regs.a = self.dec_u8(self.regs.a);
        Ok(0)
    }
    pub fn op_dec_hlp(&mut self, bus: &mut dyn Bus, peripherals: &mut Peripherals) -> CpuResult<u16> {
        let addr = self.regs.hl();
        let value = bus.read(addr);
        let result = self.dec_u8(value);
        self.credit_tick(bus, peripherals, 8);
        bus.write(addr, result);
        Ok(0)
    }

    pub fn op_add_hl_bc(&mut self, _bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.add_hl(self.regs.bc());
        Ok(0)
    }
    pub fn op_add_hl_de(&mut self, _bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.add_hl(self.regs.de());
        Ok(0)
    }
    pub fn op_add_hl_hl(&mut self, _bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.add_hl(self.regs.hl());
        Ok(0)
    }
    pub fn op_add_hl_sp(&mut self, _bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.add_hl(self.regs.sp);
        Ok(0)
    }

    pub fn op_add_sp_r8(&mut self, bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        let offset = self.read_r8(bus);
        let value = offset as i16 as u16;
        let sp = self.regs.sp;
        let result = sp.wrapping_add(value);
        let half_carry = (sp & 0x000F) + (value & 0x000F) > 0x000F;
        let carry = (sp & 0x00FF) + (value & 0x00FF) > 0x00FF;
        self.regs.sp = result;
        self.regs.set_flag(FLAG_Z | FLAG_N, false);
        self.regs.set_flag(FLAG_H, half_carry);
        self.regs.set_flag(FLAG_C, carry);
        Ok(0)
    }

    pub fn op_inc_bc(&mut self, _bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.regs.set_bc(self.regs.bc().wrapping_add(1));
        Ok(0)
    }
    pub fn op_inc_de(&mut self, _bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.regs.set_de(self.regs.de().wrapping_add(1));
        Ok(0)
    }
    pub fn op_inc_hl(&mut self, _bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.regs.set_hl(self.regs.hl().wrapping_add(1));
        Ok(0)
    }
    pub fn op_inc_sp(&mut self, _bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.regs.sp = self.regs.sp.wrapping_add(1);
        Ok(0)
    }

    pub fn op_dec_bc(&mut self, _bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.regs.set_bc(self.regs.bc().wrapping_sub(1));
        Ok(0)
    }
    pub fn op_dec_de(&mut self, _bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.regs.set_de(self.regs.de().wrapping_sub(1));
        Ok(0)
    }
    pub fn op_dec_hl(&mut self, _bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.regs.set_hl(self.regs.hl().wrapping_sub(1));
        Ok(0)
    }
    pub fn op_dec_sp(&mut self, _bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use crate::bus::SimpleBus;
    use crate::cpu::Cpu;
    use crate::system::Peripherals;

    #[test]
    fn add_sets_half_and_full_carry() {
        let mut cpu = Cpu::new(true);
        let mut bus = SimpleBus::new();
        let mut peripherals = Peripherals::new();
        cpu.registers_mut().a = 0x0F;
        cpu.registers_mut().b = 0x01;
        cpu.op_add_a_b(&mut bus, &mut peripherals).unwrap();
        assert_eq!(cpu.registers().a, 0x10);
        assert!(cpu.registers().h());
        assert!(!cpu.registers().c());
    }

    #[test]
    fn cp_leaves_accumulator_untouched() {
        let mut cpu = Cpu::new(true);
        let mut bus = SimpleBus::new();
        let mut peripherals = Peripherals::new();
        cpu.registers_mut().a = 0x10;
        cpu.registers_mut().b = 0x10;
        cpu.op_cp_a_b(&mut bus, &mut peripherals).unwrap();
        assert_eq!(cpu.registers().a, 0x10);
        assert!(cpu.registers().z());
    }

    #[test]
    fn dec_b_from_zero_sets_half_borrow() {
        let mut cpu = Cpu::new(true);
        let mut bus = SimpleBus::new();
        let mut peripherals = Peripherals::new();
        cpu.registers_mut().b = 0x00;
        cpu.op_dec_b(&mut bus, &mut peripherals).unwrap();
        assert_eq!(cpu.registers().b, 0xFF);
        assert!(cpu.registers().h());
        assert!(cpu.registers().n());
    }
}
