//! The four non-CB rotate-accumulator ops. Share the CB page's rotate
//! helpers but always clear Z, unlike their CB-prefixed counterparts which
//! set it normally — the one well-known asymmetry in this part of the
//! instruction set.

use super::constants::*;
use super::{Cpu, CpuResult};
use crate::bus::Bus;
use crate::system::Peripherals;

impl Cpu {
    pub fn op_rlca(&mut self, _bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.regs.a = self.rlc(self.regs.a);
        self.regs.set_flag(FLAG_Z, false);
        Ok(0)
    }
    pub fn op_rla(&mut self, _bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.regs.a = self.rl(self.regs.a);
        self.regs.set_flag(FLAG_Z, false);
        Ok(0)
    }
    pub fn op_rrca(&mut self, _bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.regs.a = self.rrc(self.regs.a);
        self.regs.set_flag(FLAG_Z, false);
        Ok(0)
    }
    pub fn op_rra(&mut self, _bus: &mut dyn Bus, _peripherals: &mut Peripherals) -> CpuResult<u16> {
        self.regs.a = self.rr(self.regs.a);
        self.regs.set_flag(FLAG_Z, false);
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use crate::bus::SimpleBus;
    use crate::cpu::Cpu;
    use crate::system::Peripherals;

    #[test]
    fn rlca_clears_zero_flag_even_when_result_is_zero() {
        let mut cpu = Cpu::new(true);
        let mut bus = SimpleBus::new();
        let mut peripherals = Peripherals::new();
        cpu.registers_mut().a = 0x00;
        cpu.op_rlca(&mut bus, &mut peripherals).unwrap();
        assert_eq!(cpu.registers().a, 0x00);
        assert!(!cpu.registers().z());
    }

    #[test]
    fn rla_rotates_through_carry_not_bit_seven() {
        let mut cpu = Cpu::new(true);
        let mut bus = SimpleBus::new();
        let mut peripherals = Peripherals::new();
        cpu.registers_mut().a = 0x80;
        cpu.registers_mut().set_flag(FLAG_C, true);
        cpu.op_rla(&mut bus, &mut peripherals).unwrap();
        assert_eq!(cpu.registers().a, 0x01);
        assert!(cpu.registers().c());
    }
}
