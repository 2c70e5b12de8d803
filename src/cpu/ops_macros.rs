//! Generator macros for the repetitive corners of the instruction set: the
//! 49-entry LD r, r' block, the eight-wide ALU-A-vs-register block, and the
//! CB page's eight-register rotate/shift/bit/res/set families. Every handler
//! takes the three-argument `(cpu, bus, peripherals)` signature; the
//! peripherals argument is unused by plain register moves, so it's bound
//! `_peripherals`; the `(HL)` read-modify-write variants credit 8 of their
//! 16 cycles to the peripherals before the trailing write, per the
//! scheduler's tick-credit contract.

macro_rules! ld_r_r {
    ($name:ident, $r1:ident, $r2:ident) => {
        #[inline(always)]
        pub fn $name(
            &mut self,
            _bus: &mut dyn crate::bus::Bus,
            _peripherals: &mut crate::system::Peripherals,
        ) -> super::CpuResult<u16> {
            self.regs.$r1 = self.regs.$r2;
            Ok(0)
        }
    };
}

macro_rules! ld_r_hlp {
    ($name:ident, $r1:ident) => {
        pub fn $name(
            &mut self,
            bus: &mut dyn crate::bus::Bus,
            _peripherals: &mut crate::system::Peripherals,
        ) -> super::CpuResult<u16> {
            self.regs.$r1 = bus.read(self.regs.hl());
            Ok(0)
        }
    };
}

macro_rules! ld_hlp_r {
    ($name:ident, $r2:ident) => {
        pub fn $name(
            &mut self,
            bus: &mut dyn crate::bus::Bus,
            _peripherals: &mut crate::system::Peripherals,
        ) -> super::CpuResult<u16> {
            bus.write(self.regs.hl(), self.regs.$r2);
            Ok(0)
        }
    };
}

macro_rules! alu_a_r {
    ($name:ident, $op:ident, $r2:ident) => {
        #[inline(always)]
        pub fn $name(
            &mut self,
            _bus: &mut dyn crate::bus::Bus,
            _peripherals: &mut crate::system::Peripherals,
        ) -> super::CpuResult<u16> {
            self.$op(self.regs.$r2, false);
            Ok(0)
        }
    };
    ($name:ident, $op:ident, $r2:ident, carry) => {
        #[inline(always)]
        pub fn $name(
            &mut self,
            _bus: &mut dyn crate::bus::Bus,
            _peripherals: &mut crate::system::Peripherals,
        ) -> super::CpuResult<u16> {
            self.$op(self.regs.$r2, true);
            Ok(0)
        }
    };
}

macro_rules! alu_a_hlp {
    ($name:ident, $op:ident) => {
        pub fn $name(
            &mut self,
            bus: &mut dyn crate::bus::Bus,
            _peripherals: &mut crate::system::Peripherals,
        ) -> super::CpuResult<u16> {
            let val = bus.read(self.regs.hl());
            self.$op(val, false);
            Ok(0)
        }
    };
    ($name:ident, $op:ident, carry) => {
        pub fn $name(
            &mut self,
            bus: &mut dyn crate::bus::Bus,
            _peripherals: &mut crate::system::Peripherals,
        ) -> super::CpuResult<u16> {
            let val = bus.read(self.regs.hl());
            self.$op(val, true);
            Ok(0)
        }
    };
}

macro_rules! cb_reg_op {
    ($name:ident, $op:ident, $reg:ident) => {
        #[inline(always)]
        pub fn $name(
            &mut self,
            _bus: &mut dyn crate::bus::Bus,
            _peripherals: &mut crate::system::Peripherals,
        ) -> super::CpuResult<u16> {
            self.regs.$reg = self.$op(self.regs.$reg);
            Ok(0)
        }
    };
    ($name:ident, bit, $bit:expr, $reg:ident) => {
        #[inline(always)]
        pub fn $name(
            &mut self,
            _bus: &mut dyn crate::bus::Bus,
            _peripherals: &mut crate::system::Peripherals,
        ) -> super::CpuResult<u16> {
            self.op_bit($bit, self.regs.$reg);
            Ok(0)
        }
    };
    ($name:ident, res, $bit:expr, $reg:ident) => {
        #[inline(always)]
        pub fn $name(
            &mut self,
            _bus: &mut dyn crate::bus::Bus,
            _peripherals: &mut crate::system::Peripherals,
        ) -> super::CpuResult<u16> {
            self.regs.$reg &= !(1 << $bit);
            Ok(0)
        }
    };
    ($name:ident, set, $bit:expr, $reg:ident) => {
        #[inline(always)]
        pub fn $name(
            &mut self,
            _bus: &mut dyn crate::bus::Bus,
            _peripherals: &mut crate::system::Peripherals,
        ) -> super::CpuResult<u16> {
            self.regs.$reg |= 1 << $bit;
            Ok(0)
        }
    };
}

macro_rules! cb_hlp_op {
    ($name:ident, $op:ident) => {
        pub fn $name(
            &mut self,
            bus: &mut dyn crate::bus::Bus,
            peripherals: &mut crate::system::Peripherals,
        ) -> super::CpuResult<u16> {
            let addr = self.regs.hl();
            let value = bus.read(addr);
            let result = self.$op(value);
            self.credit_tick(bus, peripherals, 8);
            bus.write(addr, result);
            Ok(0)
        }
    };
    ($name:ident, bit, $bit:expr) => {
        pub fn $name(
            &mut self,
            bus: &mut dyn crate::bus::Bus,
            _peripherals: &mut crate::system::Peripherals,
        ) -> super::CpuResult<u16> {
            let value = bus.read(self.regs.hl());
            self.op_bit($bit, value);
            Ok(0)
        }
    };
    ($name:ident, res, $bit:expr) => {
        pub fn $name(
            &mut self,
            bus: &mut dyn crate::bus::Bus,
            peripherals: &mut crate::system::Peripherals,
        ) -> super::CpuResult<u16> {
            let addr = self.regs.hl();
            let value = bus.read(addr);
            let result = value & !(1 << $bit);
            self.credit_tick(bus, peripherals, 8);
            bus.write(addr, result);
            Ok(0)
        }
    };
    ($name:ident, set, $bit:expr) => {
        pub fn $name(
            &mut self,
            bus: &mut dyn crate::bus::Bus,
            peripherals: &mut crate::system::Peripherals,
        ) -> super::CpuResult<u16> {
            let addr = self.regs.hl();
            let value = bus.read(addr);
            let result = value | (1 << $bit);
            self.credit_tick(bus, peripherals, 8);
            bus.write(addr, result);
            Ok(0)
        }
    };
}
