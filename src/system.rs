//! Peripheral bundle and top-level scheduler.
//!
//! The CPU never owns a concrete bus or cartridge — that's a host/collaborator
//! concern; a presentation layer wires a concrete bus and a display onto one,
//! this crate stops at the trait boundary. `Peripherals` bundles the two
//! units the CPU scheduler ticks every step — Timer and the Pixel Pipeline
//! Driver — behind one `tick` call, and `GameBoy` bundles a `Cpu` with its
//! `Peripherals` for a host that just wants to call `step` in a loop.

use crate::bus::Bus;
use crate::cpu::{Cpu, CpuResult};
use crate::ppu::{PixelPipeline, ScanlineCallback};
use crate::timer::Timer;

/// Timer + Pixel Pipeline Driver, ticked together once per CPU step (and
/// once more, mid-instruction, for handlers that credit bus accesses ahead
/// of time — see `Cpu::credit_tick`).
pub struct Peripherals {
    pub timer: Timer,
    pub ppu: PixelPipeline,
    on_scanline: Option<Box<dyn FnMut(&mut dyn Bus, u8)>>,
}

impl Peripherals {
    pub fn new() -> Self {
        Peripherals {
            timer: Timer::new(),
            ppu: PixelPipeline::new(),
            on_scanline: None,
        }
    }

    /// Registers the callback the pixel pipeline fires once per completed
    /// visible scanline. A host with no rendering front end can skip this;
    /// LY and the mode state machine still advance correctly either way.
    pub fn set_scanline_callback(&mut self, callback: impl FnMut(&mut dyn Bus, u8) + 'static) {
        self.on_scanline = Some(Box::new(callback));
    }

    pub fn tick(&mut self, bus: &mut dyn Bus, cycles: u32) {
        if cycles == 0 {
            return;
        }
        self.timer.tick(bus, cycles);
        match self.on_scanline.as_mut() {
            Some(cb) => {
                let cb: &mut ScanlineCallback<'_> = &mut **cb;
                self.ppu.tick(bus, cycles, Some(cb));
            }
            None => self.ppu.tick(bus, cycles, None),
        }
    }
}

impl Default for Peripherals {
    fn default() -> Self {
        Self::new()
    }
}

/// Owns the CPU and its peripherals; the bus is supplied by the caller on
/// every step, since cartridge/MBC backing is outside this crate's scope.
pub struct GameBoy {
    pub cpu: Cpu,
    pub peripherals: Peripherals,
}

impl GameBoy {
    pub fn new(skip_boot_rom: bool) -> Self {
        GameBoy {
            cpu: Cpu::new(skip_boot_rom),
            peripherals: Peripherals::new(),
        }
    }

    /// Runs one CPU instruction (or one interrupt dispatch, or one halted
    /// tick) and returns the T-cycles it consumed.
    pub fn step(&mut self, bus: &mut dyn Bus) -> CpuResult<u16> {
        self.cpu.step(bus, &mut self.peripherals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::SimpleBus;

    #[test]
    fn game_boy_runs_a_nop_and_advances_pc() {
        let mut gb = GameBoy::new(true);
        let mut bus = SimpleBus::new();
        bus.load(0x0100, &[0x00]);
        let cycles = gb.step(&mut bus).unwrap();
        assert_eq!(cycles, 4);
        assert_eq!(gb.cpu.pc(), 0x0101);
    }
}
