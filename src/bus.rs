//! The memory bus contract the CPU is the master of.
//!
//! Decoding the 16-bit address space into ROM banks, work RAM, VRAM, OAM and
//! the I/O page is entirely the implementor's concern; the CPU only ever
//! calls through this trait. `SimpleBus` below is a minimal flat
//! implementation good enough to drive the CPU in tests and doctests — it
//! does no cartridge banking at all, since that's a host/collaborator
//! concern this crate does not own.

use crate::error::{BusOp, CoreError};
use crate::joypad::{Button, Joypad};
use crate::memory_map::*;

/// Byte-addressable memory port. All CPU loads and stores go through one of
/// these. Implementors decide what lives behind which address; out-of-map
/// accesses should return 0xFF on read and be silently dropped on write,
/// logging a [`CoreError::BusOutOfRange`] diagnostic rather than failing —
/// `read`/`write` stay infallible so the interpreter never has to unwind for
/// this.
pub trait Bus {
    fn read(&mut self, addr: u16) -> u8;
    fn write(&mut self, addr: u16, value: u8);

    /// Bypasses CPU-visible write semantics (DIV-reset-on-write, STAT's
    /// read-only bits, IF's reserved bits) for registers the Timer and
    /// Pixel Pipeline Driver own and must be able to set directly without
    /// retriggering the CPU-facing write semantics.
    fn write_direct(&mut self, addr: u16, value: u8);

    /// Little-endian 16-bit read: low byte at `addr`, high byte at `addr+1`.
    fn read16(&mut self, addr: u16) -> u16 {
        let lo = self.read(addr);
        let hi = self.read(addr.wrapping_add(1));
        u16::from_le_bytes([lo, hi])
    }

    /// Little-endian 16-bit write: low byte at `addr`, high byte at `addr+1`.
    fn write16(&mut self, addr: u16, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        self.write(addr, lo);
        self.write(addr.wrapping_add(1), hi);
    }
}

/// A flat, bankless bus: 64 KiB of addressable space backed by a handful of
/// fixed regions, with the DIV-reset and IF/IE bookkeeping the CPU and
/// peripherals rely on. Exercises the `Bus` contract without pulling in any
/// cartridge/MBC logic — useful for unit tests and as a minimal host.
pub struct SimpleBus {
    rom: Box<[u8; 0x8000]>,
    vram: Box<[u8; VRAM_SIZE]>,
    ext_ram: Box<[u8; EXT_RAM_SIZE]>,
    wram: Box<[u8; 0x2000]>,
    oam: Box<[u8; OAM_SIZE]>,
    io: Box<[u8; IO_REGISTERS_SIZE]>,
    hram: Box<[u8; HRAM_SIZE]>,
    interrupt_enable: u8,
    pub joypad: Joypad,
}

impl SimpleBus {
    pub fn new() -> Self {
        let mut io = Box::new([0u8; IO_REGISTERS_SIZE]);
        io[(P1_JOYP_ADDR - IO_REGISTERS_START) as usize] = 0xCF;
        io[(TAC_ADDR - IO_REGISTERS_START) as usize] = 0xF8;
        io[(IF_ADDR - IO_REGISTERS_START) as usize] = 0xE1;
        io[(LCDC_ADDR - IO_REGISTERS_START) as usize] = 0x91;
        io[(STAT_ADDR - IO_REGISTERS_START) as usize] = 0x85;
        SimpleBus {
            rom: Box::new([0xFF; 0x8000]),
            vram: Box::new([0; VRAM_SIZE]),
            ext_ram: Box::new([0; EXT_RAM_SIZE]),
            wram: Box::new([0; 0x2000]),
            oam: Box::new([0; OAM_SIZE]),
            io,
            hram: Box::new([0; HRAM_SIZE]),
            interrupt_enable: 0,
            joypad: Joypad::new(),
        }
    }

    /// Latches a button press into the joypad mailbox and, if the press
    /// should be observable as an interrupt, sets the joypad bit of IF.
    pub fn press_button(&mut self, button: Button) {
        if self.joypad.set_pressed(button) {
            let iflags = self.io[(IF_ADDR - IO_REGISTERS_START) as usize];
            self.io[(IF_ADDR - IO_REGISTERS_START) as usize] =
                iflags | (1 << JOYPAD_INTERRUPT_BIT);
        }
    }

    pub fn release_button(&mut self, button: Button) {
        self.joypad.set_released(button);
    }

    /// Loads raw program bytes starting at 0x0000, for tests that want to
    /// execute a short instruction sequence.
    pub fn load(&mut self, origin: u16, bytes: &[u8]) {
        for (i, b) in bytes.iter().enumerate() {
            let addr = origin.wrapping_add(i as u16);
            if (addr as usize) < self.rom.len() {
                self.rom[addr as usize] = *b;
            }
        }
    }

    pub fn get_io_reg(&self, addr: u16) -> u8 {
        self.io[(addr - IO_REGISTERS_START) as usize]
    }

    /// Bypasses the normal write-mask rules the CPU-visible `write` enforces.
    /// Used by the Timer and Pixel Pipeline Driver to update LY/STAT/TIMA/DIV
    /// without re-entering their own side effects.
    pub fn set_io_reg_direct(&mut self, addr: u16, value: u8) {
        self.io[(addr - IO_REGISTERS_START) as usize] = value;
    }
}

impl Default for SimpleBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus for SimpleBus {
    fn read(&mut self, addr: u16) -> u8 {
        match addr {
            ROM_BANK_0_START..=ROM_BANK_N_END => self.rom[addr as usize],
            VRAM_START..=VRAM_END => self.vram[(addr - VRAM_START) as usize],
            EXT_RAM_START..=EXT_RAM_END => self.ext_ram[(addr - EXT_RAM_START) as usize],
            WRAM_BANK_0_START..=WRAM_BANK_N_END => self.wram[(addr - WRAM_BANK_0_START) as usize],
            ECHO_RAM_START..=ECHO_RAM_END => self.wram[(addr - ECHO_RAM_START) as usize],
            OAM_START..=OAM_END => self.oam[(addr - OAM_START) as usize],
            NOT_USABLE_START..=NOT_USABLE_END => {
                log::error!("{}", CoreError::BusOutOfRange { addr, op: BusOp::Read });
                0xFF
            }
            P1_JOYP_ADDR => self.joypad.read_p1(),
            IO_REGISTERS_START..=IO_REGISTERS_END => {
                let value = self.io[(addr - IO_REGISTERS_START) as usize];
                if addr == STAT_ADDR { value | 0x80 } else { value }
            }
            HRAM_START..=HRAM_END => self.hram[(addr - HRAM_START) as usize],
            INTERRUPT_ENABLE_REGISTER => self.interrupt_enable,
        }
    }

    fn write_direct(&mut self, addr: u16, value: u8) {
        self.write_direct_impl(addr, value);
    }

    fn write(&mut self, addr: u16, value: u8) {
        match addr {
            ROM_BANK_0_START..=ROM_BANK_N_END => {
                // ROM is read-only from the CPU's perspective; a real bus
                // would route this into MBC register writes instead.
            }
            VRAM_START..=VRAM_END => self.vram[(addr - VRAM_START) as usize] = value,
            EXT_RAM_START..=EXT_RAM_END => self.ext_ram[(addr - EXT_RAM_START) as usize] = value,
            WRAM_BANK_0_START..=WRAM_BANK_N_END => {
                self.wram[(addr - WRAM_BANK_0_START) as usize] = value
            }
            ECHO_RAM_START..=ECHO_RAM_END => {
                self.wram[(addr - ECHO_RAM_START) as usize] = value
            }
            OAM_START..=OAM_END => self.oam[(addr - OAM_START) as usize] = value,
            NOT_USABLE_START..=NOT_USABLE_END => {
                log::error!("{}", CoreError::BusOutOfRange { addr, op: BusOp::Write });
            }
            P1_JOYP_ADDR => self.joypad.write_p1(value),
            DIV_ADDR => self.io[(DIV_ADDR - IO_REGISTERS_START) as usize] = 0,
            STAT_ADDR => {
                let current = self.io[(STAT_ADDR - IO_REGISTERS_START) as usize];
                let preserved = current & 0b0000_0111;
                self.io[(STAT_ADDR - IO_REGISTERS_START) as usize] =
                    (value & 0b0111_1000) | preserved;
            }
            IF_ADDR => {
                let current = self.io[(IF_ADDR - IO_REGISTERS_START) as usize];
                self.io[(IF_ADDR - IO_REGISTERS_START) as usize] =
                    (value & 0x1F) | (current & 0xE0);
            }
            LY_ADDR => {} // read-only from the CPU side; the pixel driver writes it directly
            DMA_ADDR => {
                self.io[(DMA_ADDR - IO_REGISTERS_START) as usize] = value;
                self.perform_dma_transfer(value);
            }
            IO_REGISTERS_START..=IO_REGISTERS_END => {
                self.io[(addr - IO_REGISTERS_START) as usize] = value
            }
            HRAM_START..=HRAM_END => self.hram[(addr - HRAM_START) as usize] = value,
            INTERRUPT_ENABLE_REGISTER => self.interrupt_enable = value,
        }
    }
}

impl SimpleBus {
    fn write_direct_impl(&mut self, addr: u16, value: u8) {
        match addr {
            IO_REGISTERS_START..=IO_REGISTERS_END => {
                self.io[(addr - IO_REGISTERS_START) as usize] = value
            }
            HRAM_START..=HRAM_END => self.hram[(addr - HRAM_START) as usize] = value,
            INTERRUPT_ENABLE_REGISTER => self.interrupt_enable = value,
            _ => self.write(addr, value),
        }
    }

    /// Instantaneous OAM DMA copy; no CPU stall modeled (sub-T-state timing
    /// is out of scope).
    fn perform_dma_transfer(&mut self, source_high_byte: u8) {
        let source_base = (source_high_byte as u16) << 8;
        for i in 0..OAM_SIZE as u16 {
            let src = source_base + i;
            let byte = match src {
                ROM_BANK_0_START..=ROM_BANK_N_END => self.rom[src as usize],
                VRAM_START..=VRAM_END => self.vram[(src - VRAM_START) as usize],
                EXT_RAM_START..=EXT_RAM_END => self.ext_ram[(src - EXT_RAM_START) as usize],
                WRAM_BANK_0_START..=WRAM_BANK_N_END => {
                    self.wram[(src - WRAM_BANK_0_START) as usize]
                }
                _ => 0xFF,
            };
            self.oam[i as usize] = byte;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn div_write_always_resets_to_zero() {
        let mut bus = SimpleBus::new();
        bus.write(DIV_ADDR, 0x7F);
        assert_eq!(bus.read(DIV_ADDR), 0);
    }

    #[test]
    fn write16_then_read16_round_trips() {
        let mut bus = SimpleBus::new();
        bus.write16(0xC000, 0xBEEF);
        assert_eq!(bus.read16(0xC000), 0xBEEF);
        assert_eq!(bus.read(0xC000), 0xEF);
        assert_eq!(bus.read(0xC001), 0xBE);
    }

    #[test]
    fn not_usable_region_reads_ff_and_drops_writes() {
        let mut bus = SimpleBus::new();
        bus.write(NOT_USABLE_START, 0x42);
        assert_eq!(bus.read(NOT_USABLE_START), 0xFF);
        assert_eq!(bus.read(NOT_USABLE_END), 0xFF);
    }

    #[test]
    fn joypad_press_sets_interrupt_flag_when_selected() {
        let mut bus = SimpleBus::new();
        bus.write(P1_JOYP_ADDR, 0x20); // select direction buttons
        bus.press_button(Button::UP);
        assert_ne!(bus.read(IF_ADDR) & (1 << JOYPAD_INTERRUPT_BIT), 0);
    }
}
