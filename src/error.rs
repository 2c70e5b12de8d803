use thiserror::Error;

/// Errors the core can surface back to a host driving the scheduler.
///
/// Everything else the hardware does — flag overflow, F auto-masking, HALT
/// with IME=0 — is normal operation and never reaches this type.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CoreError {
    /// The fetched opcode has no handler. `pc` is the PC *after* the width
    /// advance for the faulting opcode; `opcode` is the byte decoded.
    #[error("invalid opcode {opcode:#04x} at pc {pc:#06x}")]
    InvalidOpcode { pc: u16, opcode: u8 },

    /// A bus access fell outside any mapped region. Non-fatal: the read that
    /// produced this already returned 0xFF and the write was dropped; this
    /// variant exists for hosts that want to log or assert on it.
    #[error("bus access out of range at {addr:#06x} ({op})")]
    BusOutOfRange { addr: u16, op: BusOp },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusOp {
    Read,
    Write,
}

impl std::fmt::Display for BusOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BusOp::Read => write!(f, "read"),
            BusOp::Write => write!(f, "write"),
        }
    }
}

pub type CpuResult<T> = Result<T, CoreError>;
