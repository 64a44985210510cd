// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Fatal runtime conditions.
//!
//! A [`Fault`] means the interpreted program can not continue: the runtime
//! driver stops execution at the first one and reports it. Nothing in the
//! core retries.

use core::fmt;

use flashvm_abi::{FlashAddr, PhysAddr, VirtAddr, Word};

/// A fatal, unrecoverable runtime condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// The flash store could not map the block at this address.
    FlashUnavailable(FlashAddr),
    /// A freshly fetched block contains no valid program bytes.
    NoValidBytes(FlashAddr),
    /// A virtual RAM address translated outside the physical RAM window.
    RamOutOfBounds(VirtAddr),
    /// An indirect SVC literal matches no known encoding.
    UnknownLiteral(Word),
    /// A reserved SVC immediate was executed.
    ReservedSvc(u8),
    /// No syscall is registered under this number.
    UnknownSyscall(u16),
    /// Access to a physical address that is neither RAM nor the cache block.
    BusError(PhysAddr),
    /// The CPU engine stopped on an instruction it could not execute.
    CpuFault(PhysAddr),
    /// Execution was requested without a loaded program.
    NotLoaded,
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FlashUnavailable(addr) => write!(f, "could not map flash block at {addr}"),
            Self::NoValidBytes(addr) => write!(f, "no valid bytes in flash block at {addr}"),
            Self::RamOutOfBounds(addr) => write!(f, "RAM address {addr} outside the RAM window"),
            Self::UnknownLiteral(lit) => write!(f, "unhandled indirect SVC literal {lit:#010x}"),
            Self::ReservedSvc(imm8) => write!(f, "reserved SVC {imm8:#04x}"),
            Self::UnknownSyscall(num) => write!(f, "unknown syscall #{num}"),
            Self::BusError(addr) => write!(f, "bus error at {addr}"),
            Self::CpuFault(pc) => write!(f, "CPU fault at pc {pc}"),
            Self::NotLoaded => write!(f, "no program loaded"),
        }
    }
}
