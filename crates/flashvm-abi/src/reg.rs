// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! CPU register names.

use core::fmt;

/// A register of the VM's CPU.
///
/// `R0`..`R7` are the general registers visible to syscalls. `R8` and `R9`
/// receive the read and write addresses published by address validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Reg {
    R0 = 0,
    R1 = 1,
    R2 = 2,
    R3 = 3,
    R4 = 4,
    R5 = 5,
    R6 = 6,
    R7 = 7,
    /// Validated read address.
    R8 = 8,
    /// Validated write address (zero when the target is not writable).
    R9 = 9,
    /// Frame pointer.
    Fp = 10,
    /// Stack pointer.
    Sp = 11,
    /// Link register.
    Lr = 12,
    /// Program counter.
    Pc = 13,
}

impl Reg {
    /// Total number of registers.
    pub const COUNT: usize = 14;

    /// The general registers in argument order.
    pub const GENERAL: [Self; 8] = [
        Self::R0,
        Self::R1,
        Self::R2,
        Self::R3,
        Self::R4,
        Self::R5,
        Self::R6,
        Self::R7,
    ];

    /// General register `rN` for the low three bits of `n`.
    #[inline]
    #[must_use]
    pub const fn general(n: u8) -> Self {
        Self::GENERAL[(n & 0x7) as usize]
    }

    /// Index of this register in a register file.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fp => write!(f, "fp"),
            Self::Sp => write!(f, "sp"),
            Self::Lr => write!(f, "lr"),
            Self::Pc => write!(f, "pc"),
            other => write!(f, "r{}", other.index()),
        }
    }
}
