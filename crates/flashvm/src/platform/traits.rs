// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Collaborator traits.

use flashvm_abi::{FlashAddr, PhysAddr, Reg, Word};

use crate::memory::Bus;

/// Why the CPU engine handed control back to the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trap {
    /// A supervisor call with its 8-bit immediate. PC points past the
    /// 16-bit SVC instruction.
    Svc(u8),
    /// The engine stopped without an exit syscall.
    Halt,
    /// The engine could not execute the instruction at PC.
    Fault,
}

/// The CPU engine interpreting the instruction stream.
///
/// The engine owns the register file; the runtime reads and writes it
/// through this trait but never stores registers itself.
pub trait Cpu {
    /// Read a register.
    fn reg(&self, reg: Reg) -> Word;

    /// Write a register.
    fn set_reg(&mut self, reg: Reg, value: Word);

    /// Move the stack pointer by `delta` bytes.
    fn adjust_sp(&mut self, delta: i32) {
        let sp = self.reg(Reg::Sp);
        self.set_reg(Reg::Sp, sp.wrapping_add_signed(delta));
    }

    /// Clear all registers.
    fn reset(&mut self);

    /// Execute instructions from PC until the next trap.
    fn run(&mut self, bus: &mut Bus<'_>) -> Trap;
}

/// A block of flash mapped into physical memory by a [`FlashStore`].
///
/// Regions are handed out by [`FlashStore::get_region`] and must be given
/// back with [`FlashStore::release_region`]; they are neither `Copy` nor
/// `Clone`, so a released region can not be used again.
#[derive(Debug, PartialEq, Eq)]
pub struct FlashRegion {
    base: FlashAddr,
    size: u32,
    data: PhysAddr,
}

impl FlashRegion {
    /// Describe a region of `size` flash bytes at `base`, mapped at `data`.
    #[must_use]
    pub const fn new(base: FlashAddr, size: u32, data: PhysAddr) -> Self {
        Self { base, size, data }
    }

    /// Flash address of the first byte.
    #[inline]
    #[must_use]
    pub const fn base(&self) -> FlashAddr {
        self.base
    }

    /// Size in bytes.
    #[inline]
    #[must_use]
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// Physical address the region is mapped at.
    #[inline]
    #[must_use]
    pub const fn data(&self) -> PhysAddr {
        self.data
    }
}

/// Block-granular access to the backing flash.
pub trait FlashStore {
    /// Map `len` bytes of flash starting at `addr`.
    ///
    /// Returns `None` if the region can not be mapped.
    fn get_region(&mut self, addr: FlashAddr, len: u32) -> Option<FlashRegion>;

    /// Give a region back to the store.
    fn release_region(&mut self, region: FlashRegion);

    /// Bytes of a mapped region.
    fn region_data(&self, region: &FlashRegion) -> &[u8];
}

/// Decides how much of a flash block is genuine program content.
pub trait ContentValidator {
    /// Number of valid bytes at the start of `block`.
    fn valid_bytes(&self, block: &[u8]) -> u32;
}
