// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Physical memory of the VM.
//!
//! The runtime owns the RAM window, a fixed buffer at a fixed physical
//! address that never moves during a program's lifetime. Together with the
//! resident flash cache block it forms the physical memory the CPU engine
//! sees through a [`Bus`]. All multi-byte accesses are little-endian.


use alloc::boxed::Box;
use alloc::vec;
use core::ops::Range;

use flashvm_abi::{PhysAddr, Word};

use crate::fault::Fault;

/// The physical RAM window.
pub struct UserRam {
    base: PhysAddr,
    bytes: Box<[u8]>,
}

impl UserRam {
    /// Create a zeroed RAM window of `size` bytes at `base`.
    #[must_use]
    pub fn new(base: PhysAddr, size: u32) -> Self {
        Self {
            base,
            bytes: vec![0u8; size as usize].into_boxed_slice(),
        }
    }

    /// Physical address of the first byte.
    #[inline]
    #[must_use]
    pub const fn base(&self) -> PhysAddr {
        self.base
    }

    /// Size of the window in bytes.
    #[inline]
    #[must_use]
    pub fn size(&self) -> u32 {
        self.bytes.len() as u32
    }

    /// First physical address past the window.
    #[inline]
    #[must_use]
    pub fn top(&self) -> PhysAddr {
        self.base.add(self.size())
    }

    /// Check if a physical address is inside the window.
    #[inline]
    #[must_use]
    pub fn contains(&self, addr: PhysAddr) -> bool {
        addr.is_within(self.base, self.size())
    }

    /// Buffer range for `len` bytes at `addr`.
    fn range(&self, addr: PhysAddr, len: usize) -> Result<Range<usize>, Fault> {
        if !self.contains(addr) {
            return Err(Fault::BusError(addr));
        }
        let start = addr.diff(self.base) as usize;
        let end = start
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(Fault::BusError(addr))?;
        Ok(start..end)
    }

    /// Read `N` bytes at `addr`.
    fn read_array<const N: usize>(&self, addr: PhysAddr) -> Result<[u8; N], Fault> {
        let range = self.range(addr, N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(&self.bytes[range]);
        Ok(out)
    }

    /// Read a byte.
    pub fn read_u8(&self, addr: PhysAddr) -> Result<u8, Fault> {
        self.read_array::<1>(addr).map(|b| b[0])
    }

    /// Read a halfword.
    pub fn read_u16(&self, addr: PhysAddr) -> Result<u16, Fault> {
        self.read_array(addr).map(u16::from_le_bytes)
    }

    /// Read a word.
    pub fn read_u32(&self, addr: PhysAddr) -> Result<Word, Fault> {
        self.read_array(addr).map(u32::from_le_bytes)
    }

    /// Write a byte.
    pub fn write_u8(&mut self, addr: PhysAddr, value: u8) -> Result<(), Fault> {
        self.write_bytes(addr, &[value])
    }

    /// Write a halfword.
    pub fn write_u16(&mut self, addr: PhysAddr, value: u16) -> Result<(), Fault> {
        self.write_bytes(addr, &value.to_le_bytes())
    }

    /// Write a word.
    pub fn write_u32(&mut self, addr: PhysAddr, value: Word) -> Result<(), Fault> {
        self.write_bytes(addr, &value.to_le_bytes())
    }

    /// Copy `data` into the window at `addr`.
    pub fn write_bytes(&mut self, addr: PhysAddr, data: &[u8]) -> Result<(), Fault> {
        if data.is_empty() {
            return Ok(());
        }
        let range = self.range(addr, data.len())?;
        self.bytes[range].copy_from_slice(data);
        Ok(())
    }

    /// Zero `len` bytes at `addr`.
    pub fn zero(&mut self, addr: PhysAddr, len: u32) -> Result<(), Fault> {
        if len == 0 {
            return Ok(());
        }
        let range = self.range(addr, len as usize)?;
        self.bytes[range].fill(0);
        Ok(())
    }

    /// Zero the whole window.
    pub fn clear(&mut self) {
        self.bytes.fill(0);
    }

    /// Raw access to the window (for debugging/testing).
    #[must_use]
    pub fn raw_memory(&self) -> &[u8] {
        &self.bytes
    }
}

/// Physical memory as seen by the CPU engine.
///
/// Reads are served from the RAM window or the resident cache block, writes
/// only from the RAM window. Any other address is a bus error.
pub struct Bus<'a> {
    ram: &'a mut UserRam,
    block: Option<(PhysAddr, &'a [u8])>,
}

impl<'a> Bus<'a> {
    /// Create a bus over the RAM window and an optional cache block mapped
    /// at the given physical address.
    #[must_use]
    pub fn new(ram: &'a mut UserRam, block: Option<(PhysAddr, &'a [u8])>) -> Self {
        Self { ram, block }
    }

    /// Read `N` bytes from the cache block.
    fn read_block<const N: usize>(&self, addr: PhysAddr) -> Result<[u8; N], Fault> {
        let (base, bytes) = self.block.ok_or(Fault::BusError(addr))?;
        if !addr.is_within(base, bytes.len() as u32) {
            return Err(Fault::BusError(addr));
        }
        let start = addr.diff(base) as usize;
        let chunk = bytes.get(start..start + N).ok_or(Fault::BusError(addr))?;
        let mut out = [0u8; N];
        out.copy_from_slice(chunk);
        Ok(out)
    }

    /// Read `N` bytes from wherever `addr` is mapped.
    fn read_array<const N: usize>(&self, addr: PhysAddr) -> Result<[u8; N], Fault> {
        if self.ram.contains(addr) {
            self.ram.read_array(addr)
        } else {
            self.read_block(addr)
        }
    }

    /// Read a byte.
    pub fn read_u8(&self, addr: PhysAddr) -> Result<u8, Fault> {
        self.read_array::<1>(addr).map(|b| b[0])
    }

    /// Read a halfword.
    pub fn read_u16(&self, addr: PhysAddr) -> Result<u16, Fault> {
        self.read_array(addr).map(u16::from_le_bytes)
    }

    /// Read a word.
    pub fn read_u32(&self, addr: PhysAddr) -> Result<Word, Fault> {
        self.read_array(addr).map(u32::from_le_bytes)
    }

    /// Write a byte. Flash is not writable.
    pub fn write_u8(&mut self, addr: PhysAddr, value: u8) -> Result<(), Fault> {
        self.ram.write_u8(addr, value)
    }

    /// Write a halfword. Flash is not writable.
    pub fn write_u16(&mut self, addr: PhysAddr, value: u16) -> Result<(), Fault> {
        self.ram.write_u16(addr, value)
    }

    /// Write a word. Flash is not writable.
    pub fn write_u32(&mut self, addr: PhysAddr, value: Word) -> Result<(), Fault> {
        self.ram.write_u32(addr, value)
    }
}
