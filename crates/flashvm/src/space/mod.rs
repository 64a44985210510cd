// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Address validation.
//!
//! There is no memory protection hardware under the VM. Instead every
//! address interpreted code wants to use passes through
//! [`AddressSpace::validate`], which classifies it, translates it into
//! physical memory and refuses anything that would land outside the VM's
//! memory. Validation is also what drives demand-loading of flash blocks.
//!
//! Classification is by range, checked in this order:
//! 1. Already inside the physical RAM window (e.g. SP/FP-relative
//!    addresses): passed through unchanged.
//! 2. Virtual flash: translated into the resident cache block, fetching the
//!    covering block on a miss. Not writable.
//! 3. Anything else is virtual RAM: folded onto the RAM window, and fatal if
//!    the result falls outside it.


use flashvm_abi::layout::{VIRTUAL_RAM_BASE, VIRTUAL_RAM_MASK};
use flashvm_abi::{PhysAddr, VirtAddr, Word};
use tracing::trace;

use crate::fault::Fault;
use crate::flash::FlashCache;
use crate::memory::{Bus, UserRam};
use crate::platform::{ContentValidator, FlashStore};

/// Result of validating an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Validated {
    /// Physical address to read from.
    pub read: PhysAddr,
    /// Physical address to write to; `None` for flash.
    pub write: Option<PhysAddr>,
}

impl Validated {
    /// Read and write at the same physical address.
    const fn read_write(addr: PhysAddr) -> Self {
        Self {
            read: addr,
            write: Some(addr),
        }
    }

    /// Value published in the write-address register (zero if not writable).
    #[must_use]
    pub fn write_word(&self) -> Word {
        self.write.map_or(0, PhysAddr::as_u32)
    }
}

/// The VM's memory: the RAM window plus the flash cache.
pub struct AddressSpace<F, V> {
    cache: FlashCache<F, V>,
    ram: UserRam,
}

impl<F: FlashStore, V: ContentValidator> AddressSpace<F, V> {
    /// Combine a flash cache and a RAM window.
    pub const fn new(cache: FlashCache<F, V>, ram: UserRam) -> Self {
        Self { cache, ram }
    }

    /// The flash cache.
    pub const fn cache(&self) -> &FlashCache<F, V> {
        &self.cache
    }

    /// Mutable access to the flash cache.
    pub fn cache_mut(&mut self) -> &mut FlashCache<F, V> {
        &mut self.cache
    }

    /// The RAM window.
    pub const fn ram(&self) -> &UserRam {
        &self.ram
    }

    /// Mutable access to the RAM window.
    pub fn ram_mut(&mut self) -> &mut UserRam {
        &mut self.ram
    }

    /// Physical memory as seen by the CPU engine.
    pub fn bus(&mut self) -> Bus<'_> {
        Bus::new(&mut self.ram, self.cache.block())
    }

    /// Fold a virtual RAM address onto the physical RAM window.
    ///
    /// The result is only meaningful if it lies inside the window; this
    /// function does not check.
    pub fn virt_to_phys_ram(&self, addr: VirtAddr) -> PhysAddr {
        let offset = addr.as_u32().wrapping_sub(VIRTUAL_RAM_BASE) & VIRTUAL_RAM_MASK;
        self.ram.base().add(offset)
    }

    /// Validate and translate an address.
    ///
    /// Validating an address that is already resident never fetches; a
    /// flash address outside the resident block causes exactly one
    /// release and one fetch.
    pub fn validate(&mut self, addr: Word) -> Result<Validated, Fault> {
        let phys = PhysAddr::new(addr);
        if self.ram.contains(phys) {
            trace!(%phys, "validated physical RAM address");
            return Ok(Validated::read_write(phys));
        }

        let virt = VirtAddr::new(addr);
        if virt.is_flash() {
            let read = match self.cache.lookup(virt) {
                Some(read) => read,
                None => self.cache.fetch(virt)?,
            };
            trace!(%virt, %read, "validated flash address");
            return Ok(Validated { read, write: None });
        }

        let phys = self.virt_to_phys_ram(virt);
        if !self.ram.contains(phys) {
            return Err(Fault::RamOutOfBounds(virt));
        }
        trace!(%virt, %phys, "validated RAM address");
        Ok(Validated::read_write(phys))
    }
}
