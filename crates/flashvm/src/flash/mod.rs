// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Flash block cache.
//!
//! Program text is far larger than RAM, so only one flash block of it is
//! mapped at a time. The cache keeps that single resident block and
//! translates between virtual flash addresses and addresses inside the
//! block.
//!
//! A refill replaces the resident block wholesale: every physical address
//! derived from the previous block is invalid afterwards. Callers re-validate
//! on each access instead of holding on to translated addresses.


use flashvm_abi::layout::{FLASH_BLOCK_SIZE, VIRTUAL_FLASH_BASE};
use flashvm_abi::{FlashAddr, PhysAddr, VirtAddr};
use tracing::debug;

use crate::fault::Fault;
use crate::platform::{ContentValidator, FlashRegion, FlashStore};

/// Erased flash reads back as all ones.
const ERASED_HALFWORD: u16 = 0xFFFF;

/// Content validator for freshly erased-then-programmed flash.
///
/// Programmed content runs up to the last halfword that is not erased; the
/// trailing erased run is unwritten flash. Erased-looking halfwords inside
/// the content (an all-ones literal, say) are still valid. An all-erased
/// block has no valid bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErasedFlashValidator;

impl ContentValidator for ErasedFlashValidator {
    fn valid_bytes(&self, block: &[u8]) -> u32 {
        let halfwords = block
            .chunks_exact(2)
            .rposition(|pair| u16::from_le_bytes([pair[0], pair[1]]) != ERASED_HALFWORD)
            .map_or(0, |last| last + 1);
        (halfwords * 2) as u32
    }
}

/// Where the running program's text lives in flash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlashMapping {
    /// Flash address of the program image.
    pub image_base: FlashAddr,
    /// Offset of the text/rodata segment inside the image.
    pub text_start: u32,
}

impl FlashMapping {
    /// Flash address backing a virtual flash address.
    #[inline]
    #[must_use]
    pub const fn virt_to_flash(&self, addr: VirtAddr) -> FlashAddr {
        self.image_base
            .add(self.text_start)
            .add(addr.flash_offset())
    }
}

/// The single resident flash block and its translations.
pub struct FlashCache<F, V> {
    store: F,
    validator: V,
    mapping: FlashMapping,
    resident: Option<FlashRegion>,
    valid_bytes: u32,
}

impl<F: FlashStore, V: ContentValidator> FlashCache<F, V> {
    /// Create an empty cache over a flash store.
    pub const fn new(store: F, validator: V) -> Self {
        Self {
            store,
            validator,
            mapping: FlashMapping {
                image_base: FlashAddr::null(),
                text_start: 0,
            },
            resident: None,
            valid_bytes: 0,
        }
    }

    /// The backing flash store.
    pub const fn store(&self) -> &F {
        &self.store
    }

    /// Mutable access to the backing flash store.
    ///
    /// Regions obtained directly must be released before the next fetch.
    pub fn store_mut(&mut self) -> &mut F {
        &mut self.store
    }

    /// The current program mapping.
    pub const fn mapping(&self) -> FlashMapping {
        self.mapping
    }

    /// Point the cache at a new program, dropping the resident block.
    pub fn set_mapping(&mut self, mapping: FlashMapping) {
        self.release();
        self.mapping = mapping;
    }

    /// The resident region, if any.
    pub const fn resident(&self) -> Option<&FlashRegion> {
        self.resident.as_ref()
    }

    /// Physical address of the resident block.
    pub fn block_base(&self) -> Option<PhysAddr> {
        self.resident.as_ref().map(FlashRegion::data)
    }

    /// Valid byte count of the resident block.
    pub const fn valid_bytes(&self) -> u32 {
        self.valid_bytes
    }

    /// The resident block's physical address and bytes.
    pub fn block(&self) -> Option<(PhysAddr, &[u8])> {
        self.resident
            .as_ref()
            .map(|region| (region.data(), self.store.region_data(region)))
    }

    /// Translate a virtual flash address into the resident block.
    ///
    /// The result may lie outside the block; see [`Self::lookup`].
    pub fn virt_to_cache(&self, addr: VirtAddr) -> Option<PhysAddr> {
        let region = self.resident.as_ref()?;
        let flash = self.mapping.virt_to_flash(addr);
        Some(region.data().add(flash.diff(region.base())))
    }

    /// Translate an address in the resident block back to virtual flash.
    pub fn cache_to_virt(&self, addr: PhysAddr) -> Option<VirtAddr> {
        let region = self.resident.as_ref()?;
        let flash = region.base().add(addr.diff(region.data()));
        let offset = flash.diff(self.mapping.image_base.add(self.mapping.text_start));
        Some(VirtAddr::new(VIRTUAL_FLASH_BASE).add(offset))
    }

    /// Translate a virtual flash address if it falls inside the resident block.
    pub fn lookup(&self, addr: VirtAddr) -> Option<PhysAddr> {
        let base = self.block_base()?;
        self.virt_to_cache(addr)
            .filter(|phys| phys.is_within(base, FLASH_BLOCK_SIZE))
    }

    /// Make the block covering `addr` resident and translate `addr` into it.
    ///
    /// Any resident block is released first.
    pub fn fetch(&mut self, addr: VirtAddr) -> Result<PhysAddr, Fault> {
        self.release();

        let block = addr.align_down(FLASH_BLOCK_SIZE).unwrap_or(addr);
        let flash = self.mapping.virt_to_flash(block);
        let region = self
            .store
            .get_region(flash, FLASH_BLOCK_SIZE)
            .ok_or(Fault::FlashUnavailable(flash))?;

        let valid = self.validator.valid_bytes(self.store.region_data(&region));
        if valid == 0 {
            self.store.release_region(region);
            return Err(Fault::NoValidBytes(flash));
        }

        debug!(%addr, %flash, cache = %region.data(), valid, "fetched flash block");
        self.resident = Some(region);
        self.valid_bytes = valid;

        self.virt_to_cache(addr).ok_or(Fault::FlashUnavailable(flash))
    }

    /// Give the resident block back to the store.
    pub fn release(&mut self) {
        if let Some(region) = self.resident.take() {
            self.store.release_region(region);
        }
        self.valid_bytes = 0;
    }
}
