// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Virtual address-space layout constants.
//!
//! Interpreted code sees two virtual segments, told apart purely by range:
//!
//! ```text
//! 0x1000_0000  Virtual RAM (1 MB span, folded onto the physical RAM window)
//! 0x8000_0000  Virtual flash (text/rodata of the loaded program)
//! ```
//!
//! Anything else handed to the validator must already be a physical address
//! inside the live RAM window.

/// One kilobyte in bytes.
const KB: u32 = 1024;

/// Base of the virtual flash segment.
///
/// Virtual flash address `VIRTUAL_FLASH_BASE + n` is byte `n` of the
/// program's text/rodata segment.
pub const VIRTUAL_FLASH_BASE: u32 = 0x8000_0000;

/// Base of the virtual RAM segment.
pub const VIRTUAL_RAM_BASE: u32 = 0x1000_0000;

/// Mask applied to a virtual RAM offset before it is added to the physical
/// RAM base.
pub const VIRTUAL_RAM_MASK: u32 = 0x000F_FFFF;

/// Size of a flash block, the unit of caching.
pub const FLASH_BLOCK_SIZE: u32 = 512;

/// Mask selecting the block-aligned part of an address.
pub const FLASH_BLOCK_MASK: u32 = !(FLASH_BLOCK_SIZE - 1);

/// Default size of the physical RAM window.
pub const DEFAULT_RAM_SIZE: u32 = 32 * KB;

/// Number of general-purpose registers passed to syscalls.
pub const GENERAL_REG_COUNT: usize = 8;

/// Number of registers captured in a call frame.
pub const FRAME_REG_COUNT: usize = 8;

/// Size of a call frame on the stack, in bytes.
pub const FRAME_SIZE: u32 = (FRAME_REG_COUNT * 4) as u32;

/// Number of syscalls reachable through a direct SVC.
pub const DIRECT_SYSCALL_COUNT: u16 = 64;

// Compile-time layout checks
const _: () = assert!(FLASH_BLOCK_SIZE.is_power_of_two());
const _: () = assert!(VIRTUAL_RAM_BASE < VIRTUAL_FLASH_BASE);
const _: () = assert!(VIRTUAL_RAM_BASE + VIRTUAL_RAM_MASK < VIRTUAL_FLASH_BASE);
// An indirect SVC addresses up to 128 words from its page base.
const _: () = assert!(FLASH_BLOCK_SIZE >= 128 * 4);

/// Returns true if `addr` lies in the virtual flash segment.
#[inline]
#[must_use]
pub const fn is_flash_addr(addr: u32) -> bool {
    addr >= VIRTUAL_FLASH_BASE
}

/// Returns true if `addr` lies in the virtual RAM segment.
#[inline]
#[must_use]
pub const fn is_ram_addr(addr: u32) -> bool {
    addr >= VIRTUAL_RAM_BASE && addr < VIRTUAL_FLASH_BASE
}
