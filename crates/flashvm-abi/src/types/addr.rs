// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Virtual, physical and flash address types.

use core::fmt;
use core::ops::{Add, Sub};

use crate::layout::{VIRTUAL_FLASH_BASE, is_flash_addr, is_ram_addr};

/// Shared operations of every address newtype.
macro_rules! address_type {
    ($name:ident) => {
        impl $name {
            /// Create a new address.
            #[inline]
            #[must_use]
            pub const fn new(addr: u32) -> Self {
                Self(addr)
            }

            /// Create a null (zero) address.
            #[inline]
            #[must_use]
            pub const fn null() -> Self {
                Self(0)
            }

            /// Check if this is a null address.
            #[inline]
            #[must_use]
            pub const fn is_null(self) -> bool {
                self.0 == 0
            }

            /// Get the raw address value.
            #[inline]
            #[must_use]
            pub const fn as_u32(self) -> u32 {
                self.0
            }

            /// Add an offset to this address (wrapping).
            #[inline]
            #[must_use]
            pub const fn add(self, offset: u32) -> Self {
                Self(self.0.wrapping_add(offset))
            }

            /// Subtract an offset from this address (wrapping).
            #[inline]
            #[must_use]
            pub const fn sub(self, offset: u32) -> Self {
                Self(self.0.wrapping_sub(offset))
            }

            /// Calculate the difference between two addresses.
            #[inline]
            #[must_use]
            pub const fn diff(self, other: Self) -> u32 {
                self.0.wrapping_sub(other.0)
            }

            /// Align this address down to the given alignment.
            ///
            /// Returns `None` if alignment is zero or not a power of two.
            #[inline]
            #[must_use]
            pub const fn align_down(self, alignment: u32) -> Option<Self> {
                if !alignment.is_power_of_two() {
                    return None;
                }
                Some(Self(self.0 & !(alignment - 1)))
            }

            /// Check whether this address lies in `[base, base + len)`.
            ///
            /// Never overflows: a range reaching past `u32::MAX` is clipped.
            #[inline]
            #[must_use]
            pub const fn is_within(self, base: Self, len: u32) -> bool {
                self.0 >= base.0 && self.0 - base.0 < len
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({:#x})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{:#010x}", self.0)
            }
        }

        impl Add<u32> for $name {
            type Output = Self;

            fn add(self, rhs: u32) -> Self::Output {
                self.add(rhs)
            }
        }

        impl Sub<u32> for $name {
            type Output = Self;

            fn sub(self, rhs: u32) -> Self::Output {
                self.sub(rhs)
            }
        }
    };
}

/// An address as seen by interpreted code.
///
/// Virtual addresses are classified by range, not tagged: at or above
/// [`VIRTUAL_FLASH_BASE`] they name program flash, in the virtual RAM
/// segment they name a location in the RAM window.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct VirtAddr(u32);

address_type!(VirtAddr);

impl VirtAddr {
    /// Returns true if this address lies in the virtual flash segment.
    #[inline]
    #[must_use]
    pub const fn is_flash(self) -> bool {
        is_flash_addr(self.0)
    }

    /// Returns true if this address lies in the virtual RAM segment.
    #[inline]
    #[must_use]
    pub const fn is_ram(self) -> bool {
        is_ram_addr(self.0)
    }

    /// Offset of a flash address from the start of the flash segment.
    #[inline]
    #[must_use]
    pub const fn flash_offset(self) -> u32 {
        self.0.wrapping_sub(VIRTUAL_FLASH_BASE)
    }
}

/// A physical address on the device.
///
/// The RAM window and the resident flash cache block both live in the
/// physical address space. Registers such as SP and PC hold physical
/// addresses once a program is running.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct PhysAddr(u32);

address_type!(PhysAddr);

/// An address in the backing flash store.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct FlashAddr(u32);

address_type!(FlashAddr);
