// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for the address types.

#![allow(clippy::unwrap_used, clippy::expect_used)]

extern crate std;

use std::format;

use super::{FlashAddr, PhysAddr, VirtAddr};

#[test]
fn test_virt_addr_classification() {
    assert!(VirtAddr::new(0x8000_0000).is_flash());
    assert!(VirtAddr::new(0xFFFF_FFFF).is_flash());
    assert!(!VirtAddr::new(0x7FFF_FFFF).is_flash());

    assert!(VirtAddr::new(0x1000_0000).is_ram());
    assert!(VirtAddr::new(0x7FFF_FFFF).is_ram());
    assert!(!VirtAddr::new(0x0FFF_FFFF).is_ram());
    assert!(!VirtAddr::new(0x8000_0000).is_ram());
}

#[test]
fn test_flash_offset() {
    assert_eq!(VirtAddr::new(0x8000_0000).flash_offset(), 0);
    assert_eq!(VirtAddr::new(0x8000_1234).flash_offset(), 0x1234);
}

#[test]
fn test_arithmetic_wraps() {
    let addr = PhysAddr::new(0x10);
    assert_eq!((addr - 0x20).as_u32(), 0xFFFF_FFF0);
    assert_eq!((addr + 0x20).as_u32(), 0x30);
    assert_eq!(PhysAddr::new(0x30).diff(addr), 0x20);
}

#[test]
fn test_alignment() {
    let addr = FlashAddr::new(0x1234);
    assert_eq!(addr.align_down(0x200).map(FlashAddr::as_u32), Some(0x1200));
    assert_eq!(addr.align_down(0), None);
    assert_eq!(addr.align_down(3), None);
}

#[test]
fn test_is_within() {
    let base = PhysAddr::new(0x2000_0000);
    assert!(base.is_within(base, 1));
    assert!(PhysAddr::new(0x2000_00FF).is_within(base, 0x100));
    assert!(!PhysAddr::new(0x2000_0100).is_within(base, 0x100));
    assert!(!PhysAddr::new(0x1FFF_FFFF).is_within(base, 0x100));
    assert!(!base.is_within(base, 0));

    // Ranges touching the top of the address space do not overflow
    let top = PhysAddr::new(0xFFFF_FF00);
    assert!(PhysAddr::new(0xFFFF_FFFF).is_within(top, 0x1000));
}

#[test]
fn test_debug_format() {
    assert_eq!(format!("{:?}", VirtAddr::new(0x8000_0040)), "VirtAddr(0x80000040)");
    assert_eq!(format!("{:?}", PhysAddr::new(0x1234)), "PhysAddr(0x1234)");
    assert_eq!(format!("{}", FlashAddr::new(0x40)), "0x00000040");
}
