// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Address types for the three address spaces of the VM.
//!
//! These newtypes prevent accidentally mixing address spaces at compile time.
//! There are no implicit conversions between them: every translation goes
//! through the runtime's address validator.

mod addr;

#[cfg(test)]
mod addr_test;

pub use addr::{FlashAddr, PhysAddr, VirtAddr};

/// A machine word of the VM.
pub type Word = u32;
