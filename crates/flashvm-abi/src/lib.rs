// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Shared definitions for the flashvm execution core.
//!
//! This crate is the contract between interpreted programs, the CPU engine
//! and the runtime:
//! - Virtual address-space layout (flash and RAM segment bases)
//! - Address newtypes for the three address spaces the runtime translates between
//! - Register names of the VM's CPU
//!
//! # Design Principles
//!
//! - **No dependencies**: Pure data types, 100% host-testable
//! - **32-bit only**: the VM is a 32-bit machine; every address is a [`Word`]

#![no_std]

pub mod layout;
pub mod reg;
pub mod types;

pub use reg::Reg;
pub use types::{FlashAddr, PhysAddr, VirtAddr, Word};
