// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! # flashvm
//!
//! Execution core of a bytecode VM for devices with a small RAM window and a
//! much larger external flash.
//!
//! This crate provides:
//! - An ELF loader that locates the text/rodata, rwdata and bss segments
//! - A single-block flash cache with virtual-to-cache address translation
//! - The address validator every interpreted memory access passes through
//! - Call linkage with a fixed register frame
//! - The supervisor-call (SVC) decoder for calls, syscalls and address ops
//! - The runtime driver tying them together around an external CPU engine
//!
//! The CPU engine, the flash store and the syscall implementations are
//! collaborators supplied by the embedding through the traits in
//! [`platform`] and [`syscall`].
//!
//! ## `no_std` Support
//!
//! The crate is `no_std` (with `alloc`) unless the `std` feature is enabled.
//! Mock collaborators for host testing are only built with `std`.

#![cfg_attr(not(any(test, feature = "std")), no_std)]

extern crate alloc;

pub mod elf;
pub mod fault;
pub mod flash;
pub mod frame;
pub mod memory;
pub mod platform;
pub mod runtime;
pub mod space;
pub mod svc;
pub mod syscall;

// Re-export commonly used types at crate root
pub use elf::{LoadError, ProgramInfo, Segment};
pub use fault::Fault;
pub use flashvm_abi::{FlashAddr, PhysAddr, Reg, VirtAddr, Word, layout};
pub use platform::{ContentValidator, Cpu, FlashRegion, FlashStore, Trap};
pub use runtime::{ProgramId, ProgramSlot, RunOutcome, RunState, Runtime, RuntimeConfig};
pub use syscall::{SyscallReturn, SyscallTable};

/// Crate version.
pub const VERSION: &str = match option_env!("FLASHVM_VERSION") {
    Some(v) => v,
    None => "unknown",
};
