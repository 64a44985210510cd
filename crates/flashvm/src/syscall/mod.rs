// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Syscall interface.
//!
//! Every syscall receives all eight general registers as arguments, no
//! matter how many it actually uses, and returns one word in r0. Numbers
//! below [`DIRECT_SYSCALL_COUNT`] are reachable through a direct SVC; the
//! rest only through an indirect literal.


use alloc::vec::Vec;

use flashvm_abi::layout::GENERAL_REG_COUNT;
pub use flashvm_abi::layout::DIRECT_SYSCALL_COUNT;
use flashvm_abi::Word;

/// Syscall arguments, r0 through r7.
pub type SyscallArgs = [Word; GENERAL_REG_COUNT];

/// What a syscall hands back to the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyscallReturn {
    /// Store the value in r0 and continue.
    Value(Word),
    /// Terminate the running program.
    Exit,
}

/// The table of syscalls provided by the embedding.
pub trait SyscallTable {
    /// Invoke syscall `number`.
    ///
    /// Returns `None` if no syscall is registered under that number.
    fn invoke(&mut self, number: u16, args: SyscallArgs) -> Option<SyscallReturn>;
}

/// A syscall implemented by a plain function.
pub type SyscallFn = fn(&SyscallArgs) -> SyscallReturn;

/// A syscall table of plain functions indexed by number.
#[derive(Debug, Default, Clone)]
pub struct FnTable {
    entries: Vec<Option<SyscallFn>>,
}

impl FnTable {
    /// Create an empty table.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Register `f` as syscall `number`, replacing any previous entry.
    pub fn register(&mut self, number: u16, f: SyscallFn) -> &mut Self {
        let index = usize::from(number);
        if index >= self.entries.len() {
            self.entries.resize(index + 1, None);
        }
        self.entries[index] = Some(f);
        self
    }

    /// Builder form of [`register`](Self::register).
    #[must_use]
    pub fn with(mut self, number: u16, f: SyscallFn) -> Self {
        self.register(number, f);
        self
    }

    /// Check if a syscall is registered under `number`.
    #[must_use]
    pub fn contains(&self, number: u16) -> bool {
        self.get(number).is_some()
    }

    fn get(&self, number: u16) -> Option<SyscallFn> {
        self.entries.get(usize::from(number)).copied().flatten()
    }
}

impl SyscallTable for FnTable {
    fn invoke(&mut self, number: u16, args: SyscallArgs) -> Option<SyscallReturn> {
        self.get(number).map(|f| f(&args))
    }
}
