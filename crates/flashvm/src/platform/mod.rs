// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Collaborator abstractions for the runtime.
//!
//! The CPU engine, the flash store and the flash content validator live
//! outside the execution core. This module defines the traits the runtime
//! consumes, plus mock implementations for host testing.


// Mocks are host-only
#[cfg(any(test, feature = "std"))]
mod mock;
mod traits;

#[cfg(any(test, feature = "std"))]
pub use mock::{CACHE_PHYS_BASE, MockCpu, MockFlash};
pub use traits::{ContentValidator, Cpu, FlashRegion, FlashStore, Trap};
