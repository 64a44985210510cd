// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Mock collaborators for testing.
//!
//! [`MockFlash`] is a flash store backed by a heap buffer with a couple of
//! block-sized cache slots. [`MockCpu`] is a register file with an engine
//! that only understands `SVC` and `BKPT`, enough to drive the runtime
//! through whole programs without a real interpreter.

use alloc::vec;
use alloc::vec::Vec;

use flashvm_abi::layout::FLASH_BLOCK_SIZE;
use flashvm_abi::{FlashAddr, PhysAddr, Reg, Word};

use crate::memory::Bus;
use crate::platform::traits::{Cpu, FlashRegion, FlashStore, Trap};

/// Physical address of the first cache slot of [`MockFlash`].
pub const CACHE_PHYS_BASE: PhysAddr = PhysAddr::new(0x3000_0000);

/// Number of regions [`MockFlash`] can map at once.
const SLOT_COUNT: usize = 2;

/// Value of erased flash.
const ERASED: u8 = 0xFF;

/// A mapped cache slot.
struct Slot {
    base: FlashAddr,
    bytes: Vec<u8>,
}

/// A flash store backed by a heap-allocated buffer.
///
/// Unprogrammed flash reads as erased (`0xFF`), including everything past
/// the end of the buffer. Each mapped region occupies one block-aligned
/// slot at [`CACHE_PHYS_BASE`].
pub struct MockFlash {
    contents: Vec<u8>,
    slots: [Option<Slot>; SLOT_COUNT],
    requests: Vec<(FlashAddr, u32)>,
    fetches: usize,
    releases: usize,
    unavailable: bool,
}

impl MockFlash {
    /// Create an erased flash of `size` bytes.
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self {
            contents: vec![ERASED; size],
            slots: [None, None],
            requests: Vec::new(),
            fetches: 0,
            releases: 0,
            unavailable: false,
        }
    }

    /// Create a flash holding `image` at address zero.
    #[must_use]
    pub fn with_image(image: &[u8]) -> Self {
        let mut flash = Self::new(image.len());
        flash.program(FlashAddr::null(), image);
        flash
    }

    /// Write `bytes` at `addr`, growing the flash if needed.
    pub fn program(&mut self, addr: FlashAddr, bytes: &[u8]) {
        let start = addr.as_u32() as usize;
        let end = start + bytes.len();
        if end > self.contents.len() {
            self.contents.resize(end, ERASED);
        }
        self.contents[start..end].copy_from_slice(bytes);
    }

    /// Make every subsequent `get_region` fail.
    pub fn set_unavailable(&mut self, unavailable: bool) {
        self.unavailable = unavailable;
    }

    /// Number of regions handed out so far.
    #[must_use]
    pub const fn fetch_count(&self) -> usize {
        self.fetches
    }

    /// Address and length of every region handed out, in order.
    #[must_use]
    pub fn requests(&self) -> &[(FlashAddr, u32)] {
        &self.requests
    }

    /// Number of regions released so far.
    #[must_use]
    pub const fn release_count(&self) -> usize {
        self.releases
    }

    /// Number of regions currently mapped.
    #[must_use]
    pub fn mapped_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Slot index backing a region, if the region came from this store.
    fn slot_index(region: &FlashRegion) -> Option<usize> {
        let offset = region.data().diff(CACHE_PHYS_BASE);
        let index = (offset / FLASH_BLOCK_SIZE) as usize;
        (offset % FLASH_BLOCK_SIZE == 0 && index < SLOT_COUNT).then_some(index)
    }
}

impl FlashStore for MockFlash {
    fn get_region(&mut self, addr: FlashAddr, len: u32) -> Option<FlashRegion> {
        if self.unavailable || len > FLASH_BLOCK_SIZE {
            return None;
        }
        let index = self.slots.iter().position(Option::is_none)?;

        let start = addr.as_u32() as usize;
        let bytes: Vec<u8> = (start..start + len as usize)
            .map(|i| self.contents.get(i).copied().unwrap_or(ERASED))
            .collect();

        self.slots[index] = Some(Slot { base: addr, bytes });
        self.requests.push((addr, len));
        self.fetches += 1;

        let data = CACHE_PHYS_BASE.add(index as u32 * FLASH_BLOCK_SIZE);
        Some(FlashRegion::new(addr, len, data))
    }

    fn release_region(&mut self, region: FlashRegion) {
        let index = Self::slot_index(&region);
        assert!(
            index.is_some_and(|i| self.slots[i]
                .as_ref()
                .is_some_and(|slot| slot.base == region.base())),
            "release of unmapped region {region:?}"
        );
        if let Some(i) = index {
            self.slots[i] = None;
        }
        self.releases += 1;
    }

    fn region_data(&self, region: &FlashRegion) -> &[u8] {
        Self::slot_index(region)
            .and_then(|i| self.slots[i].as_ref())
            .map_or(&[], |slot| slot.bytes.as_slice())
    }
}

/// `SVC #imm8` is `0xDFxx` in the 16-bit instruction stream.
const SVC_OPCODE: u16 = 0xDF00;

/// `BKPT #0` stops the mock engine.
const BKPT_OPCODE: u16 = 0xBE00;

/// A register file with a minimal SVC-only engine.
///
/// Each call to [`Cpu::run`] fetches one halfword at PC through the bus:
/// `SVC #n` advances PC past the instruction and traps with `n`, `BKPT`
/// halts, anything else (or an unreadable PC) faults.
#[derive(Debug, Default)]
pub struct MockCpu {
    regs: [Word; Reg::COUNT],
    steps: usize,
}

impl MockCpu {
    /// Create a CPU with all registers cleared.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the register file.
    #[must_use]
    pub const fn regs(&self) -> &[Word; Reg::COUNT] {
        &self.regs
    }

    /// Number of instructions executed by [`Cpu::run`].
    #[must_use]
    pub const fn steps(&self) -> usize {
        self.steps
    }
}

impl Cpu for MockCpu {
    fn reg(&self, reg: Reg) -> Word {
        self.regs[reg.index()]
    }

    fn set_reg(&mut self, reg: Reg, value: Word) {
        self.regs[reg.index()] = value;
    }

    fn reset(&mut self) {
        self.regs = [0; Reg::COUNT];
    }

    fn run(&mut self, bus: &mut Bus<'_>) -> Trap {
        self.steps += 1;
        let pc = PhysAddr::new(self.reg(Reg::Pc));
        let Ok(instr) = bus.read_u16(pc) else {
            return Trap::Fault;
        };

        if instr & 0xFF00 == SVC_OPCODE {
            self.set_reg(Reg::Pc, pc.add(2).as_u32());
            Trap::Svc((instr & 0xFF) as u8)
        } else if instr == BKPT_OPCODE {
            Trap::Halt
        } else {
            Trap::Fault
        }
    }
}
