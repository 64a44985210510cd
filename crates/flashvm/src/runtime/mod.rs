// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! The runtime driver.
//!
//! A [`Runtime`] owns everything a running program touches: the RAM window,
//! the flash cache, the loaded program's description and the collaborators.
//! There is exactly one program at a time and no reentrancy; the driver
//! hands control to the CPU engine and services whatever trap it returns
//! until the program exits or faults.
//!
//! Starting a program:
//! 1. resolve the [`ProgramId`] to a flash slot and load its ELF header,
//! 2. clear RAM and copy the rwdata segment out of flash (bss stays zero),
//! 3. point SP and FP at the top of RAM,
//! 4. validate the entry point, call it and reserve its stack.

#[cfg(test)]
mod fixture;

mod dispatch;

use alloc::vec::Vec;

use flashvm_abi::layout::{DEFAULT_RAM_SIZE, FLASH_BLOCK_MASK, FLASH_BLOCK_SIZE};
use flashvm_abi::{FlashAddr, PhysAddr, Reg, Word};
use tracing::{debug, error, info};

use crate::elf::{self, LoadError, ProgramInfo};
use crate::fault::Fault;
use crate::flash::{ErasedFlashValidator, FlashCache, FlashMapping};
use crate::frame;
use crate::memory::UserRam;
use crate::platform::{ContentValidator, Cpu, FlashStore, Trap};
use crate::space::{AddressSpace, Validated};
use crate::svc::CallTarget;
use crate::syscall::SyscallTable;

/// Index into the configured program slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramId(pub u16);

/// Where a program image lives in flash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramSlot {
    /// Flash address of the image.
    pub base: FlashAddr,
    /// Upper bound on the image size.
    pub max_len: u32,
}

/// Runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Physical address of the RAM window.
    pub ram_base: PhysAddr,
    /// Size of the RAM window in bytes.
    pub ram_size: u32,
    /// Program slots, indexed by [`ProgramId`].
    pub programs: Vec<ProgramSlot>,
}

impl RuntimeConfig {
    /// A configuration with the default RAM size and no programs.
    #[must_use]
    pub const fn new(ram_base: PhysAddr) -> Self {
        Self {
            ram_base,
            ram_size: DEFAULT_RAM_SIZE,
            programs: Vec::new(),
        }
    }

    /// Set the RAM window size.
    #[must_use]
    pub fn with_ram_size(mut self, ram_size: u32) -> Self {
        self.ram_size = ram_size;
        self
    }

    /// Add a program slot. Slots are numbered in the order they are added.
    #[must_use]
    pub fn with_program(mut self, base: FlashAddr, max_len: u32) -> Self {
        self.programs.push(ProgramSlot { base, max_len });
        self
    }
}

/// Execution state of the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Nothing started yet.
    Idle,
    /// A program is executing.
    Running,
    /// The program exited or was stopped by a fault.
    Exited,
}

/// How [`Runtime::run`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The program could not be loaded; nothing was started.
    NotLoaded(LoadError),
    /// The program exited.
    Exited,
    /// Execution stopped at a fatal fault.
    Faulted(Fault),
}

impl RunOutcome {
    /// Returns true if the program ran to its exit.
    #[must_use]
    pub const fn is_exited(&self) -> bool {
        matches!(self, Self::Exited)
    }
}

/// The execution core.
///
/// `C` is the CPU engine, `F` the flash store, `S` the syscall table and `V`
/// the flash content validator.
pub struct Runtime<C, F, S, V = ErasedFlashValidator> {
    cpu: C,
    space: AddressSpace<F, V>,
    syscalls: S,
    programs: Vec<ProgramSlot>,
    program: Option<ProgramInfo>,
    state: RunState,
}

impl<C: Cpu, F: FlashStore, S: SyscallTable> Runtime<C, F, S> {
    /// Create a runtime validating flash content as erased-then-programmed.
    pub fn new(config: RuntimeConfig, cpu: C, flash: F, syscalls: S) -> Self {
        Self::with_validator(config, cpu, flash, syscalls, ErasedFlashValidator)
    }
}

impl<C: Cpu, F: FlashStore, S: SyscallTable, V: ContentValidator> Runtime<C, F, S, V> {
    /// Create a runtime with a custom content validator.
    pub fn with_validator(config: RuntimeConfig, cpu: C, flash: F, syscalls: S, validator: V) -> Self {
        let ram = UserRam::new(config.ram_base, config.ram_size);
        Self {
            cpu,
            space: AddressSpace::new(FlashCache::new(flash, validator), ram),
            syscalls,
            programs: config.programs,
            program: None,
            state: RunState::Idle,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// The CPU engine.
    pub const fn cpu(&self) -> &C {
        &self.cpu
    }

    /// Mutable access to the CPU engine.
    pub fn cpu_mut(&mut self) -> &mut C {
        &mut self.cpu
    }

    /// The VM's memory.
    pub const fn space(&self) -> &AddressSpace<F, V> {
        &self.space
    }

    /// Mutable access to the VM's memory.
    pub fn space_mut(&mut self) -> &mut AddressSpace<F, V> {
        &mut self.space
    }

    /// The syscall table.
    pub const fn syscalls(&self) -> &S {
        &self.syscalls
    }

    /// The loaded program, if any.
    pub const fn program(&self) -> Option<&ProgramInfo> {
        self.program.as_ref()
    }

    /// Current execution state.
    pub const fn state(&self) -> RunState {
        self.state
    }

    // =========================================================================
    // Program lifecycle
    // =========================================================================

    /// Load and execute a program until it exits or faults.
    pub fn run(&mut self, id: ProgramId) -> RunOutcome {
        if let Err(err) = self.load(id) {
            error!(program = id.0, %err, "failed to load program");
            return RunOutcome::NotLoaded(err);
        }

        if let Err(fault) = self.init_data().and_then(|()| self.start()) {
            return self.abort(fault);
        }
        self.execute()
    }

    /// Load a program's header and point the flash cache at its text.
    ///
    /// On failure the previously loaded program, if any, stays in place.
    pub fn load(&mut self, id: ProgramId) -> Result<(), LoadError> {
        let slot = *self
            .programs
            .get(usize::from(id.0))
            .ok_or(LoadError::RegionUnavailable)?;

        let info = elf::load(self.space.cache_mut().store_mut(), slot.base, slot.max_len)?;

        self.space.cache_mut().set_mapping(FlashMapping {
            image_base: slot.base,
            text_start: info.text_start(),
        });
        info!(
            program = id.0,
            entry = info.entry,
            text_start = info.text_start(),
            "program loaded"
        );
        self.program = Some(info);
        Ok(())
    }

    /// Clear RAM and copy the loaded program's rwdata into it.
    pub fn init_data(&mut self) -> Result<(), Fault> {
        let info = self.program.ok_or(Fault::NotLoaded)?;
        self.space.ram_mut().clear();

        let Some(rwdata) = info.rwdata else {
            return Ok(());
        };
        let image_base = self.space.cache().mapping().image_base;
        let mut buf = [0u8; FLASH_BLOCK_SIZE as usize];

        // The store maps whole aligned blocks; copy the covered slice of each
        let mut copied = 0;
        while copied < rwdata.file_size {
            let src = image_base.add(rwdata.start + copied);
            let block = FlashAddr::new(src.as_u32() & FLASH_BLOCK_MASK);
            let skip = src.diff(block);
            let len = (rwdata.file_size - copied).min(FLASH_BLOCK_SIZE - skip);

            let store = self.space.cache_mut().store_mut();
            let region = store
                .get_region(block, FLASH_BLOCK_SIZE)
                .ok_or(Fault::FlashUnavailable(block))?;
            let data = store.region_data(&region);
            let bytes = data.get(skip as usize..).unwrap_or(&[]);
            let n = bytes.len().min(len as usize);
            buf[..n].copy_from_slice(&bytes[..n]);
            store.release_region(region);

            let dst = self.space.virt_to_phys_ram(rwdata.vaddr.add(copied));
            self.space.ram_mut().write_bytes(dst, &buf[..n])?;
            copied += len;
        }

        debug!(vaddr = %rwdata.vaddr, bytes = rwdata.file_size, "initialized rwdata");
        Ok(())
    }

    /// Set up the stack and call the loaded program's entry point.
    pub fn start(&mut self) -> Result<(), Fault> {
        let info = self.program.ok_or(Fault::NotLoaded)?;

        self.cpu.reset();
        let top = self.space.ram().top().as_u32();
        self.cpu.set_reg(Reg::Sp, top);
        self.cpu.set_reg(Reg::Fp, top);

        let entry = CallTarget::from_literal(info.entry);
        let target = self.validate(entry.target.as_u32())?;
        self.call(target.read)?;
        self.reserve_stack(entry.reserve);

        self.state = RunState::Running;
        Ok(())
    }

    /// Run the CPU engine and service its traps until the program stops.
    pub fn execute(&mut self) -> RunOutcome {
        if self.state != RunState::Running {
            return self.abort(Fault::NotLoaded);
        }

        while self.state == RunState::Running {
            let trap = self.cpu.run(&mut self.space.bus());
            if let Err(fault) = self.service(trap) {
                return self.abort(fault);
            }
        }
        RunOutcome::Exited
    }

    /// Terminate the running program.
    pub fn exit(&mut self) {
        if self.state == RunState::Running {
            info!(r0 = self.cpu.reg(Reg::R0), "program exited");
        }
        self.state = RunState::Exited;
        self.space.cache_mut().release();
    }

    /// Stop at a fault.
    fn abort(&mut self, fault: Fault) -> RunOutcome {
        error!(%fault, pc = self.cpu.reg(Reg::Pc), "execution stopped");
        self.state = RunState::Exited;
        self.space.cache_mut().release();
        RunOutcome::Faulted(fault)
    }

    /// Handle one trap from the CPU engine.
    fn service(&mut self, trap: Trap) -> Result<(), Fault> {
        match trap {
            Trap::Svc(imm8) => self.svc(imm8),
            Trap::Halt => {
                debug!("engine halted");
                self.exit();
                Ok(())
            }
            Trap::Fault => Err(Fault::CpuFault(PhysAddr::new(self.cpu.reg(Reg::Pc)))),
        }
    }

    // =========================================================================
    // Primitives
    // =========================================================================

    /// Validate an address and publish the result in r8 (read) and r9 (write).
    pub fn validate(&mut self, addr: Word) -> Result<Validated, Fault> {
        let validated = self.space.validate(addr)?;
        self.cpu.set_reg(Reg::R8, validated.read.as_u32());
        self.cpu.set_reg(Reg::R9, validated.write_word());
        Ok(validated)
    }

    /// Call a validated physical address.
    pub fn call(&mut self, target: PhysAddr) -> Result<(), Fault> {
        frame::call(&mut self.cpu, self.space.ram_mut(), target)
    }

    /// Return from the current call.
    pub fn ret(&mut self) -> Result<(), Fault> {
        frame::ret(&mut self.cpu, self.space.ram())
    }

    /// Jump to a validated physical address without linking.
    fn jump(&mut self, target: PhysAddr) {
        self.cpu.set_reg(Reg::Pc, target.as_u32());
    }

    /// Lower SP by `bytes`.
    fn reserve_stack(&mut self, bytes: u32) {
        if bytes > 0 {
            self.cpu.adjust_sp(-(bytes as i32));
        }
    }
}
