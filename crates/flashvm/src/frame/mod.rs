// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Call linkage.
//!
//! A call saves the caller's r2-r7, FP and SP in a fixed-size frame just
//! below the current stack pointer, then links and jumps:
//!
//! ```text
//!   SP before call ->  +----------------+
//!                      |  sp (caller)   |  +28
//!                      |  fp            |  +24
//!                      |  r2            |  +20
//!                      |  ...           |
//!   SP after call  ->  |  r7            |  +0
//!                      +----------------+
//! ```
//!
//! There is no stack overflow check here: the frame is written wherever SP
//! points, as long as that is inside the RAM window.

#[cfg(test)]
mod frame_test;

use flashvm_abi::layout::{FRAME_REG_COUNT, FRAME_SIZE};
use flashvm_abi::{PhysAddr, Reg, Word};
use tracing::debug;

use crate::fault::Fault;
use crate::memory::UserRam;
use crate::platform::Cpu;

/// Caller-saved registers captured by a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StackFrame {
    pub r7: Word,
    pub r6: Word,
    pub r5: Word,
    pub r4: Word,
    pub r3: Word,
    pub r2: Word,
    pub fp: Word,
    pub sp: Word,
}

impl StackFrame {
    /// Capture the frame registers from the CPU.
    pub fn capture<C: Cpu>(cpu: &C) -> Self {
        Self {
            r7: cpu.reg(Reg::R7),
            r6: cpu.reg(Reg::R6),
            r5: cpu.reg(Reg::R5),
            r4: cpu.reg(Reg::R4),
            r3: cpu.reg(Reg::R3),
            r2: cpu.reg(Reg::R2),
            fp: cpu.reg(Reg::Fp),
            sp: cpu.reg(Reg::Sp),
        }
    }

    /// Write the saved registers back to the CPU, SP included.
    pub fn restore<C: Cpu>(&self, cpu: &mut C) {
        cpu.set_reg(Reg::R7, self.r7);
        cpu.set_reg(Reg::R6, self.r6);
        cpu.set_reg(Reg::R5, self.r5);
        cpu.set_reg(Reg::R4, self.r4);
        cpu.set_reg(Reg::R3, self.r3);
        cpu.set_reg(Reg::R2, self.r2);
        cpu.set_reg(Reg::Fp, self.fp);
        cpu.set_reg(Reg::Sp, self.sp);
    }

    /// Frame contents in stack order, lowest address first.
    #[must_use]
    pub const fn to_words(&self) -> [Word; FRAME_REG_COUNT] {
        [
            self.r7, self.r6, self.r5, self.r4, self.r3, self.r2, self.fp, self.sp,
        ]
    }

    /// Rebuild a frame from its stack words.
    #[must_use]
    pub const fn from_words(words: [Word; FRAME_REG_COUNT]) -> Self {
        let [r7, r6, r5, r4, r3, r2, fp, sp] = words;
        Self {
            r7,
            r6,
            r5,
            r4,
            r3,
            r2,
            fp,
            sp,
        }
    }

    /// Push the frame below SP and move SP down by the frame size.
    ///
    /// On failure nothing is written and SP is unchanged.
    pub fn push<C: Cpu>(&self, cpu: &mut C, ram: &mut UserRam) -> Result<(), Fault> {
        let base = PhysAddr::new(cpu.reg(Reg::Sp)).sub(FRAME_SIZE);

        let mut bytes = [0u8; FRAME_SIZE as usize];
        for (chunk, word) in bytes.chunks_exact_mut(4).zip(self.to_words()) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        ram.write_bytes(base, &bytes)?;

        cpu.adjust_sp(-(FRAME_SIZE as i32));
        Ok(())
    }

    /// Pop the frame at SP, moving SP up by the frame size.
    pub fn pop<C: Cpu>(cpu: &mut C, ram: &UserRam) -> Result<Self, Fault> {
        let base = PhysAddr::new(cpu.reg(Reg::Sp));

        let mut words = [0; FRAME_REG_COUNT];
        for (i, word) in words.iter_mut().enumerate() {
            *word = ram.read_u32(base.add(i as u32 * 4))?;
        }

        cpu.adjust_sp(FRAME_SIZE as i32);
        Ok(Self::from_words(words))
    }
}

/// Call an already validated address.
///
/// Pushes the caller's frame, sets LR to the current PC and PC to `target`.
pub fn call<C: Cpu>(cpu: &mut C, ram: &mut UserRam, target: PhysAddr) -> Result<(), Fault> {
    StackFrame::capture(cpu).push(cpu, ram)?;

    let pc = cpu.reg(Reg::Pc);
    cpu.set_reg(Reg::Lr, pc);
    cpu.set_reg(Reg::Pc, target.as_u32());

    debug!(%target, lr = pc, sp = cpu.reg(Reg::Sp), "call");
    Ok(())
}

/// Return to the caller.
///
/// Expects SP to point at the frame pushed by [`call`], i.e. the callee has
/// released any stack it reserved. Restores the caller's registers and sets
/// PC to LR.
pub fn ret<C: Cpu>(cpu: &mut C, ram: &UserRam) -> Result<(), Fault> {
    let frame = StackFrame::pop(cpu, ram)?;
    frame.restore(cpu);

    let lr = cpu.reg(Reg::Lr);
    cpu.set_reg(Reg::Pc, lr);

    debug!(pc = lr, sp = frame.sp, "return");
    Ok(())
}
