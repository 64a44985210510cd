// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! SVC dispatch.

use flashvm_abi::layout::FLASH_BLOCK_MASK;
use flashvm_abi::{PhysAddr, Reg, VirtAddr};
use tracing::{debug, trace, warn};

use super::{RunState, Runtime};
use crate::fault::Fault;
use crate::platform::{ContentValidator, Cpu, FlashStore};
use crate::svc::{IndirectOp, SvcOp};
use crate::syscall::{SyscallReturn, SyscallTable};

/// Address op 0 is an unconditional long branch.
const ADDR_OP_BRANCH: u8 = 0;

impl<C: Cpu, F: FlashStore, S: SyscallTable, V: ContentValidator> Runtime<C, F, S, V> {
    /// Execute a supervisor call. PC points past the SVC instruction.
    pub fn svc(&mut self, imm8: u8) -> Result<(), Fault> {
        let op = SvcOp::decode(imm8);
        trace!(imm8, ?op, pc = self.cpu.reg(Reg::Pc), "svc");

        match op {
            SvcOp::Indirect(index) => self.indirect(index),
            SvcOp::Syscall(number) => self.syscall(number),
            SvcOp::AdjustSp(words) => {
                let sp = self.cpu.reg(Reg::Sp).wrapping_sub(u32::from(words) * 4);
                let validated = self.validate(sp)?;
                self.cpu.set_reg(Reg::Sp, validated.read.as_u32());
                Ok(())
            }
            SvcOp::Validate(reg) => self.validate(self.cpu.reg(reg)).map(|_| ()),
            SvcOp::Reserved(imm8) => Err(Fault::ReservedSvc(imm8)),
            SvcOp::CallReg(reg) => {
                let target = self.validate(self.cpu.reg(reg))?;
                self.call(target.read)
            }
            SvcOp::TailCallReg(reg) => {
                let target = self.validate(self.cpu.reg(reg))?;
                self.jump(target.read);
                Ok(())
            }
        }
    }

    /// Execute the literal at word `index` of the SVC instruction's page.
    fn indirect(&mut self, index: u8) -> Result<(), Fault> {
        let instr = self.cpu.reg(Reg::Pc).wrapping_sub(2);
        let page = PhysAddr::new(instr & FLASH_BLOCK_MASK);
        let literal = self.space.bus().read_u32(page.add(u32::from(index) * 4))?;

        let op = IndirectOp::decode(literal).ok_or(Fault::UnknownLiteral(literal))?;
        trace!(literal, ?op, "indirect svc");

        match op {
            IndirectOp::Call(call) => {
                let target = self.validate(call.target.as_u32())?;
                self.call(target.read)?;
                self.reserve_stack(call.reserve);
            }
            IndirectOp::TailCall(call) => {
                let target = self.validate(call.target.as_u32())?;
                self.jump(target.read);
                self.reserve_stack(call.reserve);
            }
            IndirectOp::Syscall(syscall) => {
                if syscall.imm15 != 0 {
                    debug!(imm15 = syscall.imm15, "ignoring syscall immediate");
                }
                self.syscall(syscall.number)?;
            }
            IndirectOp::TailSyscall(syscall) => {
                self.syscall(syscall.number)?;
                if self.state == RunState::Running {
                    self.ret()?;
                }
            }
            IndirectOp::AddrOp { op, addr } => self.addr_op(op, addr)?,
        }
        Ok(())
    }

    /// Validate `addr` and apply address op `op` to it.
    fn addr_op(&mut self, op: u8, addr: VirtAddr) -> Result<(), Fault> {
        let target = self.validate(addr.as_u32())?;
        if op == ADDR_OP_BRANCH {
            self.jump(target.read);
        } else {
            warn!(op, %addr, "unimplemented address op");
        }
        Ok(())
    }

    /// Invoke a syscall with r0-r7 as arguments.
    fn syscall(&mut self, number: u16) -> Result<(), Fault> {
        let args = Reg::GENERAL.map(|reg| self.cpu.reg(reg));
        debug!(number, ?args, "syscall");

        match self.syscalls.invoke(number, args) {
            Some(SyscallReturn::Value(value)) => {
                self.cpu.set_reg(Reg::R0, value);
                Ok(())
            }
            Some(SyscallReturn::Exit) => {
                self.exit();
                Ok(())
            }
            None => Err(Fault::UnknownSyscall(number)),
        }
    }
}
