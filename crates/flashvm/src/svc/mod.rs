// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Supervisor-call decoding.
//!
//! `SVC #imm8` is the only way interpreted code reaches the runtime. The
//! immediate is decoded as:
//!
//! ```text
//! 0iiiiiii   indirect: literal at word i of the instruction's flash page
//! 10nnnnnn   direct syscall n (0-63)
//! 110iiiii   SP = validate(SP - i*4)
//! 11100rrr   validate rN, publish read/write addresses in r8/r9
//! 11101rrr   reserved
//! 11110rrr   call rN
//! 11111rrr   tail call rN
//! ```
//!
//! Indirect literals are 32-bit words, matched against an ordered pattern
//! table (see [`IndirectOp::decode`]):
//!
//! ```text
//! 0nnnnnnn aaaaaaaa aaaaaaaa aaaaaa00   call      VFB + a*4, reserve n words
//! 0nnnnnnn aaaaaaaa aaaaaaaa aaaaaa01   tail call
//! 10ssssss ssssssss iiiiiiii iiiiiii0   syscall s
//! 10ssssss ssssssss iiiiiiii iiiiiii1   tail syscall s
//! 110ooooo aaaaaaaa aaaaaaaa aaaaaaaa   address op o on VRB + a
//! 111ooooo aaaaaaaa aaaaaaaa aaaaaaaa   address op o on VFB + a
//! ```
//!
//! `0...1x` literals are reserved and fail to decode. This module only
//! decodes; dispatch lives in the runtime.


use flashvm_abi::layout::{VIRTUAL_FLASH_BASE, VIRTUAL_RAM_BASE};
use flashvm_abi::{Reg, VirtAddr, Word};

// SVC immediate fields
const INDIRECT_BIT: u8 = 0x80;
const INDIRECT_MASK: u8 = 0x7F;
const SYSCALL_PREFIX_MASK: u8 = 0xC0;
const SYSCALL_PREFIX: u8 = 0x80;
const SYSCALL_MASK: u8 = 0x3F;
const ADJUST_PREFIX_MASK: u8 = 0xE0;
const ADJUST_PREFIX: u8 = 0xC0;
const ADJUST_MASK: u8 = 0x1F;
const SUBCODE_SHIFT: u32 = 3;
const SUBCODE_MASK: u8 = 0x03;
const REG_MASK: u8 = 0x07;

// Literal fields
const CALL_ADDR_SHIFT: u32 = 2;
const CALL_ADDR_MASK: u32 = 0x3F_FFFF;
const CALL_RESERVE_SHIFT: u32 = 24;
const CALL_RESERVE_MASK: u32 = 0x7F;
const SYSCALL_NUM_SHIFT: u32 = 16;
const SYSCALL_NUM_MASK: u32 = 0x3FFF;
const SYSCALL_IMM_SHIFT: u32 = 1;
const SYSCALL_IMM_MASK: u32 = 0x7FFF;
const ADDR_OP_SHIFT: u32 = 24;
const ADDR_OP_MASK: u32 = 0x1F;
const ADDR_OFFSET_MASK: u32 = 0xFF_FFFF;
const TAIL_BIT: u32 = 0x1;

/// A decoded SVC immediate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SvcOp {
    /// Execute the literal at this word index of the instruction's page.
    Indirect(u8),
    /// Direct syscall `0..64`.
    Syscall(u16),
    /// Lower SP by this many words, then validate it.
    AdjustSp(u8),
    /// Validate a register and publish the result.
    Validate(Reg),
    /// Reserved encoding, carrying the raw immediate.
    Reserved(u8),
    /// Call the address in a register.
    CallReg(Reg),
    /// Tail call the address in a register.
    TailCallReg(Reg),
}

impl SvcOp {
    /// Decode an 8-bit SVC immediate. Every immediate decodes to something.
    #[must_use]
    pub const fn decode(imm8: u8) -> Self {
        if imm8 & INDIRECT_BIT == 0 {
            return Self::Indirect(imm8 & INDIRECT_MASK);
        }
        if imm8 & SYSCALL_PREFIX_MASK == SYSCALL_PREFIX {
            return Self::Syscall((imm8 & SYSCALL_MASK) as u16);
        }
        if imm8 & ADJUST_PREFIX_MASK == ADJUST_PREFIX {
            return Self::AdjustSp(imm8 & ADJUST_MASK);
        }

        let reg = Reg::general(imm8 & REG_MASK);
        match (imm8 >> SUBCODE_SHIFT) & SUBCODE_MASK {
            0 => Self::Validate(reg),
            1 => Self::Reserved(imm8),
            2 => Self::CallReg(reg),
            _ => Self::TailCallReg(reg),
        }
    }
}

/// Target and stack reserve of a literal-encoded call.
///
/// The same encoding is used for a program's entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallTarget {
    /// Virtual flash address to call.
    pub target: VirtAddr,
    /// Bytes to reserve on the stack after the call.
    pub reserve: u32,
}

impl CallTarget {
    /// Extract the call fields of a literal.
    #[must_use]
    pub const fn from_literal(literal: Word) -> Self {
        let words = (literal >> CALL_ADDR_SHIFT) & CALL_ADDR_MASK;
        let reserve = (literal >> CALL_RESERVE_SHIFT) & CALL_RESERVE_MASK;
        Self {
            target: VirtAddr::new(VIRTUAL_FLASH_BASE + words * 4),
            reserve: reserve * 4,
        }
    }
}

/// Number and immediate of a literal-encoded syscall.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyscallLiteral {
    /// Syscall table index.
    pub number: u16,
    /// 15-bit immediate. Carried but not interpreted by any syscall.
    pub imm15: u16,
}

impl SyscallLiteral {
    const fn from_literal(literal: Word) -> Self {
        Self {
            number: ((literal >> SYSCALL_NUM_SHIFT) & SYSCALL_NUM_MASK) as u16,
            imm15: ((literal >> SYSCALL_IMM_SHIFT) & SYSCALL_IMM_MASK) as u16,
        }
    }
}

/// A decoded indirect SVC literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndirectOp {
    Call(CallTarget),
    TailCall(CallTarget),
    Syscall(SyscallLiteral),
    TailSyscall(SyscallLiteral),
    /// Address operation `op` on an embedded virtual address.
    AddrOp { op: u8, addr: VirtAddr },
}

/// Literal classes, in match priority order.
#[derive(Clone, Copy)]
enum Kind {
    Call,
    TailCall,
    Syscall,
    TailSyscall,
    RamAddrOp,
    FlashAddrOp,
}

/// `(mask, expected, kind)`; the first entry with `literal & mask == expected`
/// wins.
const PATTERNS: [(Word, Word, Kind); 6] = [
    (0x8000_0003, 0x0000_0000, Kind::Call),
    (0x8000_0003, 0x0000_0001, Kind::TailCall),
    (0xC000_0001, 0x8000_0000, Kind::Syscall),
    (0xC000_0001, 0x8000_0001, Kind::TailSyscall),
    (0xE000_0000, 0xC000_0000, Kind::RamAddrOp),
    (0xE000_0000, 0xE000_0000, Kind::FlashAddrOp),
];

impl IndirectOp {
    /// Decode a literal, or `None` if it matches no pattern.
    #[must_use]
    pub fn decode(literal: Word) -> Option<Self> {
        let (_, _, kind) = PATTERNS
            .iter()
            .find(|(mask, expected, _)| literal & mask == *expected)?;

        let op = match kind {
            Kind::Call => Self::Call(CallTarget::from_literal(literal)),
            Kind::TailCall => Self::TailCall(CallTarget::from_literal(literal)),
            Kind::Syscall => Self::Syscall(SyscallLiteral::from_literal(literal)),
            Kind::TailSyscall => Self::TailSyscall(SyscallLiteral::from_literal(literal)),
            Kind::RamAddrOp => Self::addr_op(literal, VIRTUAL_RAM_BASE),
            Kind::FlashAddrOp => Self::addr_op(literal, VIRTUAL_FLASH_BASE),
        };
        Some(op)
    }

    const fn addr_op(literal: Word, base: u32) -> Self {
        Self::AddrOp {
            op: ((literal >> ADDR_OP_SHIFT) & ADDR_OP_MASK) as u8,
            addr: VirtAddr::new(base + (literal & ADDR_OFFSET_MASK)),
        }
    }
}

/// Encode a literal call to the virtual flash address `target`.
///
/// `target` must be word-aligned and inside virtual flash; `reserve_words`
/// is truncated to seven bits.
#[must_use]
pub const fn encode_call(target: VirtAddr, reserve_words: u32, tail: bool) -> Word {
    let words = (target.flash_offset() / 4) & CALL_ADDR_MASK;
    ((reserve_words & CALL_RESERVE_MASK) << CALL_RESERVE_SHIFT)
        | (words << CALL_ADDR_SHIFT)
        | if tail { TAIL_BIT } else { 0 }
}

/// Encode a literal syscall.
#[must_use]
pub const fn encode_syscall(number: u16, tail: bool) -> Word {
    0x8000_0000
        | ((number as u32 & SYSCALL_NUM_MASK) << SYSCALL_NUM_SHIFT)
        | if tail { TAIL_BIT } else { 0 }
}

/// Encode an address op on a virtual RAM or flash address.
///
/// Only the low 24 bits of the address's segment offset are kept.
#[must_use]
pub const fn encode_addr_op(op: u8, addr: VirtAddr) -> Word {
    let (prefix, offset) = if addr.is_flash() {
        (0xE000_0000, addr.flash_offset())
    } else {
        (0xC000_0000, addr.as_u32().wrapping_sub(VIRTUAL_RAM_BASE))
    };
    prefix | ((op as u32 & ADDR_OP_MASK) << ADDR_OP_SHIFT) | (offset & ADDR_OFFSET_MASK)
}

/// The 16-bit `SVC #imm8` instruction.
#[must_use]
pub const fn encode_svc(imm8: u8) -> u16 {
    0xDF00 | imm8 as u16
}
