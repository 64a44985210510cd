// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! End-to-end tests: whole programs built as ELF images, stored in mock
//! flash and driven through the public runtime API.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use flashvm::elf::ElfBuilder;
use flashvm::layout::{VIRTUAL_FLASH_BASE, VIRTUAL_RAM_BASE};
use flashvm::platform::{MockCpu, MockFlash};
use flashvm::svc::{encode_addr_op, encode_call, encode_svc, encode_syscall};
use flashvm::syscall::{FnTable, SyscallArgs};
use flashvm::{
    Cpu, Fault, FlashAddr, PhysAddr, ProgramId, Reg, RunOutcome, RunState, Runtime, RuntimeConfig,
    SyscallReturn, VirtAddr, Word,
};
use tracing_subscriber::EnvFilter;

const RAM_BASE: PhysAddr = PhysAddr::new(0x2000_0000);
const FLASH_SLOT: FlashAddr = FlashAddr::new(0x1_0000);

const SYS_EXIT: u8 = 0;
const SYS_DOUBLE: u16 = 2;
const SYS_ANSWER: u8 = 3;

/// Log to the test output; `RUST_LOG=flashvm=trace` shows every SVC.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn sys_exit(_: &SyscallArgs) -> SyscallReturn {
    SyscallReturn::Exit
}

fn sys_double(args: &SyscallArgs) -> SyscallReturn {
    SyscallReturn::Value(args[0] * 2)
}

fn sys_answer(_: &SyscallArgs) -> SyscallReturn {
    SyscallReturn::Value(21)
}

fn syscalls() -> FnTable {
    FnTable::new()
        .with(u16::from(SYS_EXIT), sys_exit)
        .with(SYS_DOUBLE, sys_double)
        .with(u16::from(SYS_ANSWER), sys_answer)
}

/// Text segment under construction.
struct Text(Vec<u8>);

impl Text {
    fn new(len: usize) -> Self {
        Self(vec![0; len])
    }

    fn literal(mut self, offset: u32, literal: Word) -> Self {
        let at = offset as usize;
        self.0[at..at + 4].copy_from_slice(&literal.to_le_bytes());
        self
    }

    fn code(mut self, offset: u32, code: &[u16]) -> Self {
        for (i, half) in code.iter().enumerate() {
            let at = offset as usize + i * 2;
            self.0[at..at + 2].copy_from_slice(&half.to_le_bytes());
        }
        self
    }
}

fn vflash(offset: u32) -> VirtAddr {
    VirtAddr::new(VIRTUAL_FLASH_BASE + offset)
}

fn runtime(entry: u32, text: &Text) -> Runtime<MockCpu, MockFlash, FnTable> {
    init_tracing();

    let image = ElfBuilder::new(encode_call(vflash(entry), 4, false))
        .text(VIRTUAL_FLASH_BASE, &text.0)
        .rwdata(VIRTUAL_RAM_BASE, b"hello", 8)
        .bss(VIRTUAL_RAM_BASE + 0x10, 0x100)
        .build();

    let mut flash = MockFlash::new(0x2_0000);
    flash.program(FLASH_SLOT, &image);
    let config = RuntimeConfig::new(RAM_BASE).with_program(FLASH_SLOT, image.len() as u32);
    Runtime::new(config, MockCpu::new(), flash, syscalls())
}

#[test]
fn call_and_tail_syscall_return_to_caller() {
    let text = Text::new(0x200)
        .literal(4, encode_call(vflash(0x80), 0, false))
        .literal(8, encode_syscall(SYS_DOUBLE, true))
        .code(
            0x20,
            &[
                encode_svc(0x80 | SYS_ANSWER),
                encode_svc(1),
                encode_svc(0x80 | SYS_EXIT),
            ],
        )
        .code(0x80, &[encode_svc(2)]);
    let mut rt = runtime(0x20, &text);

    assert_eq!(rt.run(ProgramId(0)), RunOutcome::Exited);

    assert_eq!(rt.cpu().reg(Reg::R0), 42);
    assert_eq!(rt.cpu().steps(), 4);
    // Entry frame plus its four-word reserve
    let top = RAM_BASE.as_u32() + rt.space().ram().size();
    assert_eq!(rt.cpu().reg(Reg::Sp), top - 32 - 16);
    assert_eq!(rt.state(), RunState::Exited);
    assert_eq!(rt.space().cache().store().mapped_count(), 0);
}

#[test]
fn long_branch_into_another_block() {
    let text = Text::new(0x400)
        .literal(0, encode_addr_op(0, vflash(0x300)))
        .code(0x20, &[encode_svc(0)])
        .code(0x300, &[encode_svc(0x80 | SYS_EXIT)]);
    let mut rt = runtime(0x20, &text);

    assert!(rt.run(ProgramId(0)).is_exited());

    let store = rt.space().cache().store();
    // Header, rwdata, entry block, branch target block
    assert_eq!(store.fetch_count(), 4);
    assert_eq!(store.release_count(), 4);
}

#[test]
fn rwdata_and_bss_are_initialised() {
    let text = Text::new(0x100).code(0x20, &[encode_svc(0x80 | SYS_EXIT)]);
    let mut rt = runtime(0x20, &text);

    assert!(rt.run(ProgramId(0)).is_exited());

    let ram = rt.space().ram().raw_memory();
    assert_eq!(&ram[..5], b"hello");
    assert!(ram[5..0x110].iter().all(|b| *b == 0));
}

#[test]
fn undecodable_literal_stops_program() {
    let text = Text::new(0x100)
        .literal(0, 0x0000_0003)
        .code(0x20, &[encode_svc(0x80 | SYS_ANSWER), encode_svc(0)]);
    let mut rt = runtime(0x20, &text);

    assert_eq!(
        rt.run(ProgramId(0)),
        RunOutcome::Faulted(Fault::UnknownLiteral(3))
    );
    assert_eq!(rt.cpu().reg(Reg::R0), 21);
    assert_eq!(rt.state(), RunState::Exited);
}

#[test]
fn missing_program_slot() {
    let text = Text::new(0x100);
    let mut rt = runtime(0x20, &text);

    assert!(matches!(
        rt.run(ProgramId(1)),
        RunOutcome::NotLoaded(_)
    ));
    assert_eq!(rt.state(), RunState::Idle);
}
