// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Program images and a runtime wired to mocks, shared by the runtime tests.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use flashvm_abi::layout::{VIRTUAL_FLASH_BASE, VIRTUAL_RAM_BASE};
use flashvm_abi::{FlashAddr, PhysAddr, VirtAddr, Word};

use super::{ProgramId, Runtime, RuntimeConfig};
use crate::elf::ElfBuilder;
use crate::platform::{MockCpu, MockFlash};
use crate::svc::encode_call;
use crate::syscall::{SyscallArgs, SyscallReturn, SyscallTable};

pub const RAM_BASE: PhysAddr = PhysAddr::new(0x2000_0000);
pub const RAM_SIZE: u32 = 0x1000;
pub const RAM_TOP: u32 = RAM_BASE.as_u32() + RAM_SIZE;

/// Where the first program image is programmed.
pub const IMAGE_BASE: FlashAddr = FlashAddr::new(0x400);

/// Text offset of the entry point; the literal pool sits below it.
pub const CODE: u32 = 0x20;

/// Size of the text segment built by [`text`].
pub const TEXT_LEN: usize = 0x400;

/// Initial contents of the rwdata segment.
pub const RWDATA: [u8; 16] = *b"flashvm rwdata!\0";

/// Virtual address of the rwdata segment.
pub const RWDATA_VADDR: u32 = VIRTUAL_RAM_BASE;

/// Virtual address and size of the bss segment.
pub const BSS_VADDR: u32 = VIRTUAL_RAM_BASE + 0x100;
pub const BSS_SIZE: u32 = 0x40;

/// Syscall number that exits.
pub const SYS_EXIT: u16 = 0;

/// Records every syscall. `0` exits, `1..100` return `number * 100`, the
/// rest are unknown.
#[derive(Debug, Default)]
pub struct Recorder {
    pub calls: Vec<(u16, SyscallArgs)>,
}

impl SyscallTable for Recorder {
    fn invoke(&mut self, number: u16, args: SyscallArgs) -> Option<SyscallReturn> {
        self.calls.push((number, args));
        match number {
            SYS_EXIT => Some(SyscallReturn::Exit),
            1..100 => Some(SyscallReturn::Value(u32::from(number) * 100)),
            _ => None,
        }
    }
}

pub type TestRuntime = Runtime<MockCpu, MockFlash, Recorder>;

/// Virtual flash address of text offset `offset`.
pub const fn vflash(offset: u32) -> VirtAddr {
    VirtAddr::new(VIRTUAL_FLASH_BASE + offset)
}

/// Text segment: `literals` from offset 0, `code` from [`CODE`], zero
/// filled up to [`TEXT_LEN`].
pub fn text(literals: &[Word], code: &[u16]) -> Vec<u8> {
    let mut bytes: Vec<u8> = literals.iter().flat_map(|w| w.to_le_bytes()).collect();
    assert!(bytes.len() <= CODE as usize, "literal pool overlaps code");
    bytes.resize(CODE as usize, 0);
    bytes.extend(code.iter().flat_map(|h| h.to_le_bytes()));
    bytes.resize(TEXT_LEN, 0);
    bytes
}

/// Image with the given entry word, text, the fixture rwdata and bss.
pub fn image_with_entry(entry: Word, text: &[u8]) -> Vec<u8> {
    ElfBuilder::new(entry)
        .text(VIRTUAL_FLASH_BASE, text)
        .rwdata(RWDATA_VADDR, &RWDATA, RWDATA.len() as u32)
        .bss(BSS_VADDR, BSS_SIZE)
        .build()
}

/// Image entering at [`CODE`], reserving `reserve_words` of stack.
pub fn image(text: &[u8], reserve_words: u32) -> Vec<u8> {
    image_with_entry(encode_call(vflash(CODE), reserve_words, false), text)
}

/// Runtime with `image` as program 0.
pub fn runtime(image: &[u8]) -> TestRuntime {
    let mut flash = MockFlash::new(IMAGE_BASE.as_u32() as usize);
    flash.program(IMAGE_BASE, image);

    let config = RuntimeConfig::new(RAM_BASE)
        .with_ram_size(RAM_SIZE)
        .with_program(IMAGE_BASE, image.len() as u32);
    Runtime::new(config, MockCpu::new(), flash, Recorder::default())
}

/// Runtime stopped right after entering the program.
pub fn started(literals: &[Word], code: &[u16]) -> TestRuntime {
    let mut rt = runtime(&image(&text(literals, code), 0));
    rt.load(ProgramId(0)).unwrap();
    rt.init_data().unwrap();
    rt.start().unwrap();
    rt
}

/// Physical address of the resident cache block.
pub fn block_base(rt: &TestRuntime) -> PhysAddr {
    rt.space().cache().block_base().unwrap()
}
