// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! ELF image builder for tests and host tooling.

use alloc::vec;
use alloc::vec::Vec;

use flashvm_abi::Word;

use super::{
    ELF_MAGIC, ELF32_HEADER_SIZE, ELF32_PHDR_SIZE, ELFCLASS32, EM_ARM, EV_CURRENT, PF_R, PF_W,
    PF_X, PT_LOAD, native_encoding,
};

/// A segment queued for the image.
struct PendingSegment {
    seg_type: u32,
    flags: u32,
    vaddr: u32,
    data: Vec<u8>,
    mem_size: u32,
}

/// Assembles a 32-bit ELF image in native byte order.
///
/// The program-header table directly follows the file header; segment data
/// follows the table, each segment 4-byte aligned.
pub struct ElfBuilder {
    entry: Word,
    machine: u16,
    segments: Vec<PendingSegment>,
}

impl ElfBuilder {
    /// Start an image with the given entry word.
    #[must_use]
    pub const fn new(entry: Word) -> Self {
        Self {
            entry,
            machine: EM_ARM,
            segments: Vec::new(),
        }
    }

    /// Override the machine type.
    #[must_use]
    pub fn machine(mut self, machine: u16) -> Self {
        self.machine = machine;
        self
    }

    /// Add a `PT_LOAD` segment.
    #[must_use]
    pub fn segment(mut self, flags: u32, vaddr: u32, data: &[u8], mem_size: u32) -> Self {
        self.segments.push(PendingSegment {
            seg_type: PT_LOAD,
            flags,
            vaddr,
            data: data.to_vec(),
            mem_size,
        });
        self
    }

    /// Add a non-loadable program header.
    #[must_use]
    pub fn note(mut self, seg_type: u32, data: &[u8]) -> Self {
        self.segments.push(PendingSegment {
            seg_type,
            flags: PF_R,
            vaddr: 0,
            data: data.to_vec(),
            mem_size: data.len() as u32,
        });
        self
    }

    /// Add an executable, read-only segment.
    #[must_use]
    pub fn text(self, vaddr: u32, code: &[u8]) -> Self {
        let len = code.len() as u32;
        self.segment(PF_R | PF_X, vaddr, code, len)
    }

    /// Add an initialized read/write segment.
    #[must_use]
    pub fn rwdata(self, vaddr: u32, data: &[u8], mem_size: u32) -> Self {
        self.segment(PF_R | PF_W, vaddr, data, mem_size)
    }

    /// Add a zero-initialized read/write segment.
    #[must_use]
    pub fn bss(self, vaddr: u32, mem_size: u32) -> Self {
        self.segment(PF_R | PF_W, vaddr, &[], mem_size)
    }

    /// Produce the image bytes.
    #[must_use]
    pub fn build(&self) -> Vec<u8> {
        let phoff = ELF32_HEADER_SIZE;
        let table_end = phoff + self.segments.len() * ELF32_PHDR_SIZE;
        let mut image = vec![0u8; table_end];

        image[0..4].copy_from_slice(&ELF_MAGIC);
        image[4] = ELFCLASS32;
        image[5] = native_encoding();
        image[6] = EV_CURRENT;
        put_u16(&mut image, 16, 2); // ET_EXEC
        put_u16(&mut image, 18, self.machine);
        put_u32(&mut image, 20, u32::from(EV_CURRENT));
        put_u32(&mut image, 24, self.entry);
        put_u32(&mut image, 28, phoff as u32);
        put_u16(&mut image, 40, ELF32_HEADER_SIZE as u16);
        put_u16(&mut image, 42, ELF32_PHDR_SIZE as u16);
        put_u16(&mut image, 44, self.segments.len() as u16);

        for (index, seg) in self.segments.iter().enumerate() {
            image.resize(image.len().next_multiple_of(4), 0);
            let offset = image.len() as u32;
            image.extend_from_slice(&seg.data);

            let at = phoff + index * ELF32_PHDR_SIZE;
            put_u32(&mut image, at, seg.seg_type);
            put_u32(&mut image, at + 4, offset);
            put_u32(&mut image, at + 8, seg.vaddr);
            put_u32(&mut image, at + 12, seg.vaddr);
            put_u32(&mut image, at + 16, seg.data.len() as u32);
            put_u32(&mut image, at + 20, seg.mem_size);
            put_u32(&mut image, at + 24, seg.flags);
            put_u32(&mut image, at + 28, 4);
        }

        image
    }
}

fn put_u16(buf: &mut [u8], offset: usize, value: u16) {
    buf[offset..offset + 2].copy_from_slice(&value.to_ne_bytes());
}

fn put_u32(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_ne_bytes());
}
