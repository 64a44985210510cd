// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Minimal ELF32 loader for program images in flash.
//!
//! This module parses just enough of an ELF image to find the program's
//! segments before execution. It reads only the first flash block of the
//! image, which must hold the file header and the whole program-header
//! table. It does not support:
//! - Relocations (programs are statically addressed)
//! - Section headers (only program headers)
//! - 64-bit ELF
//!
//! Three `PT_LOAD` profiles are recognized:
//! - text/rodata: executable and read-only
//! - rwdata: read/write with a non-zero size in the file
//! - bss: read/write, zero size in the file, non-zero size in memory
//!
//! Other segments are ignored, and any of the three may be absent.


#[cfg(any(test, feature = "std"))]
mod builder;

#[cfg(any(test, feature = "std"))]
pub use builder::ElfBuilder;

use core::fmt;

use flashvm_abi::layout::FLASH_BLOCK_SIZE;
use flashvm_abi::{FlashAddr, VirtAddr, Word};
use tracing::{debug, trace};

use crate::platform::FlashStore;

// =============================================================================
// Constants
// =============================================================================

/// ELF magic bytes.
pub const ELF_MAGIC: [u8; 4] = [0x7F, b'E', b'L', b'F'];

/// ELF class: 32-bit.
pub const ELFCLASS32: u8 = 1;

/// ELF data encoding: little-endian.
pub const ELFDATA2LSB: u8 = 1;

/// ELF data encoding: big-endian.
pub const ELFDATA2MSB: u8 = 2;

/// Current ELF version.
pub const EV_CURRENT: u8 = 1;

/// Machine type: ARM.
pub const EM_ARM: u16 = 40;

/// Program header type: loadable segment.
pub const PT_LOAD: u32 = 1;

/// Segment flag: executable.
pub const PF_X: u32 = 1;

/// Segment flag: writable.
pub const PF_W: u32 = 2;

/// Segment flag: readable.
pub const PF_R: u32 = 4;

/// ELF header size for 32-bit.
pub const ELF32_HEADER_SIZE: usize = 52;

/// Program header size for 32-bit.
pub const ELF32_PHDR_SIZE: usize = 32;

// Identification byte offsets
const EI_CLASS: usize = 4;
const EI_DATA: usize = 5;
const EI_VERSION: usize = 6;

/// ELF data encoding of the machine we run on.
///
/// Encodes the integer 1 in native order and looks at which end the
/// low-order byte landed.
#[must_use]
pub const fn native_encoding() -> u8 {
    if 1u32.to_ne_bytes()[0] == 1 {
        ELFDATA2LSB
    } else {
        ELFDATA2MSB
    }
}

// =============================================================================
// ELF Structures
// =============================================================================

/// The fields of the ELF32 file header the loader needs.
#[derive(Clone, Copy, Debug)]
struct Elf32Header {
    /// Target architecture.
    machine: u16,
    /// Entry point.
    entry: u32,
    /// Program header table offset.
    phoff: u32,
    /// Program header entry size.
    phentsize: u16,
    /// Number of program headers.
    phnum: u16,
}

impl Elf32Header {
    /// Decode the header fields from the start of an image.
    ///
    /// The caller has checked that `data` holds a full header.
    fn read(data: &[u8]) -> Self {
        Self {
            machine: read_u16(data, 18),
            entry: read_u32(data, 24),
            phoff: read_u32(data, 28),
            phentsize: read_u16(data, 42),
            phnum: read_u16(data, 44),
        }
    }
}

/// ELF32 program header.
#[derive(Clone, Copy, Debug)]
struct Elf32Phdr {
    /// Segment type (`PT_LOAD` = 1).
    seg_type: u32,
    /// Offset in file.
    offset: u32,
    /// Virtual address in memory.
    vaddr: u32,
    /// Physical address.
    paddr: u32,
    /// Size in file.
    filesz: u32,
    /// Size in memory.
    memsz: u32,
    /// Segment flags (`PF_R`, `PF_W`, `PF_X`).
    flags: u32,
}

impl Elf32Phdr {
    /// Decode a program header; `data` starts at the header.
    fn read(data: &[u8]) -> Self {
        Self {
            seg_type: read_u32(data, 0),
            offset: read_u32(data, 4),
            vaddr: read_u32(data, 8),
            paddr: read_u32(data, 12),
            filesz: read_u32(data, 16),
            memsz: read_u32(data, 20),
            flags: read_u32(data, 24),
        }
    }
}

/// Read a native-order `u16`; bounds are checked by the caller.
fn read_u16(data: &[u8], offset: usize) -> u16 {
    u16::from_ne_bytes([data[offset], data[offset + 1]])
}

/// Read a native-order `u32`; bounds are checked by the caller.
fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_ne_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

// =============================================================================
// Public Types
// =============================================================================

/// Error while loading a program image.
///
/// Load errors are recoverable: nothing has been started and no program
/// information was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadError {
    /// The flash store could not map the image's first block.
    RegionUnavailable,
    /// Image too small for an ELF header.
    TooSmall,
    /// Invalid ELF magic bytes.
    InvalidMagic,
    /// Not a 32-bit ELF.
    Not32Bit,
    /// Data encoding differs from the native byte order.
    WrongEncoding,
    /// Unsupported ELF version.
    WrongVersion,
    /// Not built for the VM's machine type.
    WrongMachine,
    /// Program header table lies outside the first block or the image.
    HeaderOutOfBounds,
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RegionUnavailable => write!(f, "could not map the image header block"),
            Self::TooSmall => write!(f, "image too small for an ELF header"),
            Self::InvalidMagic => write!(f, "bad ELF magic"),
            Self::Not32Bit => write!(f, "not a 32-bit ELF image"),
            Self::WrongEncoding => write!(f, "ELF byte order does not match the host"),
            Self::WrongVersion => write!(f, "unsupported ELF version"),
            Self::WrongMachine => write!(f, "ELF machine type is not ARM"),
            Self::HeaderOutOfBounds => write!(f, "program header table out of bounds"),
        }
    }
}

/// A loadable segment of the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    /// Offset of the segment's data in the image.
    pub start: u32,
    /// Size of the segment: the file size for text/rodata, the memory size
    /// for rwdata and bss.
    pub size: u32,
    /// Number of bytes present in the image.
    pub file_size: u32,
    /// Virtual address of the segment.
    pub vaddr: VirtAddr,
    /// Physical address recorded in the program header.
    pub paddr: u32,
}

impl Segment {
    /// Segment described by a program header, with the given reported size.
    const fn from_phdr(phdr: &Elf32Phdr, size: u32) -> Self {
        Self {
            start: phdr.offset,
            size,
            file_size: phdr.filesz,
            vaddr: VirtAddr::new(phdr.vaddr),
            paddr: phdr.paddr,
        }
    }
}

/// Everything the runtime needs to know about a loaded program.
///
/// Produced once per load and not changed until the next load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProgramInfo {
    /// Entry point word (direct-call encoding, see the runtime).
    pub entry: Word,
    /// Executable, read-only segment.
    pub text_rodata: Option<Segment>,
    /// Initialized read/write data.
    pub rwdata: Option<Segment>,
    /// Zero-initialized read/write data.
    pub bss: Option<Segment>,
}

impl ProgramInfo {
    /// File offset of the text/rodata segment, zero if there is none.
    #[must_use]
    pub fn text_start(&self) -> u32 {
        self.text_rodata.map_or(0, |seg| seg.start)
    }
}

// =============================================================================
// Loading
// =============================================================================

/// Load the program image at `base` in flash, at most `max_len` bytes long.
///
/// Maps the image's first block, parses it and releases the block again
/// before returning, whatever the outcome.
pub fn load<F: FlashStore>(
    store: &mut F,
    base: FlashAddr,
    max_len: u32,
) -> Result<ProgramInfo, LoadError> {
    let region = store
        .get_region(base, FLASH_BLOCK_SIZE)
        .ok_or(LoadError::RegionUnavailable)?;
    let result = parse(store.region_data(&region), max_len);
    store.release_region(region);
    result
}

/// Parse the program information from an image's first block.
///
/// `max_len` bounds the whole image; the header and program-header table
/// must lie inside both `block` and `max_len`.
pub fn parse(block: &[u8], max_len: u32) -> Result<ProgramInfo, LoadError> {
    let limit = block.len().min(max_len as usize);
    if limit < ELF32_HEADER_SIZE {
        return Err(LoadError::TooSmall);
    }

    if block[0..4] != ELF_MAGIC {
        return Err(LoadError::InvalidMagic);
    }

    if block[EI_CLASS] != ELFCLASS32 {
        return Err(LoadError::Not32Bit);
    }

    if block[EI_VERSION] != EV_CURRENT {
        return Err(LoadError::WrongVersion);
    }

    if block[EI_DATA] != native_encoding() {
        return Err(LoadError::WrongEncoding);
    }

    let header = Elf32Header::read(block);
    if header.machine != EM_ARM {
        return Err(LoadError::WrongMachine);
    }

    let entsize = usize::from(header.phentsize);
    if header.phnum > 0 && entsize < ELF32_PHDR_SIZE {
        return Err(LoadError::HeaderOutOfBounds);
    }
    let table_end = (header.phoff as usize)
        .checked_add(usize::from(header.phnum) * entsize)
        .ok_or(LoadError::HeaderOutOfBounds)?;
    if table_end > limit {
        return Err(LoadError::HeaderOutOfBounds);
    }

    let mut info = ProgramInfo {
        entry: header.entry,
        ..ProgramInfo::default()
    };

    for index in 0..usize::from(header.phnum) {
        let offset = header.phoff as usize + index * entsize;
        let phdr = Elf32Phdr::read(&block[offset..]);
        if phdr.seg_type != PT_LOAD {
            continue;
        }

        match phdr.flags {
            flags if flags == PF_X | PF_R => {
                debug!(offset = phdr.offset, size = phdr.filesz, "rodata/text segment found");
                info.text_rodata = Some(Segment::from_phdr(&phdr, phdr.filesz));
            }
            flags if flags == PF_R | PF_W => {
                if phdr.memsz > 0 && phdr.filesz == 0 {
                    debug!(size = phdr.memsz, "bss segment found");
                    info.bss = Some(Segment::from_phdr(&phdr, phdr.memsz));
                } else if phdr.filesz > 0 {
                    debug!(size = phdr.memsz, "rwdata segment found");
                    info.rwdata = Some(Segment::from_phdr(&phdr, phdr.memsz));
                }
            }
            flags => trace!(flags, "ignoring loadable segment"),
        }
    }

    Ok(info)
}
