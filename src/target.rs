//! Runtime configuration for an [`crate::image::Image`].
//!
//! `Target` is the loader's only configuration surface (§7.2): an
//! embedded integrator builds one `Target` at startup describing the
//! ELF machine/class it will be loading objects for, and the RAM region
//! those objects should be linked into.

use crate::error::{Error, Kind, Result};

/// ELF class identifiers (`EI_CLASS`).
pub const ELFCLASSNONE: u8 = 0;
pub const ELFCLASS32: u8 = 1;
pub const ELFCLASS64: u8 = 2;

/// Segment meta-types, used to name and look up the image's default
/// segments. `Idata`/`Zdata`/`Udata` are aliases kept for readability at
/// call sites that think in terms of "small initialised/zeroed/uninitialised
/// data" rather than the underlying `.data`/`.bss` segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Smt {
    Null = 0,
    Text = 1,
    Data = 2,
    Rodata = 3,
    Bss = 4,
    Got = 5,
    Raw = 6,
    Rel = 7,
    Rela = 8,
    Comment = 9,
    Symtab = 10,
    Strtab = 11,
    Shstrtab = 12,
}

impl Smt {
    pub const IDATA: Smt = Smt::Data;
    pub const ZDATA: Smt = Smt::Bss;
    pub const UDATA: Smt = Smt::Bss;
}

/// Immutable per-load configuration: machine identity, endianness, and
/// the host memory layout an image should be built into.
#[derive(Debug, Clone, Copy)]
pub struct Target {
    machine_type: u16,
    abi_id: u8,
    abi_version: u8,
    class: u8,
    lsb: bool,
    msb: bool,
    vle_bit: bool,
    address_base: u32,
    code_align: u32,
    data_align: u32,
    default_align: u32,
}

impl Target {
    /// Build a `Target`, validating the invariants from the data model:
    /// `class` must be `ELFCLASS32`, exactly one of `lsb`/`msb` must be
    /// set, and `address_base` must be word-aligned.
    pub fn new(
        machine_type: u16,
        abi_id: u8,
        abi_version: u8,
        lsb: bool,
        vle_bit: bool,
        address_base: u32,
        code_align: u32,
        data_align: u32,
        default_align: u32,
    ) -> Result<Target> {
        if address_base % 4 != 0 {
            return Err(Error::new(Kind::InvalidTarget));
        }
        Ok(Target {
            machine_type,
            abi_id,
            abi_version,
            class: ELFCLASS32,
            lsb,
            msb: !lsb,
            vle_bit,
            address_base,
            code_align,
            data_align,
            default_align,
        })
    }

    pub fn machine_type(&self) -> u16 {
        self.machine_type
    }

    pub fn has_machine_type(&self, machine_type: u16) -> bool {
        self.machine_type == machine_type
    }

    pub fn abi_id(&self) -> u8 {
        self.abi_id
    }

    pub fn abi_version(&self) -> u8 {
        self.abi_version
    }

    pub fn class(&self) -> u8 {
        self.class
    }

    pub fn has_class(&self, class: u8) -> bool {
        self.class == class
    }

    pub fn machine_word_bits(&self) -> u32 {
        32
    }

    pub fn machine_word_size(&self) -> u32 {
        4
    }

    pub fn ep_name(&self) -> &'static str {
        "_start"
    }

    pub fn got_name(&self) -> &'static str {
        "_GLOBAL_OFFSET_TABLE_"
    }

    pub fn segment_name(&self, meta: Smt) -> &'static str {
        match meta {
            Smt::Null => "",
            Smt::Text => ".text",
            Smt::Data => ".data",
            Smt::Rodata => ".rodata",
            Smt::Bss => ".bss",
            Smt::Got => ".got",
            Smt::Raw => ".raw",
            Smt::Rel => ".rel",
            Smt::Rela => ".rela",
            Smt::Comment => ".comment",
            Smt::Symtab => ".symtab",
            Smt::Strtab => ".strtab",
            Smt::Shstrtab => ".shstrtab",
        }
    }

    pub fn address_base(&self) -> u32 {
        self.address_base
    }

    pub fn code_align(&self) -> u32 {
        self.code_align
    }

    pub fn data_align(&self) -> u32 {
        self.data_align
    }

    pub fn default_align(&self) -> u32 {
        self.default_align
    }

    /// The Thumb-interworking bit added to `ra` for `STT_FUNC` symbols.
    pub fn vle_bit(&self) -> u32 {
        self.vle_bit as u32
    }

    /// Mask clearing the Thumb bit from a symbol `st_value` before it is
    /// used as a file offset.
    pub fn vle_mask(&self) -> u32 {
        !(self.vle_bit as u32)
    }

    pub fn is_vle(&self) -> bool {
        self.vle_bit
    }

    pub fn is_lsb(&self) -> bool {
        self.lsb
    }

    pub fn is_msb(&self) -> bool {
        self.msb
    }
}
