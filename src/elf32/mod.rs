//! The ELF-32 reader (C2, §4.2): decodes headers, section headers,
//! symbol and relocation table entries out of a [`crate::cache::ByteCache`]
//! using `scroll`'s derive machinery the way the teacher crate's
//! `elf/_32/*.rs` modules decode their own fixed-size records, rather
//! than hand-rolling an offset/field reader.

pub mod constants;

use crate::cache::ByteCache;
use crate::error::{Error, Kind, Result};
use crate::fs::FileSystem;
use scroll::{Endian, Pread};

#[cfg(feature = "alloc")]
use scroll::{Pwrite, SizeWith};

/// ELF-32 file header (`Elf32_Ehdr`), minus the 16-byte `e_ident` block
/// (decoded separately by [`Reader::open`] since it is the one
/// fixed-endianness, fixed-layout part of the file).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "alloc", derive(Pread, Pwrite, SizeWith))]
pub struct Ehdr {
    pub e_type: u16,
    pub e_machine: u16,
    pub e_version: u32,
    pub e_entry: u32,
    pub e_phoff: u32,
    pub e_shoff: u32,
    pub e_flags: u32,
    pub e_ehsize: u16,
    pub e_phentsize: u16,
    pub e_phnum: u16,
    pub e_shentsize: u16,
    pub e_shnum: u16,
    pub e_shstrndx: u16,
}

/// ELF-32 section header (`Elf32_Shdr`).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "alloc", derive(Pread, Pwrite, SizeWith))]
pub struct Shdr {
    pub sh_name: u32,
    pub sh_type: u32,
    pub sh_flags: u32,
    pub sh_addr: u32,
    pub sh_offset: u32,
    pub sh_size: u32,
    pub sh_link: u32,
    pub sh_info: u32,
    pub sh_addralign: u32,
    pub sh_entsize: u32,
}

/// ELF-32 symbol table entry (`Elf32_Sym`).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "alloc", derive(Pread, Pwrite, SizeWith))]
pub struct Sym {
    pub st_name: u32,
    pub st_value: u32,
    pub st_size: u32,
    pub st_info: u8,
    pub st_other: u8,
    pub st_shndx: u16,
}

/// ELF-32 relocation entry without an explicit addend (`Elf32_Rel`).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "alloc", derive(Pread, Pwrite, SizeWith))]
pub struct Rel {
    pub r_offset: u32,
    pub r_info: u32,
}

/// ELF-32 relocation entry with an explicit addend (`Elf32_Rela`).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "alloc", derive(Pread, Pwrite, SizeWith))]
pub struct Rela {
    pub r_offset: u32,
    pub r_info: u32,
    pub r_addend: i32,
}

unsafe impl plain::Plain for Ehdr {}
unsafe impl plain::Plain for Shdr {}
unsafe impl plain::Plain for Sym {}
unsafe impl plain::Plain for Rel {}
unsafe impl plain::Plain for Rela {}

const MAX_STRING: usize = 32 * 1024;

/// A streaming ELF-32 decoder over one [`ByteCache`].
///
/// Holds the file header fields needed throughout a load (endianness,
/// section count, section-header-string-table index) so callers don't
/// re-read `Ehdr` for every lookup.
pub struct Reader<'fs, FS: FileSystem> {
    cache: ByteCache<'fs, FS>,
    endian: Endian,
    e_type: u16,
    e_machine: u16,
    e_shoff: u32,
    e_shnum: u16,
    e_shstrndx: u16,
    shstrtab: Option<Shdr>,
}

impl<'fs, FS: FileSystem> Reader<'fs, FS> {
    /// Open `name`, validate the ELF-32 magic/class, and cache the
    /// header fields every later call needs.
    pub fn open(fs: &'fs FS, name: &str) -> Result<Self> {
        let mut cache = ByteCache::open(fs, name)?;
        let mut ident = [0u8; constants::SIZEOF_IDENT];
        cache.read_exact(&mut ident)?;
        if &ident[0..4] != constants::ELFMAG {
            return Err(Error::new(Kind::InvalidTarget));
        }
        if ident[4] != constants::ELFCLASS32 {
            return Err(Error::new(Kind::InvalidTarget));
        }
        let endian = match ident[5] {
            constants::ELFDATA2LSB => Endian::Little,
            constants::ELFDATA2MSB => Endian::Big,
            _ => return Err(Error::new(Kind::InvalidTarget)),
        };

        let mut buf = [0u8; 36];
        cache.read_exact(&mut buf)?;
        let ehdr: Ehdr = buf.pread_with(0, endian)?;

        let mut reader = Reader {
            cache,
            endian,
            e_type: ehdr.e_type,
            e_machine: ehdr.e_machine,
            e_shoff: ehdr.e_shoff,
            e_shnum: ehdr.e_shnum,
            e_shstrndx: ehdr.e_shstrndx,
            shstrtab: None,
        };
        if reader.e_shnum > 0 {
            let shstrtab = reader.read_section_info(reader.e_shstrndx as usize)?;
            reader.shstrtab = Some(shstrtab);
        }
        Ok(reader)
    }

    pub fn e_type(&self) -> u16 {
        self.e_type
    }

    pub fn e_machine(&self) -> u16 {
        self.e_machine
    }

    pub fn section_count(&self) -> usize {
        self.e_shnum as usize
    }

    /// Read section header `index`.
    pub fn read_section_info(&mut self, index: usize) -> Result<Shdr> {
        if index >= self.e_shnum as usize {
            return Err(Error::new(Kind::Access));
        }
        let pos = self.e_shoff as u64 + (index as u64) * 40;
        self.cache.seek(pos)?;
        let mut buf = [0u8; 40];
        self.cache.read_exact(&mut buf)?;
        let shdr: Shdr = buf.pread_with(0, self.endian)?;
        Ok(shdr)
    }

    /// Resolve a section's name through the section-header string
    /// table, capped at `MAX_STRING` bytes as a defence against a
    /// malformed/unterminated strtab.
    pub fn read_section_name(&mut self, shdr: &Shdr) -> Result<alloc::string::String> {
        let shstrtab = self.shstrtab.ok_or(Error::new(Kind::Access))?;
        self.read_cstr_at(shstrtab.sh_offset as u64 + shdr.sh_name as u64)
    }

    fn read_cstr_at(&mut self, pos: u64) -> Result<alloc::string::String> {
        use alloc::vec::Vec;
        self.cache.seek(pos)?;
        let mut bytes = Vec::new();
        loop {
            if bytes.len() >= MAX_STRING {
                return Err(Error::new(Kind::Access));
            }
            let saved = self.cache.acquire()?;
            let b = self.cache.raw_get()?;
            let _ = self.cache.release(saved)?;
            match b {
                Some(0) | None => break,
                Some(b) => bytes.push(b),
            }
        }
        Ok(alloc::string::String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Copy up to `buf.len()` bytes of section `shdr`'s data starting
    /// at `pos` bytes into the section. Refuses a read that would run
    /// past `sh_size`.
    pub fn read_section_data(&mut self, shdr: &Shdr, pos: u32, buf: &mut [u8]) -> Result<()> {
        if pos as u64 + buf.len() as u64 > shdr.sh_size as u64 {
            return Err(Error::new(Kind::Access));
        }
        self.cache.seek(shdr.sh_offset as u64 + pos as u64)?;
        self.cache.read_exact(buf)
    }

    /// Number of entries in a `SHT_SYMTAB`/`SHT_DYNSYM` section, or 0 if
    /// the section is not a valid symbol table (`sh_size` or
    /// `sh_entsize` zero).
    pub fn get_symbol_count(&self, shdr: &Shdr) -> usize {
        if shdr.sh_size == 0 || shdr.sh_entsize == 0 {
            return 0;
        }
        let remainder = shdr.sh_size % shdr.sh_entsize;
        #[cfg(feature = "alloc")]
        if remainder != 0 {
            log::warn!(
                "symtab section size {} is not a multiple of entsize {}",
                shdr.sh_size,
                shdr.sh_entsize
            );
        }
        let _ = remainder;
        (shdr.sh_size / shdr.sh_entsize) as usize
    }

    pub fn read_symbol_info(&mut self, shdr: &Shdr, index: usize) -> Result<Sym> {
        let pos = shdr.sh_offset as u64 + (index as u64) * (shdr.sh_entsize as u64);
        self.cache.seek(pos)?;
        let mut buf = [0u8; 16];
        self.cache.read_exact(&mut buf)?;
        let sym: Sym = buf.pread_with(0, self.endian)?;
        Ok(sym)
    }

    /// Resolve a symbol's name through the linked `.strtab` section
    /// (`link_shdr`), or `None` for `st_name == 0`.
    pub fn read_symbol_name(
        &mut self,
        link_shdr: &Shdr,
        sym: &Sym,
    ) -> Result<Option<alloc::string::String>> {
        if sym.st_name == 0 {
            return Ok(None);
        }
        Ok(Some(self.read_cstr_at(link_shdr.sh_offset as u64 + sym.st_name as u64)?))
    }

    pub fn get_rel_count(&self, shdr: &Shdr) -> usize {
        if shdr.sh_size == 0 || shdr.sh_entsize == 0 {
            return 0;
        }
        (shdr.sh_size / shdr.sh_entsize) as usize
    }

    pub fn read_rel_info(&mut self, shdr: &Shdr, index: usize) -> Result<Rel> {
        let pos = shdr.sh_offset as u64 + (index as u64) * (shdr.sh_entsize as u64);
        self.cache.seek(pos)?;
        let mut buf = [0u8; 8];
        self.cache.read_exact(&mut buf)?;
        let rel: Rel = buf.pread_with(0, self.endian)?;
        Ok(rel)
    }

    pub fn read_rela_info(&mut self, shdr: &Shdr, index: usize) -> Result<Rela> {
        let pos = shdr.sh_offset as u64 + (index as u64) * (shdr.sh_entsize as u64);
        self.cache.seek(pos)?;
        let mut buf = [0u8; 12];
        self.cache.read_exact(&mut buf)?;
        let rela: Rela = buf.pread_with(0, self.endian)?;
        Ok(rela)
    }
}
