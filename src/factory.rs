//! The per-object factory (C5, §4.5): the transient state built up
//! while loading one ELF-32/ARM relocatable object and merged into the
//! [`crate::image::Image`] only once every phase succeeds.
//!
//! Ported from the original's per-object load sequence in `uld.cpp`
//! (`uld_prefetch` -> `uld_import` -> `uld_resolve` -> `uld_export`),
//! reworked around owned `Vec`s instead of the original's fixed-size
//! C arrays sized by a compile-time object budget.

use crate::elf32::constants::*;
use crate::elf32::{Reader, Shdr};
use crate::error::{Error, Kind, Result};
use crate::fs::FileSystem;
use crate::image::Image;
use crate::reloc;
use crate::symbol::{SymbolKind, BIND_ANY, BIND_GLOBAL, BIT_DEFINE, BIT_EXPORT};
use crate::target::{Smt, Target};
use alloc::string::String;
use alloc::vec::Vec;

struct SectionInfo {
    shdr: Shdr,
    segment_id: Option<usize>,
    offset_base: u32,
}

#[derive(Clone)]
enum Resolution {
    /// Bound to an existing or newly exported image-global symbol.
    Global(usize),
    /// Resolved within this object, to a byte offset of one of its
    /// own imported sections.
    Local { segment_id: usize, offset: u32 },
    /// `SHN_ABS`: value is an absolute address, not segment-relative.
    Absolute(u32),
    /// Weak and undefined: resolves to address zero.
    Weak,
}

struct LocalSym {
    name: Option<String>,
    bind: u8,
    kind: SymbolKind,
    shndx: u16,
    value: u32,
    resolution: Option<Resolution>,
}

struct RelSection {
    shdr: Shdr,
    target_section: usize,
    has_addend: bool,
}

/// Per-object loader state: one [`Factory`] per call to
/// [`Image::load`].
pub struct Factory<'fs, FS: FileSystem> {
    reader: Reader<'fs, FS>,
    target: Target,
    sections: Vec<SectionInfo>,
    #[allow(dead_code)]
    section_names: Vec<String>,
    symtab_index: Option<usize>,
    locals: Vec<LocalSym>,
    rel_sections: Vec<RelSection>,
}

impl<'fs, FS: FileSystem> Factory<'fs, FS> {
    pub fn open(fs: &'fs FS, path: &str, target: Target) -> Result<Self> {
        let reader = Reader::open(fs, path)?;
        if reader.e_type() != ET_REL {
            return Err(Error::new(Kind::InvalidTarget));
        }
        if !target.has_machine_type(reader.e_machine()) {
            return Err(Error::new(Kind::InvalidTarget));
        }
        Ok(Factory {
            reader,
            target,
            sections: Vec::new(),
            section_names: Vec::new(),
            symtab_index: None,
            locals: Vec::new(),
            rel_sections: Vec::new(),
        })
    }

    /// Read every section header and classify it, without allocating
    /// any segment yet.
    pub fn prefetch(&mut self) -> Result<()> {
        let count = self.reader.section_count();
        for i in 0..count {
            let shdr = self.reader.read_section_info(i)?;
            let name = self.reader.read_section_name(&shdr)?;
            log::trace!("section[{}] = {} ({} bytes)", i, name, shdr.sh_size);
            if shdr.sh_type == SHT_SYMTAB {
                self.symtab_index = Some(i);
            }
            if shdr.sh_type == SHT_REL || shdr.sh_type == SHT_RELA {
                self.rel_sections.push(RelSection {
                    shdr,
                    target_section: shdr.sh_info as usize,
                    has_addend: shdr.sh_type == SHT_RELA,
                });
            }
            self.sections.push(SectionInfo { shdr, segment_id: None, offset_base: 0 });
            self.section_names.push(name);
        }
        Ok(())
    }

    fn segment_meta_for(&self, shdr: &Shdr) -> Option<Smt> {
        if shdr.sh_flags & SHF_ALLOC == 0 {
            return None;
        }
        if shdr.sh_flags & SHF_EXECINSTR != 0 {
            Some(Smt::Text)
        } else if shdr.sh_type == SHT_NOBITS {
            Some(Smt::Bss)
        } else if shdr.sh_flags & SHF_WRITE != 0 {
            Some(Smt::Data)
        } else {
            Some(Smt::Rodata)
        }
    }

    fn segment_flags_for(&self, meta: Smt) -> u32 {
        use crate::segment::{SEG_EXECUTE, SEG_WRITE, SEG_ZERO_INIT};
        match meta {
            Smt::Text => SEG_EXECUTE,
            Smt::Data => SEG_WRITE,
            Smt::Bss => SEG_WRITE | SEG_ZERO_INIT,
            _ => 0,
        }
    }

    /// Allocate segment space for every `SHF_ALLOC` section, copy
    /// `SHT_PROGBITS` bytes in, and decode the symbol table.
    pub fn import(&mut self, image: &mut Image) -> Result<()> {
        for i in 0..self.sections.len() {
            let shdr = self.sections[i].shdr;
            let Some(meta) = self.segment_meta_for(&shdr) else { continue };
            let align = shdr.sh_addralign.max(1).trailing_zeros();
            let segment_id = image.make_segment(meta, self.segment_flags_for(meta), align)?;
            let offset_base = {
                let segment = image.get_segment_by_index_mut(segment_id).expect("just created");
                segment.raw_get(shdr.sh_size as usize)?
            };
            if shdr.sh_type == SHT_PROGBITS && shdr.sh_size > 0 {
                let mut buf = alloc::vec![0u8; shdr.sh_size as usize];
                self.reader.read_section_data(&shdr, 0, &mut buf)?;
                let segment = image.get_segment_by_index_mut(segment_id).expect("just created");
                segment.write_at(offset_base, &buf)?;
            }
            self.sections[i].segment_id = Some(segment_id);
            self.sections[i].offset_base = offset_base as u32;
        }

        if let Some(symtab_idx) = self.symtab_index {
            let symtab = self.sections[symtab_idx].shdr;
            let strtab = self.sections[symtab.sh_link as usize].shdr;
            let count = self.reader.get_symbol_count(&symtab);
            for i in 0..count {
                let sym = self.reader.read_symbol_info(&symtab, i)?;
                let name = self.reader.read_symbol_name(&strtab, &sym)?;
                self.locals.push(LocalSym {
                    name,
                    bind: st_bind(sym.st_info),
                    kind: SymbolKind::from_stt(st_type(sym.st_info)),
                    shndx: sym.st_shndx,
                    value: sym.st_value,
                    resolution: None,
                });
            }
        }
        Ok(())
    }

    fn local_address(&self, image: &Image, resolution: &Resolution) -> Option<u32> {
        match resolution {
            Resolution::Global(idx) => image.symbol(*idx).and_then(|s| s.ra),
            Resolution::Local { segment_id, offset } => image
                .get_segment_by_index(*segment_id)
                .and_then(|s| s.addr_of(*offset as usize))
                .map(|a| a as u32),
            Resolution::Absolute(v) => Some(*v),
            Resolution::Weak => Some(0),
        }
    }

    /// Bind every local symbol to a global-table entry, a local
    /// section offset, or an absolute value, and detect strong/strong
    /// redefinitions. An undefined strong reference with no existing
    /// definition anywhere in the image is not an error here: per
    /// §4.5's Import bullet, it materialises as a new undefined,
    /// exported image symbol (`ea`/`ra` both `None`) - `Kind::NoSym` is
    /// reserved for a relocation in `export` that targets a local
    /// symtab entry with no resolution at all (an unnamed `SHN_UNDEF`
    /// entry, or a `STT_FILE` symbol).
    pub fn resolve(&mut self, image: &mut Image) -> Result<()> {
        for i in 0..self.locals.len() {
            if i == 0 {
                continue; // index 0 is always the null symtab entry
            }
            let shndx = self.locals[i].shndx;
            let kind = self.locals[i].kind;
            let bind = self.locals[i].bind;
            let name = self.locals[i].name.clone();

            let resolution = match shndx {
                SHN_UNDEF => {
                    if matches!(kind, SymbolKind::File) || name.is_none() {
                        None
                    } else {
                        let name = name.as_deref().unwrap();
                        match image.find_symbol(name, BIND_ANY) {
                            Some(idx) => Some(Resolution::Global(idx)),
                            None if bind as u32 == BIND_GLOBAL => {
                                let idx = image.make_symbol(name, kind, bind as u32 | BIT_EXPORT, None, None)?;
                                Some(Resolution::Global(idx))
                            }
                            None => Some(Resolution::Weak),
                        }
                    }
                }
                SHN_ABS | SHN_COMMON => {
                    return Err(Error::new(Kind::Fault));
                }
                _ => {
                    let section = self.sections.get(shndx as usize).ok_or(Error::new(Kind::Fault))?;
                    let segment_id = section.segment_id.ok_or(Error::new(Kind::Fault))?;
                    let mut offset = section.offset_base + self.locals[i].value;
                    if matches!(kind, SymbolKind::Function) && self.target.is_vle() {
                        offset &= self.target.vle_mask();
                    }
                    Some(Resolution::Local { segment_id, offset })
                }
            };

            if let (Some(Resolution::Local { .. }), Some(name)) = (&resolution, &name) {
                if bind as u32 == BIND_GLOBAL || bind as u32 == crate::symbol::BIND_WEAK {
                    if let Some(existing) = image.find_symbol(name, BIND_ANY) {
                        let existing_sym = image.symbol(existing).expect("just found");
                        if existing_sym.is_defined() {
                            if existing_sym.bind() == BIND_GLOBAL && bind as u32 == BIND_GLOBAL {
                                return Err(Error::with_detail(Kind::Redef, name.clone()));
                            }
                            self.locals[i].resolution = Some(Resolution::Global(existing));
                            continue;
                        }
                    }
                }
            }

            self.locals[i].resolution = resolution;
        }
        Ok(())
    }

    /// Promote newly-defined global/weak symbols into the image, then
    /// apply every relocation.
    pub fn export(&mut self, image: &mut Image) -> Result<()> {
        for i in 0..self.locals.len() {
            if i == 0 {
                continue;
            }
            let bind = self.locals[i].bind as u32;
            if bind != BIND_GLOBAL && bind != crate::symbol::BIND_WEAK {
                continue;
            }
            let Some(name) = self.locals[i].name.clone() else { continue };
            let kind = self.locals[i].kind;

            match &self.locals[i].resolution {
                Some(r @ Resolution::Local { .. }) => {
                    let resolution = r.clone();
                    let ea = self.local_address(image, &resolution).ok_or(Error::new(Kind::NoDef))?;
                    let ra = if matches!(kind, SymbolKind::Function) && self.target.is_vle() {
                        ea | self.target.vle_bit()
                    } else {
                        ea
                    };
                    let idx = image.make_symbol(&name, kind, bind | BIT_DEFINE | BIT_EXPORT, Some(ea), Some(ra))?;
                    self.locals[i].resolution = Some(Resolution::Global(idx));
                }
                Some(Resolution::Weak) => {
                    // A still-undefined weak reference: mirror `uld_export` and
                    // promote it anyway so it stays findable, with `ea`/`ra`
                    // left unset rather than resolved to zero.
                    let idx = match image.find_symbol(&name, BIND_ANY) {
                        Some(existing) => existing,
                        None => image.make_symbol(&name, kind, bind | BIT_EXPORT, None, None)?,
                    };
                    self.locals[i].resolution = Some(Resolution::Global(idx));
                }
                _ => continue,
            }
        }

        for rel_section in core::mem::take(&mut self.rel_sections) {
            let target_index = rel_section.target_section;
            let Some(target_section) = self.sections.get(target_index) else { continue };
            let Some(segment_id) = target_section.segment_id else { continue };
            let offset_base = target_section.offset_base;
            let count = self.reader.get_rel_count(&rel_section.shdr);

            for i in 0..count {
                let (r_offset, r_info, explicit_addend) = if rel_section.has_addend {
                    let rela = self.reader.read_rela_info(&rel_section.shdr, i)?;
                    (rela.r_offset, rela.r_info, Some(rela.r_addend))
                } else {
                    let rel = self.reader.read_rel_info(&rel_section.shdr, i)?;
                    (rel.r_offset, rel.r_info, None)
                };
                let sym_index = r_sym(r_info) as usize;
                let r_type = r_type(r_info);
                let p_offset = offset_base + r_offset;

                let local = self.locals.get(sym_index).ok_or(Error::new(Kind::NoSym))?;
                let resolution = local.resolution.clone().ok_or(Error::new(Kind::NoSym))?;

                let (s, got_s) = match &resolution {
                    Resolution::Global(idx) => (
                        image.symbol(*idx).and_then(|s| s.ra).unwrap_or(0),
                        image.symbol_got_address(*idx).unwrap_or(0),
                    ),
                    Resolution::Local { .. } | Resolution::Absolute(_) | Resolution::Weak => {
                        let addr = self.local_address(image, &resolution).unwrap_or(0);
                        (addr, addr)
                    }
                };
                let b_s = self.target.address_base();

                let segment = image.get_segment_by_index_mut(segment_id).ok_or(Error::new(Kind::Fault))?;
                let p = segment.addr_of(p_offset as usize).unwrap_or(0) as u32;
                let field = segment
                    .bytes_at(p_offset as usize, 4)
                    .ok_or(Error::new(Kind::Access))?;
                let addend = match explicit_addend {
                    Some(a) => a,
                    None => reloc::implicit_addend(r_type, field)?,
                };
                let mut field_buf = [0u8; 4];
                field_buf.copy_from_slice(field);
                reloc::apply(r_type, &mut field_buf, s, addend, b_s, got_s, p)?;
                segment.write_at(p_offset as usize, &field_buf)?;
            }
        }
        Ok(())
    }
}
