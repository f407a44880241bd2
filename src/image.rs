//! The image / program table (§4.4): the loader's single piece of
//! mutable global state. One `Image` holds every segment allocated so
//! far and every symbol promoted into the global table; `load` drives
//! one object through the four-phase pipeline in `factory` and, on
//! success, merges its newly exported symbols and segment bytes into
//! this state.
//!
//! Ported from `image.{h,cpp}` and `image/program_table.cpp`'s
//! `program_table_t`, minus the real MMU mapping calls `uld_set` makes
//! once a segment's final layout is known - this crate's "mapping" is
//! just handing out a stable arena offset.

use crate::arena::{CharPool, Pool};
use crate::error::{Error, Kind, Result};
use crate::factory::Factory;
use crate::fs::FileSystem;
use crate::segment::{Segment, SEG_EXECUTE, SEG_WRITE, SEG_ZERO_INIT};
use crate::symbol::{Symbol, SymbolKind, BIND_WEAK, BIT_DEFINE, BIT_EXPORT};
use crate::target::{Smt, Target};

/// Upper bound on live program-table slots, matching the original's
/// `segment_count_max`.
pub const MAX_SEGMENTS: usize = 16;

/// The loader's single piece of runtime state: a program table of
/// segments plus a global symbol table, built against one [`Target`].
pub struct Image {
    target: Target,
    strings: CharPool,
    symbols: Pool<Symbol>,
    segments: [Option<Segment>; MAX_SEGMENTS],
    segment_count: usize,
}

impl Image {
    /// Build a fresh image: the five default segments (`.text`,
    /// `.data`, `.rodata`, `.bss`, `.got`) and the synthetic
    /// `_GLOBAL_OFFSET_TABLE_` symbol, matching `uld_set`'s startup
    /// sequence.
    pub fn new(target: Target) -> Result<Image> {
        const NONE: Option<Segment> = None;
        let mut image = Image {
            target,
            strings: CharPool::new(),
            symbols: Pool::new(),
            segments: [NONE; MAX_SEGMENTS],
            segment_count: 0,
        };
        image.segments[0] = Some(Segment::new(Smt::Text, SEG_EXECUTE, target.code_align()));
        image.segments[1] = Some(Segment::new(Smt::Data, SEG_WRITE, target.data_align()));
        image.segments[2] = Some(Segment::new(Smt::Rodata, 0, target.data_align()));
        image.segments[3] = Some(Segment::new(Smt::Bss, SEG_WRITE | SEG_ZERO_INIT, target.data_align()));
        image.segments[4] = Some(Segment::new(Smt::Got, 0, target.data_align()));
        image.segment_count = 5;

        image.synthesize_got()?;
        Ok(image)
    }

    /// Reserve a two-word slot at the top of `.rodata` for
    /// `_GLOBAL_OFFSET_TABLE_` and seed its first word with
    /// `target.address_base()`, per `uld_set`. The symbol itself is a
    /// weak object so a real definition elsewhere in a loaded object
    /// overrides it without tripping the strong-redefinition check.
    fn synthesize_got(&mut self) -> Result<()> {
        let rodata_id = self.get_segment_index_by_meta(Smt::Rodata).expect(".rodata always exists");
        let word_size = self.target.machine_word_size() as usize;
        let offset = {
            let segment = self.segments[rodata_id].as_mut().expect("checked above");
            let offset = segment.raw_get(word_size * 2)?;
            let base = self.target.address_base();
            let base_bytes = if self.target.is_lsb() {
                base.to_le_bytes()
            } else {
                base.to_be_bytes()
            };
            segment.write_at(offset, &base_bytes)?;
            offset
        };
        let ea = self.segments[rodata_id].as_ref().unwrap().addr_of(offset).unwrap_or(0) as u32;
        self.make_symbol(
            self.target.got_name(),
            SymbolKind::Object,
            BIND_WEAK | BIT_DEFINE,
            Some(ea),
            Some(ea),
        )?;
        Ok(())
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    // --- symbol table ---

    /// Find a symbol by name whose binding is a superset of
    /// `bind_mask` (`BIND_ANY` matches everything), matching
    /// `symbol_table_t::find_symbol`.
    pub fn find_symbol(&self, name: &str, bind_mask: u32) -> Option<usize> {
        for offset in 0..self.symbols.table_offset() {
            if let Some(sym) = self.symbols.get(offset) {
                if !sym.matches_bind(bind_mask) {
                    continue;
                }
                if let Some(name_off) = sym.name {
                    if self.strings.get_str(name_off) == Some(name) {
                        return Some(offset);
                    }
                }
            }
        }
        None
    }

    pub fn symbol(&self, index: usize) -> Option<&Symbol> {
        self.symbols.get(index)
    }

    pub fn symbol_name(&self, sym: &Symbol) -> Option<&str> {
        sym.name.and_then(|off| self.strings.get_str(off))
    }

    /// Allocate a new global-table slot for `name`, matching
    /// `symbol_table_t::make_symbol`.
    pub fn make_symbol(
        &mut self,
        name: &str,
        kind: SymbolKind,
        flags: u32,
        ea: Option<u32>,
        ra: Option<u32>,
    ) -> Result<usize> {
        let name_off = self.strings.intern(name)?;
        let index = self.symbols.raw_get()?;
        let slot = self.symbols.get_mut(index).expect("just reserved");
        *slot = Symbol {
            name: Some(name_off),
            kind,
            flags,
            size: 0,
            ea,
            ra,
            section_support: None,
        };
        Ok(index)
    }

    /// The address GOT-relative relocations resolve `GOT(S)` to: the
    /// address of the symbol's own `ra` slot (`uld_get_global_address`),
    /// approximated here as the address of the whole [`Symbol`] record
    /// since `Option<u32>`'s field offset is not something safe Rust
    /// can take without `unsafe` field-projection; both addresses are
    /// equally synthetic host pointers in this simulation. See
    /// `DESIGN.md`.
    pub fn symbol_got_address(&self, index: usize) -> Option<u32> {
        self.symbols.addr_of(index).map(|a| a as u32)
    }

    // --- program table ---

    fn get_segment_index_by_meta(&self, meta: Smt) -> Option<usize> {
        self.segments.iter().enumerate().find_map(|(i, s)| {
            s.as_ref().filter(|s| s.meta() == meta).map(|_| i)
        })
    }

    pub fn get_segment_by_index(&self, index: usize) -> Option<&Segment> {
        self.segments.get(index).and_then(|s| s.as_ref())
    }

    pub fn get_segment_by_index_mut(&mut self, index: usize) -> Option<&mut Segment> {
        self.segments.get_mut(index).and_then(|s| s.as_mut())
    }

    pub fn get_segment_by_name(&self, name: &str) -> Option<usize> {
        self.segments.iter().enumerate().find_map(|(i, s)| {
            s.as_ref()
                .filter(|s| self.target.segment_name(s.meta()) == name)
                .map(|_| i)
        })
    }

    pub fn get_segment_count(&self) -> usize {
        self.segment_count
    }

    /// Route a section needing a backing segment to one.
    ///
    /// The five default metas (`Text`/`Data`/`Rodata`/`Bss`/`Got`)
    /// always merge into the slot created at [`Image::new`]; anything
    /// else (`.rel`, `.rela`, `.comment`, extra `PROGBITS` the object
    /// doesn't share with the defaults) gets the first free slot.
    ///
    /// The original's equivalent free-slot loop in
    /// `program_table_t::make_segment` redeclares its loop counter
    /// with the same name as the outer search variable, so the index
    /// found inside the loop body is discarded the moment the loop
    /// exits and the function always reports the first non-empty slot
    /// instead of the one it just found (§9, first Open Question). This
    /// port uses the index returned by the search directly.
    pub fn make_segment(&mut self, meta: Smt, flags: u32, align: u32) -> Result<usize> {
        if matches!(meta, Smt::Text | Smt::Data | Smt::Rodata | Smt::Bss | Smt::Got) {
            if let Some(index) = self.get_segment_index_by_meta(meta) {
                return Ok(index);
            }
        }
        for index in 0..MAX_SEGMENTS {
            if self.segments[index].is_none() {
                self.segments[index] = Some(Segment::new(meta, flags, align));
                if index >= self.segment_count {
                    self.segment_count = index + 1;
                }
                return Ok(index);
            }
        }
        Err(Error::new(Kind::Memory))
    }

    /// Load `path` through the four-phase pipeline: prefetch, import,
    /// resolve, export. A failure in any phase stops further work on
    /// this object and returns to the caller; per §9's rollback design
    /// note this is not transactional. Segments already made and
    /// section bytes already copied by a prior phase (import runs
    /// before resolve/export) remain in the image, and any symbols
    /// already promoted by a partially-completed export stay too -
    /// objects already `Done` from earlier `load` calls are unaffected
    /// either way.
    pub fn load<FS: FileSystem>(&mut self, fs: &FS, path: &str) -> Result<()> {
        #[cfg(feature = "archive")]
        if Self::sniff_is_archive(fs, path)? {
            log::info!("{} is an archive; member loading is out of scope for this core", path);
            return Ok(());
        }

        let mut factory = Factory::open(fs, path, self.target)?;
        factory.prefetch()?;
        factory.import(self)?;
        factory.resolve(self)?;
        factory.export(self)?;
        Ok(())
    }

    /// Peek the first 8 bytes of `path` and check them against the SysV
    /// `ar` magic, per §2's "sniff magic -> archive or elf" step. Archive
    /// member traversal itself is out of scope (§2 Non-goals); a caller
    /// handing `load` an archive simply gets a successful no-op rather
    /// than failing deep inside the ELF-32 reader on a magic mismatch.
    #[cfg(feature = "archive")]
    fn sniff_is_archive<FS: FileSystem>(fs: &FS, path: &str) -> Result<bool> {
        let mut handle = fs.open(path)?;
        let mut ident = [0u8; crate::archive::ARMAG.len()];
        let n = fs.read(&mut handle, &mut ident)?;
        fs.close(handle);
        Ok(n == ident.len() && crate::archive::is_archive(&ident))
    }
}

// kept for completeness of the public symbol surface; currently
// unused outside `load`'s internals but documents what `BIT_EXPORT`
// means on an exported symbol.
#[allow(dead_code)]
fn is_exported(sym: &Symbol) -> bool {
    sym.flags & BIT_EXPORT != 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_target() -> Target {
        Target::new(crate::elf32::constants::EM_ARM, 0, 0, true, true, 0x2000_0000, 2, 2, 0).unwrap()
    }

    #[test]
    fn new_image_has_default_segments_and_got_symbol() {
        let image = Image::new(test_target()).unwrap();
        assert_eq!(image.get_segment_count(), 5);
        assert!(image.find_symbol("_GLOBAL_OFFSET_TABLE_", crate::symbol::BIND_ANY).is_some());
    }

    #[test]
    fn make_segment_merges_default_metas() {
        let mut image = Image::new(test_target()).unwrap();
        let a = image.make_segment(Smt::Text, SEG_EXECUTE, 2).unwrap();
        let b = image.make_segment(Smt::Text, SEG_EXECUTE, 2).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn make_segment_allocates_fresh_slot_for_other_metas() {
        let mut image = Image::new(test_target()).unwrap();
        let a = image.make_segment(Smt::Rel, 0, 0).unwrap();
        let b = image.make_segment(Smt::Rela, 0, 0).unwrap();
        assert_ne!(a, b);
        assert!(a >= 5);
        assert!(b >= 5);
    }

    #[test]
    fn make_symbol_and_find_symbol_roundtrip() {
        let mut image = Image::new(test_target()).unwrap();
        let idx = image
            .make_symbol("foo", SymbolKind::Function, crate::symbol::BIND_GLOBAL | BIT_DEFINE, Some(4), Some(5))
            .unwrap();
        let found = image.find_symbol("foo", crate::symbol::BIND_GLOBAL).unwrap();
        assert_eq!(found, idx);
    }
}
