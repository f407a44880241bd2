//! End-to-end scenarios from the specification's worked examples:
//! loading small, hand-built ELF-32/ARM relocatable objects through
//! the full prefetch/import/resolve/export pipeline and checking the
//! resulting image/segment/symbol state, the way the teacher crate's
//! own tests build small fixtures by hand rather than checking in
//! real toolchain output.

use scroll::{Endian, Pwrite};
use uld::elf32::constants::*;
use uld::elf32::{Ehdr, Rel, Shdr, Sym};
use uld::fs::SliceFileSystem;
use uld::image::Image;
use uld::symbol::{BIND_ANY, BIND_GLOBAL};
use uld::target::Target;

struct Sec {
    name: &'static str,
    sh_type: u32,
    sh_flags: u32,
    data: Vec<u8>,
    sh_link: u32,
    sh_info: u32,
    sh_entsize: u32,
    sh_addralign: u32,
}

fn sec(name: &'static str, sh_type: u32, sh_flags: u32, data: Vec<u8>) -> Sec {
    Sec { name, sh_type, sh_flags, data, sh_link: 0, sh_info: 0, sh_entsize: 0, sh_addralign: 1 }
}

fn sym_bytes(st_name: u32, st_value: u32, st_size: u32, st_info: u8, st_shndx: u16) -> Vec<u8> {
    let sym = Sym { st_name, st_value, st_size, st_info, st_other: 0, st_shndx };
    let mut buf = [0u8; 16];
    buf.pwrite_with(sym, 0, Endian::Little).unwrap();
    buf.to_vec()
}

fn rel_bytes(r_offset: u32, r_sym: u32, r_type: u32) -> Vec<u8> {
    let rel = Rel { r_offset, r_info: r_info(r_sym, r_type) };
    let mut buf = [0u8; 8];
    buf.pwrite_with(rel, 0, Endian::Little).unwrap();
    buf.to_vec()
}

fn strtab(names: &[&str]) -> (Vec<u8>, Vec<u32>) {
    let mut data = vec![0u8];
    let mut offsets = Vec::new();
    for name in names {
        offsets.push(data.len() as u32);
        data.extend_from_slice(name.as_bytes());
        data.push(0);
    }
    (data, offsets)
}

/// Build a full ELF-32/ARM relocatable object out of `sections` (which
/// must not include the implicit `NULL` section at index 0).
fn build_elf(e_type: u16, e_machine: u16, sections: Vec<Sec>) -> Vec<u8> {
    let mut all = Vec::new();
    all.push(sec("", SHT_NULL, 0, Vec::new()));
    all.extend(sections);

    let names: Vec<&str> = all.iter().map(|s| s.name).collect();
    let (mut shstrtab_data, name_offsets) = strtab(&names);
    let shstrtab_name_off = shstrtab_data.len() as u32;
    shstrtab_data.extend_from_slice(b".shstrtab");
    shstrtab_data.push(0);
    let shstrtab_index = all.len();

    let mut offset = 52u32;
    let mut offsets = vec![0u32; all.len()];
    for (i, s) in all.iter().enumerate() {
        if i == 0 {
            continue;
        }
        offsets[i] = offset;
        offset += s.data.len() as u32;
    }
    let shstrtab_offset = offset;
    offset += shstrtab_data.len() as u32;
    while offset % 4 != 0 {
        offset += 1;
    }
    let shoff = offset;
    let shnum = all.len() + 1;

    let mut bytes = vec![0u8; shoff as usize + shnum * 40];
    bytes[0..4].copy_from_slice(ELFMAG);
    bytes[4] = ELFCLASS32;
    bytes[5] = ELFDATA2LSB;
    bytes[6] = EV_CURRENT;
    let ehdr = Ehdr {
        e_type,
        e_machine,
        e_version: 1,
        e_entry: 0,
        e_phoff: 0,
        e_shoff: shoff,
        e_flags: 0,
        e_ehsize: 52,
        e_phentsize: 0,
        e_phnum: 0,
        e_shentsize: 40,
        e_shnum: shnum as u16,
        e_shstrndx: shstrtab_index as u16,
    };
    bytes.pwrite_with(ehdr, 16, Endian::Little).unwrap();

    for (i, s) in all.iter().enumerate() {
        if i == 0 || s.data.is_empty() {
            continue;
        }
        let off = offsets[i] as usize;
        bytes[off..off + s.data.len()].copy_from_slice(&s.data);
    }
    let off = shstrtab_offset as usize;
    bytes[off..off + shstrtab_data.len()].copy_from_slice(&shstrtab_data);

    for (i, s) in all.iter().enumerate() {
        let shdr = Shdr {
            sh_name: name_offsets[i],
            sh_type: s.sh_type,
            sh_flags: s.sh_flags,
            sh_addr: 0,
            sh_offset: offsets[i],
            sh_size: s.data.len() as u32,
            sh_link: s.sh_link,
            sh_info: s.sh_info,
            sh_addralign: s.sh_addralign,
            sh_entsize: s.sh_entsize,
        };
        bytes.pwrite_with(shdr, shoff as usize + i * 40, Endian::Little).unwrap();
    }
    let shdr = Shdr {
        sh_name: shstrtab_name_off,
        sh_type: SHT_STRTAB,
        sh_flags: 0,
        sh_addr: 0,
        sh_offset: shstrtab_offset,
        sh_size: shstrtab_data.len() as u32,
        sh_link: 0,
        sh_info: 0,
        sh_addralign: 1,
        sh_entsize: 0,
    };
    bytes.pwrite_with(shdr, shoff as usize + shstrtab_index * 40, Endian::Little).unwrap();

    bytes
}

fn arm_target() -> Target {
    Target::new(EM_ARM, 0, 0, true, true, 0x2000_0000, 2, 2, 0).unwrap()
}

#[test]
fn single_object_exports_a_thumb_function_symbol() {
    let (strtab_data, name_offs) = strtab(&["foo"]);
    let mut symtab_data = sym_bytes(0, 0, 0, 0, 0); // null entry
    symtab_data.extend(sym_bytes(name_offs[0], 0, 4, st_info(STB_GLOBAL, STT_FUNC), 1));

    let text = sec(".text", SHT_PROGBITS, SHF_ALLOC | SHF_EXECINSTR, vec![0x00, 0xbf, 0x00, 0xbf]);
    let mut symtab = sec(".symtab", SHT_SYMTAB, 0, symtab_data);
    symtab.sh_link = 3; // .strtab index (computed below)
    symtab.sh_entsize = 16;
    let strtab_sec = sec(".strtab", SHT_STRTAB, 0, strtab_data);

    let bytes = build_elf(ET_REL, EM_ARM, vec![text, symtab, strtab_sec]);
    let fs = SliceFileSystem::new("a.o", &bytes);
    let mut image = Image::new(arm_target()).unwrap();
    image.load(&fs, "a.o").unwrap();

    let idx = image.find_symbol("foo", BIND_GLOBAL).expect("foo must be exported");
    let sym = image.symbol(idx).unwrap();
    assert!(sym.is_defined());
    assert_eq!(sym.ra.unwrap() & 1, 1, "Thumb function symbol must carry the interworking bit");
    assert_eq!(sym.ea.unwrap() & 1, 0, "ea itself must stay 2-byte aligned");
}

#[test]
fn strong_undefined_symbol_remains_undefined_but_exported() {
    // Scenario 3: an object referencing a symbol no loaded object
    // defines must still load, leaving a `bit_export`ed entry in the
    // image's symbol table with no address.
    let (strtab_data, name_offs) = strtab(&["bar"]);
    let mut symtab_data = sym_bytes(0, 0, 0, 0, 0);
    symtab_data.extend(sym_bytes(name_offs[0], 0, 0, st_info(STB_GLOBAL, STT_NOTYPE), SHN_UNDEF));

    let mut symtab = sec(".symtab", SHT_SYMTAB, 0, symtab_data);
    symtab.sh_link = 2; // .strtab is index 2: [NULL, .symtab, .strtab]
    symtab.sh_entsize = 16;
    let strtab_sec = sec(".strtab", SHT_STRTAB, 0, strtab_data);

    let bytes = build_elf(ET_REL, EM_ARM, vec![symtab, strtab_sec]);
    let fs = SliceFileSystem::new("b.o", &bytes);
    let mut image = Image::new(arm_target()).unwrap();
    image.load(&fs, "b.o").unwrap();

    let idx = image.find_symbol("bar", BIND_GLOBAL).expect("undefined reference stays findable");
    let sym = image.symbol(idx).unwrap();
    assert_eq!(sym.ea, None);
    assert_eq!(sym.ra, None);
    assert_ne!(sym.flags & uld::symbol::BIT_EXPORT, 0);
}

#[test]
fn weak_undefined_symbol_does_not_abort_the_load() {
    let (strtab_data, name_offs) = strtab(&["maybe"]);
    let mut symtab_data = sym_bytes(0, 0, 0, 0, 0);
    symtab_data.extend(sym_bytes(name_offs[0], 0, 0, st_info(STB_WEAK, STT_NOTYPE), SHN_UNDEF));

    let mut symtab = sec(".symtab", SHT_SYMTAB, 0, symtab_data);
    symtab.sh_link = 2; // .strtab is index 2: [NULL, .symtab, .strtab]
    symtab.sh_entsize = 16;
    let strtab_sec = sec(".strtab", SHT_STRTAB, 0, strtab_data);

    let bytes = build_elf(ET_REL, EM_ARM, vec![symtab, strtab_sec]);
    let fs = SliceFileSystem::new("c.o", &bytes);
    let mut image = Image::new(arm_target()).unwrap();
    image.load(&fs, "c.o").unwrap();

    let idx = image.find_symbol("maybe", BIND_ANY).expect("weak undefined reference stays findable");
    let sym = image.symbol(idx).unwrap();
    assert_eq!(sym.ea, None);
}

#[test]
fn abs8_relocation_against_a_real_address_overflows() {
    // A heap-backed `ea` is, in practice, never smaller than 256, so an
    // ABS8 relocation against any real symbol address is a reliable
    // way to exercise the reach check without hand-crafting a specific
    // out-of-range displacement.
    let (strtab_data, name_offs) = strtab(&["here"]);
    let mut symtab_data = sym_bytes(0, 0, 0, 0, 0);
    symtab_data.extend(sym_bytes(name_offs[0], 0, 0, st_info(STB_LOCAL, STT_NOTYPE), 1));

    let text = sec(".text", SHT_PROGBITS, SHF_ALLOC | SHF_EXECINSTR, vec![0u8; 4]);
    let mut symtab = sec(".symtab", SHT_SYMTAB, 0, symtab_data);
    symtab.sh_link = 3;
    symtab.sh_entsize = 16;
    let strtab_sec = sec(".strtab", SHT_STRTAB, 0, strtab_data);

    let mut rel = sec(".rel.text", SHT_REL, 0, rel_bytes(0, 1, R_ARM_ABS8));
    rel.sh_link = 2; // .symtab index
    rel.sh_info = 1; // .text index
    rel.sh_entsize = 8;

    let bytes = build_elf(ET_REL, EM_ARM, vec![text, symtab, strtab_sec, rel]);
    let fs = SliceFileSystem::new("d.o", &bytes);
    let mut image = Image::new(arm_target()).unwrap();
    let err = image.load(&fs, "d.o").unwrap_err();
    assert_eq!(err.kind(), uld::error::Kind::NoReach);
}

#[test]
fn non_relocatable_object_is_rejected() {
    let mut bytes = vec![0u8; 52];
    bytes[0..4].copy_from_slice(ELFMAG);
    bytes[4] = ELFCLASS32;
    bytes[5] = ELFDATA2LSB;
    bytes[6] = EV_CURRENT;
    let ehdr = Ehdr {
        e_type: ET_EXEC,
        e_machine: EM_ARM,
        e_version: 1,
        e_entry: 0,
        e_phoff: 0,
        e_shoff: 0,
        e_flags: 0,
        e_ehsize: 52,
        e_phentsize: 0,
        e_phnum: 0,
        e_shentsize: 0,
        e_shnum: 0,
        e_shstrndx: 0,
    };
    bytes.pwrite_with(ehdr, 16, Endian::Little).unwrap();

    let fs = SliceFileSystem::new("e.o", &bytes);
    let mut image = Image::new(arm_target()).unwrap();
    let err = image.load(&fs, "e.o").unwrap_err();
    assert_eq!(err.kind(), uld::error::Kind::InvalidTarget);
}

#[test]
fn archive_file_is_accepted_as_a_no_op() {
    let mut bytes = uld::archive::ARMAG.to_vec();
    bytes.extend_from_slice(b"not a real archive member table");

    let fs = SliceFileSystem::new("f.a", &bytes);
    let mut image = Image::new(arm_target()).unwrap();
    image.load(&fs, "f.a").unwrap();
    assert_eq!(image.get_segment_count(), 5, "an archive load must not mutate the image");
}

#[test]
fn cross_object_abs32_relocation_resolves_through_the_image_symbol_table() {
    // Object A defines a strong global object symbol in `.data`.
    let (a_strtab, a_names) = strtab(&["shared"]);
    let mut a_symtab = sym_bytes(0, 0, 0, 0, 0);
    a_symtab.extend(sym_bytes(a_names[0], 0, 4, st_info(STB_GLOBAL, STT_OBJECT), 1));

    let a_data = sec(".data", SHT_PROGBITS, SHF_ALLOC | SHF_WRITE, vec![0u8; 4]);
    let mut a_symtab_sec = sec(".symtab", SHT_SYMTAB, 0, a_symtab);
    a_symtab_sec.sh_link = 2;
    a_symtab_sec.sh_entsize = 16;
    let a_strtab_sec = sec(".strtab", SHT_STRTAB, 0, a_strtab);

    let a_bytes = build_elf(ET_REL, EM_ARM, vec![a_data, a_symtab_sec, a_strtab_sec]);

    // Object B references it as an undefined global and patches one
    // word of its own `.data` with `S + A`.
    let (b_strtab, b_names) = strtab(&["shared"]);
    let mut b_symtab = sym_bytes(0, 0, 0, 0, 0);
    b_symtab.extend(sym_bytes(b_names[0], 0, 0, st_info(STB_GLOBAL, STT_NOTYPE), SHN_UNDEF));

    let b_data = sec(".data", SHT_PROGBITS, SHF_ALLOC | SHF_WRITE, vec![0u8; 4]);
    let mut b_symtab_sec = sec(".symtab", SHT_SYMTAB, 0, b_symtab);
    b_symtab_sec.sh_link = 2;
    b_symtab_sec.sh_entsize = 16;
    let b_strtab_sec = sec(".strtab", SHT_STRTAB, 0, b_strtab);
    let mut b_rel = sec(".rel.data", SHT_REL, 0, rel_bytes(0, 1, R_ARM_ABS32));
    b_rel.sh_link = 2; // .symtab index: [NULL, .data, .symtab, .strtab, .rel.data]
    b_rel.sh_info = 1; // .data index
    b_rel.sh_entsize = 8;

    let b_bytes = build_elf(ET_REL, EM_ARM, vec![b_data, b_symtab_sec, b_strtab_sec, b_rel]);

    let fs_a = SliceFileSystem::new("a.o", &a_bytes);
    let fs_b = SliceFileSystem::new("b.o", &b_bytes);
    let mut image = Image::new(arm_target()).unwrap();
    image.load(&fs_a, "a.o").unwrap();
    image.load(&fs_b, "b.o").unwrap();

    let idx = image.find_symbol("shared", BIND_ANY).unwrap();
    let expected = image.symbol(idx).unwrap().ra.unwrap();

    // The patched word lives in whichever `.data` slot object B's
    // relocation targeted; read it back through the segment that
    // owns B's `.data` section - the default `.data` segment both
    // objects' sections were merged into.
    let data_segment = image.get_segment_by_name(".data").unwrap();
    let segment = image.get_segment_by_index(data_segment).unwrap();
    // B's `.data` bytes were appended after A's within the shared
    // segment, i.e. at offset 4.
    let patched = segment.bytes_at(4, 4).unwrap();
    assert_eq!(u32::from_le_bytes(patched.try_into().unwrap()), expected);
}
