//! Synthetic ELF64 images for tests.
//!
//! One `PT_LOAD` maps the whole file at virtual address zero so dynamic
//! section addresses translate one to one, plus optional `PT_INTERP` and
//! `PT_DYNAMIC` segments carrying a requested interpreter and search hint.
//! The images parse; they do not run.

use std::fs;
use std::path::Path;

const EHDR_SIZE: usize = 64;
const PHDR_SIZE: usize = 56;
const DYN_SIZE: usize = 16;

const PT_LOAD: u32 = 1;
const PT_DYNAMIC: u32 = 2;
const PT_INTERP: u32 = 3;

const DT_NULL: u64 = 0;
const DT_STRTAB: u64 = 5;
const DT_STRSZ: u64 = 10;
const DT_RPATH: u64 = 15;
const DT_RUNPATH: u64 = 29;

pub enum Hint<'a> {
    None,
    Rpath(&'a str),
    Runpath(&'a str),
}

pub fn write_elf(path: &Path, interpreter: Option<&str>, hint: Hint<'_>) {
    fs::write(path, build(interpreter, hint)).unwrap();
}

pub fn build(interpreter: Option<&str>, hint: Hint<'_>) -> Vec<u8> {
    let (hint_tag, hint_value) = match hint {
        Hint::None => (DT_NULL, None),
        Hint::Rpath(value) => (DT_RPATH, Some(value)),
        Hint::Runpath(value) => (DT_RUNPATH, Some(value)),
    };

    let mut phnum = 1;
    if interpreter.is_some() {
        phnum += 1;
    }
    if hint_value.is_some() {
        phnum += 1;
    }

    let mut cursor = EHDR_SIZE + phnum * PHDR_SIZE;

    let interp_off = cursor;
    let interp_len = interpreter.map_or(0, |value| value.len() + 1);
    cursor += interp_len;

    // Leading NUL so string offset 0 stays the empty string.
    let strtab_off = cursor;
    let strtab_len = hint_value.map_or(0, |value| value.len() + 2);
    cursor += strtab_len;

    let dynamic_off = (cursor + 7) & !7;
    let total = if hint_value.is_some() {
        dynamic_off + 4 * DYN_SIZE
    } else {
        cursor
    };

    let mut image = Vec::with_capacity(total);

    image.extend_from_slice(b"\x7fELF");
    image.extend_from_slice(&[2, 1, 1, 0]); // 64-bit, little-endian, current, SysV
    image.extend_from_slice(&[0; 8]);
    u16(&mut image, 2); // ET_EXEC
    u16(&mut image, 62); // EM_X86_64
    u32(&mut image, 1);
    u64(&mut image, 0); // e_entry
    u64(&mut image, EHDR_SIZE as u64);
    u64(&mut image, 0); // e_shoff
    u32(&mut image, 0); // e_flags
    u16(&mut image, EHDR_SIZE as u16);
    u16(&mut image, PHDR_SIZE as u16);
    u16(&mut image, phnum as u16);
    u16(&mut image, 0); // e_shentsize
    u16(&mut image, 0); // e_shnum
    u16(&mut image, 0); // e_shstrndx

    phdr(&mut image, PT_LOAD, 5, 0, total as u64, 0x1000);
    if let Some(value) = interpreter {
        phdr(&mut image, PT_INTERP, 4, interp_off as u64, (value.len() + 1) as u64, 1);
    }
    if hint_value.is_some() {
        phdr(&mut image, PT_DYNAMIC, 6, dynamic_off as u64, (4 * DYN_SIZE) as u64, 8);
    }

    if let Some(value) = interpreter {
        image.extend_from_slice(value.as_bytes());
        image.push(0);
    }
    if let Some(value) = hint_value {
        image.push(0);
        image.extend_from_slice(value.as_bytes());
        image.push(0);

        image.resize(dynamic_off, 0);
        for (tag, entry) in [
            (DT_STRTAB, strtab_off as u64),
            (DT_STRSZ, strtab_len as u64),
            (hint_tag, 1),
            (DT_NULL, 0),
        ] {
            u64(&mut image, tag);
            u64(&mut image, entry);
        }
    }

    assert_eq!(image.len(), total);
    image
}

fn phdr(image: &mut Vec<u8>, p_type: u32, flags: u32, offset: u64, filesz: u64, align: u64) {
    u32(image, p_type);
    u32(image, flags);
    u64(image, offset); // p_offset
    u64(image, offset); // p_vaddr, the whole file is mapped at zero
    u64(image, offset); // p_paddr
    u64(image, filesz);
    u64(image, filesz); // p_memsz
    u64(image, align);
}

fn u16(image: &mut Vec<u8>, value: u16) {
    image.extend_from_slice(&value.to_le_bytes());
}

fn u32(image: &mut Vec<u8>, value: u32) {
    image.extend_from_slice(&value.to_le_bytes());
}

fn u64(image: &mut Vec<u8>, value: u64) {
    image.extend_from_slice(&value.to_le_bytes());
}
