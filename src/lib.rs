//! `uld`: a runtime dynamic loader for 32-bit ELF relocatable object files,
//! targeting small embedded hosts (e.g. an ARM Cortex-M with on-chip SRAM
//! and a FAT-like file system).
//!
//! Given one or more ELF `.o` files, [`Image::load`](image::Image::load)
//! reads their section, symbol, and relocation tables; allocates segments
//! inside host RAM according to section attributes; copies program bits
//! into those segments; resolves cross-object symbol references; and
//! applies ARM relocations to patch instructions and data in place.
//!
//! The crate is organised as five cooperating components, leaves first:
//! a buffered [`cache::ByteCache`] (C1), the [`elf32`] reader built on it
//! (C2), the paged [`arena`] allocator (C3), the [`image`]/[`segment`]
//! layer built on the arena (C4), and the relocation engine in
//! [`factory`]/[`reloc`] (C5).

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod error;
pub mod fs;
pub mod target;
pub mod cache;

#[cfg(feature = "alloc")]
pub mod arena;
#[cfg(feature = "alloc")]
pub mod elf32;
#[cfg(feature = "alloc")]
pub mod symbol;
#[cfg(feature = "alloc")]
pub mod segment;
#[cfg(feature = "alloc")]
mod factory;
#[cfg(feature = "alloc")]
pub mod reloc;
#[cfg(feature = "alloc")]
pub mod image;
#[cfg(feature = "archive")]
pub mod archive;

#[cfg(feature = "alloc")]
pub use crate::image::Image;
pub use crate::error::{Error, Kind, Result};
pub use crate::target::Target;
