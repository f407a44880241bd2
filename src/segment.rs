//! A program-table entry (§4.4): a named, typed, aligned byte arena
//! plus the flags that describe how the host must map it (writable,
//! executable, zero-initialised). Ported from `image/segment.h`'s
//! `segment_t`, minus the real-memory mapping calls - this crate never
//! touches host MMU/MPU registers, only the arena that stands in for
//! the RAM region a real embedded integrator would reserve.

use crate::arena::BytePool;
use crate::error::Result;
use crate::target::Smt;

pub const SEG_WRITE: u32 = 1 << 0;
pub const SEG_EXECUTE: u32 = 1 << 1;
pub const SEG_ZERO_INIT: u32 = 1 << 2;

/// One slot of the image's program table.
pub struct Segment {
    meta: Smt,
    flags: u32,
    store: BytePool,
}

impl Segment {
    pub fn new(meta: Smt, flags: u32, align: u32) -> Self {
        Segment {
            meta,
            flags,
            store: BytePool::new(align),
        }
    }

    pub fn meta(&self) -> Smt {
        self.meta
    }

    pub fn flags(&self) -> u32 {
        self.flags
    }

    pub fn is_writable(&self) -> bool {
        self.flags & SEG_WRITE != 0
    }

    pub fn is_executable(&self) -> bool {
        self.flags & SEG_EXECUTE != 0
    }

    pub fn is_zero_init(&self) -> bool {
        self.flags & SEG_ZERO_INIT != 0
    }

    /// Reserve `size` bytes, returning the logical offset of the
    /// (possibly alignment-padded) first byte.
    pub fn raw_get(&mut self, size: usize) -> Result<usize> {
        self.store.raw_get(size)
    }

    pub fn next_offset(&self) -> usize {
        self.store.table_offset()
    }

    pub fn byte_at(&self, offset: usize) -> Option<u8> {
        self.store.byte_at(offset)
    }

    pub fn bytes_at(&self, offset: usize, len: usize) -> Option<&[u8]> {
        self.store.bytes_at(offset, len)
    }

    pub fn write_at(&mut self, offset: usize, bytes: &[u8]) -> Result<()> {
        self.store.write_at(offset, bytes)
    }

    /// The real host address backing logical `offset`, used to compute
    /// a symbol's `ea` once its section's bytes have been copied in.
    pub fn addr_of(&self, offset: usize) -> Option<usize> {
        self.store.addr_of(offset)
    }
}
