//! The block file-system collaborator (§6).
//!
//! The loader never touches `std::fs` directly; every byte comes through
//! this trait, so the core stays usable on a host whose only storage is a
//! FAT-like block device. The `std` feature supplies [`StdFileSystem`];
//! tests use [`SliceFileSystem`] over an in-memory buffer.

use crate::error::{Error, Kind, Result};

/// Random-access byte source for one named file.
pub trait FileSystem {
    /// An open file handle.
    type Handle;

    /// Open `name` for reading. Only `OPEN_EXISTING | READ` semantics are
    /// used by this crate; there is no write path.
    fn open(&self, name: &str) -> Result<Self::Handle>;

    /// Read up to `dst.len()` bytes, returning the number actually read.
    /// A short read (including zero at end-of-file) is not an error at
    /// this layer.
    fn read(&self, handle: &mut Self::Handle, dst: &mut [u8]) -> Result<usize>;

    /// Seek to an absolute byte position.
    fn lseek(&self, handle: &mut Self::Handle, abs_pos: u64) -> Result<()>;

    /// Close the handle. Infallible by contract; errors are swallowed the
    /// way a destructor would.
    fn close(&self, handle: Self::Handle);
}

/// A [`FileSystem`] backed by `std::fs::File`, keyed by a fixed root
/// directory (the embedded target's FAT volume is always flat in the
/// scenarios this crate targets, but an absolute-path root keeps the
/// trait usable against a real filesystem during development).
#[cfg(feature = "std")]
pub struct StdFileSystem;

#[cfg(feature = "std")]
impl FileSystem for StdFileSystem {
    type Handle = std::fs::File;

    fn open(&self, name: &str) -> Result<Self::Handle> {
        std::fs::File::open(name).map_err(Error::from)
    }

    fn read(&self, handle: &mut Self::Handle, dst: &mut [u8]) -> Result<usize> {
        use std::io::Read;
        handle.read(dst).map_err(Error::from)
    }

    fn lseek(&self, handle: &mut Self::Handle, abs_pos: u64) -> Result<()> {
        use std::io::{Seek, SeekFrom};
        handle.seek(SeekFrom::Start(abs_pos)).map(|_| ()).map_err(Error::from)
    }

    fn close(&self, handle: Self::Handle) {
        drop(handle);
    }
}

/// An in-memory [`FileSystem`] over a single named byte slice, used by
/// tests to exercise the loader without touching real storage.
#[cfg(any(test, feature = "std"))]
pub struct SliceFileSystem<'a> {
    name: &'a str,
    bytes: &'a [u8],
}

#[cfg(any(test, feature = "std"))]
impl<'a> SliceFileSystem<'a> {
    pub fn new(name: &'a str, bytes: &'a [u8]) -> Self {
        SliceFileSystem { name, bytes }
    }
}

#[cfg(any(test, feature = "std"))]
impl<'a> FileSystem for SliceFileSystem<'a> {
    type Handle = usize;

    fn open(&self, name: &str) -> Result<Self::Handle> {
        if name == self.name {
            Ok(0)
        } else {
            Err(Error::new(Kind::Access))
        }
    }

    fn read(&self, handle: &mut Self::Handle, dst: &mut [u8]) -> Result<usize> {
        let pos = *handle;
        if pos >= self.bytes.len() {
            return Ok(0);
        }
        let n = dst.len().min(self.bytes.len() - pos);
        dst[..n].copy_from_slice(&self.bytes[pos..pos + n]);
        *handle = pos + n;
        Ok(n)
    }

    fn lseek(&self, handle: &mut Self::Handle, abs_pos: u64) -> Result<()> {
        *handle = abs_pos as usize;
        Ok(())
    }

    fn close(&self, _handle: Self::Handle) {}
}
