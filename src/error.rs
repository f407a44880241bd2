//! Error taxonomy shared by every component of the loader.
//!
//! Mirrors the small integer error codes of the original collaborator
//! (`e_memory`, `e_access`, ...) as a proper `Kind` enum, wrapped in an
//! [`Error`] that carries an optional message and implements
//! `core::error::Error` so callers outside this crate can compose it with
//! `?` the same way they would any other error type.

use core::fmt;

#[cfg(feature = "alloc")]
use alloc::string::String;

/// The kind of failure that aborted an operation.
///
/// Each variant corresponds to one of the fatal conditions in the
/// relocation engine's failure semantics: a failure in any phase stops
/// further work on the current object, but objects already `Done` remain
/// in the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// Arena pool exhausted (page allocation failed).
    Memory,
    /// Short read or seek beyond the bounds of a section/file.
    Access,
    /// A binding or relocation references an unknown symbol.
    NoSym,
    /// Relocation type is unimplemented or unrecognised.
    NoRel,
    /// Computed displacement does not fit the field width.
    NoReach,
    /// A symbol cannot be defined (allocation failure downstream of the symbol table).
    NoDef,
    /// Strong redefinition of an already-defined global symbol.
    Redef,
    /// `SHN_ABS`/`SHN_COMMON` symbol, or a section with no backing segment.
    Fault,
    /// The engine was asked to run on a big-endian host.
    InvalidHost,
    /// ELF class or machine type does not match the configured `Target`.
    InvalidTarget,
}

impl Kind {
    fn as_str(self) -> &'static str {
        match self {
            Kind::Memory => "arena out of memory",
            Kind::Access => "short read or out-of-bounds access",
            Kind::NoSym => "reference to unknown symbol",
            Kind::NoRel => "relocation type not implemented",
            Kind::NoReach => "relocation displacement out of range",
            Kind::NoDef => "symbol could not be defined",
            Kind::Redef => "symbol redefinition",
            Kind::Fault => "symbol cannot be mapped to a segment",
            Kind::InvalidHost => "loader requires a little-endian host",
            Kind::InvalidTarget => "object does not match target class or machine type",
        }
    }
}

/// An error produced by the loader, carrying a [`Kind`] and an optional
/// human-readable detail (the symbol name, offending offset, etc.).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    kind: Kind,
    #[cfg(feature = "alloc")]
    detail: Option<String>,
}

impl Error {
    /// Build an error from just a [`Kind`].
    pub fn new(kind: Kind) -> Self {
        Error {
            kind,
            #[cfg(feature = "alloc")]
            detail: None,
        }
    }

    /// Build an error from a [`Kind`] plus a formatted detail message.
    #[cfg(feature = "alloc")]
    pub fn with_detail(kind: Kind, detail: impl Into<String>) -> Self {
        Error {
            kind,
            detail: Some(detail.into()),
        }
    }

    /// The error's [`Kind`].
    pub fn kind(&self) -> Kind {
        self.kind
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        #[cfg(feature = "alloc")]
        if let Some(detail) = &self.detail {
            return write!(f, "{}: {}", self.kind.as_str(), detail);
        }
        write!(f, "{}", self.kind.as_str())
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

#[cfg(not(feature = "std"))]
impl core::error::Error for Error {}

impl From<scroll::Error> for Error {
    fn from(err: scroll::Error) -> Self {
        #[cfg(feature = "alloc")]
        {
            Error::with_detail(Kind::Access, alloc::format!("{err}"))
        }
        #[cfg(not(feature = "alloc"))]
        {
            let _ = err;
            Error::new(Kind::Access)
        }
    }
}

#[cfg(feature = "std")]
impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::with_detail(Kind::Access, alloc::format!("{err}"))
    }
}

/// The crate's result alias.
pub type Result<T> = core::result::Result<T, Error>;
