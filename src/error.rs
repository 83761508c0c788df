//! Error taxonomy surfaced to the host.
//!
//! Mirrors the shape of [`crate::storage`]'s error types: a small `enum`
//! that's `Debug` everywhere and only grows a `std::error::Error` impl
//! behind the `std` feature, the way the teacher crate's `using_std!`
//! macro gates its error impls.

use core::fmt::{self, Debug, Display};

/// Everything that can go wrong while mounting a volume or resolving a
/// path, parameterized over the block device's own error type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error<E> {
    /// BPB validation failure, first-FAT sentinel mismatch, invalid
    /// cluster number during a chain walk, or insufficient cluster count.
    BadFilesystem(&'static str),
    /// Path traversal through a non-directory, or `open` on a directory.
    BadFileType(&'static str),
    /// Directory scan reached end-of-directory without a match and no
    /// listing hook was active.
    FileNotFound,
    /// Propagated verbatim from the block device.
    Disk(E),
}

impl<E: Debug> Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BadFilesystem(why) => write!(f, "bad filesystem: {}", why),
            Error::BadFileType(why) => write!(f, "bad file type: {}", why),
            Error::FileNotFound => write!(f, "file not found"),
            Error::Disk(e) => write!(f, "disk error: {:?}", e),
        }
    }
}

#[cfg(feature = "std")]
impl<E: Debug> std::error::Error for Error<E> {}
