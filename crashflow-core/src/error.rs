/*!
Specialized `Error` and `Result` types for crashflow.
*/

use std::prelude::v1::*;
use std::{convert, fmt, result};

#[cfg(feature = "std")]
use std::error;

/// Specialized `Error` type for crashflow errors.
///
/// The writer and the verifier surface every failure through this closed
/// set; nothing in the crash path unwinds.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Error {
    /// Generic error type containing a string
    Other(&'static str),
    /// Invalid argument.
    ///
    /// An argument passed to a public entry point was not usable.
    InvalidArgument,
    /// Not found.
    ///
    /// No core dump image or storage region is present.
    NotFound,
    /// Invalid size.
    ///
    /// The declared image size lies outside the bounds of its storage region.
    InvalidSize,
    /// Invalid checksum.
    ///
    /// The stored checksum or digest does not match the image contents.
    InvalidChecksum,
    /// Not supported.
    ///
    /// The requested operation is not available on this backend.
    NotSupported,
    /// Sink error
    ///
    /// Catch-all for failures of the write backend.
    Sink(&'static str),
    /// Storage error
    ///
    /// Catch-all for failures of the storage backend.
    Storage(&'static str),
    /// Memory error
    ///
    /// A range of target memory could not be read.
    Memory(&'static str),
}

/// Convert from &str to error
impl convert::From<&'static str> for Error {
    fn from(error: &'static str) -> Self {
        Error::Other(error)
    }
}

impl Error {
    /// Returns a tuple representing the error description and its string value.
    pub fn to_str_pair(self) -> (&'static str, Option<&'static str>) {
        match self {
            Error::Other(e) => ("other error", Some(e)),
            Error::InvalidArgument => ("invalid argument", None),
            Error::NotFound => ("not found", None),
            Error::InvalidSize => ("invalid image size", None),
            Error::InvalidChecksum => ("invalid checksum", None),
            Error::NotSupported => ("not supported", None),
            Error::Sink(e) => ("sink error", Some(e)),
            Error::Storage(e) => ("storage error", Some(e)),
            Error::Memory(e) => ("memory error", Some(e)),
        }
    }

    /// Returns a simple string representation of the error.
    pub fn to_str(self) -> &'static str {
        self.to_str_pair().0
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let (desc, value) = self.to_str_pair();

        if let Some(value) = value {
            write!(f, "{}: {}", desc, value)
        } else {
            f.write_str(desc)
        }
    }
}

#[cfg(feature = "std")]
impl error::Error for Error {
    fn description(&self) -> &str {
        self.to_str()
    }
}

/// Specialized `Result` type for crashflow results.
pub type Result<T> = result::Result<T, Error>;
