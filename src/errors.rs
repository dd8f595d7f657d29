//! Error types shared by the whole crate
//!
//! Every fallible operation returns [`Result`], and the [`Error`] enum
//! mirrors the failure classes of the library: OS-level file errors,
//! structural format violations, invalid indices, property type
//! mismatches, math failures and construction-time invariant violations.

use thiserror::Error;

/// Error type for all molio operations
#[derive(Error, Debug)]
pub enum Error {
    /// The OS could not open, read or write a file
    #[error("file error: {0}")]
    File(#[from] std::io::Error),

    /// A file violates the structure of its format
    #[error("format error: {0}")]
    Format(String),

    /// An atom, frame or step index is invalid
    #[error("out of bounds: {0}")]
    OutOfBounds(String),

    /// A property was accessed as the wrong variant, or is missing
    #[error("property error: {0}")]
    Property(String),

    /// A mathematical operation failed (e.g. non-invertible matrix)
    #[error("math error: {0}")]
    Math(String),

    /// A selection string is invalid (reserved for selection engines
    /// layered on top of this crate)
    #[error("selection error: {0}")]
    Selection(String),

    /// The configuration is invalid or could not be loaded
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A construction-time invariant was violated
    #[error("{0}")]
    Invalid(String),
}

/// Result type for all molio operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Build a `Format` error from anything displayable
    pub(crate) fn format(message: impl Into<String>) -> Error {
        Error::Format(message.into())
    }

    /// Build an `OutOfBounds` error from anything displayable
    pub(crate) fn out_of_bounds(message: impl Into<String>) -> Error {
        Error::OutOfBounds(message.into())
    }

    /// Build an `Invalid` error from anything displayable
    pub(crate) fn invalid(message: impl Into<String>) -> Error {
        Error::Invalid(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let error = Error::format("missing 'atom' dimension");
        assert_eq!(error.to_string(), "format error: missing 'atom' dimension");

        let error = Error::out_of_bounds("index 12 in a frame with 3 atoms");
        assert_eq!(error.to_string(), "out of bounds: index 12 in a frame with 3 atoms");

        let error = Error::invalid("can not have a bond between an atom and itself");
        assert_eq!(error.to_string(), "can not have a bond between an atom and itself");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let error: Error = io.into();
        assert!(matches!(error, Error::File(_)));
    }
}
