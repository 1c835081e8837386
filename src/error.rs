use std::borrow::Cow;
use std::fmt;
use std::io;

/// Result type used across the native file reader.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced while scanning or re-emitting a native file.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O failure while reading from the input stream.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// The first bytes of the stream are not the native file signature.
    #[error("invalid file signature")]
    InvalidSignature,

    /// The stream ended inside a fixed-size field.
    #[error("truncated native file while reading {section}: {details}")]
    Truncated {
        section: Section,
        details: Cow<'static, str>,
    },

    /// Column definitions that cannot be represented in the format.
    #[error("invalid column definitions: {details}")]
    InvalidHeader { details: Cow<'static, str> },

    /// A column reorder mapping is not a permutation of the file's columns.
    #[error("invalid column order: {details}")]
    InvalidColumnOrder { details: Cow<'static, str> },

    /// Writing to the output destination failed.
    #[error("write to output failed: {0}")]
    Sink(#[source] io::Error),
}

impl Error {
    /// Classifies a read failure, turning an unexpected EOF into a
    /// [`Error::Truncated`] for `section`.
    pub(crate) fn from_read(err: io::Error, section: Section) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Self::Truncated {
                section,
                details: Cow::from("unexpected end of stream"),
            }
        } else {
            Self::Io(err)
        }
    }

    /// True when this error was caused by a short read.
    #[must_use]
    pub const fn is_truncation(&self) -> bool {
        matches!(self, Self::Truncated { .. })
    }
}

/// Logical part of the file used for diagnostic reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Signature,
    Header,
    Row { index: u64 },
    Column { row: u64, index: usize },
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signature => write!(f, "file signature"),
            Self::Header => write!(f, "column definitions"),
            Self::Row { index } => write!(f, "row {index}"),
            Self::Column { row, index } => write!(f, "column {index} of row {row}"),
        }
    }
}
