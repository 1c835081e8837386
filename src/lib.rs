//! Reader for the Vertica native binary export format.
//!
//! A native file is an 11-byte signature, a header describing the width of
//! every column, and a stream of rows. Each row carries its length, a null
//! bitmap and the non-null column payloads. [`NativeReader`] counts rows and
//! re-emits the head, the tail or every row, optionally with the columns
//! reordered.

pub mod error;
pub mod logger;
pub mod parser;
pub mod reader;

pub use crate::error::{Error, Result, Section};
pub use parser::{ColumnDefinitions, ColumnOrder, ColumnWidth, Row, RowDecoder};
pub use reader::{
    Concatenation, Fragment, NativeReader, Operation, Outcome, RowIter, ScanOptions, TailStrategy,
};

/// Counts the rows of a native stream.
///
/// # Errors
///
/// Returns an error if the signature does not match or a row is truncated.
pub fn count_rows<R: std::io::Read>(reader: R) -> Result<u64> {
    NativeReader::new(reader).count()
}
