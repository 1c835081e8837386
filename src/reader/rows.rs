use std::io::Read;

use crate::error::Result;
use crate::parser::{ColumnDefinitions, Row, RowDecoder};

/// Iterates decoded rows in declared column order.
pub struct RowIter<'r, R: Read> {
    reader: &'r mut R,
    decoder: RowDecoder<'r>,
    exhausted: bool,
}

impl<'r, R: Read> RowIter<'r, R> {
    pub(super) fn new(reader: &'r mut R, definitions: &'r ColumnDefinitions) -> Self {
        Self {
            reader,
            decoder: RowDecoder::new(definitions),
            exhausted: false,
        }
    }

    #[must_use]
    pub const fn definitions(&self) -> &'r ColumnDefinitions {
        self.decoder.definitions()
    }

    /// Rows decoded so far.
    #[must_use]
    pub const fn rows_read(&self) -> u64 {
        self.decoder.rows_read()
    }

    /// Decodes the next row.
    ///
    /// # Errors
    ///
    /// Returns an error if the row is truncated or the stream fails.
    pub fn try_next(&mut self) -> Result<Option<Row>> {
        if self.exhausted {
            return Ok(None);
        }
        let result = self.decoder.read_row(self.reader);
        if !matches!(result, Ok(Some(_))) {
            self.exhausted = true;
        }
        result
    }
}

impl<R: Read> Iterator for RowIter<'_, R> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        self.try_next().transpose()
    }
}
