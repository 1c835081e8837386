use std::borrow::Cow;
use std::io::{self, Read};
use std::ops::Range;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::{Error, Result, Section};

use super::bitmap::{decode_bitmap_into, read_bitmap, reencode_bitmap};
use super::header::{ColumnDefinitions, ColumnWidth};

/// A decoded row with column payloads in declared order.
///
/// Variable-width payloads are stored without their length prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    /// Row length as recorded in the file. Never recomputed.
    pub row_length: u32,
    pub columns: Vec<Option<Vec<u8>>>,
}

impl Row {
    #[must_use]
    pub fn is_null(&self, column: usize) -> bool {
        self.columns[column].is_none()
    }

    #[must_use]
    pub fn value(&self, column: usize) -> Option<&[u8]> {
        self.columns[column].as_deref()
    }
}

/// Streams row records out of a native file body.
///
/// The decoder keeps its scratch buffers between rows, so one instance should
/// be reused for a whole scan. End of stream exactly at a row boundary is
/// reported as `Ok(false)` / `Ok(None)`; any other short read is an error.
pub struct RowDecoder<'a> {
    definitions: &'a ColumnDefinitions,
    reorders: bool,
    rows_read: u64,
    flags: Vec<bool>,
    scratch: Vec<u8>,
    spans: Vec<Option<Range<usize>>>,
}

impl<'a> RowDecoder<'a> {
    #[must_use]
    pub fn new(definitions: &'a ColumnDefinitions) -> Self {
        let column_count = definitions.column_count();
        let reorders = definitions
            .column_order()
            .is_some_and(|order| !order.is_identity());
        Self {
            definitions,
            reorders,
            rows_read: 0,
            flags: Vec::with_capacity(column_count),
            scratch: Vec::new(),
            spans: Vec::with_capacity(column_count),
        }
    }

    #[must_use]
    pub const fn definitions(&self) -> &'a ColumnDefinitions {
        self.definitions
    }

    /// Number of complete rows consumed so far.
    #[must_use]
    pub const fn rows_read(&self) -> u64 {
        self.rows_read
    }

    /// Decodes the next row and appends its output record to `out`: the
    /// original row length, the bitmap and the non-null payloads, all in
    /// output column order.
    ///
    /// Returns `false` without touching `out` when the stream ends cleanly.
    ///
    /// Payloads are gathered by output position: slot `p` holds the payload
    /// of original column `order.source_of(p)`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Truncated`] if the row is incomplete.
    #[cfg_attr(feature = "hotpath", hotpath::measure)]
    pub fn decode_into<R: Read>(&mut self, reader: &mut R, out: &mut Vec<u8>) -> Result<bool> {
        let row = self.rows_read;
        let Some(length) = read_row_length(reader, row)? else {
            return Ok(false);
        };
        let column_count = self.definitions.column_count();
        let bitmap = read_bitmap(reader, column_count, row)?;
        decode_bitmap_into(&bitmap, column_count, &mut self.flags);

        let start = out.len();
        out.extend_from_slice(&length);

        let result = match self.definitions.column_order() {
            Some(order) if self.reorders => {
                out.extend_from_slice(&reencode_bitmap(&self.flags, order));
                self.read_payloads_reordered(reader, out, row)
            }
            _ => {
                out.extend_from_slice(&bitmap);
                self.read_payloads_in_place(reader, out, row)
            }
        };
        if let Err(err) = result {
            out.truncate(start);
            return Err(err);
        }

        self.rows_read += 1;
        Ok(true)
    }

    /// Reads payloads in declared order into scratch, then emits them in
    /// output order.
    fn read_payloads_reordered<R: Read>(
        &mut self,
        reader: &mut R,
        out: &mut Vec<u8>,
        row: u64,
    ) -> Result<()> {
        let definitions = self.definitions;
        let Some(order) = definitions.column_order() else {
            return self.read_payloads_in_place(reader, out, row);
        };

        self.scratch.clear();
        self.spans.clear();
        for (column, null) in self.flags.iter().enumerate() {
            if *null {
                self.spans.push(None);
                continue;
            }
            let begin = self.scratch.len();
            read_column(
                reader,
                definitions.width(column),
                &mut self.scratch,
                Section::Column { row, index: column },
            )?;
            self.spans.push(Some(begin..self.scratch.len()));
        }
        for position in 0..order.len() {
            if let Some(span) = &self.spans[order.source_of(position)] {
                out.extend_from_slice(&self.scratch[span.clone()]);
            }
        }
        Ok(())
    }

    fn read_payloads_in_place<R: Read>(
        &self,
        reader: &mut R,
        out: &mut Vec<u8>,
        row: u64,
    ) -> Result<()> {
        for (column, null) in self.flags.iter().enumerate() {
            if *null {
                continue;
            }
            read_column(
                reader,
                self.definitions.width(column),
                out,
                Section::Column { row, index: column },
            )?;
        }
        Ok(())
    }

    /// Consumes the next row without producing output.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Truncated`] if the row is incomplete.
    #[cfg_attr(feature = "hotpath", hotpath::measure)]
    pub fn skip<R: Read>(&mut self, reader: &mut R) -> Result<bool> {
        let row = self.rows_read;
        if read_row_length(reader, row)?.is_none() {
            return Ok(false);
        }
        let column_count = self.definitions.column_count();
        let bitmap = read_bitmap(reader, column_count, row)?;
        decode_bitmap_into(&bitmap, column_count, &mut self.flags);

        for column in 0..column_count {
            if self.flags[column] {
                continue;
            }
            let section = Section::Column { row, index: column };
            let width = column_payload_width(reader, self.definitions.width(column), section)?;
            let skipped = io::copy(&mut reader.by_ref().take(u64::from(width)), &mut io::sink())
                .map_err(|err| Error::from_read(err, section))?;
            if skipped != u64::from(width) {
                return Err(short_payload(section, width, skipped));
            }
        }

        self.rows_read += 1;
        Ok(true)
    }

    /// Decodes the next row into its columns, in declared order. Any column
    /// order attached to the definitions is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Truncated`] if the row is incomplete.
    pub fn read_row<R: Read>(&mut self, reader: &mut R) -> Result<Option<Row>> {
        let row = self.rows_read;
        let Some(length) = read_row_length(reader, row)? else {
            return Ok(None);
        };
        let column_count = self.definitions.column_count();
        let bitmap = read_bitmap(reader, column_count, row)?;
        decode_bitmap_into(&bitmap, column_count, &mut self.flags);

        let mut columns = Vec::with_capacity(column_count);
        for column in 0..column_count {
            if self.flags[column] {
                columns.push(None);
                continue;
            }
            let section = Section::Column { row, index: column };
            let width = column_payload_width(reader, self.definitions.width(column), section)?;
            let mut value = Vec::new();
            read_exact_into(reader, &mut value, width, section)?;
            columns.push(Some(value));
        }

        self.rows_read += 1;
        Ok(Some(Row {
            row_length: u32::from_le_bytes(length),
            columns,
        }))
    }
}

/// Decodes a single row record; see [`RowDecoder::decode_into`].
///
/// # Errors
///
/// Returns [`Error::Truncated`] if the row is incomplete.
pub fn decode_row<R: Read>(
    reader: &mut R,
    definitions: &ColumnDefinitions,
) -> Result<Option<Vec<u8>>> {
    let mut out = Vec::new();
    let mut decoder = RowDecoder::new(definitions);
    Ok(decoder.decode_into(reader, &mut out)?.then_some(out))
}

/// Reads the 4-byte row length. `None` means the stream ended before the
/// first byte; a partial length is a truncation.
fn read_row_length<R: Read>(reader: &mut R, row: u64) -> Result<Option<[u8; 4]>> {
    let mut buf = [0u8; 4];
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(Error::Io(err)),
        }
    }
    match filled {
        0 => Ok(None),
        4 => Ok(Some(buf)),
        _ => Err(Error::Truncated {
            section: Section::Row { index: row },
            details: Cow::Owned(format!("row length cut short after {filled} bytes")),
        }),
    }
}

/// Width of the payload that follows, reading the per-row prefix of a
/// variable-width column.
fn column_payload_width<R: Read>(
    reader: &mut R,
    width: ColumnWidth,
    section: Section,
) -> Result<u32> {
    match width {
        ColumnWidth::Fixed(width) => Ok(width),
        ColumnWidth::Variable => reader
            .read_u32::<LittleEndian>()
            .map_err(|err| Error::from_read(err, section)),
    }
}

/// Appends one column's output slot to `out`: the payload, preceded by its
/// length for variable-width columns.
fn read_column<R: Read>(
    reader: &mut R,
    width: ColumnWidth,
    out: &mut Vec<u8>,
    section: Section,
) -> Result<()> {
    let payload_width = column_payload_width(reader, width, section)?;
    if width.is_variable() {
        out.extend_from_slice(&payload_width.to_le_bytes());
    }
    read_exact_into(reader, out, payload_width, section)
}

fn read_exact_into<R: Read>(
    reader: &mut R,
    out: &mut Vec<u8>,
    width: u32,
    section: Section,
) -> Result<()> {
    let read = reader
        .by_ref()
        .take(u64::from(width))
        .read_to_end(out)
        .map_err(|err| Error::from_read(err, section))?;
    let read = u64::try_from(read).unwrap_or(u64::MAX);
    if read == u64::from(width) {
        Ok(())
    } else {
        Err(short_payload(section, width, read))
    }
}

fn short_payload(section: Section, width: u32, read: u64) -> Error {
    Error::Truncated {
        section,
        details: Cow::Owned(format!("expected {width} payload bytes, found {read}")),
    }
}
