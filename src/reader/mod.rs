mod concat;
mod options;
mod rows;
mod tail;
mod window;

use std::borrow::Cow;
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::{Error, Result, Section};
use crate::parser::{
    ColumnDefinitions, ColumnWidth, RowDecoder, expect_signature, write_signature,
};

pub use concat::Concatenation;
pub use options::{ScanOptions, TailStrategy};
pub use rows::RowIter;

use tail::TailBuffer;
use window::RowWindow;

/// A scan requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Count rows; writes nothing.
    Count,
    /// The first N rows.
    Head(u64),
    /// The last N rows.
    Tail(u64),
    /// Every row.
    Cat,
    /// One line per column width, `-1` for variable width.
    PrintHeader,
}

/// What an operation produced. The variant follows from the call made, never
/// from inspecting the data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Count(u64),
    Fragment(Fragment),
    Written { rows: u64 },
}

/// Rows collected in memory together with the definitions they were encoded
/// against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub definitions: ColumnDefinitions,
    pub bytes: Vec<u8>,
    pub rows: u64,
}

impl Fragment {
    /// Writes the fragment, optionally preceded by the signature and the
    /// (possibly reordered) column definitions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Sink`] if the writer fails.
    pub fn write_to<W: Write>(&self, sink: &mut W, with_metadata: bool) -> Result<()> {
        if with_metadata {
            write_signature(sink)?;
            self.definitions.write_to(sink)?;
        }
        sink.write_all(&self.bytes).map_err(Error::Sink)
    }
}

/// Runs scan operations over one native file stream.
///
/// Every operation validates the signature and reads the column definitions
/// from the current stream position, so a reader is normally used for a
/// single operation.
pub struct NativeReader<R> {
    reader: R,
    options: ScanOptions,
    definitions: Option<ColumnDefinitions>,
}

impl NativeReader<BufReader<File>> {
    /// Opens a native file from disk behind a buffered reader.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: Read> NativeReader<R> {
    #[must_use]
    pub const fn new(reader: R) -> Self {
        Self::with_options(reader, ScanOptions::new())
    }

    #[must_use]
    pub const fn with_options(reader: R, options: ScanOptions) -> Self {
        Self {
            reader,
            options,
            definitions: None,
        }
    }

    #[must_use]
    pub const fn options(&self) -> &ScanOptions {
        &self.options
    }

    /// Column definitions read by the most recent operation.
    #[must_use]
    pub const fn definitions(&self) -> Option<&ColumnDefinitions> {
        self.definitions.as_ref()
    }

    pub const fn get_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Validates the signature and reads the column definitions, attaching
    /// the configured column order.
    ///
    /// # Errors
    ///
    /// Returns an error if the signature does not match, the header is
    /// truncated, or the column order does not fit the header.
    pub fn read_definitions(&mut self) -> Result<ColumnDefinitions> {
        self.begin(true)
    }

    fn begin(&mut self, apply_order: bool) -> Result<ColumnDefinitions> {
        self.definitions = None;
        expect_signature(&mut self.reader)?;
        let mut definitions = ColumnDefinitions::read_from(&mut self.reader)?;
        if apply_order {
            definitions = definitions.with_column_order(self.options.column_order())?;
        }
        self.definitions = Some(definitions.clone());
        Ok(definitions)
    }

    /// Counts the rows that follow the header.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream is invalid or a row is truncated.
    pub fn count(&mut self) -> Result<u64> {
        let definitions = self.begin(false)?;
        let mut decoder = RowDecoder::new(&definitions);
        while decoder.skip(&mut self.reader)? {}
        Ok(decoder.rows_read())
    }

    /// Writes up to `rows` leading rows to `sink`, stopping quietly if the
    /// stream has fewer. Returns the number of rows written.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream is invalid, a row is truncated, or the
    /// sink fails.
    pub fn head<W: Write>(&mut self, rows: u64, sink: &mut W) -> Result<u64> {
        let metadata = self.options.writes_metadata();
        self.head_into(Some(rows), sink, metadata).map(|(_, written)| written)
    }

    /// Writes every row to `sink`.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream is invalid, a row is truncated, or the
    /// sink fails.
    pub fn cat<W: Write>(&mut self, sink: &mut W) -> Result<u64> {
        let metadata = self.options.writes_metadata();
        self.head_into(None, sink, metadata).map(|(_, written)| written)
    }

    /// Writes the last `rows` rows using a single forward pass that buffers
    /// the trailing window in memory.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream is invalid, a row is truncated, or the
    /// sink fails.
    pub fn tail_buffered<W: Write>(&mut self, rows: u64, sink: &mut W) -> Result<u64> {
        let metadata = self.options.writes_metadata();
        self.tail_buffered_into(rows, sink, metadata)
            .map(|(_, written)| written)
    }

    /// Writes one line per column with its declared width (`-1` for
    /// variable width), followed by a blank line, in declared order. Rows are
    /// never read and any configured column order is ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream is invalid or the sink fails.
    pub fn print_header<W: Write>(&mut self, sink: &mut W) -> Result<()> {
        let definitions = self.begin(false)?;
        let mut text = Vec::with_capacity(definitions.column_count() * 4 + 1);
        let mut digits = itoa::Buffer::new();
        for &raw in definitions.widths() {
            let width = ColumnWidth::from_raw(raw);
            text.extend_from_slice(digits.format(width.display_value()).as_bytes());
            text.push(b'\n');
        }
        text.push(b'\n');
        sink.write_all(&text).map_err(Error::Sink)
    }

    /// Writes the declared column definitions as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream is invalid or the sink fails.
    pub fn print_header_json<W: Write>(&mut self, sink: &mut W) -> Result<()> {
        let definitions = self.begin(false)?;
        serde_json::to_writer_pretty(&mut *sink, &definitions.summary())
            .map_err(|err| Error::Sink(io::Error::from(err)))?;
        sink.write_all(b"\n").map_err(Error::Sink)
    }

    /// Collects up to `rows` leading rows into a [`Fragment`].
    ///
    /// # Errors
    ///
    /// Returns an error if the stream is invalid or a row is truncated.
    pub fn fragment_head(&mut self, rows: u64) -> Result<Fragment> {
        let mut bytes = Vec::new();
        let (definitions, rows) = self.head_into(Some(rows), &mut bytes, false)?;
        Ok(Fragment {
            definitions,
            bytes,
            rows,
        })
    }

    /// Iterates the rows in declared column order.
    ///
    /// # Errors
    ///
    /// Returns an error if the signature or header cannot be read.
    pub fn rows(&mut self) -> Result<RowIter<'_, R>> {
        let definitions = self.begin(false)?;
        let definitions = &*self.definitions.insert(definitions);
        Ok(RowIter::new(&mut self.reader, definitions))
    }

    /// Runs `operation` without seeking; `Tail` uses the buffered strategy.
    ///
    /// # Errors
    ///
    /// Propagates any error of the underlying operation.
    pub fn run_forward<W: Write>(&mut self, operation: Operation, sink: &mut W) -> Result<Outcome> {
        self.dispatch(operation, sink, Self::tail_buffered)
    }

    /// Like [`Self::run_forward`], but collects rows into a [`Fragment`]
    /// instead of writing them.
    ///
    /// # Errors
    ///
    /// Propagates any error of the underlying operation.
    pub fn collect_forward(&mut self, operation: Operation) -> Result<Outcome> {
        self.gather(operation, |this, rows, sink| this.tail_buffered_into(rows, sink, false))
    }

    fn dispatch<W, T>(&mut self, operation: Operation, sink: &mut W, tail: T) -> Result<Outcome>
    where
        W: Write,
        T: FnOnce(&mut Self, u64, &mut W) -> Result<u64>,
    {
        Ok(match operation {
            Operation::Count => Outcome::Count(self.count()?),
            Operation::Head(rows) => Outcome::Written {
                rows: self.head(rows, sink)?,
            },
            Operation::Tail(rows) => Outcome::Written {
                rows: tail(self, rows, sink)?,
            },
            Operation::Cat => Outcome::Written {
                rows: self.cat(sink)?,
            },
            Operation::PrintHeader => {
                self.print_header(sink)?;
                Outcome::Written { rows: 0 }
            }
        })
    }

    fn gather<T>(&mut self, operation: Operation, tail: T) -> Result<Outcome>
    where
        T: FnOnce(&mut Self, u64, &mut Vec<u8>) -> Result<(ColumnDefinitions, u64)>,
    {
        let mut bytes = Vec::new();
        let (definitions, rows) = match operation {
            Operation::Count => return Ok(Outcome::Count(self.count()?)),
            Operation::Head(rows) => self.head_into(Some(rows), &mut bytes, false)?,
            Operation::Tail(rows) => tail(self, rows, &mut bytes)?,
            Operation::Cat => self.head_into(None, &mut bytes, false)?,
            Operation::PrintHeader => (self.begin(false)?, 0),
        };
        Ok(Outcome::Fragment(Fragment {
            definitions,
            bytes,
            rows,
        }))
    }

    fn write_metadata<W: Write>(definitions: &ColumnDefinitions, sink: &mut W) -> Result<()> {
        write_signature(sink)?;
        definitions.write_to(sink)
    }

    fn head_into<W: Write>(
        &mut self,
        rows: Option<u64>,
        sink: &mut W,
        metadata: bool,
    ) -> Result<(ColumnDefinitions, u64)> {
        let definitions = self.begin(true)?;
        if metadata {
            Self::write_metadata(&definitions, sink)?;
        }
        let window = RowWindow::new(RowDecoder::new(&definitions), 0, rows);
        let written = self.drain(window, sink)?;
        Ok((definitions, written))
    }

    fn tail_buffered_into<W: Write>(
        &mut self,
        rows: u64,
        sink: &mut W,
        metadata: bool,
    ) -> Result<(ColumnDefinitions, u64)> {
        let definitions = self.begin(true)?;
        if metadata {
            Self::write_metadata(&definitions, sink)?;
        }
        let mut decoder = RowDecoder::new(&definitions);
        let mut buffer = TailBuffer::new(rows);
        buffer.fill(&mut decoder, &mut self.reader)?;
        buffer.write_to(sink)?;
        let written = buffer.len();
        Ok((definitions, written))
    }

    #[cfg_attr(feature = "hotpath", hotpath::measure)]
    fn drain<W: Write>(&mut self, mut window: RowWindow<'_>, sink: &mut W) -> Result<u64> {
        let mut record = Vec::new();
        let mut written = 0u64;
        loop {
            record.clear();
            if !window.next_into(&mut self.reader, &mut record)? {
                return Ok(written);
            }
            sink.write_all(&record).map_err(Error::Sink)?;
            written += 1;
        }
    }
}

impl<R: Read + Seek> NativeReader<R> {
    /// Writes the last `rows` rows using the configured [`TailStrategy`].
    /// When `rows` covers the whole file every row is written.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream is invalid, a row is truncated, the
    /// stream cannot be rewound, or the sink fails.
    pub fn tail<W: Write>(&mut self, rows: u64, sink: &mut W) -> Result<u64> {
        let metadata = self.options.writes_metadata();
        self.tail_into(rows, sink, metadata).map(|(_, written)| written)
    }

    /// Collects the last `rows` rows into a [`Fragment`].
    ///
    /// # Errors
    ///
    /// Returns an error if the stream is invalid, a row is truncated, or the
    /// stream cannot be rewound.
    pub fn fragment_tail(&mut self, rows: u64) -> Result<Fragment> {
        let mut bytes = Vec::new();
        let (definitions, rows) = self.tail_into(rows, &mut bytes, false)?;
        Ok(Fragment {
            definitions,
            bytes,
            rows,
        })
    }

    /// Runs `operation`, writing its output to `sink`.
    ///
    /// # Errors
    ///
    /// Propagates any error of the underlying operation.
    pub fn run<W: Write>(&mut self, operation: Operation, sink: &mut W) -> Result<Outcome> {
        self.dispatch(operation, sink, Self::tail)
    }

    /// Runs `operation`, collecting rows into a [`Fragment`]. `Count` still
    /// yields [`Outcome::Count`].
    ///
    /// # Errors
    ///
    /// Propagates any error of the underlying operation.
    pub fn collect(&mut self, operation: Operation) -> Result<Outcome> {
        self.gather(operation, |this, rows, sink| this.tail_into(rows, sink, false))
    }

    fn tail_into<W: Write>(
        &mut self,
        rows: u64,
        sink: &mut W,
        metadata: bool,
    ) -> Result<(ColumnDefinitions, u64)> {
        match self.options.tail_strategy() {
            TailStrategy::TwoPass => self.tail_two_pass_into(rows, sink, metadata),
            TailStrategy::Buffered => self.tail_buffered_into(rows, sink, metadata),
        }
    }

    fn tail_two_pass_into<W: Write>(
        &mut self,
        rows: u64,
        sink: &mut W,
        metadata: bool,
    ) -> Result<(ColumnDefinitions, u64)> {
        let start = self.reader.stream_position()?;
        let total = self.count()?;
        self.reader.seek(SeekFrom::Start(start))?;

        let definitions = self.begin(true)?;
        if metadata {
            Self::write_metadata(&definitions, sink)?;
        }
        let skip = total.saturating_sub(rows);
        let expected = total - skip;
        let window = RowWindow::new(RowDecoder::new(&definitions), skip, Some(expected));
        let written = self.drain(window, sink)?;
        if written < expected {
            return Err(Error::Truncated {
                section: Section::Row {
                    index: skip + written,
                },
                details: Cow::Owned(format!(
                    "stream ended after {} rows but the first pass counted {total}",
                    skip + written
                )),
            });
        }
        Ok((definitions, written))
    }
}
