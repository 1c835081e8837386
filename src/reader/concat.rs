use std::io::{self, Read, Seek, Write};

use super::{NativeReader, Operation, Outcome, ScanOptions};
use crate::error::{Error, Result};
use crate::logger::log_warn;
use crate::parser::ColumnDefinitions;

/// Writes the rows of several native streams into one sink as a single
/// native file.
///
/// The signature and column definitions are written once, ahead of the first
/// stream that emits bytes. Later streams contribute rows only; a stream whose
/// column count differs from the first is still copied, with a warning, since
/// the result is then no longer a valid native file. Rows are streamed, so a
/// stream that fails part way leaves the rows it already produced in the sink.
pub struct Concatenation<W> {
    sink: W,
    options: ScanOptions,
    definitions: Option<ColumnDefinitions>,
}

impl<W: Write> Concatenation<W> {
    #[must_use]
    pub const fn new(sink: W, options: ScanOptions) -> Self {
        Self {
            sink,
            options,
            definitions: None,
        }
    }

    /// Definitions written at the top of the output, once any stream has
    /// emitted.
    #[must_use]
    pub const fn definitions(&self) -> Option<&ColumnDefinitions> {
        self.definitions.as_ref()
    }

    pub const fn sink_mut(&mut self) -> &mut W {
        &mut self.sink
    }

    pub fn into_inner(self) -> W {
        self.sink
    }

    /// Runs `operation` on a seekable stream and appends its output.
    ///
    /// # Errors
    ///
    /// Propagates any error of the operation.
    pub fn push<R: Read + Seek>(&mut self, reader: R, operation: Operation) -> Result<Outcome> {
        let mut reader = NativeReader::with_options(reader, self.scan_options(operation));
        let mut sink = EmitTracker::new(&mut self.sink);
        let outcome = reader.run(operation, &mut sink);
        let emitted = sink.wrote;
        self.record(operation, reader.definitions(), emitted);
        outcome
    }

    /// Like [`Self::push`] for streams that cannot seek; `Tail` buffers.
    ///
    /// # Errors
    ///
    /// Propagates any error of the operation.
    pub fn push_forward<R: Read>(&mut self, reader: R, operation: Operation) -> Result<Outcome> {
        let mut reader = NativeReader::with_options(reader, self.scan_options(operation));
        let mut sink = EmitTracker::new(&mut self.sink);
        let outcome = reader.run_forward(operation, &mut sink);
        let emitted = sink.wrote;
        self.record(operation, reader.definitions(), emitted);
        outcome
    }

    /// Flushes the underlying sink.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Sink`] if flushing fails.
    pub fn finish(&mut self) -> Result<()> {
        self.sink.flush().map_err(Error::Sink)
    }

    const fn emits_rows(operation: Operation) -> bool {
        matches!(
            operation,
            Operation::Head(_) | Operation::Tail(_) | Operation::Cat
        )
    }

    fn scan_options(&self, operation: Operation) -> ScanOptions {
        let metadata = self.options.writes_metadata()
            && Self::emits_rows(operation)
            && self.definitions.is_none();
        self.options.clone().with_metadata(metadata)
    }

    fn record(&mut self, operation: Operation, read: Option<&ColumnDefinitions>, emitted: bool) {
        if !Self::emits_rows(operation) {
            return;
        }
        let Some(read) = read else {
            return;
        };
        match &self.definitions {
            None if emitted => self.definitions = Some(read.clone()),
            Some(first) if first.column_count() != read.column_count() => {
                log_warn(&format!(
                    "stream has {} columns but the output was started with {}",
                    read.column_count(),
                    first.column_count()
                ));
            }
            _ => {}
        }
    }
}

/// Remembers whether an operation wrote anything.
struct EmitTracker<W> {
    inner: W,
    wrote: bool,
}

impl<W> EmitTracker<W> {
    const fn new(inner: W) -> Self {
        Self { inner, wrote: false }
    }
}

impl<W: Write> Write for EmitTracker<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.wrote |= n > 0;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
