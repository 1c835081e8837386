use std::io::Read;

use crate::error::Result;
use crate::parser::RowDecoder;

/// Skips a leading run of rows, then yields at most `remaining` rows.
pub(super) struct RowWindow<'d> {
    decoder: RowDecoder<'d>,
    skip_remaining: u64,
    remaining: Option<u64>,
    skipped: bool,
}

impl<'d> RowWindow<'d> {
    pub(super) const fn new(decoder: RowDecoder<'d>, skip: u64, remaining: Option<u64>) -> Self {
        Self {
            decoder,
            skip_remaining: skip,
            remaining,
            skipped: skip == 0,
        }
    }

    /// Appends the next windowed row to `out`. Returns `false` once the
    /// window is exhausted or the stream ends.
    pub(super) fn next_into<R: Read>(&mut self, reader: &mut R, out: &mut Vec<u8>) -> Result<bool> {
        if !self.skipped && !self.consume_skip(reader)? {
            return Ok(false);
        }
        if matches!(self.remaining, Some(0)) {
            return Ok(false);
        }
        if !self.decoder.decode_into(reader, out)? {
            return Ok(false);
        }
        if let Some(rem) = self.remaining.as_mut() {
            *rem = rem.saturating_sub(1);
        }
        Ok(true)
    }

    fn consume_skip<R: Read>(&mut self, reader: &mut R) -> Result<bool> {
        while self.skip_remaining > 0 {
            if self.decoder.skip(reader)? {
                self.skip_remaining -= 1;
            } else {
                self.skipped = true;
                return Ok(false);
            }
        }
        self.skipped = true;
        Ok(true)
    }
}
