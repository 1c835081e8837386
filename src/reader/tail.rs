use std::collections::VecDeque;
use std::io::{Read, Write};

use crate::error::{Error, Result};
use crate::parser::RowDecoder;

/// Upper bound on slots reserved up front; larger tails grow on demand.
const INITIAL_SLOTS: usize = 1024;

/// Keeps the most recent `capacity` encoded rows of a forward scan.
pub(super) struct TailBuffer {
    capacity: u64,
    rows: VecDeque<Vec<u8>>,
}

impl TailBuffer {
    pub(super) fn new(capacity: u64) -> Self {
        let reserve = usize::try_from(capacity).map_or(INITIAL_SLOTS, |c| c.min(INITIAL_SLOTS));
        Self {
            capacity,
            rows: VecDeque::with_capacity(reserve),
        }
    }

    /// Decodes every remaining row, retaining the trailing window.
    pub(super) fn fill<R: Read>(
        &mut self,
        decoder: &mut RowDecoder<'_>,
        reader: &mut R,
    ) -> Result<()> {
        if self.capacity == 0 {
            while decoder.skip(reader)? {}
            return Ok(());
        }
        loop {
            let mut slot = if self.rows.len() as u64 == self.capacity {
                self.rows.pop_front().unwrap_or_default()
            } else {
                Vec::new()
            };
            slot.clear();
            if !decoder.decode_into(reader, &mut slot)? {
                return Ok(());
            }
            self.rows.push_back(slot);
        }
    }

    pub(super) fn len(&self) -> u64 {
        self.rows.len() as u64
    }

    pub(super) fn write_to<W: Write>(&self, sink: &mut W) -> Result<()> {
        for row in &self.rows {
            sink.write_all(row).map_err(Error::Sink)?;
        }
        Ok(())
    }
}
