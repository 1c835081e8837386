//! Per-row null bitmap.
//!
//! Bit 7 of the first byte flags the first column, bit 0 the eighth, and so
//! on for each following byte. A set bit means the column is null and has no
//! payload. Padding bits past the last column are ignored when decoding and
//! written as zero when encoding.

use std::io::Read;

use smallvec::SmallVec;

use crate::error::{Error, Result, Section};

use super::order::ColumnOrder;

/// Bitmap bytes; rows with up to 128 columns stay on the stack.
pub type Bitmap = SmallVec<[u8; 16]>;

#[must_use]
pub const fn bitmap_len(column_count: usize) -> usize {
    column_count.div_ceil(8)
}

/// Reads the raw bitmap for a row with `column_count` columns.
///
/// # Errors
///
/// Returns [`Error::Truncated`] if the stream ends inside the bitmap.
pub fn read_bitmap<R: Read>(reader: &mut R, column_count: usize, row: u64) -> Result<Bitmap> {
    let mut bitmap: Bitmap = SmallVec::from_elem(0, bitmap_len(column_count));
    reader
        .read_exact(&mut bitmap)
        .map_err(|err| Error::from_read(err, Section::Row { index: row }))?;
    Ok(bitmap)
}

/// True when `column` is flagged null in `bitmap`.
#[inline]
#[must_use]
pub fn is_null(bitmap: &[u8], column: usize) -> bool {
    bitmap[column / 8] & (0x80 >> (column % 8)) != 0
}

/// Expands every bit of `bitmap`, including trailing padding bits.
#[must_use]
pub fn decode_bitmap(bitmap: &[u8]) -> Vec<bool> {
    bitmap
        .iter()
        .flat_map(|byte| (0..8).rev().map(move |bit| byte & (1 << bit) != 0))
        .collect()
}

pub(crate) fn decode_bitmap_into(bitmap: &[u8], column_count: usize, flags: &mut Vec<bool>) {
    flags.clear();
    flags.extend((0..column_count).map(|column| is_null(bitmap, column)));
}

/// Packs null flags into bitmap bytes, first flag in the high bit.
#[must_use]
pub fn encode_bitmap(flags: &[bool]) -> Bitmap {
    let mut bitmap: Bitmap = SmallVec::from_elem(0, bitmap_len(flags.len()));
    for (column, _) in flags.iter().enumerate().filter(|(_, null)| **null) {
        bitmap[column / 8] |= 0x80 >> (column % 8);
    }
    bitmap
}

/// Builds the bitmap for output order: output bit `p` is the null flag of
/// original column `order.source_of(p)`.
///
/// # Panics
///
/// Panics if `flags` has fewer entries than `order` has columns.
#[must_use]
pub fn reencode_bitmap(flags: &[bool], order: &ColumnOrder) -> Bitmap {
    encode_bitmap(&order.apply(flags))
}
