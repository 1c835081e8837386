pub mod bitmap;
mod header;
mod order;
mod row;
mod signature;

pub use bitmap::{Bitmap, bitmap_len, decode_bitmap, encode_bitmap, read_bitmap, reencode_bitmap};
pub use header::{ColumnDefinitions, ColumnWidth, HeaderSummary, VARIABLE_WIDTH};
pub use order::ColumnOrder;
pub use row::{Row, RowDecoder, decode_row};
pub use signature::{SIGNATURE, expect_signature, read_signature};

pub(crate) use signature::write_signature;
