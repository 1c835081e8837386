#![allow(dead_code)]

use std::io::Write;
use std::path::PathBuf;

use tempfile::NamedTempFile;
use verticat::parser::{SIGNATURE, VARIABLE_WIDTH, bitmap_len};

/// Column widths of the 75-column sample export; `-1` marks variable width.
pub const SAMPLE_WIDTHS: [i32; 75] = [
    8, 8, 8, 4, 8, 8, 8, 8, -1, 4, -1, 8, -1, 4, -1, 8, -1, 4, 4, 4, 8, -1, -1, 4, 4, 8, 8, 4, 4,
    4, 4, -1, -1, 4, 4, 8, 8, 4, 4, 4, 4, 4, 4, 8, 8, -1, -1, -1, 4, -1, 4, -1, 4, 4, -1, -1, -1,
    -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, 2, 2, 2, 2, 4, 4, 1,
];
pub const SAMPLE_ROWS: u64 = 475;
/// Signature plus column definitions of the sample.
pub const SAMPLE_METADATA_LEN: usize = 320;

/// Widths of the fixture covering every Vertica column type.
pub const ALL_TYPES_WIDTHS: [i32; 14] = [8, 8, 10, -1, 1, 8, 8, 8, 8, 8, -1, 3, 24, 8];

/// Encodes native files row by row.
pub struct NativeFileBuilder {
    widths: Vec<u32>,
    bytes: Vec<u8>,
    rows: u64,
}

impl NativeFileBuilder {
    pub fn new(widths: &[i32]) -> Self {
        let widths: Vec<u32> = widths
            .iter()
            .map(|&w| if w < 0 { VARIABLE_WIDTH } else { w as u32 })
            .collect();
        let mut bytes = SIGNATURE.to_vec();
        let header_length = 5 + 4 * widths.len() as u32;
        bytes.extend_from_slice(&header_length.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.push(0);
        bytes.extend_from_slice(&(widths.len() as u16).to_le_bytes());
        for width in &widths {
            bytes.extend_from_slice(&width.to_le_bytes());
        }
        Self {
            widths,
            bytes,
            rows: 0,
        }
    }

    pub fn metadata_len(&self) -> usize {
        SIGNATURE.len() + 4 + 5 + 4 * self.widths.len()
    }

    /// Appends a row. Fixed-width payloads must match their column width.
    pub fn row(&mut self, columns: &[Option<Vec<u8>>]) -> &mut Self {
        self.bytes.extend(encode_row(&self.widths, columns));
        self.rows += 1;
        self
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn build(&self) -> Vec<u8> {
        self.bytes.clone()
    }
}

/// Encodes one row record: length, null bitmap, then non-null payloads.
pub fn encode_row(widths: &[u32], columns: &[Option<Vec<u8>>]) -> Vec<u8> {
    assert_eq!(widths.len(), columns.len(), "one value per column");
    let mut bitmap = vec![0u8; bitmap_len(widths.len())];
    let mut payload = Vec::new();
    for (index, (width, value)) in widths.iter().zip(columns).enumerate() {
        match value {
            None => bitmap[index / 8] |= 0x80 >> (index % 8),
            Some(bytes) if *width == VARIABLE_WIDTH => {
                payload.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
                payload.extend_from_slice(bytes);
            }
            Some(bytes) => {
                assert_eq!(bytes.len(), *width as usize, "fixed payload of column {index}");
                payload.extend_from_slice(bytes);
            }
        }
    }
    let mut row = (payload.len() as u32).to_le_bytes().to_vec();
    row.extend(bitmap);
    row.extend(payload);
    row
}

/// Length of the variable payload of sample row `index`.
fn sample_text_len(index: u64) -> usize {
    match index {
        0..=2 => 142,
        3..=4 => 143,
        5..=120 => 139,
        470.. => 136,
        _ => 138,
    }
}

/// Builds the 75-column, 475-row sample. Only the first eight fixed columns
/// and the first variable column carry values; everything else is null.
pub fn sample() -> NativeFileBuilder {
    let mut builder = NativeFileBuilder::new(&SAMPLE_WIDTHS);
    for index in 0..SAMPLE_ROWS {
        builder.row(&sample_row(index));
    }
    builder
}

pub fn sample_row(index: u64) -> Vec<Option<Vec<u8>>> {
    let mut columns = vec![None; SAMPLE_WIDTHS.len()];
    for (column, width) in SAMPLE_WIDTHS.iter().enumerate().take(8) {
        let seed = index * 100 + column as u64;
        columns[column] = Some(seed.to_le_bytes()[..*width as usize].to_vec());
    }
    let letter = b'a' + (index % 26) as u8;
    columns[8] = Some(vec![letter; sample_text_len(index)]);
    columns
}

/// A few rows of the all-types fixture, including an all-null row.
pub fn all_types() -> NativeFileBuilder {
    let mut builder = NativeFileBuilder::new(&ALL_TYPES_WIDTHS);
    builder.row(&[
        Some(1i64.to_le_bytes().to_vec()),
        Some(1.5f64.to_le_bytes().to_vec()),
        Some(b"one       ".to_vec()),
        Some(b"ONE".to_vec()),
        Some(vec![1]),
        Some(3_653i64.to_le_bytes().to_vec()),
        Some(43_200_000_000i64.to_le_bytes().to_vec()),
        Some(43_200_000_000i64.to_le_bytes().to_vec()),
        Some(0i64.to_le_bytes().to_vec()),
        Some(0i64.to_le_bytes().to_vec()),
        Some(vec![0xab, 0xcd]),
        Some(b"\x01\x02\x03".to_vec()),
        Some(vec![0; 24]),
        Some(86_400_000_000i64.to_le_bytes().to_vec()),
    ]);
    builder.row(&vec![None; ALL_TYPES_WIDTHS.len()]);
    builder.row(&[
        Some((-2i64).to_le_bytes().to_vec()),
        None,
        Some(b"two       ".to_vec()),
        Some(Vec::new()),
        Some(vec![0]),
        None,
        None,
        Some(1i64.to_le_bytes().to_vec()),
        None,
        Some(7i64.to_le_bytes().to_vec()),
        None,
        Some(b"abc".to_vec()),
        None,
        None,
    ]);
    builder
}

/// Writes `bytes` to a temporary file that lives as long as the handle.
pub fn temp_native_file(bytes: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp file");
    file.write_all(bytes).expect("write temp file");
    file.flush().expect("flush temp file");
    file
}

pub fn temp_path(file: &NamedTempFile) -> PathBuf {
    file.path().to_path_buf()
}
