#![allow(clippy::pedantic)]
mod common;

use std::io::{self, Cursor, Write};

use common::{SAMPLE_METADATA_LEN, sample};
use verticat::{Concatenation, Error, NativeReader, Operation, ScanOptions, TailStrategy};

/// Bytes of the first sample row: 14 bytes of length and bitmap, 60 fixed
/// payload bytes, then a 142-byte text with its 4-byte prefix.
const FIRST_ROW_LEN: u64 = 14 + 60 + 4 + 142;
/// Bytes of each of the last five sample rows.
const LAST_ROW_LEN: u64 = 14 + 60 + 4 + 136;

/// Accepts `budget` bytes, then fails every write.
struct FullDisk {
    budget: usize,
    accepted: Vec<u8>,
}

impl FullDisk {
    fn new(budget: usize) -> Self {
        Self {
            budget,
            accepted: Vec::new(),
        }
    }
}

impl Write for FullDisk {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.budget == 0 {
            return Err(io::Error::other("no space left on device"));
        }
        let n = buf.len().min(self.budget);
        self.budget -= n;
        self.accepted.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn assert_sink(err: &Error) {
    assert!(matches!(err, Error::Sink(_)), "expected a sink error, got {err}");
}

#[test]
fn head_stops_reading_at_the_first_failed_write() {
    let bytes = sample().build();
    let mut reader = NativeReader::new(Cursor::new(bytes));
    let mut sink = FullDisk::new(SAMPLE_METADATA_LEN + 100);
    let err = reader.head(5, &mut sink).expect_err("write must fail");
    assert_sink(&err);
    assert_eq!(sink.accepted.len(), SAMPLE_METADATA_LEN + 100);

    let consumed = reader.into_inner().position();
    assert_eq!(consumed, SAMPLE_METADATA_LEN as u64 + FIRST_ROW_LEN);
}

#[test]
fn cat_stops_reading_at_the_first_failed_write() {
    let bytes = sample().build();
    let mut reader = NativeReader::new(Cursor::new(bytes));
    let mut sink = FullDisk::new(SAMPLE_METADATA_LEN);
    let err = reader.cat(&mut sink).expect_err("write must fail");
    assert_sink(&err);
    assert_eq!(
        reader.into_inner().position(),
        SAMPLE_METADATA_LEN as u64 + FIRST_ROW_LEN
    );
}

#[test]
fn metadata_write_failure_reads_no_rows() {
    let bytes = sample().build();
    let mut reader = NativeReader::new(Cursor::new(bytes));
    let err = reader
        .head(5, &mut FullDisk::new(3))
        .expect_err("write must fail");
    assert_sink(&err);
    assert_eq!(reader.into_inner().position(), SAMPLE_METADATA_LEN as u64);
}

#[test]
fn two_pass_tail_stops_reading_at_the_first_failed_write() {
    let bytes = sample().build();
    let len = bytes.len() as u64;
    let mut reader = NativeReader::new(Cursor::new(bytes));
    let mut sink = FullDisk::new(SAMPLE_METADATA_LEN);
    let err = reader.tail(5, &mut sink).expect_err("write must fail");
    assert_sink(&err);
    assert_eq!(reader.into_inner().position(), len - 1_070 + LAST_ROW_LEN);
}

#[test]
fn buffered_tail_reports_sink_errors() {
    let options = ScanOptions::new().with_tail_strategy(TailStrategy::Buffered);
    let mut reader = NativeReader::with_options(Cursor::new(sample().build()), options);
    let err = reader
        .tail(5, &mut FullDisk::new(SAMPLE_METADATA_LEN + 10))
        .expect_err("write must fail");
    assert_sink(&err);
}

#[test]
fn print_header_reports_sink_errors() {
    let mut reader = NativeReader::new(Cursor::new(sample().build()));
    let err = reader
        .print_header(&mut FullDisk::new(0))
        .expect_err("write must fail");
    assert_sink(&err);

    let mut reader = NativeReader::new(Cursor::new(sample().build()));
    let err = reader
        .print_header_json(&mut FullDisk::new(4))
        .expect_err("write must fail");
    assert_sink(&err);
}

#[test]
fn fragment_write_reports_sink_errors() {
    let fragment = NativeReader::new(Cursor::new(sample().build()))
        .fragment_head(5)
        .expect("fragment");
    for (budget, with_metadata) in [(5, true), (SAMPLE_METADATA_LEN, true), (10, false)] {
        let err = fragment
            .write_to(&mut FullDisk::new(budget), with_metadata)
            .expect_err("write must fail");
        assert_sink(&err);
    }
}

#[test]
fn concatenation_reports_sink_errors() {
    let sink = FullDisk::new(SAMPLE_METADATA_LEN + 1);
    let mut concat = Concatenation::new(sink, ScanOptions::new());
    let err = concat
        .push(Cursor::new(sample().build()), Operation::Cat)
        .expect_err("write must fail");
    assert_sink(&err);

    let err = concat
        .push_forward(Cursor::new(sample().build()), Operation::Head(1))
        .expect_err("write must fail");
    assert_sink(&err);
    assert_eq!(concat.into_inner().accepted.len(), SAMPLE_METADATA_LEN + 1);
}
