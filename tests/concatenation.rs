#![allow(clippy::pedantic)]
mod common;

use std::io::Cursor;

use common::{NativeFileBuilder, SAMPLE_METADATA_LEN, all_types, sample};
use verticat::{Concatenation, Operation, Outcome, ScanOptions};

#[test]
fn heads_of_two_files_share_one_header() {
    let bytes = sample().build();
    let mut concat = Concatenation::new(Vec::new(), ScanOptions::new());
    for _ in 0..2 {
        let outcome = concat
            .push(Cursor::new(bytes.clone()), Operation::Head(5))
            .expect("head");
        assert_eq!(outcome, Outcome::Written { rows: 5 });
    }
    let out = concat.into_inner();
    assert_eq!(out.len(), 1_422 + 1_102);
    assert_eq!(out[..1_422], bytes[..1_422]);
    assert_eq!(out[1_422..], bytes[SAMPLE_METADATA_LEN..1_422]);
}

#[test]
fn mixed_column_counts_are_still_copied() {
    let first = all_types().build();
    let mut second = NativeFileBuilder::new(&[1]);
    second.row(&[Some(vec![9])]);
    let second = second.build();

    let mut concat = Concatenation::new(Vec::new(), ScanOptions::new());
    concat.push(Cursor::new(first.clone()), Operation::Cat).expect("first");
    concat
        .push_forward(Cursor::new(second), Operation::Cat)
        .expect("second");
    assert_eq!(concat.definitions().expect("definitions").column_count(), 14);

    let out = concat.into_inner();
    assert!(out.starts_with(&first));
    assert_eq!(&out[first.len()..], &[1u8, 0, 0, 0, 0, 9]);
}

#[test]
fn counts_are_reported_per_stream() {
    let mut concat = Concatenation::new(Vec::new(), ScanOptions::new());
    let first = concat
        .push(Cursor::new(sample().build()), Operation::Count)
        .expect("count");
    let second = concat
        .push(Cursor::new(all_types().build()), Operation::Count)
        .expect("count");
    assert_eq!(first, Outcome::Count(475));
    assert_eq!(second, Outcome::Count(3));
    assert!(concat.into_inner().is_empty());
}
