//! End-to-end add/list/get through files on disk


use pdf_attachments::{
    add_attachments, add_attachments_to_file, get_attachment, list_attachments,
    list_document_attachments, AttachmentInput, PdfDocument, RenameMap, WriterConfig,
};
use pdf_builder::{one_page_pdf, with_embedded_files, write_file};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

fn setup(pdf: Vec<u8>) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "doc.pdf", &pdf);
    (dir, path)
}

fn roundtrip(data: &[u8], config: &WriterConfig) -> Vec<u8> {
    let source = PdfDocument::parse(one_page_pdf()).unwrap();
    let (bytes, _) = add_attachments(
        &source,
        &[AttachmentInput::new("payload.bin", data.to_vec())],
        &RenameMap::new(),
        config,
    )
    .unwrap();
    let output = PdfDocument::parse(bytes).unwrap();
    pdf_attachments::get_document_attachment(&output, "payload.bin")
        .unwrap()
        .data
        .unwrap()
}

#[test]
fn test_notes_and_data_scenario() {
    let (dir, pdf) = setup(one_page_pdf());
    let notes = write_file(dir.path(), "notes.txt", b"hello");
    let data = write_file(dir.path(), "data.csv", b"a,b,c");
    let out = dir.path().join("out.pdf");

    let added = add_attachments_to_file(
        &pdf,
        &[notes, data],
        &RenameMap::new(),
        &out,
        &WriterConfig::default(),
    )
    .unwrap();
    assert_eq!(added, 2);

    let attachments = list_attachments(&out).unwrap();
    let summary: Vec<(String, Option<u64>, Option<u32>)> = attachments
        .iter()
        .map(|a| (a.name.clone(), a.size, a.page))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("notes.txt".to_string(), Some(5), None),
            ("data.csv".to_string(), Some(5), None),
        ]
    );

    let csv = get_attachment(&out, "data.csv").unwrap();
    assert_eq!(csv.data.unwrap(), b"a,b,c");
    assert_eq!(csv.size, Some(5));

    // The source is left alone when writing elsewhere.
    assert!(list_attachments(&pdf).unwrap().is_empty());
}

#[test]
fn test_zero_attachments_lists_empty() {
    let (_dir, pdf) = setup(one_page_pdf());
    assert!(list_attachments(&pdf).unwrap().is_empty());
}

#[test]
fn test_listing_twice_is_identical() {
    let (_dir, pdf) = setup(with_embedded_files(&[("a.txt", b"1"), ("b.txt", b"22")]));
    let first = list_attachments(&pdf).unwrap();
    let second = list_attachments(&pdf).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
}

#[test]
fn test_adding_keeps_existing_attachments() {
    let (dir, pdf) = setup(with_embedded_files(&[("old.txt", b"old contents")]));
    let new = write_file(dir.path(), "new.txt", b"new contents");

    add_attachments_to_file(&pdf, &[new], &RenameMap::new(), &pdf, &WriterConfig::default())
        .unwrap();

    let names: Vec<String> = list_attachments(&pdf)
        .unwrap()
        .into_iter()
        .map(|a| a.name)
        .collect();
    assert_eq!(names, vec!["old.txt", "new.txt"]);
    assert_eq!(get_attachment(&pdf, "old.txt").unwrap().data.unwrap(), b"old contents");
    assert_eq!(get_attachment(&pdf, "new.txt").unwrap().data.unwrap(), b"new contents");
}

#[test]
fn test_adding_twice_in_a_row() {
    let (dir, pdf) = setup(one_page_pdf());
    let first = write_file(dir.path(), "first.txt", b"1");
    let second = write_file(dir.path(), "second.txt", b"2");
    let config = WriterConfig::default();

    add_attachments_to_file(&pdf, &[first], &RenameMap::new(), &pdf, &config).unwrap();
    add_attachments_to_file(&pdf, &[second], &RenameMap::new(), &pdf, &config).unwrap();

    let attachments = list_attachments(&pdf).unwrap();
    assert_eq!(attachments.len(), 2);
    assert_eq!(get_attachment(&pdf, "second.txt").unwrap().data.unwrap(), b"2");
}

#[test]
fn test_same_inputs_twice_give_same_contents() {
    let source = PdfDocument::parse(one_page_pdf()).unwrap();
    let inputs = [
        AttachmentInput::new("a.txt", b"alpha".to_vec()),
        AttachmentInput::new("b.bin", vec![0, 1, 2, 255]),
    ];
    let config = WriterConfig::reproducible();

    let (first, _) = add_attachments(&source, &inputs, &RenameMap::new(), &config).unwrap();
    let (second, _) = add_attachments(&source, &inputs, &RenameMap::new(), &config).unwrap();
    assert_eq!(first, second);

    let output = PdfDocument::parse(first).unwrap();
    assert_eq!(list_document_attachments(&output).unwrap().len(), 2);
}

#[test]
fn test_binary_and_empty_contents() {
    let config = WriterConfig::default();
    assert_eq!(roundtrip(b"", &config), b"");
    assert_eq!(roundtrip(b"\0\0\0", &config), b"\0\0\0");
    let not_utf8 = [0xFF, 0xFE, 0x80, b'e', b'n', b'd', b's', b't', b'r', b'e', b'a', b'm'];
    assert_eq!(roundtrip(&not_utf8, &config), not_utf8);
}

#[test]
fn test_multi_megabyte_contents() {
    let data: Vec<u8> = (0..3 * 1024 * 1024u32).map(|i| (i * 31 % 251) as u8).collect();
    assert_eq!(roundtrip(&data, &WriterConfig::default()), data);
    assert_eq!(
        roundtrip(&data, &WriterConfig::default().with_compression(false)),
        data
    );
}

#[test]
fn test_renamed_attachment() {
    let (dir, pdf) = setup(one_page_pdf());
    let notes = write_file(dir.path(), "notes.txt", b"hello");
    let renames = RenameMap::parse(["notes.txt:README.txt"]).unwrap();

    add_attachments_to_file(&pdf, &[notes], &renames, &pdf, &WriterConfig::default()).unwrap();

    let attachments = list_attachments(&pdf).unwrap();
    assert_eq!(attachments.len(), 1);
    assert_eq!(attachments[0].name, "README.txt");
    assert_eq!(
        attachments[0].default_output_path().unwrap(),
        PathBuf::from("README.txt")
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn test_arbitrary_bytes_roundtrip(data in proptest::collection::vec(any::<u8>(), 0..4096)) {
        prop_assert_eq!(roundtrip(&data, &WriterConfig::default()), data.clone());
        prop_assert_eq!(
            roundtrip(&data, &WriterConfig::default().with_compression(false)),
            data
        );
    }
}
