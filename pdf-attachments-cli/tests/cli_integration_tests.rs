//! Integration tests for the pdf-attachments CLI
//!
//! Each test drives the compiled binary against PDFs written to a
//! temporary directory and checks exit status, stdout and stderr.

use pretty_assertions::assert_eq;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::{tempdir, TempDir};

fn cli() -> Command {
    Command::new(env!("CARGO_BIN_EXE_pdf-attachments"))
}

fn run_in(dir: &Path, args: &[&str]) -> Output {
    cli()
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .expect("failed to run pdf-attachments")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

/// PDF from `(number, body)` objects with a classic xref table.
fn build_pdf(objects: &[(u32, String)]) -> Vec<u8> {
    let mut out = b"%PDF-1.7\n%\xE2\xE3\xCF\xD3\n".to_vec();
    let mut offsets = Vec::new();
    for (number, body) in objects {
        offsets.push((*number, out.len()));
        out.extend_from_slice(format!("{number} 0 obj\n{body}\nendobj\n").as_bytes());
    }
    let size = objects.iter().map(|(n, _)| *n).max().unwrap_or(0) + 1;
    let xref = out.len();
    out.extend_from_slice(format!("xref\n0 {size}\n0000000000 65535 f \n").as_bytes());
    for number in 1..size {
        match offsets.iter().find(|(n, _)| *n == number) {
            Some((_, offset)) => out.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes()),
            None => out.extend_from_slice(b"0000000000 00000 f \n"),
        }
    }
    out.extend_from_slice(
        format!("trailer\n<< /Size {size} /Root 1 0 R >>\nstartxref\n{xref}\n%%EOF\n").as_bytes(),
    );
    out
}

fn page_objects(catalog: &str) -> Vec<(u32, String)> {
    vec![
        (1, catalog.to_string()),
        (2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string()),
        (3, "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] >>".to_string()),
    ]
}

fn one_page_pdf() -> Vec<u8> {
    build_pdf(&page_objects("<< /Type /Catalog /Pages 2 0 R >>"))
}

/// One embedded file called `name` whose stream is stored with `filter`.
fn single_attachment_pdf(name: &str, filter: &str, data: &str) -> Vec<u8> {
    let mut objects = page_objects(&format!(
        "<< /Type /Catalog /Pages 2 0 R /Names << /EmbeddedFiles << /Names [({name}) 4 0 R] >> >> >>"
    ));
    objects.push((
        4,
        format!("<< /Type /Filespec /F ({name}) /EF << /F 5 0 R >> >>"),
    ));
    objects.push((
        5,
        format!(
            "<< /Type /EmbeddedFile {filter} /Length {} >>\nstream\n{data}\nendstream",
            data.len()
        ),
    ));
    build_pdf(&objects)
}

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: tempdir().expect("failed to create temp directory"),
        }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn write(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    fn run(&self, args: &[&str]) -> Output {
        run_in(self.path(), args)
    }
}

fn with_notes_and_data(ws: &Workspace) {
    ws.write("doc.pdf", &one_page_pdf());
    ws.write("notes.txt", b"hello");
    ws.write("data.csv", b"a,b,c");
    let output = ws.run(&["add", "doc.pdf", "notes.txt", "data.csv", "-o", "out.pdf"]);
    assert!(output.status.success(), "{}", stderr(&output));
}

#[test]
fn test_list_without_attachments() {
    let ws = Workspace::new();
    ws.write("doc.pdf", &one_page_pdf());

    let output = ws.run(&["list", "doc.pdf"]);
    assert!(output.status.success());
    assert_eq!(
        stdout(&output),
        format!("PDF: doc.pdf\nAttachments: 0\n{}\n  (none)\n", "-".repeat(50))
    );
}

#[test]
fn test_list_missing_file() {
    let ws = Workspace::new();
    let output = ws.run(&["list", "missing.pdf"]);
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(stderr(&output), "Error: file not found: missing.pdf\n");
}

#[test]
fn test_add_then_list() {
    let ws = Workspace::new();
    ws.write("doc.pdf", &one_page_pdf());
    ws.write("notes.txt", b"hello");
    ws.write("data.csv", b"a,b,c");

    let output = ws.run(&["add", "doc.pdf", "notes.txt", "data.csv", "-o", "out.pdf"]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(stdout(&output), "Added 2 attachment(s) \u{2192} out.pdf\n");

    let output = ws.run(&["list", "out.pdf"]);
    assert!(output.status.success());
    let listing = stdout(&output);
    assert!(listing.contains("Attachments: 2"));
    assert!(listing.contains("  notes.txt  \u{2014}  5 bytes"));
    assert!(listing.contains("  data.csv  \u{2014}  5 bytes"));
    assert!(listing.find("notes.txt").unwrap() < listing.find("data.csv").unwrap());
}

#[test]
fn test_get_to_default_path() {
    let ws = Workspace::new();
    with_notes_and_data(&ws);

    let output = ws.run(&["get", "out.pdf", "data.csv"]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(
        stdout(&output),
        "Extracted: data.csv \u{2192} data.csv  (5 bytes)\n"
    );
    assert_eq!(fs::read(ws.path().join("data.csv")).unwrap(), b"a,b,c");
}

#[test]
fn test_get_to_explicit_path() {
    let ws = Workspace::new();
    with_notes_and_data(&ws);

    let output = ws.run(&["get", "out.pdf", "notes.txt", "--output", "copy.txt"]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(fs::read(ws.path().join("copy.txt")).unwrap(), b"hello");
}

#[test]
fn test_get_unknown_attachment() {
    let ws = Workspace::new();
    with_notes_and_data(&ws);

    let output = ws.run(&["get", "out.pdf", "nope.txt"]);
    assert_eq!(output.status.code(), Some(1));
    let message = stderr(&output);
    assert!(message.starts_with("Error: "));
    assert!(message.contains("'nope.txt' not found"));
    assert!(!ws.path().join("nope.txt").exists());
}

#[test]
fn test_get_corrupt_attachment() {
    let ws = Workspace::new();
    ws.write(
        "bad.pdf",
        &single_attachment_pdf("bad.bin", "/Filter /ASCIIHexDecode", "XYZ>"),
    );

    let output = ws.run(&["get", "bad.pdf", "bad.bin"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("is corrupt"));
    assert!(!ws.path().join("bad.bin").exists());

    // Listing still shows it.
    let output = ws.run(&["list", "bad.pdf"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("  bad.bin  \u{2014}  unknown"));
}

#[test]
fn test_get_missing_pdf() {
    let ws = Workspace::new();
    let output = ws.run(&["get", "missing.pdf", "a.txt"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("file not found"));
}

#[test]
fn test_add_requires_output_or_in_place() {
    let ws = Workspace::new();
    ws.write("doc.pdf", &one_page_pdf());
    ws.write("notes.txt", b"hello");
    let before = fs::read(ws.path().join("doc.pdf")).unwrap();

    let output = ws.run(&["add", "doc.pdf", "notes.txt"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("--in-place"));
    assert_eq!(fs::read(ws.path().join("doc.pdf")).unwrap(), before);
}

#[test]
fn test_add_output_and_in_place_conflict() {
    let ws = Workspace::new();
    ws.write("doc.pdf", &one_page_pdf());
    ws.write("notes.txt", b"hello");

    let output = ws.run(&["add", "doc.pdf", "notes.txt", "-o", "out.pdf", "-i"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("mutually exclusive"));
    assert!(!ws.path().join("out.pdf").exists());
}

#[test]
fn test_add_in_place() {
    let ws = Workspace::new();
    ws.write("doc.pdf", &one_page_pdf());
    ws.write("notes.txt", b"hello");

    let output = ws.run(&["add", "doc.pdf", "notes.txt", "--in-place"]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(stdout(&output), "Added 1 attachment(s) \u{2192} doc.pdf\n");

    let output = ws.run(&["list", "doc.pdf"]);
    assert!(stdout(&output).contains("Attachments: 1"));
}

#[test]
fn test_add_missing_input_file() {
    let ws = Workspace::new();
    ws.write("doc.pdf", &one_page_pdf());

    let output = ws.run(&["add", "doc.pdf", "ghost.txt", "-o", "out.pdf"]);
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(stderr(&output), "Error: file not found: ghost.txt\n");
}

#[test]
fn test_add_missing_pdf() {
    let ws = Workspace::new();
    ws.write("notes.txt", b"hello");

    let output = ws.run(&["add", "ghost.pdf", "notes.txt", "-o", "out.pdf"]);
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(stderr(&output), "Error: PDF file not found: ghost.pdf\n");
}

#[test]
fn test_add_with_rename() {
    let ws = Workspace::new();
    ws.write("doc.pdf", &one_page_pdf());
    ws.write("notes.txt", b"hello");

    let output = ws.run(&[
        "add", "doc.pdf", "notes.txt", "-n", "notes.txt:README.txt", "-i",
    ]);
    assert!(output.status.success(), "{}", stderr(&output));

    let output = ws.run(&["list", "doc.pdf"]);
    let listing = stdout(&output);
    assert!(listing.contains("README.txt"));
    assert!(!listing.contains("notes.txt"));
}

#[test]
fn test_add_invalid_rename_token() {
    let ws = Workspace::new();
    ws.write("doc.pdf", &one_page_pdf());
    ws.write("notes.txt", b"hello");

    let output = ws.run(&["add", "doc.pdf", "notes.txt", "-n", "notes.txt", "-i"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("expected 'original:newname'"));

    let output = ws.run(&["add", "doc.pdf", "notes.txt", "-n", "notes.txt:", "-i"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("must be non-empty"));
}

#[test]
fn test_add_unknown_rename_key() {
    let ws = Workspace::new();
    ws.write("doc.pdf", &one_page_pdf());
    ws.write("notes.txt", b"hello");

    let output = ws.run(&["add", "doc.pdf", "notes.txt", "-n", "other.txt:x.txt", "-i"]);
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(
        stderr(&output),
        "Error: --name key(s) don't match any input file: other.txt\n"
    );
}

#[test]
fn test_add_existing_name_collision() {
    let ws = Workspace::new();
    with_notes_and_data(&ws);
    let before = fs::read(ws.path().join("out.pdf")).unwrap();

    let output = ws.run(&["add", "out.pdf", "notes.txt", "data.csv", "-i"]);
    assert_eq!(output.status.code(), Some(1));
    let message = stderr(&output);
    assert!(message.contains("notes.txt"));
    assert!(message.contains("data.csv"));
    assert_eq!(fs::read(ws.path().join("out.pdf")).unwrap(), before);
}

#[test]
fn test_add_duplicate_inputs() {
    let ws = Workspace::new();
    ws.write("doc.pdf", &one_page_pdf());
    fs::create_dir_all(ws.path().join("a")).unwrap();
    fs::create_dir_all(ws.path().join("b")).unwrap();
    ws.write("a/x.txt", b"1");
    ws.write("b/x.txt", b"2");

    let output = ws.run(&["add", "doc.pdf", "a/x.txt", "b/x.txt", "-o", "out.pdf"]);
    assert_eq!(output.status.code(), Some(1));
    let message = stderr(&output);
    assert!(message.contains("a/x.txt"));
    assert!(message.contains("b/x.txt"));
    assert!(!ws.path().join("out.pdf").exists());
}

#[test]
fn test_list_json() {
    let ws = Workspace::new();
    with_notes_and_data(&ws);

    let output = ws.run(&["list", "out.pdf", "--json"]);
    assert!(output.status.success(), "{}", stderr(&output));
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let entries = value.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["name"], "notes.txt");
    assert_eq!(entries[0]["size"], 5);
    assert!(entries[0]["page"].is_null());
    assert!(entries[0].get("data").is_none());
}

#[test]
fn test_verbose_flag_is_accepted() {
    let ws = Workspace::new();
    ws.write("doc.pdf", &one_page_pdf());

    let output = ws.run(&["-vv", "list", "doc.pdf"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("Attachments: 0"));
    assert!(stderr(&output).contains("running list"));

    // Quiet by default.
    let output = ws.run(&["list", "doc.pdf"]);
    assert!(!stderr(&output).contains("running list"));
}

#[test]
fn test_version_and_help() {
    let output = cli().arg("--version").output().unwrap();
    assert!(output.status.success());
    assert!(stdout(&output).contains(env!("CARGO_PKG_VERSION")));

    let output = cli().arg("--help").output().unwrap();
    assert!(output.status.success());
    let help = stdout(&output);
    for command in ["list", "get", "add"] {
        assert!(help.contains(command));
    }
}
