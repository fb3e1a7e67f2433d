//! Integration test driving the scanner against a real file on disk, the
//! same way `tests/` in the teacher root exercises its pipeline against
//! files rather than only in-memory strings.

use std::io::Write;

use rete_front::{scan_all, AtomInterner, TokenKind};
use tempfile::NamedTempFile;

#[test]
fn scans_a_rule_base_file_from_disk() {
    let mut file = NamedTempFile::new().expect("create temp file");
    writeln!(file, "(defrule greet (person ?name) => (assert (greeted ?name)))")
        .expect("write temp file");

    let source = std::fs::read_to_string(file.path()).expect("read temp file back");
    let mut atoms = AtomInterner::new();
    let tokens = scan_all(&source, &mut atoms).expect("scan succeeds");

    assert_eq!(tokens.last().unwrap().kind, TokenKind::Stop);
    assert!(tokens.len() > 10);
}
