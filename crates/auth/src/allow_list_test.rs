//! Tests for AllowList

use super::*;

use std::io::Write;

const ID_A: &str = "6f1c2b8e-93a1-4d7e-9a55-0c2f4b1d8e70";
const ID_B: &str = "0b7e41c2-5d3a-4f18-8c6e-2a9d7f3b1c05";

fn id(s: &str) -> Uuid {
    Uuid::parse_str(s).unwrap()
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn test_new_is_empty() {
    let list = AllowList::new();
    assert!(list.is_empty());
    assert_eq!(list.len(), 0);
    assert!(!list.contains(&Uuid::new_v4()));
}

#[test]
fn test_from_ids_preserves_order() {
    let ids: Vec<_> = (0..5).map(|_| Uuid::new_v4()).collect();
    let list = AllowList::from_ids(ids.clone());

    assert_eq!(list.ids(), &ids[..]);
    for (slot, id) in ids.iter().enumerate() {
        assert_eq!(list.slot(id), Some(slot));
    }
}

#[test]
fn test_duplicates_keep_first_slot() {
    let a = id(ID_A);
    let b = id(ID_B);
    let list = AllowList::from_ids([a, b, a]);

    assert_eq!(list.len(), 2);
    assert_eq!(list.slot(&a), Some(0));
    assert_eq!(list.slot(&b), Some(1));
}

#[test]
fn test_insert_reports_duplicates() {
    let mut list = AllowList::new();
    let a = Uuid::new_v4();
    assert!(list.insert(a));
    assert!(!list.insert(a));
}

// ============================================================================
// Parsing
// ============================================================================

#[test]
fn test_parse_skips_comments_and_blank_lines() {
    let contents = format!("# viewers\n\n{ID_A}\n   \n  {ID_B}  \n# trailing\n");
    let list = AllowList::from_str(&contents).unwrap();

    assert_eq!(list.ids(), &[id(ID_A), id(ID_B)]);
}

#[test]
fn test_parse_invalid_line_reports_line_number() {
    let contents = format!("{ID_A}\n# ok\nnot-a-uuid\n");
    let err = AllowList::from_str(&contents).unwrap_err();

    match err {
        AuthError::InvalidId { line, .. } => assert_eq!(line, 3),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_parse_rejects_nil_id() {
    let contents = format!("{ID_A}\n{}\n", Uuid::nil());
    let err = AllowList::from_str(&contents).unwrap_err();

    match err {
        AuthError::InvalidId { line, .. } => assert_eq!(line, 2),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_parse_empty() {
    let list = AllowList::from_str("").unwrap();
    assert!(list.is_empty());
}

// ============================================================================
// Files
// ============================================================================

#[test]
fn test_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "{ID_A}").unwrap();
    writeln!(file, "{ID_B}").unwrap();

    let list = AllowList::from_file(file.path()).unwrap();
    assert_eq!(list.len(), 2);
}

#[test]
fn test_from_file_missing() {
    let err = AllowList::from_file("/nonexistent/strand/viewers.conf").unwrap_err();
    assert!(matches!(err, AuthError::Read { .. }));
}

#[test]
fn test_load_prefers_existing_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "{ID_B}").unwrap();

    let list = AllowList::load(&[id(ID_A)], Some(file.path())).unwrap();
    assert_eq!(list.ids(), &[id(ID_B)]);
}

#[test]
fn test_load_falls_back_to_inline() {
    let missing = Path::new("/nonexistent/strand/apps.conf");
    let list = AllowList::load(&[id(ID_A)], Some(missing)).unwrap();
    assert_eq!(list.ids(), &[id(ID_A)]);
}

#[test]
fn test_load_inline_rejects_nil_id() {
    let err = AllowList::load(&[id(ID_A), Uuid::nil()], None).unwrap_err();
    assert!(matches!(err, AuthError::InvalidId { line: 2, .. }));
}

#[test]
fn test_load_inline_only() {
    let list = AllowList::load(&[id(ID_A), id(ID_B)], None).unwrap();
    assert_eq!(list.len(), 2);
}
