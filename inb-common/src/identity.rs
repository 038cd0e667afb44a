//! Student identity derivation
//!
//! A student logs in with a name and a short code. The document id is the
//! standard base64 of the UTF-8 bytes of `"{name}:{code}"` with every
//! non-alphanumeric character removed, so the same pair always lands on the
//! same `students/{studentId}` document and ids match the ones already stored
//! by the web client.
//!
//! This is not a security boundary: two students choosing the identical
//! name and code share a notebook.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::{Error, Result};

/// Derive the opaque student id for a `(name, code)` pair
pub fn generate_student_id(name: &str, code: &str) -> String {
    let raw = format!("{}:{}", name, code);
    STANDARD
        .encode(raw.as_bytes())
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

/// Validate and normalize login input, then derive the id
pub fn resolve_student_id(name: &str, code: &str) -> Result<(String, String, String)> {
    let name = name.trim();
    let code = code.trim();
    if name.is_empty() {
        return Err(Error::InvalidInput("이름을 입력해주세요.".to_string()));
    }
    if code.is_empty() {
        return Err(Error::InvalidInput("코드를 입력해주세요.".to_string()));
    }
    Ok((generate_student_id(name, code), name.to_string(), code.to_string()))
}

/// Recover `(name, code)` from an id
///
/// Only padding is restorable; ids whose encoding contained `+` or `/`
/// lost information and return `None`.
pub fn decode_student_id(student_id: &str) -> Option<(String, String)> {
    let mut padded = student_id.to_string();
    while padded.len() % 4 != 0 {
        padded.push('=');
    }
    let bytes = STANDARD.decode(padded.as_bytes()).ok()?;
    let raw = String::from_utf8(bytes).ok()?;
    // Reject decodes that do not re-encode to the same id
    let (name, code) = raw.split_once(':')?;
    if generate_student_id(name, code) != student_id {
        return None;
    }
    Some((name.to_string(), code.to_string()))
}

/// Student ids are used as path segments; keep them to the id alphabet
pub fn is_valid_student_id(student_id: &str) -> bool {
    !student_id.is_empty()
        && student_id.len() <= 512
        && student_id.chars().all(|c| c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_deterministic() {
        let a = generate_student_id("김민수", "1234");
        let b = generate_student_id("김민수", "1234");
        assert_eq!(a, b);
        assert!(is_valid_student_id(&a));
    }

    #[test]
    fn test_generate_matches_known_ascii_value() {
        // base64("kim:42") = "a2ltOjQy"
        assert_eq!(generate_student_id("kim", "42"), "a2ltOjQy");
    }

    #[test]
    fn test_generate_strips_padding() {
        // base64("ab:1") = "YWI6MQ=="
        assert_eq!(generate_student_id("ab", "1"), "YWI6MQ");
    }

    #[test]
    fn test_different_pairs_differ() {
        assert_ne!(
            generate_student_id("민수", "1234"),
            generate_student_id("민수", "1235")
        );
    }

    #[test]
    fn test_decode_round_trip() {
        let id = generate_student_id("ab", "1");
        assert_eq!(
            decode_student_id(&id),
            Some(("ab".to_string(), "1".to_string()))
        );

        let id = generate_student_id("김민수", "0401");
        if let Some((name, code)) = decode_student_id(&id) {
            assert_eq!(name, "김민수");
            assert_eq!(code, "0401");
        }
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert_eq!(decode_student_id("!!!"), None);
        assert_eq!(decode_student_id("YWJj"), None); // "abc" has no ':'
    }

    #[test]
    fn test_resolve_trims_and_validates() {
        let (id, name, code) = resolve_student_id("  kim ", " 42 ").unwrap();
        assert_eq!(id, "a2ltOjQy");
        assert_eq!(name, "kim");
        assert_eq!(code, "42");

        assert!(matches!(
            resolve_student_id("   ", "42"),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            resolve_student_id("kim", ""),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_student_id_validation() {
        assert!(is_valid_student_id("a2ltOjQy"));
        assert!(!is_valid_student_id(""));
        assert!(!is_valid_student_id("a/b"));
        assert!(!is_valid_student_id("../x"));
    }
}
