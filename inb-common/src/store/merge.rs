//! Merge-write semantics
//!
//! A merge write combines with the stored document field by field: non-empty
//! nested maps merge recursively, while any other value in the write (an
//! empty map included) replaces whatever was stored. Fields not present in
//! the write are untouched, so a partial form state never clobbers fields it
//! does not carry.
//!
//! [`merge_into`] and [`field_paths`] must agree: every leaf path of a patch
//! is exactly what the local merge replaces.

use serde_json::Value;

use crate::sanitize::Document;

/// Merge `patch` into `target`
pub fn merge_into(target: &mut Document, patch: Document) {
    for (key, value) in patch {
        match value {
            Value::Object(incoming) if !incoming.is_empty() => {
                if let Some(Value::Object(existing)) = target.get_mut(&key) {
                    merge_into(existing, incoming);
                    continue;
                }
                target.insert(key, Value::Object(incoming));
            }
            value => {
                target.insert(key, value);
            }
        }
    }
}

/// Leaf field paths touched by a merge write (used as a Firestore update mask)
///
/// Non-empty maps contribute their children; everything else (including an
/// empty map) is a leaf.
pub fn field_paths(patch: &Document) -> Vec<String> {
    let mut paths = Vec::new();
    collect_paths(patch, &mut Vec::new(), &mut paths);
    paths
}

fn collect_paths(doc: &Document, prefix: &mut Vec<String>, out: &mut Vec<String>) {
    for (key, value) in doc {
        prefix.push(quote_segment(key));
        match value {
            Value::Object(map) if !map.is_empty() => collect_paths(map, prefix, out),
            _ => out.push(prefix.join(".")),
        }
        prefix.pop();
    }
}

/// Simple identifiers are used as-is; anything else is backtick-quoted
fn quote_segment(segment: &str) -> String {
    let simple = !segment.is_empty()
        && !segment.starts_with(|c: char| c.is_ascii_digit())
        && segment.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if simple {
        segment.to_string()
    } else {
        format!("`{}`", segment.replace('\\', "\\\\").replace('`', "\\`"))
    }
}
