//! Entry sanitization before persistence
//!
//! The stored document always carries the date, every required text field
//! (empty string when missing) and the resources bag. Optional sub-objects
//! are written only when they carry content; an absent optional field never
//! becomes a key, and `null` is never written.

use serde_json::{Map, Value};

use crate::model::InquiryEntry;
use crate::{Error, Result};

/// Document fields as written to the store
pub type Document = Map<String, Value>;

/// Sanitize an entry into the document written by `save_entry`
pub fn sanitize_entry(entry: &InquiryEntry) -> Result<Document> {
    let mut doc = Map::new();

    doc.insert("date".into(), Value::String(entry.date.clone()));
    for (key, value) in [
        ("todayTopic", &entry.today_topic),
        ("questions", &entry.questions),
        ("observations", &entry.observations),
        ("priorKnowledge", &entry.prior_knowledge),
        ("groupQuestion", &entry.group_question),
        ("methods", &entry.methods),
        ("findings", &entry.findings),
        ("reflectionText", &entry.reflection_text),
    ] {
        doc.insert(key.into(), Value::String(value.clone()));
    }
    doc.insert("resources".into(), serde_json::to_value(&entry.resources)?);

    if let Some(url) = entry
        .reflection_drawing_data_url
        .as_ref()
        .filter(|s| !s.is_empty())
    {
        doc.insert("reflectionDrawingDataUrl".into(), Value::String(url.clone()));
    }
    insert_optional(&mut doc, "selectedLessonInfo", &entry.selected_lesson_info)?;
    insert_optional(&mut doc, "dataTable", &entry.data_table)?;
    insert_optional(&mut doc, "barChart", &entry.bar_chart)?;
    insert_optional(
        &mut doc,
        "mindMap",
        &entry.mind_map.as_ref().filter(|nodes| !nodes.is_empty()),
    )?;
    insert_optional(&mut doc, "scientistNote", &entry.scientist_note)?;
    insert_optional(
        &mut doc,
        "voiceRecording",
        &entry
            .voice_recording
            .as_ref()
            .filter(|rec| !rec.data_base64.is_empty()),
    )?;
    insert_optional(&mut doc, "aiHelpLogs", &entry.ai_help_logs)?;

    strip_nulls(&mut doc);
    Ok(doc)
}

/// Read a stored document back into an entry
pub fn entry_from_document(doc: Document) -> Result<InquiryEntry> {
    serde_json::from_value(Value::Object(doc)).map_err(Error::from)
}

fn insert_optional<T: serde::Serialize>(
    doc: &mut Document,
    key: &str,
    value: &Option<T>,
) -> Result<()> {
    if let Some(v) = value {
        doc.insert(key.to_string(), serde_json::to_value(v)?);
    }
    Ok(())
}

/// Drop `null` leaves anywhere in the tree
fn strip_nulls(doc: &mut Document) {
    doc.retain(|_, v| !v.is_null());
    for value in doc.values_mut() {
        strip_nulls_value(value);
    }
}

fn strip_nulls_value(value: &mut Value) {
    match value {
        Value::Object(map) => strip_nulls(map),
        Value::Array(items) => items.iter_mut().for_each(strip_nulls_value),
        _ => {}
    }
}
