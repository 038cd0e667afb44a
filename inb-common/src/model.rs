//! Notebook data model
//!
//! Document layout:
//! - `students/{studentId}`: [`Student`] profile fields (the id is the document key)
//! - `students/{studentId}/entries/{date}`: one [`InquiryEntry`] per calendar date
//!
//! Field names are camelCase on the wire so documents written by the web
//! client and by these services are interchangeable. Optional fields are
//! skipped when absent; required text fields default to the empty string.

use serde::{Deserialize, Serialize};

/// Student profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub student_id: String,
    pub student_name: String,
    pub student_code: String,
    pub created_at: String,
    pub last_modified: String,
}

/// One day's science-journal record for one student
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InquiryEntry {
    /// Entry key, `YYYY-MM-DD`
    pub date: String,
    #[serde(default)]
    pub today_topic: String,
    #[serde(default)]
    pub questions: String,
    #[serde(default)]
    pub observations: String,
    #[serde(default)]
    pub prior_knowledge: String,
    #[serde(default)]
    pub group_question: String,
    #[serde(default)]
    pub methods: String,
    #[serde(default)]
    pub findings: String,
    #[serde(default)]
    pub reflection_text: String,
    #[serde(default)]
    pub resources: Resources,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reflection_drawing_data_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_lesson_info: Option<LessonInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_table: Option<DataTable>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bar_chart: Option<BarChart>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mind_map: Option<Vec<MindMapNode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scientist_note: Option<ScientistNote>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_recording: Option<VoiceRecording>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_help_logs: Option<AiHelpLogs>,
}

impl InquiryEntry {
    /// Empty entry for a date that has no document yet
    pub fn empty(date: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            ..Default::default()
        }
    }
}

/// Attached files and reference links
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resources {
    #[serde(default)]
    pub files: Vec<FileRef>,
    #[serde(default)]
    pub links: Vec<LinkRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkRef {
    pub id: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Curriculum lesson the day's topic was picked from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonInfo {
    pub curriculum_name: String,
    pub unit: String,
    pub period: u32,
    pub topic: String,
}

/// Student-built data table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataTable {
    pub id: String,
    pub title: String,
    pub rows: u32,
    pub cols: u32,
    pub data: Vec<Vec<TableCell>>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableCell {
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub is_header: bool,
}

/// Student-built bar chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BarChart {
    pub id: String,
    pub title: String,
    pub x_axis_label: String,
    pub y_axis_label: String,
    pub color: String,
    pub data: Vec<BarChartPoint>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarChartPoint {
    pub label: String,
    pub value: f64,
}

/// Mind-map node; children nest recursively
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MindMapNode {
    pub id: String,
    pub text: String,
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<MindMapNode>>,
}

/// Dialogue with a famous-scientist persona
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScientistNote {
    pub scientist_name: String,
    #[serde(default)]
    pub scientist_icon: String,
    #[serde(default)]
    pub messages: Vec<DialogueMessage>,
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialogueRole {
    Scientist,
    Student,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueMessage {
    pub role: DialogueRole,
    pub content: String,
    pub timestamp: String,
}

/// Voice note captured in the browser, stored inline as base64
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceRecording {
    pub data_base64: String,
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
    pub recorded_at: String,
}

/// Append-only record of AI assistance, split by provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AiHelpLogs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chatgpt: Option<Vec<ChatHelpRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perplexity: Option<Vec<SearchHelpRecord>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatHelpRecord {
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub prompt: String,
    pub response: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHelpRecord {
    #[serde(default)]
    pub purpose: String,
    #[serde(default)]
    pub query: String,
    pub response: String,
    pub created_at: String,
}

/// AI provider a help log belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiProvider {
    Chatgpt,
    Perplexity,
}

impl AiProvider {
    /// Key of the provider's array inside `aiHelpLogs`
    pub fn log_key(&self) -> &'static str {
        match self {
            AiProvider::Chatgpt => "chatgpt",
            AiProvider::Perplexity => "perplexity",
        }
    }
}

/// Caller-supplied log payload; the repository stamps `createdAt`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AiLogRequest {
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub purpose: Option<String>,
    #[serde(default)]
    pub query: Option<String>,
    pub response: String,
}

impl AiLogRequest {
    /// Render the record stored under the provider's log array
    pub fn to_record(&self, provider: AiProvider, created_at: &str) -> serde_json::Value {
        match provider {
            AiProvider::Chatgpt => serde_json::json!(ChatHelpRecord {
                field: self.field.clone().unwrap_or_default(),
                prompt: self.prompt.clone().unwrap_or_default(),
                response: self.response.clone(),
                created_at: created_at.to_string(),
            }),
            AiProvider::Perplexity => serde_json::json!(SearchHelpRecord {
                purpose: self.purpose.clone().unwrap_or_default(),
                query: self.query.clone().unwrap_or_default(),
                response: self.response.clone(),
                created_at: created_at.to_string(),
            }),
        }
    }
}
