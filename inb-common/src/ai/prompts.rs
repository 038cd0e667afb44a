//! Prompt builders for the notebook's AI features

use serde::{Deserialize, Serialize};

use super::types::{ChatMessage, ChatRequest};
use crate::model::{DialogueMessage, DialogueRole};

const HELP_SYSTEM_PROMPT: &str = "너는 초등학교 4학년 학생들의 과학 탐구를 돕는 친절한 선생님이야. 학생들이 이해하기 쉽게, 따뜻하고 격려하는 말투로 답변해줘. 답변은 2-4문장 정도로 간결하게 해줘.";

const SEARCH_SYSTEM_PROMPT: &str = "너는 초등학교 4학년 학생들을 위한 과학 자료 도우미야. 최신 정보를 찾아서 초등학생이 이해할 수 있게 쉽고 짧게 설명해줘. 답변은 4-6문장으로 해줘.";

/// Scientist dialogue runs a little warmer than hints
pub const SCIENTIST_TEMPERATURE: f32 = 0.8;

pub const DEFAULT_SCIENTIST: &str = "에디슨";

const SCIENTISTS: &[(&str, &str)] = &[
    ("에디슨", "너는 발명왕 토마스 에디슨이야. 실험과 관찰을 중시하며, 실용적인 발명에 관심이 많아. 초등학교 4학년 학생에게 친근하고 격려하는 말투로 대화해줘."),
    ("아인슈타인", "너는 물리학자 알베르트 아인슈타인이야. 호기심과 질문을 중요하게 생각하며, 학생들의 탐구 정신을 칭찬해줘. 초등학교 4학년 학생에게 친근하고 격려하는 말투로 대화해줘."),
    ("퀴리", "너는 과학자 마리 퀴리야. 관찰과 실험을 통해 진실을 찾는 것을 좋아해. 초등학교 4학년 학생에게 친근하고 격려하는 말투로 대화해줘."),
    ("다윈", "너는 생물학자 찰스 다윈이야. 자연을 관찰하고 패턴을 찾는 것을 좋아해. 초등학교 4학년 학생에게 친근하고 격려하는 말투로 대화해줘."),
    ("뉴턴", "너는 물리학자 아이작 뉴턴이야. 자연 현상을 관찰하고 원리를 찾는 것을 좋아해. 초등학교 4학년 학생에게 친근하고 격려하는 말투로 대화해줘."),
];

/// Kind of hint a student asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HelpKind {
    Topic,
    StudentQuestions,
    GroupQuestion,
    Reflection,
}

impl HelpKind {
    /// Entry field the hint belongs to (recorded in the AI help log)
    pub fn field(&self) -> &'static str {
        match self {
            HelpKind::Topic => "todayTopic",
            HelpKind::StudentQuestions => "questions",
            HelpKind::GroupQuestion => "groupQuestion",
            HelpKind::Reflection => "reflectionText",
        }
    }
}

/// Form fields a hint prompt may draw on
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HelpContext {
    #[serde(default)]
    pub today_topic: Option<String>,
    #[serde(default)]
    pub questions: Option<String>,
    #[serde(default)]
    pub group_question: Option<String>,
    #[serde(default)]
    pub findings: Option<String>,
    #[serde(default)]
    pub prior_knowledge: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// User prompt for a hint
pub fn help_prompt(kind: HelpKind, ctx: &HelpContext) -> String {
    match kind {
        HelpKind::Topic => "초등학교 4학년 학생이 과학 탐구를 할 수 있는 흥미로운 주제 3가지를 추천해줘. \n각 주제는 간단하게 한 줄로 설명해줘. 학교나 집에서 쉽게 할 수 있는 주제로 부탁해.".to_string(),
        HelpKind::StudentQuestions => {
            let topic = non_empty(&ctx.today_topic).unwrap_or("과학 탐구");
            format!(
                "\"{}\"에 대해 초등학교 4학년 학생이 궁금해할 만한 질문 3가지를 만들어줘. \n각 질문은 관찰이나 실험으로 답을 찾을 수 있는 것으로 해줘.",
                topic
            )
        }
        HelpKind::GroupQuestion => match non_empty(&ctx.group_question) {
            Some(question) => format!(
                "초등학교 4학년 학생이 작성한 탐구 문제가 있어: \"{}\"\n이 질문을 과학적 탐구 질문으로 다듬어줘. 구체적이고 측정 가능하며, 실험이나 관찰로 답을 찾을 수 있게 만들어줘.",
                question
            ),
            None => "좋은 과학 탐구 문제를 만드는 방법을 초등학교 4학년 수준에서 설명해줘. \n예시와 함께 3가지 팁을 알려줘.".to_string(),
        },
        HelpKind::Reflection => {
            match non_empty(&ctx.findings).or_else(|| non_empty(&ctx.prior_knowledge)) {
                Some(findings) => format!(
                    "초등학교 4학년 학생이 탐구 후 이런 내용을 발견했어: \"{}\"\n학생이 자신의 생각 변화를 잘 정리할 수 있도록 3가지 질문을 해줘. \n예: \"처음에 생각했던 것과 다른 점은?\", \"친구들과 의견이 달랐던 부분은?\" 같은 질문들이야.",
                    findings
                ),
                None => "초등학교 4학년 학생이 탐구 활동 후 자신의 생각을 돌아볼 수 있는 질문 3가지를 만들어줘.\n생각의 변화, 새로운 발견, 더 알고 싶은 것 등을 스스로 생각해볼 수 있는 질문으로 만들어줘.".to_string(),
            }
        }
    }
}

/// Chat request for a hint
pub fn help_request(kind: HelpKind, ctx: &HelpContext) -> ChatRequest {
    ChatRequest::new(vec![
        ChatMessage::system(HELP_SYSTEM_PROMPT),
        ChatMessage::user(help_prompt(kind, ctx)),
    ])
}

/// Why a student is searching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchPurpose {
    Background,
    Method,
    Comparison,
}

impl SearchPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchPurpose::Background => "background",
            SearchPurpose::Method => "method",
            SearchPurpose::Comparison => "comparison",
        }
    }
}

pub fn search_prompt(purpose: SearchPurpose, query: &str) -> String {
    match purpose {
        SearchPurpose::Background => format!(
            "\"{}\"에 대한 기본 개념을 초등학교 4학년 학생이 이해할 수 있게 설명해줘. \n쉬운 단어를 사용하고, 일상생활의 예시를 들어서 설명해줘.",
            query
        ),
        SearchPurpose::Method => format!(
            "\"{}\"와 관련된 탐구나 실험을 초등학교 4학년 수준에서 할 수 있는 방법 2-3가지를 알려줘. \n학교나 집에서 안전하게 할 수 있는 방법으로 설명해줘.",
            query
        ),
        SearchPurpose::Comparison => format!(
            "\"{}\"에 대해 과학자들은 어떻게 설명하는지 초등학교 4학년 학생이 이해할 수 있게 알려줘. \n최신 과학 정보를 포함해서 간단하게 설명해줘.",
            query
        ),
    }
}

/// Messages for a science search
pub fn search_messages(purpose: SearchPurpose, query: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(SEARCH_SYSTEM_PROMPT),
        ChatMessage::user(search_prompt(purpose, query)),
    ]
}

/// Persona prompt; unknown names fall back to [`DEFAULT_SCIENTIST`]
pub fn scientist_persona(name: &str) -> &'static str {
    SCIENTISTS
        .iter()
        .find(|(n, _)| *n == name)
        .or_else(|| SCIENTISTS.iter().find(|(n, _)| *n == DEFAULT_SCIENTIST))
        .map(|(_, prompt)| *prompt)
        .unwrap_or_default()
}

pub fn known_scientists() -> impl Iterator<Item = &'static str> {
    SCIENTISTS.iter().map(|(name, _)| *name)
}

/// Entry fields the scientist comments on
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScientistContext {
    #[serde(default)]
    pub today_topic: String,
    #[serde(default)]
    pub questions: String,
    #[serde(default)]
    pub observations: String,
    #[serde(default)]
    pub methods: String,
    #[serde(default)]
    pub findings: String,
}

fn or_none(value: &str) -> &str {
    if value.trim().is_empty() {
        "없음"
    } else {
        value
    }
}

/// Opening comment prompt when there is no conversation yet
pub fn scientist_opening_prompt(ctx: &ScientistContext) -> String {
    format!(
        "초등학교 4학년 학생이 오늘 과학 탐구를 했어.\n\n탐구 주제: {}\n궁금한 내용: {}\n관찰한 내용: {}\n탐구 방법: {}\n알게 된 사실: {}\n\n이 학생의 탐구 내용을 보고, 과학자의 입장에서 친근하게 대화형으로 코멘트해줘. \n- 학생의 탐구 과정을 칭찬해줘\n- 과학적 사실이나 원리를 간단히 설명해줘\n- 더 탐구해볼 만한 질문을 제시해줘\n- 초등학교 4학년 수준에 맞게 쉽고 재미있게 설명해줘\n\n대화 형식으로 3-5문장 정도로 답변해줘.",
        or_none(&ctx.today_topic),
        or_none(&ctx.questions),
        or_none(&ctx.observations),
        or_none(&ctx.methods),
        or_none(&ctx.findings),
    )
}

/// Chat request for the next scientist turn
///
/// With history the conversation continues (scientist → assistant,
/// student → user); without it the scientist opens with a comment on the
/// entry.
pub fn scientist_request(
    name: &str,
    ctx: &ScientistContext,
    history: &[DialogueMessage],
) -> ChatRequest {
    let mut messages = vec![ChatMessage::system(scientist_persona(name))];
    if history.is_empty() {
        messages.push(ChatMessage::user(scientist_opening_prompt(ctx)));
    } else {
        messages.extend(history.iter().map(|msg| match msg.role {
            DialogueRole::Scientist => ChatMessage::assistant(msg.content.clone()),
            DialogueRole::Student => ChatMessage::user(msg.content.clone()),
        }));
    }
    ChatRequest::new(messages).with_temperature(SCIENTIST_TEMPERATURE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::types::ChatRole;

    #[test]
    fn test_student_questions_uses_topic() {
        let ctx = HelpContext {
            today_topic: Some("씨앗의 발아".into()),
            ..Default::default()
        };
        assert!(help_prompt(HelpKind::StudentQuestions, &ctx).starts_with("\"씨앗의 발아\""));
        assert!(help_prompt(HelpKind::StudentQuestions, &HelpContext::default())
            .starts_with("\"과학 탐구\""));
    }

    #[test]
    fn test_group_question_branches() {
        let with = HelpContext {
            group_question: Some("물은 왜 얼까?".into()),
            ..Default::default()
        };
        assert!(help_prompt(HelpKind::GroupQuestion, &with).contains("물은 왜 얼까?"));
        assert!(help_prompt(HelpKind::GroupQuestion, &HelpContext::default()).contains("3가지 팁"));
    }

    #[test]
    fn test_reflection_falls_back_to_prior_knowledge() {
        let ctx = HelpContext {
            findings: Some("  ".into()),
            prior_knowledge: Some("얼음은 녹는다".into()),
            ..Default::default()
        };
        assert!(help_prompt(HelpKind::Reflection, &ctx).contains("얼음은 녹는다"));
    }

    #[test]
    fn test_help_kind_wire_names() {
        let kind: HelpKind = serde_json::from_str("\"studentQuestions\"").unwrap();
        assert_eq!(kind, HelpKind::StudentQuestions);
        assert_eq!(kind.field(), "questions");
    }

    #[test]
    fn test_search_messages() {
        let messages = search_messages(SearchPurpose::Method, "자석");
        assert_eq!(messages[0].role, ChatRole::System);
        assert!(messages[1].content.starts_with("\"자석\"와 관련된 탐구나 실험"));
    }

    #[test]
    fn test_unknown_scientist_defaults_to_edison() {
        assert_eq!(scientist_persona("테슬라"), scientist_persona("에디슨"));
        assert!(scientist_persona("퀴리").contains("마리 퀴리"));
        assert_eq!(known_scientists().count(), 5);
    }

    #[test]
    fn test_scientist_history_role_mapping() {
        let history = vec![
            DialogueMessage {
                role: DialogueRole::Scientist,
                content: "안녕!".into(),
                timestamp: "t1".into(),
            },
            DialogueMessage {
                role: DialogueRole::Student,
                content: "왜 그래요?".into(),
                timestamp: "t2".into(),
            },
        ];
        let req = scientist_request("다윈", &ScientistContext::default(), &history);
        let roles: Vec<ChatRole> = req.messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![ChatRole::System, ChatRole::Assistant, ChatRole::User]);
        assert_eq!(req.temperature, Some(SCIENTIST_TEMPERATURE));
    }

    #[test]
    fn test_scientist_opening_fills_missing_fields() {
        let ctx = ScientistContext {
            today_topic: "그림자".into(),
            ..Default::default()
        };
        let req = scientist_request("뉴턴", &ctx, &[]);
        let prompt = &req.messages[1].content;
        assert!(prompt.contains("탐구 주제: 그림자"));
        assert!(prompt.contains("관찰한 내용: 없음"));
    }
}
