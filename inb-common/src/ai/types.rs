//! AI request/response types shared by the helper, the clients and the proxy

use serde::{Deserialize, Serialize};

/// `{success, data?, error?}` envelope returned by the proxy and the helper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiResponse<T = String> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> AiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }

    /// Data on success, otherwise the user-facing error string
    pub fn into_result(self) -> std::result::Result<T, String> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            _ => Err(self
                .error
                .unwrap_or_else(|| "알 수 없는 오류가 발생했습니다.".to_string())),
        }
    }
}

impl<T> From<crate::Result<T>> for AiResponse<T> {
    fn from(result: crate::Result<T>) -> Self {
        match result {
            Ok(data) => AiResponse::ok(data),
            Err(e) => AiResponse::err(e.user_message()),
        }
    }
}

/// Chat completion role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Chat request body accepted by `/api/chatgpt`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Search request body accepted by `/api/perplexity`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub messages: Vec<ChatMessage>,
}

/// Video search result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSummary {
    pub video_id: String,
    pub title: String,
    pub description: String,
    pub thumbnail: String,
    pub channel_title: String,
    pub published_at: String,
    /// `m:ss`; absent when the length is unknown
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_shapes() {
        assert_eq!(
            json!(AiResponse::ok("hi".to_string())),
            json!({"success": true, "data": "hi"})
        );
        assert_eq!(
            json!(AiResponse::<String>::err("boom")),
            json!({"success": false, "error": "boom"})
        );
    }

    #[test]
    fn test_into_result() {
        assert_eq!(AiResponse::ok(3).into_result(), Ok(3));
        assert_eq!(
            AiResponse::<i32>::err("키 없음").into_result(),
            Err("키 없음".to_string())
        );
        let broken: AiResponse<i32> = AiResponse {
            success: true,
            data: None,
            error: None,
        };
        assert!(broken.into_result().is_err());
    }

    #[test]
    fn test_envelope_reads_payload_without_default() {
        let ok: AiResponse<VideoSummary> = serde_json::from_value(json!({
            "success": true,
            "data": {
                "videoId": "abc", "title": "물의 순환", "description": "",
                "thumbnail": "", "channelTitle": "과학채널", "publishedAt": "2024-01-01"
            }
        }))
        .unwrap();
        assert_eq!(ok.into_result().unwrap().video_id, "abc");

        let failed: AiResponse<VideoSummary> =
            serde_json::from_value(json!({"success": false, "error": "키 없음"})).unwrap();
        assert!(failed.data.is_none());
        assert_eq!(failed.into_result().unwrap_err(), "키 없음");
    }

    #[test]
    fn test_chat_request_optional_fields() {
        let req: ChatRequest = serde_json::from_value(json!({
            "messages": [{"role": "user", "content": "안녕"}]
        }))
        .unwrap();
        assert_eq!(req.messages[0].role, ChatRole::User);
        assert!(req.model.is_none());
        assert_eq!(
            json!(req),
            json!({"messages": [{"role": "user", "content": "안녕"}]})
        );
    }
}
