use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::services::conversation::{Faq, Message, ResponseSource, Session, SessionHistory};

// ===== REQUEST MODELS =====

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[validate(length(min = 1, max = 4000, message = "Message must be between 1 and 4000 characters"))]
    pub message: String,

    #[serde(default)]
    #[validate(length(max = 64, message = "Session id must be at most 64 characters"))]
    pub session_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FaqQuery {
    pub category: Option<String>,
}

// ===== RESPONSE MODELS =====

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSessionDto {
    pub id: i64,
    #[serde(rename = "sessionId")]
    pub session_token: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<ChatMessageDto>>,
}

impl From<Session> for ChatSessionDto {
    fn from(session: Session) -> Self {
        Self {
            id: session.id,
            session_token: session.token,
            started_at: session.started_at,
            ended_at: session.ended_at,
            is_active: session.is_active,
            messages: None,
        }
    }
}

impl From<SessionHistory> for ChatSessionDto {
    fn from(history: SessionHistory) -> Self {
        let mut dto = ChatSessionDto::from(history.session);
        dto.messages = Some(history.messages.into_iter().map(ChatMessageDto::from).collect());
        dto
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessageDto {
    pub id: i64,
    pub content: String,
    pub is_from_user: bool,
    pub created_at: DateTime<Utc>,
    pub intent: Option<String>,
    pub confidence: Option<String>,
    pub response_source: Option<ResponseSource>,
    #[serde(rename = "relatedFAQId")]
    pub related_faq_id: Option<i64>,
}

impl From<Message> for ChatMessageDto {
    fn from(message: Message) -> Self {
        Self {
            id: message.id,
            content: message.content,
            is_from_user: message.is_from_user,
            created_at: message.created_at,
            intent: message.metadata.intent,
            confidence: message.metadata.confidence,
            response_source: message.metadata.response_source,
            related_faq_id: message.metadata.related_faq_id,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FaqDto {
    pub id: i64,
    pub question: String,
    pub answer: String,
    pub category: Option<String>,
    pub tags: Option<String>,
    pub priority: i32,
    pub view_count: i32,
}

impl From<Faq> for FaqDto {
    fn from(faq: Faq) -> Self {
        Self {
            id: faq.id,
            question: faq.question,
            answer: faq.answer,
            category: faq.category,
            tags: faq.tags,
            priority: faq.priority,
            view_count: faq.view_count,
        }
    }
}
