use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque user identifier supplied by the identity layer
pub type UserId = i64;

/// Intent label attached to every agent turn (no classification is performed)
pub const DEFAULT_INTENT: &str = "general";

/// Confidence stored alongside every agent turn
pub const DEFAULT_CONFIDENCE: &str = "1.0";

/// A bounded conversation between one user and the agent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Internal numeric identity
    pub id: i64,

    /// Externally visible token, unique across all sessions
    pub token: String,

    pub user_id: UserId,

    pub started_at: DateTime<Utc>,

    /// Set exactly when `is_active` is false
    pub ended_at: Option<DateTime<Utc>>,

    pub is_active: bool,
}

impl Session {
    /// Mark the session ended. Returns false if it was already ended.
    pub fn end(&mut self, at: DateTime<Utc>) -> bool {
        if !self.is_active {
            return false;
        }
        self.is_active = false;
        self.ended_at = Some(at);
        true
    }
}

/// Insert shape for a session; the store assigns the numeric id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSession {
    pub token: String,
    pub user_id: UserId,
    pub started_at: DateTime<Utc>,
}

/// Origin of an agent reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResponseSource {
    #[serde(rename = "FAQ")]
    Faq,
    #[serde(rename = "AI")]
    Ai,
    #[serde(rename = "Fallback")]
    Fallback,
}

impl ResponseSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Faq => "FAQ",
            Self::Ai => "AI",
            Self::Fallback => "Fallback",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "FAQ" => Some(Self::Faq),
            "AI" => Some(Self::Ai),
            "Fallback" => Some(Self::Fallback),
            _ => None,
        }
    }
}

impl fmt::Display for ResponseSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional classification data carried by agent messages
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageMetadata {
    pub intent: Option<String>,
    pub confidence: Option<String>,
    pub response_source: Option<ResponseSource>,
    pub related_faq_id: Option<i64>,
}

impl MessageMetadata {
    /// Tagging applied to every agent turn produced by the pipeline
    pub fn agent_turn(source: ResponseSource) -> Self {
        Self {
            intent: Some(DEFAULT_INTENT.to_string()),
            confidence: Some(DEFAULT_CONFIDENCE.to_string()),
            response_source: Some(source),
            related_faq_id: None,
        }
    }
}

/// Immutable record of one exchanged message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: i64,
    pub session_id: i64,
    pub content: String,
    pub is_from_user: bool,
    pub created_at: DateTime<Utc>,
    pub metadata: MessageMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub session_id: i64,
    pub content: String,
    pub is_from_user: bool,
    pub created_at: DateTime<Utc>,
    pub metadata: MessageMetadata,
}

/// Curated question/answer record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Faq {
    pub id: i64,
    pub question: String,
    pub answer: String,
    pub category: Option<String>,
    pub tags: Option<String>,
    /// Lower sorts first
    pub priority: i32,
    pub is_active: bool,
    pub view_count: i32,
}

/// A session together with its chronologically ordered messages
#[derive(Debug, Clone)]
pub struct SessionHistory {
    pub session: Session,
    pub messages: Vec<Message>,
}

/// Outcome of one user turn, returned to the caller as-is
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub success: bool,
    pub message: String,
    #[serde(rename = "sessionId")]
    pub session_token: Option<String>,
    pub intent: Option<String>,
    pub confidence: Option<f64>,
    pub response_source: Option<ResponseSource>,
    #[serde(rename = "relatedFAQId")]
    pub related_faq_id: Option<i64>,
    pub suggestions: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl ChatReply {
    pub fn answered(message: String, session_token: String, source: ResponseSource) -> Self {
        Self {
            success: true,
            message,
            session_token: Some(session_token),
            intent: Some(DEFAULT_INTENT.to_string()),
            confidence: Some(1.0),
            response_source: Some(source),
            related_faq_id: None,
            suggestions: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn failed(message: &str, session_token: Option<String>) -> Self {
        Self {
            success: false,
            message: message.to_string(),
            session_token,
            intent: None,
            confidence: None,
            response_source: None,
            related_faq_id: None,
            suggestions: Vec::new(),
            timestamp: Utc::now(),
        }
    }
}
