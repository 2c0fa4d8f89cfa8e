//! Conversational session engine
//!
//! - `SessionManager`: session identity and lifecycle
//! - `MessageLog`: append-only ordered message history
//! - `ContextBuilder`: bounded prompt context from recent history
//! - `ConversationManager`: the per-turn response pipeline

mod context_builder;
mod locks;
pub mod manager;
mod message_log;
mod session_manager;
pub mod store;
pub mod types;

pub use context_builder::{ContextBuilder, CONTEXT_WINDOW_MESSAGES};
pub use locks::{SessionGuard, SessionLocks};
pub use manager::{ConversationManager, GenerationError, PipelineOptions, TextGenerator};
pub use message_log::MessageLog;
pub use session_manager::{SessionError, SessionManager};
pub use store::{FaqStore, MessageStore, SessionStore, StoreHealth};
pub use types::{
    ChatReply, Faq, Message, MessageMetadata, ResponseSource, Session, SessionHistory, UserId,
};
