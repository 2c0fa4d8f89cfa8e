//! Storage ports used by the conversation core.
//!
//! Every method may fail with a generic storage error; callers decide
//! whether that fails the operation or degrades it.

use anyhow::Result;
use async_trait::async_trait;

use super::types::{Faq, Message, NewMessage, NewSession, Session, UserId};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn find_session_by_token_and_user(
        &self,
        token: &str,
        user_id: UserId,
    ) -> Result<Option<Session>>;

    async fn create_session(&self, session: NewSession) -> Result<Session>;

    async fn update_session(&self, session: &Session) -> Result<Session>;

    /// Most recently started first
    async fn list_sessions_by_user(&self, user_id: UserId) -> Result<Vec<Session>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn append_message(&self, message: NewMessage) -> Result<Message>;

    /// Ordered by timestamp, ties broken by write order. `limit = None` returns all.
    async fn list_messages_by_session(
        &self,
        session_id: i64,
        most_recent_first: bool,
        limit: Option<i64>,
    ) -> Result<Vec<Message>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FaqStore: Send + Sync {
    async fn list_active_faqs(&self, category: Option<String>) -> Result<Vec<Faq>>;

    async fn find_faq_by_id(&self, id: i64) -> Result<Option<Faq>>;
}

#[async_trait]
pub trait StoreHealth: Send + Sync {
    async fn ping(&self) -> Result<()>;
}
