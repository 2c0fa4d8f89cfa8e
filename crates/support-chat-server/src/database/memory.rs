//! Process-local store used when `database.url` starts with `memory:`
//! and by the integration tests.

use anyhow::{bail, Result};
use async_trait::async_trait;
use parking_lot::RwLock;

use crate::services::conversation::store::{FaqStore, MessageStore, SessionStore, StoreHealth};
use crate::services::conversation::types::{
    Faq, Message, NewMessage, NewSession, Session, UserId,
};

#[derive(Default)]
struct Tables {
    sessions: Vec<Session>,
    messages: Vec<Message>,
    faqs: Vec<Faq>,
    next_session_id: i64,
    next_message_id: i64,
}

#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_faqs(faqs: Vec<Faq>) -> Self {
        let store = Self::new();
        store.tables.write().faqs = faqs;
        store
    }

    /// Store preloaded with the same FAQ set the initial migration inserts
    pub fn seeded() -> Self {
        Self::with_faqs(default_faqs())
    }
}

#[async_trait]
impl SessionStore for InMemoryStore {
    async fn find_session_by_token_and_user(
        &self,
        token: &str,
        user_id: UserId,
    ) -> Result<Option<Session>> {
        let tables = self.tables.read();
        Ok(tables
            .sessions
            .iter()
            .find(|s| s.token == token && s.user_id == user_id)
            .cloned())
    }

    async fn create_session(&self, session: NewSession) -> Result<Session> {
        let mut tables = self.tables.write();
        if tables.sessions.iter().any(|s| s.token == session.token) {
            bail!("session token '{}' already exists", session.token);
        }

        tables.next_session_id += 1;
        let created = Session {
            id: tables.next_session_id,
            token: session.token,
            user_id: session.user_id,
            started_at: session.started_at,
            ended_at: None,
            is_active: true,
        };
        tables.sessions.push(created.clone());
        Ok(created)
    }

    async fn update_session(&self, session: &Session) -> Result<Session> {
        let mut tables = self.tables.write();
        let Some(stored) = tables.sessions.iter_mut().find(|s| s.id == session.id) else {
            bail!("chat session {} does not exist", session.id);
        };
        stored.is_active = session.is_active;
        stored.ended_at = session.ended_at;
        Ok(stored.clone())
    }

    async fn list_sessions_by_user(&self, user_id: UserId) -> Result<Vec<Session>> {
        let tables = self.tables.read();
        let mut sessions: Vec<Session> = tables
            .sessions
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.started_at.cmp(&a.started_at).then(b.id.cmp(&a.id)));
        Ok(sessions)
    }
}

#[async_trait]
impl MessageStore for InMemoryStore {
    async fn append_message(&self, message: NewMessage) -> Result<Message> {
        let mut tables = self.tables.write();
        if !tables.sessions.iter().any(|s| s.id == message.session_id) {
            bail!("chat session {} does not exist", message.session_id);
        }

        tables.next_message_id += 1;
        let stored = Message {
            id: tables.next_message_id,
            session_id: message.session_id,
            content: message.content,
            is_from_user: message.is_from_user,
            created_at: message.created_at,
            metadata: message.metadata,
        };
        tables.messages.push(stored.clone());
        Ok(stored)
    }

    async fn list_messages_by_session(
        &self,
        session_id: i64,
        most_recent_first: bool,
        limit: Option<i64>,
    ) -> Result<Vec<Message>> {
        let tables = self.tables.read();
        let mut messages: Vec<Message> = tables
            .messages
            .iter()
            .filter(|m| m.session_id == session_id)
            .cloned()
            .collect();

        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        if most_recent_first {
            messages.reverse();
        }
        if let Some(limit) = limit {
            messages.truncate(usize::try_from(limit.max(0)).unwrap_or(usize::MAX));
        }
        Ok(messages)
    }
}

#[async_trait]
impl FaqStore for InMemoryStore {
    async fn list_active_faqs(&self, category: Option<String>) -> Result<Vec<Faq>> {
        let tables = self.tables.read();
        let mut faqs: Vec<Faq> = tables
            .faqs
            .iter()
            .filter(|f| f.is_active)
            .filter(|f| match &category {
                Some(wanted) => f.category.as_deref() == Some(wanted.as_str()),
                None => true,
            })
            .cloned()
            .collect();
        faqs.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.question.cmp(&b.question)));
        Ok(faqs)
    }

    async fn find_faq_by_id(&self, id: i64) -> Result<Option<Faq>> {
        Ok(self.tables.read().faqs.iter().find(|f| f.id == id).cloned())
    }
}

#[async_trait]
impl StoreHealth for InMemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

fn faq(id: i64, question: &str, answer: &str, category: &str, tags: &str, priority: i32) -> Faq {
    Faq {
        id,
        question: question.to_string(),
        answer: answer.to_string(),
        category: Some(category.to_string()),
        tags: Some(tags.to_string()),
        priority,
        is_active: true,
        view_count: 0,
    }
}

pub fn default_faqs() -> Vec<Faq> {
    vec![
        faq(
            1,
            "How can I track my order?",
            "You can track your order by logging into your account and visiting the 'Order History' section, or by using the tracking number provided in your order confirmation email.",
            "Order Tracking",
            "order,tracking,delivery",
            1,
        ),
        faq(
            2,
            "What is your return policy?",
            "We offer a 30-day return policy for most items. Products must be in original condition with all tags attached. Some items may have different return policies.",
            "Returns",
            "return,refund,policy",
            1,
        ),
        faq(
            3,
            "How long does delivery take?",
            "Standard delivery takes 3-5 business days. Express delivery (1-2 business days) is available for an additional fee. International shipping may take 7-14 business days.",
            "Delivery",
            "delivery,shipping,time",
            1,
        ),
        faq(
            4,
            "What payment methods do you accept?",
            "We accept all major credit cards (Visa, MasterCard, American Express), PayPal, Apple Pay, Google Pay, and bank transfers.",
            "Payment",
            "payment,credit card,paypal",
            1,
        ),
        faq(
            5,
            "Can I cancel my order?",
            "Orders can be cancelled within 1 hour of placement if they haven't been processed for shipping. Contact our customer service team immediately for assistance.",
            "Orders",
            "cancel,order,modification",
            2,
        ),
    ]
}
