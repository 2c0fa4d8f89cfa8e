use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::Settings;

use super::context_builder::ContextBuilder;
use super::locks::SessionLocks;
use super::message_log::MessageLog;
use super::session_manager::{SessionError, SessionManager};
use super::store::{MessageStore, SessionStore};
use super::types::{ChatReply, MessageMetadata, ResponseSource, Session, SessionHistory, UserId};

/// Agent reply persisted when generation fails or times out
pub const APOLOGY_MESSAGE: &str = "I'm sorry, I couldn't process your request right now.";

/// Returned when the turn itself cannot be carried out
pub const ORCHESTRATION_FAILURE_MESSAGE: &str =
    "I'm sorry, I'm having trouble processing your request right now. Please try again later.";

pub const SESSION_NOT_FOUND_MESSAGE: &str = "Chat session not found.";

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation backend unreachable: {0}")]
    Request(String),

    #[error("generation backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected generation payload: {0}")]
    MalformedPayload(String),

    #[error("generation timed out")]
    Timeout,
}

/// External text-generation capability
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub allow_client_session_tokens: bool,
    pub generation_timeout: Duration,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            allow_client_session_tokens: true,
            generation_timeout: Duration::from_secs(30),
        }
    }
}

impl From<&Settings> for PipelineOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            allow_client_session_tokens: settings.conversation.allow_client_session_tokens,
            generation_timeout: settings.generation.timeout(),
        }
    }
}

/// Runs user turns: session resolution, logging, context, generation, reply
pub struct ConversationManager {
    sessions: SessionManager,
    log: MessageLog,
    context_builder: ContextBuilder,
    generator: Arc<dyn TextGenerator>,
    locks: SessionLocks,
    generation_timeout: Duration,
}

impl ConversationManager {
    pub fn new(
        session_store: Arc<dyn SessionStore>,
        message_store: Arc<dyn MessageStore>,
        generator: Arc<dyn TextGenerator>,
        options: PipelineOptions,
    ) -> Self {
        let log = MessageLog::new(message_store);
        Self {
            sessions: SessionManager::new(session_store, options.allow_client_session_tokens),
            context_builder: ContextBuilder::new(log.clone()),
            log,
            generator,
            locks: SessionLocks::new(),
            generation_timeout: options.generation_timeout,
        }
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Sessions with a turn currently in flight
    pub fn in_flight_sessions(&self) -> usize {
        self.locks.len()
    }

    /// Handle one user message. Never fails: orchestration errors are logged
    /// and reported as `success = false`.
    pub async fn process(
        &self,
        user_id: UserId,
        message: &str,
        session_token: Option<&str>,
    ) -> ChatReply {
        let started = Instant::now();
        let client_token = session_token.map(str::trim).filter(|t| !t.is_empty());
        info!(
            "Processing message for user {} (session: {})",
            user_id,
            client_token.unwrap_or("<new>")
        );

        // Turns on the same session run one at a time
        let _turn = match client_token {
            Some(token) => Some(self.locks.acquire(token).await),
            None => None,
        };

        let session = match self.sessions.get_or_create(user_id, client_token).await {
            Ok(session) => session,
            Err(SessionError::NotFound) => {
                warn!(
                    "Rejected unknown session token for user {}: {}",
                    user_id,
                    client_token.unwrap_or_default()
                );
                return ChatReply::failed(SESSION_NOT_FOUND_MESSAGE, client_token.map(String::from));
            }
            Err(e) => {
                error!("Failed to resolve session for user {}: {:#}", user_id, e);
                return ChatReply::failed(
                    ORCHESTRATION_FAILURE_MESSAGE,
                    client_token.map(String::from),
                );
            }
        };

        match self.run_turn(&session, message).await {
            Ok(reply) => {
                info!(
                    "Processed message for user {} in session {} ({:?}, {} ms)",
                    user_id,
                    session.token,
                    reply.response_source,
                    started.elapsed().as_millis()
                );
                reply
            }
            Err(e) => {
                error!(
                    "Failed to process message for user {} in session {}: {:#}",
                    user_id, session.token, e
                );
                ChatReply::failed(ORCHESTRATION_FAILURE_MESSAGE, Some(session.token))
            }
        }
    }

    async fn run_turn(&self, session: &Session, message: &str) -> Result<ChatReply> {
        self.log.append(session.id, message, true, None).await?;

        // Read after the user write so the current message is part of its own context
        let context = self.context_builder.build_context(session.id).await;
        let prompt = if context.is_empty() { message } else { context.as_str() };

        let (text, source) = self.generate_reply(&session.token, prompt).await;

        self.log
            .append(
                session.id,
                &text,
                false,
                Some(MessageMetadata::agent_turn(source)),
            )
            .await?;

        Ok(ChatReply::answered(text, session.token.clone(), source))
    }

    /// Generated text, or the apology when the backend fails or runs out of time
    async fn generate_reply(&self, session_token: &str, prompt: &str) -> (String, ResponseSource) {
        let call = self.generator.generate(prompt);
        let outcome = match tokio::time::timeout(self.generation_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(GenerationError::Timeout),
        };

        match outcome {
            Ok(text) => (text, ResponseSource::Ai),
            Err(e) => {
                warn!("Generation degraded for session {}: {}", session_token, e);
                (APOLOGY_MESSAGE.to_string(), ResponseSource::Fallback)
            }
        }
    }

    /// The session with its full ordered history, if `user_id` owns it
    pub async fn session_history(
        &self,
        token: &str,
        user_id: UserId,
    ) -> Result<Option<SessionHistory>, SessionError> {
        let Some(session) = self.sessions.find(token, user_id).await? else {
            return Ok(None);
        };
        let messages = self.log.list_ordered(session.id).await?;
        Ok(Some(SessionHistory { session, messages }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::InMemoryStore;
    use crate::services::conversation::store::MockMessageStore;
    use crate::services::conversation::types::{Message, NewMessage};
    use mockall::predicate::eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn manager_with(generator: impl TextGenerator + 'static) -> (Arc<InMemoryStore>, ConversationManager) {
        let store = Arc::new(InMemoryStore::new());
        let manager = ConversationManager::new(
            store.clone(),
            store.clone(),
            Arc::new(generator),
            PipelineOptions::default(),
        );
        (store, manager)
    }

    struct SlowGenerator {
        delay: Duration,
    }

    #[async_trait]
    impl TextGenerator for SlowGenerator {
        async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
            tokio::time::sleep(self.delay).await;
            Ok(format!("re: {prompt}"))
        }
    }

    #[tokio::test]
    async fn test_fresh_user_track_order_scenario() {
        let mut generator = MockTextGenerator::new();
        generator
            .expect_generate()
            .with(eq("How do I track my order?"))
            .times(1)
            .returning(|_| Ok("Visit Order History to track it.".to_string()));
        let (_, manager) = manager_with(generator);

        let reply = manager.process(1, "How do I track my order?", None).await;

        assert!(reply.success);
        assert_eq!(reply.message, "Visit Order History to track it.");
        assert_eq!(reply.response_source, Some(ResponseSource::Ai));
        assert_eq!(reply.intent.as_deref(), Some("general"));
        assert_eq!(reply.confidence, Some(1.0));
        assert!(reply.suggestions.is_empty());

        let token = reply.session_token.unwrap();
        let history = manager.session_history(&token, 1).await.unwrap().unwrap();
        assert_eq!(history.messages.len(), 2);
        assert!(history.messages[0].is_from_user);
        assert_eq!(history.messages[0].content, "How do I track my order?");
        assert_eq!(history.messages[0].metadata, MessageMetadata::default());
        assert!(!history.messages[1].is_from_user);
        assert_eq!(history.messages[1].metadata.response_source, Some(ResponseSource::Ai));
        assert_eq!(history.messages[1].metadata.confidence.as_deref(), Some("1.0"));
    }

    #[tokio::test]
    async fn test_prompt_is_the_recent_window() {
        let mut generator = MockTextGenerator::new();
        generator
            .expect_generate()
            .with(eq("first"))
            .times(1)
            .returning(|_| Ok("one".to_string()));
        generator
            .expect_generate()
            .with(eq("first one second"))
            .times(1)
            .returning(|_| Ok("two".to_string()));
        let (_, manager) = manager_with(generator);

        let first = manager.process(1, "first", None).await;
        let token = first.session_token.unwrap();
        let second = manager.process(1, "second", Some(&token)).await;

        assert!(second.success);
        assert_eq!(second.session_token.as_deref(), Some(token.as_str()));
    }

    #[tokio::test]
    async fn test_generation_failure_degrades() {
        let mut generator = MockTextGenerator::new();
        generator
            .expect_generate()
            .returning(|_| Err(GenerationError::Request("connection refused".to_string())));
        let (_, manager) = manager_with(generator);

        let reply = manager.process(1, "hello", None).await;

        assert!(reply.success);
        assert_eq!(reply.message, APOLOGY_MESSAGE);
        assert_eq!(reply.response_source, Some(ResponseSource::Fallback));

        let token = reply.session_token.unwrap();
        let history = manager.session_history(&token, 1).await.unwrap().unwrap();
        let agent = &history.messages[1];
        assert_eq!(agent.content, APOLOGY_MESSAGE);
        assert_eq!(agent.metadata.response_source, Some(ResponseSource::Fallback));
        assert_eq!(agent.metadata.intent.as_deref(), Some("general"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_generation_timeout_degrades() {
        let (_, manager) = manager_with(SlowGenerator {
            delay: Duration::from_secs(120),
        });

        let reply = manager.process(1, "hello", None).await;

        assert!(reply.success);
        assert_eq!(reply.message, APOLOGY_MESSAGE);
        assert_eq!(reply.response_source, Some(ResponseSource::Fallback));
    }

    #[tokio::test]
    async fn test_append_failure_reports_unsuccessful_reply() {
        let sessions = Arc::new(InMemoryStore::new());
        let mut messages = MockMessageStore::new();
        messages
            .expect_append_message()
            .returning(|_| Err(anyhow::anyhow!("disk full")));
        let mut generator = MockTextGenerator::new();
        generator.expect_generate().never();

        let manager = ConversationManager::new(
            sessions,
            Arc::new(messages),
            Arc::new(generator),
            PipelineOptions::default(),
        );

        let reply = manager.process(1, "hello", Some("abc")).await;

        assert!(!reply.success);
        assert_eq!(reply.message, ORCHESTRATION_FAILURE_MESSAGE);
        assert_eq!(reply.session_token.as_deref(), Some("abc"));
        assert!(reply.response_source.is_none());
    }

    /// Writes through to the in-memory store until the append budget is spent
    struct FailingAfter {
        inner: Arc<InMemoryStore>,
        remaining: AtomicUsize,
    }

    #[async_trait]
    impl MessageStore for FailingAfter {
        async fn append_message(&self, message: NewMessage) -> Result<Message> {
            if self.remaining.fetch_sub(1, Ordering::SeqCst) == 0 {
                anyhow::bail!("connection lost");
            }
            self.inner.append_message(message).await
        }

        async fn list_messages_by_session(
            &self,
            session_id: i64,
            most_recent_first: bool,
            limit: Option<i64>,
        ) -> Result<Vec<Message>> {
            self.inner
                .list_messages_by_session(session_id, most_recent_first, limit)
                .await
        }
    }

    #[tokio::test]
    async fn test_failed_agent_append_leaves_dangling_user_message() {
        let store = Arc::new(InMemoryStore::new());
        let messages = FailingAfter {
            inner: store.clone(),
            remaining: AtomicUsize::new(1),
        };
        let mut generator = MockTextGenerator::new();
        generator
            .expect_generate()
            .times(1)
            .returning(|_| Ok("on its way".to_string()));

        let manager = ConversationManager::new(
            store,
            Arc::new(messages),
            Arc::new(generator),
            PipelineOptions::default(),
        );

        let reply = manager.process(1, "hello", Some("dangling")).await;
        assert!(!reply.success);
        assert_eq!(reply.message, ORCHESTRATION_FAILURE_MESSAGE);

        let history = manager.session_history("dangling", 1).await.unwrap().unwrap();
        let replay: Vec<(&str, bool)> = history
            .messages
            .iter()
            .map(|m| (m.content.as_str(), m.is_from_user))
            .collect();
        assert_eq!(replay, vec![("hello", true)]);
    }

    #[tokio::test]
    async fn test_unknown_token_rejected_under_strict_policy() {
        let store = Arc::new(InMemoryStore::new());
        let mut generator = MockTextGenerator::new();
        generator.expect_generate().never();
        let manager = ConversationManager::new(
            store.clone(),
            store,
            Arc::new(generator),
            PipelineOptions {
                allow_client_session_tokens: false,
                ..PipelineOptions::default()
            },
        );

        let reply = manager.process(1, "hello", Some("made-up")).await;

        assert!(!reply.success);
        assert_eq!(reply.message, SESSION_NOT_FOUND_MESSAGE);
    }

    #[tokio::test]
    async fn test_concurrent_turns_keep_user_agent_pairing() {
        let (_, manager) = manager_with(SlowGenerator {
            delay: Duration::from_millis(20),
        });
        let manager = Arc::new(manager);

        let (a, b) = tokio::join!(
            manager.process(1, "first", Some("shared")),
            manager.process(1, "second", Some("shared")),
        );
        assert!(a.success && b.success);

        let history = manager.session_history("shared", 1).await.unwrap().unwrap();
        let senders: Vec<bool> = history.messages.iter().map(|m| m.is_from_user).collect();
        assert_eq!(senders, vec![true, false, true, false]);

        for pair in history.messages.chunks(2) {
            assert!(pair[1].content.ends_with(&pair[0].content));
        }
        assert_eq!(manager.in_flight_sessions(), 0);
    }

    #[tokio::test]
    async fn test_history_is_scoped_to_owner() {
        let mut generator = MockTextGenerator::new();
        generator.expect_generate().returning(|_| Ok("ok".to_string()));
        let (_, manager) = manager_with(generator);

        let reply = manager.process(1, "hello", None).await;
        let token = reply.session_token.unwrap();

        assert!(manager.session_history(&token, 2).await.unwrap().is_none());
        assert!(manager.session_history("missing", 1).await.unwrap().is_none());
    }
}
