use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use super::store::SessionStore;
use super::types::{NewSession, Session, UserId};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("chat session not found")]
    NotFound,

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Owns session identity and lifecycle
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    allow_client_tokens: bool,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>, allow_client_tokens: bool) -> Self {
        Self {
            store,
            allow_client_tokens,
        }
    }

    pub fn generate_token() -> String {
        Uuid::new_v4().to_string()
    }

    /// Resolve the session for `(token, user_id)`, creating it when absent.
    ///
    /// A matching session is returned unchanged whether active or not. An
    /// unknown client token seeds a new session under that token unless
    /// client tokens are disallowed, in which case it is `NotFound`.
    pub async fn get_or_create(
        &self,
        user_id: UserId,
        client_token: Option<&str>,
    ) -> Result<Session, SessionError> {
        let token = match client_token.map(str::trim).filter(|t| !t.is_empty()) {
            Some(token) => {
                if let Some(session) = self.find(token, user_id).await? {
                    debug!("Reusing session {} for user {}", session.token, user_id);
                    return Ok(session);
                }
                if !self.allow_client_tokens {
                    return Err(SessionError::NotFound);
                }
                token.to_string()
            }
            None => Self::generate_token(),
        };

        let session = self
            .store
            .create_session(NewSession {
                token,
                user_id,
                started_at: Utc::now(),
            })
            .await?;

        info!("Started session {} for user {}", session.token, user_id);
        Ok(session)
    }

    pub async fn find(&self, token: &str, user_id: UserId) -> Result<Option<Session>, SessionError> {
        Ok(self
            .store
            .find_session_by_token_and_user(token, user_id)
            .await?)
    }

    /// Mark the session ended. Ending an already-ended session succeeds without
    /// touching the stored record.
    pub async fn end(&self, token: &str, user_id: UserId) -> Result<bool, SessionError> {
        let mut session = self.find(token, user_id).await?.ok_or(SessionError::NotFound)?;

        if !session.end(Utc::now()) {
            debug!("Session {} already ended", token);
            return Ok(true);
        }

        self.store.update_session(&session).await?;
        info!("Ended session {} for user {}", token, user_id);
        Ok(true)
    }

    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Session>, SessionError> {
        Ok(self.store.list_sessions_by_user(user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::InMemoryStore;
    use crate::services::conversation::store::MockSessionStore;
    use mockall::predicate::eq;

    fn manager(allow_client_tokens: bool) -> (Arc<InMemoryStore>, SessionManager) {
        let store = Arc::new(InMemoryStore::new());
        let manager = SessionManager::new(store.clone(), allow_client_tokens);
        (store, manager)
    }

    #[tokio::test]
    async fn test_without_token_creates_fresh_session() {
        let (_, manager) = manager(true);

        let first = manager.get_or_create(1, None).await.unwrap();
        let second = manager.get_or_create(1, None).await.unwrap();

        assert!(first.is_active);
        assert!(first.ended_at.is_none());
        assert_ne!(first.token, second.token);
        assert_ne!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_same_token_is_idempotent() {
        let (store, manager) = manager(true);
        let created = manager.get_or_create(1, None).await.unwrap();

        let again = manager.get_or_create(1, Some(&created.token)).await.unwrap();
        let third = manager.get_or_create(1, Some(&created.token)).await.unwrap();

        assert_eq!(again, created);
        assert_eq!(third, created);
        assert_eq!(store.list_sessions_by_user(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_client_token_seeds_session_when_allowed() {
        let (_, manager) = manager(true);

        let session = manager.get_or_create(1, Some("client-chosen")).await.unwrap();
        assert_eq!(session.token, "client-chosen");
        assert_eq!(session.user_id, 1);
    }

    #[tokio::test]
    async fn test_unknown_client_token_rejected_when_disallowed() {
        let (_, manager) = manager(false);

        let result = manager.get_or_create(1, Some("client-chosen")).await;
        assert!(matches!(result, Err(SessionError::NotFound)));
    }

    #[tokio::test]
    async fn test_blank_token_treated_as_absent() {
        let (_, manager) = manager(false);

        let session = manager.get_or_create(1, Some("   ")).await.unwrap();
        assert!(!session.token.trim().is_empty());
    }

    #[tokio::test]
    async fn test_ended_session_is_returned_unchanged() {
        let (_, manager) = manager(true);
        let session = manager.get_or_create(1, None).await.unwrap();
        manager.end(&session.token, 1).await.unwrap();

        let resolved = manager.get_or_create(1, Some(&session.token)).await.unwrap();
        assert_eq!(resolved.id, session.id);
        assert!(!resolved.is_active);
    }

    #[tokio::test]
    async fn test_end_unknown_is_not_found() {
        let (_, manager) = manager(true);

        let result = manager.end("missing", 1).await;
        assert!(matches!(result, Err(SessionError::NotFound)));
    }

    #[tokio::test]
    async fn test_end_is_scoped_to_owner() {
        let (_, manager) = manager(true);
        let session = manager.get_or_create(1, None).await.unwrap();

        let result = manager.end(&session.token, 2).await;
        assert!(matches!(result, Err(SessionError::NotFound)));
    }

    #[tokio::test]
    async fn test_end_twice_keeps_first_timestamp() {
        let (_, manager) = manager(true);
        let session = manager.get_or_create(1, None).await.unwrap();

        assert!(manager.end(&session.token, 1).await.unwrap());
        let ended = manager.find(&session.token, 1).await.unwrap().unwrap();
        assert!(!ended.is_active);
        assert!(ended.ended_at.is_some());

        assert!(manager.end(&session.token, 1).await.unwrap());
        let again = manager.find(&session.token, 1).await.unwrap().unwrap();
        assert_eq!(again.ended_at, ended.ended_at);
    }

    #[tokio::test]
    async fn test_end_of_ended_session_skips_update() {
        let mut store = MockSessionStore::new();
        store
            .expect_find_session_by_token_and_user()
            .with(eq("done"), eq(1))
            .returning(|_, _| {
                Ok(Some(Session {
                    id: 9,
                    token: "done".to_string(),
                    user_id: 1,
                    started_at: Utc::now(),
                    ended_at: Some(Utc::now()),
                    is_active: false,
                }))
            });
        store.expect_update_session().never();

        let manager = SessionManager::new(Arc::new(store), true);
        assert!(manager.end("done", 1).await.unwrap());
    }

    #[tokio::test]
    async fn test_storage_failure_propagates() {
        let mut store = MockSessionStore::new();
        store
            .expect_create_session()
            .returning(|_| Err(anyhow::anyhow!("database unreachable")));

        let manager = SessionManager::new(Arc::new(store), true);
        let result = manager.get_or_create(1, None).await;
        assert!(matches!(result, Err(SessionError::Storage(_))));
    }
}
