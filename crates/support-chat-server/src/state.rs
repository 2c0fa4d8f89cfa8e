use axum::extract::FromRef;
use std::sync::Arc;

use crate::auth::JwtManager;
use crate::services::conversation::{
    ConversationManager, FaqStore, MessageStore, PipelineOptions, SessionStore, StoreHealth,
    TextGenerator,
};
use crate::services::FaqService;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub conversation_manager: Arc<ConversationManager>,
    pub faq_service: FaqService,
    pub jwt_manager: Arc<JwtManager>,
    pub store_health: Arc<dyn StoreHealth>,
}

impl AppState {
    /// Wire every service over one store implementing all ports
    pub fn new<S>(
        store: Arc<S>,
        generator: Arc<dyn TextGenerator>,
        jwt_manager: Arc<JwtManager>,
        options: PipelineOptions,
    ) -> Self
    where
        S: SessionStore + MessageStore + FaqStore + StoreHealth + 'static,
    {
        let conversation_manager = ConversationManager::new(
            store.clone(),
            store.clone(),
            generator,
            options,
        );

        Self {
            conversation_manager: Arc::new(conversation_manager),
            faq_service: FaqService::new(store.clone()),
            jwt_manager,
            store_health: store,
        }
    }
}

impl FromRef<AppState> for Arc<ConversationManager> {
    fn from_ref(state: &AppState) -> Self {
        state.conversation_manager.clone()
    }
}

impl FromRef<AppState> for FaqService {
    fn from_ref(state: &AppState) -> Self {
        state.faq_service.clone()
    }
}

impl FromRef<AppState> for Arc<JwtManager> {
    fn from_ref(state: &AppState) -> Self {
        state.jwt_manager.clone()
    }
}
