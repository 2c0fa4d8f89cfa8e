use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;
use tracing::info;
use validator::Validate;

use crate::auth::AuthUser;
use crate::models::chat::{ChatRequest, ChatSessionDto};
use crate::services::conversation::{ChatReply, ConversationManager};
use crate::utils::{ApiError, ApiResponse};

/// POST /api/chat/send
pub async fn send_message(
    State(manager): State<Arc<ConversationManager>>,
    user: AuthUser,
    Json(request): Json<ChatRequest>,
) -> Result<ApiResponse<ChatReply>, ApiError> {
    request.validate()?;
    if request.message.trim().is_empty() {
        return Err(ApiError::Validation(vec!["Message cannot be empty".to_string()]));
    }

    let reply = manager
        .process(user.user_id, &request.message, request.session_id.as_deref())
        .await;

    if !reply.success {
        return Err(ApiError::BadRequest(reply.message));
    }
    Ok(ApiResponse::ok(reply, "Message processed successfully"))
}

/// GET /api/chat/session/{token}
pub async fn get_session(
    State(manager): State<Arc<ConversationManager>>,
    user: AuthUser,
    Path(token): Path<String>,
) -> Result<ApiResponse<ChatSessionDto>, ApiError> {
    let history = manager
        .session_history(&token, user.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Chat session not found".to_string()))?;

    Ok(ApiResponse::ok(history.into(), "Chat session retrieved successfully"))
}

/// GET /api/chat/sessions
pub async fn list_sessions(
    State(manager): State<Arc<ConversationManager>>,
    user: AuthUser,
) -> Result<ApiResponse<Vec<ChatSessionDto>>, ApiError> {
    let sessions = manager.sessions().list_for_user(user.user_id).await?;
    let sessions = sessions.into_iter().map(ChatSessionDto::from).collect();

    Ok(ApiResponse::ok(sessions, "Chat sessions retrieved successfully"))
}

/// POST /api/chat/session/{token}/end
pub async fn end_session(
    State(manager): State<Arc<ConversationManager>>,
    user: AuthUser,
    Path(token): Path<String>,
) -> Result<ApiResponse<()>, ApiError> {
    manager.sessions().end(&token, user.user_id).await?;
    info!("User {} ended session {}", user.user_id, token);

    Ok(ApiResponse::message("Chat session ended successfully"))
}
