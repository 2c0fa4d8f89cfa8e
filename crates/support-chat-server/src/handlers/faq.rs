use axum::extract::{Path, Query, State};

use crate::auth::AuthUser;
use crate::models::chat::{FaqDto, FaqQuery};
use crate::services::FaqService;
use crate::utils::{ApiError, ApiResponse};

/// GET /api/chat/faqs?category=
pub async fn list_faqs(
    State(faqs): State<FaqService>,
    _user: AuthUser,
    Query(query): Query<FaqQuery>,
) -> Result<ApiResponse<Vec<FaqDto>>, ApiError> {
    let entries = faqs.list(query.category.as_deref()).await?;
    let entries = entries.into_iter().map(FaqDto::from).collect();

    Ok(ApiResponse::ok(entries, "FAQs retrieved successfully"))
}

/// GET /api/chat/faqs/categories
pub async fn list_categories(
    State(faqs): State<FaqService>,
    _user: AuthUser,
) -> Result<ApiResponse<Vec<String>>, ApiError> {
    let categories = faqs.list_categories().await?;
    Ok(ApiResponse::ok(categories, "FAQ categories retrieved successfully"))
}

/// GET /api/chat/faqs/{id}
pub async fn get_faq(
    State(faqs): State<FaqService>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<ApiResponse<FaqDto>, ApiError> {
    let faq = faqs
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("FAQ not found".to_string()))?;

    Ok(ApiResponse::ok(faq.into(), "FAQ retrieved successfully"))
}
