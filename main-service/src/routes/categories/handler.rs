use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;

use crate::AppState;
use crate::error::AppError;
use crate::extract::Json;
use crate::utils::Pagination;

use super::model::{Category, CategoryRequest};

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    from: Option<i64>,
    size: Option<i64>,
}

#[axum::debug_handler]
pub async fn create_category(
    State(state): State<AppState>,
    Json(req): Json<CategoryRequest>,
) -> Result<(StatusCode, Json<Category>), AppError> {
    req.validate()?;
    let category = Category::create(&state.pool, &req).await?;
    tracing::info!(id = category.id, "category created");
    Ok((StatusCode::CREATED, Json(category)))
}

#[axum::debug_handler]
pub async fn update_category(
    State(state): State<AppState>,
    Path(category_id): Path<i64>,
    Json(req): Json<CategoryRequest>,
) -> Result<Json<Category>, AppError> {
    req.validate()?;
    let category = Category::rename(&state.pool, category_id, &req).await?;
    tracing::info!(id = category.id, "category renamed");
    Ok(Json(category))
}

#[axum::debug_handler]
pub async fn remove_category(
    State(state): State<AppState>,
    Path(category_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    Category::delete(&state.pool, category_id).await?;
    tracing::info!(id = category_id, "category removed");
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn find_categories(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Vec<Category>>, AppError> {
    let page = Pagination::new(query.from, query.size)?;
    let categories = Category::find_page(&state.pool, page).await?;
    Ok(Json(categories))
}

#[axum::debug_handler]
pub async fn find_category_by_id(
    State(state): State<AppState>,
    Path(category_id): Path<i64>,
) -> Result<Json<Category>, AppError> {
    let category = Category::find_by_id(&state.pool, category_id).await?;
    Ok(Json(category))
}
