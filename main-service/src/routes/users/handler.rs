use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;

use crate::AppState;
use crate::error::AppError;
use crate::extract::Json;
use crate::utils::{Pagination, parse_id_list};

use super::model::{NewUserRequest, User};

#[derive(Debug, Deserialize)]
pub struct UserListQuery {
    ids: Option<String>,
    from: Option<i64>,
    size: Option<i64>,
}

#[axum::debug_handler]
pub async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<NewUserRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    req.validate()?;
    let user = User::create(&state.pool, &req).await?;
    tracing::info!(id = user.id, "user created");
    Ok((StatusCode::CREATED, Json(user)))
}

#[axum::debug_handler]
pub async fn find_users(
    State(state): State<AppState>,
    Query(query): Query<UserListQuery>,
) -> Result<Json<Vec<User>>, AppError> {
    let page = Pagination::new(query.from, query.size)?;
    let ids = parse_id_list(query.ids.as_deref())?;
    let users = User::find_page(&state.pool, ids.as_deref(), page).await?;
    Ok(Json(users))
}

#[axum::debug_handler]
pub async fn remove_user(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    if !User::delete(&state.pool, user_id).await? {
        return Err(AppError::not_found("user", user_id));
    }
    tracing::info!(id = user_id, "user removed");
    Ok(StatusCode::NO_CONTENT)
}
