use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;

use crate::AppState;
use crate::error::AppError;
use crate::extract::Json;
use crate::utils::{Pagination, check_range, parse_datetime_param};

use super::model::{Comment, CommentDto, CommentRequest};

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    from: Option<i64>,
    size: Option<i64>,
}

fn into_dtos(comments: Vec<Comment>) -> Vec<CommentDto> {
    comments.into_iter().map(Comment::into_dto).collect()
}

#[axum::debug_handler]
pub async fn add_comment(
    State(state): State<AppState>,
    Path((user_id, event_id)): Path<(i64, i64)>,
    Json(req): Json<CommentRequest>,
) -> Result<(StatusCode, Json<CommentDto>), AppError> {
    req.validate()?;
    let comment = Comment::create(&state.pool, user_id, event_id, &req).await?;
    tracing::info!(id = comment.id, author = user_id, event_id, "comment added");
    Ok((StatusCode::CREATED, Json(comment.into_dto())))
}

#[axum::debug_handler]
pub async fn edit_comment(
    State(state): State<AppState>,
    Path((user_id, event_id, comment_id)): Path<(i64, i64, i64)>,
    Json(req): Json<CommentRequest>,
) -> Result<Json<CommentDto>, AppError> {
    req.validate()?;
    let comment = Comment::edit(&state.pool, user_id, event_id, comment_id, &req).await?;
    tracing::info!(id = comment_id, author = user_id, "comment edited");
    Ok(Json(comment.into_dto()))
}

#[axum::debug_handler]
pub async fn remove_comment(
    State(state): State<AppState>,
    Path((user_id, event_id, comment_id)): Path<(i64, i64, i64)>,
) -> Result<StatusCode, AppError> {
    Comment::delete(&state.pool, user_id, event_id, comment_id).await?;
    tracing::info!(id = comment_id, author = user_id, "comment removed");
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn find_comment(
    State(state): State<AppState>,
    Path((_user_id, event_id, comment_id)): Path<(i64, i64, i64)>,
) -> Result<Json<CommentDto>, AppError> {
    let comment = Comment::find_by_id(&state.pool, comment_id).await?;
    if comment.event_id != event_id {
        return Err(AppError::not_found("comment", comment_id));
    }
    Ok(Json(comment.into_dto()))
}

#[axum::debug_handler]
pub async fn find_own_comments(
    State(state): State<AppState>,
    Path((user_id, event_id)): Path<(i64, i64)>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Vec<CommentDto>>, AppError> {
    let page = Pagination::new(query.from, query.size)?;
    let comments = Comment::find_by_author_and_event(&state.pool, user_id, event_id, page).await?;
    Ok(Json(into_dtos(comments)))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    text: String,
    from: Option<i64>,
    size: Option<i64>,
}

#[axum::debug_handler]
pub async fn search_own_comments(
    State(state): State<AppState>,
    Path((user_id, event_id)): Path<(i64, i64)>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<CommentDto>>, AppError> {
    let page = Pagination::new(query.from, query.size)?;
    let comments = Comment::search(&state.pool, user_id, event_id, &query.text, page).await?;
    Ok(Json(into_dtos(comments)))
}

#[axum::debug_handler]
pub async fn find_event_comments(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Vec<CommentDto>>, AppError> {
    let page = Pagination::new(query.from, query.size)?;
    let comments = Comment::find_by_event(&state.pool, event_id, page).await?;
    Ok(Json(into_dtos(comments)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminCommentQuery {
    range_start: Option<String>,
    range_end: Option<String>,
    from: Option<i64>,
    size: Option<i64>,
}

#[axum::debug_handler]
pub async fn find_comments_by_admin(
    State(state): State<AppState>,
    Query(query): Query<AdminCommentQuery>,
) -> Result<Json<Vec<CommentDto>>, AppError> {
    let range_start = parse_datetime_param("rangeStart", query.range_start.as_deref())?;
    let range_end = parse_datetime_param("rangeEnd", query.range_end.as_deref())?;
    check_range(range_start, range_end)?;
    let page = Pagination::new(query.from, query.size)?;
    let comments = Comment::find_in_range(&state.pool, range_start, range_end, page).await?;
    Ok(Json(into_dtos(comments)))
}

#[axum::debug_handler]
pub async fn remove_comment_by_admin(
    State(state): State<AppState>,
    Path(comment_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    Comment::delete_by_admin(&state.pool, comment_id).await?;
    tracing::info!(id = comment_id, "comment removed by admin");
    Ok(StatusCode::NO_CONTENT)
}
