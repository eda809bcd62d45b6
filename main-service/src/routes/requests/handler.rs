use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;

use crate::AppState;
use crate::error::AppError;
use crate::extract::Json;
use crate::routes::users::model::User;

use super::model::{ParticipationRequestDto, Request};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddRequestQuery {
    event_id: i64,
}

#[axum::debug_handler]
pub async fn add_request(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Query(query): Query<AddRequestQuery>,
) -> Result<(StatusCode, Json<ParticipationRequestDto>), AppError> {
    let request = Request::create(&state.pool, user_id, query.event_id).await?;
    tracing::info!(
        id = request.id,
        user_id,
        event_id = query.event_id,
        "participation request created"
    );
    Ok((StatusCode::CREATED, Json(request.into_dto())))
}

#[axum::debug_handler]
pub async fn find_user_requests(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<ParticipationRequestDto>>, AppError> {
    User::ensure_exists(&state.pool, user_id).await?;
    let requests = Request::find_by_requester(&state.pool, user_id).await?;
    Ok(Json(requests.into_iter().map(Request::into_dto).collect()))
}

#[axum::debug_handler]
pub async fn cancel_request(
    State(state): State<AppState>,
    Path((user_id, request_id)): Path<(i64, i64)>,
) -> Result<Json<ParticipationRequestDto>, AppError> {
    let request = Request::cancel(&state.pool, user_id, request_id).await?;
    tracing::info!(id = request_id, user_id, "participation request canceled");
    Ok(Json(request.into_dto()))
}
