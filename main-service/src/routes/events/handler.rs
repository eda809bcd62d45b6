use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Path, Query, State};
use axum::http::{StatusCode, Uri};
use chrono::Utc;
use serde::Deserialize;

use crate::AppState;
use crate::error::AppError;
use crate::extract::Json;
use crate::routes::requests::model::{ParticipationRequestDto, Request};
use crate::routes::users::model::User;
use crate::utils::{Pagination, check_range, parse_datetime_param, parse_id_list, parse_str_list};

use super::model::{
    AdminSearch, Event, EventFullDto, EventRecord, EventShortDto, EventSort, EventState,
    NewEventRequest, PublicSearch, StatusUpdateRequest, StatusUpdateResult, UpdateEventRequest,
    ensure_initiator, published_pairs,
};

async fn full_dtos(state: &AppState, records: Vec<EventRecord>) -> Vec<EventFullDto> {
    let views = state.stats.views(&published_pairs(&records)).await;
    records
        .into_iter()
        .map(|record| {
            let hits = views.get(&record.id).copied().unwrap_or(0);
            record.into_full_dto(hits)
        })
        .collect()
}

async fn short_dtos(state: &AppState, records: Vec<EventRecord>) -> Vec<EventShortDto> {
    let views = state.stats.views(&published_pairs(&records)).await;
    records
        .into_iter()
        .map(|record| {
            let hits = views.get(&record.id).copied().unwrap_or(0);
            record.into_short_dto(hits)
        })
        .collect()
}

async fn full_dto(state: &AppState, record: EventRecord) -> EventFullDto {
    let views = state.stats.views(&published_pairs(std::slice::from_ref(&record))).await;
    let hits = views.get(&record.id).copied().unwrap_or(0);
    record.into_full_dto(hits)
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    from: Option<i64>,
    size: Option<i64>,
}

#[axum::debug_handler]
pub async fn create_event(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(req): Json<NewEventRequest>,
) -> Result<(StatusCode, Json<EventFullDto>), AppError> {
    req.validate(Utc::now().naive_utc())?;
    let record = Event::create(&state.pool, user_id, &req).await?;
    tracing::info!(id = record.id, initiator = user_id, "event created");
    Ok((StatusCode::CREATED, Json(record.into_full_dto(0))))
}

#[axum::debug_handler]
pub async fn find_initiator_events(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Vec<EventShortDto>>, AppError> {
    User::ensure_exists(&state.pool, user_id).await?;
    let page = Pagination::new(query.from, query.size)?;
    let records = Event::find_by_initiator(&state.pool, user_id, page).await?;
    Ok(Json(short_dtos(&state, records).await))
}

#[axum::debug_handler]
pub async fn find_initiator_event(
    State(state): State<AppState>,
    Path((user_id, event_id)): Path<(i64, i64)>,
) -> Result<Json<EventFullDto>, AppError> {
    let record = Event::find_record(&state.pool, event_id).await?;
    ensure_initiator(&record, user_id)?;
    Ok(Json(full_dto(&state, record).await))
}

#[axum::debug_handler]
pub async fn update_initiator_event(
    State(state): State<AppState>,
    Path((user_id, event_id)): Path<(i64, i64)>,
    Json(update): Json<UpdateEventRequest>,
) -> Result<Json<EventFullDto>, AppError> {
    let record = Event::update_by_initiator(&state.pool, user_id, event_id, &update).await?;
    tracing::info!(id = event_id, initiator = user_id, "event updated by initiator");
    Ok(Json(full_dto(&state, record).await))
}

#[axum::debug_handler]
pub async fn find_event_requests(
    State(state): State<AppState>,
    Path((user_id, event_id)): Path<(i64, i64)>,
) -> Result<Json<Vec<ParticipationRequestDto>>, AppError> {
    let record = Event::find_record(&state.pool, event_id).await?;
    ensure_initiator(&record, user_id)?;
    let requests = Request::find_by_event(&state.pool, event_id).await?;
    Ok(Json(requests.into_iter().map(Request::into_dto).collect()))
}

#[axum::debug_handler]
pub async fn update_request_statuses(
    State(state): State<AppState>,
    Path((user_id, event_id)): Path<(i64, i64)>,
    Json(body): Json<StatusUpdateRequest>,
) -> Result<Json<StatusUpdateResult>, AppError> {
    let result = Event::moderate_requests(&state.pool, user_id, event_id, &body).await?;
    tracing::info!(
        event_id,
        confirmed = result.confirmed_requests.len(),
        rejected = result.rejected_requests.len(),
        "participation requests moderated"
    );
    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminSearchQuery {
    users: Option<String>,
    states: Option<String>,
    categories: Option<String>,
    range_start: Option<String>,
    range_end: Option<String>,
    from: Option<i64>,
    size: Option<i64>,
}

#[axum::debug_handler]
pub async fn find_events_by_admin(
    State(state): State<AppState>,
    Query(query): Query<AdminSearchQuery>,
) -> Result<Json<Vec<EventFullDto>>, AppError> {
    let states = match parse_str_list(query.states.as_deref()) {
        None => None,
        Some(raw) => Some(
            raw.iter()
                .map(|name| {
                    EventState::parse(name)
                        .ok_or_else(|| AppError::Validation(format!("unknown event state: {name}")))
                })
                .collect::<Result<Vec<EventState>, AppError>>()?,
        ),
    };
    let range_start = parse_datetime_param("rangeStart", query.range_start.as_deref())?;
    let range_end = parse_datetime_param("rangeEnd", query.range_end.as_deref())?;
    check_range(range_start, range_end)?;
    let search = AdminSearch {
        users: parse_id_list(query.users.as_deref())?,
        states,
        categories: parse_id_list(query.categories.as_deref())?,
        range_start,
        range_end,
        page: Pagination::new(query.from, query.size)?,
    };
    let records = Event::search_admin(&state.pool, &search).await?;
    Ok(Json(full_dtos(&state, records).await))
}

#[axum::debug_handler]
pub async fn update_event_by_admin(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
    Json(update): Json<UpdateEventRequest>,
) -> Result<Json<EventFullDto>, AppError> {
    let record = Event::update_by_admin(&state.pool, event_id, &update).await?;
    tracing::info!(id = event_id, "event updated by admin");
    Ok(Json(full_dto(&state, record).await))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicSearchQuery {
    text: Option<String>,
    categories: Option<String>,
    paid: Option<bool>,
    range_start: Option<String>,
    range_end: Option<String>,
    #[serde(default)]
    only_available: bool,
    sort: Option<String>,
    from: Option<i64>,
    size: Option<i64>,
}

#[axum::debug_handler]
pub async fn find_published_events(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    uri: Uri,
    Query(query): Query<PublicSearchQuery>,
) -> Result<Json<Vec<EventShortDto>>, AppError> {
    let sort = match query.sort.as_deref() {
        None => EventSort::default(),
        Some(raw) => EventSort::parse(raw)
            .ok_or_else(|| AppError::Validation(format!("unknown sort: {raw}")))?,
    };
    let mut range_start = parse_datetime_param("rangeStart", query.range_start.as_deref())?;
    let range_end = parse_datetime_param("rangeEnd", query.range_end.as_deref())?;
    check_range(range_start, range_end)?;
    // No window at all means upcoming events only.
    if range_start.is_none() && range_end.is_none() {
        range_start = Some(Utc::now().naive_utc());
    }
    let search = PublicSearch {
        text: query.text,
        categories: parse_id_list(query.categories.as_deref())?,
        paid: query.paid,
        range_start,
        range_end,
        only_available: query.only_available,
        page: Pagination::new(query.from, query.size)?,
    };
    let records = Event::search_public(&state.pool, &search).await?;

    state.stats.record_hit(uri.path(), &addr.ip().to_string()).await;

    let mut events = short_dtos(&state, records).await;
    if sort == EventSort::Views {
        events.sort_by(|a, b| b.views.cmp(&a.views));
    }
    Ok(Json(events))
}

#[axum::debug_handler]
pub async fn find_published_event(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    uri: Uri,
    Path(event_id): Path<i64>,
) -> Result<Json<EventFullDto>, AppError> {
    let record = Event::find_record(&state.pool, event_id).await?;
    if record.state() != EventState::Published {
        return Err(AppError::not_found("event", event_id));
    }
    state.stats.record_hit(uri.path(), &addr.ip().to_string()).await;
    Ok(Json(full_dto(&state, record).await))
}
