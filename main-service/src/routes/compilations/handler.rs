use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;

use crate::AppState;
use crate::error::AppError;
use crate::extract::Json;
use crate::routes::events::model::{EventRecord, published_pairs};
use crate::utils::Pagination;

use super::model::{
    Compilation, CompilationDto, NewCompilationRequest, UpdateCompilationRequest,
};

async fn into_dto(
    state: &AppState,
    compilation: Compilation,
    members: Vec<EventRecord>,
) -> CompilationDto {
    let views = state.stats.views(&published_pairs(&members)).await;
    CompilationDto {
        id: compilation.id,
        title: compilation.title,
        pinned: compilation.pinned,
        events: members
            .into_iter()
            .map(|record| {
                let hits = views.get(&record.id).copied().unwrap_or(0);
                record.into_short_dto(hits)
            })
            .collect(),
    }
}

#[axum::debug_handler]
pub async fn create_compilation(
    State(state): State<AppState>,
    Json(req): Json<NewCompilationRequest>,
) -> Result<(StatusCode, Json<CompilationDto>), AppError> {
    req.validate()?;
    let (compilation, members) = Compilation::create(&state.pool, &req).await?;
    tracing::info!(id = compilation.id, "compilation created");
    Ok((
        StatusCode::CREATED,
        Json(into_dto(&state, compilation, members).await),
    ))
}

#[axum::debug_handler]
pub async fn update_compilation(
    State(state): State<AppState>,
    Path(compilation_id): Path<i64>,
    Json(req): Json<UpdateCompilationRequest>,
) -> Result<Json<CompilationDto>, AppError> {
    req.validate()?;
    let (compilation, members) = Compilation::update(&state.pool, compilation_id, &req).await?;
    tracing::info!(id = compilation_id, "compilation updated");
    Ok(Json(into_dto(&state, compilation, members).await))
}

#[axum::debug_handler]
pub async fn remove_compilation(
    State(state): State<AppState>,
    Path(compilation_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    Compilation::delete(&state.pool, compilation_id).await?;
    tracing::info!(id = compilation_id, "compilation removed");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct CompilationListQuery {
    pinned: Option<bool>,
    from: Option<i64>,
    size: Option<i64>,
}

#[axum::debug_handler]
pub async fn find_compilations(
    State(state): State<AppState>,
    Query(query): Query<CompilationListQuery>,
) -> Result<Json<Vec<CompilationDto>>, AppError> {
    let page = Pagination::new(query.from, query.size)?;
    let compilations = Compilation::find_page(&state.pool, query.pinned, page).await?;
    let mut dtos = Vec::with_capacity(compilations.len());
    for compilation in compilations {
        let members = Compilation::members(&state.pool, compilation.id).await?;
        dtos.push(into_dto(&state, compilation, members).await);
    }
    Ok(Json(dtos))
}

#[axum::debug_handler]
pub async fn find_compilation(
    State(state): State<AppState>,
    Path(compilation_id): Path<i64>,
) -> Result<Json<CompilationDto>, AppError> {
    let compilation = Compilation::find_by_id(&state.pool, compilation_id).await?;
    let members = Compilation::members(&state.pool, compilation.id).await?;
    Ok(Json(into_dto(&state, compilation, members).await))
}
