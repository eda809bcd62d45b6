use axum::extract::{Query, State};
use axum::http::StatusCode;
use serde::Deserialize;

use afisha_stats_client::datetime;
use afisha_stats_client::dto::{EndpointHit, ViewStats};

use crate::AppState;
use crate::error::AppError;
use crate::extract::Json;

use super::model::{Hit, validate_hit};

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    start: String,
    end: String,
    uris: Option<String>,
    #[serde(default)]
    unique: bool,
}

#[axum::debug_handler]
pub async fn add_hit(
    State(state): State<AppState>,
    Json(hit): Json<EndpointHit>,
) -> Result<StatusCode, AppError> {
    validate_hit(&hit)?;
    let id = Hit::record(&state.pool, &hit).await?;
    tracing::info!(id, app = %hit.app, uri = %hit.uri, "hit recorded");
    Ok(StatusCode::CREATED)
}

#[axum::debug_handler]
pub async fn get_stats(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<Vec<ViewStats>>, AppError> {
    let start = parse_range_bound("start", &query.start)?;
    let end = parse_range_bound("end", &query.end)?;
    if start > end {
        return Err(AppError::BadRequest(
            "start must not be after end".to_string(),
        ));
    }

    let uris = query.uris.as_deref().map(split_uris);
    let stats = Hit::stats(&state.pool, start, end, uris.as_deref(), query.unique).await?;
    tracing::info!(groups = stats.len(), unique = query.unique, "stats served");
    Ok(Json(stats))
}

fn parse_range_bound(name: &str, raw: &str) -> Result<chrono::NaiveDateTime, AppError> {
    datetime::parse(raw)
        .map_err(|_| AppError::BadRequest(format!("{name} must use format {}", datetime::FORMAT)))
}

fn split_uris(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|uri| !uri.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_comma_separated_uris_and_drops_empties() {
        assert_eq!(
            split_uris("/events/1,/events/2,"),
            vec!["/events/1".to_string(), "/events/2".to_string()]
        );
        assert!(split_uris("").is_empty());
    }

    #[test]
    fn range_bounds_use_the_wire_format() {
        assert!(parse_range_bound("start", "2035-01-01 00:00:00").is_ok());
        assert!(parse_range_bound("start", "2035-01-01T00:00:00").is_err());
    }
}
