use chrono::{Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Transaction};

use afisha_stats_client::datetime;

use crate::error::AppError;
use crate::routes::categories::model::Category;
use crate::routes::requests::model::{ParticipationRequestDto, Request, RequestStatus};
use crate::routes::users::model::{User, UserShort};
use crate::utils::{Pagination, check_length};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventState {
    Pending,
    Published,
    Canceled,
}

impl EventState {
    pub fn as_str(self) -> &'static str {
        match self {
            EventState::Pending => "PENDING",
            EventState::Published => "PUBLISHED",
            EventState::Canceled => "CANCELED",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "PENDING" => Some(EventState::Pending),
            "PUBLISHED" => Some(EventState::Published),
            "CANCELED" => Some(EventState::Canceled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StateAction {
    SendToReview,
    CancelReview,
    PublishEvent,
    RejectEvent,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LocationDto {
    pub lat: f64,
    pub lon: f64,
}

/// Fully joined event row: category name, initiator name and coordinates
/// come along so DTO mapping never needs extra lookups.
#[derive(Debug, Clone, FromRow)]
pub struct EventRecord {
    pub id: i64,
    pub annotation: String,
    pub category_id: i64,
    pub category_name: String,
    pub confirmed_requests: i64,
    pub created_on: NaiveDateTime,
    pub description: String,
    pub event_date: NaiveDateTime,
    pub initiator_id: i64,
    pub initiator_name: String,
    pub lat: f64,
    pub lon: f64,
    pub paid: bool,
    pub participant_limit: i64,
    pub published_on: Option<NaiveDateTime>,
    pub request_moderation: bool,
    pub state: String,
    pub title: String,
}

/// The slice of an event row the capacity checks need, fetched under
/// `FOR UPDATE` to serialize concurrent participation changes.
#[derive(Debug, FromRow)]
pub struct EventGate {
    pub id: i64,
    pub initiator_id: i64,
    pub state: String,
    pub participant_limit: i64,
    pub confirmed_requests: i64,
    pub request_moderation: bool,
}

impl EventGate {
    pub async fn find_for_update(
        tx: &mut Transaction<'_, Postgres>,
        event_id: i64,
    ) -> Result<Option<EventGate>, sqlx::Error> {
        sqlx::query_as::<_, EventGate>(
            "SELECT id, initiator_id, state, participant_limit, confirmed_requests, \
             request_moderation FROM events WHERE id = $1 FOR UPDATE",
        )
        .bind(event_id)
        .fetch_optional(&mut **tx)
        .await
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventFullDto {
    pub id: i64,
    pub annotation: String,
    pub category: Category,
    pub confirmed_requests: i64,
    #[serde(with = "datetime")]
    pub created_on: NaiveDateTime,
    pub description: String,
    #[serde(with = "datetime")]
    pub event_date: NaiveDateTime,
    pub initiator: UserShort,
    pub location: LocationDto,
    pub paid: bool,
    pub participant_limit: i64,
    #[serde(with = "datetime::option", skip_serializing_if = "Option::is_none")]
    pub published_on: Option<NaiveDateTime>,
    pub request_moderation: bool,
    pub state: EventState,
    pub title: String,
    pub views: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventShortDto {
    pub id: i64,
    pub annotation: String,
    pub category: Category,
    pub confirmed_requests: i64,
    #[serde(with = "datetime")]
    pub event_date: NaiveDateTime,
    pub initiator: UserShort,
    pub paid: bool,
    pub title: String,
    pub views: i64,
}

impl EventRecord {
    pub fn state(&self) -> EventState {
        EventState::parse(&self.state).unwrap_or(EventState::Pending)
    }

    pub fn into_full_dto(self, views: i64) -> EventFullDto {
        let state = self.state();
        EventFullDto {
            id: self.id,
            annotation: self.annotation,
            category: Category {
                id: self.category_id,
                name: self.category_name,
            },
            confirmed_requests: self.confirmed_requests,
            created_on: self.created_on,
            description: self.description,
            event_date: self.event_date,
            initiator: UserShort {
                id: self.initiator_id,
                name: self.initiator_name,
            },
            location: LocationDto {
                lat: self.lat,
                lon: self.lon,
            },
            paid: self.paid,
            participant_limit: self.participant_limit,
            published_on: self.published_on,
            request_moderation: self.request_moderation,
            state,
            title: self.title,
            views,
        }
    }

    pub fn into_short_dto(self, views: i64) -> EventShortDto {
        EventShortDto {
            id: self.id,
            annotation: self.annotation,
            category: Category {
                id: self.category_id,
                name: self.category_name,
            },
            confirmed_requests: self.confirmed_requests,
            event_date: self.event_date,
            initiator: UserShort {
                id: self.initiator_id,
                name: self.initiator_name,
            },
            paid: self.paid,
            title: self.title,
            views,
        }
    }
}

/// `(id, published_on)` pairs for the stats gateway.
pub fn published_pairs(records: &[EventRecord]) -> Vec<(i64, Option<NaiveDateTime>)> {
    records
        .iter()
        .map(|record| (record.id, record.published_on))
        .collect()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEventRequest {
    pub annotation: String,
    pub category: i64,
    pub description: String,
    #[serde(with = "datetime")]
    pub event_date: NaiveDateTime,
    pub location: LocationDto,
    pub paid: Option<bool>,
    pub participant_limit: Option<i64>,
    pub request_moderation: Option<bool>,
    pub title: String,
}

impl NewEventRequest {
    pub fn validate(&self, now: NaiveDateTime) -> Result<(), AppError> {
        check_length("annotation", &self.annotation, 20, 2000)?;
        check_length("description", &self.description, 20, 7000)?;
        check_length("title", &self.title, 3, 120)?;
        if self.participant_limit.is_some_and(|limit| limit < 0) {
            return Err(AppError::Validation(
                "participantLimit must not be negative".to_string(),
            ));
        }
        if self.event_date < now + Duration::hours(2) {
            return Err(AppError::Validation(
                "eventDate must be at least two hours in the future".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    pub annotation: Option<String>,
    pub category: Option<i64>,
    pub description: Option<String>,
    #[serde(default, with = "datetime::option")]
    pub event_date: Option<NaiveDateTime>,
    pub location: Option<LocationDto>,
    pub paid: Option<bool>,
    pub participant_limit: Option<i64>,
    pub request_moderation: Option<bool>,
    pub state_action: Option<StateAction>,
    pub title: Option<String>,
}

impl UpdateEventRequest {
    /// Patch semantics validate only the fields that are present.
    pub fn validate(&self, now: NaiveDateTime) -> Result<(), AppError> {
        if let Some(annotation) = &self.annotation {
            check_length("annotation", annotation, 20, 2000)?;
        }
        if let Some(description) = &self.description {
            check_length("description", description, 20, 7000)?;
        }
        if let Some(title) = &self.title {
            check_length("title", title, 3, 120)?;
        }
        if self.participant_limit.is_some_and(|limit| limit < 0) {
            return Err(AppError::Validation(
                "participantLimit must not be negative".to_string(),
            ));
        }
        if self.event_date.is_some_and(|date| date <= now) {
            return Err(AppError::Validation(
                "eventDate must be in the future".to_string(),
            ));
        }
        Ok(())
    }

    /// Null-means-unchanged field patch; category and state are handled by
    /// the callers because they need lookups or role checks.
    pub fn apply_fields(&self, record: &mut EventRecord) {
        if let Some(annotation) = &self.annotation {
            record.annotation = annotation.clone();
        }
        if let Some(description) = &self.description {
            record.description = description.clone();
        }
        if let Some(event_date) = self.event_date {
            record.event_date = event_date;
        }
        if let Some(location) = self.location {
            record.lat = location.lat;
            record.lon = location.lon;
        }
        if let Some(paid) = self.paid {
            record.paid = paid;
        }
        if let Some(limit) = self.participant_limit {
            record.participant_limit = limit;
        }
        if let Some(moderation) = self.request_moderation {
            record.request_moderation = moderation;
        }
        if let Some(title) = &self.title {
            record.title = title.clone();
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventSort {
    #[default]
    EventDate,
    Views,
}

impl EventSort {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "EVENT_DATE" => Some(EventSort::EventDate),
            "VIEWS" => Some(EventSort::Views),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct PublicSearch {
    pub text: Option<String>,
    pub categories: Option<Vec<i64>>,
    pub paid: Option<bool>,
    pub range_start: Option<NaiveDateTime>,
    pub range_end: Option<NaiveDateTime>,
    pub only_available: bool,
    pub page: Pagination,
}

#[derive(Debug)]
pub struct AdminSearch {
    pub users: Option<Vec<i64>>,
    pub states: Option<Vec<EventState>>,
    pub categories: Option<Vec<i64>>,
    pub range_start: Option<NaiveDateTime>,
    pub range_end: Option<NaiveDateTime>,
    pub page: Pagination,
}

const EVENT_SELECT: &str = "SELECT e.id, e.annotation, e.category_id, c.name AS category_name, \
     e.confirmed_requests, e.created_on, e.description, e.event_date, \
     e.initiator_id, u.name AS initiator_name, l.lat, l.lon, e.paid, \
     e.participant_limit, e.published_on, e.request_moderation, e.state, e.title \
     FROM events e \
     JOIN categories c ON c.id = e.category_id \
     JOIN users u ON u.id = e.initiator_id \
     JOIN locations l ON l.id = e.location_id";

pub struct Event;

impl Event {
    pub async fn create(
        pool: &PgPool,
        user_id: i64,
        req: &NewEventRequest,
    ) -> Result<EventRecord, AppError> {
        User::ensure_exists(pool, user_id).await?;
        Category::find_by_id(pool, req.category).await?;

        let mut tx = pool.begin().await?;
        let (location_id,): (i64,) =
            sqlx::query_as("INSERT INTO locations (lat, lon) VALUES ($1, $2) RETURNING id")
                .bind(req.location.lat)
                .bind(req.location.lon)
                .fetch_one(&mut *tx)
                .await?;

        let (event_id,): (i64,) = sqlx::query_as(
            "INSERT INTO events (annotation, category_id, created_on, description, event_date, \
             initiator_id, location_id, paid, participant_limit, request_moderation, state, title) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) RETURNING id",
        )
        .bind(req.annotation.trim())
        .bind(req.category)
        .bind(Utc::now().naive_utc())
        .bind(req.description.trim())
        .bind(req.event_date)
        .bind(user_id)
        .bind(location_id)
        .bind(req.paid.unwrap_or(false))
        .bind(req.participant_limit.unwrap_or(0))
        .bind(req.request_moderation.unwrap_or(true))
        .bind(EventState::Pending.as_str())
        .bind(req.title.trim())
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        Self::find_record(pool, event_id).await
    }

    pub async fn find_record(pool: &PgPool, event_id: i64) -> Result<EventRecord, AppError> {
        let record =
            sqlx::query_as::<_, EventRecord>(&format!("{EVENT_SELECT} WHERE e.id = $1"))
                .bind(event_id)
                .fetch_optional(pool)
                .await?;
        record.ok_or_else(|| AppError::not_found("event", event_id))
    }

    pub async fn find_by_initiator(
        pool: &PgPool,
        user_id: i64,
        page: Pagination,
    ) -> Result<Vec<EventRecord>, sqlx::Error> {
        sqlx::query_as::<_, EventRecord>(&format!(
            "{EVENT_SELECT} WHERE e.initiator_id = $1 ORDER BY e.id LIMIT $2 OFFSET $3"
        ))
        .bind(user_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_ids(pool: &PgPool, ids: &[i64]) -> Result<Vec<EventRecord>, sqlx::Error> {
        sqlx::query_as::<_, EventRecord>(&format!(
            "{EVENT_SELECT} WHERE e.id = ANY($1) ORDER BY e.id"
        ))
        .bind(ids)
        .fetch_all(pool)
        .await
    }

    pub async fn search_public(
        pool: &PgPool,
        search: &PublicSearch,
    ) -> Result<Vec<EventRecord>, sqlx::Error> {
        let mut query = QueryBuilder::new(format!("{EVENT_SELECT} WHERE e.state = 'PUBLISHED'"));
        if let Some(text) = search.text.as_deref().filter(|text| !text.trim().is_empty()) {
            let pattern = format!("%{}%", text.trim());
            query.push(" AND (e.annotation ILIKE ");
            query.push_bind(pattern.clone());
            query.push(" OR e.description ILIKE ");
            query.push_bind(pattern);
            query.push(")");
        }
        if let Some(categories) = &search.categories {
            query.push(" AND e.category_id = ANY(");
            query.push_bind(categories.clone());
            query.push(")");
        }
        if let Some(paid) = search.paid {
            query.push(" AND e.paid = ");
            query.push_bind(paid);
        }
        if let Some(start) = search.range_start {
            query.push(" AND e.event_date >= ");
            query.push_bind(start);
        }
        if let Some(end) = search.range_end {
            query.push(" AND e.event_date <= ");
            query.push_bind(end);
        }
        if search.only_available {
            query.push(
                " AND (e.participant_limit = 0 OR e.confirmed_requests < e.participant_limit)",
            );
        }
        query.push(" ORDER BY e.event_date ASC LIMIT ");
        query.push_bind(search.page.limit);
        query.push(" OFFSET ");
        query.push_bind(search.page.offset);

        query.build_query_as().fetch_all(pool).await
    }

    pub async fn search_admin(
        pool: &PgPool,
        search: &AdminSearch,
    ) -> Result<Vec<EventRecord>, sqlx::Error> {
        let mut query = QueryBuilder::new(format!("{EVENT_SELECT} WHERE TRUE"));
        if let Some(users) = &search.users {
            query.push(" AND e.initiator_id = ANY(");
            query.push_bind(users.clone());
            query.push(")");
        }
        if let Some(states) = &search.states {
            let states: Vec<String> = states
                .iter()
                .map(|state| state.as_str().to_string())
                .collect();
            query.push(" AND e.state = ANY(");
            query.push_bind(states);
            query.push(")");
        }
        if let Some(categories) = &search.categories {
            query.push(" AND e.category_id = ANY(");
            query.push_bind(categories.clone());
            query.push(")");
        }
        if let Some(start) = search.range_start {
            query.push(" AND e.event_date >= ");
            query.push_bind(start);
        }
        if let Some(end) = search.range_end {
            query.push(" AND e.event_date <= ");
            query.push_bind(end);
        }
        query.push(" ORDER BY e.id ASC LIMIT ");
        query.push_bind(search.page.limit);
        query.push(" OFFSET ");
        query.push_bind(search.page.offset);

        query.build_query_as().fetch_all(pool).await
    }

    /// Persists a patched record; the event and location rows change
    /// together or not at all.
    async fn save(pool: &PgPool, record: &EventRecord) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;
        sqlx::query(
            "UPDATE events SET annotation = $2, category_id = $3, description = $4, \
             event_date = $5, paid = $6, participant_limit = $7, published_on = $8, \
             request_moderation = $9, state = $10, title = $11 WHERE id = $1",
        )
        .bind(record.id)
        .bind(&record.annotation)
        .bind(record.category_id)
        .bind(&record.description)
        .bind(record.event_date)
        .bind(record.paid)
        .bind(record.participant_limit)
        .bind(record.published_on)
        .bind(record.request_moderation)
        .bind(&record.state)
        .bind(&record.title)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE locations SET lat = $2, lon = $3 \
             WHERE id = (SELECT location_id FROM events WHERE id = $1)",
        )
        .bind(record.id)
        .bind(record.lat)
        .bind(record.lon)
        .execute(&mut *tx)
        .await?;
        tx.commit().await
    }

    pub async fn update_by_initiator(
        pool: &PgPool,
        user_id: i64,
        event_id: i64,
        update: &UpdateEventRequest,
    ) -> Result<EventRecord, AppError> {
        update.validate(Utc::now().naive_utc())?;
        let mut record = Self::find_record(pool, event_id).await?;
        ensure_initiator(&record, user_id)?;
        if record.state() == EventState::Published {
            return Err(AppError::Conflict(format!(
                "event {event_id} is published and can no longer be changed by its initiator"
            )));
        }
        if let Some(action) = update.state_action {
            match action {
                StateAction::SendToReview => record.state = EventState::Pending.as_str().into(),
                StateAction::CancelReview => record.state = EventState::Canceled.as_str().into(),
                StateAction::PublishEvent | StateAction::RejectEvent => {
                    return Err(AppError::Conflict(
                        "publishing and rejecting are admin actions".to_string(),
                    ));
                }
            }
        }
        Self::apply_and_save(pool, record, update).await
    }

    pub async fn update_by_admin(
        pool: &PgPool,
        event_id: i64,
        update: &UpdateEventRequest,
    ) -> Result<EventRecord, AppError> {
        update.validate(Utc::now().naive_utc())?;
        let mut record = Self::find_record(pool, event_id).await?;
        if let Some(action) = update.state_action {
            match action {
                StateAction::PublishEvent => {
                    if record.state() != EventState::Pending {
                        return Err(AppError::Conflict(format!(
                            "event '{}' cannot be published from state {}",
                            record.title, record.state
                        )));
                    }
                    record.state = EventState::Published.as_str().into();
                    record.published_on = Some(Utc::now().naive_utc());
                }
                StateAction::RejectEvent => {
                    if record.state() != EventState::Pending {
                        return Err(AppError::Conflict(format!(
                            "event '{}' cannot be rejected from state {}",
                            record.title, record.state
                        )));
                    }
                    record.state = EventState::Canceled.as_str().into();
                }
                StateAction::SendToReview | StateAction::CancelReview => {
                    return Err(AppError::Conflict(
                        "review actions belong to the initiator".to_string(),
                    ));
                }
            }
        }
        Self::apply_and_save(pool, record, update).await
    }

    async fn apply_and_save(
        pool: &PgPool,
        mut record: EventRecord,
        update: &UpdateEventRequest,
    ) -> Result<EventRecord, AppError> {
        if let Some(category_id) = update.category {
            let category = Category::find_by_id(pool, category_id).await?;
            record.category_id = category.id;
            record.category_name = category.name;
        }
        update.apply_fields(&mut record);
        Self::save(pool, &record).await?;
        Ok(record)
    }
}

pub fn ensure_initiator(record: &EventRecord, user_id: i64) -> Result<(), AppError> {
    if record.initiator_id != user_id {
        return Err(AppError::Conflict(format!(
            "user {user_id} is not the initiator of event {}",
            record.id
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ModerationTarget {
    Confirmed,
    Rejected,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateRequest {
    pub request_ids: Vec<i64>,
    pub status: ModerationTarget,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateResult {
    pub confirmed_requests: Vec<ParticipationRequestDto>,
    pub rejected_requests: Vec<ParticipationRequestDto>,
}

/// Splits a batch of pending requests into confirmations and rejections.
/// Confirmations stop once `vacant` slots are used up; any request that is
/// not pending fails the whole batch.
pub fn plan_status_update(
    target: ModerationTarget,
    mut vacant: i64,
    requests: &[(i64, RequestStatus)],
) -> Result<(Vec<i64>, Vec<i64>), AppError> {
    let mut confirmed = Vec::new();
    let mut rejected = Vec::new();
    for &(id, status) in requests {
        if status != RequestStatus::Pending {
            return Err(AppError::Conflict(format!(
                "request {id} must have status PENDING"
            )));
        }
        if target == ModerationTarget::Confirmed && vacant > 0 {
            confirmed.push(id);
            vacant -= 1;
        } else {
            rejected.push(id);
        }
    }
    Ok((confirmed, rejected))
}

#[derive(Debug, FromRow)]
struct RequestStatusRow {
    id: i64,
    status: String,
}

impl Event {
    /// The capacity-bounded batch transition over an event's pending
    /// requests, run under the event row lock.
    pub async fn moderate_requests(
        pool: &PgPool,
        user_id: i64,
        event_id: i64,
        body: &StatusUpdateRequest,
    ) -> Result<StatusUpdateResult, AppError> {
        let mut tx = pool.begin().await?;
        let gate = EventGate::find_for_update(&mut tx, event_id)
            .await?
            .ok_or_else(|| AppError::not_found("event", event_id))?;
        if gate.initiator_id != user_id {
            return Err(AppError::Conflict(format!(
                "user {user_id} is not the initiator of event {event_id}"
            )));
        }
        // Without moderation or a limit every request is already confirmed
        // on creation; there is nothing to moderate.
        if !gate.request_moderation || gate.participant_limit == 0 {
            return Ok(StatusUpdateResult::default());
        }
        if gate.confirmed_requests >= gate.participant_limit {
            return Err(AppError::Conflict(
                "the participant limit has been reached".to_string(),
            ));
        }

        let rows: Vec<RequestStatusRow> = sqlx::query_as(
            "SELECT id, status FROM requests \
             WHERE event_id = $1 AND id = ANY($2) ORDER BY id FOR UPDATE",
        )
        .bind(event_id)
        .bind(&body.request_ids)
        .fetch_all(&mut *tx)
        .await?;
        let requests: Vec<(i64, RequestStatus)> = rows
            .iter()
            .map(|row| {
                (
                    row.id,
                    RequestStatus::parse(&row.status).unwrap_or(RequestStatus::Pending),
                )
            })
            .collect();

        let vacant = gate.participant_limit - gate.confirmed_requests;
        let (confirmed, rejected) = plan_status_update(body.status, vacant, &requests)?;

        if !confirmed.is_empty() {
            sqlx::query("UPDATE requests SET status = $2 WHERE id = ANY($1)")
                .bind(&confirmed)
                .bind(RequestStatus::Confirmed.as_str())
                .execute(&mut *tx)
                .await?;
            sqlx::query(
                "UPDATE events SET confirmed_requests = confirmed_requests + $2 WHERE id = $1",
            )
            .bind(event_id)
            .bind(confirmed.len() as i64)
            .execute(&mut *tx)
            .await?;
        }
        if !rejected.is_empty() {
            sqlx::query("UPDATE requests SET status = $2 WHERE id = ANY($1)")
                .bind(&rejected)
                .bind(RequestStatus::Rejected.as_str())
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        let mut result = StatusUpdateResult::default();
        for request in Request::find_by_event(pool, event_id).await? {
            if confirmed.contains(&request.id) {
                result.confirmed_requests.push(request.into_dto());
            } else if rejected.contains(&request.id) {
                result.rejected_requests.push(request.into_dto());
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(ids: &[i64]) -> Vec<(i64, RequestStatus)> {
        ids.iter().map(|&id| (id, RequestStatus::Pending)).collect()
    }

    #[test]
    fn confirms_up_to_vacant_capacity_then_rejects() {
        let (confirmed, rejected) =
            plan_status_update(ModerationTarget::Confirmed, 2, &pending(&[1, 2, 3, 4])).unwrap();
        assert_eq!(confirmed, vec![1, 2]);
        assert_eq!(rejected, vec![3, 4]);
    }

    #[test]
    fn confirmed_count_never_exceeds_the_limit() {
        for vacant in 0..6 {
            let (confirmed, _) =
                plan_status_update(ModerationTarget::Confirmed, vacant, &pending(&[1, 2, 3, 4]))
                    .unwrap();
            assert!(confirmed.len() as i64 <= vacant);
        }
    }

    #[test]
    fn rejection_target_rejects_everything() {
        let (confirmed, rejected) =
            plan_status_update(ModerationTarget::Rejected, 5, &pending(&[1, 2])).unwrap();
        assert!(confirmed.is_empty());
        assert_eq!(rejected, vec![1, 2]);
    }

    #[test]
    fn non_pending_request_fails_the_whole_batch() {
        let requests = vec![
            (1, RequestStatus::Pending),
            (2, RequestStatus::Confirmed),
            (3, RequestStatus::Pending),
        ];
        assert!(plan_status_update(ModerationTarget::Confirmed, 5, &requests).is_err());
    }

    fn record() -> EventRecord {
        EventRecord {
            id: 1,
            annotation: "a".repeat(30),
            category_id: 1,
            category_name: "concerts".into(),
            confirmed_requests: 0,
            created_on: Utc::now().naive_utc(),
            description: "d".repeat(30),
            event_date: Utc::now().naive_utc() + Duration::days(3),
            initiator_id: 7,
            initiator_name: "Ann".into(),
            lat: 55.75,
            lon: 37.62,
            paid: false,
            participant_limit: 0,
            published_on: None,
            request_moderation: true,
            state: "PENDING".into(),
            title: "A show".into(),
        }
    }

    #[test]
    fn patch_leaves_absent_fields_untouched() {
        let mut event = record();
        let update = UpdateEventRequest {
            title: Some("Another show".into()),
            paid: Some(true),
            ..Default::default()
        };
        update.apply_fields(&mut event);
        assert_eq!(event.title, "Another show");
        assert!(event.paid);
        assert_eq!(event.participant_limit, 0);
        assert_eq!(event.state, "PENDING");
    }

    #[test]
    fn create_validation_enforces_two_hour_lead() {
        let now = Utc::now().naive_utc();
        let request = NewEventRequest {
            annotation: "a".repeat(30),
            category: 1,
            description: "d".repeat(30),
            event_date: now + Duration::hours(1),
            location: LocationDto { lat: 0.0, lon: 0.0 },
            paid: None,
            participant_limit: None,
            request_moderation: None,
            title: "A show".into(),
        };
        assert!(request.validate(now).is_err());

        let request = NewEventRequest {
            event_date: now + Duration::hours(3),
            ..request
        };
        assert!(request.validate(now).is_ok());
    }

    #[test]
    fn update_validation_checks_only_present_fields() {
        let now = Utc::now().naive_utc();
        let empty = UpdateEventRequest::default();
        assert!(empty.validate(now).is_ok());

        let bad_title = UpdateEventRequest {
            title: Some("ab".into()),
            ..Default::default()
        };
        assert!(bad_title.validate(now).is_err());

        let past_date = UpdateEventRequest {
            event_date: Some(now - Duration::hours(1)),
            ..Default::default()
        };
        assert!(past_date.validate(now).is_err());
    }

    #[test]
    fn ensure_initiator_flags_foreign_users() {
        let event = record();
        assert!(ensure_initiator(&event, 7).is_ok());
        assert!(ensure_initiator(&event, 8).is_err());
    }

    #[test]
    fn state_action_names_follow_the_wire() {
        let action: StateAction = serde_json::from_str("\"PUBLISH_EVENT\"").unwrap();
        assert_eq!(action, StateAction::PublishEvent);
        let action: StateAction = serde_json::from_str("\"SEND_TO_REVIEW\"").unwrap();
        assert_eq!(action, StateAction::SendToReview);
    }
}
