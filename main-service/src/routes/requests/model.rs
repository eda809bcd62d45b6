use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use afisha_stats_client::datetime;

use crate::error::AppError;
use crate::routes::events::model::EventGate;
use crate::routes::users::model::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestStatus {
    Pending,
    Confirmed,
    Rejected,
    Canceled,
}

impl RequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Pending => "PENDING",
            RequestStatus::Confirmed => "CONFIRMED",
            RequestStatus::Rejected => "REJECTED",
            RequestStatus::Canceled => "CANCELED",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "PENDING" => Some(RequestStatus::Pending),
            "CONFIRMED" => Some(RequestStatus::Confirmed),
            "REJECTED" => Some(RequestStatus::Rejected),
            "CANCELED" => Some(RequestStatus::Canceled),
            _ => None,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct Request {
    pub id: i64,
    pub created: NaiveDateTime,
    pub event_id: i64,
    pub requester_id: i64,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct ParticipationRequestDto {
    pub id: i64,
    #[serde(with = "datetime")]
    pub created: NaiveDateTime,
    pub event: i64,
    pub requester: i64,
    pub status: RequestStatus,
}

impl Request {
    pub fn into_dto(self) -> ParticipationRequestDto {
        let status = RequestStatus::parse(&self.status).unwrap_or(RequestStatus::Pending);
        ParticipationRequestDto {
            id: self.id,
            created: self.created,
            event: self.event_id,
            requester: self.requester_id,
            status,
        }
    }

    /// Creates a participation request. The event row is locked for the
    /// duration of the transaction so concurrent requests cannot both claim
    /// the last vacant slot.
    pub async fn create(pool: &PgPool, user_id: i64, event_id: i64) -> Result<Request, AppError> {
        User::ensure_exists(pool, user_id).await?;

        let mut tx = pool.begin().await?;
        let event = EventGate::find_for_update(&mut tx, event_id)
            .await?
            .ok_or_else(|| AppError::not_found("event", event_id))?;

        if event.initiator_id == user_id {
            return Err(AppError::Conflict(format!(
                "user {user_id} is the initiator of event {event_id}"
            )));
        }
        if event.state != "PUBLISHED" {
            return Err(AppError::Conflict(format!(
                "event {event_id} is not published yet"
            )));
        }
        if event.participant_limit != 0 && event.confirmed_requests >= event.participant_limit {
            return Err(AppError::Conflict(format!(
                "the participant limit of event {event_id} has been reached"
            )));
        }

        // No moderation or no limit: the request is confirmed on the spot.
        let auto_confirm = !event.request_moderation || event.participant_limit == 0;
        let status = if auto_confirm {
            RequestStatus::Confirmed
        } else {
            RequestStatus::Pending
        };

        let request = sqlx::query_as::<_, Request>(
            "INSERT INTO requests (created, event_id, requester_id, status) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, created, event_id, requester_id, status",
        )
        .bind(Utc::now().naive_utc())
        .bind(event_id)
        .bind(user_id)
        .bind(status.as_str())
        .fetch_one(&mut *tx)
        .await?;

        if auto_confirm {
            sqlx::query("UPDATE events SET confirmed_requests = confirmed_requests + 1 WHERE id = $1")
                .bind(event_id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(request)
    }

    /// Cancels the caller's own request; a confirmed one releases its slot.
    pub async fn cancel(pool: &PgPool, user_id: i64, request_id: i64) -> Result<Request, AppError> {
        User::ensure_exists(pool, user_id).await?;

        let mut tx = pool.begin().await?;
        let request = sqlx::query_as::<_, Request>(
            "SELECT id, created, event_id, requester_id, status \
             FROM requests WHERE id = $1 FOR UPDATE",
        )
        .bind(request_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("request", request_id))?;

        if request.requester_id != user_id {
            return Err(AppError::Conflict(format!(
                "only the requester can cancel request {request_id}"
            )));
        }

        if request.status == RequestStatus::Confirmed.as_str() {
            sqlx::query(
                "UPDATE events SET confirmed_requests = confirmed_requests - 1 WHERE id = $1",
            )
            .bind(request.event_id)
            .execute(&mut *tx)
            .await?;
        }

        let canceled = sqlx::query_as::<_, Request>(
            "UPDATE requests SET status = $2 WHERE id = $1 \
             RETURNING id, created, event_id, requester_id, status",
        )
        .bind(request_id)
        .bind(RequestStatus::Canceled.as_str())
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(canceled)
    }

    pub async fn find_by_requester(
        pool: &PgPool,
        user_id: i64,
    ) -> Result<Vec<Request>, sqlx::Error> {
        sqlx::query_as::<_, Request>(
            "SELECT id, created, event_id, requester_id, status \
             FROM requests WHERE requester_id = $1 ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_event(pool: &PgPool, event_id: i64) -> Result<Vec<Request>, sqlx::Error> {
        sqlx::query_as::<_, Request>(
            "SELECT id, created, event_id, requester_id, status \
             FROM requests WHERE event_id = $1 ORDER BY id",
        )
        .bind(event_id)
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_storage_form() {
        for status in [
            RequestStatus::Pending,
            RequestStatus::Confirmed,
            RequestStatus::Rejected,
            RequestStatus::Canceled,
        ] {
            assert_eq!(RequestStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(RequestStatus::parse("NOPE"), None);
    }

    #[test]
    fn dto_uses_wire_status_names() {
        let request = Request {
            id: 1,
            created: Utc::now().naive_utc(),
            event_id: 2,
            requester_id: 3,
            status: "CONFIRMED".into(),
        };
        let json = serde_json::to_value(request.into_dto()).unwrap();
        assert_eq!(json["status"], "CONFIRMED");
        assert_eq!(json["event"], 2);
        assert_eq!(json["requester"], 3);
    }
}
