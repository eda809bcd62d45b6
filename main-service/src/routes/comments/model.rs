use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use afisha_stats_client::datetime;

use crate::error::AppError;
use crate::routes::events::model::Event;
use crate::routes::users::model::User;
use crate::utils::{Pagination, check_length};

const COMMENT_SELECT: &str = "SELECT cm.id, cm.text, cm.author_id, u.name AS author_name, \
     cm.event_id, cm.created, cm.edited \
     FROM comments cm JOIN users u ON u.id = cm.author_id";

#[derive(Debug, FromRow)]
pub struct Comment {
    pub id: i64,
    pub text: String,
    pub author_id: i64,
    pub author_name: String,
    pub event_id: i64,
    pub created: NaiveDateTime,
    pub edited: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentDto {
    pub id: i64,
    pub text: String,
    pub author_name: String,
    pub event_id: i64,
    #[serde(with = "datetime")]
    pub created: NaiveDateTime,
    pub edited: bool,
}

impl Comment {
    pub fn into_dto(self) -> CommentDto {
        CommentDto {
            id: self.id,
            text: self.text,
            author_name: self.author_name,
            event_id: self.event_id,
            created: self.created,
            edited: self.edited,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub text: String,
}

impl CommentRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        check_length("text", &self.text, 1, 1000)
    }
}

impl Comment {
    pub async fn create(
        pool: &PgPool,
        user_id: i64,
        event_id: i64,
        req: &CommentRequest,
    ) -> Result<Comment, AppError> {
        User::ensure_exists(pool, user_id).await?;
        Event::find_record(pool, event_id).await?;
        let (id,): (i64,) = sqlx::query_as(
            "INSERT INTO comments (text, author_id, event_id, created) \
             VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(req.text.trim())
        .bind(user_id)
        .bind(event_id)
        .bind(Utc::now().naive_utc())
        .fetch_one(pool)
        .await?;
        Self::find_by_id(pool, id).await
    }

    pub async fn find_by_id(pool: &PgPool, comment_id: i64) -> Result<Comment, AppError> {
        let comment =
            sqlx::query_as::<_, Comment>(&format!("{COMMENT_SELECT} WHERE cm.id = $1"))
                .bind(comment_id)
                .fetch_optional(pool)
                .await?;
        comment.ok_or_else(|| AppError::not_found("comment", comment_id))
    }

    /// Loads a comment and checks it belongs to the given author and event.
    async fn find_owned(
        pool: &PgPool,
        user_id: i64,
        event_id: i64,
        comment_id: i64,
    ) -> Result<Comment, AppError> {
        let comment = Self::find_by_id(pool, comment_id).await?;
        if comment.event_id != event_id {
            return Err(AppError::not_found("comment", comment_id));
        }
        if comment.author_id != user_id {
            return Err(AppError::Conflict(format!(
                "user {user_id} is not the author of comment {comment_id}"
            )));
        }
        Ok(comment)
    }

    pub async fn edit(
        pool: &PgPool,
        user_id: i64,
        event_id: i64,
        comment_id: i64,
        req: &CommentRequest,
    ) -> Result<Comment, AppError> {
        Self::find_owned(pool, user_id, event_id, comment_id).await?;
        sqlx::query("UPDATE comments SET text = $2, edited = TRUE WHERE id = $1")
            .bind(comment_id)
            .bind(req.text.trim())
            .execute(pool)
            .await?;
        Self::find_by_id(pool, comment_id).await
    }

    pub async fn delete(
        pool: &PgPool,
        user_id: i64,
        event_id: i64,
        comment_id: i64,
    ) -> Result<(), AppError> {
        Self::find_owned(pool, user_id, event_id, comment_id).await?;
        sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(comment_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn delete_by_admin(pool: &PgPool, comment_id: i64) -> Result<(), AppError> {
        Self::find_by_id(pool, comment_id).await?;
        sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(comment_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn find_by_author_and_event(
        pool: &PgPool,
        user_id: i64,
        event_id: i64,
        page: Pagination,
    ) -> Result<Vec<Comment>, sqlx::Error> {
        sqlx::query_as::<_, Comment>(&format!(
            "{COMMENT_SELECT} WHERE cm.author_id = $1 AND cm.event_id = $2 \
             ORDER BY cm.created DESC LIMIT $3 OFFSET $4"
        ))
        .bind(user_id)
        .bind(event_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(pool)
        .await
    }

    /// Case-insensitive substring search over the author's comments on one
    /// event. A blank needle matches nothing.
    pub async fn search(
        pool: &PgPool,
        user_id: i64,
        event_id: i64,
        text: &str,
        page: Pagination,
    ) -> Result<Vec<Comment>, sqlx::Error> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        sqlx::query_as::<_, Comment>(&format!(
            "{COMMENT_SELECT} WHERE cm.author_id = $1 AND cm.event_id = $2 \
             AND cm.text ILIKE $3 ORDER BY cm.created DESC LIMIT $4 OFFSET $5"
        ))
        .bind(user_id)
        .bind(event_id)
        .bind(format!("%{}%", text.trim()))
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_event(
        pool: &PgPool,
        event_id: i64,
        page: Pagination,
    ) -> Result<Vec<Comment>, sqlx::Error> {
        sqlx::query_as::<_, Comment>(&format!(
            "{COMMENT_SELECT} WHERE cm.event_id = $1 \
             ORDER BY cm.created DESC LIMIT $2 OFFSET $3"
        ))
        .bind(event_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(pool)
        .await
    }

    pub async fn find_in_range(
        pool: &PgPool,
        range_start: Option<NaiveDateTime>,
        range_end: Option<NaiveDateTime>,
        page: Pagination,
    ) -> Result<Vec<Comment>, sqlx::Error> {
        sqlx::query_as::<_, Comment>(&format!(
            "{COMMENT_SELECT} WHERE ($1::timestamp IS NULL OR cm.created >= $1) \
             AND ($2::timestamp IS NULL OR cm.created <= $2) \
             ORDER BY cm.created DESC LIMIT $3 OFFSET $4"
        ))
        .bind(range_start)
        .bind(range_end)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_must_be_present_and_bounded() {
        assert!(CommentRequest { text: "  ".into() }.validate().is_err());
        assert!(CommentRequest { text: "fine".into() }.validate().is_ok());
        assert!(
            CommentRequest {
                text: "x".repeat(1001)
            }
            .validate()
            .is_err()
        );
    }

    #[test]
    fn dto_exposes_the_author_by_name() {
        let comment = Comment {
            id: 4,
            text: "great lineup".into(),
            author_id: 9,
            author_name: "Ann".into(),
            event_id: 2,
            created: Utc::now().naive_utc(),
            edited: true,
        };
        let json = serde_json::to_value(comment.into_dto()).unwrap();
        assert_eq!(json["authorName"], "Ann");
        assert_eq!(json["eventId"], 2);
        assert_eq!(json["edited"], true);
        assert!(json.get("authorId").is_none());
    }
}
