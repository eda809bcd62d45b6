use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};

use crate::error::AppError;
use crate::routes::events::model::{Event, EventRecord, EventShortDto};
use crate::utils::{Pagination, check_length};

#[derive(Debug, FromRow)]
pub struct Compilation {
    pub id: i64,
    pub title: String,
    pub pinned: bool,
}

#[derive(Debug, Serialize)]
pub struct CompilationDto {
    pub id: i64,
    pub title: String,
    pub pinned: bool,
    pub events: Vec<EventShortDto>,
}

#[derive(Debug, Deserialize)]
pub struct NewCompilationRequest {
    pub title: String,
    pub pinned: Option<bool>,
    pub events: Option<Vec<i64>>,
}

impl NewCompilationRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        check_length("title", &self.title, 1, 50)
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateCompilationRequest {
    pub title: Option<String>,
    pub pinned: Option<bool>,
    pub events: Option<Vec<i64>>,
}

impl UpdateCompilationRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(title) = &self.title {
            check_length("title", title, 1, 50)?;
        }
        Ok(())
    }
}

async fn replace_members(
    tx: &mut Transaction<'_, Postgres>,
    compilation_id: i64,
    event_ids: &[i64],
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM compilation_events WHERE compilation_id = $1")
        .bind(compilation_id)
        .execute(&mut **tx)
        .await?;
    for &event_id in event_ids {
        sqlx::query(
            "INSERT INTO compilation_events (compilation_id, event_id) VALUES ($1, $2)",
        )
        .bind(compilation_id)
        .bind(event_id)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

/// Resolves every id to an existing event before the membership is stored.
async fn resolve_members(pool: &PgPool, ids: &[i64]) -> Result<Vec<EventRecord>, AppError> {
    let records = Event::find_by_ids(pool, ids).await?;
    if records.len() != ids.len() {
        let found: Vec<i64> = records.iter().map(|record| record.id).collect();
        let missing = ids
            .iter()
            .find(|id| !found.contains(id))
            .copied()
            .unwrap_or_default();
        return Err(AppError::not_found("event", missing));
    }
    Ok(records)
}

impl Compilation {
    pub async fn create(
        pool: &PgPool,
        req: &NewCompilationRequest,
    ) -> Result<(Compilation, Vec<EventRecord>), AppError> {
        let member_ids = req.events.clone().unwrap_or_default();
        let members = resolve_members(pool, &member_ids).await?;

        let mut tx = pool.begin().await?;
        let compilation = sqlx::query_as::<_, Compilation>(
            "INSERT INTO compilations (title, pinned) VALUES ($1, $2) \
             RETURNING id, title, pinned",
        )
        .bind(req.title.trim())
        .bind(req.pinned.unwrap_or(false))
        .fetch_one(&mut *tx)
        .await?;
        replace_members(&mut tx, compilation.id, &member_ids).await?;
        tx.commit().await?;
        Ok((compilation, members))
    }

    pub async fn update(
        pool: &PgPool,
        compilation_id: i64,
        req: &UpdateCompilationRequest,
    ) -> Result<(Compilation, Vec<EventRecord>), AppError> {
        let mut compilation = Self::find_by_id(pool, compilation_id).await?;
        if let Some(title) = &req.title {
            compilation.title = title.trim().to_string();
        }
        if let Some(pinned) = req.pinned {
            compilation.pinned = pinned;
        }

        let mut tx = pool.begin().await?;
        sqlx::query("UPDATE compilations SET title = $2, pinned = $3 WHERE id = $1")
            .bind(compilation.id)
            .bind(&compilation.title)
            .bind(compilation.pinned)
            .execute(&mut *tx)
            .await?;
        if let Some(member_ids) = &req.events {
            resolve_members(pool, member_ids).await?;
            replace_members(&mut tx, compilation.id, member_ids).await?;
        }
        tx.commit().await?;

        let members = Self::members(pool, compilation.id).await?;
        Ok((compilation, members))
    }

    pub async fn delete(pool: &PgPool, compilation_id: i64) -> Result<(), AppError> {
        let deleted = sqlx::query("DELETE FROM compilations WHERE id = $1")
            .bind(compilation_id)
            .execute(pool)
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(AppError::not_found("compilation", compilation_id));
        }
        Ok(())
    }

    pub async fn find_by_id(pool: &PgPool, compilation_id: i64) -> Result<Compilation, AppError> {
        let compilation = sqlx::query_as::<_, Compilation>(
            "SELECT id, title, pinned FROM compilations WHERE id = $1",
        )
        .bind(compilation_id)
        .fetch_optional(pool)
        .await?;
        compilation.ok_or_else(|| AppError::not_found("compilation", compilation_id))
    }

    pub async fn find_page(
        pool: &PgPool,
        pinned: Option<bool>,
        page: Pagination,
    ) -> Result<Vec<Compilation>, sqlx::Error> {
        sqlx::query_as::<_, Compilation>(
            "SELECT id, title, pinned FROM compilations \
             WHERE ($1::boolean IS NULL OR pinned = $1) \
             ORDER BY id LIMIT $2 OFFSET $3",
        )
        .bind(pinned)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(pool)
        .await
    }

    pub async fn members(
        pool: &PgPool,
        compilation_id: i64,
    ) -> Result<Vec<EventRecord>, AppError> {
        let ids: Vec<(i64,)> = sqlx::query_as(
            "SELECT event_id FROM compilation_events WHERE compilation_id = $1 ORDER BY event_id",
        )
        .bind(compilation_id)
        .fetch_all(pool)
        .await?;
        let ids: Vec<i64> = ids.into_iter().map(|(id,)| id).collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(Event::find_by_ids(pool, &ids).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_is_required_and_bounded() {
        let blank = NewCompilationRequest {
            title: "   ".into(),
            pinned: None,
            events: None,
        };
        assert!(blank.validate().is_err());

        let long = NewCompilationRequest {
            title: "x".repeat(51),
            pinned: None,
            events: None,
        };
        assert!(long.validate().is_err());

        let ok = NewCompilationRequest {
            title: "Weekend picks".into(),
            pinned: Some(true),
            events: Some(vec![1, 2]),
        };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn patch_validation_skips_absent_title() {
        let update = UpdateCompilationRequest {
            title: None,
            pinned: Some(true),
            events: None,
        };
        assert!(update.validate().is_ok());

        let update = UpdateCompilationRequest {
            title: Some("".into()),
            pinned: None,
            events: None,
        };
        assert!(update.validate().is_err());
    }
}
