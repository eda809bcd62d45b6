use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use crate::error::AppError;
use crate::utils::{Pagination, check_length};

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: String,
}

/// Embedded author/initiator representation.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserShort {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct NewUserRequest {
    pub email: String,
    pub name: String,
}

impl NewUserRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        check_length("email", &self.email, 6, 254)?;
        if !self.email.contains('@') {
            return Err(AppError::Validation(
                "email must contain a '@'".to_string(),
            ));
        }
        check_length("name", &self.name, 2, 250)
    }
}

impl User {
    pub async fn create(pool: &PgPool, req: &NewUserRequest) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (email, name) VALUES ($1, $2) RETURNING id, email, name",
        )
        .bind(req.email.trim())
        .bind(req.name.trim())
        .fetch_one(pool)
        .await
    }

    pub async fn find_page(
        pool: &PgPool,
        ids: Option<&[i64]>,
        page: Pagination,
    ) -> Result<Vec<User>, sqlx::Error> {
        match ids {
            Some(ids) => {
                sqlx::query_as::<_, User>(
                    "SELECT id, email, name FROM users WHERE id = ANY($1) \
                     ORDER BY id LIMIT $2 OFFSET $3",
                )
                .bind(ids)
                .bind(page.limit)
                .bind(page.offset)
                .fetch_all(pool)
                .await
            }
            None => {
                sqlx::query_as::<_, User>(
                    "SELECT id, email, name FROM users ORDER BY id LIMIT $1 OFFSET $2",
                )
                .bind(page.limit)
                .bind(page.offset)
                .fetch_all(pool)
                .await
            }
        }
    }

    pub async fn exists(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
                .bind(id)
                .fetch_one(pool)
                .await?;
        Ok(exists)
    }

    pub async fn ensure_exists(pool: &PgPool, id: i64) -> Result<(), AppError> {
        if Self::exists(pool, id).await? {
            Ok(())
        } else {
            Err(AppError::not_found("user", id))
        }
    }

    pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_email_shape_and_lengths() {
        let ok = NewUserRequest {
            email: "ann@example.com".into(),
            name: "Ann".into(),
        };
        assert!(ok.validate().is_ok());

        let no_at = NewUserRequest {
            email: "ann.example.com".into(),
            name: "Ann".into(),
        };
        assert!(no_at.validate().is_err());

        let short_name = NewUserRequest {
            email: "ann@example.com".into(),
            name: "A".into(),
        };
        assert!(short_name.validate().is_err());
    }
}
