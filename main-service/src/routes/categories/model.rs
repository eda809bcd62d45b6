use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use crate::error::AppError;
use crate::utils::{Pagination, check_length};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub name: String,
}

impl CategoryRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        check_length("name", &self.name, 1, 50)
    }
}

impl Category {
    pub async fn create(pool: &PgPool, req: &CategoryRequest) -> Result<Category, sqlx::Error> {
        sqlx::query_as::<_, Category>(
            "INSERT INTO categories (name) VALUES ($1) RETURNING id, name",
        )
        .bind(req.name.trim())
        .fetch_one(pool)
        .await
    }

    pub async fn rename(
        pool: &PgPool,
        id: i64,
        req: &CategoryRequest,
    ) -> Result<Category, AppError> {
        let updated = sqlx::query_as::<_, Category>(
            "UPDATE categories SET name = $2 WHERE id = $1 RETURNING id, name",
        )
        .bind(id)
        .bind(req.name.trim())
        .fetch_optional(pool)
        .await?;
        updated.ok_or_else(|| AppError::not_found("category", id))
    }

    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Category, AppError> {
        let category =
            sqlx::query_as::<_, Category>("SELECT id, name FROM categories WHERE id = $1")
                .bind(id)
                .fetch_optional(pool)
                .await?;
        category.ok_or_else(|| AppError::not_found("category", id))
    }

    pub async fn find_page(pool: &PgPool, page: Pagination) -> Result<Vec<Category>, sqlx::Error> {
        sqlx::query_as::<_, Category>(
            "SELECT id, name FROM categories ORDER BY id LIMIT $1 OFFSET $2",
        )
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(pool)
        .await
    }

    /// Deleting a category that still backs events is a conflict.
    pub async fn delete(pool: &PgPool, id: i64) -> Result<(), AppError> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM categories WHERE id = $1)")
                .bind(id)
                .fetch_one(pool)
                .await?;
        let (in_use,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM events WHERE category_id = $1)")
                .bind(id)
                .fetch_one(pool)
                .await?;
        check_deletable(id, exists, in_use)?;

        sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }
}

fn check_deletable(id: i64, exists: bool, in_use: bool) -> Result<(), AppError> {
    if !exists {
        return Err(AppError::not_found("category", id));
    }
    if in_use {
        return Err(AppError::Conflict("The category is not empty".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_length_is_bounded() {
        assert!(CategoryRequest { name: "  ".into() }.validate().is_err());
        assert!(
            CategoryRequest {
                name: "x".repeat(51)
            }
            .validate()
            .is_err()
        );
        assert!(
            CategoryRequest {
                name: "concerts".into()
            }
            .validate()
            .is_ok()
        );
    }

    #[test]
    fn delete_guard_requires_an_existing_empty_category() {
        assert!(matches!(
            check_deletable(5, false, false),
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            check_deletable(5, true, true),
            Err(AppError::Conflict(_))
        ));
        assert!(check_deletable(5, true, false).is_ok());
    }
}
