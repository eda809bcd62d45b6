use chrono::NaiveDateTime;
use sqlx::{PgPool, QueryBuilder};

use afisha_stats_client::dto::{EndpointHit, ViewStats};

use crate::error::AppError;

#[derive(Debug, sqlx::FromRow)]
struct StatsRow {
    app: String,
    uri: String,
    hits: i64,
}

pub struct Hit;

impl Hit {
    pub async fn record(pool: &PgPool, hit: &EndpointHit) -> Result<i64, sqlx::Error> {
        let (id,): (i64,) = sqlx::query_as(
            "INSERT INTO hits (app, uri, ip, created) VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(&hit.app)
        .bind(&hit.uri)
        .bind(&hit.ip)
        .bind(hit.timestamp)
        .fetch_one(pool)
        .await?;
        Ok(id)
    }

    /// Hit counts grouped by `(app, uri)` within the range, most viewed first.
    /// `unique` counts each ip once per uri.
    pub async fn stats(
        pool: &PgPool,
        start: NaiveDateTime,
        end: NaiveDateTime,
        uris: Option<&[String]>,
        unique: bool,
    ) -> Result<Vec<ViewStats>, sqlx::Error> {
        let mut query = QueryBuilder::new("SELECT app, uri, ");
        query.push(if unique {
            "COUNT(DISTINCT ip)"
        } else {
            "COUNT(ip)"
        });
        query.push(" AS hits FROM hits WHERE created BETWEEN ");
        query.push_bind(start);
        query.push(" AND ");
        query.push_bind(end);
        if let Some(uris) = uris {
            query.push(" AND uri = ANY(");
            query.push_bind(uris.to_vec());
            query.push(")");
        }
        query.push(" GROUP BY app, uri ORDER BY hits DESC");

        let rows: Vec<StatsRow> = query.build_query_as().fetch_all(pool).await?;
        Ok(rows
            .into_iter()
            .map(|row| ViewStats {
                app: row.app,
                uri: row.uri,
                hits: row.hits,
            })
            .collect())
    }
}

pub fn validate_hit(hit: &EndpointHit) -> Result<(), AppError> {
    check_field("app", &hit.app, 64)?;
    check_field("uri", &hit.uri, 128)?;
    check_field("ip", &hit.ip, 64)?;
    Ok(())
}

fn check_field(name: &str, value: &str, max: usize) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{name} must not be blank")));
    }
    if value.chars().count() > max {
        return Err(AppError::Validation(format!(
            "{name} must be at most {max} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn hit() -> EndpointHit {
        EndpointHit {
            app: "afisha".into(),
            uri: "/events/1".into(),
            ip: "192.0.2.1".into(),
            timestamp: Utc::now().naive_utc(),
        }
    }

    #[test]
    fn accepts_a_regular_hit() {
        assert!(validate_hit(&hit()).is_ok());
    }

    #[test]
    fn rejects_blank_and_oversized_fields() {
        let mut blank = hit();
        blank.ip = "   ".into();
        assert!(validate_hit(&blank).is_err());

        let mut long = hit();
        long.uri = "x".repeat(129);
        assert!(validate_hit(&long).is_err());
    }
}
