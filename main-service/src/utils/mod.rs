use chrono::NaiveDateTime;

use afisha_stats_client::datetime;

use crate::error::AppError;

/// `from`/`size` pagination, applied as literal `OFFSET from LIMIT size` so
/// consecutive pages partition the result without gaps or duplicates.
#[derive(Debug, Clone, Copy)]
pub struct Pagination {
    pub offset: i64,
    pub limit: i64,
}

impl Pagination {
    pub fn new(from: Option<i64>, size: Option<i64>) -> Result<Self, AppError> {
        let from = from.unwrap_or(0);
        let size = size.unwrap_or(10);
        if from < 0 {
            return Err(AppError::Validation(
                "from must not be negative".to_string(),
            ));
        }
        if size <= 0 {
            return Err(AppError::Validation("size must be positive".to_string()));
        }
        Ok(Self {
            offset: from,
            limit: size,
        })
    }
}

/// Comma separated id list from a query parameter (`ids=1,2,3`).
pub fn parse_id_list(raw: Option<&str>) -> Result<Option<Vec<i64>>, AppError> {
    let Some(raw) = raw else { return Ok(None) };
    let ids = raw
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<i64>()
                .map_err(|_| AppError::Validation(format!("invalid id in list: {part}")))
        })
        .collect::<Result<Vec<i64>, AppError>>()?;
    Ok(Some(ids))
}

pub fn parse_str_list(raw: Option<&str>) -> Option<Vec<String>> {
    raw.map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect()
    })
}

/// Dated query parameters arrive in the wire format, never ISO 8601.
pub fn parse_datetime_param(
    name: &str,
    raw: Option<&str>,
) -> Result<Option<NaiveDateTime>, AppError> {
    match raw {
        None => Ok(None),
        Some(raw) => datetime::parse(raw).map(Some).map_err(|_| {
            AppError::BadRequest(format!("{name} must use format {}", datetime::FORMAT))
        }),
    }
}

/// Start/end pairs where start after end are rejected across the API.
pub fn check_range(
    start: Option<NaiveDateTime>,
    end: Option<NaiveDateTime>,
) -> Result<(), AppError> {
    if let (Some(start), Some(end)) = (start, end)
        && start > end
    {
        return Err(AppError::BadRequest(
            "rangeStart must not be after rangeEnd".to_string(),
        ));
    }
    Ok(())
}

pub fn check_length(
    field: &str,
    value: &str,
    min: usize,
    max: usize,
) -> Result<(), AppError> {
    let len = value.trim().chars().count();
    if len < min || len > max {
        return Err(AppError::Validation(format!(
            "{field} length must be between {min} and {max} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_defaults_and_bounds() {
        let page = Pagination::new(None, None).unwrap();
        assert_eq!((page.offset, page.limit), (0, 10));

        let page = Pagination::new(Some(30), Some(15)).unwrap();
        assert_eq!((page.offset, page.limit), (30, 15));

        assert!(Pagination::new(Some(-1), None).is_err());
        assert!(Pagination::new(None, Some(0)).is_err());
    }

    #[test]
    fn consecutive_pages_partition_without_gaps() {
        let first = Pagination::new(Some(0), Some(10)).unwrap();
        let second = Pagination::new(Some(10), Some(10)).unwrap();
        assert_eq!(first.offset + first.limit, second.offset);
    }

    #[test]
    fn id_lists_are_comma_separated() {
        assert_eq!(
            parse_id_list(Some("1, 2,3")).unwrap(),
            Some(vec![1, 2, 3])
        );
        assert_eq!(parse_id_list(None).unwrap(), None);
        assert!(parse_id_list(Some("1,x")).is_err());
    }

    #[test]
    fn range_check_rejects_inverted_ranges() {
        let start = afisha_stats_client::datetime::parse("2035-01-02 00:00:00").unwrap();
        let end = afisha_stats_client::datetime::parse("2035-01-01 00:00:00").unwrap();
        assert!(check_range(Some(start), Some(end)).is_err());
        assert!(check_range(Some(end), Some(start)).is_ok());
        assert!(check_range(None, Some(end)).is_ok());
    }

    #[test]
    fn length_check_trims_before_counting() {
        assert!(check_length("title", "  ab  ", 3, 120).is_err());
        assert!(check_length("title", "abc", 3, 120).is_ok());
    }
}
