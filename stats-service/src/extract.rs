use axum::extract::{FromRequest, Request};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// `axum::Json` with its rejection folded into `AppError`, so malformed or
/// incomplete bodies come back as a 400 with the usual JSON error envelope
/// instead of axum's plain-text 422.
#[derive(Debug)]
pub struct Json<T>(pub T);

impl<S, T> FromRequest<S> for Json<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(Json(value)),
            Err(rejection) => Err(AppError::BadRequest(rejection.body_text())),
        }
    }
}

impl<T> IntoResponse for Json<T>
where
    T: Serialize,
{
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;

    use afisha_stats_client::EndpointHit;

    fn json_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn hit_without_timestamp_becomes_bad_request() {
        let body = r#"{"app": "afisha", "uri": "/events/1", "ip": "192.0.2.1"}"#;
        let err = Json::<EndpointHit>::from_request(json_request(body), &())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn well_formed_hit_passes_through() {
        let body = r#"{"app": "afisha", "uri": "/events/1", "ip": "192.0.2.1",
                       "timestamp": "2035-01-02 03:04:05"}"#;
        let Json(hit) = Json::<EndpointHit>::from_request(json_request(body), &())
            .await
            .unwrap();
        assert_eq!(hit.uri, "/events/1");
    }
}
