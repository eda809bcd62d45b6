use axum::{
    body::{Body, to_bytes},
    http::Request,
    middleware::Next,
    response::Response,
};
use tracing::error;

const MAX_LOGGED_BODY: usize = 1024;

/// Captures 5xx response bodies so server-side failures land in the log with
/// their payload, then rebuilds the response unchanged.
pub async fn log_errors(req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let response = next.run(req).await;

    if response.status().is_server_error() {
        let (mut parts, body) = response.into_parts();
        let bytes = match to_bytes(body, MAX_LOGGED_BODY).await {
            Ok(bytes) => bytes,
            Err(err) => {
                error!("Failed to read error response body: {}", err);
                return Response::from_parts(parts, Body::empty());
            }
        };

        error!(
            %method,
            %path,
            status = %parts.status,
            body = %String::from_utf8_lossy(&bytes),
            "server error"
        );

        parts.headers.remove(axum::http::header::CONTENT_LENGTH);
        Response::from_parts(parts, Body::from(bytes))
    } else {
        response
    }
}
