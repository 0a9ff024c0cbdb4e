//! Client-facing responses for rejected and validated requests.

use axum::{
    http::{
        header::{
            ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
            ACCESS_CONTROL_ALLOW_ORIGIN, RETRY_AFTER,
        },
        HeaderMap, HeaderName, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use crate::ratelimit::RateLimitDecision;

pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

const RATE_LIMIT_MESSAGE: &str = "Rate limit exceeded. Please try again later.";

/// CORS headers merged into every response.
pub fn cors_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("authorization, x-client-info, apikey, content-type"),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("POST, OPTIONS"),
    );
    headers
}

/// A JSON response with the given CORS headers merged in.
pub fn json_response(status: StatusCode, body: &Value, cors: &HeaderMap) -> Response {
    let mut response = (status, Json(body)).into_response();
    let headers = response.headers_mut();
    for (name, value) in cors {
        headers.insert(name.clone(), value.clone());
    }
    response
}

/// Build the 429 response for a rejected request.
///
/// `X-RateLimit-Reset` is the window end in epoch seconds, rounded up.
pub fn build_rejection_response(decision: &RateLimitDecision, cors: &HeaderMap) -> Response {
    let retry_after = decision.retry_after.unwrap_or(0);
    let body = json!({
        "error": RATE_LIMIT_MESSAGE,
        "retryAfter": retry_after,
    });

    let mut response = json_response(StatusCode::TOO_MANY_REQUESTS, &body, cors);
    let headers = response.headers_mut();
    headers.insert(RETRY_AFTER, HeaderValue::from(retry_after));
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from_static("0"));
    headers.insert(
        X_RATELIMIT_RESET,
        HeaderValue::from(decision.reset_at.div_ceil(1000)),
    );
    response
}

/// Build the 400 response for input that failed validation.
pub fn build_validation_error_response(error: &str, cors: &HeaderMap) -> Response {
    json_response(StatusCode::BAD_REQUEST, &json!({ "error": error }), cors)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_rejection_response() {
        let decision = RateLimitDecision {
            allowed: false,
            remaining: 0,
            reset_at: 1_700_000_045_500,
            retry_after: Some(45),
        };

        let response = build_rejection_response(&decision, &cors_headers());

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let headers = response.headers();
        assert_eq!(headers[RETRY_AFTER], "45");
        assert_eq!(headers[X_RATELIMIT_REMAINING], "0");
        assert_eq!(headers[X_RATELIMIT_RESET], "1700000046");
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(headers["content-type"], "application/json");

        let body = body_json(response).await;
        assert_eq!(body["retryAfter"], 45);
        assert_eq!(body["error"], RATE_LIMIT_MESSAGE);
    }

    #[tokio::test]
    async fn test_validation_error_response() {
        let response = build_validation_error_response("Input cannot be empty", &cors_headers());

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.headers().contains_key(ACCESS_CONTROL_ALLOW_HEADERS));
        assert_eq!(
            body_json(response).await,
            json!({ "error": "Input cannot be empty" })
        );
    }
}
