//! HTTP types used throughout the middleware pipeline.

use bytes::Bytes;
use http_body_util::Full;

/// The HTTP request type used in the middleware pipeline.
pub type Request = http::Request<Full<Bytes>>;

/// The HTTP response type used in the middleware pipeline.
pub type Response = http::Response<Full<Bytes>>;

/// Extension trait for building JSON responses.
pub trait ResponseExt {
    /// Creates a JSON response with the given status and body.
    fn json(status: http::StatusCode, body: &serde_json::Value) -> Response;

    /// Creates an error envelope response.
    ///
    /// ```json
    /// {"error": {"code": "...", "message": "...", "request_id": "..."}}
    /// ```
    fn json_error(status: http::StatusCode, code: &str, message: &str, request_id: &str) -> Response;
}

impl ResponseExt for Response {
    fn json(status: http::StatusCode, body: &serde_json::Value) -> Response {
        http::Response::builder()
            .status(status)
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from(body.to_string())))
            .expect("failed to build JSON response")
    }

    fn json_error(status: http::StatusCode, code: &str, message: &str, request_id: &str) -> Response {
        let body = serde_json::json!({
            "error": {
                "code": code,
                "message": message,
                "request_id": request_id,
            }
        });
        Self::json(status, &body)
    }
}
