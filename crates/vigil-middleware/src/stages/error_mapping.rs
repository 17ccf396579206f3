//! Mapping of authorization errors to HTTP responses.
//!
//! Every error is rendered in the standard envelope:
//!
//! ```json
//! {
//!   "error": {
//!     "code": "ACCESS_DENIED",
//!     "message": "User is not authorised to perform ...",
//!     "request_id": "uuid-v7-request-id"
//!   }
//! }
//! ```
//!
//! | Error | Status | Message |
//! |-------|--------|---------|
//! | `AccessDenied` | 403 | denial reason |
//! | `MissingAuthenticatedUserDetails` | 401 | error message |
//! | anything else | 500 | [`GENERIC_ERROR_MESSAGE`] |

use http::StatusCode;
use tracing::{error, warn};
use vigil_authz::AuthzError;

use crate::context::RequestId;
use crate::types::{Response, ResponseExt};

/// Message returned for errors whose details are not exposed.
pub const GENERIC_ERROR_MESSAGE: &str = "Some error occurred.";

/// Code returned for errors whose details are not exposed.
pub const INTERNAL_ERROR_CODE: &str = "INTERNAL_ERROR";

/// HTTP status for an authorization error.
pub fn error_status(err: &AuthzError) -> StatusCode {
    match err {
        AuthzError::AccessDenied { .. } => StatusCode::FORBIDDEN,
        AuthzError::MissingAuthenticatedUserDetails => StatusCode::UNAUTHORIZED,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Render an authorization error as an error envelope.
pub fn authz_error_response(err: &AuthzError, request_id: RequestId) -> Response {
    let status = error_status(err);
    let request_id = request_id.to_string();

    match err {
        AuthzError::AccessDenied { reason } => {
            warn!(request_id = %request_id, reason = %reason, "request denied");
            Response::json_error(status, err.code(), reason, &request_id)
        }
        _ if status.is_client_error() => {
            warn!(request_id = %request_id, error = %err, "request rejected");
            Response::json_error(status, err.code(), &err.to_string(), &request_id)
        }
        _ => {
            error!(request_id = %request_id, code = err.code(), error = %err, "authorization failure");
            Response::json_error(status, INTERNAL_ERROR_CODE, GENERIC_ERROR_MESSAGE, &request_id)
        }
    }
}

/// Turn a handler result into a response, rendering errors as envelopes.
///
/// `RequestId` is `Copy`, so a handler can take it from the context before
/// moving into its future.
pub fn result_response(result: Result<Response, AuthzError>, request_id: RequestId) -> Response {
    result.unwrap_or_else(|err| authz_error_response(&err, request_id))
}
