//! Pipeline stages.
//!
//! 1. [`request_id`] - Generate/propagate request ID
//! 2. [`authorization`] - Establish caller identity and resolve the
//!    authorization service
//!
//! [`error_mapping`] renders authorization errors for both the stages and
//! the handlers.

pub mod authorization;
pub mod error_mapping;
pub mod request_id;

pub use authorization::AuthorizationMiddleware;
pub use error_mapping::{authz_error_response, error_status, result_response};
pub use request_id::RequestIdMiddleware;
