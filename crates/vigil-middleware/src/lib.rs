//! # Vigil Middleware
//!
//! Request pipeline for services protected by Vigil authorization.
//!
//! ## Pipeline Stages
//!
//! ```text
//! Request → RequestId → Authorization → Handler
//!                           │
//!                           └─ load failure → error envelope (handler skipped)
//! ```
//!
//! | Stage | Middleware | Purpose |
//! |-------|------------|---------|
//! | 1 | [`RequestIdMiddleware`] | Generate/propagate request ID (UUID v7) |
//! | 2 | [`AuthorizationMiddleware`] | Caller identity + ready authorization service |
//!
//! Handlers pull an owned [`RequestAuthorization`] out of the context and
//! run their checks with it:
//!
//! ```ignore
//! pipeline.handle(request, |ctx, _req| {
//!     let authorization = ctx.authorization();
//!     Box::pin(async move {
//!         let check = AuthorizationRequest::new().with_action("getOrder").with_resource("o-1");
//!         match authorization.map(|a| a.authorize(&check)) { ... }
//!     })
//! })
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod claims;
pub mod context;
pub mod middleware;
pub mod pipeline;
pub mod stages;
pub mod types;

// Re-export main types at crate root
pub use claims::{AuthClaims, ClaimsMapping};
pub use context::{MiddlewareContext, RequestAuthorization, RequestId};
pub use middleware::{BoxFuture, Handler, Middleware, Next};
pub use pipeline::{Pipeline, PipelineBuilder};
pub use stages::{AuthorizationMiddleware, RequestIdMiddleware};
pub use types::{Request, Response, ResponseExt};
