//! Middleware components for WeChat SDK.
//!
//! Tower layers that can wrap [`WechatClient`](crate::client::WechatClient)
//! through the facade builders, or any `reqwest`/`http` service:
//!
//! - [`AuthMiddleware`] - Injects access_token from an [`AccessTokenProvider`](crate::credential::AccessTokenProvider)
//! - [`LoggingMiddleware`] - Logs request/response information with secrets redacted
//!
//! ```ignore
//! use tower::ServiceBuilder;
//! use wechat_sdk::middleware::{AuthMiddleware, LoggingMiddleware};
//!
//! let service = ServiceBuilder::new()
//!     .layer(LoggingMiddleware::new())
//!     .layer(AuthMiddleware::new(provider))
//!     .service(inner_service);
//! ```

// Re-export tower types for convenience
pub use tower::{Layer, Service, ServiceBuilder};

mod auth;
mod logging;

pub use auth::{AuthMiddleware, AuthMiddlewareService};
pub use logging::{LoggingMiddleware, LoggingMiddlewareService};
