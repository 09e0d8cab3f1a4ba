//! HTTP boundary of the dispatch engine.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum, request id, tracing, limits, timeout)
//!     → request.rs (RequestInfo: method override, body, HTTPS detection)
//!     → dispatcher (blocking thread)
//!         → streamed: frames over a channel → chunked response body
//!         → buffered: response.rs (Rendered → Response)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestInfo, X_HTTP_METHOD_OVERRIDE, X_REQUEST_ID};
pub use response::absolutize;
pub use server::{AppState, HttpServer};
