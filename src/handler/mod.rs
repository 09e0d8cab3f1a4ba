//! Handler contract and the handler table.
//!
//! # Responsibilities
//! - Define what a handler is: a function of the request context that
//!   writes output and reports success or a typed failure
//! - Map route keys (`app/handler`) to handler objects
//! - Provide the RESTful action helper used by API handlers
//!
//! # Design Decisions
//! - Handlers are registered up front; there is no loading by path at
//!   request time, so an unknown route key can never execute anything
//! - A failure carries its intent (error page, redirect, internal) and the
//!   dispatcher decides what reaches the client

pub mod registry;
pub mod restful;

use axum::http::StatusCode;
use std::fmt;
use thiserror::Error;

use crate::dispatch::RequestContext;
use crate::streaming::StreamError;

pub use registry::HandlerRegistry;
pub use restful::Restful;

pub type HandlerResult = Result<(), HandlerError>;

/// A request handler.
///
/// Output is written to the context (it implements `io::Write`).
pub trait Handler: Send + Sync {
    fn call(&self, ctx: &mut RequestContext<'_>) -> HandlerResult;
}

impl<F> Handler for F
where
    F: Fn(&mut RequestContext<'_>) -> HandlerResult + Send + Sync,
{
    fn call(&self, ctx: &mut RequestContext<'_>) -> HandlerResult {
        self(ctx)
    }
}

/// Payload handed to the error handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorStatus {
    pub code: u16,
    pub title: String,
    pub message: String,
}

impl ErrorStatus {
    pub fn new(code: u16, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn not_found() -> Self {
        Self::new(404, "Page not found", "")
    }

    pub fn internal() -> Self {
        Self::new(500, "Internal Server Error", "")
    }

    /// HTTP status for this error, 500 when `code` is not a valid status.
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl fmt::Display for ErrorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.title)
    }
}

/// Ways a handler can stop early.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Render the configured error page instead.
    #[error("{0}")]
    Status(ErrorStatus),

    /// Redirect the client to this absolute URL.
    #[error("redirect to {0}")]
    Redirect(String),

    #[error("missing required argument")]
    MissingArgument,

    #[error("output error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Internal(String),
}

impl HandlerError {
    pub fn status(code: u16, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Status(ErrorStatus::new(code, title, message))
    }

    pub fn not_found() -> Self {
        Self::Status(ErrorStatus::not_found())
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::Internal(detail.into())
    }
}
