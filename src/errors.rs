use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

use crate::mailer::SendError;
use crate::store::StoreError;

/// Message returned to callers whenever a lead email could not be delivered.
pub const SEND_FAILURE_MESSAGE: &str = "Failed to send email";

/// Application-specific error types.
#[derive(Debug)]
pub enum AppError {
    /// Missing or malformed input.
    Validation(String),
    /// A unique key already exists in the datastore.
    Conflict(String),
    /// Resource not found error.
    NotFound(String),
    /// Datastore failure.
    Store(StoreError),
    /// Transactional mail failure.
    Mail(SendError),
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<AppError>,
        /// Additional context message.
        context: String,
    },
}

impl AppError {
    /// Resolves the HTTP status and the caller-facing message.
    ///
    /// Client errors keep their own message; server errors are prefixed with
    /// every context layer wrapped around them.
    pub fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            AppError::Validation(msg) | AppError::Conflict(msg) => {
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Store(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            AppError::Mail(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                SEND_FAILURE_MESSAGE.to_string(),
            ),
            AppError::WithContext { source, context } => {
                let (status, message) = source.status_and_message();
                if status.is_server_error() && !matches!(source.root(), AppError::Mail(_)) {
                    (status, format!("{}: {}", context, message))
                } else {
                    (status, message)
                }
            }
        }
    }

    /// Innermost error beneath any context layers.
    pub fn root(&self) -> &AppError {
        match self {
            AppError::WithContext { source, .. } => source.root(),
            other => other,
        }
    }
}

impl fmt::Display for AppError {
    /// Formats the error for display.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(msg) => write!(f, "Validation error: {}", msg),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Store(e) => write!(f, "Store error: {}", e),
            AppError::Mail(e) => write!(f, "Mail error: {}", e),
            AppError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    /// Converts the error into an HTTP response.
    ///
    /// Maps each error variant to an appropriate HTTP status code and a
    /// `{ "error": ... }` body. Server-side failures are logged with their
    /// full context chain.
    fn into_response(self) -> Response {
        let (status, error_message) = self.status_and_message();

        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::debug!("Request rejected ({}): {}", status, error_message);
        }

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<StoreError> for AppError {
    /// Converts a `StoreError` into an `AppError`.
    fn from(err: StoreError) -> Self {
        AppError::Store(err)
    }
}

impl From<SendError> for AppError {
    /// Converts a `SendError` into an `AppError`.
    fn from(err: SendError) -> Self {
        AppError::Mail(err)
    }
}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for our `AppError` type.
pub trait ResultExt<T> {
    /// Add context to an error.
    ///
    /// # Arguments
    ///
    /// * `context` - The context message to add.
    fn context(self, context: impl Into<String>) -> Result<T, AppError>;

    /// Add context lazily (only evaluated on error).
    ///
    /// # Arguments
    ///
    /// * `f` - A closure that produces the context message.
    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T, AppError> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: f(),
        })
    }
}

/// Extension for StoreError to add context
impl<T> ResultExt<T> for Result<T, StoreError> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(AppError::Store(e)),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(AppError::Store(e)),
            context: f(),
        })
    }
}
