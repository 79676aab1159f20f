//! Handler failures and their normalization into the uniform error envelope.
//!
//! Handlers return [`AppError`]. Its `IntoResponse` impl does not render a body;
//! it parks the error in the response extensions so the outermost
//! [`crate::middleware::errors`] layer can render it with the request path,
//! method and the configured verbosity. That keeps one rendering path for
//! failures raised anywhere below that layer.

use std::sync::Arc;

use axum::{
    extract::Request,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::types::timestamp_now;

/// A single field-level validation failure, as raised by a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    /// Path segments of the offending field, e.g. `["payee", "msisdn"]`.
    pub path: Vec<String>,
    pub message: String,
}

impl FieldViolation {
    pub fn new<I, S>(path: I, message: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { path: path.into_iter().map(Into::into).collect(), message: message.into() }
    }
}

/// Classification tag of an [`AppError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    Unclassified,
}

impl ErrorKind {
    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::Validation => "ValidationError",
            ErrorKind::Unauthorized => "UnauthorizedError",
            ErrorKind::Forbidden => "ForbiddenError",
            ErrorKind::NotFound => "NotFoundError",
            ErrorKind::Conflict => "ConflictError",
            ErrorKind::Unclassified => "Error",
        }
    }
}

/// The primary error type for request handlers.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A failure that already knows its HTTP status. Its own message is shown to clients.
    #[error("{message}")]
    Status {
        status: StatusCode,
        message: String,
        violations: Vec<FieldViolation>,
    },
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        violations: Vec<FieldViolation>,
    },
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    /// Anything unexpected. Always rendered as a 500.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn with_status(status: StatusCode, message: impl Into<String>) -> Self {
        AppError::Status { status, message: message.into(), violations: Vec::new() }
    }

    pub fn validation(message: impl Into<String>, violations: Vec<FieldViolation>) -> Self {
        AppError::Validation { message: message.into(), violations }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Validation { .. } => ErrorKind::Validation,
            AppError::Unauthorized(_) => ErrorKind::Unauthorized,
            AppError::Forbidden(_) => ErrorKind::Forbidden,
            AppError::NotFound(_) => ErrorKind::NotFound,
            AppError::Conflict(_) => ErrorKind::Conflict,
            AppError::Status { .. } | AppError::Internal(_) => ErrorKind::Unclassified,
        }
    }

    /// Descriptor shown in diagnostic details.
    pub fn name(&self) -> &'static str {
        match self {
            AppError::Status { .. } => "HttpError",
            other => other.kind().name(),
        }
    }

    /// Status and client-facing message. An explicit 4xx/5xx status wins over
    /// the kind; any other explicit status is treated as unclassified.
    pub fn classify(&self) -> (StatusCode, String) {
        if let AppError::Status { status, message, .. } = self {
            if status.is_client_error() || status.is_server_error() {
                return (*status, message.clone());
            }
        }
        let (status, message) = match self.kind() {
            ErrorKind::Validation => (StatusCode::BAD_REQUEST, "Validation error"),
            ErrorKind::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            ErrorKind::Forbidden => (StatusCode::FORBIDDEN, "Forbidden"),
            ErrorKind::NotFound => (StatusCode::NOT_FOUND, "Resource not found"),
            ErrorKind::Conflict => (StatusCode::CONFLICT, "Conflict"),
            ErrorKind::Unclassified => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"),
        };
        (status, message.to_string())
    }

    pub fn violations(&self) -> &[FieldViolation] {
        match self {
            AppError::Status { violations, .. } | AppError::Validation { violations, .. } => violations,
            _ => &[],
        }
    }

    /// Messages of the underlying error chain, outermost first.
    fn causes(&self) -> Vec<String> {
        match self {
            AppError::Internal(e) => e.chain().skip(1).map(|c| c.to_string()).collect(),
            _ => Vec::new(),
        }
    }
}

/// Response extension carrying a failure to the normalizing layer.
#[derive(Clone, Debug)]
pub struct PendingError(pub Arc<AppError>);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, _) = self.classify();
        let mut res = status.into_response();
        res.extensions_mut().insert(PendingError(Arc::new(self)));
        res
    }
}

/// A type alias for `Result<T, AppError>`, used by all handlers.
pub type AppResult<T> = Result<T, AppError>;

/// Where a failed request was headed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub path: String,
    pub method: String,
}

impl RequestContext {
    pub fn from_request(req: &Request) -> Self {
        Self { path: req.uri().path().to_string(), method: req.method().to_string() }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetails {
    pub message: String,
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub causes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ValidationErrorItem {
    pub field: String,
    pub message: String,
}

/// The uniform body of every normalized failure.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    pub is_error: bool,
    pub message: String,
    pub timestamp: String,
    pub path: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<ErrorDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_errors: Option<Vec<ValidationErrorItem>>,
}

/// Maps a handler failure to its status code and envelope.
///
/// `diagnostics` adds the raw message, descriptor and cause chain; it must stay
/// off in production so internals never reach clients.
pub fn normalize(err: &AppError, ctx: &RequestContext, diagnostics: bool) -> (StatusCode, ErrorEnvelope) {
    let (status, message) = err.classify();

    let details = diagnostics.then(|| ErrorDetails {
        message: err.to_string(),
        name: err.name().to_string(),
        causes: err.causes(),
    });

    let violations = err.violations();
    let validation_errors = (!violations.is_empty()).then(|| {
        violations
            .iter()
            .map(|v| ValidationErrorItem { field: v.path.join("."), message: v.message.clone() })
            .collect()
    });

    let envelope = ErrorEnvelope {
        is_error: true,
        message,
        timestamp: timestamp_now(),
        path: ctx.path.clone(),
        method: ctx.method.clone(),
        details,
        validation_errors,
    };
    (status, envelope)
}
