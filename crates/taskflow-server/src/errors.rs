//! HTTP error codes and the error type returned by handlers.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use taskflow_tasks::TaskError;
use tracing::{debug, error};

// ── Error code constants ────────────────────────────────────────────

/// Invalid or missing parameters, or a rejected engine operation.
pub const INVALID_PARAMS: &str = "INVALID_PARAMS";
/// Unexpected internal error.
pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
/// Task or dependency does not exist for this owner.
pub const NOT_FOUND: &str = "NOT_FOUND";
/// Resource already exists.
pub const ALREADY_EXISTS: &str = "ALREADY_EXISTS";
/// Owner header missing or malformed.
pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
/// Store temporarily unavailable.
pub const NOT_AVAILABLE: &str = "NOT_AVAILABLE";

/// Wire-format error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

/// Error type returned by HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Bad input or a rejected operation.
    #[error("{message}")]
    InvalidParams {
        /// Description of what is wrong.
        message: String,
    },

    /// Missing or foreign resource.
    #[error("{message}")]
    NotFound {
        /// Human-readable message.
        message: String,
    },

    /// Duplicate resource.
    #[error("{message}")]
    Conflict {
        /// Human-readable message.
        message: String,
    },

    /// No usable owner identity.
    #[error("{message}")]
    Unauthorized {
        /// Human-readable message.
        message: String,
    },

    /// Store contention or pool exhaustion.
    #[error("{message}")]
    NotAvailable {
        /// Description.
        message: String,
    },

    /// Internal server error.
    #[error("{message}")]
    Internal {
        /// Description.
        message: String,
    },
}

impl ApiError {
    /// Machine-readable error code for this variant.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidParams { .. } => INVALID_PARAMS,
            Self::NotFound { .. } => NOT_FOUND,
            Self::Conflict { .. } => ALREADY_EXISTS,
            Self::Unauthorized { .. } => UNAUTHORIZED,
            Self::NotAvailable { .. } => NOT_AVAILABLE,
            Self::Internal { .. } => INTERNAL_ERROR,
        }
    }

    /// HTTP status for this variant.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidParams { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::NotAvailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Convert to the wire-format error body.
    pub fn to_error_body(&self) -> ErrorBody {
        ErrorBody {
            code: self.code().to_owned(),
            message: self.to_string(),
        }
    }
}

impl From<TaskError> for ApiError {
    fn from(err: TaskError) -> Self {
        let message = err.to_string();
        match &err {
            TaskError::NotFound { .. } => Self::NotFound { message },
            TaskError::InvalidArgument(_) => Self::InvalidParams { message },
            TaskError::Conflict(_) => Self::Conflict { message },
            TaskError::Pool(_) => Self::NotAvailable { message },
            e if e.is_busy() => Self::NotAvailable { message },
            _ => Self::Internal { message },
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidParams {
            message: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::InvalidParams {
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(code = self.code(), error = %self, "request failed");
        } else {
            debug!(code = self.code(), error = %self, "request rejected");
        }
        (status, Json(self.to_error_body())).into_response()
    }
}
