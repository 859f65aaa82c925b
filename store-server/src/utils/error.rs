//! Unified error handling
//!
//! Application-level error enum and response envelope:
//! - [`AppError`] — error enum with an HTTP mapping
//! - [`AppResponse`] — API response structure
//!
//! # Error code conventions
//!
//! | Prefix | Category | Example |
//! |--------|----------|---------|
//! | E0xxx  | Request/business errors | E0002 validation failed |
//! | E4xxx  | Order lifecycle errors | E4001 invalid transition |
//! | E9xxx  | System errors | E9002 database error |

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

/// Unified API response envelope
///
/// ```json
/// { "code": "E0000", "message": "Success", "data": { ... } }
/// ```
#[derive(Debug, Serialize)]
pub struct AppResponse<T> {
    /// Error code (E0000 = success)
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

/// Application error enum
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // ========== Business errors (4xx) ==========
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Business rule violation: {0}")]
    BusinessRule(String),

    /// Checkout refused by the blocking gate. Carries the
    /// customer-facing message, if any.
    #[error("Customer blocked")]
    Blocked(Option<String>),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    // ========== System errors (5xx) ==========
    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    /// Payment provider unreachable or returned garbage; the order was
    /// not mutated and the caller should retry verification later.
    #[error("Upstream gateway error: {0}")]
    Upstream(String),

    #[error("Invalid request: {0}")]
    Invalid(String),
}

impl AppError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "E0003", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "E0002", msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "E0004", msg.clone()),
            AppError::BusinessRule(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "E0005", msg.clone())
            }
            AppError::Blocked(msg) => (
                StatusCode::FORBIDDEN,
                "E0007",
                msg.clone()
                    .unwrap_or_else(|| "Order could not be placed".to_string()),
            ),
            AppError::InvalidTransition(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "E4001", msg.clone())
            }
            AppError::Database(msg) => {
                error!(target: "database", error = %msg, "Database error occurred");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "E9002",
                    "Database error".to_string(),
                )
            }
            AppError::Internal(msg) => {
                error!(target: "internal", error = %msg, "Internal error occurred");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "E9001",
                    "Internal server error".to_string(),
                )
            }
            AppError::Upstream(msg) => (StatusCode::BAD_GATEWAY, "E9003", msg.clone()),
            AppError::Invalid(msg) => (StatusCode::BAD_REQUEST, "E0006", msg.clone()),
        };

        let body = Json(AppResponse::<()> {
            code: code.to_string(),
            message,
            data: None,
        });

        (status, body).into_response()
    }
}

/// Result alias for handlers
pub type AppResult<T> = Result<T, AppError>;

/// Create a successful response
pub fn ok<T: Serialize>(data: T) -> Json<AppResponse<T>> {
    Json(AppResponse {
        code: "E0000".to_string(),
        message: "Success".to_string(),
        data: Some(data),
    })
}

// ---- Domain error mappings -------------------------------------------------

impl From<crate::db::repository::RepoError> for AppError {
    fn from(err: crate::db::repository::RepoError) -> Self {
        use crate::db::repository::RepoError;
        match err {
            RepoError::NotFound(msg) => AppError::NotFound(msg),
            RepoError::Duplicate(msg) => AppError::Conflict(msg),
            RepoError::Validation(msg) => AppError::Validation(msg),
            RepoError::Database(msg) => AppError::Database(msg),
        }
    }
}

impl From<crate::orders::LedgerError> for AppError {
    fn from(err: crate::orders::LedgerError) -> Self {
        use crate::orders::LedgerError;
        match err {
            LedgerError::OrderNotFound(_) | LedgerError::ItemNotFound(_) => {
                AppError::NotFound(err.to_string())
            }
            LedgerError::InvalidTransition { .. } => AppError::InvalidTransition(err.to_string()),
            LedgerError::ConcurrentModification(_) => AppError::Conflict(err.to_string()),
            LedgerError::Validation(msg) => AppError::Validation(msg),
            LedgerError::Repo(repo) => repo.into(),
        }
    }
}

impl From<crate::gateways::GatewayError> for AppError {
    fn from(err: crate::gateways::GatewayError) -> Self {
        use crate::gateways::GatewayError;
        match err {
            GatewayError::Unsupported(_) => AppError::Validation(err.to_string()),
            GatewayError::Unreachable(_) | GatewayError::Malformed(_) | GatewayError::Provider(_) => {
                AppError::Upstream(err.to_string())
            }
        }
    }
}

impl From<crate::orders::engine::EngineError> for AppError {
    fn from(err: crate::orders::engine::EngineError) -> Self {
        use crate::orders::engine::EngineError;
        match err {
            EngineError::Ledger(e) => e.into(),
            EngineError::Gateway(e) => e.into(),
            EngineError::UnknownProvider(_) | EngineError::LinkageMismatch(_) => {
                AppError::Invalid(err.to_string())
            }
            EngineError::AmountMismatch { .. } => AppError::Conflict(err.to_string()),
            EngineError::Validation(msg) => AppError::Validation(msg),
        }
    }
}

impl From<crate::orders::blocking::BlockingError> for AppError {
    fn from(err: crate::orders::blocking::BlockingError) -> Self {
        use crate::orders::blocking::BlockingError;
        match err {
            BlockingError::NotFound(_) => AppError::NotFound(err.to_string()),
            BlockingError::Validation(msg) => AppError::Validation(msg),
            BlockingError::Repo(repo) => repo.into(),
        }
    }
}

impl From<crate::orders::composer::ComposeError> for AppError {
    fn from(err: crate::orders::composer::ComposeError) -> Self {
        use crate::orders::composer::ComposeError;
        use crate::services::CatalogError;
        match err {
            ComposeError::Blocked { message } => AppError::Blocked(message),
            ComposeError::EmptyCart => AppError::Validation(err.to_string()),
            ComposeError::Validation(msg) => AppError::Validation(msg),
            ComposeError::IncompleteNotFound(_) => AppError::NotFound(err.to_string()),
            ComposeError::NotOpen(_) => AppError::Conflict(err.to_string()),
            ComposeError::Catalog(CatalogError::UnknownProduct(id)) => {
                AppError::Validation(format!("Unknown product: {id}"))
            }
            ComposeError::Catalog(e) => AppError::Upstream(e.to_string()),
            ComposeError::Ledger(e) => e.into(),
            ComposeError::Blocking(e) => e.into(),
            ComposeError::Repo(e) => e.into(),
        }
    }
}

impl From<crate::orders::refund::RefundError> for AppError {
    fn from(err: crate::orders::refund::RefundError) -> Self {
        use crate::orders::refund::RefundError;
        match err {
            RefundError::OperatorRequired => AppError::Validation(err.to_string()),
            RefundError::Validation(msg) => AppError::Validation(msg),
            RefundError::NotPaid { .. } => AppError::BusinessRule(err.to_string()),
            RefundError::Ledger(e) => e.into(),
        }
    }
}
