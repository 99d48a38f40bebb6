//! Identity Error Types
//!
//! Domain-level failure taxonomy. Every variant collapses onto a kernel
//! `AppError` with a stable `code` at the HTTP boundary.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::error::conversions::sqlx_error_kind;
use kernel::error::{app_error::AppError, kind::ErrorKind};
use thiserror::Error;

pub type IdentityResult<T> = Result<T, IdentityError>;

#[derive(Debug, Error)]
pub enum IdentityError {
    /// Input failed a shape or strength rule
    #[error("{0}")]
    PolicyViolation(String),

    /// Username or email already belongs to a live account
    #[error("{0}")]
    DuplicateResource(String),

    /// Unknown user or wrong password; deliberately indistinguishable
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Account is locked")]
    AccountLocked,

    #[error("Account is disabled")]
    AccountDisabled,

    #[error("Token is invalid")]
    TokenInvalid,

    #[error("Token has expired")]
    TokenExpired,

    #[error("{0}")]
    ResourceNotFound(String),

    #[error("Unsupported role: {0}")]
    UnsupportedRole(String),

    /// Authenticated, but the role is not allowed here
    #[error("Access denied")]
    AccessDenied,

    /// Optimistic version check failed; someone else wrote first
    #[error("The record was modified concurrently")]
    ConcurrentModification,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IdentityError {
    pub fn policy(message: impl Into<String>) -> Self {
        IdentityError::PolicyViolation(message.into())
    }

    pub fn not_found(what: &str) -> Self {
        IdentityError::ResourceNotFound(format!("{what} not found"))
    }

    /// Database failures worth retrying: pool exhaustion, dropped
    /// connections, serialization conflicts
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            IdentityError::Database(e) if sqlx_error_kind(e) == ErrorKind::ServiceUnavailable
        )
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            IdentityError::Database(_) if self.is_transient() => StatusCode::SERVICE_UNAVAILABLE,
            IdentityError::PolicyViolation(_) | IdentityError::UnsupportedRole(_) => {
                StatusCode::BAD_REQUEST
            }
            IdentityError::InvalidCredentials
            | IdentityError::AccountLocked
            | IdentityError::AccountDisabled
            | IdentityError::TokenInvalid
            | IdentityError::TokenExpired => StatusCode::UNAUTHORIZED,
            IdentityError::AccessDenied => StatusCode::FORBIDDEN,
            IdentityError::ResourceNotFound(_) => StatusCode::NOT_FOUND,
            IdentityError::DuplicateResource(_) | IdentityError::ConcurrentModification => {
                StatusCode::CONFLICT
            }
            IdentityError::Database(_) | IdentityError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            IdentityError::Database(_) if self.is_transient() => ErrorKind::ServiceUnavailable,
            IdentityError::PolicyViolation(_) | IdentityError::UnsupportedRole(_) => {
                ErrorKind::BadRequest
            }
            IdentityError::InvalidCredentials
            | IdentityError::AccountLocked
            | IdentityError::AccountDisabled
            | IdentityError::TokenInvalid
            | IdentityError::TokenExpired => ErrorKind::Unauthorized,
            IdentityError::AccessDenied => ErrorKind::Forbidden,
            IdentityError::ResourceNotFound(_) => ErrorKind::NotFound,
            IdentityError::DuplicateResource(_) | IdentityError::ConcurrentModification => {
                ErrorKind::Conflict
            }
            IdentityError::Database(_) | IdentityError::Internal(_) => {
                ErrorKind::InternalServerError
            }
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            IdentityError::PolicyViolation(_) => "POLICY_VIOLATION",
            IdentityError::DuplicateResource(_) => "DUPLICATE_RESOURCE",
            IdentityError::InvalidCredentials => "INVALID_CREDENTIALS",
            IdentityError::AccountLocked => "ACCOUNT_LOCKED",
            IdentityError::AccountDisabled => "ACCOUNT_DISABLED",
            IdentityError::TokenInvalid => "TOKEN_INVALID",
            IdentityError::TokenExpired => "TOKEN_EXPIRED",
            IdentityError::ResourceNotFound(_) => "RESOURCE_NOT_FOUND",
            IdentityError::UnsupportedRole(_) => "UNSUPPORTED_ROLE",
            IdentityError::AccessDenied => "ACCESS_DENIED",
            IdentityError::ConcurrentModification => "CONCURRENT_MODIFICATION",
            IdentityError::Database(_) if self.is_transient() => "SERVICE_UNAVAILABLE",
            IdentityError::Database(_) | IdentityError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Convert to AppError. Server-side details stay in the logs.
    pub fn to_app_error(&self) -> AppError {
        let message = match self {
            IdentityError::Database(_) if self.is_transient() => {
                "The service is temporarily unavailable".to_string()
            }
            IdentityError::Database(_) | IdentityError::Internal(_) => {
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        };
        let app_error = AppError::new(self.kind(), message).with_code(self.code());

        match self {
            IdentityError::AccountLocked => {
                app_error.with_action("Wait for the lock to expire or contact an administrator")
            }
            IdentityError::TokenExpired => app_error.with_action("Sign in again"),
            IdentityError::ConcurrentModification => app_error.with_action("Retry the request"),
            IdentityError::Database(_) if self.is_transient() => {
                app_error.with_action("Retry the request")
            }
            _ => app_error,
        }
    }

    fn log(&self) {
        match self {
            IdentityError::Database(e) if self.is_transient() => {
                tracing::warn!(error = %e, "Identity database unavailable");
            }
            IdentityError::Database(e) => {
                tracing::error!(error = %e, "Identity database error");
            }
            IdentityError::Internal(msg) => {
                tracing::error!(message = %msg, "Identity internal error");
            }
            IdentityError::InvalidCredentials => {
                tracing::warn!("Rejected login attempt");
            }
            IdentityError::AccountLocked => {
                tracing::warn!("Login attempt on locked account");
            }
            IdentityError::AccessDenied => {
                tracing::warn!("Role check failed");
            }
            _ => {
                tracing::debug!(error = %self, "Identity error");
            }
        }
    }
}

impl IntoResponse for IdentityError {
    fn into_response(self) -> Response {
        self.log();
        self.to_app_error().into_response()
    }
}

impl From<tokio::task::JoinError> for IdentityError {
    fn from(err: tokio::task::JoinError) -> Self {
        IdentityError::Internal(format!("Blocking task failed: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(IdentityError::InvalidCredentials.status_code(), 401);
        assert_eq!(IdentityError::AccountLocked.status_code(), 401);
        assert_eq!(IdentityError::AccountDisabled.status_code(), 401);
        assert_eq!(IdentityError::TokenInvalid.status_code(), 401);
        assert_eq!(IdentityError::TokenExpired.status_code(), 401);
        assert_eq!(IdentityError::policy("x").status_code(), 400);
        assert_eq!(
            IdentityError::UnsupportedRole("nurse".into()).status_code(),
            400
        );
        assert_eq!(
            IdentityError::DuplicateResource("x".into()).status_code(),
            409
        );
        assert_eq!(IdentityError::not_found("Account").status_code(), 404);
        assert_eq!(IdentityError::AccessDenied.status_code(), 403);
    }

    #[test]
    fn test_kind_agrees_with_status() {
        let errors = [
            IdentityError::policy("x"),
            IdentityError::InvalidCredentials,
            IdentityError::AccessDenied,
            IdentityError::not_found("Profile"),
            IdentityError::ConcurrentModification,
            IdentityError::Internal("boom".into()),
        ];
        for err in errors {
            assert_eq!(err.kind().status_code(), err.status_code().as_u16());
        }
    }

    #[test]
    fn test_internal_details_are_not_exposed() {
        let app_error = IdentityError::Internal("connection string: postgres://secret".into())
            .to_app_error();
        assert_eq!(app_error.message(), "An internal error occurred");
        assert_eq!(app_error.code(), Some("INTERNAL_ERROR"));
    }

    #[test]
    fn test_pool_timeout_is_retryable() {
        let err = IdentityError::Database(sqlx::Error::PoolTimedOut);
        assert!(err.is_transient());
        assert_eq!(err.status_code(), 503);
        assert_eq!(err.kind().status_code(), 503);

        let app_error = err.to_app_error();
        assert_eq!(app_error.status_code(), 503);
        assert_eq!(app_error.code(), Some("SERVICE_UNAVAILABLE"));
        assert_eq!(app_error.action(), Some("Retry the request"));
        assert!(!app_error.message().contains("pool"));
    }

    #[test]
    fn test_other_database_errors_stay_internal() {
        let err = IdentityError::Database(sqlx::Error::ColumnNotFound("version".into()));
        assert!(!err.is_transient());
        let app_error = err.to_app_error();
        assert_eq!(app_error.status_code(), 500);
        assert_eq!(app_error.code(), Some("INTERNAL_ERROR"));
        assert_eq!(app_error.message(), "An internal error occurred");
    }

    #[test]
    fn test_code_is_attached() {
        let app_error = IdentityError::TokenExpired.to_app_error();
        assert_eq!(app_error.code(), Some("TOKEN_EXPIRED"));
        assert_eq!(app_error.action(), Some("Sign in again"));
    }
}
