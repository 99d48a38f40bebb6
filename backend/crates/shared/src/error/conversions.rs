//! Error conversions - classification of foreign errors and the HTTP rendering

#[cfg(feature = "axum")]
use super::app_error::AppError;
#[cfg(feature = "sqlx")]
use super::kind::ErrorKind;

// ============================================================================
// SQLx classification (feature-gated)
// ============================================================================

/// SQLSTATE for `unique_violation`
#[cfg(feature = "sqlx")]
pub const PG_UNIQUE_VIOLATION: &str = "23505";

/// Whether `err` is a Postgres unique-constraint violation
#[cfg(feature = "sqlx")]
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(PG_UNIQUE_VIOLATION)
    )
}

/// Classify a database failure. `ServiceUnavailable` marks the transient
/// ones a caller may retry.
#[cfg(feature = "sqlx")]
pub fn sqlx_error_kind(err: &sqlx::Error) -> ErrorKind {
    match err {
        sqlx::Error::RowNotFound => ErrorKind::NotFound,
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            ErrorKind::ServiceUnavailable
        }
        sqlx::Error::Database(db_err) => {
            // https://www.postgresql.org/docs/current/errcodes-appendix.html
            match db_err.code().as_deref() {
                Some(PG_UNIQUE_VIOLATION | "23503") => ErrorKind::Conflict,
                Some("40001" | "40P01") => ErrorKind::ServiceUnavailable,
                Some("53000" | "53100" | "53200" | "53300") => ErrorKind::ServiceUnavailable,
                Some("57000" | "57014" | "57P01" | "57P02" | "57P03") => {
                    ErrorKind::ServiceUnavailable
                }
                _ => ErrorKind::InternalServerError,
            }
        }
        _ => ErrorKind::InternalServerError,
    }
}

// ============================================================================
// Axum conversions (feature-gated)
// ============================================================================

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        use axum::Json;
        use axum::http::StatusCode;

        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        // RFC 7807 Problem Details for HTTP APIs
        let body = serde_json::json!({
            "type": format!("https://httpstatuses.io/{}", self.status_code()),
            "title": self.kind().as_str(),
            "status": self.status_code(),
            "code": self.code().unwrap_or(self.kind().as_str()),
            "detail": self.message(),
            "action": self.action(),
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    #[cfg(feature = "sqlx")]
    use super::*;

    #[cfg(feature = "sqlx")]
    #[test]
    fn test_row_not_found_maps_to_404() {
        assert_eq!(sqlx_error_kind(&sqlx::Error::RowNotFound), ErrorKind::NotFound);
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
    }

    #[cfg(feature = "sqlx")]
    #[test]
    fn test_pool_exhaustion_is_retryable_503() {
        for err in [sqlx::Error::PoolTimedOut, sqlx::Error::PoolClosed] {
            let kind = sqlx_error_kind(&err);
            assert_eq!(kind, ErrorKind::ServiceUnavailable);
            assert_eq!(kind.status_code(), 503);
        }
    }

    #[cfg(feature = "sqlx")]
    #[test]
    fn test_unclassified_is_internal() {
        let err = sqlx::Error::ColumnNotFound("version".into());
        assert_eq!(sqlx_error_kind(&err), ErrorKind::InternalServerError);
    }
}
