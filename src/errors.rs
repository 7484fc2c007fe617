use axum::{
    extract::rejection::{FormRejection, JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    /// Invalid request data or business rule violation
    #[error("{0}")]
    BadRequest(String),

    /// Missing, malformed or expired credentials
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated, but not allowed to do this
    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// Unique constraint style conflicts, e.g. a taken email
    #[error("{0}")]
    Conflict(String),

    /// Anything else, with full context chain
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show a client. Internal details stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            if db.is_unique_violation() {
                return AppError::Conflict("Resource already exists".into());
            }
        }
        AppError::Internal(e.into())
    }
}

macro_rules! bad_request_from {
    ($($rejection:ty),*) => {
        $(
            impl From<$rejection> for AppError {
                fn from(r: $rejection) -> Self {
                    AppError::BadRequest(r.body_text())
                }
            }
        )*
    };
}

bad_request_from!(JsonRejection, QueryRejection, PathRejection, FormRejection);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Internal(e) => tracing::error!(error = ?e, "internal error"),
            AppError::Unauthorized(_) | AppError::Forbidden(_) => {
                tracing::info!(error = %self, "authorization error")
            }
            AppError::Conflict(_) => tracing::warn!(error = %self, "conflict"),
            AppError::BadRequest(_) | AppError::NotFound(_) => {
                tracing::debug!(error = %self, "client error")
            }
        }

        let body = json!({ "success": false, "error": self.user_message() });
        (self.status_code(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_variant() {
        assert_eq!(AppError::bad_request("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::Unauthorized("x".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AppError::Forbidden("x".into()).status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Conflict("x".into()).status_code(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::Internal(anyhow::anyhow!("boom")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_errors_are_not_leaked() {
        let err = AppError::Internal(anyhow::anyhow!("connection refused on 10.0.0.3"));
        assert_eq!(err.user_message(), "Internal server error");

        let err = AppError::bad_request("Check-out date cannot be before check-in date");
        assert_eq!(
            err.user_message(),
            "Check-out date cannot be before check-in date"
        );
    }

    #[test]
    fn row_not_found_maps_to_internal() {
        let err: AppError = sqlx::Error::RowNotFound.into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn response_uses_variant_status() {
        let res = AppError::Forbidden("Insufficient permissions".into()).into_response();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }
}
