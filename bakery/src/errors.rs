//! # Error Handling
//!
//! Every handler returns `Result<_, ApiError>`. The error carries an HTTP status
//! and an Arabic message meant for the dashboard user; internal details
//! (database errors, upstream failures) are logged with `tracing` and never sent
//! to the client.
//!
//! ```rust,ignore
//! let store = store::Entity::find_by_id(id)
//!     .one(db)
//!     .await
//!     .map_err(ApiError::database)?
//!     .ok_or_else(|| ApiError::not_found("المتجر", Some(id.to_string())))?;
//! ```

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::{DbErr, SqlErr};
use serde::Serialize;
use std::fmt;

use crate::validation::ValidationErrors;

pub const MSG_DATABASE: &str = "حدث خطأ في قاعدة البيانات";
pub const MSG_INTERNAL: &str = "حدث خطأ غير متوقع في الخادم";
pub const MSG_UNAVAILABLE: &str = "الخدمة غير متاحة حالياً، يرجى المحاولة لاحقاً";
pub const MSG_UNAUTHORIZED: &str = "غير مصرح بالوصول";
pub const MSG_FORBIDDEN: &str = "ليس لديك صلاحية لتنفيذ هذا الإجراء";
pub const MSG_DUPLICATE: &str = "القيمة مستخدمة مسبقاً";
pub const MSG_INVALID_REFERENCE: &str = "السجل المرتبط غير موجود";
pub const MSG_VALIDATION: &str = "البيانات المدخلة غير صالحة";
pub const MSG_MALFORMED_BODY: &str = "صيغة البيانات المرسلة غير صالحة";
pub const MSG_INVALID_ID: &str = "المعرف غير صالح";
pub const MSG_INVALID_QUERY: &str = "معايير البحث غير صالحة";

/// Every failure a handler can return. Database detail is logged, never sent to the client.
#[derive(Debug)]
pub enum ApiError {
    /// 404 Not Found
    NotFound {
        /// Arabic resource label (e.g. "المركبة")
        resource: String,
        id: Option<String>,
    },

    /// 400 Bad Request
    BadRequest { message: String },

    /// 400 Bad Request carrying one message per failed rule
    ValidationFailed { errors: Vec<String> },

    /// 401 Unauthorized
    Unauthorized { message: String },

    /// 403 Forbidden
    Forbidden { message: String },

    /// 409 Conflict (duplicate key, capacity exceeded, referenced record)
    Conflict { message: String },

    /// 503 Service Unavailable (database down, scoring service unreachable)
    Unavailable {
        message: String,
        internal: Option<String>,
    },

    /// 500 Internal Server Error - database error (details logged, not exposed)
    Database { message: String, internal: DbErr },

    /// 500 Internal Server Error
    Internal {
        message: String,
        internal: Option<String>,
    },

    /// Status and message chosen by the caller
    Custom {
        status: StatusCode,
        message: String,
        internal: Option<String>,
    },
}

impl ApiError {
    pub fn not_found(resource: impl Into<String>, id: Option<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn validation_failed(errors: Vec<String>) -> Self {
        Self::ValidationFailed { errors }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>, internal: Option<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
            internal,
        }
    }

    /// Wrap a database error. Connection failures become 503, everything else 500.
    #[must_use]
    pub fn database(err: DbErr) -> Self {
        match err {
            DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => Self::Unavailable {
                message: MSG_UNAVAILABLE.to_string(),
                internal: Some(err.to_string()),
            },
            other => Self::Database {
                message: MSG_DATABASE.to_string(),
                internal: other,
            },
        }
    }

    pub fn internal(message: impl Into<String>, internal: Option<String>) -> Self {
        Self::Internal {
            message: message.into(),
            internal,
        }
    }

    pub fn custom(status: StatusCode, message: impl Into<String>, internal: Option<String>) -> Self {
        Self::Custom {
            status,
            message: message.into(),
            internal,
        }
    }

    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::BadRequest { .. } | Self::ValidationFailed { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Database { .. } | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Custom { status, .. } => *status,
        }
    }

    /// The sanitized, user-facing message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound { resource, id } => match id {
                Some(id) => format!("لم يتم العثور على {resource} ({id})"),
                None => format!("لم يتم العثور على {resource}"),
            },
            Self::ValidationFailed { errors } => {
                if errors.len() == 1 {
                    errors[0].clone()
                } else {
                    MSG_VALIDATION.to_string()
                }
            }
            Self::BadRequest { message }
            | Self::Unauthorized { message }
            | Self::Forbidden { message }
            | Self::Conflict { message }
            | Self::Unavailable { message, .. }
            | Self::Database { message, .. }
            | Self::Internal { message, .. }
            | Self::Custom { message, .. } => message.clone(),
        }
    }

    fn log_internal(&self) {
        match self {
            Self::Database { internal, .. } => {
                tracing::error!(error = ?internal, "Database error occurred");
            }
            Self::Internal {
                internal: Some(details),
                ..
            } => {
                tracing::error!(details = %details, "Internal error occurred");
            }
            Self::Unavailable {
                internal: Some(details),
                ..
            } => {
                tracing::error!(details = %details, "Dependency unavailable");
            }
            Self::Custom {
                internal: Some(details),
                status,
                ..
            } => {
                tracing::error!(status = %status, details = %details, "Custom error occurred");
            }
            _ => {
                tracing::debug!(
                    error = %self.user_message(),
                    status = %self.status_code(),
                    "API error"
                );
            }
        }
    }
}

/// Error body sent to the dashboard
#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<Vec<String>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log_internal();

        let status = self.status_code();
        let body = match &self {
            Self::ValidationFailed { errors } => ErrorResponse {
                success: false,
                message: self.user_message(),
                errors: Some(errors.clone()),
            },
            _ => ErrorResponse {
                success: false,
                message: self.user_message(),
                errors: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.user_message())
    }
}

impl std::error::Error for ApiError {}

/// `RecordNotFound` → 404, unique violation → 409, foreign key violation → 400,
/// connection failure → 503, anything else → 500.
impl From<DbErr> for ApiError {
    fn from(err: DbErr) -> Self {
        if let DbErr::RecordNotFound(msg) = &err {
            return Self::NotFound {
                resource: msg.clone(),
                id: None,
            };
        }
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(details)) => {
                tracing::warn!(details = %details, "Unique constraint violated");
                Self::conflict(MSG_DUPLICATE)
            }
            Some(SqlErr::ForeignKeyConstraintViolation(details)) => {
                tracing::warn!(details = %details, "Foreign key constraint violated");
                Self::bad_request(MSG_INVALID_REFERENCE)
            }
            _ => Self::database(err),
        }
    }
}

// Extractor rejections carry English detail from serde; it is logged and replaced.

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(details = %rejection.body_text(), "Request body rejected");
        Self::bad_request(MSG_MALFORMED_BODY)
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        tracing::debug!(details = %rejection.body_text(), "Path parameter rejected");
        Self::bad_request(MSG_INVALID_ID)
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        tracing::debug!(details = %rejection.body_text(), "Query string rejected");
        Self::bad_request(MSG_INVALID_QUERY)
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        Self::ValidationFailed {
            errors: errors
                .errors()
                .iter()
                .map(|e| e.message.clone())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ValidationError;

    #[test]
    fn test_not_found_with_id() {
        let err = ApiError::not_found("المركبة", Some("123".to_string()));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.user_message(), "لم يتم العثور على المركبة (123)");
    }

    #[test]
    fn test_not_found_without_id() {
        let err = ApiError::not_found("المتجر", None);
        assert_eq!(err.user_message(), "لم يتم العثور على المتجر");
    }

    #[test]
    fn test_validation_failed_is_bad_request() {
        let err = ApiError::validation_failed(vec!["الاسم مطلوب".to_string()]);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.user_message(), "الاسم مطلوب");
    }

    #[test]
    fn test_validation_failed_multiple_errors_uses_summary() {
        let err = ApiError::validation_failed(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(err.user_message(), MSG_VALIDATION);
    }

    #[test]
    fn test_database_error_is_sanitized() {
        let err = ApiError::database(DbErr::Type("Type mismatch error".to_string()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.user_message(), MSG_DATABASE);
    }

    #[test]
    fn test_connection_error_becomes_unavailable() {
        let err = ApiError::database(DbErr::Conn(sea_orm::RuntimeErr::Internal(
            "connection refused".to_string(),
        )));
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.user_message(), MSG_UNAVAILABLE);
    }

    #[test]
    fn test_dberr_record_not_found_conversion() {
        let api_err: ApiError = DbErr::RecordNotFound("الطلب".to_string()).into();
        assert_eq!(api_err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(api_err.user_message(), "لم يتم العثور على الطلب");
    }

    #[test]
    fn test_other_dberr_become_500() {
        for db_err in [
            DbErr::Custom("Any custom error".to_string()),
            DbErr::Type("Type error".to_string()),
            DbErr::Json("JSON error".to_string()),
        ] {
            let api_err: ApiError = db_err.into();
            assert_eq!(api_err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(api_err.user_message(), MSG_DATABASE);
        }
    }

    #[test]
    fn test_validation_errors_conversion_keeps_each_message() {
        let mut errors = ValidationErrors::new();
        errors.add(ValidationError::new("name", "الاسم مطلوب"));
        errors.add(ValidationError::new("price_eur", "السعر يجب ألا يكون سالباً"));
        let api_err: ApiError = errors.into();
        match api_err {
            ApiError::ValidationFailed { errors } => assert_eq!(errors.len(), 2),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_all_status_codes() {
        let cases = vec![
            (ApiError::not_found("x", None), StatusCode::NOT_FOUND),
            (ApiError::bad_request("x"), StatusCode::BAD_REQUEST),
            (ApiError::unauthorized("x"), StatusCode::UNAUTHORIZED),
            (ApiError::forbidden("x"), StatusCode::FORBIDDEN),
            (ApiError::conflict("x"), StatusCode::CONFLICT),
            (ApiError::unavailable("x", None), StatusCode::SERVICE_UNAVAILABLE),
            (ApiError::internal("x", None), StatusCode::INTERNAL_SERVER_ERROR),
            (
                ApiError::custom(StatusCode::IM_A_TEAPOT, "x", None),
                StatusCode::IM_A_TEAPOT,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.status_code(), expected);
        }
    }
}
