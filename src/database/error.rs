use std::collections::BTreeMap;

use serde_json::json;
use thiserror::Error;
use validator::ValidationErrors;
use warp::{
    http::StatusCode,
    reject,
    reply::{self, Reply, Response},
};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    #[error("{0}")]
    DuplicateRelation(String),

    #[error("You cannot subscribe to yourself")]
    SelfFollow,

    #[error("{0}")]
    NotFound(String),

    #[error("Authentication credentials were not provided")]
    Unauthenticated,

    #[error("You don't have permission to perform this action")]
    Forbidden,

    #[error("Unable to log in with provided credentials")]
    InvalidCredentials,

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. }
            | ApiError::DuplicateRelation(_)
            | ApiError::SelfFollow
            | ApiError::InvalidCredentials => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// JSON body sent to the client. Internal failures never leak their cause.
    pub fn body(&self) -> serde_json::Value {
        match self {
            ApiError::Validation { field, message } => {
                let mut body = serde_json::Map::new();
                body.insert(field.to_owned(), json!([message]));
                serde_json::Value::Object(body)
            }
            ApiError::Database(_) | ApiError::Internal(_) => {
                json!({ "detail": "Internal server error" })
            }
            other => json!({ "detail": other.to_string() }),
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::RowNotFound => Self::not_found("Not found"),
            sqlx::Error::Database(e) if e.is_unique_violation() => {
                log::debug!("Unique violation: {e}");
                Self::DuplicateRelation(String::from("An object with these values already exists"))
            }
            sqlx::Error::Database(e) if e.is_check_violation() => {
                log::debug!("Check violation: {e}");
                Self::validation("non_field_errors", "A value is outside the allowed range")
            }
            e => Self::Database(e),
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(value: ValidationErrors) -> Self {
        // Field order is unstable in the underlying map.
        let fields: BTreeMap<String, String> = value
            .field_errors()
            .into_iter()
            .map(|(field, errors)| {
                let message = errors
                    .first()
                    .map(|error| match &error.message {
                        Some(message) => message.to_string(),
                        None => format!("Invalid value ({})", error.code),
                    })
                    .unwrap_or_else(|| String::from("Invalid value"));
                (field.to_string(), message)
            })
            .collect();

        match fields.into_iter().next() {
            Some((field, message)) => Self::Validation { field, message },
            None => Self::validation("non_field_errors", "Invalid input"),
        }
    }
}

impl From<argon2::password_hash::Error> for ApiError {
    fn from(value: argon2::password_hash::Error) -> Self {
        Self::Internal(format!("password hashing failed: {value}"))
    }
}

impl reject::Reject for ApiError {}

impl ApiError {
    pub fn to_response(&self) -> Response {
        match self {
            ApiError::Database(e) => log::error!("{e:?}"),
            ApiError::Internal(e) => log::error!("{e}"),
            other => log::debug!("Client error: {other}"),
        }

        reply::with_status(reply::json(&self.body()), self.status()).into_response()
    }
}

impl Reply for ApiError {
    fn into_response(self) -> Response {
        self.to_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses() {
        assert_eq!(
            ApiError::validation("tags", "empty").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::DuplicateRelation(String::from("x")).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::SelfFollow.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::not_found("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::Internal(String::from("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn validation_body_names_field() {
        let body = ApiError::validation("cooking_time", "too small").body();
        assert_eq!(body, json!({ "cooking_time": ["too small"] }));
    }

    #[test]
    fn internal_body_is_opaque() {
        let body = ApiError::Internal(String::from("secret path")).body();
        assert_eq!(body, json!({ "detail": "Internal server error" }));
    }

    #[test]
    fn row_not_found_maps_to_not_found() {
        let error: ApiError = sqlx::Error::RowNotFound.into();
        assert!(matches!(error, ApiError::NotFound(_)));
    }
}
