use std::collections::BTreeMap;

use actix_web::{
    error,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use derive_more::Display;
use serde_json::json;

/// Failures raised by the record store. Nothing above the `db` module creates these.
#[derive(Debug, Display, Clone, PartialEq)]
pub enum StoreError {
    #[display(fmt = "store unavailable: {}", _0)]
    Unavailable(String),

    #[display(fmt = "store call timed out")]
    Timeout,

    #[display(fmt = "duplicate key")]
    DuplicateKey,

    #[display(fmt = "corrupt record: {}", _0)]
    Corrupt(String),
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => StoreError::DuplicateKey,
            sqlx::Error::PoolTimedOut => StoreError::Timeout,
            _ => StoreError::Unavailable(err.to_string()),
        }
    }
}

#[derive(Debug, Display)]
pub enum AppError {
    #[display(fmt = "internal error")]
    InternalError,

    #[display(fmt = "bad request")]
    BadClientData,

    #[display(fmt = "invalid id")]
    InvalidId,

    #[display(fmt = "not found")]
    NotFound,

    #[display(fmt = "unauthorized")]
    Unauthorized,

    #[display(fmt = "forbidden")]
    Forbidden,

    #[display(fmt = "validation failed")]
    Validation(Vec<String>),

    #[display(fmt = "validation failed")]
    FieldErrors(BTreeMap<&'static str, String>),

    #[display(fmt = "{}", _0)]
    Storage(StoreError),

    /// message is shown to the visitor as is
    #[display(fmt = "{}", _0)]
    Gateway(String),
}

impl std::error::Error for AppError {}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Storage(err)
    }
}

impl error::ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let mut builder = HttpResponse::build(self.status_code());
        match self {
            AppError::Validation(errors) => builder.json(json!({ "errors": errors })),
            AppError::FieldErrors(errors) => builder.json(json!({ "errors": errors })),
            _ => builder.insert_header(ContentType::plaintext()).body(self.to_string()),
        }
    }

    fn status_code(&self) -> StatusCode {
        match *self {
            AppError::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BadClientData => StatusCode::BAD_REQUEST,
            AppError::InvalidId => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Validation(_) | AppError::FieldErrors(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Storage(StoreError::Timeout) => StatusCode::GATEWAY_TIMEOUT,
            AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Gateway(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

/// Result of an aggregate read. A store failure degrades to the zero value instead
/// of failing the page, but the cause stays attached so it can be told apart from a
/// real zero.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Complete(T),
    Degraded(T, String),
}

impl<T> Outcome<T> {
    pub fn value(&self) -> &T {
        match self {
            Outcome::Complete(v) | Outcome::Degraded(v, _) => v,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Outcome::Complete(v) | Outcome::Degraded(v, _) => v,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Outcome::Degraded(..))
    }

    pub fn cause(&self) -> Option<&str> {
        match self {
            Outcome::Complete(_) => None,
            Outcome::Degraded(_, cause) => Some(cause),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::ResponseError;

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(AppError::InvalidId.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Validation(vec!["title is required".into()]).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::Storage(StoreError::Timeout).status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            AppError::Storage(StoreError::Unavailable("down".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn degraded_outcome_keeps_its_value() {
        let outcome = Outcome::Degraded(0u64, "store unavailable".to_string());
        assert!(outcome.is_degraded());
        assert_eq!(*outcome.value(), 0);
        assert!(!Outcome::Complete(3u64).is_degraded());
    }
}
