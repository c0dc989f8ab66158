//! HTTP-facing error type. Every handler returns `Result<_, AppError>`.

use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::booking::ReservationError;
use crate::catalog::CatalogError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid username/password.")]
    Unauthorized,

    #[error("You do not have permission to perform this action.")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("invalid request body: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("invalid {field}: {message}")]
    InvalidField { field: &'static str, message: String },

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Reservation(#[from] ReservationError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound(what) => Self::NotFound(what),
            CatalogError::Invalid { field, message } => Self::InvalidField { field, message },
            CatalogError::Conflict(message) => Self::Conflict(message),
            CatalogError::Database(e) => Self::Database(e),
        }
    }
}

fn detail(message: impl Into<String>) -> Value {
    json!({ "detail": message.into() })
}

fn field_errors(errors: &validator::ValidationErrors) -> Value {
    let fields: BTreeMap<String, Vec<String>> = errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let messages = errs
                .iter()
                .map(|e| e.message.as_ref().map_or_else(|| e.code.to_string(), |m| m.to_string()))
                .collect();
            (field.to_string(), messages)
        })
        .collect();
    json!(fields)
}

fn reservation_body(err: &ReservationError) -> (StatusCode, Value) {
    match err {
        ReservationError::EmptyBatch => (
            StatusCode::BAD_REQUEST,
            json!({ "tickets": ["This list may not be empty."] }),
        ),
        ReservationError::Validation(errors) => (
            StatusCode::BAD_REQUEST,
            json!({ "tickets": errors.by_position() }),
        ),
        ReservationError::Conflict(conflict) => {
            let seat = conflict.seat();
            (
                StatusCode::CONFLICT,
                json!({
                    "detail": conflict.to_string(),
                    "ticket": conflict.index(),
                    "show_session": seat.map(|s| s.session_id),
                    "row": seat.map(|s| s.row),
                    "seat": seat.map(|s| s.seat),
                }),
            )
        }
        ReservationError::Storage(e) => {
            tracing::error!("reservation storage failure: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, detail("internal server error"))
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, detail(self.to_string())),
            Self::Forbidden => (StatusCode::FORBIDDEN, detail(self.to_string())),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, detail(self.to_string())),
            Self::Validation(errors) => (StatusCode::BAD_REQUEST, field_errors(errors)),
            Self::InvalidField { field, message } => {
                let mut body = serde_json::Map::new();
                body.insert(field.to_string(), json!([message]));
                (StatusCode::BAD_REQUEST, Value::Object(body))
            }
            Self::Conflict(message) => (StatusCode::CONFLICT, detail(message.clone())),
            Self::Reservation(err) => reservation_body(err),
            Self::Database(e) => {
                tracing::error!("database error: {e:?}");
                (StatusCode::INTERNAL_SERVER_ERROR, detail("internal server error"))
            }
            Self::Internal(message) => {
                tracing::error!("internal error: {message}");
                (StatusCode::INTERNAL_SERVER_ERROR, detail("internal server error"))
            }
        };
        (status, Json(body)).into_response()
    }
}
