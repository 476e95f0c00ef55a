//! HTTP error responses
//!
//! Every failed request gets a JSON body `{error: {code, message}, request_id}`.
//! A query over a key holding both counters and series is a 409; other query
//! and validation failures are 400s.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::query::QueryError;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Bad request parameters, e.g. an unparseable `t` or `i`
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ApiError::Query(QueryError::TypeConflict { .. }) => {
                (StatusCode::CONFLICT, "TYPE_CONFLICT")
            }
            ApiError::Query(_) => (StatusCode::BAD_REQUEST, "QUERY_ERROR"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
    pub request_id: String,
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let request_id = uuid::Uuid::new_v4().to_string();

        if status.is_server_error() {
            tracing::error!(%request_id, code, "Request failed: {}", self);
        } else {
            tracing::debug!(%request_id, code, "Request rejected: {}", self);
        }

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message: self.to_string(),
            },
            request_id,
        };

        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
