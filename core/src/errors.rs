use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use validator::ValidationErrors;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Sqlx(sqlx::Error),

    #[error(transparent)]
    InvalidEntity(#[from] ValidationErrors),

    #[error("{0}")]
    UnprocessableEntity(String),

    #[error("{0}")]
    Conflict(String),

    #[error("internal server error")]
    InternalServerError,

    #[error("not found")]
    NotFound,
}

impl From<sqlx::Error> for Error {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::RowNotFound => Error::NotFound,
            other => Error::Sqlx(other),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    message: String,
    errors: Option<ValidationErrors>,
}

impl Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::Sqlx(_) | Error::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
            Error::InvalidEntity(_) | Error::UnprocessableEntity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::NotFound => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "request failed");

        let errors = match &self {
            Error::InvalidEntity(e) => Some(e.clone()),
            _ => None,
        };

        let body = ErrorResponse {
            message: self.to_string(),
            errors,
        };

        (self.status_code(), Json(body)).into_response()
    }
}
