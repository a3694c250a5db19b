use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(&'static str),

    #[error("missing or invalid credentials")]
    Unauthorized,

    #[error(transparent)]
    Database(#[from] sea_orm::DbErr),
}

impl AppError {
    fn code_and_status(&self) -> (&'static str, StatusCode) {
        match self {
            AppError::Validation(_) => ("BAD_REQUEST", StatusCode::UNPROCESSABLE_ENTITY),
            AppError::NotFound(_) => ("NOT_FOUND", StatusCode::NOT_FOUND),
            AppError::Unauthorized => ("UNAUTHORIZED", StatusCode::UNAUTHORIZED),
            AppError::Database(_) => ("INTERNAL", StatusCode::INTERNAL_SERVER_ERROR),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Database(err) = &self {
            tracing::error!(error = %err, "database failure");
        }
        let (code, status) = self.code_and_status();
        let body = Json(json!({ "code": code, "message": self.to_string() }));
        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
