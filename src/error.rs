use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Request-level failures. Validation errors never reach this type: the
/// course editor re-renders its form at the boundary instead.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("course not found")]
    NotFoundOrForbidden,

    #[error("already enrolled in this course")]
    AlreadyEnrolled,

    #[error("not enrolled in this course")]
    NotEnrolled,

    #[error("course is not published")]
    CourseNotPublished,

    #[error("enrollment required to track progress")]
    EnrollmentRequired,

    #[error("authentication required")]
    Unauthorized,

    #[error("access denied")]
    Forbidden,

    #[error("internal server error")]
    Database(#[from] sqlx::Error),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFoundOrForbidden => StatusCode::NOT_FOUND,
            AppError::AlreadyEnrolled
            | AppError::NotEnrolled
            | AppError::CourseNotPublished
            | AppError::EnrollmentRequired => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Database(ref e) = self {
            tracing::error!(error = %e, "storage failure");
        }
        let body = Json(json!({ "success": false, "message": self.to_string() }));
        (self.status_code(), body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
