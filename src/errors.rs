use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use std::env::VarError;
use thiserror::Error;

use crate::api::ApiError;

/// Same page the default service answers unknown routes with.
const NOT_FOUND_PAGE: &str = include_str!("../static/404.html");

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not logged in")]
    Unauthenticated,

    #[error("Admin permission required")]
    Forbidden,

    #[error("Not found")]
    NotFound,

    #[error("Backend error: {0}")]
    Api(#[from] ApiError),

    #[error("Template error: {0}")]
    TemplateError(#[from] tera::Error),

    #[error("Session error: {0}")]
    SessionError(String),

    #[error("Identity error: {0}")]
    IdentityError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Environment variable error: {0}")]
    EnvVarError(#[from] VarError),
}

impl From<actix_session::SessionInsertError> for AppError {
    fn from(err: actix_session::SessionInsertError) -> Self {
        AppError::SessionError(err.to_string())
    }
}

impl From<actix_session::SessionGetError> for AppError {
    fn from(err: actix_session::SessionGetError) -> Self {
        AppError::SessionError(err.to_string())
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated | AppError::Forbidden => StatusCode::SEE_OTHER,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Api(_) => StatusCode::BAD_GATEWAY,
            AppError::TemplateError(_)
            | AppError::SessionError(_)
            | AppError::IdentityError(_)
            | AppError::ConfigError(_)
            | AppError::IoError(_)
            | AppError::EnvVarError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::Unauthenticated => HttpResponse::SeeOther()
                .append_header(("Location", "/login"))
                .finish(),
            AppError::Forbidden => HttpResponse::SeeOther()
                .append_header(("Location", "/"))
                .finish(),
            AppError::NotFound => HttpResponse::NotFound()
                .content_type("text/html; charset=utf-8")
                .body(NOT_FOUND_PAGE),
            _ => HttpResponse::build(self.status_code()).body(self.to_string()),
        }
    }
}

impl From<AppError> for std::io::Error {
    fn from(err: AppError) -> Self {
        std::io::Error::new(std::io::ErrorKind::Other, err.to_string())
    }
}
