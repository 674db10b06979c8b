//! Typed errors and HTTP mapping. Every error response is plain text.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing setting: {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: '{value}'")]
    InvalidValue { key: &'static str, value: String },
    #[error("config load: {0}")]
    Load(String),
    #[error("validation: {0}")]
    Validation(String),
}

/// Failure to resolve or render a named SQL template.
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("could not parse script {name}: unknown template")]
    UnknownTemplate { name: String },
    #[error("could not parse script {name}: missing parameter '{param}'")]
    MissingParam { name: String, param: String },
    #[error("could not parse script {name}: {reason}")]
    Syntax { name: String, reason: String },
    #[error("could not load template {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl TemplateError {
    pub fn template_name(&self) -> &str {
        match self {
            TemplateError::UnknownTemplate { name }
            | TemplateError::MissingParam { name, .. }
            | TemplateError::Syntax { name, .. } => name,
            TemplateError::Io { path, .. } => path,
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error("{0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("not implemented: {0}")]
    NotImplemented(String),
    /// Adapter failure. The message carries the inlined statement for diagnosability.
    #[error("could not execute sql {statement}: {message}")]
    Execution { statement: String, message: String },
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("internal: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            AppError::Config(_)
            | AppError::Template(_)
            | AppError::Execution { .. }
            | AppError::Db(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        if status.is_server_error() {
            tracing::error!(status = %status, "{}", message);
        } else {
            tracing::warn!(status = %status, "{}", message);
        }
        (status, message).into_response()
    }
}
