//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("validation: {0}")]
    Validation(String),
    #[error("table already exists: {0}")]
    DuplicateTable(String),
    #[error("table not found: {0}")]
    TableNotFound(String),
    #[error("field not found: {table}.{field}")]
    FieldNotFound { table: String, field: String },
    #[error("role not found: {0}")]
    RoleNotFound(String),
    #[error("permission not found: {0}")]
    PermissionNotFound(String),
    #[error("migration failed at {step}: {stderr}")]
    Migration {
        step: &'static str,
        stdout: String,
        stderr: String,
    },
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl EngineError {
    /// Stable machine-readable code used in response bodies.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::Validation(_) => "validation_error",
            EngineError::DuplicateTable(_) => "duplicate_table",
            EngineError::TableNotFound(_)
            | EngineError::FieldNotFound { .. }
            | EngineError::RoleNotFound(_)
            | EngineError::PermissionNotFound(_) => "not_found",
            EngineError::Migration { .. } => "migration_error",
            EngineError::Conflict(_) => "conflict",
            EngineError::Db(e) => {
                if let sqlx::Error::RowNotFound = e {
                    "not_found"
                } else {
                    "database_error"
                }
            }
            EngineError::Io(_) => "io_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            EngineError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            EngineError::DuplicateTable(_) | EngineError::Conflict(_) => StatusCode::CONFLICT,
            EngineError::TableNotFound(_)
            | EngineError::FieldNotFound { .. }
            | EngineError::RoleNotFound(_)
            | EngineError::PermissionNotFound(_) => StatusCode::NOT_FOUND,
            EngineError::Migration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            EngineError::Db(e) => {
                if let sqlx::Error::RowNotFound = e {
                    StatusCode::NOT_FOUND
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            }
            EngineError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let details = match &self {
            EngineError::Migration { step, stdout, stderr } => Some(serde_json::json!({
                "step": step,
                "stdout": stdout,
                "stderr": stderr,
            })),
            _ => None,
        };
        let status = self.status();
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code().to_string(),
                message: self.to_string(),
                details,
            },
        };
        (status, Json(body)).into_response()
    }
}
