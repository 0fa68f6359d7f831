use axum::{
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::{
    models::Scope,
    response::{ApiResponse, Meta},
};

/// Failures of the token, credential and scope checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Not authenticated")]
    MissingToken,

    #[error("Could not validate credentials")]
    InvalidToken,

    #[error("Token has expired")]
    Expired,

    #[error("Could not validate credentials")]
    CredentialsInvalid,

    #[error("Not enough permissions")]
    InsufficientScope,

    #[error("User has no assigned role. Contact support")]
    NoAssignedRole,

    // Both login failures share one message so the wire does not reveal which check failed.
    #[error("Incorrect username or password")]
    UserNotFound,

    #[error("Incorrect username or password")]
    BadCredentials,
}

impl AuthError {
    /// Attach the `WWW-Authenticate` challenge for a route accepting `scopes`.
    pub fn challenge(self, scopes: &[Scope]) -> AppError {
        AppError::Unauthorized {
            error: self,
            challenge: challenge_header(scopes),
        }
    }
}

pub fn challenge_header(scopes: &[Scope]) -> String {
    if scopes.is_empty() {
        return "Bearer".to_string();
    }
    let scope_str = scopes
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    format!("Bearer scope=\"{scope_str}\"")
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Review by user already posted")]
    DuplicateReview,

    #[error("Bad Request {0}")]
    BadRequest(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{error}")]
    Unauthorized { error: AuthError, challenge: String },

    #[error("Database error")]
    DbError(#[from] sqlx::Error),

    #[error("ORM error")]
    OrmError(#[from] sea_orm::DbErr),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl From<AuthError> for AppError {
    fn from(error: AuthError) -> Self {
        error.challenge(&[])
    }
}

impl AppError {
    pub fn auth_error(&self) -> Option<AuthError> {
        match self {
            AppError::Unauthorized { error, .. } => Some(*error),
            _ => None,
        }
    }
}

#[derive(Serialize)]
struct ErrorData {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) | AppError::DuplicateReview => StatusCode::NOT_ACCEPTABLE,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Unauthorized {
                error: AuthError::InsufficientScope,
                ..
            } => StatusCode::FORBIDDEN,
            AppError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            AppError::DbError(_) | AppError::OrmError(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        match &self {
            AppError::DbError(err) => tracing::error!(error = %err, "database error"),
            AppError::OrmError(err) => tracing::error!(error = %err, "orm error"),
            AppError::Internal(err) => tracing::error!(error = %err, "internal error"),
            _ => {}
        }

        let challenge = match &self {
            AppError::Unauthorized {
                error: AuthError::InsufficientScope,
                challenge,
            } => Some(format!("{challenge}, error=\"insufficient_scope\"")),
            AppError::Unauthorized { challenge, .. } => Some(challenge.clone()),
            _ => None,
        };

        let message = self.to_string();
        let body = ApiResponse {
            message: message.clone(),
            data: Some(ErrorData { error: message }),
            meta: Some(Meta::empty()),
        };

        let mut response = (status, axum::Json(body)).into_response();
        if let Some(value) = challenge.and_then(|c| HeaderValue::from_str(&c).ok()) {
            response.headers_mut().insert(header::WWW_AUTHENTICATE, value);
        }
        response
    }
}

pub type AppResult<T> = Result<T, AppError>;
