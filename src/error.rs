use axum::http::StatusCode;
use thiserror::Error;
use tracing::error;

/// Every caller-visible failure of the account core.
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("invalid field: {0}")]
    InvalidInput(&'static str),
    #[error("email already registered")]
    DuplicateEmail,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("invalid token")]
    TokenInvalid,
    #[error("token expired")]
    TokenExpired,
    #[error("user not found")]
    NotFound,
    #[error("credential hashing unavailable: {0}")]
    CryptoUnavailable(String),
    #[error("storage failure: {0}")]
    Storage(#[from] sqlx::Error),
}

impl AccountError {
    /// Single place where core errors become HTTP responses. 5xx details are
    /// logged but never sent to the client.
    pub fn into_http(self) -> (StatusCode, String) {
        let status = match &self {
            Self::InvalidInput(_) | Self::DuplicateEmail => StatusCode::BAD_REQUEST,
            Self::InvalidCredentials | Self::TokenInvalid | Self::TokenExpired => {
                StatusCode::UNAUTHORIZED
            }
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::CryptoUnavailable(_) | Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(error = %self, "request failed");
            return (status, "internal error".to_string());
        }
        (status, self.to_string())
    }
}
