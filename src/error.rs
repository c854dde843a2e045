//! Error handling for the PowerFlow client

use std::fmt;
use thiserror::Error;

use powerflow_auth::AuthError;

use crate::validation::FieldErrors;

/// Shown for transport failures; no retry is attempted
pub const CONNECTIVITY_MESSAGE: &str = "Error de conexión con el servidor";

/// Shown after a 401 once the session has been torn down
pub const SESSION_EXPIRED_MESSAGE: &str = "Sesión expirada";

/// Unified error type for the PowerFlow client
#[derive(Error, Debug)]
pub enum Error {
    /// Form input rejected locally; nothing was sent
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    /// Login or registration refused by the backend
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// The backend answered 401; the session has already been cleared
    #[error("Unauthorized: session cleared")]
    Unauthorized,

    /// Authenticated request attempted without a session
    #[error("Not logged in")]
    NotLoggedIn,

    /// Non-2xx response carrying (or lacking) an `error` message
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// 2xx response whose body does not match the expected schema
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Network or HTTP related errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Invalid client configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a new configuration error
    pub fn config<T: fmt::Display>(msg: T) -> Self {
        Error::Config(msg.to_string())
    }

    /// Create a new malformed-response error
    pub fn malformed<T: fmt::Display>(msg: T) -> Self {
        Error::MalformedResponse(msg.to_string())
    }

    /// True for failures that tore down (or found no) session, which
    /// callers answer by returning to the login view
    pub fn requires_login(&self) -> bool {
        matches!(self, Error::Unauthorized | Error::NotLoggedIn)
    }

    /// Text to show the user for this error
    pub fn user_message(&self) -> String {
        match self {
            Error::Validation(errors) => errors.to_string(),
            Error::Auth(AuthError::Rejected { message, .. }) => message.clone(),
            Error::Auth(AuthError::NetworkError(_)) | Error::Http(_) => {
                CONNECTIVITY_MESSAGE.to_string()
            }
            Error::Unauthorized | Error::NotLoggedIn => SESSION_EXPIRED_MESSAGE.to_string(),
            Error::Api { message, .. } => message.clone(),
            _ => self.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
