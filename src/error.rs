//! Error handling for the eLibros client

use std::fmt;
use thiserror::Error;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Message shown for backend failures (HTTP 5xx)
pub const MSG_SERVER_ERROR: &str = "Erro interno do servidor. Tente novamente mais tarde.";

/// Message shown when the session is no longer valid
pub const MSG_AUTH_ERROR: &str = "Erro de autenticação. Faça login novamente.";

/// Message shown when the API cannot be reached
pub const MSG_CONNECTION_ERROR: &str = "Erro de conexão. Verifique sua internet.";

/// Unified error type for the eLibros client
#[derive(Error, Debug)]
pub enum Error {
    /// Network or HTTP related errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization or deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// JWT decoding errors
    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    /// Session store I/O errors
    #[error("Storage error: {0}")]
    Io(#[from] std::io::Error),

    /// Non-2xx answer from the API, with the best message we could extract
    #[error("API Error: {message}")]
    Api {
        status: reqwest::StatusCode,
        message: String,
    },

    /// The request did not finish within the configured timeout
    #[error("{message}")]
    Timeout { upload: bool, message: &'static str },

    /// The API could not be reached at all
    #[error("Erro de conexão: Verifique se a API está rodando")]
    Connection,

    /// An action that needs a logged in user was attempted anonymously
    #[error("{0}")]
    NotLoggedIn(String),

    /// Client-side form validation failed
    #[error("{}", .0.join("; "))]
    Validation(Vec<String>),

    /// General errors
    #[error("{0}")]
    General(String),
}

fn timeout_message(upload: bool) -> &'static str {
    if upload {
        "Timeout: O upload da imagem demorou muito. Tente usar uma imagem menor ou verifique sua conexão."
    } else {
        "Timeout: A requisição demorou muito para responder"
    }
}

impl Error {
    /// Create a new API error
    pub fn api<T: fmt::Display>(status: reqwest::StatusCode, msg: T) -> Self {
        Error::Api {
            status,
            message: msg.to_string(),
        }
    }

    /// Create a timeout error for a JSON request or a file upload
    pub fn timeout(upload: bool) -> Self {
        Error::Timeout {
            upload,
            message: timeout_message(upload),
        }
    }

    /// Create a new "must be logged in" error
    pub fn not_logged_in<T: fmt::Display>(msg: T) -> Self {
        Error::NotLoggedIn(msg.to_string())
    }

    /// Create a new general error
    pub fn general<T: fmt::Display>(msg: T) -> Self {
        Error::General(msg.to_string())
    }

    /// HTTP status attached to the error, if any
    pub fn status(&self) -> Option<reqwest::StatusCode> {
        match self {
            Error::Api { status, .. } => Some(*status),
            Error::Http(e) => e.status(),
            _ => None,
        }
    }

    /// Whether the error means the stored credentials are no longer usable.
    ///
    /// Falls back to looking for "401" or "token" in the message for errors
    /// that lost their status on the way up.
    pub fn is_auth_error(&self) -> bool {
        if self.status() == Some(reqwest::StatusCode::UNAUTHORIZED) {
            return true;
        }
        let text = self.to_string();
        text.contains("401") || text.contains("token")
    }

    /// Whether the error means the API could not be reached
    pub fn is_connection_error(&self) -> bool {
        match self {
            Error::Connection => true,
            Error::Http(e) => e.is_connect(),
            _ => {
                let text = self.to_string();
                text.contains("conexão") || text.contains("fetch")
            }
        }
    }

    /// Whether the backend failed internally
    pub fn is_server_error(&self) -> bool {
        match self.status() {
            Some(status) => status.is_server_error(),
            None => self.to_string().contains("500"),
        }
    }

    /// Portuguese message suitable for showing to the user
    pub fn user_message(&self) -> String {
        if self.is_server_error() {
            MSG_SERVER_ERROR.to_string()
        } else if self.is_auth_error() {
            MSG_AUTH_ERROR.to_string()
        } else if self.is_connection_error() {
            MSG_CONNECTION_ERROR.to_string()
        } else {
            self.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_user_message_categories() {
        let server = Error::api(StatusCode::INTERNAL_SERVER_ERROR, "boom");
        assert_eq!(server.user_message(), MSG_SERVER_ERROR);

        let unauthorized = Error::api(StatusCode::UNAUTHORIZED, "Token inválido");
        assert_eq!(unauthorized.user_message(), MSG_AUTH_ERROR);

        assert_eq!(Error::Connection.user_message(), MSG_CONNECTION_ERROR);

        let other = Error::api(StatusCode::BAD_REQUEST, "nome: campo obrigatório");
        assert_eq!(other.user_message(), "API Error: nome: campo obrigatório");
    }

    #[test]
    fn test_substring_fallback() {
        assert!(Error::general("given token not valid").is_auth_error());
        assert!(Error::general("API Error: 500").is_server_error());
        assert!(!Error::general("nothing to see").is_auth_error());
    }

    #[test]
    fn test_timeout_messages() {
        let upload = Error::timeout(true).to_string();
        assert!(upload.contains("upload da imagem"));
        let plain = Error::timeout(false).to_string();
        assert_eq!(plain, "Timeout: A requisição demorou muito para responder");
    }

    #[test]
    fn test_validation_joins_messages() {
        let err = Error::Validation(vec!["Nome é obrigatório".into(), "Email inválido".into()]);
        assert_eq!(err.to_string(), "Nome é obrigatório; Email inválido");
    }
}
