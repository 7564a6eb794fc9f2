//! Configuration options for the eLibros client

use std::env;
use std::time::Duration;

use crate::error::{Error, Result};

/// Default API location used when nothing else is configured
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api/v1";

/// Placeholder shown for books and profiles without an image
pub const PLACEHOLDER_IMAGE_URL: &str = "https://placehold.co/300x400/e0e0e0/808080?text=Sem+Imagem";

/// Configuration options for the eLibros client
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Base URL of the REST API, including the `/api/v1` prefix
    pub api_url: String,

    /// Timeout for regular JSON requests
    pub request_timeout: Duration,

    /// Timeout for multipart uploads
    pub upload_timeout: Duration,

    /// Route the user is sent to when the session is rejected
    pub login_path: String,

    /// Image used when a record has no picture
    pub placeholder_image: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout: Duration::from_secs(10),
            upload_timeout: Duration::from_secs(60),
            login_path: "/login".to_string(),
            placeholder_image: PLACEHOLDER_IMAGE_URL.to_string(),
        }
    }
}

impl ClientOptions {
    /// Build options from `ELIBROS_API_URL`, `ELIBROS_TIMEOUT_SECS` and
    /// `ELIBROS_UPLOAD_TIMEOUT_SECS`, keeping defaults for unset variables
    pub fn from_env() -> Result<Self> {
        let mut options = Self::default();

        if let Ok(url) = env::var("ELIBROS_API_URL") {
            options = options.with_api_url(&url);
        }
        if let Some(secs) = read_secs("ELIBROS_TIMEOUT_SECS")? {
            options = options.with_request_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = read_secs("ELIBROS_UPLOAD_TIMEOUT_SECS")? {
            options = options.with_upload_timeout(Duration::from_secs(secs));
        }

        Ok(options)
    }

    /// Set the API base URL
    pub fn with_api_url(mut self, value: &str) -> Self {
        self.api_url = value.trim_end_matches('/').to_string();
        self
    }

    /// Set the request timeout
    pub fn with_request_timeout(mut self, value: Duration) -> Self {
        self.request_timeout = value;
        self
    }

    /// Set the upload timeout
    pub fn with_upload_timeout(mut self, value: Duration) -> Self {
        self.upload_timeout = value;
        self
    }

    /// Set the login route
    pub fn with_login_path(mut self, value: &str) -> Self {
        self.login_path = value.to_string();
        self
    }

    /// Set the placeholder image
    pub fn with_placeholder_image(mut self, value: &str) -> Self {
        self.placeholder_image = value.to_string();
        self
    }

    /// Host serving uploaded media: the API URL without its `/api/v1` suffix
    pub fn media_base_url(&self) -> String {
        self.api_url.replace("/api/v1", "")
    }

    /// Full URL for an API path such as `/livros/`
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }
}

fn read_secs(name: &str) -> Result<Option<u64>> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| Error::general(format!("{} must be a number of seconds, got {:?}", name, raw))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ClientOptions::default();
        assert_eq!(options.api_url, "http://localhost:8000/api/v1");
        assert_eq!(options.request_timeout, Duration::from_secs(10));
        assert_eq!(options.upload_timeout, Duration::from_secs(60));
        assert_eq!(options.login_path, "/login");
    }

    #[test]
    fn test_media_base_and_endpoint() {
        let options = ClientOptions::default().with_api_url("https://loja.example.com/api/v1/");
        assert_eq!(options.media_base_url(), "https://loja.example.com");
        assert_eq!(
            options.endpoint("/livros/"),
            "https://loja.example.com/api/v1/livros/"
        );
    }
}
