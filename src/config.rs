//! Client configuration parsed from environment variables.

use std::path::PathBuf;

use crate::error::SessionError;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_TOKEN_DIR: &str = ".campus";
pub const TOKEN_FILE_NAME: &str = "token";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base address every API path is joined onto, without a trailing `/`.
    pub api_url: String,
    /// File holding the persisted bearer token.
    pub token_path: PathBuf,
}

impl ClientConfig {
    /// Build typed client config from environment variables.
    ///
    /// Optional:
    /// - `CAMPUS_API_URL`: default `http://127.0.0.1:8000`
    /// - `CAMPUS_TOKEN_FILE`: default `~/.campus/token` (see [`default_token_file`])
    ///
    /// # Errors
    ///
    /// Returns an error if `CAMPUS_API_URL` is not an http(s) address.
    pub fn from_env() -> Result<Self, SessionError> {
        let api_url = normalize_api_url(&std::env::var("CAMPUS_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.into()))?;
        let token_path = match std::env::var("CAMPUS_TOKEN_FILE") {
            Ok(path) if !path.trim().is_empty() => PathBuf::from(path),
            _ => default_token_file(),
        };
        Ok(Self { api_url, token_path })
    }

    /// Replace the API address, applying the same validation as `from_env`.
    ///
    /// # Errors
    ///
    /// Returns an error if `raw` is not an http(s) address.
    pub fn with_api_url(mut self, raw: &str) -> Result<Self, SessionError> {
        self.api_url = normalize_api_url(raw)?;
        Ok(self)
    }
}

pub(crate) fn normalize_api_url(raw: &str) -> Result<String, SessionError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(SessionError::Config(format!("CAMPUS_API_URL must start with http:// or https://, got '{raw}'")));
    }
    Ok(trimmed.to_owned())
}

/// `~/.campus/token`, with the home directory resolved per platform. Falls
/// back to a relative `.campus/token` only when no home directory exists.
#[must_use]
pub fn default_token_file() -> PathBuf {
    default_token_path(dirs::home_dir())
}

pub(crate) fn default_token_path(home: Option<PathBuf>) -> PathBuf {
    home.unwrap_or_default()
        .join(DEFAULT_TOKEN_DIR)
        .join(TOKEN_FILE_NAME)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
