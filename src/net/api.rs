//! HTTP client for the `/auth` API.
//!
//! DESIGN
//! ======
//! There is no shared default-header state. Authenticated calls take the
//! bearer token as an argument and attach `Authorization: Bearer <token>` to
//! that one request, so the header always reflects whatever token the session
//! store holds at call time.
//!
//! The `AuthApi` trait is the seam the session store is written against;
//! `HttpAuthApi` is the reqwest-backed implementation.

use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

use super::types::{Credentials, Profile, ProfilePatch, ProfileUpdate, Registration, TokenResponse};
use crate::error::SessionError;

/// Requests the session store needs from the backend.
#[async_trait::async_trait]
pub trait AuthApi: Send + Sync {
    /// `POST /auth/login` — exchange credentials for an access token.
    async fn login(&self, credentials: &Credentials) -> Result<TokenResponse, SessionError>;

    /// `GET /auth/me` — identity of the token holder.
    async fn me(&self, token: &str) -> Result<Profile, SessionError>;

    /// `GET /auth/{user_id}/with_course` — enrollment fields for enrichment.
    async fn user_with_course(&self, token: &str, user_id: i64) -> Result<ProfilePatch, SessionError>;

    /// `POST /auth/register` — create an account.
    async fn register(&self, form: &Registration) -> Result<Profile, SessionError>;

    /// `GET /auth/{user_id}` — public profile of any user.
    async fn user(&self, user_id: i64) -> Result<Profile, SessionError>;

    /// `PUT /auth/{user_id}` — update the token holder's own profile.
    async fn update_user(&self, token: &str, user_id: i64, update: &ProfileUpdate) -> Result<Profile, SessionError>;
}

// =============================================================================
// CLIENT
// =============================================================================

#[derive(Debug, Clone)]
pub struct HttpAuthApi {
    http: reqwest::Client,
    base_url: String,
}

impl HttpAuthApi {
    /// Build a client for `base_url` (no trailing `/`).
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying reqwest client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self, SessionError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| SessionError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: base_url.into() })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

/// Attach the bearer header for `token`.
pub(crate) fn with_bearer(request: RequestBuilder, token: &str) -> RequestBuilder {
    request.header(reqwest::header::AUTHORIZATION, bearer_value(token))
}

#[must_use]
pub fn bearer_value(token: &str) -> String {
    format!("Bearer {token}")
}

async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, SessionError> {
    let response = request
        .send()
        .await
        .map_err(|e| SessionError::Request(e.to_string()))?;

    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| SessionError::Request(e.to_string()))?;

    if !status.is_success() {
        return Err(status_error(status, text));
    }

    serde_json::from_str(&text).map_err(|e| SessionError::Parse(e.to_string()))
}

fn status_error(status: StatusCode, body: String) -> SessionError {
    SessionError::Status { status: status.as_u16(), body }
}

#[async_trait::async_trait]
impl AuthApi for HttpAuthApi {
    async fn login(&self, credentials: &Credentials) -> Result<TokenResponse, SessionError> {
        send_json(self.http.post(self.url("/auth/login")).json(credentials)).await
    }

    async fn me(&self, token: &str) -> Result<Profile, SessionError> {
        send_json(with_bearer(self.http.get(self.url("/auth/me")), token)).await
    }

    async fn user_with_course(&self, token: &str, user_id: i64) -> Result<ProfilePatch, SessionError> {
        let url = self.url(&format!("/auth/{user_id}/with_course"));
        send_json(with_bearer(self.http.get(url), token)).await
    }

    async fn register(&self, form: &Registration) -> Result<Profile, SessionError> {
        send_json(self.http.post(self.url("/auth/register")).json(form)).await
    }

    async fn user(&self, user_id: i64) -> Result<Profile, SessionError> {
        send_json(self.http.get(self.url(&format!("/auth/{user_id}")))).await
    }

    async fn update_user(&self, token: &str, user_id: i64, update: &ProfileUpdate) -> Result<Profile, SessionError> {
        let url = self.url(&format!("/auth/{user_id}"));
        send_json(with_bearer(self.http.put(url), token).json(update)).await
    }
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
