//! Wire types for the `/auth` endpoints.
//!
//! Profiles stay open-ended: only `user_id` is typed, everything else lives in
//! a JSON map so enrichment fields merge without schema changes.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Stand-in for secrets in `Debug` output.
pub const REDACTED: &str = "<redacted>";

/// Partial profile returned by enrichment or sent to `update_user_data`.
pub type ProfilePatch = Map<String, Value>;

/// `POST /auth/login` body.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &REDACTED)
            .finish()
    }
}

/// `POST /auth/login` response.
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

impl fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &REDACTED)
            .field("token_type", &self.token_type)
            .finish()
    }
}

/// A user profile: numeric id plus whatever fields the server returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: i64,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Profile {
    #[must_use]
    pub fn new(user_id: i64) -> Self {
        Self { user_id, fields: Map::new() }
    }

    /// Shallow merge: keys in `patch` overwrite, all other keys survive.
    /// A numeric `user_id` in the patch replaces the id.
    pub fn merge(&mut self, patch: ProfilePatch) {
        for (key, value) in patch {
            if key == "user_id" {
                if let Some(id) = value.as_i64() {
                    self.user_id = id;
                }
                continue;
            }
            self.fields.insert(key, value);
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.str_field("email")
    }

    #[must_use]
    pub fn role(&self) -> Option<&str> {
        self.str_field("role")
    }

    /// "Last First Middle", skipping missing parts.
    #[must_use]
    pub fn full_name(&self) -> String {
        ["last_name", "first_name", "middle_name"]
            .iter()
            .filter_map(|key| self.str_field(key))
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Enrollment details merged in by enrichment.
    #[must_use]
    pub fn course_info(&self) -> Option<&Value> {
        self.fields
            .get("course_info")
            .filter(|value| !value.is_null())
    }

    #[must_use]
    pub fn courses_count(&self) -> Option<u64> {
        self.fields.get("courses_count").and_then(Value::as_u64)
    }
}

/// `POST /auth/register` body. `Debug` hides the password.
#[derive(Clone, Serialize, Deserialize)]
pub struct Registration {
    pub last_name: String,
    pub first_name: String,
    pub middle_name: String,
    /// ISO date, `YYYY-MM-DD`.
    pub birth_date: String,
    pub phone: String,
    pub email: String,
    pub password: String,
    /// `Ученик` (student) or `Репетитор` (tutor).
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telegram: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vk: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interests: Option<String>,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("last_name", &self.last_name)
            .field("first_name", &self.first_name)
            .field("middle_name", &self.middle_name)
            .field("birth_date", &self.birth_date)
            .field("phone", &self.phone)
            .field("email", &self.email)
            .field("password", &REDACTED)
            .field("role", &self.role)
            .field("telegram", &self.telegram)
            .field("vk", &self.vk)
            .field("avatar_path", &self.avatar_path)
            .field("interests", &self.interests)
            .finish()
    }
}

/// `PUT /auth/{user_id}` body. Only set fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telegram: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vk: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interests: Option<String>,
}

impl ProfileUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
