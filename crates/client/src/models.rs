//! Wire types for the users API.

use serde::{Deserialize, Serialize};

/// Login or registration payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Response of `/login` and `/register`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub user_id: i64,
    pub email: String,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// A user record as returned by the server.
///
/// `password` is only present when the server echoes it back; it is never
/// meant to be displayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: i64,
    pub email: String,
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
}

/// Identity returned by `/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserResponse {
    pub user_id: i64,
    pub email: String,
}

/// Create/update payload for `/users`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserFormData {
    pub email: String,
    pub password: String,
}

impl UserFormData {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Typed input of the prediction form.
///
/// The client forwards it as an opaque JSON object; the server owns every
/// semantic check on these fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictInput {
    pub age: u32,
    pub weight: f64,
    pub height: f64,
    pub income_lpa: f64,
    pub smoker: bool,
    pub city: String,
    pub occupation: String,
}

impl Default for PredictInput {
    fn default() -> Self {
        Self {
            age: 30,
            weight: 70.0,
            height: 1.75,
            income_lpa: 5.0,
            smoker: false,
            city: String::new(),
            occupation: String::new(),
        }
    }
}

impl PredictInput {
    pub fn into_payload(self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
