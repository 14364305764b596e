//! Request and response hooks shared by every API call.
//!
//! All bearer injection and all 401 handling happens here and nowhere else.

use reqwest::{RequestBuilder, Response, StatusCode};

use crate::error::{ApiError, GENERIC_SERVER_MESSAGE};
use crate::navigation::{Navigator, View};
use crate::session::{token_preview, SessionStore};

/// Attach the stored token, if any, as a bearer credential.
pub(crate) fn authorize(builder: RequestBuilder, session: &SessionStore) -> RequestBuilder {
    match session.token() {
        Some(token) => {
            tracing::trace!(token = token_preview(&token), "Attaching bearer token");
            builder.bearer_auth(token)
        }
        None => builder,
    }
}

/// Turn a raw response into success or an [`ApiError`].
///
/// A 401 from any endpoint ends the session and sends the front end to the
/// login view before the error is returned.
pub(crate) async fn inspect(
    response: Response,
    session: &SessionStore,
    navigator: &dyn Navigator,
) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let path = response.url().path().to_string();
    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body);

    if status == StatusCode::UNAUTHORIZED {
        tracing::warn!(path = %path, "Request rejected as unauthorized, ending session");
        if let Err(e) = session.clear_session() {
            tracing::error!(error = %e, "Failed to clear persisted session");
        }
        navigator.navigate(View::Login);
        return Err(ApiError::Unauthorized(message));
    }

    tracing::warn!(path = %path, status = %status, message = %message, "Request failed");
    Err(ApiError::Server { status, message })
}

/// Pull a human readable message out of an error body.
///
/// Understands `{"detail": "..."}`, FastAPI validation lists
/// (`{"detail": [{"msg": ...}]}`), `{"message": ...}` and `{"error": ...}`.
/// Falls back to the raw text, then to a generic message.
pub fn error_message(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return GENERIC_SERVER_MESSAGE.to_string();
    }

    let value = match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(v) => v,
        Err(_) => return trimmed.to_string(),
    };

    match value.get("detail") {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => return s.clone(),
        Some(serde_json::Value::Array(items)) => {
            let msgs: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                .collect();
            if !msgs.is_empty() {
                return msgs.join("; ");
            }
        }
        _ => {}
    }

    for key in ["message", "error"] {
        if let Some(s) = value.get(key).and_then(|v| v.as_str()) {
            if !s.trim().is_empty() {
                return s.to_string();
            }
        }
    }

    GENERIC_SERVER_MESSAGE.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_string() {
        assert_eq!(error_message(r#"{"detail":"User not found"}"#), "User not found");
    }

    #[test]
    fn test_detail_validation_list() {
        let body = r#"{"detail":[{"loc":["body","email"],"msg":"field required","type":"value_error.missing"},{"msg":"too short"}]}"#;
        assert_eq!(error_message(body), "field required; too short");
    }

    #[test]
    fn test_message_and_error_keys() {
        assert_eq!(error_message(r#"{"message":"boom"}"#), "boom");
        assert_eq!(error_message(r#"{"error":"Invalid credentials"}"#), "Invalid credentials");
    }

    #[test]
    fn test_fallbacks() {
        assert_eq!(error_message(""), GENERIC_SERVER_MESSAGE);
        assert_eq!(error_message("{}"), GENERIC_SERVER_MESSAGE);
        assert_eq!(error_message("Bad Gateway"), "Bad Gateway");
    }
}
