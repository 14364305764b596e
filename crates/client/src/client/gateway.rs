//! HTTP client for the users API.

use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::sync::Arc;

use super::hooks;
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::models::{AuthResponse, Credentials, UserFormData, UserRecord, UserResponse};
use crate::navigation::{Navigator, View};
use crate::session::{SessionStore, SessionUser};

/// Authenticated client for the users API.
///
/// Every call goes through the same two hooks: the stored token is attached
/// on the way out, and a 401 on the way back ends the session and sends the
/// navigator to the login view.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: SessionStore,
    navigator: Arc<dyn Navigator>,
}

impl ApiClient {
    /// Create a client over an existing session store.
    pub fn new(
        config: &ClientConfig,
        session: SessionStore,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ApiError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            session,
            navigator,
        })
    }

    /// Create a client and open the session store `config` points at.
    pub fn from_config(config: &ClientConfig, navigator: Arc<dyn Navigator>) -> Result<Self, ApiError> {
        let session = match &config.session_file {
            Some(path) => SessionStore::open_file(path)?,
            None => SessionStore::in_memory(),
        };
        Self::new(config, session, navigator)
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        tracing::debug!(method = %method, path = %path, "Sending request");
        self.http.request(method, format!("{}{}", self.base_url, path))
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let response = hooks::authorize(builder, &self.session)
            .send()
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "Request did not reach the server"))?;
        hooks::inspect(response, &self.session, self.navigator.as_ref()).await
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let response = self.send(builder).await?;
        Ok(response.json::<T>().await?)
    }

    fn commit_session(&self, auth: &AuthResponse) -> Result<(), ApiError> {
        self.session.set_session(
            auth.access_token.clone(),
            SessionUser::new(auth.user_id, auth.email.clone()),
        )
    }

    /// `POST /login`. On success the returned token and identity become the
    /// current session.
    pub async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, ApiError> {
        let auth: AuthResponse = self
            .send_json(self.request(Method::POST, "/login").json(credentials))
            .await?;
        self.commit_session(&auth)?;
        tracing::info!(user_id = auth.user_id, email = %auth.email, "Logged in");
        Ok(auth)
    }

    /// `POST /register`. Commits the session exactly like [`Self::login`].
    pub async fn register(&self, credentials: &Credentials) -> Result<AuthResponse, ApiError> {
        let auth: AuthResponse = self
            .send_json(self.request(Method::POST, "/register").json(credentials))
            .await?;
        self.commit_session(&auth)?;
        tracing::info!(user_id = auth.user_id, email = %auth.email, "Registered");
        Ok(auth)
    }

    /// End the session locally and go to the login view.
    pub fn logout(&self) -> Result<(), ApiError> {
        let result = self.session.clear_session();
        self.navigator.navigate(View::Login);
        result
    }

    /// `GET /me`
    pub async fn current_user(&self) -> Result<UserResponse, ApiError> {
        self.send_json(self.request(Method::GET, "/me")).await
    }

    /// `GET /users`
    pub async fn list_users(&self) -> Result<Vec<UserRecord>, ApiError> {
        self.send_json(self.request(Method::GET, "/users")).await
    }

    /// `GET /users/{id}`
    pub async fn get_user(&self, user_id: i64) -> Result<UserRecord, ApiError> {
        self.send_json(self.request(Method::GET, &format!("/users/{}", user_id)))
            .await
    }

    /// `POST /users`
    pub async fn create_user(&self, data: &UserFormData) -> Result<UserRecord, ApiError> {
        let user: UserRecord = self
            .send_json(self.request(Method::POST, "/users").json(data))
            .await?;
        tracing::info!(user_id = user.user_id, "User created");
        Ok(user)
    }

    /// `PUT /users/{id}`
    pub async fn update_user(&self, user_id: i64, data: &UserFormData) -> Result<UserRecord, ApiError> {
        let user: UserRecord = self
            .send_json(
                self.request(Method::PUT, &format!("/users/{}", user_id))
                    .json(data),
            )
            .await?;
        tracing::info!(user_id = user.user_id, "User updated");
        Ok(user)
    }

    /// `DELETE /users/{id}`. Any response body is ignored.
    pub async fn delete_user(&self, user_id: i64) -> Result<(), ApiError> {
        self.send(self.request(Method::DELETE, &format!("/users/{}", user_id)))
            .await?;
        tracing::info!(user_id, "User deleted");
        Ok(())
    }

    /// `POST /predict`. Payload and result are passed through untouched.
    pub async fn predict(&self, payload: &serde_json::Value) -> Result<serde_json::Value, ApiError> {
        self.send_json(self.request(Method::POST, "/predict").json(payload))
            .await
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("session", &self.session)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::CurrentView;

    fn client(url: &str) -> ApiClient {
        let config = ClientConfig::default().with_api_url(url);
        ApiClient::new(&config, SessionStore::in_memory(), Arc::new(CurrentView::default())).unwrap()
    }

    #[test]
    fn test_client_creation() {
        assert_eq!(client("http://localhost:8000").base_url(), "http://localhost:8000");
        assert_eq!(client("http://localhost:8000/").base_url(), "http://localhost:8000");
    }

    #[test]
    fn test_logout_navigates_to_login() {
        let nav = Arc::new(CurrentView::new(View::Users));
        let session = SessionStore::in_memory();
        session.set_session("T1", SessionUser::new(7, "a@b.com")).unwrap();
        let api = ApiClient::new(&ClientConfig::default(), session.clone(), nav.clone()).unwrap();

        api.logout().unwrap();
        assert!(!session.is_authenticated());
        assert_eq!(nav.get(), View::Login);
    }

    #[tokio::test]
    async fn test_transport_failure_keeps_session() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let session = SessionStore::in_memory();
        session.set_session("T1", SessionUser::new(7, "a@b.com")).unwrap();
        let config = ClientConfig::default().with_api_url(format!("http://127.0.0.1:{}", port));
        let api = ApiClient::new(&config, session.clone(), Arc::new(CurrentView::default())).unwrap();

        let err = api.list_users().await.unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
        assert!(session.is_authenticated());
    }
}
