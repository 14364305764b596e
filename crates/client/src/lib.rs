//! Userhub API client
//!
//! Client side of the users API: authentication, user management and the
//! prediction passthrough.
//!
//! This crate provides:
//! - Session store with file and in-memory backends
//! - Authenticated HTTP client with centralized 401 handling
//! - Views, navigation and the route guard for protected views
//! - Form validation for login, registration and user forms

pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod navigation;
pub mod session;
pub mod validation;

pub use client::ApiClient;
pub use config::ClientConfig;
pub use error::ApiError;
pub use models::{AuthResponse, Credentials, PredictInput, UserFormData, UserRecord, UserResponse};
pub use navigation::{CurrentView, GuardDecision, Navigator, RouteGuard, View};
pub use session::{AuthState, FileBackend, MemoryBackend, Session, SessionBackend, SessionStore, SessionUser};
