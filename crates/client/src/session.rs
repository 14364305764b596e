//! Session store.
//!
//! Holds the bearer token and a cached copy of the signed-in identity.
//! Token presence is the only thing that decides whether the caller counts
//! as authenticated; the cached user is display data and may be stale.
//!
//! The store keeps an in-memory copy and writes through to a
//! [`SessionBackend`]. The default backend is a JSON file in the user's
//! home directory so the session survives between runs.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::error::ApiError;

/// Cached identity of the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub user_id: i64,
    pub email: String,
}

impl SessionUser {
    pub fn new(user_id: i64, email: impl Into<String>) -> Self {
        Self {
            user_id,
            email: email.into(),
        }
    }

    pub fn id(&self) -> i64 {
        self.user_id
    }
}

/// Persisted session document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<SessionUser>,
}

impl Session {
    pub fn is_empty(&self) -> bool {
        self.token.is_none() && self.user.is_none()
    }
}

/// Authentication state derived from the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Anonymous,
    Authenticated,
}

/// Durable storage for a [`Session`].
pub trait SessionBackend: Send + Sync {
    fn load(&self) -> Result<Session, ApiError>;
    fn store(&self, session: &Session) -> Result<(), ApiError>;
    fn clear(&self) -> Result<(), ApiError>;
}

/// Session persisted as a JSON file.
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `~/.userhub/session.json`
    pub fn default_path() -> Result<PathBuf, ApiError> {
        let home = dirs::home_dir()
            .ok_or_else(|| ApiError::Config("Could not find home directory".to_string()))?;
        Ok(home.join(".userhub").join("session.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "session.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl SessionBackend for FileBackend {
    fn load(&self) -> Result<Session, ApiError> {
        if !self.path.exists() {
            return Ok(Session::default());
        }
        let content = fs::read_to_string(&self.path)?;
        match serde_json::from_str::<Session>(&content) {
            Ok(session) => Ok(session),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Session file is unreadable, starting anonymous"
                );
                Ok(Session::default())
            }
        }
    }

    fn store(&self, session: &Session) -> Result<(), ApiError> {
        if let Some(parent) = self.path.parent() {
            create_private_dir(parent)?;
        }
        let content =
            serde_json::to_string_pretty(session).map_err(|e| ApiError::Session(e.to_string()))?;
        // token and user land in one rename
        let tmp = self.temp_path();
        write_private(&tmp, content.as_bytes())?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), ApiError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Directories holding the token are owner-only (0700 on unix).
#[cfg(unix)]
fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new().recursive(true).mode(0o700).create(dir)
}

#[cfg(not(unix))]
fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dir)
}

/// Session files are owner-only (0600 on unix).
#[cfg(unix)]
fn write_private(path: &Path, content: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // mode() only applies on creation; a leftover temp file keeps its old bits
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    file.write_all(content)?;
    file.sync_all()
}

#[cfg(not(unix))]
fn write_private(path: &Path, content: &[u8]) -> std::io::Result<()> {
    fs::write(path, content)
}

/// Session kept in process memory only.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    inner: Mutex<Session>,
}

impl SessionBackend for MemoryBackend {
    fn load(&self) -> Result<Session, ApiError> {
        Ok(self.inner.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn store(&self, session: &Session) -> Result<(), ApiError> {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = session.clone();
        Ok(())
    }

    fn clear(&self) -> Result<(), ApiError> {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = Session::default();
        Ok(())
    }
}

/// Shared handle to the current session.
///
/// Cloning is cheap and every clone sees the same state.
#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn SessionBackend>,
    current: Arc<RwLock<Session>>,
}

impl SessionStore {
    /// Open a store, loading whatever the backend already holds.
    pub fn open(backend: Arc<dyn SessionBackend>) -> Result<Self, ApiError> {
        let session = backend.load()?;
        tracing::debug!(
            authenticated = session.token.is_some(),
            "Session store opened"
        );
        Ok(Self {
            backend,
            current: Arc::new(RwLock::new(session)),
        })
    }

    /// Open a file-backed store at `path`.
    pub fn open_file(path: impl Into<PathBuf>) -> Result<Self, ApiError> {
        Self::open(Arc::new(FileBackend::new(path)))
    }

    /// Empty store that is never persisted.
    pub fn in_memory() -> Self {
        Self {
            backend: Arc::new(MemoryBackend::default()),
            current: Arc::new(RwLock::new(Session::default())),
        }
    }

    /// Replace the session with `token` and `user`.
    ///
    /// The backend is written first; if that fails the previous session
    /// stays in effect.
    pub fn set_session(&self, token: impl Into<String>, user: SessionUser) -> Result<(), ApiError> {
        let session = Session {
            token: Some(token.into()),
            user: Some(user),
        };
        self.backend.store(&session)?;
        tracing::info!(
            user_id = session.user.as_ref().map(|u| u.user_id),
            "Session established"
        );
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = session;
        Ok(())
    }

    /// Drop token and user. Safe to call on an empty session.
    ///
    /// The in-memory session is cleared even when the backend fails, so the
    /// running process never keeps using a rejected token.
    pub fn clear_session(&self) -> Result<(), ApiError> {
        let was_set = {
            let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
            let was_set = !current.is_empty();
            *current = Session::default();
            was_set
        };
        if was_set {
            tracing::info!("Session cleared");
        }
        self.backend.clear()
    }

    pub fn token(&self) -> Option<String> {
        self.read().token.clone()
    }

    /// Cached identity; never contacts the server.
    pub fn user(&self) -> Option<SessionUser> {
        self.read().user.clone()
    }

    /// True while a token is present. Expiry is not checked here; the
    /// server rejects stale tokens with a 401.
    pub fn is_authenticated(&self) -> bool {
        self.read().token.is_some()
    }

    pub fn state(&self) -> AuthState {
        if self.is_authenticated() {
            AuthState::Authenticated
        } else {
            AuthState::Anonymous
        }
    }

    pub fn snapshot(&self) -> Session {
        self.read().clone()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Session> {
        self.current.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("state", &self.state())
            .finish()
    }
}

/// Short token prefix that is safe to log.
pub(crate) fn token_preview(token: &str) -> &str {
    let end = token
        .char_indices()
        .nth(8)
        .map(|(i, _)| i)
        .unwrap_or(token.len());
    &token[..end]
}
