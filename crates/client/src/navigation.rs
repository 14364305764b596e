//! Views, navigation and the route guard.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use crate::session::SessionStore;

/// Every screen of the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Login,
    Register,
    Users,
    AddUser,
    EditUser(i64),
    Predict,
}

impl View {
    /// Landing view after login, registration and user edits.
    pub const HOME: View = View::Users;

    pub fn path(&self) -> String {
        match self {
            View::Login => "/login".to_string(),
            View::Register => "/register".to_string(),
            View::Users => "/users".to_string(),
            View::AddUser => "/add-user".to_string(),
            View::EditUser(id) => format!("/edit-user/{}", id),
            View::Predict => "/predict".to_string(),
        }
    }

    pub fn from_path(path: &str) -> Option<View> {
        let path = path.trim_end_matches('/');
        match path {
            "" | "/users" => Some(View::Users),
            "/login" => Some(View::Login),
            "/register" => Some(View::Register),
            "/add-user" => Some(View::AddUser),
            "/predict" => Some(View::Predict),
            other => other
                .strip_prefix("/edit-user/")
                .and_then(|id| id.parse().ok())
                .map(View::EditUser),
        }
    }

    /// Whether the view needs an active session.
    pub fn is_protected(&self) -> bool {
        !matches!(self, View::Login | View::Register)
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Moves the front end to another view.
pub trait Navigator: Send + Sync {
    fn navigate(&self, view: View);
}

/// Navigator that just remembers where it was sent.
#[derive(Debug, Clone)]
pub struct CurrentView {
    view: Arc<RwLock<View>>,
}

impl CurrentView {
    pub fn new(initial: View) -> Self {
        Self {
            view: Arc::new(RwLock::new(initial)),
        }
    }

    pub fn get(&self) -> View {
        *self.view.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for CurrentView {
    fn default() -> Self {
        Self::new(View::HOME)
    }
}

impl Navigator for CurrentView {
    fn navigate(&self, view: View) {
        tracing::debug!(view = %view, "Navigating");
        *self.view.write().unwrap_or_else(PoisonError::into_inner) = view;
    }
}

/// Outcome of a route guard check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Render(View),
    Redirect(View),
}

/// Keeps anonymous callers out of protected views.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    session: SessionStore,
}

impl RouteGuard {
    pub fn new(session: SessionStore) -> Self {
        Self { session }
    }

    pub fn check(&self, view: View) -> GuardDecision {
        if view.is_protected() && !self.session.is_authenticated() {
            tracing::debug!(view = %view, "Protected view without session, redirecting to login");
            GuardDecision::Redirect(View::Login)
        } else {
            GuardDecision::Render(view)
        }
    }

    /// Check `view` and navigate to wherever the decision points.
    ///
    /// Returns true when `view` itself may be shown.
    pub fn enter(&self, view: View, navigator: &dyn Navigator) -> bool {
        match self.check(view) {
            GuardDecision::Render(v) => {
                navigator.navigate(v);
                true
            }
            GuardDecision::Redirect(v) => {
                navigator.navigate(v);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionUser;

    #[test]
    fn test_view_paths() {
        assert_eq!(View::from_path("/"), Some(View::Users));
        assert_eq!(View::from_path("/edit-user/42"), Some(View::EditUser(42)));
        assert_eq!(View::from_path("/edit-user/abc"), None);
        assert_eq!(View::from_path("/nowhere"), None);
        for view in [View::Login, View::Register, View::AddUser, View::Predict, View::EditUser(3)] {
            assert_eq!(View::from_path(&view.path()), Some(view));
        }
    }

    #[test]
    fn test_guard_redirects_anonymous() {
        let guard = RouteGuard::new(SessionStore::in_memory());
        assert_eq!(guard.check(View::Users), GuardDecision::Redirect(View::Login));
        assert_eq!(guard.check(View::Predict), GuardDecision::Redirect(View::Login));
        assert_eq!(guard.check(View::Register), GuardDecision::Render(View::Register));
    }

    #[test]
    fn test_guard_renders_for_session() {
        let session = SessionStore::in_memory();
        session.set_session("T1", SessionUser::new(1, "a@b.com")).unwrap();
        let guard = RouteGuard::new(session.clone());
        let nav = CurrentView::new(View::Login);

        assert!(guard.enter(View::EditUser(1), &nav));
        assert_eq!(nav.get(), View::EditUser(1));

        session.clear_session().unwrap();
        assert!(!guard.enter(View::Users, &nav));
        assert_eq!(nav.get(), View::Login);
    }
}
