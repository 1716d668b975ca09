//! Navigation guard gating routes on session state.

use std::sync::Arc;

use crate::routes::{self, Route, RouteRequirement, HOME_PATH, LOGIN_PATH};
use crate::store::SessionStore;

/// Anything that can report whether a session is authenticated.
pub trait AuthStatus {
    fn is_authenticated(&self) -> bool;
}

impl AuthStatus for SessionStore {
    fn is_authenticated(&self) -> bool {
        SessionStore::is_authenticated(self)
    }
}

impl<T: AuthStatus + ?Sized> AuthStatus for &T {
    fn is_authenticated(&self) -> bool {
        (**self).is_authenticated()
    }
}

impl<T: AuthStatus + ?Sized> AuthStatus for Arc<T> {
    fn is_authenticated(&self) -> bool {
        (**self).is_authenticated()
    }
}

/// Decision for one transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Allow,
    Redirect(&'static str),
}

/// Pure decision: guests are sent to login, signed-in users away from it.
pub fn evaluate(requirement: RouteRequirement, is_authenticated: bool) -> Navigation {
    match requirement {
        RouteRequirement::RequiresAuth if !is_authenticated => Navigation::Redirect(LOGIN_PATH),
        RouteRequirement::RequiresGuest if is_authenticated => Navigation::Redirect(HOME_PATH),
        _ => Navigation::Allow,
    }
}

/// Guard run before every transition. Reads the session on each call.
pub struct NavigationGuard<S> {
    session: S,
}

impl<S: AuthStatus> NavigationGuard<S> {
    pub fn new(session: S) -> Self {
        Self { session }
    }

    pub fn before_each(&self, to: &Route) -> Navigation {
        let decision = evaluate(to.requirement, self.session.is_authenticated());
        if let Navigation::Redirect(target) = decision {
            tracing::debug!("Redirecting {} -> {}", to.path, target);
        }
        decision
    }

    /// Guard a transition to a concrete path. Unknown paths are allowed.
    pub fn navigate(&self, path: &str) -> Navigation {
        match routes::resolve(path) {
            Some(route) => self.before_each(route),
            None => Navigation::Allow,
        }
    }
}
