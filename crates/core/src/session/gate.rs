use std::sync::Arc;

use super::{AuthSession, SessionStore};
use crate::{
    error::CommandError,
    models::Role,
    navigation::{self, Navigator},
};

/// Why access was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// There is no session.
    Unauthenticated,
    /// The session's role differs from the required one.
    WrongRole,
}

/// Outcome of an access check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Go ahead.
    Allow,
    /// Refused.
    Deny(DenyReason),
}

impl Access {
    /// Whether access was granted.
    pub fn is_allowed(self) -> bool {
        self == Access::Allow
    }

    /// Where a refused view should send the user.
    pub fn redirect_path(self) -> Option<&'static str> {
        match self {
            Access::Allow => None,
            Access::Deny(DenyReason::Unauthenticated) => Some(navigation::LOGIN),
            Access::Deny(DenyReason::WrongRole) => Some(navigation::UNAUTHORIZED),
        }
    }
}

/// Pure access rule over a session snapshot.
pub fn authorize(session: Option<&AuthSession>, required: Option<Role>) -> Access {
    match (session, required) {
        (None, _) => Access::Deny(DenyReason::Unauthenticated),
        (Some(session), Some(role)) if session.role() != role => Access::Deny(DenyReason::WrongRole),
        (Some(_), _) => Access::Allow,
    }
}

/// Redirect through `navigator` when access was refused; returns whether to proceed.
pub fn guard(access: Access, navigator: &dyn Navigator) -> bool {
    match access.redirect_path() {
        Some(path) => {
            navigator.navigate(path);
            false
        }
        None => true,
    }
}

/// Access checks against the live session.
///
/// Nothing is cached: each call reads the session as it is right now.
#[derive(Clone)]
pub struct SessionGate {
    session: SessionStore,
}

impl SessionGate {
    /// Gate over `session`.
    pub fn new(session: SessionStore) -> Self {
        Self { session }
    }

    /// Check access for a view or command.
    pub fn authorize(&self, required: Option<Role>) -> Access {
        authorize(self.session.current().as_deref(), required)
    }

    /// Check access and hand out the session a command should run with.
    pub fn admit(&self, required: Option<Role>) -> Result<Arc<AuthSession>, CommandError> {
        let session = self.session.current();
        match (authorize(session.as_deref(), required), session) {
            (Access::Allow, Some(session)) => Ok(session),
            (Access::Deny(DenyReason::WrongRole), Some(session)) => {
                Err(CommandError::AuthorizationDenied {
                    required: required.unwrap_or(session.role()),
                    actual: session.role(),
                })
            }
            _ => Err(CommandError::Unauthenticated),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{buyer_session, owner_session};
    use parking_lot::Mutex;

    #[test]
    fn gate_decisions() {
        let buyer = buyer_session();
        let owner = owner_session();

        assert_eq!(
            authorize(Some(&buyer), Some(Role::Owner)),
            Access::Deny(DenyReason::WrongRole)
        );
        assert_eq!(
            authorize(None, Some(Role::Owner)),
            Access::Deny(DenyReason::Unauthenticated)
        );
        assert_eq!(authorize(None, None), Access::Deny(DenyReason::Unauthenticated));
        assert_eq!(authorize(Some(&owner), Some(Role::Owner)), Access::Allow);
        assert_eq!(authorize(Some(&buyer), None), Access::Allow);
    }

    #[derive(Default)]
    struct RecordingNavigator(Mutex<Vec<String>>);

    impl Navigator for RecordingNavigator {
        fn navigate(&self, path: &str) {
            self.0.lock().push(path.to_string());
        }
    }

    #[test]
    fn guard_redirects_by_reason() {
        let navigator = RecordingNavigator::default();
        assert!(!guard(Access::Deny(DenyReason::Unauthenticated), &navigator));
        assert!(!guard(Access::Deny(DenyReason::WrongRole), &navigator));
        assert!(guard(Access::Allow, &navigator));
        assert_eq!(
            navigator.0.lock().clone(),
            vec!["/login".to_string(), "/unauthorized".to_string()]
        );
    }
}
