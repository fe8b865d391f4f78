//! Authenticated session: the single source of identity and bearer token.

/// Role-based access checks.
pub mod gate;
/// Durable key-value storage.
pub mod storage;
/// Session store and its persistence.
pub mod store;
/// Filesystem watcher keeping the in-memory session in step with storage.
pub mod watch;

use std::fmt;

use crate::models::{Identity, Role};

pub use gate::{authorize, guard, Access, DenyReason, SessionGate};
pub use storage::{FileStore, KeyValueStore, MemoryStore, TOKEN_KEY, USER_KEY};
pub use store::{Reloaded, SessionStore};
pub use watch::SessionWatcher;

/// An identity together with its bearer token.
///
/// The pair only exists as a whole, so a half-set session cannot be
/// represented; "no session" is `None` wherever one is held.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthSession {
    identity: Identity,
    token: String,
}

impl AuthSession {
    /// Pair an identity with its token.
    pub fn new(identity: Identity, token: impl Into<String>) -> Self {
        Self {
            identity,
            token: token.into(),
        }
    }

    /// The signed-in account.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Bearer token for protected calls.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Role of the signed-in account.
    pub fn role(&self) -> Role {
        self.identity.role
    }
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSession")
            .field("identity", &self.identity)
            .field("token", &"<redacted>")
            .finish()
    }
}
