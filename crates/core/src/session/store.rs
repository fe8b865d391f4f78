use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{info, warn};

use super::{
    storage::{KeyValueStore, TOKEN_KEY, USER_KEY},
    AuthSession,
};
use crate::{
    api::ApiClient,
    error::{AuthError, RegistrationError},
    events::{AppEvent, EventBus, SessionEvent},
    models::{Credentials, Identity, Role},
    store::{Lifecycle, LifecycleState},
};

/// Owns the session and its durable copy.
///
/// Only this type mutates identity and token; everything else reads the
/// current [`AuthSession`] through [`SessionStore::current`].
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<RwLock<Inner>>,
    storage: Arc<dyn KeyValueStore>,
    api: ApiClient,
    events: EventBus,
}

#[derive(Default)]
struct Inner {
    session: Option<Arc<AuthSession>>,
    lifecycle: Lifecycle,
}

impl SessionStore {
    /// Store with no session; call [`restore`](Self::restore) to pick up a persisted one.
    pub fn new(api: ApiClient, storage: Arc<dyn KeyValueStore>, events: EventBus) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner::default())),
            storage,
            api,
            events,
        }
    }

    /// The current session, if any.
    pub fn current(&self) -> Option<Arc<AuthSession>> {
        self.inner.read().session.clone()
    }

    /// Signed-in identity, if any.
    pub fn identity(&self) -> Option<Identity> {
        self.current().map(|session| session.identity().clone())
    }

    /// `true` while a login or signup is in flight.
    pub fn loading(&self) -> bool {
        self.inner.read().lifecycle.loading()
    }

    /// Message of the last failed login or signup.
    pub fn error(&self) -> Option<String> {
        self.inner.read().lifecycle.error().map(str::to_string)
    }

    /// Lifecycle of the last login or signup.
    pub fn lifecycle(&self) -> LifecycleState {
        self.inner.read().lifecycle.state().clone()
    }

    /// Forget the last login or signup failure.
    pub fn clear_error(&self) {
        self.inner.write().lifecycle.clear_error();
    }

    /// Log in and persist the resulting session.
    ///
    /// Memory is only updated once both values are durable. A storage
    /// failure clears storage and memory alike, so any previous session ends
    /// too (fail closed) rather than living on in memory alone.
    pub async fn authenticate(
        &self,
        role: Role,
        credentials: &Credentials,
    ) -> Result<Arc<AuthSession>, AuthError> {
        let ticket = self.inner.write().lifecycle.begin();

        let response = match self.api.login(role, credentials).await {
            Ok(response) => response,
            Err(err) => {
                let message = err.to_string();
                warn!(%role, email = %credentials.email, %message, "login failed");
                self.inner.write().lifecycle.fail(ticket, message.clone());
                self.events
                    .publish(AppEvent::Session(SessionEvent::LoginFailed(message)));
                return Err(AuthError::Remote(err));
            }
        };

        let session = AuthSession::new(response.user, response.access_token);
        if let Err(err) = self.persist(&session) {
            warn!(?err, "failed to persist session; rolling back");
            self.clear_storage();
            let message = format!("failed to persist session: {err}");
            {
                let mut inner = self.inner.write();
                inner.session = None;
                inner.lifecycle.fail(ticket, message.clone());
            }
            self.events
                .publish(AppEvent::Session(SessionEvent::LoginFailed(message)));
            return Err(AuthError::Storage(err));
        }

        let session = Arc::new(session);
        {
            let mut inner = self.inner.write();
            inner.session = Some(Arc::clone(&session));
            inner.lifecycle.succeed(ticket);
        }
        info!(user_id = session.identity().id, role = %session.role(), "logged in");
        self.events.publish(AppEvent::Session(SessionEvent::LoggedIn(
            session.identity().clone(),
        )));
        Ok(session)
    }

    /// Create an account. Does not log in.
    pub async fn register(
        &self,
        role: Role,
        credentials: &Credentials,
    ) -> Result<Identity, RegistrationError> {
        let ticket = self.inner.write().lifecycle.begin();
        match self.api.signup(role, credentials).await {
            Ok(identity) => {
                self.inner.write().lifecycle.succeed(ticket);
                info!(%role, email = %identity.email, "account registered");
                self.events
                    .publish(AppEvent::Session(SessionEvent::Registered(role)));
                Ok(identity)
            }
            Err(err) => {
                let message = err.to_string();
                warn!(%role, email = %credentials.email, %message, "signup failed");
                self.inner.write().lifecycle.fail(ticket, message.clone());
                self.events
                    .publish(AppEvent::Session(SessionEvent::RegistrationFailed(message)));
                Err(RegistrationError(err))
            }
        }
    }

    /// Clear the session from memory and storage.
    ///
    /// Returns `false` (and publishes nothing) when there was no session.
    pub fn logout(&self) -> bool {
        let previous = self.inner.write().session.take();
        self.clear_storage();
        match previous {
            Some(session) => {
                info!(user_id = session.identity().id, "logged out");
                self.events.publish(AppEvent::Session(SessionEvent::LoggedOut));
                true
            }
            None => false,
        }
    }

    /// Rebuild the session from storage at start-up.
    ///
    /// Anything short of a complete, parseable pair yields no session, and
    /// leftovers are wiped so the next start sees a clean slate.
    pub fn restore(&self) -> Option<Arc<AuthSession>> {
        let restored = match self.read_persisted() {
            Persisted::Complete(session) => Some(Arc::new(session)),
            Persisted::Empty => None,
            Persisted::Unusable => {
                self.clear_storage();
                None
            }
        };
        match restored.as_ref() {
            Some(session) => {
                info!(user_id = session.identity().id, role = %session.role(), "session restored")
            }
            None => info!("no persisted session"),
        }
        self.inner.write().session = restored.clone();
        restored
    }

    /// Re-read storage after an outside change.
    ///
    /// An emptied store ends the session; a different complete pair is
    /// adopted; a half-written pair is ignored until the writer finishes.
    pub fn reload(&self) -> Reloaded {
        match self.read_persisted() {
            Persisted::Empty => {
                let previous = self.inner.write().session.take();
                if previous.is_none() {
                    return Reloaded::Unchanged;
                }
                info!("persisted session removed elsewhere");
                self.events.publish(AppEvent::Session(SessionEvent::Expired));
                Reloaded::Ended
            }
            Persisted::Complete(session) => {
                let adopted = {
                    let mut inner = self.inner.write();
                    if inner.session.as_deref() == Some(&session) {
                        return Reloaded::Unchanged;
                    }
                    let adopted = Arc::new(session);
                    inner.session = Some(Arc::clone(&adopted));
                    adopted
                };
                info!(user_id = adopted.identity().id, "adopted session written elsewhere");
                self.events.publish(AppEvent::Session(SessionEvent::Adopted(
                    adopted.identity().clone(),
                )));
                Reloaded::Adopted(adopted)
            }
            Persisted::Unusable => Reloaded::Unchanged,
        }
    }

    #[cfg(test)]
    pub(crate) fn seed(&self, session: AuthSession) {
        self.inner.write().session = Some(Arc::new(session));
    }

    fn persist(&self, session: &AuthSession) -> anyhow::Result<()> {
        let user = serde_json::to_string(session.identity())?;
        self.storage.set(USER_KEY, &user)?;
        self.storage.set(TOKEN_KEY, session.token())?;
        Ok(())
    }

    fn clear_storage(&self) {
        for key in [USER_KEY, TOKEN_KEY] {
            if let Err(err) = self.storage.remove(key) {
                warn!(key, ?err, "failed to clear persisted session value");
            }
        }
    }

    fn read_persisted(&self) -> Persisted {
        let user = self.storage.get(USER_KEY);
        let token = self.storage.get(TOKEN_KEY);
        match (user, token) {
            (Ok(None), Ok(None)) => Persisted::Empty,
            (Ok(Some(user)), Ok(Some(token))) if !token.trim().is_empty() => {
                match serde_json::from_str::<Identity>(&user) {
                    Ok(identity) => Persisted::Complete(AuthSession::new(identity, token.trim())),
                    Err(err) => {
                        warn!(?err, "persisted identity is corrupt");
                        Persisted::Unusable
                    }
                }
            }
            (Err(err), _) | (_, Err(err)) => {
                warn!(?err, "failed to read persisted session");
                Persisted::Unusable
            }
            _ => {
                warn!("persisted session is incomplete");
                Persisted::Unusable
            }
        }
    }
}

/// What [`SessionStore::reload`] did to the in-memory session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reloaded {
    /// Storage matched memory, or was mid-write.
    Unchanged,
    /// Another process wrote a different session, now current.
    Adopted(Arc<AuthSession>),
    /// Another process logged out; there is no session any more.
    Ended,
}

enum Persisted {
    Empty,
    Complete(AuthSession),
    Unusable,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        api::Method,
        session::{FileStore, MemoryStore},
        testing::{login_json, FakeBackend},
    };
    use serde_json::json;
    use tempfile::tempdir;

    fn session_store(backend: &Arc<FakeBackend>, storage: Arc<dyn KeyValueStore>) -> SessionStore {
        SessionStore::new(ApiClient::new(backend.clone()), storage, EventBus::default())
    }

    fn assert_paired(store: &SessionStore, storage: &dyn KeyValueStore) {
        let user = storage.get(USER_KEY).expect("read user");
        let token = storage.get(TOKEN_KEY).expect("read token");
        assert_eq!(user.is_none(), token.is_none(), "storage half-set");
        // In memory the pair is a single value, so only its presence matters.
        assert_eq!(store.current().is_some(), user.is_some());
    }

    #[tokio::test]
    async fn authenticate_then_restore_reconstructs_identical_session() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let backend = FakeBackend::new();
        backend.respond(Method::Post, "/owners/login", 200, login_json(1, "owner", "tok-1"));

        let storage: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(dir.path()));
        let store = session_store(&backend, storage.clone());
        let session = store
            .authenticate(Role::Owner, &Credentials::new("owner1@farm.test", "pw"))
            .await?;
        assert_paired(&store, storage.as_ref());

        let reloaded = session_store(&backend, Arc::new(FileStore::new(dir.path())));
        let restored = reloaded.restore().expect("session restored");
        assert_eq!(restored, session);
        Ok(())
    }

    #[tokio::test]
    async fn failed_login_leaves_no_session() {
        let backend = FakeBackend::new();
        backend.respond(
            Method::Post,
            "/buyers/login",
            401,
            json!({"detail": "Incorrect email or password"}),
        );
        let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let store = session_store(&backend, storage.clone());

        let err = store
            .authenticate(Role::Buyer, &Credentials::new("b@farm.test", "bad"))
            .await
            .expect_err("login rejected");
        assert_eq!(err.to_string(), "Incorrect email or password");
        assert_eq!(store.error().as_deref(), Some("Incorrect email or password"));
        assert!(store.current().is_none());
        assert_paired(&store, storage.as_ref());
    }

    #[tokio::test]
    async fn logout_twice_matches_logout_once() -> anyhow::Result<()> {
        let backend = FakeBackend::new();
        backend.respond(Method::Post, "/buyers/login", 200, login_json(3, "buyer", "tok-3"));
        let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let store = session_store(&backend, storage.clone());
        let mut events = store.events.subscribe();

        store
            .authenticate(Role::Buyer, &Credentials::new("b@farm.test", "pw"))
            .await?;
        assert!(store.logout());
        assert!(!store.logout());

        assert!(store.current().is_none());
        assert_eq!(storage.get(USER_KEY)?, None);
        assert_eq!(storage.get(TOKEN_KEY)?, None);

        let mut logouts = 0;
        while let Ok(event) = events.try_recv() {
            if event == AppEvent::Session(SessionEvent::LoggedOut) {
                logouts += 1;
            }
        }
        assert_eq!(logouts, 1);
        Ok(())
    }

    #[test]
    fn half_persisted_session_fails_closed() -> anyhow::Result<()> {
        let backend = FakeBackend::new();
        let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        storage.set(
            USER_KEY,
            &json!({"id": 1, "email": "o@farm.test", "role": "owner", "created_at": "2024-01-01T00:00:00"})
                .to_string(),
        )?;
        let store = session_store(&backend, storage.clone());

        assert!(store.restore().is_none());
        assert_eq!(storage.get(USER_KEY)?, None);

        storage.set(USER_KEY, "{not json")?;
        storage.set(TOKEN_KEY, "tok")?;
        assert!(store.restore().is_none());
        assert_paired(&store, storage.as_ref());
        Ok(())
    }

    #[tokio::test]
    async fn reload_ends_session_removed_elsewhere() -> anyhow::Result<()> {
        let backend = FakeBackend::new();
        backend.respond(Method::Post, "/owners/login", 200, login_json(1, "owner", "tok-1"));
        let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let store = session_store(&backend, storage.clone());
        store
            .authenticate(Role::Owner, &Credentials::new("o@farm.test", "pw"))
            .await?;
        let mut events = store.events.subscribe();

        storage.remove(USER_KEY)?;
        assert_eq!(store.reload(), Reloaded::Unchanged, "half-removed pair is ignored");
        assert!(store.current().is_some());

        storage.remove(TOKEN_KEY)?;
        assert_eq!(store.reload(), Reloaded::Ended);
        assert_eq!(store.reload(), Reloaded::Unchanged);
        assert_eq!(
            events.try_recv()?,
            AppEvent::Session(SessionEvent::Expired)
        );
        Ok(())
    }

    /// Memory-backed store whose writes can be made to fail.
    #[derive(Default)]
    struct BrokenDisk {
        values: MemoryStore,
        fail_writes: std::sync::atomic::AtomicBool,
    }

    impl KeyValueStore for BrokenDisk {
        fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
            self.values.get(key)
        }

        fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
            if self.fail_writes.load(std::sync::atomic::Ordering::SeqCst) && key == TOKEN_KEY {
                anyhow::bail!("disk full");
            }
            self.values.set(key, value)
        }

        fn remove(&self, key: &str) -> anyhow::Result<()> {
            self.values.remove(key)
        }
    }

    #[tokio::test]
    async fn persist_failure_ends_previous_session_too() -> anyhow::Result<()> {
        let backend = FakeBackend::new();
        backend.respond(Method::Post, "/owners/login", 200, login_json(1, "owner", "tok-1"));
        let disk = Arc::new(BrokenDisk::default());
        let storage: Arc<dyn KeyValueStore> = disk.clone();
        let store = session_store(&backend, storage.clone());

        store
            .authenticate(Role::Owner, &Credentials::new("o@farm.test", "pw"))
            .await?;
        disk.fail_writes.store(true, std::sync::atomic::Ordering::SeqCst);

        let err = store
            .authenticate(Role::Owner, &Credentials::new("o@farm.test", "pw"))
            .await
            .expect_err("token write fails");
        assert!(matches!(err, AuthError::Storage(_)));
        assert!(store.current().is_none());
        assert_paired(&store, storage.as_ref());
        assert!(store.error().is_some());
        Ok(())
    }

    #[tokio::test]
    async fn reload_adopts_a_different_account() -> anyhow::Result<()> {
        let backend = FakeBackend::new();
        backend.respond(Method::Post, "/owners/login", 200, login_json(1, "owner", "tok-1"));
        let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let store = session_store(&backend, storage.clone());
        store
            .authenticate(Role::Owner, &Credentials::new("o@farm.test", "pw"))
            .await?;
        let mut events = store.events.subscribe();

        let other = login_json(2, "buyer", "tok-2");
        storage.set(USER_KEY, &other["user"].to_string())?;
        storage.set(TOKEN_KEY, "tok-2")?;

        let Reloaded::Adopted(adopted) = store.reload() else {
            panic!("expected the new pair to be adopted");
        };
        assert_eq!(adopted.identity().id, 2);
        assert_eq!(store.current().map(|s| s.role()), Some(Role::Buyer));
        assert!(matches!(
            events.try_recv()?,
            AppEvent::Session(SessionEvent::Adopted(identity)) if identity.id == 2
        ));
        assert_eq!(store.reload(), Reloaded::Unchanged);
        Ok(())
    }

    #[tokio::test]
    async fn register_does_not_authenticate() -> anyhow::Result<()> {
        let backend = FakeBackend::new();
        backend.respond(
            Method::Post,
            "/owners/signup",
            200,
            json!({"id": 9, "email": "new@farm.test", "role": "owner", "created_at": "2024-05-01T09:00:00"}),
        );
        let store = session_store(&backend, Arc::new(MemoryStore::new()));

        let identity = store
            .register(Role::Owner, &Credentials::new("new@farm.test", "pw"))
            .await?;
        assert_eq!(identity.id, 9);
        assert!(store.current().is_none());
        assert_eq!(store.lifecycle(), LifecycleState::Succeeded);
        Ok(())
    }
}
