//! The client-side marketplace: session, gate, dispatcher and the three
//! domain stores wired together.
//!
//! [`Marketplace`] is what a front-end holds. Session operations go to the
//! [`SessionStore`]; every domain command is a method that builds one
//! [`ApiClient`] call and runs it through the [`Dispatcher`] against the
//! store that owns the data. Role requirements mirror the server's own
//! checks:
//!
//! | command | role |
//! |---|---|
//! | storehouse list / create / search, storehouse products, product create / update / delete | owner |
//! | list all products, send inquiry | buyer |
//! | product search | any |

mod inquiries;
mod products;
mod storehouses;

use std::{path::Path, sync::Arc};

use anyhow::Result;
use tracing::info;

use crate::{
    api::{ApiClient, Backend, HttpBackend},
    config::AppConfig,
    dispatch::Dispatcher,
    error::{AuthError, RegistrationError},
    events::EventBus,
    models::{Credentials, Identity, Role},
    session::{
        Access, AuthSession, FileStore, KeyValueStore, Reloaded, SessionGate, SessionStore,
        SessionWatcher,
    },
    store::{InquiryState, ProductState, Store, StoreKind, StorehouseState},
};

/// Session plus domain stores, sharing one event bus.
#[derive(Clone)]
pub struct Marketplace {
    api: ApiClient,
    session: SessionStore,
    gate: SessionGate,
    dispatcher: Dispatcher,
    events: EventBus,
    storehouses: Store<StorehouseState>,
    products: Store<ProductState>,
    inquiries: Store<InquiryState>,
}

impl Marketplace {
    /// Marketplace talking HTTP to `config.api_url` and persisting the session
    /// under `config.storage_dir`.
    pub fn new(config: &AppConfig) -> Result<Self> {
        let backend = HttpBackend::new(config)?;
        let storage = FileStore::new(&config.storage_dir);
        info!(api_url = %config.api_url, storage = %config.storage_dir.display(), "marketplace ready");
        Ok(Self::with_backend(Arc::new(backend), Arc::new(storage)))
    }

    /// Marketplace over an arbitrary transport and storage.
    pub fn with_backend(backend: Arc<dyn Backend>, storage: Arc<dyn KeyValueStore>) -> Self {
        let events = EventBus::default();
        let api = ApiClient::new(backend);
        let session = SessionStore::new(api.clone(), storage, events.clone());
        let gate = SessionGate::new(session.clone());
        let dispatcher = Dispatcher::new(gate.clone(), events.clone());
        Self {
            api,
            session,
            gate,
            dispatcher,
            events,
            storehouses: Store::new(StoreKind::Storehouse),
            products: Store::new(StoreKind::Product),
            inquiries: Store::new(StoreKind::Inquiry),
        }
    }

    /// Session store.
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Access checks against the live session.
    pub fn gate(&self) -> &SessionGate {
        &self.gate
    }

    /// Bus carrying session and store events.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Storehouses of the signed-in owner.
    pub fn storehouses(&self) -> &Store<StorehouseState> {
        &self.storehouses
    }

    /// Scoped and cross-cutting product lists.
    pub fn products(&self) -> &Store<ProductState> {
        &self.products
    }

    /// Inquiries sent this session.
    pub fn inquiries(&self) -> &Store<InquiryState> {
        &self.inquiries
    }

    /// Current session, if any.
    pub fn current_session(&self) -> Option<Arc<AuthSession>> {
        self.session.current()
    }

    /// Check access for a view; `None` admits any signed-in role.
    pub fn authorize(&self, required: Option<Role>) -> Access {
        self.gate.authorize(required)
    }

    /// Log in as `role`.
    pub async fn login(
        &self,
        role: Role,
        credentials: &Credentials,
    ) -> Result<Arc<AuthSession>, AuthError> {
        let result = self.session.authenticate(role, credentials).await;
        // A remote rejection leaves any previous session alone; otherwise the
        // account changed or ended, and its data must not carry over.
        if !matches!(result, Err(AuthError::Remote(_))) {
            self.reset_stores();
        }
        result
    }

    /// Create an account; the caller logs in separately.
    pub async fn register(
        &self,
        role: Role,
        credentials: &Credentials,
    ) -> Result<Identity, RegistrationError> {
        self.session.register(role, credentials).await
    }

    /// End the session and forget every fetched collection.
    pub fn logout(&self) -> bool {
        let ended = self.session.logout();
        self.reset_stores();
        ended
    }

    /// Pick up a session persisted by an earlier run.
    pub fn restore(&self) -> Option<Arc<AuthSession>> {
        self.session.restore()
    }

    /// Re-read the persisted session after another process changed it.
    ///
    /// An adopted or ended session resets every domain store.
    pub fn reload(&self) -> Reloaded {
        let outcome = self.session.reload();
        if outcome != Reloaded::Unchanged {
            self.reset_stores();
        }
        outcome
    }

    /// Keep this marketplace in step with session files under `root`.
    pub fn watch_session(&self, root: impl AsRef<Path>) -> Result<SessionWatcher> {
        let market = self.clone();
        SessionWatcher::spawn(root, move || {
            market.reload();
        })
    }

    fn reset_stores(&self) {
        self.storehouses.reset();
        self.products.reset();
        self.inquiries.reset();
    }
}

#[cfg(test)]
mod tests {
    use std::{net::TcpListener, thread, time::Duration};

    use super::*;
    use crate::{
        api::Method,
        error::CommandError,
        session::{MemoryStore, TOKEN_KEY, USER_KEY},
        store::LifecycleState,
        testing::{login_json, product_json, seed_session, storehouse_json, FakeBackend},
    };
    use serde_json::json;

    fn storehouse_names(market: &Marketplace) -> Vec<String> {
        market.storehouses().read(|state| {
            state
                .storehouses
                .iter()
                .map(|storehouse| storehouse.name.clone())
                .collect()
        })
    }

    #[tokio::test]
    async fn logout_forgets_fetched_collections() -> anyhow::Result<()> {
        let backend = FakeBackend::new();
        backend.respond(Method::Post, "/buyers/login", 200, login_json(2, "buyer", "tok-2"));
        backend.respond(Method::Get, "/products", 200, json!([product_json(1, "Rice")]));
        let market = Marketplace::with_backend(backend, Arc::new(MemoryStore::new()));

        market
            .login(Role::Buyer, &Credentials::new("buyer2@farm.test", "pw"))
            .await?;
        market.fetch_all_products().await?;
        assert_eq!(market.products().read(|state| state.all_products.len()), 1);

        assert!(market.logout());
        assert!(market.products().snapshot().all_products.is_empty());
        assert!(market.current_session().is_none());
        assert_eq!(
            market.authorize(Some(Role::Buyer)).redirect_path(),
            Some("/login")
        );
        Ok(())
    }

    #[tokio::test]
    async fn late_response_from_previous_account_is_dropped() -> anyhow::Result<()> {
        let backend = FakeBackend::new();
        backend.respond(Method::Post, "/owners/login", 200, login_json(1, "owner", "tok-1"));
        backend.respond(
            Method::Get,
            "/owners/1/storehouses",
            200,
            json!([storehouse_json(1, "A-own")]),
        );
        let released = backend.hold(Method::Get, "/owners/1/storehouses");
        let market = Marketplace::with_backend(backend.clone(), Arc::new(MemoryStore::new()));
        market
            .login(Role::Owner, &Credentials::new("owner1@farm.test", "pw"))
            .await?;

        let first = market.clone();
        let held = tokio::spawn(async move { first.fetch_storehouses().await });
        while backend.requests_to("/owners/1/storehouses") == 0 {
            tokio::task::yield_now().await;
        }

        market.logout();
        backend.respond(Method::Post, "/owners/login", 200, login_json(2, "owner", "tok-2"));
        backend.respond(
            Method::Get,
            "/owners/2/storehouses",
            200,
            json!([storehouse_json(5, "B-own")]),
        );
        market
            .login(Role::Owner, &Credentials::new("owner2@farm.test", "pw"))
            .await?;
        market.fetch_storehouses().await?;
        assert_eq!(storehouse_names(&market), vec!["B-own"]);

        released.notify_one();
        held.await??;
        assert_eq!(storehouse_names(&market), vec!["B-own"]);
        assert_eq!(market.storehouses().lifecycle(), LifecycleState::Succeeded);
        Ok(())
    }

    #[tokio::test]
    async fn reload_into_another_account_clears_fetched_collections() -> anyhow::Result<()> {
        let backend = FakeBackend::new();
        backend.respond(Method::Post, "/owners/login", 200, login_json(1, "owner", "tok-1"));
        backend.respond(
            Method::Get,
            "/owners/1/storehouses",
            200,
            json!([storehouse_json(1, "Nashik Cold Store")]),
        );
        let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let market = Marketplace::with_backend(backend, storage.clone());
        market
            .login(Role::Owner, &Credentials::new("owner1@farm.test", "pw"))
            .await?;
        market.fetch_storehouses().await?;
        assert_eq!(storehouse_names(&market).len(), 1);

        let other = login_json(2, "owner", "tok-2");
        storage.set(USER_KEY, &other["user"].to_string())?;
        storage.set(TOKEN_KEY, "tok-2")?;

        assert!(matches!(market.reload(), Reloaded::Adopted(_)));
        assert!(storehouse_names(&market).is_empty());
        assert_eq!(market.storehouses().lifecycle(), LifecycleState::Idle);
        assert_eq!(market.current_session().map(|s| s.identity().id), Some(2));
        Ok(())
    }

    #[tokio::test]
    async fn reload_after_session_removed_elsewhere_clears_collections() -> anyhow::Result<()> {
        let backend = FakeBackend::new();
        backend.respond(Method::Post, "/buyers/login", 200, login_json(2, "buyer", "tok-2"));
        backend.respond(Method::Get, "/products", 200, json!([product_json(1, "Rice")]));
        let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let market = Marketplace::with_backend(backend, storage.clone());
        market
            .login(Role::Buyer, &Credentials::new("buyer2@farm.test", "pw"))
            .await?;
        market.fetch_all_products().await?;

        storage.remove(USER_KEY)?;
        storage.remove(TOKEN_KEY)?;

        assert_eq!(market.reload(), Reloaded::Ended);
        assert!(market.products().snapshot().all_products.is_empty());
        assert!(market.current_session().is_none());
        Ok(())
    }

    #[tokio::test]
    async fn rejected_login_keeps_current_collections() -> anyhow::Result<()> {
        let backend = FakeBackend::new();
        backend.respond(Method::Post, "/buyers/login", 200, login_json(2, "buyer", "tok-2"));
        backend.respond(Method::Get, "/products", 200, json!([product_json(1, "Rice")]));
        let market = Marketplace::with_backend(backend.clone(), Arc::new(MemoryStore::new()));
        market
            .login(Role::Buyer, &Credentials::new("buyer2@farm.test", "pw"))
            .await?;
        market.fetch_all_products().await?;

        backend.respond(
            Method::Post,
            "/buyers/login",
            401,
            json!({"detail": "Invalid credentials"}),
        );
        let err = market
            .login(Role::Buyer, &Credentials::new("buyer2@farm.test", "wrong"))
            .await;
        assert!(matches!(err, Err(AuthError::Remote(_))));
        assert_eq!(market.products().read(|state| state.all_products.len()), 1);
        assert_eq!(market.current_session().map(|s| s.identity().id), Some(2));
        Ok(())
    }

    #[tokio::test]
    async fn hung_request_times_out_as_network_failure() -> anyhow::Result<()> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let addr = listener.local_addr()?;
        thread::spawn(move || {
            let _held = listener.accept();
            thread::sleep(Duration::from_secs(5));
        });
        let dir = tempfile::tempdir()?;
        let market = Marketplace::new(&AppConfig {
            api_url: format!("http://{addr}"),
            storage_dir: dir.path().to_path_buf(),
            request_timeout_secs: 1,
        })?;
        seed_session(market.session(), Role::Buyer);

        let err = market.fetch_all_products().await;
        assert!(matches!(err, Err(CommandError::NetworkFailure { .. })));
        assert_eq!(
            market.products().lifecycle(),
            LifecycleState::Failed("Network error, please check your connection".to_string())
        );
        assert!(!market.products().loading());
        Ok(())
    }
}
