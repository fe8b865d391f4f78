//! Domain stores: one entity collection plus a request lifecycle each.

/// Inquiry collection.
pub mod inquiry;
/// Request lifecycle state machine.
pub mod lifecycle;
/// Pure merge helpers.
pub mod merge;
/// Product collections.
pub mod product;
/// Storehouse collection.
pub mod storehouse;

use std::{fmt, sync::Arc};

use parking_lot::RwLock;
use tracing::debug;

pub use inquiry::InquiryState;
pub use lifecycle::{Lifecycle, LifecycleState, Ticket};
pub use merge::MergeOutcome;
pub use product::ProductState;
pub use storehouse::StorehouseState;

/// Which domain a store (or event) belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKind {
    /// Storehouses of the signed-in owner.
    Storehouse,
    /// Products, scoped and cross-cutting.
    Product,
    /// Inquiries sent by the signed-in buyer.
    Inquiry,
}

impl StoreKind {
    /// Lowercase noun for messages.
    pub fn noun(self) -> &'static str {
        match self {
            StoreKind::Storehouse => "storehouse",
            StoreKind::Product => "product",
            StoreKind::Inquiry => "inquiry",
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.noun())
    }
}

/// The command shapes every store understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// Load the whole collection.
    FetchAll,
    /// Load the collection for one parent (products of a storehouse).
    FetchByParent,
    /// Create one entity.
    Create,
    /// Update one entity.
    Update,
    /// Delete one entity.
    Delete,
    /// Run a text search.
    Search,
}

impl CommandKind {
    /// Whether a successful result replaces the collection wholesale.
    pub fn replaces_collection(self) -> bool {
        matches!(
            self,
            CommandKind::FetchAll | CommandKind::FetchByParent | CommandKind::Search
        )
    }

    /// Short verb for logs.
    pub fn verb(self) -> &'static str {
        match self {
            CommandKind::FetchAll => "fetch-all",
            CommandKind::FetchByParent => "fetch-by-parent",
            CommandKind::Create => "create",
            CommandKind::Update => "update",
            CommandKind::Delete => "delete",
            CommandKind::Search => "search",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}

/// How a settlement was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// The settling command was the newest one; flags were updated.
    Current,
    /// A newer command had already begun; flags were left alone.
    Stale,
    /// The command began before the store was reset; nothing was applied.
    Orphaned,
}

/// Thread-safe container pairing a lifecycle with domain data `S`.
pub struct Store<S> {
    kind: StoreKind,
    inner: Arc<RwLock<Inner<S>>>,
}

struct Inner<S> {
    lifecycle: Lifecycle,
    data: S,
}

impl<S> Clone for Store<S> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: Default> Store<S> {
    /// Empty, idle store.
    pub fn new(kind: StoreKind) -> Self {
        Self {
            kind,
            inner: Arc::new(RwLock::new(Inner {
                lifecycle: Lifecycle::default(),
                data: S::default(),
            })),
        }
    }
}

impl<S> Store<S> {
    /// Domain of this store.
    pub fn kind(&self) -> StoreKind {
        self.kind
    }

    /// `true` while a command is pending.
    pub fn loading(&self) -> bool {
        self.inner.read().lifecycle.loading()
    }

    /// Last failure message, if the latest command failed.
    pub fn error(&self) -> Option<String> {
        self.inner.read().lifecycle.error().map(str::to_string)
    }

    /// Copy of the lifecycle state.
    pub fn lifecycle(&self) -> LifecycleState {
        self.inner.read().lifecycle.state().clone()
    }

    /// Forget a recorded failure.
    pub fn clear_error(&self) {
        self.inner.write().lifecycle.clear_error();
    }

    /// Read the domain data under the lock.
    pub fn read<R>(&self, reader: impl FnOnce(&S) -> R) -> R {
        reader(&self.inner.read().data)
    }

    /// Clone of the domain data.
    pub fn snapshot(&self) -> S
    where
        S: Clone,
    {
        self.inner.read().data.clone()
    }

    /// Drop all data and return to idle, e.g. after logout.
    ///
    /// Commands still in flight settle as [`Settlement::Orphaned`].
    pub fn reset(&self)
    where
        S: Default,
    {
        let mut inner = self.inner.write();
        inner.lifecycle.reset();
        inner.data = S::default();
    }

    pub(crate) fn begin(&self) -> Ticket {
        self.inner.write().lifecycle.begin()
    }

    /// Settle a success and merge its payload.
    ///
    /// A superseded replacing command (fetch/search) is dropped entirely so an
    /// older response cannot overwrite a newer one; superseded incremental
    /// commands still merge because the server has already applied them.
    /// Anything begun before the last reset is dropped whatever its kind.
    pub(crate) fn settle_success(
        &self,
        ticket: Ticket,
        command: CommandKind,
        merge: impl FnOnce(&mut S),
    ) -> Settlement {
        let mut inner = self.inner.write();
        if inner.lifecycle.predates_reset(ticket) {
            debug!(store = %self.kind, %command, "discarding response from before reset");
            return Settlement::Orphaned;
        }
        if inner.lifecycle.succeed(ticket) {
            merge(&mut inner.data);
            return Settlement::Current;
        }

        if command.replaces_collection() {
            debug!(store = %self.kind, %command, "discarding superseded response");
        } else {
            debug!(store = %self.kind, %command, "merging superseded response");
            merge(&mut inner.data);
        }
        Settlement::Stale
    }

    pub(crate) fn settle_failure(&self, ticket: Ticket, message: &str) -> Settlement {
        let mut inner = self.inner.write();
        if inner.lifecycle.predates_reset(ticket) {
            debug!(store = %self.kind, %message, "ignoring failure from before reset");
            return Settlement::Orphaned;
        }
        if inner.lifecycle.fail(ticket, message) {
            Settlement::Current
        } else {
            debug!(store = %self.kind, %message, "ignoring superseded failure");
            Settlement::Stale
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_fetch_is_discarded_but_stale_create_merges() {
        let store: Store<Vec<u32>> = Store::new(StoreKind::Storehouse);

        let slow_fetch = store.begin();
        let create = store.begin();
        let newest_fetch = store.begin();

        assert_eq!(
            store.settle_success(newest_fetch, CommandKind::FetchAll, |rows| *rows = vec![1, 2]),
            Settlement::Current
        );
        assert_eq!(
            store.settle_success(create, CommandKind::Create, |rows| rows.push(3)),
            Settlement::Stale
        );
        assert_eq!(
            store.settle_success(slow_fetch, CommandKind::FetchAll, |rows| *rows = vec![9]),
            Settlement::Stale
        );

        assert_eq!(store.snapshot(), vec![1, 2, 3]);
        assert_eq!(store.lifecycle(), LifecycleState::Succeeded);
    }

    #[test]
    fn reset_drops_every_settlement_begun_before_it() {
        let store: Store<Vec<u32>> = Store::new(StoreKind::Storehouse);
        store.settle_success(store.begin(), CommandKind::FetchAll, |rows| *rows = vec![1]);

        let old_fetch = store.begin();
        let old_create = store.begin();
        store.reset();
        let new_fetch = store.begin();

        assert_eq!(
            store.settle_success(new_fetch, CommandKind::FetchAll, |rows| *rows = vec![20]),
            Settlement::Current
        );
        assert_eq!(
            store.settle_success(old_fetch, CommandKind::FetchAll, |rows| *rows = vec![10]),
            Settlement::Orphaned
        );
        assert_eq!(
            store.settle_success(old_create, CommandKind::Create, |rows| rows.push(11)),
            Settlement::Orphaned
        );
        assert_eq!(store.snapshot(), vec![20]);
        assert_eq!(store.lifecycle(), LifecycleState::Succeeded);
    }

    #[test]
    fn settlement_after_reset_without_new_command_stays_idle() {
        let store: Store<Vec<u32>> = Store::new(StoreKind::Product);
        let in_flight = store.begin();
        store.reset();

        assert_eq!(store.settle_failure(in_flight, "late"), Settlement::Orphaned);
        assert_eq!(
            store.settle_success(in_flight, CommandKind::Create, |rows| rows.push(1)),
            Settlement::Orphaned
        );
        assert_eq!(store.lifecycle(), LifecycleState::Idle);
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn stale_failure_keeps_newer_command_pending() {
        let store: Store<Vec<u32>> = Store::new(StoreKind::Product);
        let older = store.begin();
        let _newer = store.begin();

        assert_eq!(store.settle_failure(older, "late"), Settlement::Stale);
        assert!(store.loading());
        assert_eq!(store.error(), None);
    }
}
