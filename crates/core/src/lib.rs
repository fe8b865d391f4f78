#![warn(clippy::all, missing_docs)]

//! Core of the SamanSetu marketplace client.
//!
//! This crate hosts the session store and role gate, the domain stores for
//! storehouses, products and inquiries, the command dispatcher that drives
//! every REST call through them, and the cross-domain search used by the
//! terminal front-end and any future ones.

pub mod api;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod market;
pub mod models;
pub mod navigation;
pub mod search;
pub mod session;
pub mod store;

#[cfg(test)]
mod testing;

pub use api::{ApiClient, Backend, HttpBackend};
pub use config::AppConfig;
pub use error::{AuthError, CommandError, RegistrationError, SearchError};
pub use events::{AppEvent, EventBus, NotificationRelay, Notifier, Severity};
pub use market::Marketplace;
pub use models::{
    Credentials, EntityId, Identity, Inquiry, NewInquiry, NewProduct, NewStorehouse, Product,
    ProductPatch, Role, Storehouse,
};
pub use search::{SearchAggregator, SearchOutcome, SearchResult};
pub use session::{Access, AuthSession, DenyReason, SessionGate, SessionStore, SessionWatcher};
