//! Events published by the session and domain stores, and the relay that
//! turns them into user notifications.
//!
//! State transitions never notify anyone directly. They publish an
//! [`AppEvent`] on the [`EventBus`]; a [`NotificationRelay`] subscribed to the
//! bus decides which events deserve a toast and forwards them to the
//! front-end's [`Notifier`].

use std::sync::Arc;

use tokio::{
    sync::broadcast::{self, error::RecvError},
    task::JoinHandle,
};
use tracing::{debug, warn};

use crate::{
    models::{Identity, Role},
    store::{CommandKind, StoreKind},
};

const DEFAULT_CAPACITY: usize = 64;

/// Everything observable that the core emits.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// Session lifecycle change.
    Session(SessionEvent),
    /// Domain command phase change.
    Store(StoreEvent),
}

/// Session-level transitions.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Login succeeded and the session was persisted.
    LoggedIn(Identity),
    /// Login failed.
    LoginFailed(String),
    /// Signup succeeded; the account still has to log in.
    Registered(Role),
    /// Signup failed.
    RegistrationFailed(String),
    /// Explicit logout cleared the session.
    LoggedOut,
    /// The persisted session disappeared underneath us (another process logged out).
    Expired,
    /// Another process stored a different session, which is now current.
    Adopted(Identity),
}

/// Phase of one dispatched command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    /// The store went `pending`.
    Began,
    /// The store settled `succeeded`.
    Succeeded,
    /// The store settled `failed`.
    Failed(String),
}

/// A phase transition of a command on one domain store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEvent {
    /// Store that owns the command.
    pub store: StoreKind,
    /// Which command ran.
    pub command: CommandKind,
    /// What happened.
    pub phase: Phase,
}

/// Broadcast channel shared by every publisher in a client.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<AppEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventBus {
    /// Bus buffering up to `capacity` events per lagging subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event; having no subscribers is fine.
    pub fn publish(&self, event: AppEvent) {
        let _ = self.sender.send(event);
    }

    /// New receiver seeing every event published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.sender.subscribe()
    }
}

/// Notification severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Completed user action.
    Success,
    /// Neutral information.
    Info,
    /// Failed action.
    Error,
}

/// External toast/notification display.
pub trait Notifier: Send + Sync {
    /// Show one message.
    fn notify(&self, severity: Severity, message: &str);
}

/// Decide which notification, if any, an event produces.
pub fn notification_for(event: &AppEvent) -> Option<(Severity, String)> {
    match event {
        AppEvent::Session(session) => match session {
            SessionEvent::LoggedIn(_) => Some((Severity::Success, "Login successful!".to_string())),
            SessionEvent::LoginFailed(message) | SessionEvent::RegistrationFailed(message) => {
                Some((Severity::Error, message.clone()))
            }
            SessionEvent::Registered(role) => Some((
                Severity::Success,
                format!("{} account created successfully! Please login.", role.label()),
            )),
            SessionEvent::LoggedOut => {
                Some((Severity::Success, "Logged out successfully".to_string()))
            }
            SessionEvent::Expired => Some((
                Severity::Info,
                "Your session ended, please login again".to_string(),
            )),
            SessionEvent::Adopted(identity) => Some((
                Severity::Info,
                format!("Now signed in as {}", identity.email),
            )),
        },
        AppEvent::Store(StoreEvent { store, command, phase }) => match phase {
            Phase::Began => None,
            Phase::Succeeded => {
                success_message(*store, *command).map(|message| (Severity::Success, message))
            }
            Phase::Failed(message) => Some((Severity::Error, message.clone())),
        },
    }
}

fn success_message(store: StoreKind, command: CommandKind) -> Option<String> {
    let noun = store.noun();
    let message = match (store, command) {
        (_, CommandKind::FetchAll | CommandKind::FetchByParent) => return None,
        (StoreKind::Inquiry, CommandKind::Create) => "Inquiry sent successfully!".to_string(),
        (_, CommandKind::Create) => format!("{} created successfully!", capitalise(noun)),
        (_, CommandKind::Update) => format!("{} updated successfully!", capitalise(noun)),
        (_, CommandKind::Delete) => format!("{} deleted successfully!", capitalise(noun)),
        (_, CommandKind::Search) => format!("{} search complete", capitalise(noun)),
    };
    Some(message)
}

fn capitalise(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Listener forwarding bus events to a [`Notifier`].
pub struct NotificationRelay;

impl NotificationRelay {
    /// Spawn the relay; it stops when every publisher has been dropped.
    pub fn spawn(
        mut receiver: broadcast::Receiver<AppEvent>,
        notifier: Arc<dyn Notifier>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => {
                        if let Some((severity, message)) = notification_for(&event) {
                            notifier.notify(severity, &message);
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "notification relay fell behind; events dropped");
                    }
                    Err(RecvError::Closed) => {
                        debug!("event bus closed; notification relay exiting");
                        break;
                    }
                }
            }
        })
    }
}
