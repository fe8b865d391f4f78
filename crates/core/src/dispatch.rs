//! The single path every remote domain command takes.
//!
//! A command runs in three phases against its owning [`Store`]:
//!
//! 1. **begin**: the store goes `pending` and forgets its last error;
//! 2. **execute**: the [`SessionGate`] admits the command (no session means
//!    no network call at all), then exactly one REST call is made;
//! 3. **settle**: success merges the payload, failure records the message.
//!
//! Each invocation settles exactly once and publishes matching
//! [`StoreEvent`]s; failures come back as values, never as panics.

use std::{future::Future, sync::Arc};

use tracing::debug;

use crate::{
    error::CommandError,
    events::{AppEvent, EventBus, Phase, StoreEvent},
    models::Role,
    session::{AuthSession, SessionGate},
    store::{CommandKind, Store, StoreKind},
};

/// What is being run and who may run it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    /// Command shape; decides the merge and notification rules.
    pub kind: CommandKind,
    /// Role the session must hold; `None` admits any signed-in user.
    pub role: Option<Role>,
}

impl Command {
    /// Command open to any signed-in role.
    pub fn any(kind: CommandKind) -> Self {
        Self { kind, role: None }
    }

    /// Command restricted to `role`.
    pub fn for_role(kind: CommandKind, role: Role) -> Self {
        Self {
            kind,
            role: Some(role),
        }
    }
}

/// Runs commands through begin/execute/settle.
#[derive(Clone)]
pub struct Dispatcher {
    gate: SessionGate,
    events: EventBus,
}

impl Dispatcher {
    /// Dispatcher admitting commands through `gate` and publishing on `events`.
    pub fn new(gate: SessionGate, events: EventBus) -> Self {
        Self { gate, events }
    }

    /// Run one command.
    ///
    /// `execute` receives the admitted session and performs the REST call;
    /// `merge` folds a successful payload into the store's data.
    pub async fn dispatch<S, T, F, Fut>(
        &self,
        store: &Store<S>,
        command: Command,
        execute: F,
        merge: impl FnOnce(&mut S, &T),
    ) -> Result<T, CommandError>
    where
        F: FnOnce(Arc<AuthSession>) -> Fut,
        Fut: Future<Output = Result<T, CommandError>>,
    {
        let kind = store.kind();
        let ticket = store.begin();
        debug!(store = %kind, command = %command.kind, "command began");
        self.publish(kind, command.kind, Phase::Began);

        let outcome = match self.gate.admit(command.role) {
            Ok(session) => execute(session).await,
            Err(err) => Err(err),
        };

        match outcome {
            Ok(value) => {
                let settlement =
                    store.settle_success(ticket, command.kind, |state| merge(state, &value));
                debug!(store = %kind, command = %command.kind, ?settlement, "command succeeded");
                self.publish(kind, command.kind, Phase::Succeeded);
                Ok(value)
            }
            Err(err) => {
                let message = err.to_string();
                let settlement = store.settle_failure(ticket, &message);
                debug!(store = %kind, command = %command.kind, ?settlement, %message, "command failed");
                self.publish(kind, command.kind, Phase::Failed(message));
                Err(err)
            }
        }
    }

    fn publish(&self, store: StoreKind, command: CommandKind, phase: Phase) {
        self.events.publish(AppEvent::Store(StoreEvent {
            store,
            command,
            phase,
        }));
    }
}
