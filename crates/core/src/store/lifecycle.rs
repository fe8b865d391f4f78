//! Request lifecycle attached to every store.

use std::fmt;

/// Observable request state of a store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LifecycleState {
    /// Nothing in flight, no error recorded.
    #[default]
    Idle,
    /// A command is in flight.
    Pending,
    /// The latest command completed.
    Succeeded,
    /// The latest command failed with this message.
    Failed(String),
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleState::Idle => f.write_str("idle"),
            LifecycleState::Pending => f.write_str("pending"),
            LifecycleState::Succeeded => f.write_str("succeeded"),
            LifecycleState::Failed(message) => write!(f, "failed: {message}"),
        }
    }
}

/// Handle identifying one command invocation on a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

/// `idle -> pending -> {succeeded, failed}` with a generation fence.
///
/// Every [`begin`](Lifecycle::begin) hands out a fresh [`Ticket`]; only the
/// newest ticket may settle the observable state. Generations keep counting
/// across [`reset`](Lifecycle::reset), and tickets issued before the last
/// reset never settle anything.
#[derive(Debug, Clone, Default)]
pub struct Lifecycle {
    state: LifecycleState,
    generation: u64,
    reset_at: u64,
}

impl Lifecycle {
    /// Current state.
    pub fn state(&self) -> &LifecycleState {
        &self.state
    }

    /// `true` while a command is pending.
    pub fn loading(&self) -> bool {
        self.state == LifecycleState::Pending
    }

    /// Message of the last failure, kept until the next command begins.
    pub fn error(&self) -> Option<&str> {
        match &self.state {
            LifecycleState::Failed(message) => Some(message),
            _ => None,
        }
    }

    /// Start a command: back to idle, then pending with the prior error cleared.
    pub fn begin(&mut self) -> Ticket {
        self.state = LifecycleState::Idle;
        self.generation += 1;
        self.state = LifecycleState::Pending;
        Ticket(self.generation)
    }

    /// Whether `ticket` belongs to the most recent command.
    pub fn is_current(&self, ticket: Ticket) -> bool {
        ticket.0 == self.generation && !self.predates_reset(ticket)
    }

    /// Whether `ticket` was issued before the last [`reset`](Self::reset).
    pub fn predates_reset(&self, ticket: Ticket) -> bool {
        ticket.0 <= self.reset_at
    }

    /// Back to idle, orphaning every ticket handed out so far.
    pub fn reset(&mut self) {
        self.state = LifecycleState::Idle;
        self.reset_at = self.generation;
    }

    /// Settle as succeeded; ignored for a superseded ticket.
    pub fn succeed(&mut self, ticket: Ticket) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.state = LifecycleState::Succeeded;
        true
    }

    /// Settle as failed; ignored for a superseded ticket.
    pub fn fail(&mut self, ticket: Ticket, message: impl Into<String>) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.state = LifecycleState::Failed(message.into());
        true
    }

    /// Drop a recorded failure without starting a command.
    pub fn clear_error(&mut self) {
        if matches!(self.state, LifecycleState::Failed(_)) {
            self.state = LifecycleState::Idle;
        }
    }
}
