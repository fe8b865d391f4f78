//! Error types surfaced by session and domain commands.

use crate::models::Role;

/// Failure of a single remote command, as recorded in the owning store.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandError {
    /// No session token; the call was refused before reaching the network.
    #[error("No authentication")]
    Unauthenticated,

    /// A session exists but its role may not run the command.
    #[error("Not authorized: requires {required} role, signed in as {actual}")]
    AuthorizationDenied {
        /// Role the command needs.
        required: Role,
        /// Role of the current session.
        actual: Role,
    },

    /// The backend answered with a non-2xx status.
    #[error("{message}")]
    RemoteRejected {
        /// HTTP status code.
        status: u16,
        /// Server-provided detail, or a generic status line.
        message: String,
    },

    /// No response arrived (connection refused, timeout, TLS failure...).
    #[error("Network error, please check your connection")]
    NetworkFailure {
        /// Transport-level detail kept for logs.
        detail: String,
    },

    /// A 2xx response whose body did not match the expected shape.
    #[error("Unexpected response from server: {0}")]
    MalformedResponse(String),

    /// Rejected locally before any request was made.
    #[error("{0}")]
    InvalidRequest(String),
}

impl CommandError {
    /// Whether the caller should send the user back to the login view.
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            CommandError::Unauthenticated | CommandError::RemoteRejected { status: 401, .. }
        )
    }
}

/// Login failure.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The backend refused the credentials or could not be reached.
    #[error(transparent)]
    Remote(#[from] CommandError),

    /// The session could not be written to durable storage.
    #[error("failed to persist session: {0}")]
    Storage(#[source] anyhow::Error),
}

/// Signup failure.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct RegistrationError(#[from] pub CommandError);

/// Reasons a search is not run at all.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SearchError {
    /// Blank query; callers show their default view instead.
    #[error("search query is empty")]
    EmptyQuery,

    /// No session to search with.
    #[error("No authentication")]
    Unauthenticated,

    /// The requested role is not the signed-in one.
    #[error("Not authorized: cannot search as {requested} while signed in as {actual}")]
    WrongRole {
        /// Role the caller asked to search as.
        requested: Role,
        /// Role of the current session.
        actual: Role,
    },
}
