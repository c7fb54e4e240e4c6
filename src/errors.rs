//! Typed error hierarchy for quadrant.
//!
//! - `StoreError`: task store reads, writes and subscriptions
//! - `AuthError`: identity provider and persisted session failures
//! - `BoardError`: view-model operations invoked by the user
//! - `InputError`: lines typed into the interactive board that do not parse

use thiserror::Error;

/// Errors from the task store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("No signed-in owner for this operation")]
    MissingOwner,

    #[error("Task text must not be empty")]
    EmptyText,

    #[error("Task {id} not found")]
    TaskNotFound { id: String },

    #[error("Database error: {0}")]
    Database(#[source] anyhow::Error),

    #[error("Subscription closed")]
    SubscriptionClosed,
}

/// Errors from signing in, signing out, or restoring a session.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Sign-in is not configured: {0}")]
    NotConfigured(String),

    #[error("Sign-in was denied: {0}")]
    Denied(String),

    #[error("Sign-in code expired before it was approved")]
    Expired,

    #[error("Identity provider error: {0}")]
    Provider(String),

    #[error("HTTP error talking to identity provider: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Session file error: {0}")]
    Session(#[source] anyhow::Error),
}

/// Errors from board operations.
#[derive(Debug, Error)]
pub enum BoardError {
    #[error("Not signed in")]
    NotSignedIn,

    #[error("No task matches '{0}'")]
    UnknownTask(String),

    #[error("Task reference '{0}' is ambiguous")]
    AmbiguousTask(String),

    #[error("Task '{0}' is completed; uncheck it first")]
    TaskCompleted(String),

    #[error("Another task is already being dragged")]
    DragInProgress,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors from parsing a typed board command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("Unknown command '{0}'; type `help` for the list")]
    UnknownCommand(String),

    #[error("`{command}` needs {argument}")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },

    #[error(transparent)]
    Category(#[from] quadrant_common::UnknownCategory),
}
