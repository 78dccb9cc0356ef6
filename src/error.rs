//! Error types for the synchronization primitives.
//!
//! Each primitive reports its own small error type so callers can match on
//! the exact outcome. Errors that carry a value (`PushError`, `TryPushError`)
//! hand the rejected item back; nothing is silently dropped.
//!
//! [`Error`] is an umbrella type for callers that mix several primitives
//! behind `?`. It keeps the [`ErrorKind`] and the original message.

use std::fmt;

/// Error returned when a semaphore acquisition can no longer complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AcquireError {
    /// The semaphore was aborted while the caller was parked, or before a
    /// caller that would have had to park.
    #[error("semaphore aborted while waiting for a permit")]
    Aborted,
}

/// Error returned by [`BoundedQueue::push`](crate::sync::BoundedQueue::push).
///
/// Both variants are illegal-state errors. The rejected item is returned.
#[derive(PartialEq, Eq, thiserror::Error)]
pub enum PushError<T> {
    /// The queue was already closing or closed when the push started.
    #[error("bounded queue is being closed or has been closed")]
    NotOpen(T),
    /// The queue became closed while the push was waiting for space.
    #[error("bounded queue was closed while waiting to push a new value")]
    ClosedWhileWaiting(T),
}

impl<T> PushError<T> {
    /// Consumes the error, returning the item that could not be pushed.
    pub fn into_inner(self) -> T {
        match self {
            Self::NotOpen(item) | Self::ClosedWhileWaiting(item) => item,
        }
    }
}

// Manual impl so `T` does not need to be `Debug`.
impl<T> fmt::Debug for PushError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotOpen(_) => f.write_str("NotOpen(..)"),
            Self::ClosedWhileWaiting(_) => f.write_str("ClosedWhileWaiting(..)"),
        }
    }
}

/// Error returned by [`BoundedQueue::try_push`](crate::sync::BoundedQueue::try_push).
#[derive(PartialEq, Eq, thiserror::Error)]
pub enum TryPushError<T> {
    /// No room in the buffer; a `push` would have waited.
    #[error("bounded queue is full")]
    Full(T),
    /// The queue is closing or closed.
    #[error("bounded queue is being closed or has been closed")]
    NotOpen(T),
}

impl<T> TryPushError<T> {
    /// Consumes the error, returning the item that could not be pushed.
    pub fn into_inner(self) -> T {
        match self {
            Self::Full(item) | Self::NotOpen(item) => item,
        }
    }
}

impl<T> fmt::Debug for TryPushError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full(_) => f.write_str("Full(..)"),
            Self::NotOpen(_) => f.write_str("NotOpen(..)"),
        }
    }
}

/// Error returned by [`BoundedQueue::try_take`](crate::sync::BoundedQueue::try_take).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TryTakeError {
    /// Nothing buffered; a `take` would have waited.
    #[error("bounded queue is empty")]
    Empty,
    /// The queue is closed and drained (end of stream).
    #[error("bounded queue is closed and drained")]
    Closed,
}

/// Error raised while loading or validating a [`SyncConfig`](crate::config::SyncConfig).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable held an unparseable value.
    #[error("invalid value for {var}: expected {expected}, got {value:?}")]
    InvalidEnv {
        /// Variable name.
        var: &'static str,
        /// What the parser expected.
        expected: &'static str,
        /// The raw value found.
        value: String,
    },
    /// A field failed validation.
    #[error("invalid config: {0}")]
    Invalid(String),
    /// The config file could not be read or parsed.
    #[error("failed to load config file: {0}")]
    File(String),
}

/// Broad classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// An operation was attempted in a lifecycle state that forbids it.
    IllegalState,
    /// A wait was cut short by `Semaphore::abort`.
    Aborted,
    /// Configuration could not be loaded or is invalid.
    Config,
}

impl ErrorKind {
    /// Short lowercase name, used in log fields.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::IllegalState => "illegal_state",
            Self::Aborted => "aborted",
            Self::Config => "config",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Umbrella error for code that composes several primitives.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct Error {
    kind: ErrorKind,
    message: String,
}

impl Error {
    /// Creates an error of the given kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// True for illegal-state errors raised by the queue.
    #[must_use]
    pub fn is_illegal_state(&self) -> bool {
        self.kind == ErrorKind::IllegalState
    }
}

impl From<AcquireError> for Error {
    fn from(e: AcquireError) -> Self {
        Self::new(ErrorKind::Aborted, e.to_string())
    }
}

impl<T> From<PushError<T>> for Error {
    fn from(e: PushError<T>) -> Self {
        Self::new(ErrorKind::IllegalState, e.to_string())
    }
}

impl<T> From<TryPushError<T>> for Error {
    fn from(e: TryPushError<T>) -> Self {
        Self::new(ErrorKind::IllegalState, e.to_string())
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::new(ErrorKind::Config, e.to_string())
    }
}

/// Result alias using the umbrella [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
