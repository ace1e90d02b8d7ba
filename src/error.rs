//! Error types.
//!
//! Two distinct failure worlds, kept apart on purpose:
//!
//! - [`Error`] — infrastructure failures (binding a port, accepting a
//!   connection). Surfaces from [`Server::serve`](crate::Server::serve).
//! - [`RouteError`] — the in-flight dispatch error. Once a layer fails, a
//!   `RouteError` travels forward through the stack until an error layer
//!   consumes it or the stack is exhausted.

use std::fmt;

/// The error type returned by trellis's fallible infrastructure operations.
///
/// Application-level failures never become an `Error` — they travel through
/// dispatch as [`RouteError`] values and end up as HTTP responses.
#[derive(Debug)]
pub struct Error(std::io::Error);

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "io: {}", self.0)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self(e)
    }
}

// ── RouteError ───────────────────────────────────────────────────────────────

/// An error traveling through a dispatch in progress.
///
/// Carries a name (`"Error"` for application failures, `"URIError"` for
/// parameter decode failures), a message, and an optional HTTP status the
/// terminal responder should use instead of 500.
///
/// `Display` renders `"Name: message"`, which is also what the default
/// terminal responder writes as the response body.
#[derive(Clone, Debug)]
pub struct RouteError {
    name: &'static str,
    message: String,
    status: Option<u16>,
}

impl RouteError {
    /// An application error: name `"Error"`, no status override.
    pub fn new(message: impl Into<String>) -> Self {
        Self { name: "Error", message: message.into(), status: None }
    }

    /// An application error that requests a specific response status.
    pub fn with_status(message: impl Into<String>, status: u16) -> Self {
        Self { name: "Error", message: message.into(), status: Some(status) }
    }

    /// A parameter decode failure: name `"URIError"`, status 400.
    pub(crate) fn decode(raw: &str) -> Self {
        Self {
            name: "URIError",
            message: format!("Failed to decode param '{raw}'"),
            status: Some(400),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The response status this error asks for, if any. The terminal
    /// responder falls back to 500 when absent.
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Replaces an empty message with the synthesized default, so error
    /// layers always receive a non-empty cause. An async failure that
    /// carries no message of its own reads `"Rejected promise"` downstream.
    pub(crate) fn normalized(mut self) -> Self {
        if self.message.is_empty() {
            self.message = "Rejected promise".to_owned();
        }
        self
    }
}

/// A cause-less failure. Dispatch normalizes it to `"Rejected promise"`
/// before any error layer sees it.
impl Default for RouteError {
    fn default() -> Self {
        Self { name: "Error", message: String::new(), status: None }
    }
}

impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.message)
    }
}

impl std::error::Error for RouteError {}
