//! Error types for the host lifecycle and its ports.
//!
//! [`ExtensionError`] is what an extension hook may return. [`HostError`]
//! wraps it with the name of the failing extension so integration bugs point
//! at the right plugin. [`TransportError`] is the failure type of the
//! [`crate::Transport`] port.

use thiserror::Error;

use crate::{EventName, ExtensionName};

// ---------------------------------------------------------------------------
// Extension-level errors
// ---------------------------------------------------------------------------

/// Errors an extension hook can report back to the host.
#[derive(Debug, Error)]
pub enum ExtensionError {
    /// A configuration event arrived without the header mapping the hook
    /// needs to mutate.
    ///
    /// This is a host contract violation and is never silently ignored.
    #[error("Event '{event}' carried no header mapping")]
    MissingHeaders {
        /// The event that was missing its headers.
        event: EventName,
    },

    /// The request body could not be serialised.
    #[error("Failed to encode request parameters: {0}")]
    Encoding(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Transport-level errors
// ---------------------------------------------------------------------------

/// Errors produced by a [`crate::Transport`] implementation.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The prepared request could not be turned into a wire request.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Description of what was wrong with the request.
        message: String,
    },

    /// The request did not complete within the transport's deadline.
    #[error("Request timed out")]
    Timeout,

    /// Connection or protocol failure while sending or receiving.
    #[error("Transport failure: {message}")]
    Io {
        /// Description of the underlying failure.
        message: String,
    },
}

// ---------------------------------------------------------------------------
// Host-level errors
// ---------------------------------------------------------------------------

/// Errors that abort a request in the host lifecycle.
#[derive(Debug, Error)]
pub enum HostError {
    /// An extension hook failed.
    #[error("Extension '{extension}' failed: {source}")]
    Extension {
        /// Registered name of the failing extension.
        extension: ExtensionName,
        /// What the extension reported.
        #[source]
        source: ExtensionError,
    },

    /// The base URL and path did not form a valid URL.
    #[error("Invalid request URL '{url}': {source}")]
    InvalidUrl {
        /// The URL text that failed to parse.
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The transport failed to deliver the request.
    #[error(transparent)]
    Transport(#[from] TransportError),
}
