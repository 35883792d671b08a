//! Host framework domain for hxenc.
//!
//! This crate defines the extension contract, the named extension registry,
//! and the request lifecycle that dispatches events to extensions and asks
//! them to encode request bodies. Extensions implement the traits defined
//! here; transports implement [`Transport`].
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no network
//! dependencies. It defines *what* a request looks like; infrastructure
//! crates define *how* it is sent.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtypes (`ExtensionName`, `EventName`, `MimeType`, `RequestId`) and event constants |
//! | [`types`] | Value types (`Parameters`, `Headers`, `HttpVerb`, `EventDetail`) |
//! | [`extension`] | `Extension` and `TransportHandle` traits |
//! | [`registry`] | `ExtensionRegistry` |
//! | [`transport`] | `Transport` port and request/response types |
//! | [`lifecycle`] | `Host`: event dispatch and request assembly |
//! | [`errors`] | Error types |

pub mod errors;
pub mod extension;
pub mod identifiers;
pub mod lifecycle;
pub mod registry;
pub mod transport;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use errors::{ExtensionError, HostError, TransportError};
pub use extension::{Extension, RequestHandle, TransportHandle};
pub use identifiers::{events, EventName, ExtensionName, MimeType, RequestId};
pub use lifecycle::{Host, HostConfig, HostResponse, OutgoingRequest, FORM_URLENCODED};
pub use registry::ExtensionRegistry;
pub use transport::{PreparedRequest, ResponseBody, Transport, TransportResponse};
pub use types::{EventDetail, Headers, HttpVerb, Parameters, ParseVerbError, SourceElement};
