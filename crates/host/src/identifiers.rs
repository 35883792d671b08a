//! Newtype identifiers for the host framework.
//!
//! Extension names and event names are both plain strings at the boundary, but
//! mixing them up is always a bug: an event dispatched under an extension name
//! simply never matches. Each gets its own newtype.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, from_static(), as_str(),
// Display, and serde conversions that reject empty strings.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Creates an identifier from a compile-time literal.
            ///
            /// The literal must not be empty; this is checked in debug builds.
            pub fn from_static(value: &'static str) -> Self {
                debug_assert!(!value.is_empty(), "{} must not be empty", stringify!($name));
                Self(value.to_string())
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = String;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value).ok_or_else(|| {
                    format!("{} must not be empty", stringify!($name))
                })
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

string_id! {
    /// Name under which an extension is registered with the host (e.g. `"json-enc"`).
    ///
    /// Elements opt into extensions by listing these names; the registry is
    /// keyed by them.
    ExtensionName
}

string_id! {
    /// Name of a lifecycle event dispatched to extensions.
    ///
    /// Well-known values are listed in [`events`].
    EventName
}

string_id! {
    /// A MIME type string such as `"text/json"`.
    MimeType
}

impl EventName {
    /// Returns `true` if this event carries the given well-known name.
    pub fn is(&self, name: &str) -> bool {
        self.0 == name
    }
}

impl MimeType {
    /// Returns `true` if responses of this type should be decoded as JSON.
    ///
    /// Matches `application/json`, `text/json` and any `+json` structured
    /// syntax suffix, ignoring parameters such as `charset`.
    pub fn is_json(&self) -> bool {
        let essence = self
            .0
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        essence == "application/json" || essence == "text/json" || essence.ends_with("+json")
    }
}

/// Well-known lifecycle event names.
pub mod events {
    /// Fired before an outgoing request is assembled; the detail carries the
    /// mutable header mapping.
    pub const CONFIG_REQUEST: &str = "htmx:configRequest";

    /// Fired once the request is fully assembled, right before it is sent.
    pub const BEFORE_REQUEST: &str = "htmx:beforeRequest";

    /// Fired after the transport returned (successfully or not).
    pub const AFTER_REQUEST: &str = "htmx:afterRequest";
}

/// Identifies a single issued request.
///
/// Generated fresh for every request; propagated through spans so all hook
/// activity for one request can be correlated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Generates a new random request identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a [`RequestId`] from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Returns the underlying [`Uuid`].
    pub fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
