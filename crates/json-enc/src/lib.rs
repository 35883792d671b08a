//! The `json-enc` extension.
//!
//! Sends request parameters as a JSON object instead of a URL-encoded form:
//!
//! - on `htmx:configRequest` it sets `Content-Type: application/json`;
//! - when asked to encode parameters it overrides the expected response type
//!   to `text/json` and returns the JSON body, with numeric-looking values
//!   coerced to numbers (see [`numeric`]).
//!
//! ## Architectural Layer
//!
//! **Extension.** Implements [`host::Extension`]; holds no per-request state
//! and performs no I/O. One instance is shared by all requests.
//!
//! ## Example
//!
//! ```
//! use host::{ExtensionRegistry, Parameters};
//! use json_enc::{encode_parameters, register, NumberCoercion};
//!
//! let mut registry = ExtensionRegistry::new();
//! let name = register(&mut registry, Default::default());
//! assert!(registry.contains(&name));
//!
//! let params = Parameters::from_pairs([("id", "123"), ("name", "Alice")]);
//! let body = encode_parameters(&params, NumberCoercion::LeadingInteger).unwrap();
//! assert_eq!(body, r#"{"id":123,"name":"Alice"}"#);
//! ```

pub mod numeric;

use std::sync::Arc;

use host::{
    events, EventDetail, EventName, Extension, ExtensionError, ExtensionName, ExtensionRegistry,
    MimeType, Parameters, SourceElement, TransportHandle,
};
use serde_json::{Map, Value};
use tracing::{debug, trace};

pub use numeric::{is_number, leading_decimal, leading_integer, NumberCoercion};

/// Name the extension registers under.
pub const EXTENSION_NAME: &str = "json-enc";

/// Request content type declared on configured requests.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Response MIME type forced on the transport handle.
pub const RESPONSE_MIME_TYPE: &str = "text/json";

/// Encodes request parameters as a JSON body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonEncExtension {
    coercion: NumberCoercion,
}

impl JsonEncExtension {
    pub fn new(coercion: NumberCoercion) -> Self {
        Self { coercion }
    }

    pub fn coercion(&self) -> NumberCoercion {
        self.coercion
    }
}

impl Extension for JsonEncExtension {
    fn on_event(&self, name: &EventName, detail: &mut EventDetail) -> Result<(), ExtensionError> {
        if !name.is(events::CONFIG_REQUEST) {
            return Ok(());
        }
        let headers = detail
            .headers
            .as_mut()
            .ok_or_else(|| ExtensionError::MissingHeaders { event: name.clone() })?;
        headers.insert("Content-Type", JSON_CONTENT_TYPE);
        debug!(request_id = %detail.request_id, "Declared JSON request body");
        Ok(())
    }

    fn encode_parameters(
        &self,
        handle: &mut dyn TransportHandle,
        parameters: &Parameters,
        _element: &SourceElement,
    ) -> Result<Option<String>, ExtensionError> {
        handle.override_mime_type(MimeType::from_static(RESPONSE_MIME_TYPE));
        let body = encode_parameters(parameters, self.coercion)?;
        Ok(Some(body))
    }
}

/// Serialises `parameters` into a JSON object string.
///
/// Keys keep their insertion order. Each value is passed through
/// [`NumberCoercion::coerce`].
pub fn encode_parameters(
    parameters: &Parameters,
    coercion: NumberCoercion,
) -> Result<String, serde_json::Error> {
    let mut body = Map::with_capacity(parameters.len());
    for (key, raw) in parameters.iter() {
        let value = coercion.coerce(raw);
        trace!(key, numeric = value.is_number(), "Coerced parameter");
        body.insert(key.to_owned(), value);
    }
    serde_json::to_string(&Value::Object(body))
}

/// Registers a [`JsonEncExtension`] under [`EXTENSION_NAME`] and returns the name.
pub fn register(registry: &mut ExtensionRegistry, extension: JsonEncExtension) -> ExtensionName {
    let name = ExtensionName::from_static(EXTENSION_NAME);
    registry.define_extension(name.clone(), Arc::new(extension));
    name
}
