//! The extension contract.
//!
//! An extension is a named unit of behaviour the host calls back into at fixed
//! points of the request lifecycle. Both hooks have default implementations so
//! an extension only overrides what it needs.
//!
//! Hooks are synchronous and run to completion inside the host's dispatch.
//! Implementations must be `Send + Sync`: one registered instance is shared
//! by every in-flight request.

use crate::{EventDetail, EventName, ExtensionError, MimeType, Parameters, RequestId, SourceElement};

/// Per-request handle through which an extension may influence transport.
pub trait TransportHandle {
    /// Forces the response to be interpreted as `mime`, regardless of the
    /// `Content-Type` the server answers with.
    fn override_mime_type(&mut self, mime: MimeType);

    /// Returns the override set by [`Self::override_mime_type`], if any.
    fn mime_type_override(&self) -> Option<&MimeType>;
}

/// A host extension.
pub trait Extension: Send + Sync {
    /// Called for every lifecycle event of a request the extension is active for.
    ///
    /// The detail may be mutated; changes made during
    /// [`crate::events::CONFIG_REQUEST`] shape the outgoing request.
    fn on_event(&self, name: &EventName, detail: &mut EventDetail) -> Result<(), ExtensionError> {
        let _ = (name, detail);
        Ok(())
    }

    /// Serialises `parameters` into a request body.
    ///
    /// Returning `Ok(None)` leaves encoding to the next extension, or to the
    /// host's default form encoding if none claims it.
    fn encode_parameters(
        &self,
        handle: &mut dyn TransportHandle,
        parameters: &Parameters,
        element: &SourceElement,
    ) -> Result<Option<String>, ExtensionError> {
        let _ = (handle, parameters, element);
        Ok(None)
    }
}

/// The host's transport handle for one request.
///
/// Created by the host when a request starts and consumed when the request
/// is handed to the [`crate::Transport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHandle {
    request_id: RequestId,
    mime_override: Option<MimeType>,
}

impl RequestHandle {
    pub fn new(request_id: RequestId) -> Self {
        Self {
            request_id,
            mime_override: None,
        }
    }

    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Consumes the handle, returning the MIME override.
    pub fn into_mime_override(self) -> Option<MimeType> {
        self.mime_override
    }
}

impl TransportHandle for RequestHandle {
    fn override_mime_type(&mut self, mime: MimeType) {
        tracing::trace!(request_id = %self.request_id, mime = %mime, "Response MIME type overridden");
        self.mime_override = Some(mime);
    }

    fn mime_type_override(&self) -> Option<&MimeType> {
        self.mime_override.as_ref()
    }
}
