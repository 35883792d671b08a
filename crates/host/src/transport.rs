//! Transport port.
//!
//! The host assembles a [`PreparedRequest`] and hands it to a [`Transport`].
//! Implementations live in infrastructure crates; this module holds only the
//! trait and the data crossing it.

use async_trait::async_trait;
use serde::Serialize;
use url::Url;

use crate::{Headers, HttpVerb, MimeType, RequestId, TransportError};

/// A fully assembled outgoing request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreparedRequest {
    pub request_id: RequestId,
    pub verb: HttpVerb,
    pub url: Url,
    pub headers: Headers,
    /// Encoded body; `None` for verbs that carry parameters in the query.
    pub body: Option<String>,
    /// How the response must be interpreted, if an extension overrode it.
    pub response_mime: Option<MimeType>,
}

/// Raw response as returned by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: String,
}

/// Sends prepared requests.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: PreparedRequest) -> Result<TransportResponse, TransportError>;
}

/// Response body decoded according to its effective MIME type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponseBody {
    Json(serde_json::Value),
    Text(String),
}

impl ResponseBody {
    /// Decodes `body`.
    ///
    /// The override takes precedence over the server's `Content-Type`. Bodies
    /// declared as JSON that fail to parse are kept as text.
    pub fn interpret(mime_override: Option<&MimeType>, content_type: Option<&str>, body: String) -> Self {
        let wants_json = match mime_override {
            Some(mime) => mime.is_json(),
            None => content_type
                .and_then(|ct| MimeType::new(ct))
                .is_some_and(|m| m.is_json()),
        };
        if !wants_json {
            return ResponseBody::Text(body);
        }
        match serde_json::from_str(&body) {
            Ok(value) => ResponseBody::Json(value),
            Err(err) => {
                tracing::warn!(error = %err, "Response declared as JSON did not parse; keeping text");
                ResponseBody::Text(body)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn override_wins_over_content_type() {
        let mime = MimeType::new("text/json").unwrap();
        let body = ResponseBody::interpret(Some(&mime), Some("text/html"), r#"{"ok":true}"#.into());
        assert_eq!(body, ResponseBody::Json(json!({"ok": true})));
    }

    #[test]
    fn content_type_used_without_override() {
        let body = ResponseBody::interpret(None, Some("application/json"), "[1,2]".into());
        assert_eq!(body, ResponseBody::Json(json!([1, 2])));

        let body = ResponseBody::interpret(None, Some("text/html"), "<p>hi</p>".into());
        assert_eq!(body, ResponseBody::Text("<p>hi</p>".into()));
    }

    #[test]
    fn invalid_json_is_kept_as_text() {
        let mime = MimeType::new("text/json").unwrap();
        let body = ResponseBody::interpret(Some(&mime), None, "<html>".into());
        assert_eq!(body, ResponseBody::Text("<html>".into()));
    }
}
