//! Request lifecycle: event dispatch, body encoding and transport hand-off.
//!
//! ## Order of operations
//!
//! 1. Default headers are assembled.
//! 2. `htmx:configRequest` is dispatched to every active extension, which may
//!    rewrite headers and parameters.
//! 3. Body verbs are encoded by the first extension that claims the
//!    parameters, falling back to `application/x-www-form-urlencoded`.
//!    Query verbs append the parameters to the URL.
//! 4. `htmx:beforeRequest` is dispatched, the request is sent, then
//!    `htmx:afterRequest` is dispatched.

use std::sync::Arc;

use tracing::{debug, instrument};
use url::Url;

use crate::{
    events, EventDetail, EventName, Extension, ExtensionName, ExtensionRegistry, Headers,
    HostError, HttpVerb, Parameters, PreparedRequest, RequestHandle, RequestId, ResponseBody,
    SourceElement, Transport,
};

/// Content type of the default body encoding.
pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

type ActiveExtensions = Vec<(ExtensionName, Arc<dyn Extension>)>;

/// Host-wide settings applied to every request.
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Relative request paths are resolved against this URL.
    pub base_url: Url,
    /// Sent as `HX-Current-URL` when set.
    pub current_url: Option<String>,
    /// Extra headers added to every request before extensions run.
    pub default_headers: Headers,
    /// Extensions active for every request, ahead of per-request ones.
    pub extensions: Vec<ExtensionName>,
}

impl HostConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            current_url: None,
            default_headers: Headers::new(),
            extensions: Vec::new(),
        }
    }

    pub fn with_extension(mut self, name: ExtensionName) -> Self {
        self.extensions.push(name);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(name, value);
        self
    }

    pub fn with_current_url(mut self, url: impl Into<String>) -> Self {
        self.current_url = Some(url.into());
        self
    }
}

/// A request as triggered by an element, before the host assembles it.
#[derive(Debug, Clone)]
pub struct OutgoingRequest {
    pub verb: HttpVerb,
    pub path: String,
    pub parameters: Parameters,
    pub element: SourceElement,
    /// Extensions enabled on the triggering element.
    pub extensions: Vec<ExtensionName>,
}

impl OutgoingRequest {
    pub fn new(verb: HttpVerb, path: impl Into<String>, parameters: Parameters) -> Self {
        Self {
            verb,
            path: path.into(),
            parameters,
            element: SourceElement::default(),
            extensions: Vec::new(),
        }
    }

    pub fn with_element(mut self, element: SourceElement) -> Self {
        self.element = element;
        self
    }

    pub fn with_extension(mut self, name: ExtensionName) -> Self {
        self.extensions.push(name);
        self
    }
}

/// Decoded response of an issued request.
#[derive(Debug, Clone, PartialEq)]
pub struct HostResponse {
    pub request_id: RequestId,
    pub status: u16,
    pub headers: Headers,
    pub body: ResponseBody,
}

/// The host framework: owns the registry and drives the request lifecycle.
pub struct Host {
    registry: ExtensionRegistry,
    transport: Arc<dyn Transport>,
    config: HostConfig,
}

impl Host {
    pub fn new(registry: ExtensionRegistry, transport: Arc<dyn Transport>, config: HostConfig) -> Self {
        Self {
            registry,
            transport,
            config,
        }
    }

    pub fn registry(&self) -> &ExtensionRegistry {
        &self.registry
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Assembles `request` without sending it.
    ///
    /// Runs the configuration and encoding hooks only; no notification events
    /// are dispatched.
    pub fn prepare(&self, request: OutgoingRequest) -> Result<PreparedRequest, HostError> {
        let active = self.active_extensions(&request);
        self.assemble(request, &active)
    }

    /// Assembles and sends `request`, dispatching the full event sequence.
    #[instrument(
        name = "host.issue",
        skip_all,
        fields(verb = %request.verb, path = %request.path, request_id = tracing::field::Empty)
    )]
    pub async fn issue(&self, request: OutgoingRequest) -> Result<HostResponse, HostError> {
        let active = self.active_extensions(&request);
        let prepared = self.assemble(request, &active)?;
        let request_id = prepared.request_id;
        tracing::Span::current().record("request_id", tracing::field::display(request_id));

        let verb = prepared.verb;
        let path = prepared.url.path().to_string();
        let response_mime = prepared.response_mime.clone();

        let mut detail = EventDetail::notify(request_id, verb, path.as_str());
        dispatch(&active, events::BEFORE_REQUEST, &mut detail)?;

        let result = self.transport.send(prepared).await;

        let mut detail = EventDetail::notify(request_id, verb, path.as_str());
        let after = dispatch(&active, events::AFTER_REQUEST, &mut detail);
        let response = result?;
        after?;

        debug!(status = response.status, "Request completed");
        let content_type = response.headers.get("Content-Type").map(str::to_owned);
        Ok(HostResponse {
            request_id,
            status: response.status,
            body: ResponseBody::interpret(response_mime.as_ref(), content_type.as_deref(), response.body),
            headers: response.headers,
        })
    }

    fn active_extensions(&self, request: &OutgoingRequest) -> ActiveExtensions {
        let requested: Vec<ExtensionName> = self
            .config
            .extensions
            .iter()
            .chain(request.extensions.iter())
            .cloned()
            .collect();
        self.registry.resolve(&requested)
    }

    fn assemble(&self, request: OutgoingRequest, active: &ActiveExtensions) -> Result<PreparedRequest, HostError> {
        let request_id = RequestId::new_random();
        let OutgoingRequest {
            verb,
            path,
            parameters,
            element,
            ..
        } = request;

        let headers = self.default_headers(verb, &element);
        let mut detail = EventDetail::configure(request_id, verb, path, headers, parameters);
        dispatch(active, events::CONFIG_REQUEST, &mut detail)?;
        let EventDetail {
            path,
            headers,
            parameters,
            ..
        } = detail;

        let mut url = self
            .config
            .base_url
            .join(&path)
            .map_err(|source| HostError::InvalidUrl { url: path.clone(), source })?;

        let mut handle = RequestHandle::new(request_id);
        let body = if verb.carries_body() {
            Some(encode_body(active, &mut handle, &parameters, &element)?)
        } else {
            if !parameters.is_empty() {
                url.query_pairs_mut().extend_pairs(parameters.iter());
            }
            None
        };

        debug!(%request_id, %verb, %url, extensions = active.len(), "Request assembled");
        Ok(PreparedRequest {
            request_id,
            verb,
            url,
            headers: headers.unwrap_or_default(),
            body,
            response_mime: handle.into_mime_override(),
        })
    }

    fn default_headers(&self, verb: HttpVerb, element: &SourceElement) -> Headers {
        let mut headers = Headers::new();
        headers.insert("HX-Request", "true");
        if let Some(id) = &element.id {
            headers.insert("HX-Trigger", id.as_str());
        }
        if let Some(current) = &self.config.current_url {
            headers.insert("HX-Current-URL", current.as_str());
        }
        if verb.carries_body() {
            headers.insert("Content-Type", FORM_URLENCODED);
        }
        headers.extend_from(&self.config.default_headers);
        headers
    }
}

fn dispatch(active: &ActiveExtensions, event: &'static str, detail: &mut EventDetail) -> Result<(), HostError> {
    let name = EventName::from_static(event);
    for (ext_name, ext) in active {
        debug!(extension = %ext_name, event, "Dispatching event");
        ext.on_event(&name, detail)
            .map_err(|source| HostError::Extension {
                extension: ext_name.clone(),
                source,
            })?;
    }
    Ok(())
}

fn encode_body(
    active: &ActiveExtensions,
    handle: &mut RequestHandle,
    parameters: &Parameters,
    element: &SourceElement,
) -> Result<String, HostError> {
    for (ext_name, ext) in active {
        let encoded = ext
            .encode_parameters(handle, parameters, element)
            .map_err(|source| HostError::Extension {
                extension: ext_name.clone(),
                source,
            })?;
        if let Some(body) = encoded {
            debug!(extension = %ext_name, bytes = body.len(), "Parameters encoded by extension");
            return Ok(body);
        }
    }
    Ok(url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(parameters.iter())
        .finish())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::{ExtensionError, MimeType, TransportError, TransportHandle, TransportResponse};

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<PreparedRequest>>,
        fail: bool,
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn send(&self, request: PreparedRequest) -> Result<TransportResponse, TransportError> {
            self.sent.lock().unwrap().push(request);
            if self.fail {
                return Err(TransportError::Timeout);
            }
            Ok(TransportResponse {
                status: 200,
                headers: Headers::from_pairs([("Content-Type", "text/html")]),
                body: r#"{"saved":true}"#.to_string(),
            })
        }
    }

    /// Records every event it sees and claims bodies as upper-cased keys.
    #[derive(Default)]
    struct Probe {
        events: Mutex<Vec<String>>,
    }

    impl Extension for Probe {
        fn on_event(&self, name: &EventName, detail: &mut EventDetail) -> Result<(), ExtensionError> {
            self.events.lock().unwrap().push(name.to_string());
            if name.is(events::CONFIG_REQUEST) {
                detail.parameters.insert("added", "yes");
            }
            Ok(())
        }

        fn encode_parameters(
            &self,
            handle: &mut dyn TransportHandle,
            parameters: &Parameters,
            _element: &SourceElement,
        ) -> Result<Option<String>, ExtensionError> {
            handle.override_mime_type(MimeType::new("text/json").unwrap());
            let keys: Vec<_> = parameters.iter().map(|(k, _)| k.to_uppercase()).collect();
            Ok(Some(keys.join(",")))
        }
    }

    struct Broken;

    impl Extension for Broken {
        fn on_event(&self, name: &EventName, _detail: &mut EventDetail) -> Result<(), ExtensionError> {
            Err(ExtensionError::MissingHeaders { event: name.clone() })
        }
    }

    fn name(s: &str) -> ExtensionName {
        ExtensionName::new(s).unwrap()
    }

    fn shared<E: Extension + 'static>(ext: &Arc<E>) -> Arc<dyn Extension> {
        ext.clone()
    }

    fn host_with(ext: Option<(&str, Arc<dyn Extension>)>, transport: Arc<RecordingTransport>) -> Host {
        let mut registry = ExtensionRegistry::new();
        let mut config = HostConfig::new(Url::parse("http://localhost:9005/app/").unwrap());
        if let Some((n, ext)) = ext {
            registry.define_extension(name(n), ext);
            config = config.with_extension(name(n));
        }
        Host::new(registry, transport, config)
    }

    #[test]
    fn default_form_encoding_without_extensions() {
        let host = host_with(None, Arc::new(RecordingTransport::default()));
        let params = Parameters::from_pairs([("name", "Alice Smith"), ("id", "7")]);
        let prepared = host
            .prepare(OutgoingRequest::new(HttpVerb::Post, "sets", params))
            .unwrap();

        assert_eq!(prepared.url.as_str(), "http://localhost:9005/app/sets");
        assert_eq!(prepared.body.as_deref(), Some("name=Alice+Smith&id=7"));
        assert_eq!(prepared.headers.get("content-type"), Some(FORM_URLENCODED));
        assert_eq!(prepared.headers.get("HX-Request"), Some("true"));
        assert!(prepared.response_mime.is_none());
    }

    #[test]
    fn query_verbs_put_parameters_in_the_url() {
        let host = host_with(Some(("probe", shared(&Arc::new(Probe::default())))), Arc::new(RecordingTransport::default()));
        let params = Parameters::from_pairs([("q", "a b")]);
        let prepared = host
            .prepare(OutgoingRequest::new(HttpVerb::Get, "/search", params))
            .unwrap();

        assert_eq!(prepared.url.as_str(), "http://localhost:9005/search?q=a+b&added=yes");
        assert!(prepared.body.is_none());
        assert!(prepared.headers.get("Content-Type").is_none());
    }

    #[test]
    fn extension_claims_body_and_overrides_mime() {
        let host = host_with(Some(("probe", shared(&Arc::new(Probe::default())))), Arc::new(RecordingTransport::default()));
        let request = OutgoingRequest::new(HttpVerb::Put, "x", Parameters::from_pairs([("a", "1")]))
            .with_element(SourceElement::new("form").with_id("edit"));
        let prepared = host.prepare(request).unwrap();

        assert_eq!(prepared.body.as_deref(), Some("A,ADDED"));
        assert_eq!(prepared.response_mime.unwrap().as_str(), "text/json");
        assert_eq!(prepared.headers.get("HX-Trigger"), Some("edit"));
    }

    #[test]
    fn configured_headers_are_applied() {
        let transport = Arc::new(RecordingTransport::default());
        let mut registry = ExtensionRegistry::new();
        registry.define_extension(name("unused"), Arc::new(Probe::default()));
        let config = HostConfig::new(Url::parse("http://localhost/").unwrap())
            .with_header("X-Csrf", "token")
            .with_current_url("http://localhost/page");
        let host = Host::new(registry, transport, config);

        let prepared = host
            .prepare(OutgoingRequest::new(HttpVerb::Post, "/", Parameters::new()))
            .unwrap();
        assert_eq!(prepared.headers.get("x-csrf"), Some("token"));
        assert_eq!(prepared.headers.get("HX-Current-URL"), Some("http://localhost/page"));
        assert_eq!(prepared.body.as_deref(), Some(""));
    }

    #[test]
    fn failing_extension_is_named_in_the_error() {
        let host = host_with(Some(("broken", shared(&Arc::new(Broken)))), Arc::new(RecordingTransport::default()));
        let err = host
            .prepare(OutgoingRequest::new(HttpVerb::Post, "/", Parameters::new()))
            .unwrap_err();
        match err {
            HostError::Extension { extension, source } => {
                assert_eq!(extension.as_str(), "broken");
                assert!(matches!(source, ExtensionError::MissingHeaders { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn issue_dispatches_events_in_order_and_decodes_override() {
        let probe = Arc::new(Probe::default());
        let transport = Arc::new(RecordingTransport::default());
        let host = host_with(Some(("probe", shared(&probe))), transport.clone());

        let response = host
            .issue(OutgoingRequest::new(HttpVerb::Post, "save", Parameters::from_pairs([("k", "v")])))
            .await
            .unwrap();

        assert_eq!(
            *probe.events.lock().unwrap(),
            vec![events::CONFIG_REQUEST, events::BEFORE_REQUEST, events::AFTER_REQUEST]
        );
        assert_eq!(response.status, 200);
        assert_eq!(response.body, ResponseBody::Json(serde_json::json!({"saved": true})));
        assert_eq!(transport.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn transport_failure_still_fires_after_request() {
        let probe = Arc::new(Probe::default());
        let transport = Arc::new(RecordingTransport {
            fail: true,
            ..Default::default()
        });
        let host = host_with(Some(("probe", shared(&probe))), transport);

        let err = host
            .issue(OutgoingRequest::new(HttpVerb::Get, "/", Parameters::new()))
            .await
            .unwrap_err();

        assert!(matches!(err, HostError::Transport(TransportError::Timeout)));
        assert_eq!(probe.events.lock().unwrap().last().map(String::as_str), Some(events::AFTER_REQUEST));
    }
}
