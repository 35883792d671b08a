//! hxenc HTTP transport adapter.
//!
//! Implements [`host::Transport`] over [`reqwest`]. The host hands over a
//! fully assembled [`PreparedRequest`]; this crate only converts it to a wire
//! request, sends it, and collects the status, headers and body text.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Connection handling, timeouts and HTTP error mapping
//! live here. The [`host`] crate sees only [`host::Transport`].

use std::time::Duration;

use async_trait::async_trait;
use host::{Headers, HttpVerb, PreparedRequest, Transport, TransportError, TransportResponse};
use reqwest::header::HeaderMap;
use reqwest::{Client, Method};
use tracing::{debug, instrument};

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Sends prepared requests with a shared [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Builds a transport whose requests fail after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(map_error)?;
        Ok(Self { client })
    }

    /// Wraps an already configured client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Converts `prepared` into a wire request without sending it.
    pub fn build_request(&self, prepared: &PreparedRequest) -> Result<reqwest::Request, TransportError> {
        let mut builder = self
            .client
            .request(method_for(prepared.verb), prepared.url.clone());
        for (name, value) in prepared.headers.iter() {
            builder = builder.header(name, value);
        }
        if let Some(body) = &prepared.body {
            builder = builder.body(body.clone());
        }
        builder.build().map_err(map_error)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(name = "transport.send", skip_all, fields(request_id = %request.request_id, url = %request.url))]
    async fn send(&self, request: PreparedRequest) -> Result<TransportResponse, TransportError> {
        let wire = self.build_request(&request)?;
        let response = self.client.execute(wire).await.map_err(map_error)?;

        let status = response.status().as_u16();
        let headers = convert_headers(response.headers());
        let body = response.text().await.map_err(map_error)?;
        debug!(status, bytes = body.len(), "Response received");

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}

fn method_for(verb: HttpVerb) -> Method {
    match verb {
        HttpVerb::Get => Method::GET,
        HttpVerb::Post => Method::POST,
        HttpVerb::Put => Method::PUT,
        HttpVerb::Patch => Method::PATCH,
        HttpVerb::Delete => Method::DELETE,
    }
}

fn convert_headers(map: &HeaderMap) -> Headers {
    let mut headers = Headers::new();
    for (name, value) in map {
        match value.to_str() {
            Ok(text) => {
                headers.insert(name.as_str(), text);
            }
            Err(_) => debug!(header = %name, "Skipping non-UTF-8 response header"),
        }
    }
    headers
}

fn map_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_builder() {
        TransportError::InvalidRequest {
            message: err.to_string(),
        }
    } else {
        TransportError::Io {
            message: err.to_string(),
        }
    }
}
