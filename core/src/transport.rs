//! The network boundary.
//!
//! # Design
//! The core never talks to the network itself. The step runner builds an
//! `HttpRequest` and hands it to a `Transport`, which returns the response as
//! plain data. Non-2xx statuses are data, not errors: interpreting them is the
//! job of assertions. Timeouts, TLS and proxies are transport configuration.
//!
//! `UreqTransport` is the blocking implementation used by the CLI. Tests plug
//! in their own transports.

use std::fmt;
use std::time::Duration;

use ureq::{Agent, RequestBuilder};

use crate::error::TransportError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

pub trait Transport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).send(request)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).send(request)
    }
}

/// Blocking transport backed by a ureq agent.
///
/// Request bodies are sent for every method, including `GET`. Response bodies
/// are read in full with no size limit.
#[derive(Clone)]
pub struct UreqTransport {
    agent: Agent,
}

impl fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UreqTransport").finish_non_exhaustive()
    }
}

impl UreqTransport {
    /// Transport without a deadline; requests may block indefinitely.
    pub fn new() -> Self {
        Self::with_timeout(None)
    }

    /// Transport whose requests give up after `timeout` in total.
    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        // 4xx/5xx come back as responses so assertions can judge them.
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .allow_non_standard_methods(true)
            .timeout_global(timeout)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = request.url.as_str();
        let headers = request.headers.as_slice();
        let payload = request.body.as_deref().map(str::as_bytes);

        let sent = match (&request.method, payload) {
            (HttpMethod::Get, None) => with_headers(self.agent.get(url), headers).call(),
            (HttpMethod::Get, Some(body)) => with_headers(self.agent.get(url), headers)
                .force_send_body()
                .send(body),
            (HttpMethod::Head, None) => with_headers(self.agent.head(url), headers).call(),
            (HttpMethod::Head, Some(body)) => with_headers(self.agent.head(url), headers)
                .force_send_body()
                .send(body),
            (HttpMethod::Options, None) => with_headers(self.agent.options(url), headers).call(),
            (HttpMethod::Options, Some(body)) => with_headers(self.agent.options(url), headers)
                .force_send_body()
                .send(body),
            (HttpMethod::Delete, None) => with_headers(self.agent.delete(url), headers).call(),
            (HttpMethod::Delete, Some(body)) => with_headers(self.agent.delete(url), headers)
                .force_send_body()
                .send(body),
            (HttpMethod::Post, Some(body)) => with_headers(self.agent.post(url), headers).send(body),
            (HttpMethod::Post, None) => with_headers(self.agent.post(url), headers).send_empty(),
            (HttpMethod::Put, Some(body)) => with_headers(self.agent.put(url), headers).send(body),
            (HttpMethod::Put, None) => with_headers(self.agent.put(url), headers).send_empty(),
            (HttpMethod::Patch, Some(body)) => {
                with_headers(self.agent.patch(url), headers).send(body)
            }
            (HttpMethod::Patch, None) => with_headers(self.agent.patch(url), headers).send_empty(),
            (HttpMethod::Other(method), body) => {
                let mut builder = ureq::http::Request::builder().method(method.as_str()).uri(url);
                for (name, value) in headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                let outgoing = builder
                    .body(body.unwrap_or_default().to_vec())
                    .map_err(|e| TransportError::Request {
                        url: url.to_string(),
                        message: e.to_string(),
                    })?;
                self.agent.run(outgoing)
            }
        };
        let mut response = sent.map_err(|e| TransportError::Request {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        // ureq caps bodies at 10 MB by default; responses are read whole.
        let body = response
            .body_mut()
            .with_config()
            .limit(u64::MAX)
            .read_to_string()
            .map_err(|e| TransportError::Body {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn with_headers<B>(
    mut builder: RequestBuilder<B>,
    headers: &[(String, String)],
) -> RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}
