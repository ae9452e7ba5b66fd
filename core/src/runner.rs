//! Runs a single step end to end.
//!
//! # Design
//! A step moves through the phases of `Phase` in order:
//!
//! - `PreProcessed`: global then per-step pre-processors. Failures become
//!   warnings and never stop the step.
//! - `Resolved`: placeholder substitution over a private copy of the request
//!   template, so the caller's `Step` stays untouched.
//! - `Dispatched`: the effective host is chosen, the `HttpRequest` is built and
//!   sent. Any failure here ends the step without a response.
//! - `PostProcessed`: global then per-step post-processors; the first error
//!   ends the step.
//! - `Asserted`: assertions in order; the first rejection ends the step.

use std::fmt;

use log::{debug, trace, warn};
use url::Url;

use crate::error::{Phase, ProcessorError, StepError};
use crate::http::{HttpRequest, HttpResponse};
use crate::request::{Request, APPLICATION_JSON, CONTENT_TYPE};
use crate::resolve::Resolver;
use crate::session::Session;
use crate::step::{SharedPostProcessor, SharedPreProcessor, Step};
use crate::transport::Transport;

/// Session key holding the default host.
pub const HOST_KEY: &str = "host";

/// A soft failure: recorded, logged, and otherwise ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// A pre-processor returned an error.
    PreProcessor {
        step: usize,
        processor: String,
        error: ProcessorError,
    },
    /// A `${key}` placeholder had no session value and was left in place.
    UnresolvedPlaceholder { step: usize, key: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::PreProcessor {
                step,
                processor,
                error,
            } => write!(f, "step {step}: pre-processor `{processor}` failed: {error}"),
            Warning::UnresolvedPlaceholder { step, key } => {
                write!(f, "step {step}: placeholder `${{{key}}}` left unresolved")
            }
        }
    }
}

/// A step that did not succeed, with its response if one was received.
#[derive(Debug)]
pub(crate) struct Failed {
    pub error: StepError,
    pub response: Option<HttpResponse>,
}

impl Failed {
    fn without_response(error: StepError) -> Self {
        Self {
            error,
            response: None,
        }
    }
}

/// Borrowed view of a client for the duration of one step.
pub(crate) struct StepRunner<'a, T> {
    pub transport: &'a T,
    pub session: &'a mut Session,
    pub pre_processors: &'a [SharedPreProcessor],
    pub post_processors: &'a [SharedPostProcessor],
    pub warnings: &'a mut Vec<Warning>,
    pub index: usize,
}

impl<T: Transport> StepRunner<'_, T> {
    pub fn run(mut self, step: &Step) -> Result<HttpResponse, Failed> {
        let mut request = step.request.clone();

        self.pre_process(step, &mut request);
        self.advance(Phase::PreProcessed);

        self.resolve(&mut request);
        self.advance(Phase::Resolved);

        let outgoing =
            build_http_request(&request, self.session).map_err(Failed::without_response)?;
        debug!("{} {}", outgoing.method, outgoing.url);
        let response = self
            .transport
            .send(&outgoing)
            .map_err(|e| Failed::without_response(e.into()))?;
        self.advance(Phase::Dispatched);

        if let Err(error) = self.post_process(step, &request, &response) {
            return Err(Failed {
                error,
                response: Some(response),
            });
        }
        self.advance(Phase::PostProcessed);

        if let Err(error) = check_assertions(step, &response) {
            return Err(Failed {
                error,
                response: Some(response),
            });
        }
        self.advance(Phase::Asserted);

        Ok(response)
    }

    fn advance(&self, phase: Phase) {
        trace!("step {} -> {:?}", self.index, phase);
    }

    fn pre_process(&mut self, step: &Step, request: &mut Request) {
        let globals = self.pre_processors;
        for processor in globals.iter().chain(&step.pre_processors) {
            if let Err(error) = processor.process(request, self.session) {
                let name = processor.name();
                warn!("pre-processor {name} failed, skipping it: {error}");
                self.warnings.push(Warning::PreProcessor {
                    step: self.index,
                    processor: name,
                    error,
                });
            }
        }
    }

    fn resolve(&mut self, request: &mut Request) {
        let mut resolver = Resolver::new(self.session);
        resolver.resolve_request(request);
        let unresolved = resolver.into_unresolved();
        self.warnings
            .extend(unresolved.into_iter().map(|key| Warning::UnresolvedPlaceholder {
                step: self.index,
                key,
            }));
    }

    fn post_process(
        &mut self,
        step: &Step,
        request: &Request,
        response: &HttpResponse,
    ) -> Result<(), StepError> {
        let globals = self.post_processors;
        for processor in globals.iter().chain(&step.post_processors) {
            processor
                .process(request, response, self.session)
                .map_err(|source| StepError::PostProcessor {
                    processor: processor.name(),
                    source,
                })?;
        }
        Ok(())
    }
}

fn check_assertions(step: &Step, response: &HttpResponse) -> Result<(), StepError> {
    match step.assertions.iter().find(|a| !a.check(response)) {
        Some(assertion) => Err(StepError::Assertion {
            assertion: assertion.name(),
            status: response.status,
        }),
        None => Ok(()),
    }
}

/// Turn a resolved request template into the request sent on the wire.
///
/// The request host wins when it is a parsable absolute URL; otherwise the
/// session `host` is used. A body defaults the content type to JSON unless a
/// `Content-Type` header is already present.
pub fn build_http_request(request: &Request, session: &Session) -> Result<HttpRequest, StepError> {
    let host = effective_host(request, session).ok_or(StepError::MissingHost)?;
    let mut url = join_url(&host, &request.path)?;
    if !request.query.is_empty() {
        url.query_pairs_mut().extend_pairs(request.query.iter());
    }

    let mut headers = request.headers.clone();
    let content_type = request.content_type.as_deref().filter(|c| !c.is_empty());
    let body = if request.body.is_empty() {
        if let Some(content_type) = content_type {
            headers.set(CONTENT_TYPE, content_type);
        }
        None
    } else {
        match content_type {
            Some(content_type) => headers.set(CONTENT_TYPE, content_type),
            None if !headers.contains(CONTENT_TYPE) => headers.set(CONTENT_TYPE, APPLICATION_JSON),
            None => {}
        }
        Some(request.body.clone())
    };

    Ok(HttpRequest {
        method: request.method.clone(),
        url: url.into(),
        headers: headers
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect(),
        body,
    })
}

fn effective_host(request: &Request, session: &Session) -> Option<String> {
    match request.host.as_deref() {
        Some(host) if !host.is_empty() && Url::parse(host).is_ok() => Some(host.to_string()),
        Some(host) if !host.is_empty() => {
            debug!("request host {host} is not a valid url, using session host");
            session.get(HOST_KEY)
        }
        _ => session.get(HOST_KEY),
    }
}

/// Append `path` to the path of `host`, with exactly one `/` between them.
fn join_url(host: &str, path: &str) -> Result<Url, StepError> {
    let mut url = Url::parse(host).map_err(|source| StepError::InvalidUrl {
        url: host.to_string(),
        source,
    })?;
    let path = path.trim_start_matches('/');
    if !path.is_empty() {
        let joined = format!("{}/{}", url.path().trim_end_matches('/'), path);
        url.set_path(&joined);
    }
    Ok(url)
}
