//! Error types for the step pipeline.
//!
//! # Design
//! Errors are layered the way a run fails. Processors and the transport report
//! their own narrow errors; the step runner wraps them in `StepError`, which
//! knows which phase of the step broke; the sequencer wraps that in `RunError`
//! together with everything collected before the failure.
//!
//! Pre-processor failures never show up here. They are soft failures and are
//! surfaced as `Warning`s on the client instead.

use thiserror::Error;

use crate::http::HttpResponse;

/// Failure reported by a pre- or post-processor.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProcessorError {
    /// A session key the processor depends on is not set.
    #[error("session key `{0}` is not set")]
    MissingSessionKey(String),

    /// A JSON path did not match anything in the response body.
    #[error("path `{path}` not found in response body")]
    MissingPath { path: String },

    /// Free-form failure from a user-supplied processor.
    #[error("{0}")]
    Message(String),
}

impl ProcessorError {
    pub fn msg(message: impl Into<String>) -> Self {
        ProcessorError::Message(message.into())
    }
}

/// Failure while executing an `HttpRequest`. Never retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Connection, DNS, TLS or protocol failure before a response arrived.
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },

    /// The response arrived but its body could not be read.
    #[error("reading response body from {url} failed: {message}")]
    Body { url: String, message: String },
}

/// Phases a step moves through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Pending,
    PreProcessed,
    Resolved,
    Dispatched,
    PostProcessed,
    Asserted,
}

/// Why a single step failed.
#[derive(Debug, Error)]
pub enum StepError {
    /// Neither the request nor the session `host` key gives a usable host.
    #[error("no usable host: request host is empty or invalid and session key `host` is not set")]
    MissingHost,

    /// Host and path could not be combined into a valid URL.
    #[error("invalid url `{url}`: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A post-processor returned an error; later post-processors and all
    /// assertions were skipped.
    #[error("post-processor `{processor}` failed: {source}")]
    PostProcessor {
        processor: String,
        #[source]
        source: ProcessorError,
    },

    /// An assertion rejected the response.
    #[error("assertion failed: `{assertion}` rejected status {status}")]
    Assertion { assertion: String, status: u16 },
}

impl StepError {
    /// The phase whose transition failed.
    pub fn phase(&self) -> Phase {
        match self {
            StepError::MissingHost | StepError::InvalidUrl { .. } | StepError::Transport(_) => {
                Phase::Dispatched
            }
            StepError::PostProcessor { .. } => Phase::PostProcessed,
            StepError::Assertion { .. } => Phase::Asserted,
        }
    }
}

/// A step failure as seen by the caller of `Client::run`.
///
/// `responses` holds the responses of the steps that completed before the
/// failure, in order. The failing step's own response, if the request got that
/// far, is kept separately in `response`.
#[derive(Debug, Error)]
#[error("step {index} failed: {source}")]
pub struct RunError {
    pub index: usize,
    pub responses: Vec<HttpResponse>,
    pub response: Option<HttpResponse>,
    pub source: StepError,
}

/// A step name that is not registered.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown step `{0}`")]
pub struct UnknownStep(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assertion_error_names_predicate_and_status() {
        let err = StepError::Assertion {
            assertion: "success".to_string(),
            status: 500,
        };
        assert_eq!(
            err.to_string(),
            "assertion failed: `success` rejected status 500"
        );
        assert_eq!(err.phase(), Phase::Asserted);
    }

    #[test]
    fn transport_error_fails_dispatch() {
        let err = StepError::from(TransportError::Request {
            url: "http://localhost:1/".to_string(),
            message: "connection refused".to_string(),
        });
        assert_eq!(err.phase(), Phase::Dispatched);
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn run_error_exposes_step_error_as_source() {
        let err = RunError {
            index: 2,
            responses: Vec::new(),
            response: None,
            source: StepError::MissingHost,
        };
        let source = std::error::Error::source(&err).unwrap();
        assert!(source.to_string().starts_with("no usable host"));
        assert!(err.to_string().starts_with("step 2 failed"));
    }
}
