//! Pre-request mutators and post-response handlers.
//!
//! # Design
//! Pre- and post-processors are separate traits because the runner treats
//! their failures differently. A pre-processor error is logged and the step
//! carries on; a post-processor error ends the step. Both traits are
//! implemented for closures of the matching shape, and `Named` attaches a
//! readable name to anything that would otherwise report its type name.

use std::any::type_name;

use log::{debug, info};

use crate::assertion::Assertion;
use crate::error::ProcessorError;
use crate::extract;
use crate::http::HttpResponse;
use crate::request::Request;
use crate::session::Session;

/// Session key read by `JwtAuth`.
pub const JWT_TOKEN_KEY: &str = "jwt_token";
pub const AUTHORIZATION: &str = "Authorization";

/// Mutates the request or seeds the session before dispatch.
pub trait PreProcessor: Send + Sync {
    fn name(&self) -> String {
        type_name::<Self>().to_string()
    }

    fn process(&self, request: &mut Request, session: &mut Session) -> Result<(), ProcessorError>;
}

impl<F> PreProcessor for F
where
    F: Fn(&mut Request, &mut Session) -> Result<(), ProcessorError> + Send + Sync,
{
    fn process(&self, request: &mut Request, session: &mut Session) -> Result<(), ProcessorError> {
        self(request, session)
    }
}

/// Observes the response, optionally writing extracted values to the session.
pub trait PostProcessor: Send + Sync {
    fn name(&self) -> String {
        type_name::<Self>().to_string()
    }

    fn process(
        &self,
        request: &Request,
        response: &HttpResponse,
        session: &mut Session,
    ) -> Result<(), ProcessorError>;
}

impl<F> PostProcessor for F
where
    F: Fn(&Request, &HttpResponse, &mut Session) -> Result<(), ProcessorError> + Send + Sync,
{
    fn process(
        &self,
        request: &Request,
        response: &HttpResponse,
        session: &mut Session,
    ) -> Result<(), ProcessorError> {
        self(request, response, session)
    }
}

/// Gives a processor or assertion an explicit name.
#[derive(Debug, Clone)]
pub struct Named<P> {
    name: String,
    inner: P,
}

impl<P> Named<P> {
    pub fn new(name: impl Into<String>, inner: P) -> Self {
        Self {
            name: name.into(),
            inner,
        }
    }
}

impl<P: PreProcessor> PreProcessor for Named<P> {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn process(&self, request: &mut Request, session: &mut Session) -> Result<(), ProcessorError> {
        self.inner.process(request, session)
    }
}

impl<P: PostProcessor> PostProcessor for Named<P> {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn process(
        &self,
        request: &Request,
        response: &HttpResponse,
        session: &mut Session,
    ) -> Result<(), ProcessorError> {
        self.inner.process(request, response, session)
    }
}

impl<P: Assertion> Assertion for Named<P> {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn check(&self, response: &HttpResponse) -> bool {
        self.inner.check(response)
    }
}

/// Sends the session's `jwt_token` as a bearer token.
///
/// Without a token the header is left alone and the processor reports a
/// missing key, which the runner only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct JwtAuth;

impl PreProcessor for JwtAuth {
    fn name(&self) -> String {
        "jwt-auth".to_string()
    }

    fn process(&self, request: &mut Request, session: &mut Session) -> Result<(), ProcessorError> {
        let token = session
            .get(JWT_TOKEN_KEY)
            .ok_or_else(|| ProcessorError::MissingSessionKey(JWT_TOKEN_KEY.to_string()))?;
        request.headers.set(AUTHORIZATION, format!("Bearer {token}"));
        Ok(())
    }
}

/// Writes a fixed value into the session.
#[derive(Debug, Clone)]
pub struct UpdateSession {
    key: String,
    value: String,
}

impl UpdateSession {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl PreProcessor for UpdateSession {
    fn name(&self) -> String {
        format!("update-session({})", self.key)
    }

    fn process(&self, _request: &mut Request, session: &mut Session) -> Result<(), ProcessorError> {
        session.put(self.key.clone(), self.value.clone());
        Ok(())
    }
}

/// Overwrites a request header.
#[derive(Debug, Clone)]
pub struct SetHeader {
    name: String,
    value: String,
}

impl SetHeader {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl PreProcessor for SetHeader {
    fn name(&self) -> String {
        format!("set-header({})", self.name)
    }

    fn process(&self, request: &mut Request, _session: &mut Session) -> Result<(), ProcessorError> {
        request.headers.set(&self.name, self.value.clone());
        Ok(())
    }
}

/// Logs method, path and status of every step at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogStep;

impl PostProcessor for LogStep {
    fn name(&self) -> String {
        "log-step".to_string()
    }

    fn process(
        &self,
        request: &Request,
        response: &HttpResponse,
        _session: &mut Session,
    ) -> Result<(), ProcessorError> {
        info!(
            "Executing method={} path={} status={}",
            request.method, request.path, response.status
        );
        Ok(())
    }
}

/// Prints the response body to stdout, indented when it is JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogPayload;

impl LogPayload {
    pub fn render(response: &HttpResponse) -> String {
        if response.is_json() {
            if let Ok(value) = serde_json::from_str::<serde_json::Value>(&response.body) {
                if let Ok(pretty) = serde_json::to_string_pretty(&value) {
                    return pretty;
                }
            }
        }
        response.body.clone()
    }
}

impl PostProcessor for LogPayload {
    fn name(&self) -> String {
        "log-payload".to_string()
    }

    fn process(
        &self,
        _request: &Request,
        response: &HttpResponse,
        _session: &mut Session,
    ) -> Result<(), ProcessorError> {
        println!("{}", Self::render(response));
        Ok(())
    }
}

/// Copies the value at a JSON path of the response body into the session.
///
/// A path that matches nothing is logged and skipped, unless the extraction
/// was made `required`, in which case it fails the step.
#[derive(Debug, Clone)]
pub struct Extract {
    key: String,
    path: String,
    required: bool,
}

impl Extract {
    pub fn new(key: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            path: path.into(),
            required: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

impl PostProcessor for Extract {
    fn name(&self) -> String {
        format!("extract({} <- {})", self.key, self.path)
    }

    fn process(
        &self,
        _request: &Request,
        response: &HttpResponse,
        session: &mut Session,
    ) -> Result<(), ProcessorError> {
        match extract::lookup(&response.body, &self.path) {
            Some(value) => {
                debug!("extracted {}={} from path {}", self.key, value, self.path);
                session.put(self.key.clone(), value);
                Ok(())
            }
            None if self.required => Err(ProcessorError::MissingPath {
                path: self.path.clone(),
            }),
            None => {
                info!(
                    "unable to find value in the json response, key={} path={}",
                    self.key, self.path
                );
                Ok(())
            }
        }
    }
}
