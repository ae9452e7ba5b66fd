//! Steps: one request template plus the processors and assertions around it.
//!
//! A `Step` is plain data until a `Client` runs it. Running never mutates the
//! step, so the same value can be run any number of times and each run
//! resolves its placeholders afresh.

use std::fmt;
use std::sync::Arc;

use crate::assertion::{Assertion, Success};
use crate::http::HttpMethod;
use crate::processor::{PostProcessor, PreProcessor};
use crate::request::Request;

pub type SharedPreProcessor = Arc<dyn PreProcessor>;
pub type SharedPostProcessor = Arc<dyn PostProcessor>;
pub type SharedAssertion = Arc<dyn Assertion>;

#[derive(Clone)]
pub struct Step {
    pub request: Request,
    pub pre_processors: Vec<SharedPreProcessor>,
    pub post_processors: Vec<SharedPostProcessor>,
    pub assertions: Vec<SharedAssertion>,
}

impl Step {
    /// A step with no processors and no assertions.
    pub fn new(request: Request) -> Self {
        Self {
            request,
            pre_processors: Vec::new(),
            post_processors: Vec::new(),
            assertions: Vec::new(),
        }
    }

    /// A step asserting a 2xx status.
    pub fn success(request: Request) -> Self {
        Self::new(request).with_assertion(Success)
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::success(Request::new(HttpMethod::Get, path))
    }

    pub fn post(path: impl Into<String>, body: impl Into<String>, content_type: &str) -> Self {
        Self::success(with_payload(HttpMethod::Post, path, body, content_type))
    }

    pub fn put(path: impl Into<String>, body: impl Into<String>, content_type: &str) -> Self {
        Self::success(with_payload(HttpMethod::Put, path, body, content_type))
    }

    pub fn patch(path: impl Into<String>, body: impl Into<String>, content_type: &str) -> Self {
        Self::success(with_payload(HttpMethod::Patch, path, body, content_type))
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::success(Request::new(HttpMethod::Delete, path))
    }

    /// Append a pre-processor; per-step pre-processors run after the global ones.
    pub fn with_pre_processor(mut self, processor: impl PreProcessor + 'static) -> Self {
        self.pre_processors.push(Arc::new(processor));
        self
    }

    /// Append a post-processor; per-step post-processors run after the global ones.
    pub fn with_post_processor(mut self, processor: impl PostProcessor + 'static) -> Self {
        self.post_processors.push(Arc::new(processor));
        self
    }

    pub fn with_assertion(mut self, assertion: impl Assertion + 'static) -> Self {
        self.assertions.push(Arc::new(assertion));
        self
    }

    /// Replace the assertions, e.g. to expect a 404 from a `Step::get`.
    pub fn expecting(mut self, assertion: impl Assertion + 'static) -> Self {
        self.assertions = vec![Arc::new(assertion)];
        self
    }

    /// Adjust the request template in place.
    pub fn map_request(mut self, f: impl FnOnce(Request) -> Request) -> Self {
        self.request = f(self.request);
        self
    }
}

fn with_payload(
    method: HttpMethod,
    path: impl Into<String>,
    body: impl Into<String>,
    content_type: &str,
) -> Request {
    let request = Request::new(method, path).with_body(body);
    if content_type.is_empty() {
        request
    } else {
        request.with_content_type(content_type)
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = |names: Vec<String>| names.join(", ");
        f.debug_struct("Step")
            .field("request", &self.request)
            .field(
                "pre_processors",
                &names(self.pre_processors.iter().map(|p| p.name()).collect()),
            )
            .field(
                "post_processors",
                &names(self.post_processors.iter().map(|p| p.name()).collect()),
            )
            .field(
                "assertions",
                &names(self.assertions.iter().map(|a| a.name()).collect()),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assertion::NotFound;
    use crate::processor::{Extract, JwtAuth};

    #[test]
    fn method_builders_assert_success() {
        for step in [
            Step::get("/posts"),
            Step::post("/posts", "{}", "application/json"),
            Step::put("/posts/1", "{}", "application/json"),
            Step::patch("/posts/1", "{}", "application/json"),
            Step::delete("/posts/1"),
        ] {
            assert_eq!(step.assertions.len(), 1);
            assert_eq!(step.assertions[0].name(), "success");
        }
    }

    #[test]
    fn payload_builders_fill_body_and_content_type() {
        let step = Step::patch("/posts/1", r#"{"title":"x"}"#, "application/merge-patch+json");
        assert_eq!(step.request.method, HttpMethod::Patch);
        assert_eq!(step.request.body, r#"{"title":"x"}"#);
        assert_eq!(
            step.request.content_type.as_deref(),
            Some("application/merge-patch+json")
        );

        let step = Step::post("/posts", "{}", "");
        assert!(step.request.content_type.is_none());
    }

    #[test]
    fn delete_has_no_body() {
        let step = Step::delete("/posts/1");
        assert_eq!(step.request.method, HttpMethod::Delete);
        assert!(step.request.body.is_empty());
    }

    #[test]
    fn processors_append_in_order() {
        let step = Step::get("/posts")
            .with_pre_processor(JwtAuth)
            .with_post_processor(Extract::new("id", "0.id"))
            .with_post_processor(Extract::new("title", "0.title"));
        assert_eq!(step.pre_processors[0].name(), "jwt-auth");
        let names: Vec<String> = step.post_processors.iter().map(|p| p.name()).collect();
        assert_eq!(names, ["extract(id <- 0.id)", "extract(title <- 0.title)"]);
    }

    #[test]
    fn expecting_replaces_assertions() {
        let step = Step::get("/posts/0").expecting(NotFound);
        assert_eq!(step.assertions.len(), 1);
        assert_eq!(step.assertions[0].name(), "not-found");
    }

    #[test]
    fn debug_lists_processor_names() {
        let step = Step::get("/me").with_pre_processor(JwtAuth);
        let debug = format!("{step:?}");
        assert!(debug.contains("jwt-auth"));
        assert!(debug.contains("success"));
    }
}
