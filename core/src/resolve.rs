//! Placeholder substitution for request templates.
//!
//! Two passes run over every templated field, always in this order:
//!
//! 1. each `${randomUUID}` becomes a fresh v4 UUID, one per occurrence;
//! 2. each `${key}` becomes the session value for `key`, or stays verbatim
//!    when the session has none.
//!
//! Both passes build a new string from the input. Text produced by a
//! substitution is never scanned again, so values containing `${...}` come
//! through literally.

use std::sync::LazyLock;

use log::warn;
use regex::Regex;
use uuid::Uuid;

use crate::request::Request;
use crate::session::Session;

/// Reserved token replaced with a random UUID.
pub const RANDOM_UUID: &str = "${randomUUID}";

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{(.*?)\}").expect("placeholder pattern is valid"));

/// Replace every `${randomUUID}` in `input` with its own fresh UUID.
pub fn substitute_random(input: &str) -> String {
    let mut parts = input.split(RANDOM_UUID);
    let mut output = String::with_capacity(input.len());
    if let Some(first) = parts.next() {
        output.push_str(first);
    }
    for part in parts {
        output.push_str(&Uuid::new_v4().to_string());
        output.push_str(part);
    }
    output
}

/// Resolve both passes over `input` against `session`.
pub fn resolve(input: &str, session: &Session) -> String {
    Resolver::new(session).resolve(input)
}

/// Resolves templates against a session and remembers which placeholders
/// could not be filled.
#[derive(Debug)]
pub struct Resolver<'a> {
    session: &'a Session,
    unresolved: Vec<String>,
}

impl<'a> Resolver<'a> {
    pub fn new(session: &'a Session) -> Self {
        Self {
            session,
            unresolved: Vec::new(),
        }
    }

    pub fn resolve(&mut self, input: &str) -> String {
        let randomized = substitute_random(input);
        self.substitute_session(&randomized)
    }

    /// Rewrite body, host, path and every query value of `request` in place.
    pub fn resolve_request(&mut self, request: &mut Request) {
        request.body = self.resolve(&request.body);
        if let Some(host) = &mut request.host {
            *host = self.resolve(host);
        }
        request.path = self.resolve(&request.path);
        for value in request.query.values_mut() {
            *value = self.resolve(value);
        }
    }

    /// Keys of placeholders left in place so far, one entry per occurrence.
    pub fn unresolved(&self) -> &[String] {
        &self.unresolved
    }

    pub fn into_unresolved(self) -> Vec<String> {
        self.unresolved
    }

    fn substitute_session(&mut self, input: &str) -> String {
        let mut output = String::with_capacity(input.len());
        let mut last = 0;
        for captures in PLACEHOLDER.captures_iter(input) {
            let (Some(whole), Some(key)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            output.push_str(&input[last..whole.start()]);
            match self.session.get(key.as_str()) {
                Some(value) => output.push_str(&value),
                None => {
                    warn!(
                        "unable to resolve placeholder {} from session, leaving it in place",
                        whole.as_str()
                    );
                    self.unresolved.push(key.as_str().to_string());
                    output.push_str(whole.as_str());
                }
            }
            last = whole.end();
        }
        output.push_str(&input[last..]);
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpMethod;

    fn session(pairs: &[(&str, &str)]) -> Session {
        let mut session = Session::isolated();
        session.extend(pairs.iter().copied());
        session
    }

    #[test]
    fn replaces_every_placeholder_left_to_right() {
        let session = session(&[("with", "W"), ("place", "P")]);
        assert_eq!(
            resolve("a ${with} b ${place}c ${with} d", &session),
            "a W b Pc W d"
        );
    }

    #[test]
    fn text_without_placeholders_is_unchanged() {
        let session = session(&[("with", "W")]);
        let input = "some text without placeholders {not} $ {either}";
        assert_eq!(resolve(input, &session), input);
        assert_eq!(resolve(&resolve(input, &session), &session), input);
    }

    #[test]
    fn unknown_placeholder_is_kept_and_recorded() {
        let session = session(&[("known", "K")]);
        let mut resolver = Resolver::new(&session);
        let output = resolver.resolve("${known}/${STEPRUN_SURELY_UNSET_KEY}");
        assert_eq!(output, "K/${STEPRUN_SURELY_UNSET_KEY}");
        assert_eq!(resolver.unresolved(), ["STEPRUN_SURELY_UNSET_KEY"]);
    }

    #[test]
    fn braces_match_non_greedily() {
        let session = session(&[("a", "1"), ("b", "2")]);
        assert_eq!(resolve("${a}}{${b}", &session), "1}{2");
    }

    #[test]
    fn substituted_values_are_not_rescanned() {
        let session = session(&[("outer", "${inner}"), ("inner", "deep")]);
        assert_eq!(resolve("x=${outer}", &session), "x=${inner}");
    }

    #[test]
    fn each_random_token_gets_a_fresh_uuid() {
        let output = substitute_random("${randomUUID}|${randomUUID}");
        let parts: Vec<&str> = output.split('|').collect();
        assert_eq!(parts.len(), 2);
        let first = Uuid::parse_str(parts[0]).unwrap();
        let second = Uuid::parse_str(parts[1]).unwrap();
        assert_ne!(first, second);
        assert_eq!(first.get_version_num(), 4);
    }

    #[test]
    fn random_token_ignores_session() {
        let session = session(&[("randomUUID", "fixed")]);
        let output = resolve("${randomUUID}", &session);
        assert_ne!(output, "fixed");
        assert!(Uuid::parse_str(&output).is_ok());
    }

    #[test]
    fn resolves_request_fields_but_not_headers() {
        let session = session(&[("id", "42"), ("base", "http://localhost:3000"), ("q", "v")]);
        let mut request = Request::new(HttpMethod::Put, "/posts/${id}")
            .with_host("${base}")
            .with_body(r#"{"id":"${id}"}"#)
            .with_query("filter", "${q}")
            .with_header("x-id", "${id}");

        Resolver::new(&session).resolve_request(&mut request);

        assert_eq!(request.path, "/posts/42");
        assert_eq!(request.host.as_deref(), Some("http://localhost:3000"));
        assert_eq!(request.body, r#"{"id":"42"}"#);
        assert_eq!(request.query["filter"], "v");
        assert_eq!(request.headers.get("x-id"), Some("${id}"));
    }
}
