//! Pass/fail predicates over a completed response.

use std::any::type_name;

use crate::http::HttpResponse;

/// Boolean check over a response. Never mutates anything.
///
/// Any `Fn(&HttpResponse) -> bool` closure is an assertion; wrap it in
/// `Named` to give it a readable name in failure messages.
pub trait Assertion: Send + Sync {
    fn name(&self) -> String {
        type_name::<Self>().to_string()
    }

    fn check(&self, response: &HttpResponse) -> bool;
}

impl<F> Assertion for F
where
    F: Fn(&HttpResponse) -> bool + Send + Sync,
{
    fn check(&self, response: &HttpResponse) -> bool {
        self(response)
    }
}

/// Status in `200..=299`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Success;

impl Assertion for Success {
    fn name(&self) -> String {
        "success".to_string()
    }

    fn check(&self, response: &HttpResponse) -> bool {
        (200..=299).contains(&response.status)
    }
}

/// Status is exactly 404.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotFound;

impl Assertion for NotFound {
    fn name(&self) -> String {
        "not-found".to_string()
    }

    fn check(&self, response: &HttpResponse) -> bool {
        response.status == 404
    }
}

/// Status equals the wrapped code.
#[derive(Debug, Clone, Copy)]
pub struct Status(pub u16);

impl Assertion for Status {
    fn name(&self) -> String {
        format!("status-{}", self.0)
    }

    fn check(&self, response: &HttpResponse) -> bool {
        response.status == self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::Named;

    fn response(status: u16) -> HttpResponse {
        HttpResponse {
            status,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    #[test]
    fn success_accepts_2xx_only() {
        assert!(Success.check(&response(200)));
        assert!(Success.check(&response(204)));
        assert!(Success.check(&response(299)));
        assert!(!Success.check(&response(199)));
        assert!(!Success.check(&response(300)));
        assert!(!Success.check(&response(404)));
    }

    #[test]
    fn not_found_accepts_404_only() {
        assert!(NotFound.check(&response(404)));
        assert!(!NotFound.check(&response(200)));
        assert!(!NotFound.check(&response(410)));
    }

    #[test]
    fn status_matches_exact_code() {
        assert!(Status(201).check(&response(201)));
        assert!(!Status(201).check(&response(200)));
        assert_eq!(Status(201).name(), "status-201");
    }

    #[test]
    fn closures_are_assertions() {
        let has_body = |r: &HttpResponse| !r.body.is_empty();
        assert!(!has_body.check(&response(200)));

        let named = Named::new("has-body", has_body);
        assert_eq!(Assertion::name(&named), "has-body");
    }
}
