//! Sequencer behaviour against an in-memory transport.
//!
//! The transport records every request it receives and answers through a
//! closure, so each test can check exactly what went on the wire and what
//! never did.

use std::cell::RefCell;
use std::sync::{Arc, Mutex};

use steprun_core::{
    Client, Extract, HttpRequest, HttpResponse, JwtAuth, NotFound, PostProcessor, PreProcessor,
    ProcessorError, Request, Session, SetHeader, Step, StepError, TransportError, Warning,
    HOST_KEY,
};

type Responder = Box<dyn Fn(&HttpRequest) -> Result<HttpResponse, TransportError>>;

struct RecordingTransport {
    sent: RefCell<Vec<HttpRequest>>,
    respond: Responder,
}

impl RecordingTransport {
    fn new(respond: impl Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + 'static) -> Self {
        Self {
            sent: RefCell::new(Vec::new()),
            respond: Box::new(respond),
        }
    }

    fn urls(&self) -> Vec<String> {
        self.sent.borrow().iter().map(|r| r.url.clone()).collect()
    }
}

impl steprun_core::Transport for RecordingTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.sent.borrow_mut().push(request.clone());
        (self.respond)(request)
    }
}

fn respond(status: u16, body: &str) -> Result<HttpResponse, TransportError> {
    Ok(HttpResponse {
        status,
        headers: vec![("content-type".to_string(), "application/json".to_string())],
        body: body.to_string(),
    })
}

/// Answers 500 on any path containing `/fail`, 200 with `{}` otherwise.
fn ok_unless_fail(request: &HttpRequest) -> Result<HttpResponse, TransportError> {
    if request.url.contains("/fail") {
        respond(500, "{}")
    } else {
        respond(200, "{}")
    }
}

fn client(transport: RecordingTransport) -> Client<RecordingTransport> {
    let mut session = Session::isolated();
    session.put(HOST_KEY, "https://api.example.com");
    Client::new(transport).with_session(session)
}

type Log = Arc<Mutex<Vec<&'static str>>>;

fn pre_marker(log: &Log, label: &'static str) -> impl PreProcessor + 'static {
    let log = Arc::clone(log);
    move |_: &mut Request, _: &mut Session| -> Result<(), ProcessorError> {
        log.lock().unwrap().push(label);
        Ok(())
    }
}

fn post_marker(log: &Log, label: &'static str) -> impl PostProcessor + 'static {
    let log = Arc::clone(log);
    move |_: &Request, _: &HttpResponse, _: &mut Session| -> Result<(), ProcessorError> {
        log.lock().unwrap().push(label);
        Ok(())
    }
}

fn assertion_marker(log: &Log, label: &'static str) -> impl Fn(&HttpResponse) -> bool + Send + Sync {
    let log = Arc::clone(log);
    move |_: &HttpResponse| {
        log.lock().unwrap().push(label);
        true
    }
}

#[test]
fn runs_every_step_in_order() {
    let mut client = client(RecordingTransport::new(ok_unless_fail));
    let responses = client
        .run(&[Step::get("/a"), Step::get("/b"), Step::get("/c")])
        .unwrap();

    assert_eq!(responses.len(), 3);
    assert_eq!(
        client.transport().urls(),
        [
            "https://api.example.com/a",
            "https://api.example.com/b",
            "https://api.example.com/c"
        ]
    );
}

#[test]
fn stops_at_first_failed_assertion() {
    let mut client = client(RecordingTransport::new(ok_unless_fail));
    let err = client
        .run(&[Step::get("/a"), Step::get("/fail"), Step::get("/c")])
        .unwrap_err();

    assert_eq!(err.index, 1);
    assert_eq!(err.responses.len(), 1);
    assert_eq!(err.responses[0].status, 200);
    assert_eq!(err.response.as_ref().map(|r| r.status), Some(500));
    assert!(matches!(
        err.source,
        StepError::Assertion { ref assertion, status: 500 } if assertion == "success"
    ));
    assert_eq!(client.transport().urls().len(), 2);
    assert!(!client.transport().urls().iter().any(|u| u.ends_with("/c")));
}

#[test]
fn transport_error_stops_run_without_response() {
    let transport = RecordingTransport::new(|request: &HttpRequest| {
        Err(TransportError::Request {
            url: request.url.clone(),
            message: "connection refused".to_string(),
        })
    });
    let mut client = client(transport);
    let err = client.run(&[Step::get("/a"), Step::get("/b")]).unwrap_err();

    assert_eq!(err.index, 0);
    assert!(err.responses.is_empty());
    assert!(err.response.is_none());
    assert!(matches!(err.source, StepError::Transport(_)));
    assert_eq!(client.transport().urls().len(), 1);
}

#[test]
fn missing_host_sends_nothing() {
    let mut client = Client::new(RecordingTransport::new(ok_unless_fail)).with_session(Session::isolated());
    let err = client.run(&[Step::get("/a")]).unwrap_err();

    assert!(matches!(err.source, StepError::MissingHost));
    assert!(client.transport().urls().is_empty());
}

#[test]
fn extracted_values_flow_into_later_steps() {
    let transport = RecordingTransport::new(|request: &HttpRequest| {
        if request.url.ends_with("/posts") {
            respond(201, r#"{"id": 101}"#)
        } else {
            respond(200, "{}")
        }
    });
    let mut client = client(transport);
    client
        .run(&[
            Step::post("/posts", r#"{"title":"t"}"#, "application/json")
                .with_post_processor(Extract::new("id", "id")),
            Step::get("/posts/${id}"),
        ])
        .unwrap();

    assert_eq!(client.session().get("id").as_deref(), Some("101"));
    assert_eq!(client.transport().urls()[1], "https://api.example.com/posts/101");
}

#[test]
fn body_gets_json_content_type() {
    let mut client = client(RecordingTransport::new(ok_unless_fail));
    client
        .run(&[Step::post("/posts", r#"{"title":"t"}"#, "")])
        .unwrap();

    let sent = client.transport().sent.borrow();
    assert_eq!(sent[0].header("Content-Type"), Some("application/json"));
    assert_eq!(sent[0].body.as_deref(), Some(r#"{"title":"t"}"#));
}

#[test]
fn processors_and_assertions_run_in_pipeline_order() {
    let log: Log = Arc::default();
    let mut client = client(RecordingTransport::new(ok_unless_fail))
        .with_pre_processor(pre_marker(&log, "global-pre"))
        .with_post_processor(post_marker(&log, "global-post"));

    let step = Step::get("/a")
        .with_pre_processor(pre_marker(&log, "step-pre"))
        .with_post_processor(post_marker(&log, "step-post"))
        .with_assertion(assertion_marker(&log, "assertion"));
    client.run(&[step]).unwrap();

    assert_eq!(
        *log.lock().unwrap(),
        ["global-pre", "step-pre", "global-post", "step-post", "assertion"]
    );
}

#[test]
fn step_pre_processor_overrides_global_header() {
    let mut client = client(RecordingTransport::new(ok_unless_fail))
        .with_pre_processor(SetHeader::new("X-Env", "global"))
        .with_pre_processor(SetHeader::new("X-Only-Global", "yes"));
    let step = Step::get("/a").with_pre_processor(SetHeader::new("x-env", "step"));
    client.run(&[step]).unwrap();

    let sent = client.transport().sent.borrow();
    assert_eq!(sent[0].header("x-env"), Some("step"));
    assert_eq!(sent[0].header("x-only-global"), Some("yes"));
}

#[test]
fn pre_processor_failure_is_only_a_warning() {
    let mut client = client(RecordingTransport::new(ok_unless_fail)).with_pre_processor(JwtAuth);
    let responses = client.run(&[Step::get("/me")]).unwrap();

    assert_eq!(responses.len(), 1);
    assert!(client.transport().sent.borrow()[0].header("authorization").is_none());
    assert_eq!(
        client.warnings(),
        [Warning::PreProcessor {
            step: 0,
            processor: "jwt-auth".to_string(),
            error: ProcessorError::MissingSessionKey("jwt_token".to_string()),
        }]
    );
}

#[test]
fn post_processor_failure_skips_rest_of_step() {
    let log: Log = Arc::default();
    let failing = |_: &Request, _: &HttpResponse, _: &mut Session| -> Result<(), ProcessorError> {
        Err(ProcessorError::msg("boom"))
    };
    let step = Step::get("/a")
        .with_post_processor(failing)
        .with_post_processor(post_marker(&log, "after"))
        .with_assertion(assertion_marker(&log, "assertion"));
    let mut client = client(RecordingTransport::new(ok_unless_fail));
    let err = client.run(&[step, Step::get("/b")]).unwrap_err();

    assert!(log.lock().unwrap().is_empty());
    assert!(matches!(err.source, StepError::PostProcessor { .. }));
    assert_eq!(err.response.map(|r| r.status), Some(200));
    assert_eq!(client.transport().urls().len(), 1);
}

#[test]
fn required_extraction_failure_fails_step() {
    let mut client = client(RecordingTransport::new(ok_unless_fail));
    let step = Step::get("/a").with_post_processor(Extract::new("id", "data.id").required());
    let err = client.run(&[step]).unwrap_err();

    match err.source {
        StepError::PostProcessor { processor, source } => {
            assert_eq!(processor, "extract(id <- data.id)");
            assert_eq!(
                source,
                ProcessorError::MissingPath {
                    path: "data.id".to_string()
                }
            );
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn unresolved_placeholder_is_sent_verbatim_and_recorded() {
    let mut client = client(RecordingTransport::new(ok_unless_fail));
    let step = Step::post("/a", r#"{"ref":"${steprun_unset_placeholder}"}"#, "");
    client.run(&[step]).unwrap();

    let sent = client.transport().sent.borrow();
    assert_eq!(
        sent[0].body.as_deref(),
        Some(r#"{"ref":"${steprun_unset_placeholder}"}"#)
    );
    assert_eq!(
        client.warnings(),
        [Warning::UnresolvedPlaceholder {
            step: 0,
            key: "steprun_unset_placeholder".to_string(),
        }]
    );
}

#[test]
fn warnings_reset_between_runs() {
    let mut client = client(RecordingTransport::new(ok_unless_fail)).with_pre_processor(JwtAuth);
    client.run(&[Step::get("/a")]).unwrap();
    assert_eq!(client.warnings().len(), 1);

    client.session_mut().put("jwt_token", "t");
    client.run(&[Step::get("/a")]).unwrap();
    assert!(client.warnings().is_empty());
}

#[test]
fn same_step_resolves_afresh_each_run() {
    let mut client = client(RecordingTransport::new(ok_unless_fail));
    let step = Step::post("/a", r#"{"nonce":"${randomUUID}"}"#, "");

    client.run_step(&step).unwrap();
    client.run_step(&step).unwrap();

    let sent = client.transport().sent.borrow();
    assert_ne!(sent[0].body, sent[1].body);
    assert!(!sent[0].body.as_deref().unwrap().contains("randomUUID"));
    assert_eq!(step.request.body, r#"{"nonce":"${randomUUID}"}"#);
}

#[test]
fn not_found_assertion_passes_on_404() {
    let transport = RecordingTransport::new(|_: &HttpRequest| respond(404, ""));
    let mut client = client(transport);
    let responses = client
        .run(&[Step::get("/posts/0").expecting(NotFound)])
        .unwrap();
    assert_eq!(responses[0].status, 404);
}
