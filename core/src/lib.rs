//! Sequential HTTP test steps sharing one session.
//!
//! # Overview
//! A `Step` is a request template with pre-processors, post-processors and
//! assertions. A `Client` runs steps in order against one `Session`, so a
//! value extracted from one response (an id, a token) can be substituted into
//! later requests through `${key}` placeholders.
//!
//! # Design
//! - The network sits behind the `Transport` trait; the core only builds
//!   `HttpRequest`s and reads `HttpResponse`s. `UreqTransport` is the default.
//! - Pre-processor failures are soft (logged and kept as warnings);
//!   post-processor and assertion failures end the step, and the first failed
//!   step ends the run.
//! - Everything runs on the caller's thread. No retries, no parallelism.

pub mod assertion;
pub mod client;
pub mod error;
pub mod extract;
pub mod http;
pub mod processor;
pub mod registry;
pub mod request;
pub mod resolve;
pub mod runner;
pub mod session;
pub mod step;
pub mod transport;

pub use assertion::{Assertion, NotFound, Status, Success};
pub use client::Client;
pub use error::{Phase, ProcessorError, RunError, StepError, TransportError, UnknownStep};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use processor::{
    Extract, JwtAuth, LogPayload, LogStep, Named, PostProcessor, PreProcessor, SetHeader,
    UpdateSession,
};
pub use registry::Registry;
pub use request::{Headers, Request};
pub use resolve::{resolve, Resolver};
pub use runner::{build_http_request, Warning, HOST_KEY};
pub use session::{EnvSource, Session, Source};
pub use step::Step;
pub use transport::{Transport, UreqTransport};
