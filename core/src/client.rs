//! The sequencer: runs steps in order against one session.
//!
//! # Design
//! `Client` owns the session, the global processor lists and the transport.
//! `run` executes steps strictly in the order given and stops at the first
//! failing step; nothing after it is attempted. There is no scheduling, no
//! concurrency and no retry.
//!
//! `run` takes `&mut self`, so one client (and therefore one session) can
//! only ever serve one run at a time.

use std::sync::Arc;

use log::{debug, info};

use crate::error::RunError;
use crate::http::HttpResponse;
use crate::processor::{PostProcessor, PreProcessor};
use crate::runner::{Failed, StepRunner, Warning};
use crate::session::Session;
use crate::step::{SharedPostProcessor, SharedPreProcessor, Step};
use crate::transport::Transport;

pub struct Client<T> {
    transport: T,
    session: Session,
    pre_processors: Vec<SharedPreProcessor>,
    post_processors: Vec<SharedPostProcessor>,
    warnings: Vec<Warning>,
}

impl<T: Transport> Client<T> {
    /// Client with an empty session that falls back to the environment.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            session: Session::new(),
            pre_processors: Vec::new(),
            post_processors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn with_session(mut self, session: Session) -> Self {
        self.session = session;
        self
    }

    /// Register a pre-processor that runs before every step's own ones.
    pub fn with_pre_processor(mut self, processor: impl PreProcessor + 'static) -> Self {
        self.pre_processors.push(Arc::new(processor));
        self
    }

    /// Register a post-processor that runs before every step's own ones.
    pub fn with_post_processor(mut self, processor: impl PostProcessor + 'static) -> Self {
        self.post_processors.push(Arc::new(processor));
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Soft failures recorded by the most recent `run` or `run_step`.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Run `steps` in order, stopping at the first failure.
    ///
    /// On success, returns one response per step. On failure, the error holds
    /// the responses of the steps that succeeded before it.
    pub fn run(&mut self, steps: &[Step]) -> Result<Vec<HttpResponse>, RunError> {
        self.warnings.clear();
        let mut responses = Vec::with_capacity(steps.len());
        for (index, step) in steps.iter().enumerate() {
            debug!(
                "running step {index}: {} {}",
                step.request.method, step.request.path
            );
            match self.execute(index, step) {
                Ok(response) => responses.push(response),
                Err(Failed { error, response }) => {
                    info!("step {index} failed, stopping: {error}");
                    return Err(RunError {
                        index,
                        responses,
                        response,
                        source: error,
                    });
                }
            }
        }
        Ok(responses)
    }

    /// Run a single step.
    pub fn run_step(&mut self, step: &Step) -> Result<HttpResponse, RunError> {
        self.warnings.clear();
        self.execute(0, step).map_err(|Failed { error, response }| RunError {
            index: 0,
            responses: Vec::new(),
            response,
            source: error,
        })
    }

    fn execute(&mut self, index: usize, step: &Step) -> Result<HttpResponse, Failed> {
        StepRunner {
            transport: &self.transport,
            session: &mut self.session,
            pre_processors: &self.pre_processors,
            post_processors: &self.post_processors,
            warnings: &mut self.warnings,
            index,
        }
        .run(step)
    }
}
