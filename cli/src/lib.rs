//! Command-line front end for running registered steps.
//!
//! # Design
//! Flags are parsed into `Cli`, which is turned into an explicit `RunConfig`
//! (verbosity, timeout) instead of process-wide state. `execute` does the
//! actual work against any `Transport`, so it can be exercised without a
//! network; the binary only wires it to `UreqTransport` and the demo steps.

pub mod demo;

use std::time::Duration;

use clap::Parser;
use log::{debug, info, LevelFilter};
use steprun_core::{Client, HttpResponse, Registry, RunError, Transport, UnknownStep};
use thiserror::Error;

#[derive(Debug, Parser)]
#[command(name = "steprun", about = "Run named HTTP steps in order against one session")]
pub struct Cli {
    /// Seed a session entry. Repeatable.
    #[arg(short = 's', value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub session: Vec<(String, String)>,

    /// 0 = response payloads only, 1 = info, 2 or more = debug.
    #[arg(short = 'v', value_name = "LEVEL", default_value_t = 1)]
    pub verbose: u8,

    /// Give up on a request after this many seconds.
    #[arg(short = 't', long = "timeout", value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Registered steps to run, in order.
    pub steps: Vec<String>,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("invalid format `{raw}`, expected key=value")),
    }
}

/// Settings that shape a run, derived from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunConfig {
    pub verbosity: u8,
    pub timeout: Option<Duration>,
}

impl RunConfig {
    pub fn level_filter(&self) -> LevelFilter {
        match self.verbosity {
            0 => LevelFilter::Error,
            1 => LevelFilter::Info,
            _ => LevelFilter::Debug,
        }
    }
}

impl From<&Cli> for RunConfig {
    fn from(cli: &Cli) -> Self {
        Self {
            verbosity: cli.verbose,
            timeout: cli.timeout.map(Duration::from_secs),
        }
    }
}

/// Install the stdout logger for `config`. Later calls are no-ops.
pub fn init_logging(config: &RunConfig) {
    let _ = env_logger::Builder::new()
        .filter_level(config.level_filter())
        .target(env_logger::Target::Stdout)
        .format_target(false)
        .try_init();
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    UnknownStep(#[from] UnknownStep),

    #[error(transparent)]
    Run(#[from] RunError),
}

#[derive(Debug)]
pub enum Outcome {
    /// No steps were requested; these are the registered names.
    Listed(Vec<String>),
    /// Every requested step succeeded.
    Completed(Vec<HttpResponse>),
}

/// Seed the session from `-s` pairs and run the requested steps in order.
///
/// Unknown step names are rejected before anything is sent.
pub fn execute<T: Transport>(
    cli: &Cli,
    registry: &Registry,
    client: &mut Client<T>,
) -> Result<Outcome, CliError> {
    if cli.steps.is_empty() {
        info!("No step(s) provided. Please provide at least one step");
        let names = registry.names().into_iter().map(str::to_string).collect();
        return Ok(Outcome::Listed(names));
    }

    client.session_mut().extend(cli.session.iter().cloned());
    let steps = registry.select(&cli.steps)?;

    debug!(
        "executing steps {:?} with session {:?}",
        cli.steps,
        client.session()
    );
    let responses = client.run(&steps)?;
    Ok(Outcome::Completed(responses))
}
