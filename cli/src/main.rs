use anyhow::Context;
use clap::Parser;
use log::info;
use steprun_cli::{demo, execute, init_logging, Cli, Outcome, RunConfig};
use steprun_core::{Client, JwtAuth, LogStep, UreqTransport};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = RunConfig::from(&cli);
    init_logging(&config);

    let registry = demo::registry();
    let mut client = Client::new(UreqTransport::with_timeout(config.timeout))
        .with_session(demo::session())
        .with_pre_processor(JwtAuth)
        .with_post_processor(LogStep);

    match execute(&cli, &registry, &mut client).context("run aborted")? {
        Outcome::Listed(names) => {
            println!("No step(s) provided. Registered steps:");
            for name in names {
                println!("  {name}");
            }
        }
        Outcome::Completed(responses) => info!("{} step(s) succeeded", responses.len()),
    }
    Ok(())
}
