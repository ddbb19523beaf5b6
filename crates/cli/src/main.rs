mod cmd;
mod util;

use std::path::PathBuf;

use anyhow::Result;
use argp::FromArgs;
use tracing_subscriber::{EnvFilter, filter::LevelFilter};

#[derive(FromArgs, PartialEq, Debug)]
/// Operator tools for the wpt.fyi checks service.
struct TopLevel {
    #[argp(subcommand)]
    command: SubCommand,
    #[argp(option, short = 'c', default = "PathBuf::from(\"config.yml\")")]
    /// path to the service configuration
    config: PathBuf,
}

#[derive(FromArgs, PartialEq, Debug)]
#[argp(subcommand)]
enum SubCommand {
    Flag(cmd::flag::Args),
    Secret(cmd::secret::Args),
    Pending(cmd::pending::Args),
    Route(cmd::route::Args),
    Run(cmd::run::Args),
}

#[tokio::main]
async fn main() {
    let env_filter =
        EnvFilter::builder().with_default_directive(LevelFilter::INFO.into()).from_env_lossy();
    tracing_subscriber::fmt().with_env_filter(env_filter).with_writer(std::io::stderr).init();

    let args: TopLevel = argp::parse_args_or_exit(argp::DEFAULT);
    if let Err(e) = run(args).await {
        eprintln!("Failed: {e:?}");
        std::process::exit(1);
    }
}

async fn run(args: TopLevel) -> Result<()> {
    let config = util::load_config(&args.config)?;
    match args.command {
        SubCommand::Flag(c_args) => cmd::flag::run(c_args, &config).await,
        SubCommand::Secret(c_args) => cmd::secret::run(c_args, &config).await,
        SubCommand::Pending(c_args) => cmd::pending::run(c_args, &config).await,
        SubCommand::Route(c_args) => cmd::route::run(c_args, &config).await,
        SubCommand::Run(c_args) => cmd::run::run(c_args, &config).await,
    }
}
