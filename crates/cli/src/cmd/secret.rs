use std::io::{BufRead, stdin};

use anyhow::{Context, Result, ensure};
use argp::FromArgs;
use wpt_checks_core::config::Config;
use wpt_checks_db::Database;
use wpt_checks_dispatch::ports::WEBHOOK_SECRET_NAME;

#[derive(FromArgs, PartialEq, Debug)]
/// Store a secret, read from the first line of stdin.
#[argp(subcommand, name = "secret")]
pub struct Args {
    #[argp(option, short = 'n', default = "WEBHOOK_SECRET_NAME.to_string()")]
    /// secret name (defaults to the webhook secret)
    name: String,
}

pub async fn run(args: Args, config: &Config) -> Result<()> {
    let mut value = String::new();
    stdin().lock().read_line(&mut value).context("Failed to read secret from stdin")?;
    let value = value.trim_end_matches(['\r', '\n']);
    ensure!(!value.is_empty(), "Refusing to store an empty secret");
    let db = Database::new(&config.db).await?;
    db.set_secret(&args.name, value).await?;
    tracing::info!("Stored secret {}", args.name);
    db.close().await;
    Ok(())
}
