use anyhow::Result;
use argp::FromArgs;
use wpt_checks_core::{config::Config, short_sha};
use wpt_checks_db::Database;

#[derive(FromArgs, PartialEq, Debug)]
/// List commit/product pairs queued for results processing.
#[argp(subcommand, name = "pending")]
pub struct Args {}

pub async fn run(_args: Args, config: &Config) -> Result<()> {
    let db = Database::new(&config.db).await?;
    let pending = db.get_pending_results().await?;
    for result in &pending {
        println!(
            "{}  {:<32} attempts={}  updated={}",
            short_sha(&result.sha),
            result.product,
            result.attempts,
            result.updated_at
        );
    }
    tracing::info!("{} pending", pending.len());
    db.close().await;
    Ok(())
}
