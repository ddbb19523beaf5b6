use anyhow::Result;
use argp::FromArgs;
use wpt_checks_core::{config::Config, models::ProductSpec, short_sha};
use wpt_checks_db::Database;

use crate::util::{product, sha};

#[derive(FromArgs, PartialEq, Debug)]
/// Record or list stored test runs.
#[argp(subcommand, name = "run")]
pub struct Args {
    #[argp(subcommand)]
    command: SubCommand,
}

#[derive(FromArgs, PartialEq, Debug)]
#[argp(subcommand)]
enum SubCommand {
    Add(AddArgs),
    List(ListArgs),
}

#[derive(FromArgs, PartialEq, Debug)]
/// Record a test run whose results are available for a commit.
#[argp(subcommand, name = "add")]
struct AddArgs {
    #[argp(positional, from_str_fn(sha))]
    /// full commit SHA
    sha: String,
    #[argp(positional, from_str_fn(product))]
    /// product spec, e.g. chrome-89[experimental]
    product: ProductSpec,
}

#[derive(FromArgs, PartialEq, Debug)]
/// List stored test runs for a commit, grouped by browser.
#[argp(subcommand, name = "list")]
struct ListArgs {
    #[argp(positional, from_str_fn(sha))]
    /// full commit SHA
    sha: String,
}

pub async fn run(args: Args, config: &Config) -> Result<()> {
    let db = Database::new(&config.db).await?;
    match args.command {
        SubCommand::Add(AddArgs { sha, product }) => {
            let id = db.insert_test_run(&sha, &product).await?;
            tracing::info!("Stored run {} of {} for {}", id, product, short_sha(&sha));
        }
        SubCommand::List(ListArgs { sha }) => {
            for group in db.load_test_runs(&[], &sha).await? {
                for run in &group.runs {
                    println!("{:>6}  {:<32} created={}", run.id, run.spec, run.created_at.unix_timestamp());
                }
            }
        }
    }
    db.close().await;
    Ok(())
}
