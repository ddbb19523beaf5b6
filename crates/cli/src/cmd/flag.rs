use anyhow::Result;
use argp::FromArgs;
use wpt_checks_core::{config::Config, models::Flag};
use wpt_checks_db::Database;

use crate::util::flag;

#[derive(FromArgs, PartialEq, Debug)]
/// Read or change feature flags.
#[argp(subcommand, name = "flag")]
pub struct Args {
    #[argp(subcommand)]
    command: SubCommand,
}

#[derive(FromArgs, PartialEq, Debug)]
#[argp(subcommand)]
enum SubCommand {
    Get(GetArgs),
    Set(SetArgs),
}

#[derive(FromArgs, PartialEq, Debug)]
/// Print flag values.
#[argp(subcommand, name = "get")]
struct GetArgs {
    #[argp(positional, from_str_fn(flag))]
    /// flag name (all flags if omitted)
    flag: Option<Flag>,
}

#[derive(FromArgs, PartialEq, Debug)]
/// Enable or disable a flag.
#[argp(subcommand, name = "set")]
struct SetArgs {
    #[argp(positional, from_str_fn(flag))]
    /// flag name
    flag: Flag,
    #[argp(positional)]
    /// true or false
    enabled: bool,
}

pub async fn run(args: Args, config: &Config) -> Result<()> {
    let db = Database::new(&config.db).await?;
    match args.command {
        SubCommand::Get(GetArgs { flag: Some(flag) }) => {
            println!("{}: {}", flag, db.get_flag(flag).await?);
        }
        SubCommand::Get(GetArgs { flag: None }) => {
            for (flag, enabled) in db.get_flags().await? {
                println!("{flag}: {enabled}");
            }
        }
        SubCommand::Set(SetArgs { flag, enabled }) => {
            db.set_flag(flag, enabled).await?;
            tracing::info!("Set {} to {}", flag, enabled);
        }
    }
    db.close().await;
    Ok(())
}
