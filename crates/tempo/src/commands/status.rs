//! Status command - shows a user's timer.

use anyhow::Result;
use clap::Args;
use tempo_types::UserKey;

use super::{Context, print_json, print_status};

/// Arguments for the status command.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// User whose timer to show
    #[arg(short, long)]
    pub user: u64,
}

/// Run the status command.
pub async fn run(args: StatusArgs, ctx: &Context) -> Result<()> {
    let api = ctx.open_api()?;
    let status = api.get_status(UserKey(args.user)).await?;

    if ctx.json_output {
        print_json(&status)
    } else {
        print_status(args.user, &status);
        Ok(())
    }
}
