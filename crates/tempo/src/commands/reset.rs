//! Reset command - zeroes a user's completed-interval counter.

use anyhow::Result;
use clap::Args;
use tempo_types::UserKey;

use super::{Context, print_json, print_status};

/// Arguments for the reset command.
#[derive(Args, Debug)]
pub struct ResetArgs {
    /// User whose counter to reset
    #[arg(short, long)]
    pub user: u64,
}

/// Run the reset command.
pub async fn run(args: ResetArgs, ctx: &Context) -> Result<()> {
    let api = ctx.open_api()?;
    let status = api.reset_completed(UserKey(args.user)).await?;
    api.engine().shutdown().await;

    if ctx.json_output {
        print_json(&status)
    } else {
        print_status(args.user, &status);
        Ok(())
    }
}
