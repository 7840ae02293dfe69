//! Settings command - shows or updates a user's timer settings.

use anyhow::Result;
use clap::Args;
use console::Style;
use tempo_engine::{AutoTransitionRequest, EngineError, SettingsView, UpdateSettingsRequest};
use tempo_types::{
    DEFAULT_LONG_BREAK_MINUTES, DEFAULT_POMODORO_MINUTES, DEFAULT_SHORT_BREAK_MINUTES, UserKey,
};

use super::{Context, format_clock, print_json};

/// Arguments for the settings command.
///
/// With no flags the current settings are shown. Durations not given keep
/// their current value (or the default for a new user).
#[derive(Args, Debug)]
pub struct SettingsArgs {
    /// User whose settings to show or change
    #[arg(short, long)]
    pub user: u64,

    /// Work interval in minutes (1-60)
    #[arg(long)]
    pub pomodoro: Option<i64>,

    /// Short break in minutes (1-60)
    #[arg(long)]
    pub short_break: Option<i64>,

    /// Long break in minutes (1-60)
    #[arg(long)]
    pub long_break: Option<i64>,

    /// Move to the next phase automatically when one ends
    #[arg(long)]
    pub auto_transition: Option<bool>,
}

/// Run the settings command.
pub async fn run(args: SettingsArgs, ctx: &Context) -> Result<()> {
    let api = ctx.open_api()?;
    let user = UserKey(args.user);

    let current = match api.get_settings(user).await {
        Ok(settings) => Some(settings),
        Err(EngineError::NotFound(_)) => None,
        Err(e) => return Err(e.into()),
    };

    let durations_given =
        args.pomodoro.is_some() || args.short_break.is_some() || args.long_break.is_some();

    let settings = match (durations_given, args.auto_transition, current) {
        (false, None, Some(current)) => current,
        (false, None, None) => return Err(EngineError::NotFound(user).into()),
        (false, Some(enabled), Some(_)) => {
            api.update_auto_transition(
                user,
                AutoTransitionRequest {
                    auto_transition: Some(enabled),
                },
            )
            .await?
        }
        (_, auto_transition, current) => {
            let request = UpdateSettingsRequest {
                pomodoro: Some(args.pomodoro.unwrap_or_else(|| {
                    current.as_ref().map_or(DEFAULT_POMODORO_MINUTES, |c| c.pomodoro).into()
                })),
                short_break: Some(args.short_break.unwrap_or_else(|| {
                    current
                        .as_ref()
                        .map_or(DEFAULT_SHORT_BREAK_MINUTES, |c| c.short_break)
                        .into()
                })),
                long_break: Some(args.long_break.unwrap_or_else(|| {
                    current
                        .as_ref()
                        .map_or(DEFAULT_LONG_BREAK_MINUTES, |c| c.long_break)
                        .into()
                })),
                auto_transition: Some(
                    auto_transition
                        .or(current.as_ref().map(|c| c.auto_transition))
                        .unwrap_or(false),
                ),
            };
            api.update_settings(user, request).await?
        }
    };
    api.engine().shutdown().await;

    if ctx.json_output {
        print_json(&settings)
    } else {
        print_settings(args.user, &settings);
        Ok(())
    }
}

fn print_settings(user: u64, settings: &SettingsView) {
    let dim = Style::new().dim();
    println!();
    println!("{}", console::style(format!("Settings for user {user}")).bold());
    println!("{}", dim.apply_to("─".repeat(40)));
    println!("  {} {} min", dim.apply_to("Pomodoro:   "), settings.pomodoro);
    println!("  {} {} min", dim.apply_to("Short break:"), settings.short_break);
    println!("  {} {} min", dim.apply_to("Long break: "), settings.long_break);
    println!(
        "  {} {}",
        dim.apply_to("Auto:       "),
        if settings.auto_transition { "on" } else { "off" }
    );
    println!(
        "  {} {} ({}, {})",
        dim.apply_to("Timer:      "),
        settings.current_phase,
        format_clock(settings.remaining_time),
        if settings.is_running { "running" } else { "stopped" }
    );
    println!();
}
