//! `pk prune`: drop lists untouched for longer than the configured age.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::time::Duration;

use crate::app::App;
use crate::output::{OutputMode, kv, render, section};

#[derive(Args, Debug, Default)]
pub struct PruneArgs {
    /// Override `max_list_age_days` from config.
    #[arg(long)]
    pub max_age_days: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct PruneReport {
    pub max_age_days: u32,
    pub lists_removed: usize,
}

pub fn run_prune(args: &PruneArgs, output: OutputMode, app: &App) -> Result<()> {
    let max_age_days = args.max_age_days.unwrap_or(app.config.max_list_age_days);
    let max_age = Duration::from_secs(u64::from(max_age_days) * 24 * 60 * 60);
    let report = PruneReport {
        max_age_days,
        lists_removed: app.store.remove_expired(max_age)?,
    };

    render(output, &report, |report, w| {
        section(w, "Prune")?;
        kv(w, "max age", format!("{} day(s)", report.max_age_days))?;
        kv(w, "lists", report.lists_removed.to_string())
    })
}
