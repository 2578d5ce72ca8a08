//! `pk clear`: drop cached lists and, for a full clear, cached orders.

use anyhow::Result;
use clap::Args;
use pagekeep_core::ListDescriptor;
use pagekeep_core::descriptor::OrderListDescriptor;
use serde::Serialize;

use crate::app::App;
use crate::output::{OutputMode, kv, render, section};

#[derive(Args, Debug, Default)]
pub struct ClearArgs {
    /// Only drop the order lists of this site; cached orders are kept.
    #[arg(long)]
    pub site: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ClearReport {
    pub lists_removed: usize,
    pub orders_removed: usize,
}

pub fn run_clear(args: &ClearArgs, output: OutputMode, app: &App) -> Result<()> {
    let report = match args.site {
        Some(site) => ClearReport {
            lists_removed: app
                .store
                .remove_lists_of_type(OrderListDescriptor::new(site).type_id())?,
            orders_removed: 0,
        },
        None => ClearReport {
            lists_removed: app.store.remove_all()?,
            orders_removed: app.source.clear_cache()?,
        },
    };

    render(output, &report, |report, w| {
        section(w, "Clear")?;
        kv(w, "lists", report.lists_removed.to_string())?;
        kv(w, "orders", report.orders_removed.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: ClearArgs,
    }

    #[test]
    fn clear_args_default_to_everything() {
        let w = Wrapper::parse_from(["test"]);
        assert!(w.args.site.is_none());
    }

    #[test]
    fn clear_args_site() {
        let w = Wrapper::parse_from(["test", "--site", "9"]);
        assert_eq!(w.args.site, Some(9));
    }
}
