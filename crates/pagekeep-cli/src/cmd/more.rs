//! `pk more`: fetch the page after the cached index.

use anyhow::Result;
use clap::Args;
use pagekeep_core::{DiffResult, diff_snapshots};
use serde::Serialize;
use tracing::debug;

use super::{RecordView, write_diff};
use crate::app::{App, ListArgs};
use crate::output::{OutputMode, kv, render, section};

#[derive(Args, Debug)]
pub struct MoreArgs {
    #[command(flatten)]
    pub list: ListArgs,

    /// Keep loading until the source reports the last page.
    #[arg(long)]
    pub all: bool,
}

#[derive(Debug, Serialize)]
pub struct MoreReport {
    #[serde(flatten)]
    pub record: RecordView,
    pub pages_requested: usize,
    pub size_before: usize,
    pub size_after: usize,
    pub diff: DiffResult,
}

pub fn run_more(args: &MoreArgs, output: OutputMode, app: &App) -> Result<()> {
    let descriptor = args.list.descriptor();
    let before = app.store.list_manager(descriptor.clone(), app.data_source())?;

    let mut pages_requested = 0;
    loop {
        let snapshot = app.store.list_manager(descriptor.clone(), app.data_source())?;
        if !snapshot.load_more()? {
            break;
        }
        pages_requested += 1;
        let report = app.source.drain(&app.store)?;
        debug!(?report, "answered load-more");
        if !args.all || report.pages_failed > 0 {
            break;
        }
    }

    // Orders for the new rows are requested by the next build.
    let mut after = app.store.list_manager(descriptor.clone(), app.data_source())?;
    if app.source.pending_requests() > 0 && app.source.drain(&app.store)?.progressed() {
        after = app.store.list_manager(descriptor, app.data_source())?;
    }

    let report = MoreReport {
        record: RecordView::from(after.record()),
        pages_requested,
        size_before: before.size(),
        size_after: after.size(),
        diff: diff_snapshots(&before, &after),
    };
    render(output, &report, |report, w| {
        section(w, "Load more")?;
        report.record.write(w)?;
        kv(w, "pages", report.pages_requested.to_string())?;
        kv(
            w,
            "rows",
            format!("{} -> {}", report.size_before, report.size_after),
        )?;
        if report.pages_requested == 0 {
            kv(w, "note", "nothing to load (in flight, never fetched, or at the end)")?;
        }
        write_diff(w, &report.diff)
    })
}
