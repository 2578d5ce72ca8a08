//! `pk show`: print the cached list, resolving missing orders once.

use anyhow::Result;
use clap::Args;
use pagekeep_core::ChunkedSections;
use serde::Serialize;
use std::io::Write;

use super::{RecordView, RowView};
use crate::app::{App, ListArgs};
use crate::output::{OutputMode, kv, render, section};

#[derive(Args, Debug)]
pub struct ShowArgs {
    #[command(flatten)]
    pub list: ListArgs,

    /// Print items without section headers.
    #[arg(long)]
    pub flat: bool,
}

#[derive(Debug, Serialize)]
pub struct ShowReport {
    #[serde(flatten)]
    pub record: RecordView,
    pub size: usize,
    pub rows: Vec<RowView>,
}

/// Build the rows for the current snapshot of `list`.
///
/// Orders missing from the local cache are requested by the snapshot
/// build; when the fixture can answer them the snapshot is built again.
pub fn collect(app: &App, list: &ListArgs, flat: bool) -> Result<ShowReport> {
    let report = build(app, list, flat)?;
    if app.source.pending_requests() == 0 {
        return Ok(report);
    }
    if app.source.drain(&app.store)?.progressed() {
        return build(app, list, flat);
    }
    Ok(report)
}

fn build(app: &App, list: &ListArgs, flat: bool) -> Result<ShowReport> {
    let descriptor = list.descriptor();
    if flat {
        let snapshot = app.store.list_manager(descriptor, app.data_source())?;
        return Ok(ShowReport {
            record: RecordView::from(snapshot.record()),
            size: snapshot.size(),
            rows: snapshot.iter().map(RowView::from_item).collect(),
        });
    }

    let policy = ChunkedSections::new(app.config.section_chunk_size);
    let snapshot = app
        .store
        .sectioned_list_manager(descriptor, app.data_source(), &policy)?;
    Ok(ShowReport {
        record: RecordView::from(snapshot.record()),
        size: snapshot.size(),
        rows: snapshot.iter().map(RowView::from_entry).collect(),
    })
}

pub fn run_show(args: &ShowArgs, output: OutputMode, app: &App) -> Result<()> {
    let report = collect(app, &args.list, args.flat)?;
    render(output, &report, |report, w| {
        section(w, "Orders")?;
        report.record.write(w)?;
        kv(w, "rows", report.size.to_string())?;
        writeln!(w)?;
        if report.rows.is_empty() {
            writeln!(w, "(empty; run `pk refresh` to fetch the first page)")?;
        }
        for (position, row) in report.rows.iter().enumerate() {
            row.write(w, position)?;
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: ShowArgs,
    }

    #[test]
    fn show_args_defaults() {
        let w = Wrapper::parse_from(["test"]);
        assert_eq!(w.args.list.site, 1);
        assert!(w.args.list.status.is_none());
        assert!(!w.args.flat);
    }

    #[test]
    fn show_args_filter_and_flat() {
        let w = Wrapper::parse_from(["test", "--site", "4", "-s", "completed", "--flat"]);
        assert_eq!(w.args.list.site, 4);
        assert_eq!(w.args.list.status.as_deref(), Some("completed"));
        assert!(w.args.flat);
    }
}
