//! `pk refresh`: fetch the first page through a [`ListFeed`] and report
//! what changed on screen.

use anyhow::Result;
use clap::Args;
use pagekeep_core::descriptor::OrderListDescriptor;
use pagekeep_core::{
    ChunkedSections, DiffResult, DiffStats, FeedSnapshot, ListFeed, WorkerPool, diff_snapshots,
};
use serde::Serialize;
use std::io::Write;
use std::sync::Arc;
use tracing::{info, warn};

use super::{RecordView, RowView, show, write_diff};
use crate::app::{App, ListArgs};
use crate::fixture::{DrainReport, Order};
use crate::output::{OutputMode, kv, render, section};

/// Drain/rebuild rounds before giving up on a source that keeps answering.
const MAX_ROUNDS: usize = 16;

#[derive(Args, Debug)]
pub struct RefreshArgs {
    #[command(flatten)]
    pub list: ListArgs,

    /// Diff plain item rows instead of sectioned rows.
    #[arg(long)]
    pub flat: bool,
}

#[derive(Debug, Serialize)]
pub struct UpdateView {
    pub generation: u64,
    pub stats: DiffStats,
}

#[derive(Debug, Serialize)]
pub struct RefreshReport {
    #[serde(flatten)]
    pub record: RecordView,
    pub rounds: usize,
    pub fetched: DrainReport,
    pub updates: Vec<UpdateView>,
    /// Net script from the cached snapshot to the final one.
    pub diff: DiffResult,
    pub rows: Vec<RowView>,
}

/// Call `round` until it reports a quiet pass or `max` rounds have run.
/// Returns the rounds used and whether the last one was quiet.
fn run_rounds(max: usize, mut round: impl FnMut() -> Result<bool>) -> Result<(usize, bool)> {
    for rounds in 1..=max {
        if round()? {
            return Ok((rounds, true));
        }
    }
    Ok((max, false))
}

/// Show `descriptor` in `feed`, then answer fetches and rebuild until the
/// source has nothing left to say.
fn drive<M: FeedSnapshot>(
    app: &App,
    feed: &ListFeed<OrderListDescriptor, M>,
    descriptor: OrderListDescriptor,
) -> Result<(usize, DrainReport, Vec<UpdateView>, DiffResult)> {
    let subscription = app.store.subscribe();
    feed.show(descriptor, true).wait()?;
    let before = feed.current();

    let mut fetched = DrainReport::default();
    let (rounds, settled) = run_rounds(MAX_ROUNDS, || {
        let report = app.source.drain(&app.store)?;
        fetched.absorb(&report);

        let rebuilds = feed.pump(&subscription);
        let scheduled = rebuilds.len();
        for rebuild in rebuilds {
            rebuild.wait()?;
        }
        Ok(!report.progressed() && scheduled == 0)
    })?;
    if !settled {
        warn!(rounds, "source still answering; stopped draining");
    }

    let mut updates = Vec::new();
    while let Some(update) = feed.try_next_update() {
        updates.push(UpdateView {
            generation: update.generation,
            stats: update.diff.stats(),
        });
    }

    let diff = match (before, feed.current()) {
        (Some(before), Some(after)) => diff_snapshots(before.as_ref(), after.as_ref()),
        (None, Some(after)) => DiffResult::replace(0, after.len()),
        (Some(before), None) => DiffResult::replace(before.len(), 0),
        (None, None) => DiffResult::default(),
    };
    Ok((rounds, fetched, updates, diff))
}

pub fn run_refresh(args: &RefreshArgs, output: OutputMode, app: &App) -> Result<()> {
    let pool = Arc::new(WorkerPool::new(app.config.worker_threads)?);
    let descriptor = args.list.descriptor();
    let store = Arc::clone(&app.store);
    let source = app.data_source();

    let (rounds, fetched, updates, diff) = if args.flat {
        let feed = ListFeed::new(pool, move |d: &OrderListDescriptor| {
            store.list_manager(d.clone(), Arc::clone(&source))
        });
        drive(app, &feed, descriptor.clone())?
    } else {
        let policy = ChunkedSections::new(app.config.section_chunk_size);
        let feed = ListFeed::new(pool, move |d: &OrderListDescriptor| {
            store.sectioned_list_manager::<OrderListDescriptor, Order>(
                d.clone(),
                Arc::clone(&source),
                &policy,
            )
        });
        drive(app, &feed, descriptor.clone())?
    };

    let record = app.store.record(&descriptor)?;
    info!(
        list_id = %record.id,
        rounds,
        pages = fetched.pages_applied,
        items = fetched.items_resolved,
        "refresh finished"
    );
    let report = RefreshReport {
        record: RecordView::from(&record),
        rounds,
        fetched,
        updates,
        diff,
        rows: show::collect(app, &args.list, args.flat)?.rows,
    };

    render(output, &report, |report, w| {
        section(w, "Refresh")?;
        report.record.write(w)?;
        kv(
            w,
            "fetched",
            format!(
                "{} page(s), {} order(s), {} missing",
                report.fetched.pages_applied,
                report.fetched.items_resolved,
                report.fetched.items_missing
            ),
        )?;
        kv(w, "updates", report.updates.len().to_string())?;
        write_diff(w, &report.diff)?;
        writeln!(w)?;
        for (position, row) in report.rows.iter().enumerate() {
            row.write(w, position)?;
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::Locations;
    use clap::Parser;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: RefreshArgs,
    }

    #[test]
    fn refresh_args_defaults() {
        let w = Wrapper::parse_from(["test"]);
        assert_eq!(w.args.list.page_size, pagekeep_core::descriptor::DEFAULT_PAGE_SIZE);
        assert!(!w.args.flat);
    }

    #[test]
    fn quiet_final_round_counts_as_settled() -> Result<()> {
        let mut calls = 0;
        let outcome = run_rounds(3, || {
            calls += 1;
            Ok(calls == 3)
        })?;
        assert_eq!(outcome, (3, true));
        Ok(())
    }

    #[test]
    fn busy_source_stops_at_the_cap_unsettled() -> Result<()> {
        let mut calls = 0;
        let outcome = run_rounds(3, || {
            calls += 1;
            Ok(false)
        })?;
        assert_eq!(outcome, (3, false));
        assert_eq!(calls, 3);
        Ok(())
    }

    #[test]
    fn drive_fetches_pages_and_resolves_items() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let fixture = dir.path().join("orders.json");
        std::fs::write(
            &fixture,
            r#"[{"id":1,"customer":"Ada","status":"pending"},
                {"id":2,"customer":"Bo","status":"pending"},
                {"id":3,"customer":"Cy","status":"completed"}]"#,
        )?;
        let app = App::open(&Locations {
            db: Some(dir.path().join("lists.sqlite3")),
            config: Some(dir.path().join("config.toml")),
            fixture: Some(fixture),
        })?;

        let pool = Arc::new(WorkerPool::new(1)?);
        let store = Arc::clone(&app.store);
        let source = app.data_source();
        let feed = ListFeed::new(pool, move |d: &OrderListDescriptor| {
            store.list_manager(d.clone(), Arc::clone(&source))
        });
        let descriptor = OrderListDescriptor::new(1).with_status("pending");
        let (rounds, fetched, updates, diff) = drive(&app, &feed, descriptor)?;

        assert!(rounds < MAX_ROUNDS);
        assert_eq!(fetched.pages_applied, 1);
        assert_eq!(fetched.pages_stale, 0);
        assert_eq!(fetched.items_resolved, 2);
        assert!(!updates.is_empty());
        assert_eq!(diff.stats().inserted, 2);
        let current = feed.current().expect("snapshot applied");
        assert!(current.iter().all(|item| !item.is_loading()));
        Ok(())
    }
}
