#![forbid(unsafe_code)]

mod app;
mod cmd;
mod fixture;
mod output;

use app::{App, Locations};
use clap::{Parser, Subcommand};
use output::{CliError, OutputMode, render_error};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "pk: page through a cached, diffable order list",
    long_about = None
)]
struct Cli {
    /// Path to the list database.
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Path to the TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// JSON file of orders standing in for the remote service.
    #[arg(long, global = true)]
    fixture: Option<PathBuf>,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    const fn output_mode(&self) -> OutputMode {
        OutputMode::from_json_flag(self.json)
    }

    fn locations(&self) -> Locations {
        Locations {
            db: self.db.clone(),
            config: self.config.clone(),
            fixture: self.fixture.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Show the cached list",
        long_about = "Show the cached list for a site and status filter, resolving missing orders once.",
        after_help = "EXAMPLES:\n    # Sectioned rows for site 1\n    pk show\n\n    # Completed orders, no section headers\n    pk show --status completed --flat\n\n    # Emit machine-readable output\n    pk show --json"
    )]
    Show(cmd::show::ShowArgs),

    #[command(
        about = "Fetch the first page",
        long_about = "Fetch the first page from the fixture and print what changed on screen.",
        after_help = "EXAMPLES:\n    # Refresh site 1 from a fixture file\n    pk --fixture orders.json refresh\n\n    # Refresh a filtered list with small pages\n    pk --fixture orders.json refresh --status pending --page-size 5"
    )]
    Refresh(cmd::refresh::RefreshArgs),

    #[command(
        about = "Fetch the next page",
        long_about = "Fetch the page after the cached index and print the diff.",
        after_help = "EXAMPLES:\n    # One more page\n    pk --fixture orders.json more\n\n    # Everything that is left\n    pk --fixture orders.json more --all"
    )]
    More(cmd::more::MoreArgs),

    #[command(
        about = "Drop cached lists",
        long_about = "Drop every cached list and cached order, or only the lists of one site.",
        after_help = "EXAMPLES:\n    # Drop everything\n    pk clear\n\n    # Drop site 2's lists\n    pk clear --site 2"
    )]
    Clear(cmd::clear::ClearArgs),

    #[command(
        about = "Drop stale lists",
        long_about = "Drop lists that have not been touched within the maximum age.",
        after_help = "EXAMPLES:\n    # Use max_list_age_days from config\n    pk prune\n\n    # Drop anything older than a week\n    pk prune --max-age-days 7"
    )]
    Prune(cmd::prune::PruneArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("PAGEKEEP_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "pagekeep=debug,pk=debug,info"
        } else {
            "pagekeep=info,pk=info,warn"
        })
    });

    let format = env::var("PAGEKEEP_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let output = cli.output_mode();
    let app = App::open(&cli.locations())?;
    debug!(db = %app.db_path.display(), "store ready");

    match &cli.command {
        Commands::Show(args) => cmd::show::run_show(args, output, &app),
        Commands::Refresh(args) => cmd::refresh::run_refresh(args, output, &app),
        Commands::More(args) => cmd::more::run_more(args, output, &app),
        Commands::Clear(args) => cmd::clear::run_clear(args, output, &app),
        Commands::Prune(args) => cmd::prune::run_prune(args, output, &app),
    }
}

fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    let output = cli.output_mode();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if let Err(render_err) = render_error(output, &CliError::from_anyhow(&err)) {
                eprintln!("error: {err:#} (while rendering: {render_err})");
            }
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_flag_sets_output_mode() {
        let cli = Cli::parse_from(["pk", "--json", "show"]);
        assert!(cli.json);
        assert!(cli.output_mode().is_json());
    }

    #[test]
    fn json_flag_after_subcommand() {
        let cli = Cli::parse_from(["pk", "show", "--json"]);
        assert!(cli.output_mode().is_json());
    }

    #[test]
    fn default_output_is_human() {
        let cli = Cli::parse_from(["pk", "show"]);
        assert!(!cli.output_mode().is_json());
    }

    #[test]
    fn global_paths_parse_anywhere() {
        let cli = Cli::parse_from([
            "pk",
            "--db",
            "/tmp/lists.sqlite3",
            "refresh",
            "--fixture",
            "orders.json",
        ]);
        let locations = cli.locations();
        assert_eq!(locations.db, Some(PathBuf::from("/tmp/lists.sqlite3")));
        assert_eq!(locations.fixture, Some(PathBuf::from("orders.json")));
        assert!(locations.config.is_none());
    }

    #[test]
    fn show_subcommand_parses() {
        let cli = Cli::parse_from(["pk", "show", "--status", "pending", "--flat"]);
        assert!(matches!(cli.command, Commands::Show(ref args) if args.flat));
    }

    #[test]
    fn refresh_subcommand_parses() {
        let cli = Cli::parse_from(["pk", "refresh", "--page-size", "5"]);
        assert!(matches!(cli.command, Commands::Refresh(ref args) if args.list.page_size == 5));
    }

    #[test]
    fn more_subcommand_parses() {
        let cli = Cli::parse_from(["pk", "more", "--all"]);
        assert!(matches!(cli.command, Commands::More(ref args) if args.all));
    }

    #[test]
    fn clear_subcommand_parses() {
        let cli = Cli::parse_from(["pk", "clear", "--site", "2"]);
        assert!(matches!(cli.command, Commands::Clear(ref args) if args.site == Some(2)));
    }

    #[test]
    fn prune_subcommand_parses() {
        let cli = Cli::parse_from(["pk", "prune"]);
        assert!(matches!(cli.command, Commands::Prune(_)));
    }
}
