//! CLI probe for the note tree core.
//!
//! # Responsibility
//! - Open a note database and print the navigator views for one note.
//! - Verify `notree_core` wiring without any UI runtime.

use clap::Parser;
use log::error;
use notree_core::{
    default_log_level, init_logging, open_store_db, SqliteNoteStore, TreeNavigator, ViewRow,
    NULL_ID,
};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "notree", version, about = "Print the note tree views for one note")]
struct Args {
    /// Note database file; created when missing.
    #[arg(long)]
    db: PathBuf,

    /// Note id to open; 0 is the root.
    #[arg(long, default_value_t = NULL_ID)]
    open: i64,

    /// trace|debug|info|warn|error
    #[arg(long)]
    log_level: Option<String>,

    /// Absolute directory for rolling log files; logging is off without it.
    #[arg(long)]
    log_dir: Option<String>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    if let Some(log_dir) = args.log_dir.as_deref() {
        let level = args
            .log_level
            .clone()
            .unwrap_or_else(|| default_log_level().to_string());
        if let Err(err) = init_logging(&level, log_dir) {
            eprintln!("notree: logging disabled: {err}");
        }
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_run module=cli status=error error={err}");
            eprintln!("notree: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let conn = open_store_db(&args.db)?;
    let store = SqliteNoteStore::try_new(&conn)?;
    let navigator = TreeNavigator::open(store, args.open)?;

    println!("notree_core version={}", notree_core::core_version());
    println!("db={}", args.db.display());
    let crumbs = navigator.breadcrumbs()?;
    println!("current=/{}", crumbs.join("/"));

    // The header row expands to the body, every other row to its children.
    for row in navigator.children_view()? {
        let expandable = navigator.has_nested_rows(row.id)?;
        print_row(&row, 0, expandable);
        if expandable {
            for nested in navigator.expand(row.id)? {
                print_row(&nested, 1, false);
            }
        }
    }
    Ok(())
}

fn print_row(row: &ViewRow, depth: usize, expandable: bool) {
    let marker = match (row.is_interactive(), expandable) {
        (false, _) => "*",
        (true, true) => "+",
        (true, false) => ">",
    };
    println!(
        "{}{marker} [{}] {}",
        "  ".repeat(depth),
        row.id,
        row.text.lines().next().unwrap_or_default()
    );
}
