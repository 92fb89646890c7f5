//! Command-line entry point for the timeline engine.
//!
//! # Responsibility
//! - Layer command-line flags over the JSON config.
//! - Run one grouping or layout operation against the SQLite store.
//! - Print results as JSON on stdout; errors go to stderr.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use log::info;
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use timeline_core::db::open_db;
use timeline_core::{
    init_logging_from_config, ActivityRecord, DaySummary, GroupingEngine, PlacedItem, RecordRef,
    SqliteTimelineStore, TimelineConfig, TimelineController, TimelineStore,
};
use uuid::Uuid;

/// Day timeline layout and activity grouping.
#[derive(Parser, Debug)]
#[command(name = "timeline", version)]
struct Cli {
    /// JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database path (overrides config)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Render hidden standalone activities
    #[arg(long, global = true)]
    show_hidden: bool,

    /// Minutes east of UTC that define local midnight (overrides config)
    #[arg(long, global = true, allow_hyphen_values = true)]
    utc_offset_minutes: Option<i32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import a JSON array of activity records
    Import {
        #[arg(long)]
        file: PathBuf,
    },
    /// Print the lane layout of one day
    Layout {
        /// Day as YYYY-MM-DD
        #[arg(long)]
        date: NaiveDate,
    },
    /// Merge ungrouped activities into a new group
    Group {
        #[arg(required = true)]
        ids: Vec<Uuid>,
    },
    /// Dissolve a group
    Ungroup { group_id: Uuid },
    /// Hide activities (or unhide with --unhide)
    Hide {
        #[arg(required = true)]
        ids: Vec<Uuid>,
        #[arg(long)]
        unhide: bool,
    },
    /// Assign or clear the client of an activity or group
    Assign {
        #[command(subcommand)]
        target: AssignTarget,
    },
}

#[derive(Subcommand, Debug)]
enum AssignTarget {
    Activity {
        id: Uuid,
        /// Omit to clear the client
        #[arg(long)]
        client: Option<Uuid>,
    },
    Group {
        id: Uuid,
        #[arg(long)]
        client: Option<Uuid>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LayoutOutput<'a> {
    date: NaiveDate,
    utc_offset_minutes: i32,
    max_lanes: usize,
    items: Vec<PlacedItem<'a>>,
    summary: DaySummary,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), String> {
    let config = resolve_config(&cli)?;
    init_logging_from_config(&config)?;

    let conn = open_db(&config.db_path).map_err(|err| err.to_string())?;
    let store = SqliteTimelineStore::try_new(&conn).map_err(|err| err.to_string())?;

    match cli.command {
        Command::Import { file } => import(&store, file),
        Command::Layout { date } => {
            let day = config.day(date).map_err(|err| err.to_string())?;
            let mut controller = TimelineController::new(store, day, config.filters());
            controller.reload().map_err(|err| err.to_string())?;
            let layout = controller
                .layout()
                .ok_or_else(|| format!("layout unavailable in state {}", controller.state().name()))?;
            print_json(&LayoutOutput {
                date,
                utc_offset_minutes: config.utc_offset_minutes,
                max_lanes: layout.max_lanes(),
                items: layout.placed(),
                summary: layout.summary(),
            })
        }
        Command::Group { ids } => {
            let engine = GroupingEngine::new(store);
            let group = engine.create_group(&ids).map_err(|err| err.to_string())?;
            print_json(&group)
        }
        Command::Ungroup { group_id } => {
            let engine = GroupingEngine::new(store);
            let released = engine.ungroup(group_id).map_err(|err| err.to_string())?;
            print_json(&released)
        }
        Command::Hide { ids, unhide } => {
            let engine = GroupingEngine::new(store);
            engine
                .set_hidden_many(&ids, !unhide)
                .map_err(|err| err.to_string())?;
            print_json(&ids)
        }
        Command::Assign { target } => {
            let (target, client) = match target {
                AssignTarget::Activity { id, client } => (RecordRef::Activity(id), client),
                AssignTarget::Group { id, client } => (RecordRef::Group(id), client),
            };
            let engine = GroupingEngine::new(store);
            engine
                .assign_client(target, client)
                .map_err(|err| err.to_string())?;
            print_json(&target)
        }
    }
}

fn resolve_config(cli: &Cli) -> Result<TimelineConfig, String> {
    let mut config = match &cli.config {
        Some(path) => TimelineConfig::load(path).map_err(|err| err.to_string())?,
        None => TimelineConfig::default(),
    };
    if let Some(db) = &cli.db {
        config.db_path = db.clone();
    }
    if cli.show_hidden {
        config.show_hidden = true;
    }
    if let Some(minutes) = cli.utc_offset_minutes {
        config.utc_offset_minutes = minutes;
    }
    config.validate().map_err(|err| err.to_string())?;
    Ok(config)
}

/// Inserts every record as ungrouped; group links are never imported.
fn import(store: &impl TimelineStore, file: PathBuf) -> Result<(), String> {
    let json = std::fs::read_to_string(&file)
        .map_err(|err| format!("cannot read `{}`: {err}", file.display()))?;
    let records: Vec<ActivityRecord> =
        serde_json::from_str(&json).map_err(|err| format!("invalid import file: {err}"))?;

    let mut skipped_links = 0usize;
    for mut record in records.iter().cloned() {
        if record.group_id.take().is_some() {
            skipped_links += 1;
        }
        store
            .insert_activity(&record)
            .map_err(|err| format!("import failed at activity {}: {err}", record.id))?;
    }
    info!(
        "event=activity_import module=cli status=ok count={} skipped_links={skipped_links}",
        records.len()
    );
    print_json(&serde_json::json!({
        "imported": records.len(),
        "skippedGroupLinks": skipped_links,
    }))
}

fn print_json(value: &impl Serialize) -> Result<(), String> {
    let text = serde_json::to_string_pretty(value).map_err(|err| err.to_string())?;
    println!("{text}");
    Ok(())
}
