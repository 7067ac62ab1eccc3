use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use dutyroster::core::aliases::{DriveId, VolunteerId};
use dutyroster::core::context::AppContext;
use dutyroster::core::types::{AssignmentStatus, Gender};
use dutyroster::logging;

const CLI_ACTOR: &str = "cli";

#[derive(Parser, Debug)]
#[command(
    name = "dutyroster",
    about = "Allocate volunteers to drive duties from the command line",
    version
)]
struct Cli {
    /// Configuration file
    #[arg(long, default_value = "config.json")]
    config: PathBuf,
    /// Roster state snapshot, created on first save
    #[arg(long, default_value = "roster.json")]
    state: PathBuf,
    /// Directory for session log files
    #[arg(long, default_value = "logs")]
    logs: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Find or create a volunteer and place them on one or more drives
    Register(RegisterArgs),
    /// Create slots for every active duty a drive does not staff yet
    Materialize(DriveArgs),
    /// Place one volunteer on a drive
    Place(PlaceArgs),
    /// Place every volunteer registered for a drive, in registration order
    PlaceAll(DriveArgs),
    /// Promote waitlisted volunteers of one drive into freed seats
    Promote(DriveArgs),
    /// Promote waitlists across every drive that has one
    Sweep,
    /// Change a drive's size and recompute its slot capacities
    Resize(ResizeArgs),
    /// Pin or clear a duty's capacity on a drive
    Override(OverrideArgs),
    /// Cancel a volunteer's assignment on a drive
    Cancel(CancelArgs),
    /// Move a volunteer's assignment to another status
    Status(StatusArgs),
    /// Show configuration or change keys
    Config(ConfigArgs),
}

#[derive(Args, Debug)]
struct DriveArgs {
    #[arg(long)]
    drive: DriveId,
}

#[derive(Args, Debug)]
struct PlaceArgs {
    #[arg(long)]
    volunteer: VolunteerId,
    #[arg(long)]
    drive: DriveId,
}

#[derive(Args, Debug)]
struct RegisterArgs {
    #[arg(long)]
    phone: String,
    #[arg(long)]
    name: String,
    /// male or female
    #[arg(long, value_parser = parse_gender)]
    gender: Gender,
    /// Drive ids, comma separated
    #[arg(long = "drives", value_delimiter = ',', required = true)]
    drives: Vec<DriveId>,
}

#[derive(Args, Debug)]
struct ResizeArgs {
    #[arg(long)]
    drive: DriveId,
    #[arg(long)]
    size: u32,
}

#[derive(Args, Debug)]
struct OverrideArgs {
    #[arg(long)]
    drive: DriveId,
    #[arg(long)]
    duty: String,
    /// New capacity; omit together with --clear to drop the override
    #[arg(long, conflicts_with = "clear", required_unless_present = "clear")]
    capacity: Option<u32>,
    #[arg(long)]
    clear: bool,
}

#[derive(Args, Debug)]
struct CancelArgs {
    #[arg(long)]
    volunteer: VolunteerId,
    #[arg(long)]
    drive: DriveId,
    #[arg(long, default_value = "cancelled by volunteer")]
    reason: String,
}

#[derive(Args, Debug)]
struct StatusArgs {
    #[arg(long)]
    volunteer: VolunteerId,
    #[arg(long)]
    drive: DriveId,
    #[arg(long, value_parser = parse_status)]
    status: AssignmentStatus,
    #[arg(long)]
    reason: Option<String>,
}

#[derive(Args, Debug)]
struct ConfigArgs {
    /// KEY=VALUE pairs applied together; prints the old and new values
    #[arg(long = "set", value_parser = parse_pair)]
    set: Vec<(String, String)>,
}

#[derive(Debug, Serialize)]
struct ConfigRow {
    key: String,
    description: String,
    value: String,
}

fn parse_gender(raw: &str) -> std::result::Result<Gender, String> {
    Gender::try_from(raw).map_err(|err| err.to_string())
}

fn parse_status(raw: &str) -> std::result::Result<AssignmentStatus, String> {
    AssignmentStatus::try_from(raw).map_err(|err| err.to_string())
}

fn parse_pair(raw: &str) -> std::result::Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let mut ctx = AppContext::new_with_paths(cli.config, cli.state, cli.logs)
        .context("failed to load roster")?;
    if let Some(path) = logging::init(&ctx.log_settings())? {
        info!(path = %path.display(), "session log opened");
    }

    let allocator = ctx.allocator();
    let mutated = match cli.command {
        Command::Register(args) => {
            let volunteer = allocator.ensure_volunteer(&args.phone, &args.name, args.gender)?;
            print_json(&allocator.register(volunteer.id, &args.drives, CLI_ACTOR)?)?;
            true
        }
        Command::Materialize(args) => {
            print_json(&allocator.materialize_slots(args.drive)?)?;
            true
        }
        Command::Place(args) => {
            match allocator.place_volunteer(args.volunteer, args.drive, CLI_ACTOR)? {
                Some(outcome) => print_json(&outcome)?,
                None => {
                    return Err(anyhow!(
                        "no duty on drive {} accepts volunteer {}",
                        args.drive,
                        args.volunteer
                    ));
                }
            }
            true
        }
        Command::PlaceAll(args) => {
            print_json(&allocator.place_all_available(args.drive, CLI_ACTOR)?)?;
            true
        }
        Command::Promote(args) => {
            print_json(&allocator.promote_waitlist(args.drive)?)?;
            true
        }
        Command::Sweep => {
            print_json(&allocator.sweep()?)?;
            true
        }
        Command::Resize(args) => {
            let views = allocator.resize_drive(args.drive, args.size)?;
            let slots: Vec<_> = views.into_iter().map(|v| v.slot).collect();
            print_json(&slots)?;
            true
        }
        Command::Override(args) => {
            let value = if args.clear { None } else { args.capacity };
            print_json(&allocator.set_manual_override(args.drive, &args.duty, value)?)?;
            true
        }
        Command::Cancel(args) => {
            print_json(&allocator.cancel_assignment(args.volunteer, args.drive, &args.reason)?)?;
            true
        }
        Command::Status(args) => {
            print_json(&allocator.update_status(
                args.volunteer,
                args.drive,
                args.status,
                args.reason.as_deref(),
            )?)?;
            true
        }
        Command::Config(args) => {
            if args.set.is_empty() {
                let rows: Vec<ConfigRow> = ctx
                    .config
                    .rows()
                    .iter()
                    .map(|(key, description, value)| ConfigRow {
                        key: key.clone(),
                        description: description.clone(),
                        value: value.clone(),
                    })
                    .collect();
                print_json(&rows)?;
            } else {
                let changes = ctx
                    .config
                    .set_many(args.set)
                    .context("configuration not changed")?;
                for change in &changes {
                    info!(key = %change.key, old = %change.old, new = %change.new, "config updated");
                }
                print_json(&changes)?;
            }
            false
        }
    };

    if mutated {
        let path = ctx.save().context("failed to save roster state")?;
        info!(path = %path.display(), "roster state saved");
    }
    Ok(())
}
