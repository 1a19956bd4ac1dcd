//! camptrack CLI
//!
//! Command-line interface for camptrack - camp rosters, attendance and groups.

use std::fs::OpenOptions;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use camptrack_core::{CampStore, Config, DatabaseError};

mod commands;
mod editor;
mod output;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "camptrack")]
#[command(about = "camptrack - Camp rosters, attendance and groups")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use this config file instead of the default
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register or show the signed-in user
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
    /// Manage camps
    Camp {
        #[command(subcommand)]
        command: CampCommands,
    },
    /// Manage athletes in the current camp
    Athlete {
        #[command(subcommand)]
        command: AthleteCommands,
    },
    /// Manage groups in the current camp
    Group {
        #[command(subcommand)]
        command: GroupCommands,
    },
    /// Record and review attendance
    #[command(alias = "att")]
    Attendance {
        #[command(subcommand)]
        command: AttendanceCommands,
    },
    /// Notes about athletes
    Note {
        #[command(subcommand)]
        command: NoteCommands,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// Show status (user, current camp, counts)
    Status,
    /// Delete all local data
    Reset {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Register an email and make it the signed-in user
    Register {
        /// Email address
        email: String,
    },
    /// Show the signed-in user
    Whoami,
}

#[derive(Subcommand)]
pub enum CampCommands {
    /// Create a camp and select it
    #[command(alias = "add")]
    Create {
        /// Camp name
        name: String,
        /// First day (YYYY-MM-DD), defaults to today
        #[arg(long)]
        start: Option<String>,
        /// Last day (YYYY-MM-DD), defaults to a month after the start
        #[arg(long)]
        end: Option<String>,
    },
    /// List visible camps
    #[command(alias = "ls")]
    List,
    /// Select the camp to work in
    Select {
        /// Camp ID (full UUID or prefix)
        id: String,
    },
    /// Show the current camp
    Show,
    /// Rename a camp or change its dates
    Edit {
        /// Camp ID (full UUID or prefix), defaults to the current camp
        id: Option<String>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
    },
    /// Delete a camp and everything in it
    #[command(alias = "rm")]
    Delete {
        /// Camp ID (full UUID or prefix)
        id: String,
    },
    /// Give a registered user access to the current camp
    Share {
        /// Email of the user
        email: String,
    },
    /// Remove a collaborator from the current camp
    Unshare {
        /// User ID of the collaborator
        user_id: String,
    },
}

#[derive(Subcommand)]
pub enum AthleteCommands {
    /// Add an athlete
    #[command(alias = "create")]
    Add {
        /// Full name
        name: String,
        #[arg(long)]
        nickname: Option<String>,
        #[arg(long)]
        parent: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        medical: Option<String>,
        #[arg(long)]
        allergies: Option<String>,
    },
    /// Import athletes from a CSV file
    Import {
        /// CSV file with a header row
        file: PathBuf,
    },
    /// List athletes, optionally filtered by name or nickname
    #[command(alias = "ls")]
    List {
        /// Search text
        query: Option<String>,
    },
    /// Show an athlete's profile, history and notes
    Show {
        /// Athlete ID (full UUID or prefix)
        id: String,
    },
    /// Edit profile fields
    Edit {
        /// Athlete ID (full UUID or prefix)
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        nickname: Option<String>,
        #[arg(long)]
        parent: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        birth_date: Option<String>,
        #[arg(long)]
        shirt_size: Option<String>,
        #[arg(long)]
        medical: Option<String>,
        #[arg(long)]
        allergies: Option<String>,
    },
    /// Set the athlete's default group
    SetGroup {
        /// Athlete ID (full UUID or prefix)
        id: String,
        /// Group ID (full UUID or prefix) or "unassigned"
        group: String,
    },
    /// Show or set an athlete's photo
    Photo {
        /// Athlete ID (full UUID or prefix)
        id: String,
        /// Image file (jpg, png, gif or webp) to use as the photo
        file: Option<PathBuf>,
        /// Remove the current photo
        #[arg(long, conflicts_with = "file")]
        remove: bool,
    },
    /// Delete an athlete with their attendance and notes
    #[command(alias = "rm")]
    Delete {
        /// Athlete ID (full UUID or prefix)
        id: String,
    },
}

#[derive(Subcommand)]
pub enum GroupCommands {
    /// List groups
    #[command(alias = "ls")]
    List,
    /// Add a group
    #[command(alias = "create")]
    Add {
        name: String,
        /// Color class
        #[arg(long, default_value = "bg-slate-500")]
        color: String,
        #[arg(long)]
        icon: Option<String>,
    },
    /// Edit a group
    Edit {
        /// Group ID (full UUID or prefix)
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        icon: Option<String>,
    },
    /// Delete a group; its members become unassigned
    #[command(alias = "rm")]
    Delete {
        /// Group ID (full UUID or prefix)
        id: String,
    },
    /// Put an athlete in a group for one date
    Assign {
        /// Athlete ID (full UUID or prefix)
        athlete: String,
        /// Group ID (full UUID or prefix) or "unassigned"
        group: String,
        /// Date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<String>,
        /// Edit a locked date without asking
        #[arg(long)]
        force: bool,
    },
    /// Show athletes by group for a date
    Board {
        /// Date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum AttendanceCommands {
    /// Mark athletes present or absent
    Mark {
        /// present or absent
        status: String,
        /// Athlete IDs (full UUID or prefix)
        #[arg(required_unless_present = "all")]
        athletes: Vec<String>,
        /// Apply to every athlete in the camp
        #[arg(long)]
        all: bool,
        /// Date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<String>,
        /// Edit a locked date without asking
        #[arg(long)]
        force: bool,
    },
    /// Flip an athlete between present and absent
    Toggle {
        /// Athlete ID (full UUID or prefix)
        athlete: String,
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        force: bool,
    },
    /// Show attendance for a date
    Show {
        #[arg(long)]
        date: Option<String>,
    },
    /// Lock or unlock a date
    Lock {
        #[arg(long)]
        date: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum NoteCommands {
    /// Add a note about an athlete
    #[command(alias = "create")]
    Add {
        /// Athlete ID (full UUID or prefix)
        athlete: String,
        /// admin, performance or interests
        #[arg(short = 't', long = "type", default_value = "admin")]
        kind: String,
        /// Note text (opens editor if not provided)
        #[arg(short, long)]
        content: Option<String>,
        #[arg(long)]
        date: Option<String>,
    },
    /// List notes for an athlete, or for a date
    #[command(alias = "ls")]
    List {
        /// Athlete ID (full UUID or prefix)
        athlete: Option<String>,
        #[arg(long, conflicts_with = "athlete")]
        date: Option<String>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, user_id, user_email, admin_emails, log_file)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));
    let config_path = cli.config.as_ref();

    // Commands that don't need a store
    match &cli.command {
        Commands::Config { command } => {
            return match command.clone() {
                Some(ConfigCommands::Show) | None => commands::config::show(config_path, &output),
                Some(ConfigCommands::Set { key, value }) => {
                    commands::config::set(key, value, config_path, &output)
                }
            };
        }
        Commands::User {
            command: UserCommands::Register { email },
        } => {
            let config = load_config(config_path)?;
            init_logging(&config);
            return commands::user::register(email, config, config_path, &output);
        }
        _ => {}
    }

    let config = load_config(config_path)?;
    init_logging(&config);

    if let Commands::Reset { yes } = cli.command {
        return commands::reset::reset(&config, yes, &output);
    }

    let mut store = CampStore::open(&config).map_err(with_recovery_hint)?;
    debug!("Opened store for {}", store.session().email);

    match cli.command {
        Commands::User { command } => commands::user::handle(command, &store, &output),
        Commands::Camp { command } => commands::camp::handle(command, &mut store, &output),
        Commands::Athlete { command } => {
            commands::athlete::handle(command, &mut store, &output).await
        }
        Commands::Group { command } => commands::group::handle(command, &mut store, &output),
        Commands::Attendance { command } => {
            commands::attendance::handle(command, &mut store, &output)
        }
        Commands::Note { command } => commands::note::handle(command, &mut store, &output),
        Commands::Status => commands::status::show(&store, &config, &output),
        Commands::Config { .. } | Commands::Reset { .. } => Ok(()), // Handled above
    }
}

/// Point at a fix when the database could not be opened
fn with_recovery_hint(err: anyhow::Error) -> anyhow::Error {
    let hint = err
        .chain()
        .find_map(|e| e.downcast_ref::<DatabaseError>())
        .and_then(DatabaseError::recovery_suggestion);
    match hint {
        Some(hint) => err.context(hint),
        None => err,
    }
}

fn load_config(config_path: Option<&PathBuf>) -> Result<Config> {
    Config::load_with_cli_override(config_path).context("Failed to load configuration")
}

/// Initialize logging
///
/// Level comes from CAMPTRACK_LOG (default warn). Logs go to
/// `config.log_file` when set, stderr otherwise.
fn init_logging(config: &Config) {
    let log_level = std::env::var("CAMPTRACK_LOG").unwrap_or_else(|_| "warn".to_string());
    let env_filter = EnvFilter::new(format!(
        "camptrack_core={},camptrack_cli={}",
        log_level, log_level
    ));

    if let Some(log_path) = &config.log_file {
        let log_file = match OpenOptions::new().create(true).append(true).open(log_path) {
            Ok(f) => f,
            Err(e) => {
                eprintln!("Warning: Could not open log file {:?}: {}", log_path, e);
                return;
            }
        };
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_ansi(false)
            .with_writer(log_file)
            .try_init();
    } else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init();
    }
}
