/// Command line entry point for the habit streak tracker
///
/// Sets up logging, opens the database and runs one subcommand against it.
/// Results are printed to stdout as JSON; logs go to stderr.

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use habit_streaks::{
    parse_day, parse_time_of_day, Color, DateRange, DomainError, Frequency, HabitChange, HabitId,
    HabitTracker, NewHabit, SqliteStore, ThemeMode,
};

/// Get the default database path with robust fallback strategy
fn get_default_database_path() -> Result<PathBuf, Box<dyn std::error::Error>> {
    // Try various locations in order of preference
    let potential_paths = [
        dirs::home_dir().map(|mut p| {
            p.push(".habit_streaks");
            p
        }),
        dirs::data_dir().map(|mut p| {
            p.push("habit_streaks");
            p
        }),
        dirs::config_dir().map(|mut p| {
            p.push("habit_streaks");
            p
        }),
        std::env::current_dir().ok().map(|mut p| {
            p.push(".habit_streaks");
            p
        }),
    ];

    for potential_path in potential_paths.iter().flatten() {
        if std::fs::create_dir_all(potential_path).is_ok() {
            // Only accept directories we can actually write to
            let marker = potential_path.join(".write_check");
            if std::fs::write(&marker, b"").is_ok() {
                let _ = std::fs::remove_file(&marker);
                return Ok(potential_path.join("habits.db"));
            }
        }
    }

    let mut temp_path = std::env::temp_dir();
    temp_path.push("habit_streaks");
    std::fs::create_dir_all(&temp_path)?;
    temp_path.push("habits.db");

    tracing::warn!("Using temporary directory for database: {}", temp_path.display());
    Ok(temp_path)
}

fn parse_theme_mode(value: &str) -> Result<ThemeMode, DomainError> {
    ThemeMode::parse(value)
        .ok_or_else(|| DomainError::validation(format!("Unknown theme mode '{}'", value)))
}

/// Track daily habits and their streaks
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the SQLite database file
    /// If not provided, uses a default location in the user's home directory
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Enable verbose output (implies debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a habit
    Add {
        name: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, default_value = "daily")]
        frequency: Frequency,
        #[arg(long, value_parser = Color::parse)]
        color: Option<Color>,
        #[arg(long, default_value_t = 1)]
        target: u32,
        /// Reminder time, HH:MM
        #[arg(long, value_parser = parse_time_of_day)]
        reminder: Option<chrono::NaiveTime>,
    },
    /// List habits, oldest first
    List,
    /// Change a habit's fields
    Edit {
        habit: HabitId,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, conflicts_with = "clear_description")]
        description: Option<String>,
        #[arg(long)]
        clear_description: bool,
        #[arg(long)]
        frequency: Option<Frequency>,
        #[arg(long, value_parser = Color::parse)]
        color: Option<Color>,
        #[arg(long)]
        target: Option<u32>,
        #[arg(long, value_parser = parse_time_of_day, conflicts_with = "no_reminder")]
        reminder: Option<chrono::NaiveTime>,
        #[arg(long)]
        no_reminder: bool,
    },
    /// Delete a habit and its completions
    Delete { habit: HabitId },
    /// Mark or unmark a day (today by default)
    Toggle {
        habit: HabitId,
        #[arg(long, value_parser = parse_day)]
        date: Option<chrono::NaiveDate>,
    },
    /// Completion history of a habit
    History {
        habit: HabitId,
        #[arg(long, value_parser = parse_day)]
        from: Option<chrono::NaiveDate>,
        #[arg(long, value_parser = parse_day)]
        to: Option<chrono::NaiveDate>,
    },
    /// Statistics for one habit, or the dashboard when omitted
    Stats { habit: Option<HabitId> },
    /// Recompute cached streaks from completion history
    Recalculate,
    /// Show or change the theme preference
    Theme {
        #[arg(long, value_parser = parse_theme_mode)]
        mode: Option<ThemeMode>,
        #[arg(long, requires = "mode")]
        color: Option<String>,
    },
    /// Write all data as JSON to a file, or stdout
    Export { file: Option<PathBuf> },
    /// Replace all data with a previously exported file
    Import { file: PathBuf },
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(
    tracker: &HabitTracker<SqliteStore>,
    command: Command,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Add { name, description, frequency, color, target, reminder } => {
            let mut new = NewHabit::named(name).with_frequency(frequency).with_target(target);
            if let Some(description) = description {
                new = new.with_description(description);
            }
            if let Some(color) = color {
                new = new.with_color(color);
            }
            if let Some(time) = reminder {
                new = new.with_reminder(time);
            }
            print_json(&tracker.add_habit(new).await?)
        }
        Command::List => print_json(&tracker.habits().await?),
        Command::Edit {
            habit,
            name,
            description,
            clear_description,
            frequency,
            color,
            target,
            reminder,
            no_reminder,
        } => {
            let mut changes = Vec::new();
            if let Some(name) = name {
                changes.push(HabitChange::Name(name));
            }
            if let Some(description) = description {
                changes.push(HabitChange::Description(Some(description)));
            } else if clear_description {
                changes.push(HabitChange::Description(None));
            }
            if let Some(frequency) = frequency {
                changes.push(HabitChange::Frequency(frequency));
            }
            if let Some(color) = color {
                changes.push(HabitChange::Color(color));
            }
            if let Some(target) = target {
                changes.push(HabitChange::Target(target));
            }
            if let Some(time) = reminder {
                changes.push(HabitChange::Reminder { enabled: true, time: Some(time) });
            } else if no_reminder {
                changes.push(HabitChange::Reminder { enabled: false, time: None });
            }
            print_json(&tracker.edit_habit(&habit, changes).await?)
        }
        Command::Delete { habit } => {
            tracker.delete_habit(&habit).await?;
            print_json(&serde_json::json!({ "deleted": habit }))
        }
        Command::Toggle { habit, date } => {
            let date = date.unwrap_or_else(|| tracker.today());
            print_json(&tracker.toggle(&habit, date).await?)
        }
        Command::History { habit, from, to } => {
            let range = match (from, to) {
                (Some(from), Some(to)) => DateRange::between(from, to)?,
                (from, to) => DateRange { from, to },
            };
            print_json(&tracker.list_completions(&habit, range).await?)
        }
        Command::Stats { habit: Some(habit) } => print_json(&tracker.habit_stats(&habit).await?),
        Command::Stats { habit: None } => print_json(&tracker.dashboard_stats().await?),
        Command::Recalculate => print_json(&tracker.recalculate_all().await?),
        Command::Theme { mode: Some(mode), color } => {
            let color = match color {
                Some(color) => color,
                None => tracker.theme().await?.theme_color,
            };
            print_json(&tracker.set_theme(mode, color).await?)
        }
        Command::Theme { mode: None, .. } => print_json(&tracker.theme().await?),
        Command::Export { file: Some(path) } => {
            tracker.export_to_file(&path).await?;
            print_json(&serde_json::json!({ "exported": path }))
        }
        Command::Export { file: None } => {
            println!("{}", tracker.export_json().await?);
            Ok(())
        }
        Command::Import { file } => print_json(&tracker.import_from_file(&file).await?),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Set up logging based on command line flags
    let log_level = if args.verbose {
        "debug"
    } else if args.debug {
        "info"
    } else {
        "warn"
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("habit_streaks={}", log_level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr) // Send logs to stderr, not stdout
        .init();

    let db_path = match args.database {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            path
        }
        None => get_default_database_path()?,
    };

    info!("Using database at: {}", db_path.display());

    let tracker = HabitTracker::new(SqliteStore::open(&db_path)?);
    run(&tracker, args.command).await
}
