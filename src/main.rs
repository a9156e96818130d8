/// Command-line front end for the habit-state engine
///
/// Sets up logging, opens the SQLite-backed key-value store, loads and
/// migrates persisted state, runs one command against the stores and
/// flushes before exit.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use clap::{Parser, Subcommand};
use tracing::info;

use habit_state::{
    build_time_of_day_metric, csv, AppError, Clock, CsvLog, HabitApp,
    HabitMetricConfig, HabitStatus, LogOptions, SqliteKv, SystemClock,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the state database file; defaults to the user data directory
    #[arg(long)]
    database: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Enable verbose output (implies debug)
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a goal-mode habit
    Add { name: String },
    /// Create a freeform habit, optionally with a time-of-day metric
    AddPositive {
        name: String,
        /// Track a time-of-day metric with this day-boundary hour (0-23)
        #[arg(long)]
        wrap_hour: Option<u8>,
    },
    /// Queue a freeform habit for later
    Queue { name: String },
    /// Record an occurrence of a goal-mode habit
    Log { habit_id: String },
    /// Record a freeform log entry
    LogPositive {
        habit_id: String,
        #[arg(long, default_value = "")]
        note: String,
        /// Backdate the entry to this epoch-millisecond instant
        #[arg(long)]
        at_ms: Option<i64>,
    },
    /// Set a goal-mode habit's target interval in seconds
    Goal { habit_id: String, seconds: f64 },
    /// Set a habit's lifecycle status (queued, active, paused, archived)
    Status {
        habit_id: String,
        status: String,
        #[arg(long)]
        positive: bool,
    },
    /// List habits on both sides
    List,
    /// Show a goal-mode habit's log timeline
    Timeline { habit_id: String },
    /// Print a combined version-2 export payload as JSON
    Export,
    /// Import a payload from a JSON file (all-or-nothing)
    Import { file: PathBuf },
    /// Print logs as CSV
    Csv {
        /// Export positive-store logs instead of goal-mode logs
        #[arg(long)]
        positive: bool,
    },
}

fn default_database_path() -> Result<PathBuf, AppError> {
    let mut dir = dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."));
    dir.push("habit-state");
    std::fs::create_dir_all(&dir)?;
    dir.push("state.db");
    Ok(dir)
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let args = Args::parse();

    let log_level = if args.verbose {
        "debug"
    } else if args.debug {
        "info"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(format!("habit_state={}", log_level))
        .with_writer(std::io::stderr)
        .init();

    let db_path = match args.database {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.exists() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            path
        }
        None => default_database_path()?,
    };
    info!("Using state database at: {}", db_path.display());

    let backend = Arc::new(SqliteKv::new(db_path)?);
    let clock = Arc::new(SystemClock);
    let mut app = HabitApp::new(backend, clock.clone());
    app.load().await;

    run_command(&mut app, clock.as_ref(), args.command)?;

    app.flush_all().await;
    Ok(())
}

fn run_command(app: &mut HabitApp, clock: &dyn Clock, command: Command) -> Result<(), AppError> {
    match command {
        Command::Add { name } => {
            let id = app.negative.add(&name);
            println!("added habit {}", id);
        }
        Command::AddPositive { name, wrap_hour } => {
            let metric = wrap_hour.map(|h| HabitMetricConfig {
                wrap_hour: Some(h),
                ..HabitMetricConfig::time_of_day()
            });
            let id = app.positive.add(&name, metric);
            println!("added habit {}", id);
        }
        Command::Queue { name } => match app.positive.quick_add_queued(&name) {
            Some(id) => println!("queued habit {}", id),
            None => println!("nothing to queue"),
        },
        Command::Log { habit_id } => {
            let id = habit_id.as_str().into();
            if app.negative.log(&id) {
                if let Some(habit) = app.negative.get(&id) {
                    println!(
                        "logged; streak {}, goal {}s",
                        habit.streak, habit.goal_seconds
                    );
                }
            } else {
                println!("not logged (unknown habit or within the 30s window)");
            }
        }
        Command::LogPositive {
            habit_id,
            note,
            at_ms,
        } => {
            let id = habit_id.as_str().into();
            let metric = app.positive.get(&id).and_then(|habit| {
                habit.metric.as_ref().map(|cfg| {
                    let at = at_ms
                        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
                        .map(|utc| utc.with_timezone(clock.now_local().offset()))
                        .unwrap_or_else(|| clock.now_local());
                    build_time_of_day_metric(&at, Some(cfg))
                })
            });
            match app.positive.log(&id, &note, LogOptions { at_ms, metric }) {
                Some(log_id) => println!("logged {}", log_id),
                None => println!("unknown habit"),
            }
        }
        Command::Goal { habit_id, seconds } => {
            let id = habit_id.as_str().into();
            if app.negative.edit_goal(&id, seconds) {
                if let Some(habit) = app.negative.get(&id) {
                    println!("goal set to {}s", habit.goal_seconds);
                }
            } else {
                println!("unknown habit");
            }
        }
        Command::Status {
            habit_id,
            status,
            positive,
        } => {
            let id = habit_id.as_str().into();
            let status = HabitStatus::sanitize(&status);
            let changed = if positive {
                app.positive.set_status(&id, status)
            } else {
                app.negative.set_status(&id, status)
            };
            println!(
                "{}",
                if changed { "status updated" } else { "unknown habit" }
            );
        }
        Command::List => {
            for habit in app.negative.habits() {
                println!(
                    "[goal] {} {} (goal {}s, streak {}, {})",
                    habit.id,
                    habit.name,
                    habit.goal_seconds,
                    habit.streak,
                    habit.status.as_str()
                );
            }
            let positive = app.positive.document();
            for habit in &positive.habits {
                let metric = if habit.metric.is_some() {
                    " [timeOfDay]"
                } else {
                    ""
                };
                println!(
                    "[free] {} {}{} ({})",
                    habit.id,
                    habit.name,
                    metric,
                    habit.status.as_str()
                );
            }
        }
        Command::Timeline { habit_id } => {
            for log in app.negative.timeline(&habit_id.as_str().into()) {
                let delta = log
                    .delta_seconds
                    .map(|d| format!(" (+{}s)", d))
                    .unwrap_or_default();
                println!("{} {}{}", log.at.to_rfc3339(), log.id, delta);
            }
        }
        Command::Export => {
            let payload = app.export_all();
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
        Command::Import { file } => {
            let text = std::fs::read_to_string(file)?;
            let payload: serde_json::Value = serde_json::from_str(&text)?;
            if app.import_all(&payload) {
                println!("imported");
            } else {
                println!("rejected: payload failed validation, nothing changed");
            }
        }
        Command::Csv { positive } => {
            let rows: Vec<CsvLog> = if positive {
                app.positive.document().logs.iter().map(CsvLog::from).collect()
            } else {
                app.negative.logs().iter().map(CsvLog::from).collect()
            };
            print!("{}", csv::logs_to_csv(&rows));
        }
    }
    Ok(())
}
