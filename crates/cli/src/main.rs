//! goaltrack CLI - track progress against growing goals.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use clap::{ArgAction, Parser, Subcommand};
use goaltrack_core::{GoalName, GoalSpec, Time, TrackError};
use goaltrack_progress::{
    GoalTracker, LeewayBand, Polynomial, ReviewEngine, Standing, StatusReport, TrackerError,
};
use goaltrack_storage::JsonStorage;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "goaltrack")]
#[command(about = "Track progress against goals whose daily quota grows", long_about = None)]
struct Cli {
    /// Directory holding goals and logs
    #[arg(long, global = true, env = "GOALTRACK_DIR", default_value = ".goaltrack")]
    data_dir: PathBuf,

    /// Review moment (RFC 3339 or YYYY-MM-DD); defaults to now
    #[arg(long, global = true, value_parser = parse_moment)]
    as_of: Option<Time>,

    /// More logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new goal
    Create {
        /// Short name
        name: GoalName,
        /// Rate coefficients, lowest order first (repeat the flag)
        #[arg(long = "rate", required = true, allow_negative_numbers = true)]
        rates: Vec<f64>,
        /// Period length in days
        #[arg(long, default_value = "1")]
        period: u32,
        /// Start date (YYYY-MM-DD); defaults to the review date
        #[arg(long)]
        start: Option<NaiveDate>,
        /// Description
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Log progress for a goal
    Update {
        /// Goal name
        name: GoalName,
        /// Amount done
        #[arg(allow_negative_numbers = true)]
        value: f64,
    },
    /// Log a single unit of progress
    Checkoff {
        /// Goal name
        name: GoalName,
    },
    /// Review every goal
    Review {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show one goal in detail
    Show {
        /// Goal name
        name: GoalName,
    },
    /// Fit the goal's trajectory to its history
    Fit {
        /// Replace the goal's rates with the fitted ones
        #[arg(long)]
        accept: bool,
        /// Goal name
        name: GoalName,
    },
    /// Show recent log entries
    Tail {
        /// Goal name
        name: GoalName,
        /// Only entries on or after this date
        #[arg(long, value_parser = parse_moment)]
        since: Option<Time>,
        /// At most this many entries
        #[arg(short = 'n', long)]
        count: Option<usize>,
    },
    /// List goals
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let as_of = cli.as_of.unwrap_or_else(Utc::now);
    debug!("Reviewing as of {}", as_of);

    let storage = JsonStorage::new(&cli.data_dir)
        .await
        .with_context(|| format!("Failed to open {}", cli.data_dir.display()))?;
    let mut tracker = GoalTracker::new(storage);

    match cli.command {
        Commands::Create { name, rates, period, start, description } => {
            let start = start.unwrap_or_else(|| as_of.date_naive());
            let goal = GoalSpec::new(name, description, start, period, rates)?;
            tracker.create_goal(goal.clone()).await?;
            println!(
                "Created goal: {} - {}",
                goal.shortname(),
                Polynomial::for_goal(&goal)
            );
        }
        Commands::Update { name, value } => {
            let total = tracker.record(&name, as_of, value).await?;
            println!("{}: {:+} (total {})", name, value, total);
            print_status(&tracker, &name, as_of).await?;
        }
        Commands::Checkoff { name } => {
            let total = tracker.record(&name, as_of, 1.0).await?;
            println!("{}: checked off (total {})", name, total);
            print_status(&tracker, &name, as_of).await?;
        }
        Commands::Review { json } => {
            let reviews = tracker.review_all(as_of).await?;
            let engine = tracker.engine();

            if json {
                let rows: Vec<serde_json::Value> = reviews
                    .into_iter()
                    .map(|r| match summarize(engine, &r.goal, r.outcome) {
                        Ok(summary) => serde_json::json!({
                            "goal": r.goal.shortname(),
                            "progress_differential": summary.progress_differential,
                            "days_to_equalize": summary.days_to_equalize,
                            "progress_rate": summary.progress_rate,
                            "standing": summary.standing().as_str(),
                            "leeway": summary.leeway.as_str(),
                        }),
                        Err(e) => serde_json::json!({
                            "goal": r.goal.shortname(),
                            "error": e.to_string(),
                        }),
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                println!("Goals ({})", reviews.len());
                for r in reviews {
                    match summarize(engine, &r.goal, r.outcome) {
                        Ok(summary) => println!("  {} | {}", r.goal.shortname(), summary),
                        Err(e) => println!("  {} | ERROR: {}", r.goal.shortname(), e),
                    }
                }
            }
        }
        Commands::Show { name } => {
            let goal = tracker.goal(&name).await?;
            let log = tracker.log(&name).await?;
            let outcome = tracker.review(&name, as_of).await;
            let summary = summarize(tracker.engine(), &goal, outcome)?;

            println!("Goal: {}", goal.shortname());
            if !goal.description().is_empty() {
                println!("  Description: {}", goal.description());
            }
            println!("  Start: {}", goal.start_date());
            println!("  Period: {} day(s)", goal.period());
            println!("  Trajectory: {}", Polynomial::for_goal(&goal));
            println!("  Logged: {} ({} entries)", log.cumulative_progress(), log.len());
            println!("  Differential: {:+}", summary.progress_differential);
            println!("  Standing: {}", summary.standing().as_str());
            println!("  Leeway: {}", summary.leeway.as_str());
            println!("  Days to equalize: {}", summary.days_text());
            println!("  Current rate: {:.2}", summary.progress_rate);
            match log.time_since_last(as_of) {
                Some(elapsed) => println!("  Last entry: {}h ago", elapsed.num_hours()),
                None => println!("  Last entry: never"),
            }
        }
        Commands::Fit { name, accept } => {
            let goal = tracker.goal(&name).await?;
            let fitted = tracker.refit(&name).await?;

            println!("Current: {}", Polynomial::for_goal(&goal));
            println!("Fitted:  {}", fitted);
            println!("Fitted rates: {:?}", fitted.rate_coefficients(goal.period()));

            if accept {
                let adopted = tracker.adopt_refit(&name).await?;
                println!("Adopted rates {:?} for {}", adopted.rate_coefficients(), name);
            }
        }
        Commands::Tail { name, since, count } => {
            let since = match since {
                Some(since) => since,
                None => tracker.goal(&name).await?.start_time(),
            };
            let entries = tracker.tail(&name, since).await?;
            let skip = count.map_or(0, |n| entries.len().saturating_sub(n));

            for entry in &entries[skip..] {
                println!("  {} | {:+}", entry.timestamp.to_rfc3339(), entry.delta);
            }
        }
        Commands::List => {
            let goals = tracker.goals().await?;

            println!("Goals ({})", goals.len());
            for goal in goals {
                println!(
                    "  {} | every {} day(s) from {} | rates {:?}",
                    goal.shortname(),
                    goal.period(),
                    goal.start_date(),
                    goal.rate_coefficients(),
                );
            }
        }
    }

    Ok(())
}

/// What a review shows about one goal.
///
/// A trajectory that never comes back to current progress still has a
/// differential and a rate; only the catch-up day is missing.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Summary {
    progress_differential: f64,
    days_to_equalize: Option<i64>,
    progress_rate: f64,
    leeway: LeewayBand,
}

impl Summary {
    fn standing(&self) -> Standing {
        Standing::of(self.progress_differential)
    }

    fn days_text(&self) -> String {
        match self.days_to_equalize {
            Some(days) => format!("{} days", days),
            None => "no single catch-up day".to_string(),
        }
    }
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {:+.1} | {} | rate {:.2} | {}",
            self.standing().as_str(),
            self.progress_differential,
            self.days_text(),
            self.progress_rate,
            self.leeway.as_str(),
        )
    }
}

/// Turn a review outcome into a summary. Errors other than a missing
/// equalization point are passed through.
fn summarize(
    engine: &ReviewEngine,
    goal: &GoalSpec,
    outcome: std::result::Result<StatusReport, TrackerError>,
) -> std::result::Result<Summary, TrackerError> {
    let (progress_differential, days_to_equalize, progress_rate) = match outcome {
        Ok(report) => (
            report.progress_differential,
            Some(report.days_to_equalize),
            report.progress_rate,
        ),
        Err(TrackerError::Goal(TrackError::NoEqualizationPoint {
            progress_differential,
            progress_rate,
        })) => (progress_differential, None, progress_rate),
        Err(e) => return Err(e),
    };
    let leeway = goal.leeway(engine.config().leeway_factor);
    Ok(Summary {
        progress_differential,
        days_to_equalize,
        progress_rate,
        leeway: LeewayBand::classify(progress_differential, leeway),
    })
}

/// Print the one-line status of a goal after logging to it.
async fn print_status(
    tracker: &GoalTracker<JsonStorage>,
    name: &GoalName,
    as_of: Time,
) -> Result<()> {
    let goal = tracker.goal(name).await?;
    let outcome = tracker.review(name, as_of).await;
    match summarize(tracker.engine(), &goal, outcome) {
        Ok(summary) => println!("  {}", summary),
        Err(e) => println!("  review unavailable: {}", e),
    }
    Ok(())
}

/// Parse an RFC 3339 moment or a bare date (midnight UTC).
fn parse_moment(s: &str) -> std::result::Result<Time, String> {
    if let Ok(moment) = DateTime::parse_from_rfc3339(s) {
        return Ok(moment.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map(|date| Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)))
        .map_err(|_| format!("expected RFC 3339 or YYYY-MM-DD, got {s:?}"))
}
