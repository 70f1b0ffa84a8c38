use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "duecal",
    version,
    about = "Task calendar with due-date reminders",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append,
        global = true
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    #[arg(long = "data", global = true)]
    pub data: Option<PathBuf>,

    /// Pretend today is this date (YYYY-MM-DD).
    #[arg(long = "today", global = true)]
    pub today: Option<String>,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// all, pending or completed
    #[arg(long)]
    pub status: Option<String>,

    /// all, low, medium or high
    #[arg(long)]
    pub priority: Option<String>,

    /// all, personal, work, shopping, health or other
    #[arg(long)]
    pub category: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct TaskFields {
    #[arg(long)]
    pub priority: Option<String>,

    #[arg(long)]
    pub category: Option<String>,

    /// YYYY-MM-DD, today, tomorrow, +3d, ...
    #[arg(long)]
    pub due: Option<String>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CliCommand {
    /// Create a task
    Add {
        title: String,
        body: String,
        #[command(flatten)]
        fields: TaskFields,
    },
    /// Change fields of a task
    Edit {
        id: u64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        body: Option<String>,
        #[command(flatten)]
        fields: TaskFields,
        /// Remove the due date
        #[arg(long, conflicts_with = "due")]
        no_due: bool,
    },
    /// Toggle completion
    Done { id: u64 },
    /// Delete a task
    Delete { id: u64 },
    /// Delete every task
    Clear {
        #[arg(long)]
        yes: bool,
    },
    /// Show one task
    Show { id: u64 },
    /// List tasks
    List {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Month grid with tasks on their due dates
    Calendar {
        /// YYYY-MM; defaults to the current month
        month: Option<String>,
        /// Months to move from the chosen month, e.g. -1 or 2
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        shift: i32,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Upcoming and overdue reminders
    Reminders,
    /// Emit the daily reminder alerts if not yet shown today
    Check,
    /// Re-run the daily check on the configured interval
    Watch,
    /// Task counts
    Stats,
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{CliCommand, GlobalCli};

    #[test]
    fn parses_add_with_fields() {
        let cli = GlobalCli::parse_from([
            "duecal",
            "add",
            "Pay rent",
            "June",
            "--priority",
            "high",
            "--due",
            "tomorrow",
            "--rc",
            "color=off",
        ]);
        assert_eq!(cli.rc_overrides[0].key, "color");
        match cli.command {
            Some(CliCommand::Add { title, fields, .. }) => {
                assert_eq!(title, "Pay rent");
                assert_eq!(fields.priority.as_deref(), Some("high"));
                assert_eq!(fields.due.as_deref(), Some("tomorrow"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_calendar_shift_and_filters() {
        let cli = GlobalCli::parse_from([
            "duecal",
            "calendar",
            "2024-06",
            "--shift",
            "-1",
            "--status",
            "pending",
        ]);
        match cli.command {
            Some(CliCommand::Calendar { month, shift, filter }) => {
                assert_eq!(month.as_deref(), Some("2024-06"));
                assert_eq!(shift, -1);
                assert_eq!(filter.status.as_deref(), Some("pending"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn edit_rejects_due_with_no_due() {
        let parsed =
            GlobalCli::try_parse_from(["duecal", "edit", "3", "--due", "today", "--no-due"]);
        assert!(parsed.is_err());
    }
}
