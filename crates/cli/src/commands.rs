//! CLI command definitions for wxdoc.
//!
//! Exports a contact's conversation as monthly Word transcripts and runs
//! statistics over the same store.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Main CLI application.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Logging verbosity
    #[arg(short, long, default_value_t = 0, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, env = "WXDOC_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write one transcript document per calendar month
    Export(ExportArgs),

    /// Run a statistics job over the conversation
    Stats(StatsArgs),
}

/// Monthly export arguments.
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Contact remark name
    #[arg(long)]
    pub contact: String,

    /// First month to export (YYYY-MM)
    #[arg(long)]
    pub from: String,

    /// Month to stop before (YYYY-MM)
    #[arg(long)]
    pub to: String,

    /// Output format for the per-month summary
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// Statistics arguments.
#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Contact remark name
    #[arg(long, global = true)]
    pub contact: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,

    /// Statistics job
    #[command(subcommand)]
    pub job: StatsJob,
}

/// Statistics jobs.
#[derive(Subcommand, Debug)]
pub enum StatsJob {
    /// Count occurrences of each phrase in text messages
    Phrase {
        /// Phrases to count
        #[arg(required = true)]
        phrases: Vec<String>,
    },

    /// Sum call durations
    Calls,

    /// Count days on which the conversation opened after midnight
    Night,

    /// Count messages per interval
    Timeline(TimelineArgs),
}

/// Timeline arguments.
#[derive(Args, Debug)]
pub struct TimelineArgs {
    /// Start (YYYY-MM-DD or YYYY-MM-DD HH:MM:SS)
    #[arg(long)]
    pub from: String,

    /// End, exclusive
    #[arg(long)]
    pub to: String,

    /// Interval length in days
    #[arg(long, default_value_t = 1)]
    pub interval_days: u32,

    /// Also draw the timeline to this SVG file
    #[arg(long)]
    pub chart: Option<PathBuf>,
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Plain text
    Text,
    /// JSON format
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_arguments_parse() {
        let cli = Cli::try_parse_from([
            "wxdoc", "-vv", "export", "--contact", "Mia", "--from", "2021-01", "--to", "2021-03",
        ])
        .expect("parse");
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Export(args) => {
                assert_eq!(args.contact, "Mia");
                assert_eq!(args.from, "2021-01");
                assert_eq!(args.to, "2021-03");
                assert_eq!(args.format, OutputFormat::Text);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn phrase_job_takes_several_phrases() {
        let cli = Cli::try_parse_from([
            "wxdoc", "stats", "--contact", "Mia", "--format", "json", "phrase", "晚安", "早安",
        ])
        .expect("parse");
        match cli.command {
            Commands::Stats(StatsArgs {
                contact,
                format,
                job: StatsJob::Phrase { phrases },
            }) => {
                assert_eq!(contact.as_deref(), Some("Mia"));
                assert_eq!(format, OutputFormat::Json);
                assert_eq!(phrases, vec!["晚安", "早安"]);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn contact_may_follow_the_job() {
        let cli = Cli::try_parse_from(["wxdoc", "stats", "calls", "--contact", "Mia"])
            .expect("parse");
        match cli.command {
            Commands::Stats(args) => {
                assert_eq!(args.contact.as_deref(), Some("Mia"));
                assert!(matches!(args.job, StatsJob::Calls));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn timeline_defaults_to_daily_intervals() {
        let cli = Cli::try_parse_from([
            "wxdoc", "stats", "--contact", "Mia", "timeline", "--from", "2021-04-01", "--to",
            "2021-05-01",
        ])
        .expect("parse");
        match cli.command {
            Commands::Stats(StatsArgs {
                job: StatsJob::Timeline(args),
                ..
            }) => {
                assert_eq!(args.interval_days, 1);
                assert!(args.chart.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn phrase_job_requires_a_phrase() {
        assert!(Cli::try_parse_from(["wxdoc", "stats", "--contact", "Mia", "phrase"]).is_err());
        assert!(Cli::try_parse_from(["wxdoc", "export", "--contact", "Mia"]).is_err());
    }
}
