//! Application wiring: configuration, logging and command dispatch.

use crate::commands::{Cli, Commands, ExportArgs, OutputFormat, StatsArgs, StatsJob, TimelineArgs};
use crate::error::{CliError, Result};
use clap::Parser;
use serde::Serialize;
use std::fmt::Display;
use std::path::PathBuf;
use tracing::{debug, info};
use wxdoc_analysis::{render_timeline_svg, Statistics};
use wxdoc_core::window::{parse_local_time, parse_month};
use wxdoc_core::WxdocConfig;
use wxdoc_export::Exporter;

/// Overrides the configured data root.
pub const DATA_ROOT_ENV: &str = "WXDOC_DATA_ROOT";
/// Overrides the configured output directory.
pub const OUTPUT_DIR_ENV: &str = "WXDOC_OUTPUT_DIR";

/// CLI application state.
pub struct App {
    /// Effective configuration.
    pub config: WxdocConfig,
    /// Parsed CLI arguments.
    pub cli: Cli,
}

impl App {
    /// Create a new application instance from command line arguments.
    pub fn new() -> Result<Self> {
        Self::from_cli(Cli::parse())
    }

    /// Create an application from already parsed arguments.
    pub fn from_cli(cli: Cli) -> Result<Self> {
        let mut config = Self::load_config(&cli)?;
        apply_env_overrides(&mut config, |key| std::env::var(key).ok());
        config.validate()?;
        Ok(Self { config, cli })
    }

    /// Load configuration from `--config`, else the default location if present.
    fn load_config(cli: &Cli) -> Result<WxdocConfig> {
        if let Some(config_path) = &cli.config {
            if !config_path.exists() {
                return Err(CliError::Config(format!(
                    "Configuration file not found: {}",
                    config_path.display()
                )));
            }
            return Ok(WxdocConfig::load(config_path)?);
        }

        match WxdocConfig::default_path() {
            Ok(path) if path.exists() => Ok(WxdocConfig::load(&path)?),
            _ => Ok(WxdocConfig::default()),
        }
    }

    /// Run the application.
    pub fn run(self) -> Result<()> {
        self.setup_logging();
        debug!("effective configuration: {:?}", self.config);

        match &self.cli.command {
            Commands::Export(args) => self.handle_export(args),
            Commands::Stats(args) => self.handle_stats(args),
        }
    }

    /// Set up logging based on verbosity level.
    fn setup_logging(&self) {
        let level = match self.cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        };

        let _ = env_logger::Builder::new()
            .filter_level(level)
            .format_module_path(false)
            .format_target(false)
            .format_timestamp(None)
            .try_init();
    }

    fn handle_export(&self, args: &ExportArgs) -> Result<()> {
        let from = parse_month(&args.from)?;
        let to = parse_month(&args.to)?;
        if to <= from {
            return Err(CliError::Argument(format!(
                "--to {} must be after --from {}",
                args.to, args.from
            )));
        }

        let mut exporter = Exporter::new(self.config.clone())?;
        let summaries = exporter.export_range(&args.contact, from, to)?;
        match args.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summaries)?),
            OutputFormat::Text => {
                for summary in &summaries {
                    println!(
                        "{}  {} records  {} placeholders  {} unhandled  {}",
                        summary.month,
                        summary.records,
                        summary.placeholders,
                        summary.unhandled,
                        summary.document.display()
                    );
                }
            }
        }
        info!("{} months exported for {}", summaries.len(), args.contact);
        Ok(())
    }

    fn handle_stats(&self, args: &StatsArgs) -> Result<()> {
        let contact = args
            .contact
            .as_deref()
            .ok_or_else(|| CliError::Argument("--contact is required".to_string()))?;
        let stats = Statistics::from_config(&self.config);

        match &args.job {
            StatsJob::Phrase { phrases } => {
                let usages = phrases
                    .iter()
                    .map(|phrase| stats.phrase_usage(contact, phrase))
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                match args.format {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&usages)?),
                    OutputFormat::Text => usages.iter().for_each(|usage| println!("{}", usage)),
                }
                Ok(())
            }
            StatsJob::Calls => emit(args.format, &stats.call_time(contact)?),
            StatsJob::Night => emit(args.format, &stats.night_activity(contact)?),
            StatsJob::Timeline(timeline) => self.handle_timeline(&stats, contact, args.format, timeline),
        }
    }

    fn handle_timeline(
        &self,
        stats: &Statistics,
        contact: &str,
        format: OutputFormat,
        args: &TimelineArgs,
    ) -> Result<()> {
        let from = parse_local_time(&args.from)?;
        let to = parse_local_time(&args.to)?;
        let timeline = stats.timeline(contact, from, to, args.interval_days)?;
        if let Some(chart) = &args.chart {
            render_timeline_svg(&timeline, chart)?;
        }
        emit(format, &timeline)
    }
}

fn emit<T: Serialize + Display>(format: OutputFormat, value: &T) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Text => println!("{}", value),
    }
    Ok(())
}

/// Apply `WXDOC_DATA_ROOT` and `WXDOC_OUTPUT_DIR` from `lookup`.
pub fn apply_env_overrides(config: &mut WxdocConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(data_root) = lookup(DATA_ROOT_ENV).filter(|v| !v.is_empty()) {
        config.data_root = PathBuf::from(data_root);
    }
    if let Some(output_dir) = lookup(OUTPUT_DIR_ENV).filter(|v| !v.is_empty()) {
        config.output_dir = PathBuf::from(output_dir);
    }
}

/// Parse command line arguments and run the application.
pub fn run() -> Result<()> {
    let app = App::new()?;
    app.run()
}
