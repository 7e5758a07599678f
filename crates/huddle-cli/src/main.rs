#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{Parser, Subcommand};
use output::OutputMode;
use std::env;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use huddle_core::config::{EngineConfig, discover_config, load_config};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "huddle: distribution and data resolution for live slide sessions",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Config file to use instead of `.huddle/config.toml`.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    const fn output_mode(&self) -> OutputMode {
        if self.json {
            OutputMode::Json
        } else {
            OutputMode::Pretty
        }
    }

    fn engine_config(&self) -> anyhow::Result<EngineConfig> {
        match &self.config {
            Some(path) => load_config(path),
            None => discover_config(&env::current_dir()?),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Distribution",
        about = "Check whether items can be distributed",
        long_about = "Check a distribution run for feasibility without assigning anything.\n\
                      Exits non-zero when the run would be rejected.",
        after_help = "EXAMPLES:\n    # Check a strict one-per-participant run\n    huddle validate --items items.json --participants people.json --mismatch strict\n\n    # Emit machine-readable output\n    huddle validate --items items.json --participants people.json --json"
    )]
    Validate(cmd::validate::ValidateArgs),

    #[command(
        next_help_heading = "Distribution",
        about = "Hand items out to participants",
        long_about = "Validate, then distribute items to participants under the chosen mode.",
        after_help = "EXAMPLES:\n    # Reproducible random deal\n    huddle distribute --items items.json --participants people.json --mode random --seed 7\n\n    # Nobody reviews their own idea\n    huddle distribute --items items.json --participants people.json --mode exclude-own"
    )]
    Distribute(cmd::distribute::DistributeArgs),

    #[command(
        next_help_heading = "Snapshot",
        about = "Resolve a data reference against a snapshot",
        long_about = "Resolve a structured reference (namespace/accessor[/transformer]) or a\n\
                      path string against a snapshot file and print its display text.",
        after_help = "EXAMPLES:\n    # How many responses did slide-1 collect?\n    huddle resolve --snapshot state.json slide-1/responses/count\n\n    # What was p1 handed on slide-2?\n    huddle resolve --snapshot state.json slide-2/assignments/mine --caller p1"
    )]
    Resolve(cmd::resolve::ResolveArgs),

    #[command(
        next_help_heading = "Snapshot",
        about = "Summarize snapshot layout and slide population",
        after_help = "EXAMPLES:\n    # Every slide in the snapshot\n    huddle analyze --snapshot state.json\n\n    # One slide, as JSON\n    huddle analyze --snapshot state.json slide-1 --json"
    )]
    Analyze(cmd::analyze::AnalyzeArgs),

    #[command(
        next_help_heading = "Snapshot",
        about = "Merge participant-local states into a snapshot",
        after_help = "EXAMPLES:\n    huddle merge --snapshot state.json --states locals.json > merged.json"
    )]
    Merge(cmd::merge::MergeArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("HUDDLE_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "huddle=debug,huddle_core=debug,huddle_distribute=debug,info"
        } else {
            "huddle=info,huddle_core=info,huddle_distribute=info,warn"
        })
    });

    let format = env::var("HUDDLE_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let output = cli.output_mode();
    let config = cli.engine_config()?;

    match &cli.command {
        Commands::Validate(args) => cmd::validate::run_validate(args, config.distribution, output),
        Commands::Distribute(args) => {
            cmd::distribute::run_distribute(args, config.distribution, output)
        }
        Commands::Resolve(args) => cmd::resolve::run_resolve(args, &config, output),
        Commands::Analyze(args) => cmd::analyze::run_analyze(args, output),
        Commands::Merge(args) => cmd::merge::run_merge(args, output),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn json_flag_is_global() {
        let cli = Cli::parse_from(["huddle", "analyze", "--snapshot", "s.json", "--json"]);
        assert_eq!(cli.output_mode(), OutputMode::Json);
    }

    #[test]
    fn config_flag_is_captured() {
        let cli = Cli::parse_from([
            "huddle",
            "--config",
            "custom.toml",
            "merge",
            "--states",
            "s.json",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
    }
}
