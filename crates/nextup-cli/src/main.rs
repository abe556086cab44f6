mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{
    config::ConfigSubcommand, plan::EpisodeArgs, rule::RuleSubcommand, SonarrArgs,
};
use nextup_core::types::SeriesId;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "nextup",
    about = "Keep the next episode ready and the watched ones gone, driven by watch events",
    version,
    propagate_version = true
)]
struct Cli {
    /// Data root (default: auto-detect from .nextup/)
    #[arg(long, global = true, env = "NEXTUP_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(flatten)]
    sonarr: SonarrArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the webhook and rules API server
    Serve {
        /// Port to listen on
        #[arg(long, default_value = "5002", env = "NEXTUP_PORT")]
        port: u16,
    },

    /// Manage rules and series assignments
    Rule {
        #[command(subcommand)]
        subcommand: RuleSubcommand,
    },

    /// Inspect the rules file
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },

    /// Show what watching an episode would change, without applying it
    Plan {
        #[command(flatten)]
        episode: EpisodeArgs,
    },

    /// Apply the rule for a watched episode
    Process {
        #[command(flatten)]
        episode: EpisodeArgs,
    },

    /// Reduce a series to its season pilots, as on a series-added event
    InitSeries {
        series_id: SeriesId,
        /// Print the directives without applying them
        #[arg(long)]
        dry_run: bool,
    },

    /// Show lookups that failed against the library
    Missing,
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Serve { port } => cmd::serve::run(&root, &cli.sonarr, port),
        Commands::Rule { subcommand } => cmd::rule::run(&root, subcommand, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
        Commands::Plan { episode } => cmd::plan::plan(&root, &cli.sonarr, &episode, cli.json),
        Commands::Process { episode } => {
            cmd::plan::process(&root, &cli.sonarr, &episode, cli.json)
        }
        Commands::InitSeries { series_id, dry_run } => {
            cmd::init_series::run(&root, &cli.sonarr, series_id, dry_run, cli.json)
        }
        Commands::Missing => cmd::missing::run(&root, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
