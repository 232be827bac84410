use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::runtime::Runtime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use repolens::cli::commands;

#[derive(Parser)]
#[command(name = "repolens")]
#[command(version, about = "AI-assisted codebase structure analysis")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long)]
    verbose: bool,

    #[arg(long, short)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a workspace and produce a markdown overview
    Analyze {
        #[arg(default_value = ".", help = "Workspace root to analyze")]
        path: PathBuf,
        #[arg(long, short, help = "Write the markdown to a file instead of stdout")]
        output: Option<PathBuf>,
        #[arg(long, help = "Discard any cached analysis first")]
        refresh: bool,
        #[arg(long, help = "Model to use")]
        model: Option<String>,
    },

    /// Print the filtered directory tree as the analyzer sees it
    Tree {
        #[arg(default_value = ".", help = "Workspace root to scan")]
        path: PathBuf,
        #[arg(long, help = "Also print the content hash used as the cache key")]
        hash: bool,
    },

    /// Inspect or clear the analysis cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Show the cached record and whether it is still valid
    Status {
        #[arg(default_value = ".", help = "Workspace root")]
        path: PathBuf,
    },
    /// Delete the cached record
    Clear {
        #[arg(default_value = ".", help = "Workspace root")]
        path: PathBuf,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json"
        )]
        format: String,
    },
    /// Show configuration file paths
    Path,
    /// Initialize project configuration
    Init {
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
    },
}

fn main() -> ExitCode {
    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Analyze {
            path,
            output,
            refresh,
            model,
        } => {
            let rt = Runtime::new()?;
            rt.block_on(commands::analyze::run(commands::analyze::AnalyzeOptions {
                path,
                output,
                refresh,
                model,
            }))?;
        }
        Commands::Tree { path, hash } => {
            commands::tree::run(&path, hash)?;
        }
        Commands::Cache { action } => {
            let rt = Runtime::new()?;
            match action {
                CacheAction::Status { path } => rt.block_on(commands::cache::status(&path))?,
                CacheAction::Clear { path } => rt.block_on(commands::cache::clear(&path))?,
            }
        }
        Commands::Config { action } => match action {
            ConfigAction::Show { format } => {
                commands::config::show(&format)?;
            }
            ConfigAction::Path => {
                commands::config::path()?;
            }
            ConfigAction::Init { force } => {
                commands::config::init(force)?;
            }
        },
    }

    Ok(())
}
