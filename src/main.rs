mod cmd;
mod config;
mod context;
mod domain;
mod error;
mod infra;
mod services;
mod workflow;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::cmd::config::{self as config_cmd, ConfigArgs};
use crate::cmd::rewrite::{self, RewriteCommandArgs};
use crate::config::{AppConfig, DEFAULT_CONFIG_FILE};
use crate::context::AppContext;
use crate::error::AppResult;
use crate::infra::git::GitCli;
use crate::infra::ollama::OllamaClient;

#[derive(Parser)]
#[command(
    name = "historian",
    author,
    version,
    about = "Rewrite a repository's commit messages, dates and author with generated values"
)]
struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Log debug output to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Regenerate message, date and author of every commit on a branch.
    Rewrite(RewriteArgs),
    /// Manage CLI configuration.
    Config(ConfigArgs),
}

#[derive(Args)]
struct RewriteArgs {
    /// Branch to rewrite instead of the configured or current one.
    #[arg(short, long)]
    branch: Option<String>,

    /// Print the planned history without touching the repository.
    #[arg(long)]
    dry_run: bool,

    /// Seed for the date generator, for a reproducible sequence of dates.
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(error) = run(cli).await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> AppResult<()> {
    match cli.command {
        Commands::Config(args) => config_cmd::run(args.command, &cli.config),
        Commands::Rewrite(args) => run_rewrite(&cli.config, args).await,
    }
}

async fn run_rewrite(config_path: &Path, args: RewriteArgs) -> AppResult<()> {
    let config = AppConfig::load(config_path)?;

    let git = Arc::new(GitCli::open(config.repo_path.clone())?);
    tracing::debug!(repo = %git.repo_root().display(), "opened repository");
    let language_model = Arc::new(OllamaClient::new(
        config.ollama_host.clone(),
        config.ollama_model.clone(),
    ));

    let context = AppContext::new(config, git, language_model);

    let outcome = rewrite::run(
        &context,
        RewriteCommandArgs {
            branch: args.branch,
            dry_run: args.dry_run,
            seed: args.seed,
        },
    )
    .await?;

    if outcome.rewritten == 0 {
        println!("No commits found to rewrite on '{}'.", outcome.branch);
    } else if outcome.dry_run {
        println!(
            "Dry run complete: {} commit(s) on '{}' would be rewritten.",
            outcome.rewritten, outcome.branch
        );
    } else {
        println!(
            "Successfully rewrote {} commit(s). HEAD reattached to '{}'.",
            outcome.rewritten, outcome.branch
        );
        if let Some(head) = &outcome.new_head {
            println!("New head: {head}");
        }
    }

    Ok(())
}
