//! Steward - turns repository state and review comments into next steps.
//!
//! `steward analyze` reads the repository through the GitHub API and a local
//! clone and prints a prioritized action list. `steward parse` extracts
//! action items from a comment and composes a directive.

use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use serde::Serialize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use steward::analysis::{self, render_report, sort_by_priority, Action};
use steward::core::{Config, DegradedSignal};
use steward::extract::{read_input, ParseOutput};
use steward::github::{resolve_repository, GitHubClient, GitHubGateway};

/// Turn repository state and review comments into a prioritized list of next steps
#[derive(Parser)]
#[command(name = "steward")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use this configuration file instead of the default locations
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze the repository and list recommended actions
    Analyze {
        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Sort actions by priority instead of rule order
        #[arg(short, long)]
        sort: bool,

        /// Repository as owner/name (defaults to config, GITHUB_REPOSITORY, then the git remote)
        #[arg(short, long)]
        repo: Option<String>,
    },

    /// Extract action items from a comment and compose a directive
    Parse {
        /// Comment body, or `-` to read stdin
        text: Option<String>,

        /// Read the comment body from a file
        #[arg(short = 'F', long, conflicts_with = "text")]
        file: Option<PathBuf>,

        /// Issue the comment belongs to
        #[arg(long, env = "ISSUE_NUMBER", default_value = "unknown")]
        context: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "json")]
        format: OutputFormat,
    },

    /// Show configuration
    Config {
        /// Show config file path
        #[arg(long)]
        path: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so JSON on stdout stays parseable
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Analyze { format, sort, repo } => {
            let config = load_config(cli.config.as_ref())?;
            cmd_analyze(&config, format, sort, repo.as_deref())?;
        }
        Commands::Parse { text, file, context, format } => {
            let config = load_config(cli.config.as_ref())?;
            cmd_parse(&config, text.as_deref(), file.as_deref(), &context, format)?;
        }
        Commands::Config { path } => {
            cmd_config(cli.config.as_ref(), path)?;
        }
        Commands::Completions { shell } => {
            cmd_completions(shell);
        }
    }

    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Config::load(),
    }
}

#[derive(Serialize)]
struct AnalyzeOutput<'a> {
    actions: &'a [Action],
    degraded: &'a [DegradedSignal],
    has_actions: bool,
}

/// Analyze the repository and print the action list.
fn cmd_analyze(
    config: &Config,
    format: OutputFormat,
    sort: bool,
    repo: Option<&str>,
) -> Result<()> {
    let (owner, name) = resolve_repository(repo, &config.repository)?;

    let Some(token) = GitHubClient::token_from_env() else {
        anyhow::bail!(
            "GitHub token not found.\n\
             Set GITHUB_TOKEN or GH_TOKEN to a token with 'repo' and 'read:project' scopes."
        );
    };

    let client = GitHubClient::new(&config.network.api_url, &owner, &name, token, config.timeout())
        .context("Failed to create GitHub client")?;
    let gateway =
        GitHubGateway::new(client, &config.repository.remote, &config.board.status_field);

    #[cfg(feature = "git")]
    let gateway = {
        let local = steward::LocalRepository::discover(&config.repository.path);
        if local.is_none() {
            tracing::info!(
                path = %config.repository.path.display(),
                "no local clone found, using the API for branches and history"
            );
        }
        gateway.with_local(local)
    };

    if matches!(format, OutputFormat::Text) {
        eprintln!("🔍 Analyzing {owner}/{name}...");
    }

    let pending = analysis::analyze(gateway, config, Utc::now());
    let mut result = block_on_bounded(pending, config.timeout())?;

    if sort {
        sort_by_priority(&mut result.actions);
    }

    let degraded = &result.snapshot.degradations;
    match format {
        OutputFormat::Text => {
            print!("{}", render_report(&result.actions, degraded));
        }
        OutputFormat::Json => {
            let output = AnalyzeOutput {
                actions: &result.actions,
                degraded,
                has_actions: !result.actions.is_empty(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Run `future` to completion on a fresh runtime.
///
/// Blocking work left behind by timed-out queries, such as a stalled fetch,
/// gets `grace` to finish before the runtime is abandoned.
fn block_on_bounded<F: Future>(future: F, grace: Duration) -> Result<F::Output> {
    let rt = tokio::runtime::Runtime::new()?;
    let output = rt.block_on(future);
    rt.shutdown_timeout(grace);
    Ok(output)
}

/// Extract actions from a comment and print them with the directive.
fn cmd_parse(
    config: &Config,
    text: Option<&str>,
    file: Option<&std::path::Path>,
    context: &str,
    format: OutputFormat,
) -> Result<()> {
    let body = read_input(text, file)?;
    let output = ParseOutput::from_text(&body, context, &config.directive.mention);

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text => {
            if output.has_actions {
                print!("{}", output.instructions);
            } else {
                println!("No action items found.");
            }
        }
    }

    Ok(())
}

/// Generate shell completions.
fn cmd_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "steward", &mut io::stdout());
}

/// Show configuration.
fn cmd_config(explicit: Option<&PathBuf>, show_path: bool) -> Result<()> {
    if show_path {
        if let Some(path) = explicit.cloned().or_else(Config::global_path) {
            println!("{}", path.display());
        }
        return Ok(());
    }

    let config = load_config(explicit)?;
    let toml = toml::to_string_pretty(&config)?;
    println!("{toml}");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_block_on_bounded_abandons_stalled_blocking_work() {
        let started = Instant::now();
        let output = block_on_bounded(
            async {
                let _stalled =
                    tokio::task::spawn_blocking(|| std::thread::sleep(Duration::from_secs(10)));
                7
            },
            Duration::from_millis(50),
        )
        .unwrap();

        assert_eq!(output, 7);
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
