//! linkwatch CLI
//!
//! Local execution entry point for the watcher.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use linkwatch::{
    error::{AppError, Result},
    models::Config,
    pipeline::{self, Monitor},
    services::{RedirectUpdater, RuleClient},
    storage::{HistoryFile, HistoryRepository, LinkConfigFile, LinkConfigRepository, load_edge_config},
};

/// linkwatch - referral domain watcher
#[derive(Parser, Debug)]
#[command(
    name = "linkwatch",
    version,
    about = "Watch a page for referral domain changes and propagate them"
)]
struct Cli {
    /// Path to storage directory containing config files
    #[arg(short, long, default_value = "storage", env = "LINKWATCH_STORAGE_DIR")]
    storage_dir: PathBuf,

    /// Enable the redirect-rule sink
    #[arg(long, env = "LINKWATCH_RULES")]
    rules: bool,

    /// Enable the source-file sink
    #[arg(long, env = "LINKWATCH_PUBLISH")]
    publish: bool,

    /// Seconds between checks (overrides config.toml)
    #[arg(short, long, env = "LINKWATCH_INTERVAL")]
    interval: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a single check and propagate any change
    Check,

    /// Check on an interval until interrupted
    Monitor,

    /// Print the recorded history
    History,

    /// Inspect the rule API
    Rules {
        #[command(subcommand)]
        action: RulesCommand,
    },

    /// Validate configuration files
    Validate,
}

#[derive(Subcommand, Debug)]
enum RulesCommand {
    /// List redirect rule-sets and their rules
    List,

    /// Look up a zone by name to check the API token
    Zone {
        /// Zone name, e.g. example.com
        name: String,
    },
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        if e.is_config_not_found() {
            eprintln!("{e}");
        } else {
            log::error!("{e}");
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    log::info!("linkwatch starting...");

    let config_path = cli.storage_dir.join("config.toml");
    let mut config = Config::load_or_default(&config_path);
    if cli.rules {
        config.rules.enabled = true;
    }
    if cli.publish {
        config.publish.enabled = true;
    }
    if let Some(interval) = cli.interval {
        config.monitor.interval_secs = interval;
    }
    config.validate()?;

    log::info!("Loaded configuration from {}", cli.storage_dir.display());

    match cli.command {
        Command::Check => {
            let mut monitor = Monitor::from_config(&config, &cli.storage_dir).await?;
            let report = monitor.run_cycle().await;

            match &report.domain {
                Some(domain) => println!("Current domain: {domain}"),
                None => println!("Current domain: unavailable this cycle"),
            }
            println!("Redirect rule: {:?}", report.rule);
            println!("Source files: {:?}", report.publish);
            println!();
            println!("{}", pipeline::render_history(monitor.detector().history()));
        }

        Command::Monitor => {
            let mut monitor = Monitor::from_config(&config, &cli.storage_dir).await?;
            let interval = Duration::from_secs(config.monitor.interval_secs);
            log::info!(
                "Monitoring every {}s, press Ctrl+C to stop",
                interval.as_secs()
            );

            let (tx, rx) = tokio::sync::oneshot::channel::<()>();
            tokio::spawn(async move {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => {
                        let _ = tx.send(());
                    }
                    Err(e) => log::warn!("Could not listen for Ctrl+C: {e}"),
                }
            });
            let shutdown = async move {
                if rx.await.is_err() {
                    std::future::pending::<()>().await;
                }
            };

            pipeline::run_monitor(&mut monitor, interval, shutdown).await;
            println!("{}", pipeline::render_history(monitor.detector().history()));
        }

        Command::History => {
            let history = HistoryFile::new(config.history_path(&cli.storage_dir));
            println!("{}", pipeline::render_history(&history.load().await?));
        }

        Command::Rules { action } => {
            let edge = load_edge_config(&config.edge_config_path(&cli.storage_dir)).await?;

            match action {
                RulesCommand::List => {
                    let updater = RedirectUpdater::from_config(
                        &edge,
                        &config.rules.phase,
                        config.rules.timeout_secs,
                    )?;
                    let rulesets = updater.redirect_rulesets().await?;
                    if rulesets.is_empty() {
                        println!("No {} rule-sets in zone {}", config.rules.phase, edge.zone_id);
                    }
                    for ruleset in &rulesets {
                        println!(
                            "{} ({})",
                            ruleset.name,
                            ruleset.id.as_deref().unwrap_or("-")
                        );
                        for rule in &ruleset.rules {
                            let marker = if edge.rule_id() == rule.id.as_deref() {
                                "*"
                            } else {
                                " "
                            };
                            println!(
                                " {marker} {} [{}] {} -> {}",
                                rule.id.as_deref().unwrap_or("-"),
                                if rule.enabled { "on" } else { "off" },
                                rule.description.as_deref().unwrap_or(&rule.expression),
                                rule.target_url().unwrap_or("(dynamic)")
                            );
                        }
                    }
                }
                RulesCommand::Zone { name } => {
                    let client = RuleClient::new(&edge, config.rules.timeout_secs)?;
                    match client.find_zone(&name).await? {
                        Some(zone) => println!(
                            "{} -> {} ({})",
                            zone.name,
                            zone.id,
                            zone.status.as_deref().unwrap_or("unknown")
                        ),
                        None => {
                            return Err(AppError::validation(format!("zone {name} not found")));
                        }
                    }
                }
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");
            log::info!("✓ config.toml OK");

            if config.rules.enabled {
                let edge = load_edge_config(&config.edge_config_path(&cli.storage_dir)).await?;
                if edge.api_token.trim().is_empty() || edge.zone_id.trim().is_empty() {
                    return Err(AppError::validation(
                        "api_token and zone_id are required in the rule config",
                    ));
                }
                log::info!("✓ Rule config OK (zone {})", edge.zone_id);
            }

            if config.publish.enabled {
                let repo = LinkConfigFile::new(config.link_config_path(&cli.storage_dir));
                let link_config = repo.load().await?;
                check_files(&config.publish.repo_path, &link_config.files);
                log::info!("✓ Link config OK ({} files)", link_config.files.len());
            }

            log::info!("All validations passed!");
        }
    }

    log::info!("Done!");

    Ok(())
}

/// Warn about configured files that do not exist; missing files are skipped at publish time.
fn check_files(repo_path: &Path, files: &[PathBuf]) {
    for file in files {
        let path = if file.is_absolute() {
            file.clone()
        } else {
            repo_path.join(file)
        };
        if !path.exists() {
            log::warn!("Configured file not found: {}", path.display());
        }
    }
}
