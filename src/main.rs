mod cli;
mod ui;

use std::io::Read;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};
use jobkeeper::backend::{FirestoreRegistry, GcsObjectStore};
use jobkeeper::config::KeeperConfig;
use jobkeeper::job::{Detection, JobChange, JobStatus, TransitionDetector};
use jobkeeper::notify::{Notifier, WebhookSink};
use jobkeeper::reconcile::Reconciler;
use jobkeeper::report::RunReport;
use jobkeeper::stats::{StatsAggregator, StatsReport};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            let report: RunReport<StatsReport> = RunReport::failure(&format!("{e:#}"));
            ui::print_report("jobkeeper", &report);
            std::process::exit(2);
        }
    }
}

// Logs go to stderr; stdout carries only the result document.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<bool> {
    // Detection without --notify must not depend on the configuration file.
    let config = if cli.command.needs_config() {
        KeeperConfig::load(cli.config.as_deref()).context("failed to load configuration")?
    } else {
        KeeperConfig::default()
    };

    match cli.command {
        Command::Reconcile { prefix, dry_run } => {
            config.require_storage()?;
            config.require_registry()?;
            let store = GcsObjectStore::with_base_url(
                config.bucket.clone(),
                config.token(),
                config.storage_base_url.clone(),
            )?
            .with_page_size(config.page_size);
            let registry = registry(&config)?;

            let mut options = config.reconcile_options();
            if let Some(prefix) = prefix {
                options.prefix = prefix;
            }
            options.dry_run = dry_run;

            let report = match Reconciler::new(&store, &registry, options).reconcile().await {
                Ok(summary) => summary.into_report(),
                Err(e) => {
                    tracing::error!(error = %e, "Reconciliation aborted");
                    RunReport::failure(&e)
                }
            };
            Ok(ui::print_report("Reconcile", &report))
        }
        Command::Stats => {
            config.require_registry()?;
            let registry = registry(&config)?;
            let report = match StatsAggregator::new(&registry).aggregate().await {
                Ok(stats) => RunReport::Success(stats),
                Err(e) => {
                    tracing::error!(error = %e, "Statistics scan failed");
                    RunReport::failure(&e)
                }
            };
            Ok(ui::print_report("Stats", &report))
        }
        Command::Detect {
            job_id,
            old,
            new,
            filename,
            notify,
        } => {
            let old = old.map(JobStatus::from);
            let new = new.map(JobStatus::from);
            let detection = TransitionDetector::detect(
                &job_id,
                old.as_ref(),
                new.as_ref(),
                filename.as_deref(),
            );
            deliver(&config, detection, notify).await
        }
        Command::DetectChange { file, notify } => {
            let raw = read_input(&file)?;
            let change: JobChange =
                serde_json::from_str(&raw).context("invalid change document")?;
            let detection = TransitionDetector::detect_change(&change);
            deliver(&config, detection, notify).await
        }
    }
}

fn registry(config: &KeeperConfig) -> Result<FirestoreRegistry> {
    let registry = FirestoreRegistry::with_base_url(
        config.project_id.clone(),
        config.collection.clone(),
        config.token(),
        config.firestore_base_url.clone(),
    )?
    .with_page_size(config.page_size);
    Ok(registry)
}

// Prints exactly one document: the detection, or the delivery error carrying it.
async fn deliver(config: &KeeperConfig, detection: Detection, notify: bool) -> Result<bool> {
    if !notify {
        ui::print_detection(&detection);
        return Ok(true);
    }
    let webhook = config
        .webhook_url
        .clone()
        .filter(|url| !url.is_empty())
        .map(WebhookSink::new)
        .transpose()?;
    match Notifier::new(webhook).deliver(detection).await {
        Ok(detection) => {
            ui::print_detection(&detection);
            Ok(true)
        }
        Err(report) => Ok(ui::print_report("Notify", &report)),
    }
}

fn read_input(file: &str) -> Result<String> {
    if file == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        return Ok(buf);
    }
    std::fs::read_to_string(file).with_context(|| format!("failed to read {file}"))
}
