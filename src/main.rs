//! kompass - a multi-cluster Kubernetes resource graph
//!
//! Builds one client per kubeconfig context, crawls every reachable cluster
//! on an interval, and answers navigation, search, and pod-health queries
//! over the materialized graph.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use kompass::config::paths;
use kompass::models::Hierarchy;
use kompass::query::ResourceSummary;
use kompass::{ClusterRegistry, ConfigLoader, CrawlOrchestrator, GraphStore, QueryService};

#[derive(Parser, Debug)]
#[command(name = "kompass")]
#[command(about = "A multi-cluster Kubernetes resource graph", long_about = None)]
struct Args {
    /// Enable debug logging
    #[arg(long, short = 'd')]
    debug: bool,

    /// Path to the kubeconfig file (defaults to the standard locations)
    #[arg(long)]
    kubeconfig: Option<PathBuf>,

    /// Seconds between crawl cycles
    #[arg(long)]
    interval: Option<u64>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl the configured clusters and keep the graph fresh
    Crawl {
        /// Run a single cycle and exit
        #[arg(long)]
        once: bool,
    },
    /// Crawl once, then list the children of a node in one hierarchy
    Ls {
        /// Hierarchy to walk: app or cluster
        hierarchy: String,
        /// Node to list under; omit for the top level
        id: Option<String>,
    },
    /// Crawl once, then search the graph
    ///
    /// Supports `app:`, `kind:`, `cluster:`, and `ns:` filters plus free-text
    /// name terms, e.g. `kompass search kind:pod app:shop web`.
    Search {
        query: Vec<String>,
    },
    /// Crawl once, then list every unhealthy pod
    Unhealthy,
    /// Configuration management
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigSubcommand {
    /// Print the effective configuration
    List,
    /// Show the configuration file path
    Path,
}

/// Initialize logging based on debug flag
/// Returns the log file path if debug logging is enabled
fn init_logging(debug: bool) -> Option<PathBuf> {
    if !debug {
        return None;
    }
    let temp_file = tempfile::Builder::new()
        .prefix("kompass-")
        .suffix(".log")
        .tempfile()
        .map(|f| {
            let path = f.path().to_path_buf();
            // Keep the file alive; the OS temp cleaner reclaims it
            std::mem::forget(f);
            path
        })
        .unwrap_or_else(|_| {
            std::env::temp_dir().join(format!("kompass-{}.log", std::process::id()))
        });

    let file = std::fs::OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(&temp_file)
        .expect("Failed to open log file");

    tracing_subscriber::fmt()
        .with_writer(file)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    Some(temp_file)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(Command::Config { subcommand }) = &args.command {
        return handle_config_command(subcommand);
    }

    let log_file = init_logging(args.debug);
    if let Some(ref log_path) = log_file {
        eprintln!(
            "Debug logging enabled. Logs written to: {}",
            log_path.display()
        );
    }

    let mut settings = ConfigLoader::load().context("Failed to load configuration")?;
    if let Some(path) = &args.kubeconfig {
        settings.kubeconfig = Some(path.clone());
    }
    if let Some(interval) = args.interval {
        settings.crawl_interval_secs = interval;
    }

    let registry = ClusterRegistry::from_kubeconfig(&settings)
        .await
        .context("Failed to build cluster clients")?;
    tracing::info!(clusters = registry.len(), "cluster registry ready");

    let store = GraphStore::new();
    let orchestrator = Arc::new(CrawlOrchestrator::new(
        registry,
        store.clone(),
        settings.probe_timeout(),
        settings.deployables_annotation.clone(),
    ));
    let queries = QueryService::new(store);

    match args.command.unwrap_or(Command::Crawl { once: false }) {
        Command::Crawl { once } => {
            let report = orchestrator.run_cycle().await?;
            print_report(&report);
            if once {
                return Ok(());
            }
            let mut ticker = tokio::time::interval(settings.crawl_interval());
            ticker.tick().await; // first tick fires immediately; already crawled
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match orchestrator.run_cycle().await {
                            Ok(report) => print_report(&report),
                            Err(err) => tracing::error!(%err, "crawl cycle failed"),
                        }
                    }
                    _ = tokio::signal::ctrl_c() => {
                        tracing::info!("shutting down");
                        break;
                    }
                }
            }
        }
        Command::Ls { hierarchy, id } => {
            let hierarchy: Hierarchy = hierarchy.parse().map_err(anyhow::Error::msg)?;
            orchestrator.run_cycle().await?;
            match id {
                Some(id) => {
                    let view = queries.children(hierarchy, &id);
                    let trail: Vec<&str> =
                        view.breadcrumbs.iter().map(|c| c.name.as_str()).collect();
                    println!("{}", trail.join(" / "));
                    print_rows(&view.rows);
                }
                None => print_rows(&queries.top_level(hierarchy)),
            }
        }
        Command::Search { query } => {
            orchestrator.run_cycle().await?;
            let hits = queries
                .search(&query.join(" "))
                .map_err(anyhow::Error::msg)?;
            print_rows(&hits);
        }
        Command::Unhealthy => {
            orchestrator.run_cycle().await?;
            let pods = queries.unhealthy();
            if pods.is_empty() {
                println!("No unhealthy pods");
            }
            for pod in &pods {
                let reason = pod
                    .health
                    .as_ref()
                    .map(|h| h.reason.as_str())
                    .unwrap_or("Unknown");
                println!(
                    "{}\t{}\t{}\t{}",
                    pod.cluster, pod.namespace, pod.name, reason
                );
            }
        }
        Command::Config { .. } => unreachable!("handled above"),
    }

    Ok(())
}

fn print_report(report: &kompass::CrawlReport) {
    println!(
        "crawled {} cluster(s), {} unreachable, {} resources upserted, {} retired",
        report.reachable.len(),
        report.unreachable.len(),
        report.upserted,
        report.retired
    );
    for name in &report.unreachable {
        eprintln!("warning: cluster {} was unreachable this cycle", name);
    }
}

fn print_rows(rows: &[ResourceSummary]) {
    for row in rows {
        let marker = if row.has_children { "+" } else { " " };
        println!(
            "{} {}\t{}\t{}\t{}\t{}",
            marker, row.kind, row.name, row.cluster, row.namespace, row.global_id
        );
    }
}

fn handle_config_command(cmd: &ConfigSubcommand) -> Result<()> {
    match cmd {
        ConfigSubcommand::List => {
            let settings = ConfigLoader::load().context("Failed to load configuration")?;
            let yaml =
                serde_yaml::to_string(&settings).context("Failed to serialize configuration")?;
            print!("{}", yaml);
        }
        ConfigSubcommand::Path => {
            println!("{}", paths::config_path().display());
        }
    }
    Ok(())
}
