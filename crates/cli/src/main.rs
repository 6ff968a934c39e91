use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use rgo_apply::{apply_all, delete_all, preview, CancelHandle, DeletePolicy, ExecContext, Outcome, OutputFormat};
use rgo_build::{build_all, BuildContext, DEFAULT_NAMESPACE};
use rgo_core::{Manifest, ObjectRef, ResourceKind};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use rgo_kubehub::KubeStore;
use tokio::signal;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "rgo", version, about = "rgo: manage Argo CD apps, projects, repos & creds via Kubernetes resources")]
struct Cli {
    /// Path to config file (YAML); defaults to ./config.yaml when present
    #[arg(long = "config", global = true, env = "RGO_CONFIG")]
    config: Option<PathBuf>,

    /// Argo CD namespace
    #[arg(short = 'n', long = "namespace", global = true, env = "RGO_NAMESPACE", default_value = DEFAULT_NAMESPACE)]
    namespace: String,

    /// Preview resources instead of applying
    #[arg(long = "dry-run", global = true, env = "RGO_DRY_RUN", action = ArgAction::SetTrue)]
    dry_run: bool,

    /// Output format for dry-run
    #[arg(short = 'o', long = "output", value_enum, global = true, env = "RGO_OUTPUT", default_value_t = Output::Yaml)]
    output: Output,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output { Yaml, Json }

impl From<Output> for OutputFormat {
    fn from(o: Output) -> Self {
        match o {
            Output::Yaml => OutputFormat::Yaml,
            Output::Json => OutputFormat::Json,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply all resources from config (projects, repos/creds, applications)
    Apply {
        /// Overall deadline for the whole batch
        #[arg(long = "timeout-secs", env = "RGO_APPLY_TIMEOUT_SECS", default_value_t = 90)]
        timeout_secs: u64,
    },
    /// Print every resource the config produces (same as `apply --dry-run`)
    Render,
    /// Delete a single resource by kind and name (kind: app|project|secret)
    Delete {
        /// app|application, project|appproject, secret
        kind: String,
        name: String,
        /// Succeed when the object is already gone
        #[arg(long = "ignore-not-found", action = ArgAction::SetTrue)]
        ignore_not_found: bool,
        #[arg(long = "timeout-secs", env = "RGO_DELETE_TIMEOUT_SECS", default_value_t = 60)]
        timeout_secs: u64,
    },
    /// Delete every resource the config produces, applications first
    Destroy {
        #[arg(long = "ignore-not-found", action = ArgAction::SetTrue)]
        ignore_not_found: bool,
        #[arg(long = "timeout-secs", env = "RGO_DELETE_TIMEOUT_SECS", default_value_t = 60)]
        timeout_secs: u64,
    },
}

fn init_tracing() {
    let env = std::env::var("RGO_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    // stdout is reserved for rendered manifests
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_writer(std::io::stderr).init();
}

fn init_metrics() {
    let Ok(addr) = std::env::var("RGO_METRICS_ADDR") else { return };
    match install_metrics(&addr) {
        Ok(_) => info!(addr = %addr, "Prometheus metrics exporter listening"),
        Err(e) => warn!(error = %e, "metrics exporter disabled"),
    }
}

/// Install the global recorder and serve its scrape on `addr`. The returned
/// handle renders the same registry the listener serves.
fn install_metrics(addr: &str) -> Result<PrometheusHandle> {
    let sock: SocketAddr = addr.parse().with_context(|| format!("invalid RGO_METRICS_ADDR {:?}; expected host:port", addr))?;
    let (recorder, exporter) = PrometheusBuilder::new().with_http_listener(sock).build().context("building metrics exporter")?;
    let handle = recorder.handle();
    metrics::set_boxed_recorder(Box::new(recorder)).map_err(|e| anyhow!("installing metrics recorder: {:?}", e))?;
    tokio::spawn(async move {
        if let Err(e) = exporter.await {
            warn!(error = ?e, "metrics exporter stopped");
        }
    });
    Ok(handle)
}

/// Load, validate and build. Fails before any store interaction.
fn load_manifests(cli: &Cli) -> Result<Vec<Manifest>> {
    let (cfg, _origin) = rgo_config::load(cli.config.as_deref())?;
    cfg.validate()?;
    Ok(build_all(&cfg, &BuildContext::new(&cli.namespace)))
}

fn cancel_on_ctrl_c(handle: CancelHandle) {
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            warn!("Ctrl-C received; cancelling batch");
            handle.cancel();
        }
    });
}

fn delete_targets(manifests: &[Manifest]) -> Vec<ObjectRef> {
    manifests.iter().rev().map(Manifest::object_ref).collect()
}

async fn run_deletes(targets: &[ObjectRef], ignore_not_found: bool, timeout_secs: u64) -> Result<()> {
    let store = KubeStore::connect().await?;
    let (ctx, handle) = ExecContext::with_timeout(Duration::from_secs(timeout_secs));
    cancel_on_ctrl_c(handle);
    let report = delete_all(&store, targets, DeletePolicy { ignore_not_found }, &ctx).await.context("delete failed")?;
    for (target, outcome) in &report.entries {
        println!("{} {}", outcome.as_str(), target);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env may carry RGO_LOG, so it goes before the subscriber
    let dotenv = rgo_config::load_dotenv();
    init_tracing();
    if let Err(e) = dotenv {
        warn!(error = %e, "could not load .env");
    }
    init_metrics();
    let cli = Cli::parse();
    let format = OutputFormat::from(cli.output);

    match cli.command {
        Commands::Apply { timeout_secs } => {
            let manifests = load_manifests(&cli)?;
            if cli.dry_run {
                print!("{}", preview(&manifests, format)?);
                return Ok(());
            }
            info!(ns = %cli.namespace, objects = manifests.len(), "apply invoked");
            let store = KubeStore::connect().await?;
            let (ctx, handle) = ExecContext::with_timeout(Duration::from_secs(timeout_secs));
            cancel_on_ctrl_c(handle);
            let report = apply_all(&store, &manifests, &ctx).await.context("apply failed")?;
            println!(
                "Applied successfully: {} created, {} updated",
                report.count(Outcome::Created),
                report.count(Outcome::Updated)
            );
        }
        Commands::Render => {
            let manifests = load_manifests(&cli)?;
            print!("{}", preview(&manifests, format)?);
        }
        Commands::Delete { ref kind, ref name, ignore_not_found, timeout_secs } => {
            let kind = ResourceKind::from_selector(kind)?;
            let target = ObjectRef::new(kind, cli.namespace.clone(), name.clone());
            if cli.dry_run {
                println!("[dry-run] would delete {}/{} in namespace {}", kind, target.name, target.namespace);
                return Ok(());
            }
            info!(%target, "delete invoked");
            run_deletes(&[target], ignore_not_found, timeout_secs).await?;
        }
        Commands::Destroy { ignore_not_found, timeout_secs } => {
            let targets = delete_targets(&load_manifests(&cli)?);
            if cli.dry_run {
                for t in &targets {
                    println!("[dry-run] would delete {}/{} in namespace {}", t.kind, t.name, t.namespace);
                }
                return Ok(());
            }
            info!(ns = %cli.namespace, objects = targets.len(), "destroy invoked");
            run_deletes(&targets, ignore_not_found, timeout_secs).await?;
        }
    }

    Ok(())
}
