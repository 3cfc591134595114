use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use envbind_core::policy::PlacementDecision;
use envbind_core::Application;
use envbind_engine::PlacementLedger;
use serde::Serialize;
use tracing::{error, info};

mod input;

#[derive(Parser, Debug)]
#[command(name = "envbindctl", version, about = "Env-binding patch and placement tool")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, global = true, default_value_t = Output::Human)]
    output: Output,

    /// Kubernetes namespace for live objects (default: current context)
    #[arg(long = "ns", env = "ENVBIND_NAMESPACE", global = true)]
    namespace: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output { Human, Json, Yaml }

/// Where the Application comes from: a manifest file (`-` for stdin) or the cluster.
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct Source {
    /// Application manifest (YAML or JSON)
    #[arg(short = 'f', long = "file")]
    file: Option<PathBuf>,
    /// Name of a live Application in --ns
    #[arg(long = "live")]
    live: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render the application as patched for one env of an env-binding policy
    Patch {
        #[command(flatten)]
        source: Source,
        #[arg(long = "policy")]
        policy: String,
        #[arg(long = "env")]
        env: String,
    },
    /// Render the application after its override policies
    Override {
        #[command(flatten)]
        source: Source,
        /// Override policies to apply in order (default: all, in declaration order)
        #[arg(long = "policy")]
        policies: Vec<String>,
    },
    /// Read or record placement decisions
    Placements {
        #[command(subcommand)]
        command: PlacementCommands,
    },
    /// Cluster bookkeeping
    Clusters {
        #[command(subcommand)]
        command: ClusterCommands,
    },
}

#[derive(Subcommand, Debug)]
enum PlacementCommands {
    Get {
        #[command(flatten)]
        source: Source,
        #[arg(long = "policy")]
        policy: String,
        #[arg(long = "env")]
        env: String,
    },
    /// Record decisions; live objects are patched through the status subresource
    Set {
        #[command(flatten)]
        source: Source,
        #[arg(long = "policy")]
        policy: String,
        #[arg(long = "env")]
        env: String,
        /// cluster[/namespace], repeatable
        #[arg(long = "decision", required = true)]
        decisions: Vec<PlacementDecision>,
    },
}

#[derive(Subcommand, Debug)]
enum ClusterCommands {
    /// Clusters the policy used before but no env places on now
    Stale {
        #[command(flatten)]
        source: Source,
        /// Env-binding policy (default: the first one)
        #[arg(long = "policy", default_value = "")]
        policy: String,
    },
    /// Applications that currently place workloads on a cluster
    InUse {
        cluster: String,
    },
}

fn init_tracing() {
    let env = std::env::var("ENVBIND_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_writer(std::io::stderr).init();
}

fn init_metrics() {
    if let Ok(addr) = std::env::var("ENVBIND_METRICS_ADDR") {
        if let Ok(sock) = addr.parse::<std::net::SocketAddr>() {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            match builder.with_http_listener(sock).install() {
                Ok(_) => tracing::info!(addr = %addr, "Prometheus metrics exporter listening"),
                Err(e) => tracing::warn!(error = %e, "failed to install metrics exporter"),
            }
        } else {
            tracing::warn!(addr = %addr, "invalid ENVBIND_METRICS_ADDR; expected host:port");
        }
    }
}

async fn load(source: &Source, ns: Option<&str>) -> Result<Application> {
    match (&source.file, &source.live) {
        (Some(path), _) => input::load_application(path),
        (None, Some(name)) => {
            let client = envbind_kubehub::get_kube_client().await?;
            envbind_kubehub::get_application(client, ns, name).await
        }
        (None, None) => Err(anyhow!("either --file or --live is required")),
    }
}

fn print<T: Serialize>(value: &T, output: Output) -> Result<()> {
    match output {
        Output::Json => println!("{}", serde_json::to_string_pretty(value)?),
        Output::Human | Output::Yaml => print!("{}", serde_yaml::to_string(value)?),
    }
    Ok(())
}

#[derive(Serialize)]
struct PlacementsOut<'a> {
    env: &'a str,
    found: bool,
    decisions: Vec<PlacementDecision>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    init_metrics();
    let cli = Cli::parse();
    let ns = cli.namespace.as_deref();

    match cli.command {
        Commands::Patch { source, policy, env } => {
            let app = load(&source, ns).await?;
            let patched = envbind_engine::patch_application_by_env_binding_env(&app, &policy, &env)?;
            info!(policy = %policy, env = %env, components = patched.spec.components.len(), "application patched");
            print(&patched, cli.output)?;
        }
        Commands::Override { source, policies } => {
            let app = load(&source, ns).await?;
            let out = envbind_engine::apply_override_policies(&app, &policies)?;
            print(&out, cli.output)?;
        }
        Commands::Placements { command: PlacementCommands::Get { source, policy, env } } => {
            let app = load(&source, ns).await?;
            let (decisions, found) = envbind_engine::read_placement_decisions(&app, &policy, &env)?;
            match cli.output {
                Output::Human => {
                    if !found {
                        println!("no placement decided for env {} of policy {}", env, policy);
                    }
                    for d in &decisions {
                        println!("{} • {}", d.cluster, if d.namespace.is_empty() { "-" } else { d.namespace.as_str() });
                    }
                }
                _ => print(&PlacementsOut { env: &env, found, decisions }, cli.output)?,
            }
        }
        Commands::Placements { command: PlacementCommands::Set { source, policy, env, decisions } } => {
            let mut app = load(&source, ns).await?;
            envbind_engine::write_placement_decisions(&mut app, &policy, &env, &decisions)?;
            if source.live.is_some() {
                let client = envbind_kubehub::get_kube_client().await?;
                let updated = envbind_kubehub::persist_status(client, &app).await?;
                info!(policy = %policy, env = %env, count = decisions.len(), "placements recorded");
                if cli.output != Output::Human {
                    print(&updated, cli.output)?;
                }
            } else {
                print(&app, cli.output)?;
            }
        }
        Commands::Clusters { command: ClusterCommands::Stale { source, policy } } => {
            let app = load(&source, ns).await?;
            let status = envbind_engine::get_env_binding_policy_status(&app, &policy)?.unwrap_or_default();
            let stale = status.stale_clusters();
            match cli.output {
                Output::Human => {
                    for c in &stale {
                        println!("{} • last active {}", c.cluster_name, c.last_active_revision);
                    }
                }
                _ => print(&stale, cli.output)?,
            }
        }
        Commands::Clusters { command: ClusterCommands::InUse { cluster } } => {
            let client = envbind_kubehub::get_kube_client().await?;
            let apps = envbind_kubehub::list_applications(client, ns).await?;
            let usages = envbind_engine::cluster_usages(&apps, &cluster);
            for u in &usages {
                println!("{}/{} • {}", u.namespace, u.app, u.env);
            }
            if let Err(e) = envbind_engine::ensure_cluster_unused(&apps, &cluster) {
                error!(cluster = %cluster, count = usages.len(), "cluster in use");
                return Err(e.into());
            }
            println!("cluster {} is not used by any application", cluster);
        }
    }
    Ok(())
}
