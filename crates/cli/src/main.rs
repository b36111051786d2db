use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use kmcp_api::{CatalogConfig, InProcApi, ResourceApi};
use kmcp_core::ResourceKind;
use kmcp_kubehub::KubeGateway;
use kmcp_server::McpServer;
use tokio::signal;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "kmcp", version, about = "Kubernetes objects as MCP resources")]
struct Cli {
    /// Output format for `catalog` and `read`
    #[arg(short = 'o', long = "output", value_enum, global = true, default_value_t = Output::Human)]
    output: Output,

    /// Path to a kubeconfig file (default: in-cluster, then ~/.kube/config)
    #[arg(long, env = "KMCP_KUBECONFIG", global = true)]
    kubeconfig: Option<PathBuf>,

    /// Kubeconfig context to use
    #[arg(long, env = "KMCP_CONTEXT", global = true)]
    context: Option<String>,

    /// Kind advertised in the catalog (pod, service, deployment)
    #[arg(long = "catalog-kind", env = "KMCP_CATALOG_KIND", global = true, default_value = "service")]
    catalog_kind: ResourceKind,

    /// Maximum number of advertised resources
    #[arg(long = "catalog-limit", env = "KMCP_CATALOG_LIMIT", global = true, default_value_t = 5)]
    catalog_limit: usize,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output { Human, Json }

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve MCP over stdio until EOF or Ctrl-C (default)
    Serve,
    /// Print the advertised resources
    Catalog,
    /// Resolve one resource URI and print it
    Read {
        /// e.g. k8s://pod/default/web-0
        uri: String,
    },
}

impl Cli {
    fn catalog_config(&self) -> CatalogConfig {
        CatalogConfig { seed_kind: self.catalog_kind, limit: self.catalog_limit }
    }

    async fn gateway(&self) -> Result<Arc<KubeGateway>> {
        let gw = KubeGateway::connect(self.kubeconfig.as_deref(), self.context.as_deref()).await?;
        Ok(Arc::new(gw))
    }
}

fn init_tracing() {
    let env = std::env::var("KMCP_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    // stdout belongs to the protocol.
    if std::env::var("KMCP_LOG_FORMAT").map(|v| v.eq_ignore_ascii_case("json")).unwrap_or(false) {
        tracing_subscriber::fmt().json().with_env_filter(filter).with_writer(std::io::stderr).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_writer(std::io::stderr).init();
    }
}

fn init_metrics() {
    if let Ok(addr) = std::env::var("KMCP_METRICS_ADDR") {
        if let Ok(sock) = addr.parse::<std::net::SocketAddr>() {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            match builder.with_http_listener(sock).install() {
                Ok(_) => info!(addr = %addr, "Prometheus metrics exporter listening"),
                Err(e) => warn!(error = %e, "failed to install metrics exporter"),
            }
        } else {
            warn!(addr = %addr, "invalid KMCP_METRICS_ADDR; expected host:port");
        }
    }
}

async fn serve(cli: &Cli) -> Result<()> {
    let t0 = Instant::now();
    let gw = cli.gateway().await?;
    let version = gw.health_check().await?;
    let api = InProcApi::new(gw)
        .with_span(tracing::info_span!("kmcp", cluster = %version))
        .bootstrap(&cli.catalog_config())
        .await;
    info!(advertised = api.list_advertised_resources().len(), took_ms = %t0.elapsed().as_millis(), "startup complete");
    let server = McpServer::new(Arc::new(api));
    tokio::select! {
        res = server.serve_stdio() => res,
        _ = signal::ctrl_c() => {
            info!("interrupt received, shutting down");
            Ok(())
        }
    }
}

async fn catalog(cli: &Cli) -> Result<()> {
    let api = InProcApi::new(cli.gateway().await?).bootstrap(&cli.catalog_config()).await;
    let entries = api.list_advertised_resources();
    match cli.output {
        Output::Human => {
            for e in &entries {
                println!("{} • {} • {}", e.uri, e.title, e.description);
            }
        }
        Output::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
    }
    Ok(())
}

async fn read(cli: &Cli, uri: &str) -> Result<()> {
    let api = InProcApi::new(cli.gateway().await?);
    let out = api.read_resource(uri).await.with_context(|| format!("reading {uri}"))?;
    match cli.output {
        Output::Human => println!("{}", out.text),
        Output::Json => println!("{}", serde_json::to_string_pretty(&out)?),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    init_metrics();
    let cli = Cli::parse();

    let res = match &cli.command {
        None | Some(Commands::Serve) => serve(&cli).await,
        Some(Commands::Catalog) => catalog(&cli).await,
        Some(Commands::Read { uri }) => read(&cli, uri).await,
    };
    if let Err(e) = &res {
        error!(error = ?e, "kmcp failed");
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_serving_five_services() {
        let cli = Cli::try_parse_from(["kmcp"]).expect("parse");
        assert!(cli.command.is_none());
        assert_eq!(cli.catalog_config(), CatalogConfig::default());
        assert_eq!(cli.output, Output::Human);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["kmcp", "read", "k8s://pod/default/web-0", "-o", "json", "--catalog-kind", "pod"])
            .expect("parse");
        assert_eq!(cli.output, Output::Json);
        assert_eq!(cli.catalog_kind, ResourceKind::Pod);
        assert!(matches!(cli.command, Some(Commands::Read { ref uri }) if uri == "k8s://pod/default/web-0"));
    }

    #[test]
    fn unknown_catalog_kind_is_rejected() {
        assert!(Cli::try_parse_from(["kmcp", "--catalog-kind", "ingress"]).is_err());
    }
}
