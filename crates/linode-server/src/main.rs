use std::{sync::Arc, time::Duration};

use clap::Parser;
use linode_client::{DEFAULT_API_URL, HttpLinodeClient, LinodeApi};
use linode_common::LinodeError;
use linode_metrics::{
    AccountCollector, BuildInfo, CollectorRegistry, ExporterCollector, ExporterState,
    InstanceCollector, NodeBalancerCollector, TicketCollector, TransferCollector,
    exporter_router,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "linode-exporter",
    about = "Prometheus exporter for Linode account, instance and transfer metrics"
)]
struct Cli {
    /// Linode API personal access token
    #[arg(long = "linode-token", env = "LINODE_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Log every Linode API request and response
    #[arg(long, default_value_t = false)]
    debug: bool,

    /// Address the HTTP server listens on
    #[arg(long, default_value = "0.0.0.0:9388")]
    endpoint: String,

    /// Path on which metrics are served
    #[arg(long, default_value = "/metrics")]
    path: String,

    #[arg(long, default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Upper bound in seconds for all upstream calls of one scrape
    #[arg(long = "scrape-timeout", default_value_t = 30)]
    scrape_timeout_secs: u64,

    #[arg(long, default_value = "linode")]
    namespace: String,
}

fn build_registry(
    namespace: &str,
    client: Arc<dyn LinodeApi>,
) -> Result<CollectorRegistry, LinodeError> {
    let registry = CollectorRegistry::new(namespace);
    registry.register(Arc::new(AccountCollector::new(namespace, Arc::clone(&client))))?;
    registry.register(Arc::new(ExporterCollector::new(
        namespace,
        BuildInfo::from_build_env(),
    )))?;
    registry.register(Arc::new(InstanceCollector::new(namespace, Arc::clone(&client))))?;
    registry.register(Arc::new(NodeBalancerCollector::new(
        namespace,
        Arc::clone(&client),
    )))?;
    registry.register(Arc::new(TicketCollector::new(namespace, Arc::clone(&client))))?;
    registry.register(Arc::new(TransferCollector::new(namespace, client)))?;
    Ok(registry)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::from_default_env().add_directive("linode=info".parse()?);
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    let token = cli
        .token
        .as_deref()
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "provide a linode api token with --linode-token or LINODE_TOKEN",
            )
        })?;

    let client: Arc<dyn LinodeApi> =
        Arc::new(HttpLinodeClient::new(&cli.api_url, token)?.with_debug(cli.debug));
    let registry = Arc::new(build_registry(&cli.namespace, client)?);
    let state = Arc::new(ExporterState::new(
        registry,
        Duration::from_secs(cli.scrape_timeout_secs),
        cli.path.clone(),
    )?);
    let app = exporter_router(state);

    let listener = tokio::net::TcpListener::bind(&cli.endpoint).await?;
    info!(endpoint = %cli.endpoint, "linode exporter listening");
    info!(path = %cli.path, "metrics served");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
