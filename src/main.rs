use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use qtum_eth_proxy::proxy::DEFAULT_TX_CONCURRENCY;
use qtum_eth_proxy::{create_qtum_read_client, EthProxy, ProxyConfig, RpcServer};

#[derive(Parser)]
#[command(name = "qtum-eth-proxy")]
#[command(about = "Ethereum JSON-RPC proxy for a Qtum node")]
struct Cli {
    #[arg(long, default_value = "http://127.0.0.1:3889")]
    rpc_url: String,
    #[arg(long, default_value = "qtum")]
    rpc_user: String,
    #[arg(long)]
    rpc_password: String,
    #[arg(long, default_value = "127.0.0.1")]
    http_host: String,
    #[arg(long, default_value = "23889")]
    http_port: u16,
    /// Concurrent transaction lookups when a block is requested with full transactions
    #[arg(long, default_value_t = DEFAULT_TX_CONCURRENCY)]
    tx_concurrency: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "qtum_eth_proxy=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    info!(rpc_url = %cli.rpc_url, "Starting Qtum Ethereum proxy");

    let client = create_qtum_read_client(&cli.rpc_url, &cli.rpc_user, &cli.rpc_password)?;
    let config = ProxyConfig {
        tx_concurrency: cli.tx_concurrency,
    };
    let proxy = EthProxy::new(client, config).map_err(anyhow::Error::msg)?;

    let app = RpcServer::new(proxy).router();

    let addr = format!("{}:{}", cli.http_host, cli.http_port);
    info!("Starting JSON-RPC server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
