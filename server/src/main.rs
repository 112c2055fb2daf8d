use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use visionpay_server::bootstrap;

fn init_tracing() {
    let env_filter =
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=info".to_string());
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(env_filter))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutting down");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let cfg = config::load_with_env()?;
    let secrets = config::resolve_secrets();
    tracing::info!(
        client_id = cfg.gateway.client_id.is_some(),
        mpesa_token = secrets.mpesa_token.is_some(),
        "Gateway credentials present"
    );
    tracing::debug!(?secrets, "Resolved secrets");

    let state = Arc::new(bootstrap::build_state(&cfg, &secrets)?);

    let addr = format!("{}:{}", cfg.server.bind, cfg.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Server listening");

    visionpay_server::serve(listener, state, shutdown_signal()).await
}
