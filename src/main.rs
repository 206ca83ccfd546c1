use anyhow::Context;
use tenant_edge::{app_config, create_router, initialize_app_state};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables before the config is first touched
    dotenv::dotenv().ok();

    let config = match app_config::AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        },
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.server.rust_log.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        environment = %config.server.environment,
        root_domain = %config.tenancy.root_domain,
        "Starting tenant edge gateway on {}",
        config.server.bind_address
    );

    if config.is_production() && !config.session.api_base_url.starts_with("https://") {
        warn!(
            api_base_url = %config.session.api_base_url,
            "Refresh tokens will be sent to the backend over plain HTTP"
        );
    }

    let state = match initialize_app_state(&config) {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to initialize gateway: {}", e);
            std::process::exit(1);
        },
    };

    let listener = tokio::net::TcpListener::bind(&config.server.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_address))?;

    info!(address = %listener.local_addr()?, "Listening");

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
}
