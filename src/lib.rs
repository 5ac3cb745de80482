pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod notify;
pub mod pipeline;

use tracing_subscriber::EnvFilter;

/// Errors that stop the process before it starts serving.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Collaborator setup failed: {0}")]
    Context(#[from] api::ContextError),

    #[error("Failed to bind server: {0}")]
    Bind(#[from] std::io::Error),
}

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();
}

/// Read configuration, serve until ctrl-c, then drain in-flight requests.
pub async fn run() -> Result<(), StartupError> {
    init_tracing();
    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let settings = config::Settings::from_env()?;
    tracing::debug!(?settings, "Settings loaded");

    let ctx = api::ApiContext::from_settings(&settings)?;
    let mut server = api::start_relay_server(ctx, settings.bind_addr).await?;
    tracing::info!(addr = %server.addr, "Listening");

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for ctrl-c: {e}");
    }
    server.shutdown();
    server.stopped().await;
    Ok(())
}
