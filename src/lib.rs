pub mod api;
pub mod archive;
pub mod config;
pub mod core_state;
pub mod db;
pub mod models;
pub mod pipeline;

use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Start the local API and serve until Ctrl-C.
pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    let config = config::AssistantConfig::from_env()?;
    tracing::info!(
        "{} starting v{}",
        config::APP_NAME,
        config::APP_VERSION
    );
    tracing::info!(
        bind = %config.bind_addr,
        model = %config.model,
        data_dir = %config.data_dir.display(),
        allowed_origin = %config.allowed_origin,
        "Configuration loaded"
    );
    if config.access_token.is_generated() {
        // Shown once so the form can be pointed at this process.
        tracing::info!(
            token = config.access_token.expose(),
            "No MEDIC_ASSIST_ACCESS_TOKEN set; generated an access token for this run"
        );
    }

    let core = Arc::new(core_state::CoreState::from_config(config)?);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async move {
        let server = api::start_api_server(core).await?;
        tracing::info!(addr = %server.session.server_addr, "Ready");

        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {e}");
        }
        server.stop().await;
        Ok::<_, Box<dyn std::error::Error>>(())
    })
}
