mod api;
mod middleware;

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;
use tripdash_core::{Catalog, Trip};
use tripdash_gemini::{GeminiClient, TextGenerator};

use crate::api::{build_app, default_message_quota, ApiSettings, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = tripdash_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let catalog = Catalog::load_or_embedded(config.catalog_path.as_deref())
        .context("failed to load budget catalog")?;
    let trip = Trip::load_or_embedded(config.trip_path.as_deref())
        .context("failed to load trip dashboard")?;

    let generator: Option<Arc<dyn TextGenerator>> = match config.gemini_api_key.as_deref() {
        Some(key) => {
            let client = GeminiClient::with_base_url(
                key,
                &config.gemini_model,
                config.gemini_timeout_secs,
                &config.gemini_base_url,
            )
            .context("failed to build Gemini client")?;
            tracing::info!(model = client.model(), "chat enabled");
            Some(Arc::new(client))
        }
        None => {
            tracing::warn!("GEMINI_API_KEY is not set; chat endpoints will answer 503");
            None
        }
    };

    let state = AppState::new(catalog, trip, generator, ApiSettings::from_config(&config));
    let app = build_app(state, default_message_quota());

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!(addr = %config.bind_addr, env = %config.env, "tripdash-server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
