use anyhow::Result;
use atelier_core::AppConfig;
use atelier_relay_server::{start_server, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "atelier_relay_server=info,atelier_core=info,tower_http=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Atelier relay server v{}", atelier_core::VERSION);

    let config = AppConfig::load()?;
    if config.generation.api_key.is_empty() {
        tracing::warn!("ATELIER_API_KEY is not set, chat requests will fail upstream");
    }

    let state = AppState::from_config(config);
    start_server(state).await
}
