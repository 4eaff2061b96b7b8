use anyhow::Context;

use bizgate_api::GateConfig;
use bizgate_api::app::{build_app, placeholder_pages};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    bizgate_observability::init();

    let config = GateConfig::from_env().context("invalid gate configuration")?;
    let app = build_app(&config, placeholder_pages());

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
