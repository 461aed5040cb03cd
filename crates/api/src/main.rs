use anyhow::Context;

use dockyard_api::{app, config::ApiConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dockyard_observability::init();

    let config = ApiConfig::from_env();
    let services = app::services::build_services(&config)
        .await
        .context("failed to wire receiving services")?;
    let app = app::build_app(services);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
