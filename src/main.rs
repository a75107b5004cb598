use std::net::SocketAddr;

use anyhow::Context;
use dotenvy::dotenv;
use rollcall::logging::{init_tracing, shutdown_tracer};
use rollcall::metrics::{init_metrics, metrics_app};
use rollcall::router::init_router;
use rollcall::state::init_app_state;
use rollcall_config::ServerConfig;
use rollcall_db::run_migrations;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    init_tracing()?;
    let metrics_handle = init_metrics()?;

    let server_config = ServerConfig::from_env();
    let state = init_app_state(&server_config).await?;
    run_migrations(&state.db)
        .await
        .context("Failed to run database migrations")?;

    if let Some(handle) = metrics_handle {
        let metrics_addr = SocketAddr::from(([0, 0, 0, 0], server_config.metrics_port));
        let listener = tokio::net::TcpListener::bind(metrics_addr)
            .await
            .context("Failed to bind metrics port")?;
        tracing::info!("Metrics available at http://{}/metrics", metrics_addr);
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, metrics_app(handle)).await {
                tracing::error!(error = %e, "Metrics server stopped");
            }
        });
    }

    let app = init_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], server_config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Server running on http://localhost:{}", server_config.port);
    tracing::info!("Swagger UI available at http://localhost:{}/swagger-ui", server_config.port);
    tracing::info!("Scalar UI available at http://localhost:{}/scalar", server_config.port);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    shutdown_tracer().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
