use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use lendex::clock::SystemClock;
use lendex::http::{self, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let metrics_port: Option<u16> = std::env::var("LENDEX_METRICS_PORT")
        .ok()
        .and_then(|s| s.parse().ok());
    lendex::observability::init(metrics_port);

    let port = std::env::var("LENDEX_PORT").unwrap_or_else(|_| "8080".into());
    let bind = std::env::var("LENDEX_BIND").unwrap_or_else(|_| "0.0.0.0".into());

    let state = AppState::in_memory(Arc::new(SystemClock));
    let app = http::router(state);

    let addr = format!("{bind}:{port}");
    let listener = TcpListener::bind(&addr).await?;
    info!("lendex listening on {addr}");
    info!(
        "  metrics: {}",
        metrics_port.map_or("disabled".to_string(), |p| format!(
            "http://0.0.0.0:{p}/metrics"
        ))
    );

    // Graceful shutdown: stop accepting on SIGTERM/ctrl-c, let axum drain.
    let shutdown = async {
        let ctrl_c = tokio::signal::ctrl_c();
        #[cfg(unix)]
        {
            let mut sigterm =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                    .expect("failed to register SIGTERM handler");
            tokio::select! {
                _ = ctrl_c => {}
                _ = sigterm.recv() => {}
            }
        }
        #[cfg(not(unix))]
        {
            ctrl_c.await.ok();
        }
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("lendex stopped");
    Ok(())
}
