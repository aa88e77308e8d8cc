//! Background refresh of every cached dataset.
//!
//! The orchestrator owns the loop; this module only ties its lifetime to the
//! server process.

use std::sync::Arc;

use pulse_market_feed::OrchestratorHandle;
use tracing::info;

use crate::main_lib::AppState;

pub fn start_update_scheduler(state: &Arc<AppState>) -> OrchestratorHandle {
    info!("Starting dataset update scheduler");
    state.orchestrator.clone().spawn()
}

/// Resolves on Ctrl+C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
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
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
