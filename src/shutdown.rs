//! OS termination signals for the demo server.
//!
//! SIGINT and SIGTERM both resolve [`shutdown_signal`]. A second signal after
//! that gets no special treatment: the handler stays installed and a forced
//! stop is left to the operating system.

use std::fmt;

use tokio::signal;

/// Which signal asked the process to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownRequest {
    /// SIGINT (Ctrl+C)
    Interrupt,
    /// SIGTERM
    Terminate,
}

impl fmt::Display for ShutdownRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownRequest::Interrupt => f.write_str("SIGINT"),
            ShutdownRequest::Terminate => f.write_str("SIGTERM"),
        }
    }
}

/// Creates a future that completes when a shutdown signal is received.
///
/// # Example
///
/// ```ignore
/// use multibin_demo::shutdown::shutdown_signal;
///
/// let request = shutdown_signal().await;
/// tracing::info!(signal = %request, "Shutting down server...");
/// ```
pub async fn shutdown_signal() -> ShutdownRequest {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let request = tokio::select! {
        () = ctrl_c => ShutdownRequest::Interrupt,
        () = terminate => ShutdownRequest::Terminate,
    };

    tracing::info!(signal = %request, "Received shutdown signal");
    request
}
