//! Server lifecycle: start, serve, graceful shutdown.
//!
//! ```text
//! Starting ──start()──▶ Serving ──shutdown()──▶ ShuttingDown ──drained──▶ Stopped
//! ```
//!
//! [`ServerProcess::start`] binds the listener and moves the accept loop onto
//! its own task, so the caller can report startup and go on to wait for a
//! termination signal. [`ServerProcess::shutdown`] cancels the accept loop,
//! which drops the listener at once, and then waits up to a deadline for the
//! in-flight connections to drain. Missing the deadline is fatal.

use std::fmt;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use hyper_util::server::conn::auto;
use hyper_util::server::graceful::GracefulShutdown;
use hyper_util::service::TowerToHyperService;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::build_info::BuildInfo;
use crate::config::ServerConfig;
use crate::routes::{create_router, AppState};
use crate::timed_stream::{InFlight, TimedStream, TrackInFlight};

/// Time in-flight requests get to finish once shutdown starts.
pub const SHUTDOWN_DEADLINE: Duration = Duration::from_secs(30);

/// Pause after an accept error that is not tied to a single connection.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Lifecycle states. They only ever move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LifecycleState {
    Starting,
    Serving,
    ShuttingDown,
    Stopped,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LifecycleState::Starting => "starting",
            LifecycleState::Serving => "serving",
            LifecycleState::ShuttingDown => "shutting down",
            LifecycleState::Stopped => "stopped",
        })
    }
}

/// Per-connection timeouts applied while serving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerTimeouts {
    /// Limit for reading a request head
    pub read: Duration,
    /// Limit for a single stalled write
    pub write: Duration,
    /// Limit for a connection with no traffic
    pub idle: Duration,
}

impl Default for ServerTimeouts {
    fn default() -> Self {
        Self {
            read: Duration::from_secs(15),
            write: Duration::from_secs(15),
            idle: Duration::from_secs(60),
        }
    }
}

/// Every way the lifecycle can fail. All of them are fatal to the process.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The listener could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// The accept loop stopped without being asked to.
    #[error("server failed: {0}")]
    Serve(#[source] io::Error),

    /// The accept loop task panicked or was cancelled.
    #[error("server task failed: {0}")]
    Task(#[from] JoinError),

    /// In-flight requests did not finish before the deadline.
    #[error("server forced to shutdown: in-flight requests still running after {0:?}")]
    ShutdownTimeout(Duration),

    /// `await_termination` or `shutdown` was called outside the `Serving` state.
    #[error("server is {0}, not serving")]
    NotServing(LifecycleState),
}

/// The single running HTTP server of this process.
pub struct ServerProcess {
    local_addr: SocketAddr,
    timeouts: ServerTimeouts,
    state: LifecycleState,
    cancel: CancellationToken,
    serve_task: JoinHandle<()>,
}

impl ServerProcess {
    /// Bind `addr` and start serving `router` on a background task.
    ///
    /// Returns once the listener is bound; the returned process is `Serving`.
    pub async fn start(
        addr: &str,
        router: Router,
        timeouts: ServerTimeouts,
    ) -> Result<Self, LifecycleError> {
        let mut state = LifecycleState::Starting;
        tracing::debug!(address = %addr, %state, "Binding listener");

        let bind_error = |source| LifecycleError::Bind {
            addr: addr.to_string(),
            source,
        };
        let listener = TcpListener::bind(addr).await.map_err(bind_error)?;
        let local_addr = listener.local_addr().map_err(bind_error)?;

        let cancel = CancellationToken::new();
        let serve_task = tokio::spawn(accept_loop(listener, router, timeouts, cancel.clone()));

        state = LifecycleState::Serving;
        tracing::info!(address = %local_addr, %state, "Starting server on {}", local_addr);

        Ok(Self {
            local_addr,
            timeouts,
            state,
            cancel,
            serve_task,
        })
    }

    /// Address the listener is actually bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn timeouts(&self) -> ServerTimeouts {
        self.timeouts
    }

    /// Block until `signal` resolves.
    ///
    /// If the accept loop dies first, that failure is returned instead and the
    /// process is `Stopped`. Only valid while `Serving`.
    pub async fn await_termination<F>(&mut self, signal: F) -> Result<F::Output, LifecycleError>
    where
        F: Future,
    {
        if self.state != LifecycleState::Serving {
            return Err(LifecycleError::NotServing(self.state));
        }

        tokio::select! {
            biased;
            output = signal => Ok(output),
            result = &mut self.serve_task => {
                self.state = LifecycleState::Stopped;
                Err(match result {
                    Ok(()) => LifecycleError::Serve(io::Error::other("listener closed unexpectedly")),
                    Err(e) => LifecycleError::Task(e),
                })
            }
        }
    }

    /// Stop accepting connections and wait up to `deadline` for in-flight
    /// requests to finish.
    pub async fn shutdown(&mut self, deadline: Duration) -> Result<(), LifecycleError> {
        if self.state != LifecycleState::Serving {
            return Err(LifecycleError::NotServing(self.state));
        }

        self.state = LifecycleState::ShuttingDown;
        tracing::info!(deadline = ?deadline, "Shutting down server...");
        self.cancel.cancel();

        let drained = tokio::time::timeout(deadline, &mut self.serve_task).await;
        match drained {
            Ok(Ok(())) => {
                self.state = LifecycleState::Stopped;
                tracing::info!("Server stopped");
                Ok(())
            }
            Ok(Err(e)) => Err(LifecycleError::Task(e)),
            Err(_) => {
                self.serve_task.abort();
                Err(LifecycleError::ShutdownTimeout(deadline))
            }
        }
    }
}

/// Accept connections until `cancel` fires, then drain.
async fn accept_loop(
    listener: TcpListener,
    router: Router,
    timeouts: ServerTimeouts,
    cancel: CancellationToken,
) {
    let mut builder = auto::Builder::new(TokioExecutor::new());
    builder
        .http1()
        .timer(TokioTimer::new())
        .header_read_timeout(timeouts.read);

    let graceful = GracefulShutdown::new();

    loop {
        let accepted = tokio::select! {
            () = cancel.cancelled() => break,
            accepted = listener.accept() => accepted,
        };

        let (stream, peer) = match accepted {
            Ok(conn) => conn,
            Err(e) => match AcceptError::classify(&e) {
                AcceptError::Connection => {
                    tracing::debug!(error = %e, "Dropped connection during accept");
                    continue;
                }
                AcceptError::Listener => {
                    // e.g. out of file descriptors; retrying at once would spin
                    tracing::error!(error = %e, backoff = ?ACCEPT_ERROR_BACKOFF, "Accept failed");
                    tokio::select! {
                        () = cancel.cancelled() => break,
                        () = tokio::time::sleep(ACCEPT_ERROR_BACKOFF) => continue,
                    }
                }
            },
        };

        let in_flight = InFlight::default();
        let io = TokioIo::new(TimedStream::new(
            stream,
            timeouts.idle,
            timeouts.write,
            in_flight.clone(),
        ));
        let service = TowerToHyperService::new(TrackInFlight::new(router.clone(), in_flight));
        let conn = builder.serve_connection_with_upgrades(io, service).into_owned();
        let conn = graceful.watch(conn);

        tokio::spawn(async move {
            if let Err(e) = conn.await {
                tracing::debug!(peer = %peer, error = %e, "Connection closed with error");
            }
        });
    }

    drop(listener);
    tracing::debug!("Listener closed, draining connections");
    graceful.shutdown().await;
}

/// How the accept loop reacts to a failed `accept`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AcceptError {
    /// Only the pending connection is lost; accept the next one.
    Connection,
    /// The listener itself is in trouble; back off, then retry.
    Listener,
}

impl AcceptError {
    fn classify(e: &io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset => AcceptError::Connection,
            _ => AcceptError::Listener,
        }
    }
}

/// Run the server from `config` until `signal` resolves, then shut down
/// within `deadline`.
pub async fn run<F>(
    config: &ServerConfig,
    build: BuildInfo,
    signal: F,
    deadline: Duration,
) -> Result<(), LifecycleError>
where
    F: Future,
{
    let router = create_router(AppState::new(config.clone(), build));
    let mut server =
        ServerProcess::start(&config.bind_addr(), router, ServerTimeouts::default()).await?;

    server.await_termination(signal).await?;
    server.shutdown(deadline).await
}
